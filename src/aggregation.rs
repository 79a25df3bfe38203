use polars::prelude::*;

use crate::error::Result;

/// Reduction applied to one column of each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

/// Declarative reducer: which column, how, and under what output name.
///
/// Every reducer output is Float64 so extraction never depends on the
/// input dtype.
#[derive(Debug, Clone)]
pub struct Reducer {
    column: String,
    kind: Reduce,
    alias: Option<String>,
}

impl Reducer {
    fn new(column: &str, kind: Reduce) -> Self {
        Self {
            column: column.to_string(),
            kind,
            alias: None,
        }
    }

    pub fn sum(column: &str) -> Self {
        Self::new(column, Reduce::Sum)
    }

    pub fn mean(column: &str) -> Self {
        Self::new(column, Reduce::Mean)
    }

    pub fn min(column: &str) -> Self {
        Self::new(column, Reduce::Min)
    }

    pub fn max(column: &str) -> Self {
        Self::new(column, Reduce::Max)
    }

    pub fn count(column: &str) -> Self {
        Self::new(column, Reduce::Count)
    }

    pub fn alias(mut self, name: &str) -> Self {
        self.alias = Some(name.to_string());
        self
    }

    /// Sums keep the column name; other reducers get a suffix.
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let column = &self.column;
        match self.kind {
            Reduce::Sum => column.clone(),
            Reduce::Mean => format!("{column}_avg"),
            Reduce::Min => format!("{column}_min"),
            Reduce::Max => format!("{column}_max"),
            Reduce::Count => format!("{column}_count"),
        }
    }

    fn expr(&self) -> Expr {
        let c = col(self.column.as_str());
        let reduced = match self.kind {
            Reduce::Sum => c.sum(),
            Reduce::Mean => c.mean(),
            Reduce::Min => c.min(),
            Reduce::Max => c.max(),
            Reduce::Count => c.count(),
        };
        reduced
            .cast(DataType::Float64)
            .alias(self.output_name().as_str())
    }
}

/// Filter → group → reduce → order, executed through a polars `LazyFrame`.
///
/// Without group keys the reducers collapse the whole (filtered) frame into
/// one row; without reducers the `select` projection is applied instead.
/// Grouping and ordering are both stable, so equal keys keep dataset order.
/// Rows with a null group key are dropped before grouping.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    predicates: Vec<Expr>,
    keys: Vec<Expr>,
    reducers: Vec<Reducer>,
    select: Vec<Expr>,
    order: Vec<Expr>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row predicate. Multiple predicates are AND-ed.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn group_by<I: IntoIterator<Item = Expr>>(mut self, keys: I) -> Self {
        self.keys.extend(keys);
        self
    }

    pub fn reduce(mut self, reducer: Reducer) -> Self {
        self.reducers.push(reducer);
        self
    }

    pub fn select<I: IntoIterator<Item = Expr>>(mut self, exprs: I) -> Self {
        self.select.extend(exprs);
        self
    }

    /// Ascending order over output columns.
    pub fn order_by<I: IntoIterator<Item = Expr>>(mut self, exprs: I) -> Self {
        self.order.extend(exprs);
        self
    }

    fn predicate(&self) -> Option<Expr> {
        self.predicates
            .iter()
            .cloned()
            .chain(self.keys.iter().map(|k| k.clone().is_not_null()))
            .reduce(|acc, p| acc.and(p))
    }

    pub fn run(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut lazy = df.clone().lazy();

        if let Some(predicate) = self.predicate() {
            lazy = lazy.filter(predicate);
        }

        let reducers: Vec<Expr> = self.reducers.iter().map(Reducer::expr).collect();
        if !self.keys.is_empty() {
            lazy = lazy.group_by_stable(self.keys.clone()).agg(reducers);
        } else if !reducers.is_empty() {
            lazy = lazy.select(reducers);
        } else if !self.select.is_empty() {
            lazy = lazy.select(self.select.clone());
        }

        if !self.order.is_empty() {
            lazy = lazy.sort_by_exprs(
                self.order.clone(),
                SortMultipleOptions::default().with_maintain_order(true),
            );
        }

        Ok(lazy.collect()?)
    }
}

// ── Typed extraction ────────────────────────────────────────────────────────

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df.column(name)?.f64()?.into_iter().collect())
}

pub fn i32_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    Ok(df.column(name)?.i32()?.into_iter().collect())
}

/// String column values; nulls become empty strings.
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// First value of a single-row reduction.
pub fn scalar(df: &DataFrame, name: &str) -> Result<Option<f64>> {
    Ok(f64_values(df, name)?.into_iter().next().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "k" => ["b", "a", "b", "c", "a"],
            "v" => [1.0, 2.0, 3.0, 4.0, 5.0]
        )
        .unwrap()
    }

    #[test]
    fn grouped_sum_keeps_first_appearance_order() {
        let out = Pipeline::new()
            .group_by([col("k")])
            .reduce(Reducer::sum("v"))
            .run(&frame())
            .unwrap();
        assert_eq!(str_values(&out, "k").unwrap(), vec!["b", "a", "c"]);
        assert_eq!(
            f64_values(&out, "v").unwrap(),
            vec![Some(4.0), Some(7.0), Some(4.0)]
        );
    }

    #[test]
    fn ordering_applies_after_grouping() {
        let out = Pipeline::new()
            .group_by([col("k")])
            .reduce(Reducer::sum("v"))
            .order_by([col("k")])
            .run(&frame())
            .unwrap();
        assert_eq!(str_values(&out, "k").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn ungrouped_reducers_collapse_to_one_row() {
        let out = Pipeline::new()
            .filter(col("k").eq(lit("a")))
            .reduce(Reducer::sum("v").alias("total"))
            .reduce(Reducer::mean("v"))
            .reduce(Reducer::count("v"))
            .run(&frame())
            .unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(scalar(&out, "total").unwrap(), Some(7.0));
        assert_eq!(scalar(&out, "v_avg").unwrap(), Some(3.5));
        assert_eq!(scalar(&out, "v_count").unwrap(), Some(2.0));
    }

    #[test]
    fn filter_matching_nothing_yields_empty_groups() {
        let out = Pipeline::new()
            .filter(col("v").gt(lit(100.0)))
            .group_by([col("k")])
            .reduce(Reducer::sum("v"))
            .run(&frame())
            .unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn null_keys_form_no_group() {
        let df = df!(
            "k" => [Some("a"), None, Some("a"), None],
            "v" => [1.0, 2.0, 3.0, 4.0]
        )
        .unwrap();
        let out = Pipeline::new()
            .group_by([col("k")])
            .reduce(Reducer::sum("v"))
            .run(&df)
            .unwrap();
        assert_eq!(str_values(&out, "k").unwrap(), vec!["a"]);
        assert_eq!(f64_values(&out, "v").unwrap(), vec![Some(4.0)]);
    }

    #[test]
    fn predicates_are_anded() {
        let out = Pipeline::new()
            .filter(col("v").gt_eq(lit(2.0)))
            .filter(col("v").lt_eq(lit(4.0)))
            .select([col("v")])
            .run(&frame())
            .unwrap();
        assert_eq!(
            f64_values(&out, "v").unwrap(),
            vec![Some(2.0), Some(3.0), Some(4.0)]
        );
    }
}
