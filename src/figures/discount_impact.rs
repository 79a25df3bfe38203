use polars::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::aggregation::{f64_values, Pipeline};
use crate::chart_spec::{record, Axis, ChartSpec, Layout, Mark, Trendline, DARK_TEMPLATE};
use crate::error::Result;
use crate::filters::{CategoryFilter, DiscountImpactFilter};
use crate::schema::sales;
use crate::stats::ols;
use crate::store::DatasetStore;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscountPoint {
    pub discount: f64,
    pub profit: f64,
}

/// Transactions whose discount lies in the closed range, in dataset order.
pub fn aggregate(store: &DatasetStore, filter: &DiscountImpactFilter) -> Result<Vec<DiscountPoint>> {
    let range = filter.discount;
    if range.low > range.high {
        return Ok(Vec::new());
    }

    let mut pipeline = Pipeline::new()
        .filter(col(sales::DISCOUNT).gt_eq(lit(range.low)))
        .filter(col(sales::DISCOUNT).lt_eq(lit(range.high)));
    if let CategoryFilter::Only(category) = &filter.category {
        pipeline = pipeline.filter(col(sales::CATEGORY).eq(lit(category.as_str())));
    }
    let df = pipeline
        .select([col(sales::DISCOUNT), col(sales::PROFIT)])
        .run(store.sales())?;

    Ok(f64_values(&df, sales::DISCOUNT)?
        .into_iter()
        .zip(f64_values(&df, sales::PROFIT)?)
        .filter_map(|(discount, profit)| {
            Some(DiscountPoint {
                discount: discount?,
                profit: profit?,
            })
        })
        .collect())
}

/// Least-squares line through the points, drawn between the smallest and
/// largest discount.
pub fn trend(points: &[DiscountPoint]) -> Trendline {
    let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.discount, p.profit)).collect();
    let Some(fit) = ols(&xy) else {
        return Trendline {
            fit: None,
            points: Vec::new(),
        };
    };

    let (lo, hi) = xy
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
            (lo.min(x), hi.max(x))
        });
    Trendline {
        fit: Some(fit),
        points: vec![[lo, fit.predict(lo)], [hi, fit.predict(hi)]],
    }
}

pub fn chart(points: &[DiscountPoint]) -> ChartSpec {
    let rows = points
        .iter()
        .map(|p| {
            record([
                (sales::DISCOUNT, json!(p.discount)),
                (sales::PROFIT, json!(p.profit)),
            ])
        })
        .collect();

    ChartSpec::new(Mark::Scatter, "Impact of Discount on Profit")
        .x(Axis::bound(sales::DISCOUNT).titled(sales::DISCOUNT))
        .y(Axis::bound(sales::PROFIT).titled(sales::PROFIT))
        .blue_color(sales::PROFIT)
        .marker_size(8)
        .trendline(trend(points))
        .records(rows)
        .layout(Layout::themed().template(DARK_TEMPLATE).centered_title())
}

pub fn render(store: &DatasetStore, filter: &DiscountImpactFilter) -> Result<ChartSpec> {
    let points = aggregate(store, filter)?;
    Ok(chart(&points))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(discount: f64, profit: f64) -> DiscountPoint {
        DiscountPoint { discount, profit }
    }

    #[test]
    fn trend_spans_observed_discounts() {
        let t = trend(&[pt(0.3, 4.0), pt(0.1, 8.0), pt(0.2, 6.0)]);
        let fit = t.fit.unwrap();
        assert!((fit.slope + 20.0).abs() < 1e-9);
        assert_eq!(t.points.len(), 2);
        assert!((t.points[0][0] - 0.1).abs() < 1e-12);
        assert!((t.points[0][1] - 8.0).abs() < 1e-9);
        assert!((t.points[1][0] - 0.3).abs() < 1e-12);
        assert!((t.points[1][1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn single_point_has_no_trend() {
        let t = trend(&[pt(0.2, 1.0)]);
        assert!(t.fit.is_none());
        assert!(t.points.is_empty());
    }

    #[test]
    fn identical_discounts_have_no_trend() {
        let t = trend(&[pt(0.2, 1.0), pt(0.2, 5.0)]);
        assert!(t.fit.is_none());
    }
}
