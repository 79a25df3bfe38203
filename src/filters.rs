//! Filter values driving one aggregation invocation.
//!
//! A `FilterSpec` is built fresh from control state on every change and
//! never stored by the aggregations themselves.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::figures::Figure;
use crate::schema::sales;

/// Numeric column aggregated by the time-series and product charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    Sales,
    Profit,
    Quantity,
}

impl Measure {
    pub fn column(self) -> &'static str {
        match self {
            Measure::Sales => sales::SALES,
            Measure::Profit => sales::PROFIT,
            Measure::Quantity => sales::QUANTITY,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Metric summed by the geography chart. Values are the column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "Total_sales")]
    TotalSales,
    Profit,
}

impl Metric {
    pub fn column(self) -> &'static str {
        match self {
            Metric::TotalSales => sales::TOTAL_SALES,
            Metric::Profit => sales::PROFIT,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Region,
    Market,
    Country,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Region => sales::REGION,
            Dimension::Market => sales::MARKET,
            Dimension::Country => sales::COUNTRY,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductView {
    Bar,
    Treemap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityView {
    Heatmap,
    Line,
}

/// Inclusive order-date bounds. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// Closed discount interval, carried on the wire as `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct DiscountRange {
    pub low: f64,
    pub high: f64,
}

impl From<[f64; 2]> for DiscountRange {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<DiscountRange> for [f64; 2] {
    fn from(r: DiscountRange) -> Self {
        [r.low, r.high]
    }
}

/// Category restriction with an `"All"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl CategoryFilter {
    pub const ALL: &'static str = "All";
}

impl From<String> for CategoryFilter {
    fn from(s: String) -> Self {
        if s == Self::ALL {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(s)
        }
    }
}

impl From<CategoryFilter> for String {
    fn from(c: CategoryFilter) -> Self {
        match c {
            CategoryFilter::All => CategoryFilter::ALL.to_string(),
            CategoryFilter::Only(s) => s,
        }
    }
}

// ── Per-figure filters ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOverTimeFilter {
    #[serde(default)]
    pub dates: DateRange,
    pub window: usize,
    pub measure: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographyFilter {
    pub dimension: Dimension,
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProductsFilter {
    pub view: ProductView,
    pub measure: Measure,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityFilter {
    pub view: SeasonalityView,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountImpactFilter {
    pub discount: DiscountRange,
    pub category: CategoryFilter,
}

/// The control values of exactly one figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "figure", rename_all = "snake_case")]
pub enum FilterSpec {
    SalesOverTime(SalesOverTimeFilter),
    Geography(GeographyFilter),
    TopProducts(TopProductsFilter),
    Seasonality(SeasonalityFilter),
    DiscountImpact(DiscountImpactFilter),
}

impl FilterSpec {
    pub fn figure(&self) -> Figure {
        match self {
            FilterSpec::SalesOverTime(_) => Figure::SalesOverTime,
            FilterSpec::Geography(_) => Figure::Geography,
            FilterSpec::TopProducts(_) => Figure::TopProducts,
            FilterSpec::Seasonality(_) => Figure::Seasonality,
            FilterSpec::DiscountImpact(_) => Figure::DiscountImpact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_all_sentinel() {
        let all: CategoryFilter = serde_json::from_str("\"All\"").unwrap();
        assert_eq!(all, CategoryFilter::All);
        let one: CategoryFilter = serde_json::from_str("\"Furniture\"").unwrap();
        assert_eq!(one, CategoryFilter::Only("Furniture".into()));
        assert_eq!(serde_json::to_string(&CategoryFilter::All).unwrap(), "\"All\"");
    }

    #[test]
    fn metric_uses_column_names_on_the_wire() {
        let m: Metric = serde_json::from_str("\"Total_sales\"").unwrap();
        assert_eq!(m, Metric::TotalSales);
        assert_eq!(m.to_string(), "Total_sales");
    }

    #[test]
    fn inverted_date_range_is_detected() {
        let a = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert!(DateRange::new(a, b).is_inverted());
        assert!(!DateRange::new(b, a).is_inverted());
        assert!(!DateRange::default().is_inverted());
    }

    #[test]
    fn filter_spec_is_tagged_by_figure() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{"figure":"discount_impact","discount":[0.1,0.4],"category":"All"}"#,
        )
        .unwrap();
        assert_eq!(spec.figure(), Figure::DiscountImpact);
    }
}
