//! The five dashboard figures.
//!
//! Each module exposes `aggregate` (store + filter → typed result, built on
//! [`Pipeline`](crate::aggregation::Pipeline)), `chart` (result →
//! [`ChartSpec`]) and `render`, which chains the two.

pub mod discount_impact;
pub mod geography;
pub mod sales_over_time;
pub mod seasonality;
pub mod top_products;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart_spec::ChartSpec;
use crate::error::{DashboardError, Result};
use crate::filters::FilterSpec;
use crate::store::DatasetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Figure {
    SalesOverTime,
    Geography,
    TopProducts,
    Seasonality,
    DiscountImpact,
}

impl Figure {
    pub const ALL: [Figure; 5] = [
        Figure::SalesOverTime,
        Figure::Geography,
        Figure::TopProducts,
        Figure::Seasonality,
        Figure::DiscountImpact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Figure::SalesOverTime => "sales_over_time",
            Figure::Geography => "geography",
            Figure::TopProducts => "top_products",
            Figure::Seasonality => "seasonality",
            Figure::DiscountImpact => "discount_impact",
        }
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Figure {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Figure::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownFigure(s.to_string()))
    }
}

/// Recompute one figure from the store and its filter.
pub fn render(store: &DatasetStore, filter: &FilterSpec) -> Result<ChartSpec> {
    match filter {
        FilterSpec::SalesOverTime(f) => sales_over_time::render(store, f),
        FilterSpec::Geography(f) => geography::render(store, f),
        FilterSpec::TopProducts(f) => top_products::render(store, f),
        FilterSpec::Seasonality(f) => seasonality::render(store, f),
        FilterSpec::DiscountImpact(f) => discount_impact::render(store, f),
    }
}

/// Decode the untagged filter body of `figure`.
pub fn parse_filter(figure: Figure, body: Value) -> Result<FilterSpec> {
    let invalid = |e: serde_json::Error| DashboardError::InvalidFilter(format!("{figure}: {e}"));
    Ok(match figure {
        Figure::SalesOverTime => {
            FilterSpec::SalesOverTime(serde_json::from_value(body).map_err(invalid)?)
        }
        Figure::Geography => FilterSpec::Geography(serde_json::from_value(body).map_err(invalid)?),
        Figure::TopProducts => {
            FilterSpec::TopProducts(serde_json::from_value(body).map_err(invalid)?)
        }
        Figure::Seasonality => {
            FilterSpec::Seasonality(serde_json::from_value(body).map_err(invalid)?)
        }
        Figure::DiscountImpact => {
            FilterSpec::DiscountImpact(serde_json::from_value(body).map_err(invalid)?)
        }
    })
}
