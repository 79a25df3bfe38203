use polars::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::aggregation::{f64_values, str_values, Pipeline, Reducer};
use crate::chart_spec::{record, Axis, ChartSpec, Layout, Mark, COUNTRY_NAMES};
use crate::error::Result;
use crate::filters::{Dimension, GeographyFilter, Metric};
use crate::store::DatasetStore;

/// How the groups must be drawn. Countries go on a map, everything else on
/// a bar chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Choropleth,
    Bar,
}

impl Geometry {
    pub fn for_dimension(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Country => Geometry::Choropleth,
            Dimension::Region | Dimension::Market => Geometry::Bar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionalAggregation {
    pub dimension: Dimension,
    pub metric: Metric,
    pub geometry: Geometry,
    /// Sorted by key.
    pub groups: Vec<GroupTotal>,
}

impl DimensionalAggregation {
    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.value).sum()
    }
}

pub fn aggregate(store: &DatasetStore, filter: &GeographyFilter) -> Result<DimensionalAggregation> {
    let key = filter.dimension.column();
    let metric = filter.metric.column();

    let df = Pipeline::new()
        .group_by([col(key)])
        .reduce(Reducer::sum(metric))
        .order_by([col(key)])
        .run(store.sales())?;

    let groups = str_values(&df, key)?
        .into_iter()
        .zip(f64_values(&df, metric)?)
        .map(|(key, value)| GroupTotal {
            key,
            value: value.unwrap_or(0.0),
        })
        .collect();

    Ok(DimensionalAggregation {
        dimension: filter.dimension,
        metric: filter.metric,
        geometry: Geometry::for_dimension(filter.dimension),
        groups,
    })
}

pub fn chart(agg: &DimensionalAggregation) -> ChartSpec {
    let dimension = agg.dimension.column();
    let metric = agg.metric.column();

    let rows = agg
        .groups
        .iter()
        .map(|g| record([(dimension, json!(g.key)), (metric, json!(g.value))]))
        .collect();

    let spec = match agg.geometry {
        Geometry::Choropleth => ChartSpec::new(Mark::Choropleth, format!("{metric} by Country"))
            .x(Axis::bound(dimension).titled(dimension))
            .y(Axis::default().titled(metric))
            .location_mode(COUNTRY_NAMES),
        Geometry::Bar => ChartSpec::new(Mark::Bar, format!("{metric} by {dimension}"))
            .x(Axis::bound(dimension).titled(dimension))
            .y(Axis::bound(metric).titled(metric))
            .text_auto(),
    };

    spec.blue_color(metric)
        .records(rows)
        .layout(Layout::themed().centered_title())
}

pub fn render(store: &DatasetStore, filter: &GeographyFilter) -> Result<ChartSpec> {
    Ok(chart(&aggregate(store, filter)?))
}
