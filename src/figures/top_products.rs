use polars::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::aggregation::{f64_values, str_values, Pipeline, Reducer};
use crate::chart_spec::{record, Axis, ChartSpec, Layout, Mark, Orientation, DARK_TEMPLATE};
use crate::error::Result;
use crate::filters::{ProductView, TopProductsFilter};
use crate::schema::sales;
use crate::store::DatasetStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyRow {
    pub category: String,
    pub sub_category: String,
    pub value: f64,
}

/// Sum the measure per (category, sub-category) within the selected
/// categories, ordered by category then sub-category.
pub fn aggregate(store: &DatasetStore, filter: &TopProductsFilter) -> Result<Vec<HierarchyRow>> {
    let Some(selected) = filter
        .categories
        .iter()
        .map(|c| col(sales::CATEGORY).eq(lit(c.as_str())))
        .reduce(|acc, p| acc.or(p))
    else {
        return Ok(Vec::new());
    };

    let measure = filter.measure.column();
    let df = Pipeline::new()
        .filter(selected)
        .group_by([col(sales::CATEGORY), col(sales::SUB_CATEGORY)])
        .reduce(Reducer::sum(measure))
        .order_by([col(sales::CATEGORY), col(sales::SUB_CATEGORY)])
        .run(store.sales())?;

    let categories = str_values(&df, sales::CATEGORY)?;
    let sub_categories = str_values(&df, sales::SUB_CATEGORY)?;
    let values = f64_values(&df, measure)?;

    Ok(categories
        .into_iter()
        .zip(sub_categories)
        .zip(values)
        .map(|((category, sub_category), value)| HierarchyRow {
            category,
            sub_category,
            value: value.unwrap_or(0.0),
        })
        .collect())
}

pub fn chart(filter: &TopProductsFilter, rows: &[HierarchyRow]) -> ChartSpec {
    let measure = filter.measure.column();
    let title = format!("{measure} by Category and Sub-Category");

    let records = rows
        .iter()
        .map(|r| {
            record([
                (sales::CATEGORY, json!(r.category)),
                (sales::SUB_CATEGORY, json!(r.sub_category)),
                (measure, json!(r.value)),
            ])
        })
        .collect();

    let spec = match filter.view {
        ProductView::Treemap => ChartSpec::new(Mark::Treemap, title)
            .path(&[sales::CATEGORY, sales::SUB_CATEGORY])
            .values(measure)
            .default_color(measure),
        ProductView::Bar => ChartSpec::new(Mark::Bar, title)
            .orientation(Orientation::Horizontal)
            .x(Axis::bound(measure))
            .y(Axis::bound(sales::SUB_CATEGORY))
            .blue_color(measure)
            .text_auto(),
    };

    spec.records(records)
        .layout(Layout::themed().template(DARK_TEMPLATE))
}

pub fn render(store: &DatasetStore, filter: &TopProductsFilter) -> Result<ChartSpec> {
    let rows = aggregate(store, filter)?;
    Ok(chart(filter, &rows))
}
