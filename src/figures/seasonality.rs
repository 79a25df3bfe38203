use polars::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::aggregation::{f64_values, i32_values, Pipeline, Reducer};
use crate::chart_spec::{palette, record, Axis, ChartSpec, Layout, Mark, DARK_TEMPLATE};
use crate::error::Result;
use crate::filters::{SeasonalityFilter, SeasonalityView};
use crate::schema::{derived, output, sales};
use crate::store::DatasetStore;

/// Month abbreviations in calendar order.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Day names, Monday first.
pub const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Total sales by day of week (rows) and month (columns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    pub cells: [[Option<f64>; 12]; 7],
}

impl HeatmapMatrix {
    /// `weekday` is 1 (Monday) ..= 7, `month` is 1 ..= 12.
    pub fn get(&self, weekday: u32, month: u32) -> Option<f64> {
        let row = self.cells.get(weekday.checked_sub(1)? as usize)?;
        *row.get(month.checked_sub(1)? as usize)?
    }

    pub fn rows(&self) -> Vec<Vec<Option<f64>>> {
        self.cells.iter().map(|r| r.to_vec()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    /// 1 ..= 12.
    pub month: u32,
    pub value: f64,
}

impl MonthTotal {
    pub fn name(&self) -> &'static str {
        month_name(self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityAggregation {
    Heatmap(HeatmapMatrix),
    Monthly(Vec<MonthTotal>),
}

fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i as usize))
        .copied()
        .unwrap_or("")
}

pub fn aggregate(store: &DatasetStore, filter: &SeasonalityFilter) -> Result<SeasonalityAggregation> {
    let in_category = col(sales::CATEGORY).eq(lit(filter.category.as_str()));

    match filter.view {
        SeasonalityView::Heatmap => {
            let df = Pipeline::new()
                .filter(in_category)
                .group_by([col(derived::WEEKDAY), col(derived::MONTH)])
                .reduce(Reducer::sum(sales::TOTAL_SALES))
                .run(store.sales())?;

            let mut cells = [[None; 12]; 7];
            let weekdays = i32_values(&df, derived::WEEKDAY)?;
            let months = i32_values(&df, derived::MONTH)?;
            let totals = f64_values(&df, sales::TOTAL_SALES)?;
            for ((weekday, month), total) in weekdays.into_iter().zip(months).zip(totals) {
                if let (Some(w @ 1..=7), Some(m @ 1..=12)) = (weekday, month) {
                    cells[(w - 1) as usize][(m - 1) as usize] = total;
                }
            }
            Ok(SeasonalityAggregation::Heatmap(HeatmapMatrix { cells }))
        }
        SeasonalityView::Line => {
            let df = Pipeline::new()
                .filter(in_category)
                .group_by([col(derived::MONTH)])
                .reduce(Reducer::sum(sales::TOTAL_SALES))
                .order_by([col(derived::MONTH)])
                .run(store.sales())?;

            let months = i32_values(&df, derived::MONTH)?;
            let totals = f64_values(&df, sales::TOTAL_SALES)?;
            Ok(SeasonalityAggregation::Monthly(
                months
                    .into_iter()
                    .zip(totals)
                    .filter_map(|(month, total)| {
                        Some(MonthTotal {
                            month: u32::try_from(month?).ok()?,
                            value: total.unwrap_or(0.0),
                        })
                    })
                    .collect(),
            ))
        }
    }
}

pub fn chart(filter: &SeasonalityFilter, agg: &SeasonalityAggregation) -> ChartSpec {
    let category = &filter.category;

    let spec = match agg {
        SeasonalityAggregation::Heatmap(matrix) => {
            ChartSpec::new(Mark::Heatmap, format!("Sales Heatmap for {category}"))
                .x(Axis::bound(derived::MONTH).titled(derived::MONTH))
                .y(Axis::bound(output::DAY_OF_WEEK).titled(output::DAY_OF_WEEK))
                .blue_color(sales::TOTAL_SALES)
                .color_label("Sales")
                .matrix(
                    MONTHS.iter().map(|m| m.to_string()).collect(),
                    DAYS.iter().map(|d| d.to_string()).collect(),
                    matrix.rows(),
                )
        }
        SeasonalityAggregation::Monthly(months) => {
            let rows = months
                .iter()
                .map(|m| {
                    record([
                        (derived::MONTH, json!(m.name())),
                        (sales::TOTAL_SALES, json!(m.value)),
                    ])
                })
                .collect();
            ChartSpec::new(Mark::Line, format!("Monthly Sales Trend for {category}"))
                .x(Axis::bound(derived::MONTH))
                .y(Axis::bound(sales::TOTAL_SALES))
                .line_color(palette::PRIMARY)
                .records(rows)
        }
    };

    spec.layout(Layout::themed().template(DARK_TEMPLATE).centered_title())
}

pub fn render(store: &DatasetStore, filter: &SeasonalityFilter) -> Result<ChartSpec> {
    let agg = aggregate(store, filter)?;
    Ok(chart(filter, &agg))
}
