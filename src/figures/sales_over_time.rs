use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::aggregation::{f64_values, i32_values, Pipeline};
use crate::chart_spec::{palette, record, Axis, ChartSpec, Layout, Mark, DARK_TEMPLATE, UNIFIED_X_HOVER};
use crate::error::Result;
use crate::filters::{Measure, SalesOverTimeFilter};
use crate::schema::{derived, output, sales};
use crate::stats::trailing_mean;
use crate::store::{date_from_days, days_from_date, DatasetStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    /// Trailing moving average; `None` until the window has filled.
    pub value: Option<f64>,
}

/// One point per transaction in the date range, ascending by date, carrying
/// the trailing moving average of the measure.
pub fn aggregate(store: &DatasetStore, filter: &SalesOverTimeFilter) -> Result<Vec<TimePoint>> {
    if filter.dates.is_inverted() {
        return Ok(Vec::new());
    }

    let measure = filter.measure.column();
    let mut pipeline = Pipeline::new();
    if let Some(start) = filter.dates.start {
        pipeline = pipeline.filter(col(derived::ORDER_DAY).gt_eq(lit(days_from_date(start))));
    }
    if let Some(end) = filter.dates.end {
        pipeline = pipeline.filter(col(derived::ORDER_DAY).lt_eq(lit(days_from_date(end))));
    }
    let df = pipeline
        .select([col(derived::ORDER_DAY), col(measure)])
        .order_by([col(derived::ORDER_DAY)])
        .run(store.sales())?;

    let days = i32_values(&df, derived::ORDER_DAY)?;
    let averages = trailing_mean(&f64_values(&df, measure)?, filter.window);

    Ok(days
        .into_iter()
        .zip(averages)
        .filter_map(|(day, value)| {
            Some(TimePoint {
                date: date_from_days(day?)?,
                value,
            })
        })
        .collect())
}

/// Profit is drawn against the profit bounds of the whole dataset so the
/// scale stays put while the date range changes.
pub fn chart(store: &DatasetStore, filter: &SalesOverTimeFilter, points: &[TimePoint]) -> ChartSpec {
    let measure = filter.measure.to_string();

    let mut y = Axis::bound(output::MOVING_AVG).titled(&measure);
    if filter.measure == Measure::Profit {
        if let Some((min, max)) = store.domains().profit {
            y = y.range(min, max);
        }
    }

    let rows = points
        .iter()
        .map(|p| {
            record([
                (sales::ORDER_DATE, json!(p.date)),
                (output::MOVING_AVG, json!(p.value)),
            ])
        })
        .collect();

    ChartSpec::new(Mark::Line, format!("{measure} Over Time"))
        .x(Axis::bound(sales::ORDER_DATE).titled(sales::ORDER_DATE))
        .y(y)
        .line_color(palette::PRIMARY)
        .records(rows)
        .layout(
            Layout::themed()
                .template(DARK_TEMPLATE)
                .hovermode(UNIFIED_X_HOVER)
                .centered_title(),
        )
}

pub fn render(store: &DatasetStore, filter: &SalesOverTimeFilter) -> Result<ChartSpec> {
    let points = aggregate(store, filter)?;
    Ok(chart(store, filter, &points))
}
