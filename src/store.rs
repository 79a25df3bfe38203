//! Immutable in-memory dataset loaded once at startup.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregation::{scalar, str_values, Pipeline, Reducer};
use crate::config;
use crate::error::{DashboardError, Result};
use crate::schema::{derived, raw, sales};
use crate::stats::round_to;

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_units_sold: f64,
    /// Mean raw discount as a percentage.
    pub avg_discount_pct: Option<f64>,
    pub total_orders: usize,
    pub avg_shipping_days: Option<f64>,
}

/// Value domains the input controls are initialised from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlDomains {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Categories in order of first appearance.
    pub categories: Vec<String>,
    /// Raw-table discount bounds.
    pub discount: Option<(f64, f64)>,
    /// Profit bounds over the whole processed table.
    pub profit: Option<(f64, f64)>,
}

// ── Builder ─────────────────────────────────────────────────────────────────

pub struct DatasetStoreBuilder {
    processed: PathBuf,
    raw: PathBuf,
    date_format: String,
}

impl Default for DatasetStoreBuilder {
    fn default() -> Self {
        Self {
            processed: PathBuf::from(config::DEFAULT_PROCESSED_PATH),
            raw: PathBuf::from(config::DEFAULT_RAW_PATH),
            date_format: config::DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl DatasetStoreBuilder {
    /// Path of the processed transaction table.
    pub fn processed<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.processed = path.as_ref().to_path_buf();
        self
    }

    /// Path of the raw transaction table.
    pub fn raw<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.raw = path.as_ref().to_path_buf();
        self
    }

    /// strftime format of the `Order Date` column.
    pub fn date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn load(self) -> Result<DatasetStore> {
        let sales = read_csv_as_strings(&self.processed)?;
        let raw = read_csv_as_strings(&self.raw)?;
        let store = DatasetStore::from_frames(sales, raw, &self.date_format)?;
        info!(
            processed = %self.processed.display(),
            raw = %self.raw.display(),
            rows = store.sales.height(),
            raw_rows = store.raw.height(),
            "dataset loaded"
        );
        Ok(store)
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Processed and raw transaction tables plus everything derived from them
/// at load. Nothing here changes after construction.
#[derive(Debug)]
pub struct DatasetStore {
    sales: DataFrame,
    raw: DataFrame,
    summary: Summary,
    domains: ControlDomains,
}

impl DatasetStore {
    pub fn builder() -> DatasetStoreBuilder {
        DatasetStoreBuilder::default()
    }

    /// Build a store from frames whose columns are still strings.
    pub fn from_frames(sales: DataFrame, raw: DataFrame, date_format: &str) -> Result<Self> {
        let sales = prepare_sales(sales, date_format)?;
        let raw = prepare_raw(raw)?;
        let summary = summarize(&sales, &raw)?;
        let domains = control_domains(&sales, &raw)?;
        debug!(?summary, categories = domains.categories.len(), "store derived values computed");
        Ok(Self {
            sales,
            raw,
            summary,
            domains,
        })
    }

    pub fn sales(&self) -> &DataFrame {
        &self.sales
    }

    pub fn raw(&self) -> &DataFrame {
        &self.raw
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn domains(&self) -> &ControlDomains {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.sales.height()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.height() == 0
    }
}

// ── Loading helpers ─────────────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype and trimmed headers.
/// Files that are not valid UTF-8 are decoded as Latin-1.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame> {
    let bytes = std::fs::read(path).map_err(|source| DashboardError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_text(bytes);

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

fn decode_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| e.into_bytes().into_iter().map(char::from).collect())
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(DashboardError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn require_non_null(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for &col_name in columns {
        let null_count = df.column(col_name)?.null_count();
        if null_count > 0 {
            return Err(DashboardError::InvalidData(format!(
                "Column '{}' has {} missing or unparseable values",
                col_name, null_count
            )));
        }
    }
    Ok(())
}

fn parse_float(column: &str) -> Expr {
    col(column)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .cast(DataType::Float64)
}

fn prepare_sales(df: DataFrame, date_format: &str) -> Result<DataFrame> {
    require_columns(&df, &sales::REQUIRED)?;
    let has_sales = df.schema().contains(sales::SALES);

    let mut numeric: Vec<Expr> = sales::NUMERIC.iter().map(|c| parse_float(c)).collect();
    if has_sales {
        numeric.push(parse_float(sales::SALES));
    }

    let order_date = col(sales::ORDER_DATE)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .str()
        .to_date(StrptimeOptions {
            format: Some(date_format.into()),
            strict: true,
            ..Default::default()
        });

    let mut lazy = df
        .lazy()
        .with_columns(numeric)
        .with_column(order_date.alias(sales::ORDER_DATE));
    if !has_sales {
        lazy = lazy.with_column(col(sales::TOTAL_SALES).alias(sales::SALES));
    }
    let df = lazy
        .with_columns([
            col(sales::ORDER_DATE)
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias(derived::MONTH),
            col(sales::ORDER_DATE)
                .dt()
                .weekday()
                .cast(DataType::Int32)
                .alias(derived::WEEKDAY),
            col(sales::ORDER_DATE)
                .cast(DataType::Int32)
                .alias(derived::ORDER_DAY),
        ])
        .collect()?;

    require_non_null(&df, &[sales::ORDER_DATE, sales::SALES])?;
    require_non_null(&df, &sales::NUMERIC)?;
    Ok(df)
}

fn prepare_raw(df: DataFrame) -> Result<DataFrame> {
    require_columns(&df, &[raw::DISCOUNT])?;
    Ok(df
        .lazy()
        .with_column(parse_float(raw::DISCOUNT))
        .collect()?)
}

fn summarize(sales_df: &DataFrame, raw_df: &DataFrame) -> Result<Summary> {
    let totals = Pipeline::new()
        .reduce(Reducer::sum(sales::TOTAL_SALES))
        .reduce(Reducer::sum(sales::PROFIT))
        .reduce(Reducer::sum(sales::QUANTITY))
        .reduce(Reducer::mean(sales::SHIPPING_DAYS).alias("shipping"))
        .run(sales_df)?;
    let discount = Pipeline::new()
        .reduce(Reducer::mean(raw::DISCOUNT).alias("discount"))
        .run(raw_df)?;

    let orders = sales_df.column(sales::ORDER_DATE)?;
    Ok(Summary {
        total_revenue: round_to(scalar(&totals, sales::TOTAL_SALES)?.unwrap_or(0.0), 2),
        total_profit: round_to(scalar(&totals, sales::PROFIT)?.unwrap_or(0.0), 2),
        total_units_sold: round_to(scalar(&totals, sales::QUANTITY)?.unwrap_or(0.0), 2),
        avg_discount_pct: scalar(&discount, "discount")?.map(|d| round_to(d * 100.0, 2)),
        total_orders: orders.len() - orders.null_count(),
        avg_shipping_days: scalar(&totals, "shipping")?.map(|d| round_to(d, 2)),
    })
}

fn control_domains(sales_df: &DataFrame, raw_df: &DataFrame) -> Result<ControlDomains> {
    let bounds = Pipeline::new()
        .reduce(Reducer::min(derived::ORDER_DAY).alias("first"))
        .reduce(Reducer::max(derived::ORDER_DAY).alias("last"))
        .reduce(Reducer::min(sales::PROFIT).alias("profit_min"))
        .reduce(Reducer::max(sales::PROFIT).alias("profit_max"))
        .run(sales_df)?;
    let discount = Pipeline::new()
        .reduce(Reducer::min(raw::DISCOUNT).alias("low"))
        .reduce(Reducer::max(raw::DISCOUNT).alias("high"))
        .run(raw_df)?;
    let categories = Pipeline::new()
        .filter(col(sales::CATEGORY).is_not_null())
        .group_by([col(sales::CATEGORY)])
        .reduce(Reducer::count(sales::CATEGORY).alias("rows"))
        .run(sales_df)?;

    let day = |name: &str| -> Result<Option<NaiveDate>> {
        Ok(scalar(&bounds, name)?.and_then(|d| date_from_days(d as i32)))
    };
    let pair = |df: &DataFrame, lo: &str, hi: &str| -> Result<Option<(f64, f64)>> {
        Ok(scalar(df, lo)?.zip(scalar(df, hi)?))
    };

    Ok(ControlDomains {
        first_date: day("first")?,
        last_date: day("last")?,
        categories: str_values(&categories, sales::CATEGORY)?,
        discount: pair(&discount, "low", "high")?,
        profit: pair(&bounds, "profit_min", "profit_max")?,
    })
}

// ── Date helpers ────────────────────────────────────────────────────────────

const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Date for a count of days since 1970-01-01.
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_CE_DAYS)?)
}

/// Days since 1970-01-01, the physical encoding of polars Date values.
pub fn days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}
