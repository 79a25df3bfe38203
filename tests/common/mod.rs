//! Shared test fixtures for the dashboard integration tests.
//!
//! Provides `load_store()` which writes a small processed table and raw
//! table into a temp directory and loads them through the store builder.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use sales_dashboard::DatasetStore;
use tempfile::TempDir;

pub const PROCESSED_HEADER: &str = "Order Date,Category,Sub-Category,Country,Region,Market,Quantity,Sales,Total_sales,Profit,Discount,Shipping Time (Days)";

/// Six transactions over three categories. Dataset order matters for
/// tie-breaking and category order.
pub const PROCESSED_ROWS: [&str; 6] = [
    "2023-01-01,Furniture,Chairs,United States,West,US,2,100,100,10,0.0,3",
    "2023-01-08,Technology,Phones,Canada,North,Canada,1,200,200,40,0.2,5",
    "2023-01-02,Office Supplies,Paper,United States,East,US,5,50,50,-5,0.4,2",
    "2023-02-06,Furniture,Tables,France,Central,EU,3,300,300,-20,0.5,4",
    "2023-03-15,Technology,Phones,France,Central,EU,4,150,150,30,0.1,6",
    "2023-02-06,Furniture,Chairs,Canada,North,Canada,1,80,80,8,0.2,1",
];

pub const RAW_CSV: &str = "Order ID,Discount\nA-1,0.0\nA-2,0.1\nA-3,0.2\nA-4,0.5\n";

pub fn processed_csv() -> String {
    let mut s = String::from(PROCESSED_HEADER);
    for row in PROCESSED_ROWS {
        s.push('\n');
        s.push_str(row);
    }
    s.push('\n');
    s
}

/// Write `processed` and `raw` into a fresh temp directory.
///
/// Returns `(TempDir, processed_path, raw_path)`. The caller must keep the
/// `TempDir` alive while the paths are in use.
pub fn write_tables(processed: &[u8], raw: &[u8]) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let processed_path = dir.path().join("processed.csv");
    let raw_path = dir.path().join("raw.csv");
    fs::write(&processed_path, processed).unwrap();
    fs::write(&raw_path, raw).unwrap();
    (dir, processed_path, raw_path)
}

pub fn load_store() -> DatasetStore {
    let (_dir, processed, raw) = write_tables(processed_csv().as_bytes(), RAW_CSV.as_bytes());
    DatasetStore::builder()
        .processed(&processed)
        .raw(&raw)
        .load()
        .unwrap()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
