mod common;

use chrono::NaiveDate;
use common::{approx, load_store, processed_csv, write_tables, RAW_CSV};
use sales_dashboard::{DashboardError, DatasetStore};

#[test]
fn summary_matches_fixture_totals() {
    let store = load_store();
    let s = store.summary();
    assert!(approx(s.total_revenue, 880.0));
    assert!(approx(s.total_profit, 63.0));
    assert!(approx(s.total_units_sold, 16.0));
    assert_eq!(s.total_orders, 6);
    assert!(approx(s.avg_shipping_days.unwrap(), 3.5));
    assert!(approx(s.avg_discount_pct.unwrap(), 20.0));
    assert_eq!(store.len(), 6);
}

#[test]
fn control_domains_come_from_both_tables() {
    let store = load_store();
    let d = store.domains();
    assert_eq!(d.first_date, NaiveDate::from_ymd_opt(2023, 1, 1));
    assert_eq!(d.last_date, NaiveDate::from_ymd_opt(2023, 3, 15));
    assert_eq!(d.categories, vec!["Furniture", "Technology", "Office Supplies"]);
    assert_eq!(d.discount, Some((0.0, 0.5)));
    assert_eq!(d.profit, Some((-20.0, 40.0)));
}

#[test]
fn sales_column_falls_back_to_total_sales() {
    // Drop the eighth field (Sales) from every line.
    let csv: Vec<String> = processed_csv()
        .lines()
        .map(|line| {
            let mut fields: Vec<&str> = line.split(',').collect();
            fields.remove(7);
            fields.join(",")
        })
        .collect();
    let (_dir, processed, raw) = write_tables(csv.join("\n").as_bytes(), RAW_CSV.as_bytes());

    let store = DatasetStore::builder().processed(&processed).raw(&raw).load().unwrap();
    let sales: f64 = store
        .sales()
        .column("Sales")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .sum();
    assert!(approx(sales, 880.0));
}

#[test]
fn custom_date_format_is_honoured() {
    let csv = processed_csv()
        .replace("2023-01-01", "01/01/2023")
        .replace("2023-01-08", "01/08/2023")
        .replace("2023-01-02", "01/02/2023")
        .replace("2023-02-06", "02/06/2023")
        .replace("2023-03-15", "03/15/2023");
    let (_dir, processed, raw) = write_tables(csv.as_bytes(), RAW_CSV.as_bytes());

    let store = DatasetStore::builder()
        .processed(&processed)
        .raw(&raw)
        .date_format("%m/%d/%Y")
        .load()
        .unwrap();
    assert_eq!(store.domains().last_date, NaiveDate::from_ymd_opt(2023, 3, 15));
}

#[test]
fn latin1_input_is_accepted() {
    let mut bytes = processed_csv().into_bytes();
    let pos = bytes.windows(6).position(|w| w == b"Canada").unwrap();
    bytes.splice(pos..pos + 6, b"C\xf4te d'Ivoire".iter().copied());
    let (_dir, processed, raw) = write_tables(&bytes, RAW_CSV.as_bytes());

    let store = DatasetStore::builder().processed(&processed).raw(&raw).load().unwrap();
    let countries: Vec<String> = store
        .sales()
        .column("Country")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    assert!(countries.contains(&"Côte d'Ivoire".to_string()));
}

#[test]
fn missing_column_is_reported() {
    let csv = processed_csv().replace("Profit", "Margin");
    let (_dir, processed, raw) = write_tables(csv.as_bytes(), RAW_CSV.as_bytes());

    let err = DatasetStore::builder().processed(&processed).raw(&raw).load().unwrap_err();
    assert!(matches!(err, DashboardError::MissingColumn(c) if c == "Profit"));
}

#[test]
fn unparseable_date_is_rejected() {
    let csv = processed_csv().replace("2023-03-15", "someday");
    let (_dir, processed, raw) = write_tables(csv.as_bytes(), RAW_CSV.as_bytes());

    let err = DatasetStore::builder().processed(&processed).raw(&raw).load();
    assert!(err.is_err());
}

#[test]
fn missing_file_names_the_path() {
    let (_dir, _processed, raw) = write_tables(processed_csv().as_bytes(), RAW_CSV.as_bytes());
    let err = DatasetStore::builder()
        .processed("does/not/exist.csv")
        .raw(&raw)
        .load()
        .unwrap_err();
    assert!(matches!(err, DashboardError::Read { .. }));
    assert!(err.to_string().contains("does/not/exist.csv"));
}
