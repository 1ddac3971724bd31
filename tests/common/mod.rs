#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use superstore_dash::dataset::{Dataset, LoadOptions, Record};
use tempfile::{TempDir, tempdir};

pub const SAMPLE_FILE: &str = "superstore_sample.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads the twelve-row Superstore sample.
pub fn sample_dataset() -> Dataset {
    Dataset::load(&fixture_path(SAMPLE_FILE), &LoadOptions::default()).expect("load sample")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Minimal record for synthetic datasets; override fields as needed.
pub fn record(order_id: &str, customer: &str, sales: &str, profit: &str) -> Record {
    Record {
        order_id: order_id.to_string(),
        order_date: date(2016, 1, 15),
        ship_date: date(2016, 1, 18),
        ship_mode: "Standard Class".to_string(),
        customer_name: customer.to_string(),
        segment: "Consumer".to_string(),
        state: "Texas".to_string(),
        region: "Central".to_string(),
        category: "Furniture".to_string(),
        sub_category: "Chairs".to_string(),
        sales: dec(sales),
        quantity: 1,
        discount: Decimal::ZERO,
        profit: dec(profit),
        raw: vec![order_id.to_string(), customer.to_string()],
    }
}

pub fn synthetic(records: Vec<Record>) -> Dataset {
    Dataset::from_records(
        vec!["Order ID".to_string(), "Customer Name".to_string()],
        records,
    )
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}
