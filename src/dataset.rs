//! Dataset loading for the Superstore CSV layout.
//!
//! The loader reads the whole file once, resolves the required columns by
//! normalized header name, and parses each row into a typed [`Record`] while
//! keeping the verbatim fields for export. Any unreadable or unparsable row
//! aborts the load with a [`DataLoadError`]; there is no partial dataset.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use encoding_rs::Encoding;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    data::{normalize_column_name, parse_decimal, parse_naive_date, parse_quantity},
    error::DataLoadError,
    filter::Dimension,
    io_utils,
};

pub const DEFAULT_DATASET_FILE: &str = "Sample - Superstore.csv";

/// Largest absolute value accepted for a money or discount field. Keeps
/// summed totals far below `Decimal::MAX`.
pub const MAX_FIELD_MAGNITUDE: i64 = 1_000_000_000_000_000;

/// One sales transaction row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub ship_mode: String,
    pub customer_name: String,
    pub segment: String,
    pub state: String,
    pub region: String,
    pub category: String,
    pub sub_category: String,
    pub sales: Decimal,
    pub quantity: i64,
    pub discount: Decimal,
    pub profit: Decimal,
    /// Fields exactly as read, in input column order.
    pub raw: Vec<String>,
}

impl Record {
    /// Days between order and shipment.
    pub fn processing_days(&self) -> i64 {
        (self.ship_date - self.order_date).num_days()
    }

    pub fn dimension_value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Category => &self.category,
            Dimension::Region => &self.region,
            Dimension::SubCategory => &self.sub_category,
            Dimension::State => &self.state,
            Dimension::ShipMode => &self.ship_mode,
            Dimension::Segment => &self.segment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    OrderId,
    OrderDate,
    ShipDate,
    ShipMode,
    CustomerName,
    Segment,
    State,
    Region,
    Category,
    SubCategory,
    Sales,
    Quantity,
    Discount,
    Profit,
}

impl Field {
    const ALL: [Field; 14] = [
        Field::OrderId,
        Field::OrderDate,
        Field::ShipDate,
        Field::ShipMode,
        Field::CustomerName,
        Field::Segment,
        Field::State,
        Field::Region,
        Field::Category,
        Field::SubCategory,
        Field::Sales,
        Field::Quantity,
        Field::Discount,
        Field::Profit,
    ];

    fn header(self) -> &'static str {
        match self {
            Field::OrderId => "Order ID",
            Field::OrderDate => "Order Date",
            Field::ShipDate => "Ship Date",
            Field::ShipMode => "Ship Mode",
            Field::CustomerName => "Customer Name",
            Field::Segment => "Segment",
            Field::State => "State",
            Field::Region => "Region",
            Field::Category => "Category",
            Field::SubCategory => "Sub-Category",
            Field::Sales => "Sales",
            Field::Quantity => "Quantity",
            Field::Discount => "Discount",
            Field::Profit => "Profit",
        }
    }
}

/// Positions of the required fields within the input header row.
#[derive(Debug, Clone)]
struct ColumnMap {
    positions: [usize; Field::ALL.len()],
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, DataLoadError> {
        let normalized = headers
            .iter()
            .map(|h| normalize_column_name(h))
            .collect::<Vec<_>>();
        let mut positions = [0usize; Field::ALL.len()];
        for field in Field::ALL {
            let wanted = normalize_column_name(field.header());
            positions[field as usize] = normalized
                .iter()
                .position(|name| *name == wanted)
                .ok_or(DataLoadError::MissingColumn(field.header()))?;
        }
        Ok(Self { positions })
    }

    fn get<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        row.get(self.positions[field as usize])
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
}

/// Immutable, loaded-once dataset handle passed to every pipeline stage.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: PathBuf,
    headers: Vec<String>,
    delimiter: u8,
    records: Vec<Record>,
}

/// Values available for each filter control plus the order-date bounds.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilterOptions {
    pub min_order_date: Option<NaiveDate>,
    pub max_order_date: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub sub_categories: Vec<String>,
    pub states: Vec<String>,
    pub ship_modes: Vec<String>,
    pub segments: Vec<String>,
}

impl Dataset {
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self, DataLoadError> {
        if !path.exists() {
            return Err(DataLoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        let encoding = resolve_encoding(options.encoding.as_deref())?;
        info!(
            "Loading dataset '{}' (delimiter '{}', encoding {})",
            path.display(),
            crate::printable_delimiter(delimiter),
            encoding.name()
        );

        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true).map_err(
            |source| DataLoadError::Open {
                path: path.to_path_buf(),
                source,
            },
        )?;
        let header_record = reader
            .byte_headers()
            .map_err(|source| DataLoadError::Csv {
                path: path.to_path_buf(),
                row: 1,
                source,
            })?
            .clone();
        let headers = io_utils::decode_record(&header_record, encoding).ok_or(
            DataLoadError::Decode {
                row: 1,
                encoding: encoding.name(),
            },
        )?;
        let columns = ColumnMap::resolve(&headers)?;
        debug!("Resolved dataset columns: {:?}", columns.positions);

        let mut records = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let row = idx + 2;
            let record = record.map_err(|source| DataLoadError::Csv {
                path: path.to_path_buf(),
                row,
                source,
            })?;
            let decoded = io_utils::decode_record(&record, encoding).ok_or(
                DataLoadError::Decode {
                    row,
                    encoding: encoding.name(),
                },
            )?;
            records.push(parse_record(&columns, decoded, row)?);
        }
        info!("Loaded {} record(s) from {:?}", records.len(), path);

        Ok(Self {
            source: path.to_path_buf(),
            headers,
            delimiter,
            records,
        })
    }

    /// Builds a dataset from already-parsed records, e.g. for tests and
    /// benchmarks.
    pub fn from_records(headers: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            source: PathBuf::new(),
            headers,
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            records,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn distinct(&self, dimension: Dimension) -> BTreeSet<&str> {
        self.records
            .iter()
            .map(|record| record.dimension_value(dimension))
            .collect()
    }

    pub fn options(&self) -> FilterOptions {
        let collect = |dimension| {
            self.distinct(dimension)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        FilterOptions {
            min_order_date: self.records.iter().map(|r| r.order_date).min(),
            max_order_date: self.records.iter().map(|r| r.order_date).max(),
            categories: collect(Dimension::Category),
            regions: collect(Dimension::Region),
            sub_categories: collect(Dimension::SubCategory),
            states: collect(Dimension::State),
            ship_modes: collect(Dimension::ShipMode),
            segments: collect(Dimension::Segment),
        }
    }
}

/// Looks for the default dataset file in the working directory, then its
/// parent.
pub fn locate_default_dataset() -> Result<PathBuf, DataLoadError> {
    [
        PathBuf::from(DEFAULT_DATASET_FILE),
        Path::new("..").join(DEFAULT_DATASET_FILE),
    ]
    .into_iter()
    .find(|candidate| candidate.exists())
    .ok_or(DataLoadError::DefaultNotFound)
}

fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, DataLoadError> {
    io_utils::resolve_encoding(label)
        .ok_or_else(|| DataLoadError::UnknownEncoding(label.unwrap_or_default().to_string()))
}

fn parse_record(columns: &ColumnMap, raw: Vec<String>, row: usize) -> Result<Record, DataLoadError> {
    let text = |field| columns.get(&raw, field).trim().to_string();
    let invalid = |field: Field| DataLoadError::InvalidField {
        row,
        column: field.header(),
        value: columns.get(&raw, field).to_string(),
    };
    let date = |field| parse_naive_date(columns.get(&raw, field)).map_err(|_| invalid(field));
    let money = |field| match parse_decimal(columns.get(&raw, field)) {
        Ok(value) if value.abs() <= Decimal::from(MAX_FIELD_MAGNITUDE) => Ok(value),
        _ => Err(invalid(field)),
    };

    Ok(Record {
        order_id: text(Field::OrderId),
        order_date: date(Field::OrderDate)?,
        ship_date: date(Field::ShipDate)?,
        ship_mode: text(Field::ShipMode),
        customer_name: text(Field::CustomerName),
        segment: text(Field::Segment),
        state: text(Field::State),
        region: text(Field::Region),
        category: text(Field::Category),
        sub_category: text(Field::SubCategory),
        sales: money(Field::Sales)?,
        quantity: parse_quantity(columns.get(&raw, Field::Quantity))
            .map_err(|_| invalid(Field::Quantity))?,
        discount: money(Field::Discount)?,
        profit: money(Field::Profit)?,
        raw,
    })
}
