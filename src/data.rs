use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use heck::ToSnakeCase;
use rust_decimal::Decimal;

/// Parses a calendar date, accepting an optional trailing time component.
///
/// Slash-separated dates are read month first, which is how the Superstore
/// export writes them (`11/8/2016`). Years must carry four digits, so
/// `1/2/16` is rejected instead of landing in year 16.
pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y"];
    let trimmed = value.trim();
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_naive_datetime(trimmed).ok().map(|dt| dt.date()));
    match parsed {
        Some(date) if (1000..=9999).contains(&date.year()) => Ok(date),
        _ => Err(anyhow!("Failed to parse '{value}' as date")),
    }
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Parses a money or fraction field into an exact decimal.
///
/// Tolerates a leading currency symbol, thousands separators, and the
/// scientific notation some spreadsheet exports emit.
pub fn parse_decimal(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty numeric value"));
    }
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let cleaned = unsigned
        .trim_start_matches(['$', '€', '£'])
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect::<String>();
    if cleaned.starts_with(['+', '-']) {
        return Err(anyhow!("Failed to parse '{value}' as decimal"));
    }
    let parsed = if cleaned.contains(['e', 'E']) {
        Decimal::from_scientific(&cleaned)
    } else {
        Decimal::from_str(&cleaned)
    }
    .with_context(|| format!("Failed to parse '{value}' as decimal"))?;
    Ok(if negative { -parsed } else { parsed })
}

pub fn parse_quantity(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .with_context(|| format!("Failed to parse '{value}' as integer"))
}

/// Folds a header into a comparison key: `Sub-Category`, `sub_category`, and
/// `SubCategory` all become `sub_category`.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_snake_case()
}
