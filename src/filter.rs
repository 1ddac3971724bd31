//! Filter stage: turns a [`FilterSelection`] into a [`FilteredView`].
//!
//! A record passes when its order date lies inside the inclusive date bounds
//! and, for every dimension with a non-empty value set, its value for that
//! dimension is in the set. An empty set places no restriction.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{Dataset, Record},
    error::SelectionError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    Region,
    SubCategory,
    State,
    ShipMode,
    Segment,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Category,
        Dimension::Region,
        Dimension::SubCategory,
        Dimension::State,
        Dimension::ShipMode,
        Dimension::Segment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Region => "region",
            Dimension::SubCategory => "sub-category",
            Dimension::State => "state",
            Dimension::ShipMode => "ship-mode",
            Dimension::Segment => "segment",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dimension {
    type Err = SelectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let folded = value.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match folded.strip_suffix('s').unwrap_or(folded.as_str()) {
            "category" | "categorie" => Ok(Dimension::Category),
            "region" => Ok(Dimension::Region),
            "sub-category" | "sub-categorie" | "subcategory" | "subcategorie" => {
                Ok(Dimension::SubCategory)
            }
            "state" => Ok(Dimension::State),
            "ship-mode" | "shipmode" => Ok(Dimension::ShipMode),
            "segment" => Ok(Dimension::Segment),
            _ => Err(SelectionError::UnknownDimension(value.to_string())),
        }
    }
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    values: BTreeMap<Dimension, BTreeSet<String>>,
}

impl FilterSelection {
    /// Selection that admits every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_range(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, SelectionError> {
        let mut selection = Self::default();
        selection.set_range(start, end)?;
        Ok(selection)
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn set_range(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<(), SelectionError> {
        check_range(start, end)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    pub fn set_start(&mut self, start: Option<NaiveDate>) -> Result<(), SelectionError> {
        self.set_range(start, self.end)
    }

    pub fn set_end(&mut self, end: Option<NaiveDate>) -> Result<(), SelectionError> {
        self.set_range(self.start, end)
    }

    /// Values chosen for `dimension`; empty means unrestricted.
    pub fn values(&self, dimension: Dimension) -> impl Iterator<Item = &str> {
        self.values
            .get(&dimension)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = values
            .into_iter()
            .map(Into::into)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>();
        if set.is_empty() {
            self.values.remove(&dimension);
        } else {
            self.values.insert(dimension, set);
        }
    }

    /// Adds `value` to the dimension's set, or removes it when already present.
    pub fn toggle(&mut self, dimension: Dimension, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let set = self.values.entry(dimension).or_default();
        if !set.remove(value) {
            set.insert(value.to_string());
        }
        if set.is_empty() {
            self.values.remove(&dimension);
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        self.values.remove(&dimension);
    }

    /// Re-checks the date-range invariant.
    pub fn validate(&self) -> Result<(), SelectionError> {
        check_range(self.start, self.end)
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.start.is_some_and(|start| record.order_date < start) {
            return false;
        }
        if self.end.is_some_and(|end| record.order_date > end) {
            return false;
        }
        self.values.iter().all(|(dimension, allowed)| {
            allowed.is_empty() || allowed.contains(record.dimension_value(*dimension))
        })
    }

    /// Logs selected values that no record in `dataset` carries.
    pub fn warn_unknown_values(&self, dataset: &Dataset) {
        for (dimension, allowed) in &self.values {
            let known = dataset.distinct(*dimension);
            for value in allowed {
                if !known.contains(value.as_str()) {
                    warn!("No record has {dimension} '{value}'");
                }
            }
        }
    }
}

fn check_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), SelectionError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(SelectionError::InvertedRange { start, end }),
        _ => Ok(()),
    }
}

impl fmt::Display for FilterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |date: Option<NaiveDate>| {
            date.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        write!(f, "order date {}..{}", bound(self.start), bound(self.end))?;
        for (dimension, allowed) in &self.values {
            let joined = allowed.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            write!(f, "; {dimension} in [{joined}]")?;
        }
        Ok(())
    }
}

/// Records matching a selection, borrowed from the dataset in input order.
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    records: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Narrows this view further; used to show filtering is idempotent.
    pub fn refine(&self, selection: &FilterSelection) -> FilteredView<'a> {
        filter(self.records.iter().copied(), selection)
    }
}

impl<'a> FromIterator<&'a Record> for FilteredView<'a> {
    fn from_iter<T: IntoIterator<Item = &'a Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

pub fn filter<'a, I>(records: I, selection: &FilterSelection) -> FilteredView<'a>
where
    I: IntoIterator<Item = &'a Record>,
{
    let view = records
        .into_iter()
        .filter(|record| selection.matches(record))
        .collect::<FilteredView<'a>>();
    debug!("Selection [{selection}] kept {} record(s)", view.len());
    view
}

pub fn filter_dataset<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> FilteredView<'a> {
    filter(dataset.records(), selection)
}
