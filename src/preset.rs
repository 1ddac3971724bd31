//! YAML filter presets.
//!
//! A preset stores a reusable filter selection:
//!
//! ```yaml
//! start: 2016-01-01
//! end: 2016-12-31
//! categories: [Furniture, Technology]
//! regions: [West]
//! ```
//!
//! Command-line filter flags are layered on top of a loaded preset with
//! [`FilterPreset::overlay`].

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::SelectionError,
    filter::{Dimension, FilterSelection},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterPreset {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub sub_categories: Vec<String>,
    pub states: Vec<String>,
    pub ship_modes: Vec<String>,
    pub segments: Vec<String>,
}

impl FilterPreset {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening preset file {path:?}"))?;
        let preset: FilterPreset = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing preset YAML {path:?}"))?;
        Ok(preset)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating preset file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing preset YAML")
    }

    pub fn from_selection(selection: &FilterSelection) -> Self {
        let mut preset = FilterPreset {
            start: selection.start(),
            end: selection.end(),
            ..Default::default()
        };
        for dimension in Dimension::ALL {
            *preset.values_mut(dimension) =
                selection.values(dimension).map(str::to_string).collect();
        }
        preset
    }

    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Category => &self.categories,
            Dimension::Region => &self.regions,
            Dimension::SubCategory => &self.sub_categories,
            Dimension::State => &self.states,
            Dimension::ShipMode => &self.ship_modes,
            Dimension::Segment => &self.segments,
        }
    }

    fn values_mut(&mut self, dimension: Dimension) -> &mut Vec<String> {
        match dimension {
            Dimension::Category => &mut self.categories,
            Dimension::Region => &mut self.regions,
            Dimension::SubCategory => &mut self.sub_categories,
            Dimension::State => &mut self.states,
            Dimension::ShipMode => &mut self.ship_modes,
            Dimension::Segment => &mut self.segments,
        }
    }

    /// Fields set in `overrides` replace the ones in `self`.
    pub fn overlay(mut self, overrides: FilterPreset) -> Self {
        if overrides.start.is_some() {
            self.start = overrides.start;
        }
        if overrides.end.is_some() {
            self.end = overrides.end;
        }
        for dimension in Dimension::ALL {
            let values = overrides.values(dimension);
            if !values.is_empty() {
                *self.values_mut(dimension) = values.to_vec();
            }
        }
        self
    }

    pub fn to_selection(&self) -> Result<FilterSelection, SelectionError> {
        let mut selection = FilterSelection::with_range(self.start, self.end)?;
        for dimension in Dimension::ALL {
            selection.select(dimension, self.values(dimension).iter().cloned());
        }
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_preset_parses_dates_and_lists() {
        let yaml = "start: 2016-01-01\nend: 2016-12-31\ncategories: [Furniture]\nship_modes:\n  - First Class\n";
        let preset: FilterPreset = serde_yaml::from_str(yaml).expect("parse preset");
        assert_eq!(preset.start, NaiveDate::from_ymd_opt(2016, 1, 1));
        assert_eq!(preset.categories, vec!["Furniture".to_string()]);
        assert_eq!(preset.ship_modes, vec!["First Class".to_string()]);
        assert!(preset.regions.is_empty());
    }

    #[test]
    fn unknown_preset_keys_are_rejected() {
        let err = serde_yaml::from_str::<FilterPreset>("colour: red\n");
        assert!(err.is_err());
    }

    #[test]
    fn overlay_prefers_overrides_per_field() {
        let base = FilterPreset {
            start: NaiveDate::from_ymd_opt(2015, 1, 1),
            categories: vec!["Furniture".into()],
            regions: vec!["West".into()],
            ..Default::default()
        };
        let overrides = FilterPreset {
            regions: vec!["East".into()],
            ..Default::default()
        };
        let merged = base.overlay(overrides);
        assert_eq!(merged.start, NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(merged.categories, vec!["Furniture".to_string()]);
        assert_eq!(merged.regions, vec!["East".to_string()]);
    }

    #[test]
    fn inverted_preset_range_fails_selection() {
        let preset = FilterPreset {
            start: NaiveDate::from_ymd_opt(2017, 1, 1),
            end: NaiveDate::from_ymd_opt(2016, 1, 1),
            ..Default::default()
        };
        assert!(matches!(
            preset.to_selection(),
            Err(SelectionError::InvertedRange { .. })
        ));
    }

    #[test]
    fn selection_round_trips_through_preset() {
        let mut selection = FilterSelection::all();
        selection.select(Dimension::Segment, ["Consumer"]);
        let preset = FilterPreset::from_selection(&selection);
        assert_eq!(preset.to_selection().unwrap(), selection);
    }
}
