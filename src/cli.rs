use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{data::parse_naive_date, preset::FilterPreset};

#[derive(Debug, Parser)]
#[command(author, version, about = "Filter, summarize, and chart a Superstore sales dataset", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Key metrics, monthly trend, category/region breakdowns, and shipping times
    Overview(TabArgs),
    /// Sales by sub-category, ship mode, segment, top customers, and top states
    Sales(TabArgs),
    /// Profit hierarchy, sales/profit scatter, discount impact, and losses
    Profit(TabArgs),
    /// Render every tab in sequence
    Dashboard(TabArgs),
    /// Write the filtered rows, verbatim, to a CSV file or stdout
    Export(ExportArgs),
    /// List the filter values and order-date range present in the dataset
    Options(OptionsArgs),
    /// Apply filter changes typed on stdin and re-render after each one
    Explore(ExploreArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DatasetArgs {
    /// Input dataset (defaults to 'Sample - Superstore.csv' in the current or parent directory)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8; the public Superstore file is latin1)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// YAML preset with saved filters; explicit flags override its fields
    #[arg(long)]
    pub preset: Option<PathBuf>,
    /// First order date to include (inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,
    /// Last order date to include (inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    pub end: Option<NaiveDate>,
    /// Categories to include (repeatable or comma-separated; omit for all)
    #[arg(long = "category", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub categories: Vec<String>,
    /// Regions to include
    #[arg(long = "region", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub regions: Vec<String>,
    /// Sub-categories to include
    #[arg(long = "sub-category", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub sub_categories: Vec<String>,
    /// States to include
    #[arg(long = "state", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub states: Vec<String>,
    /// Ship modes to include
    #[arg(long = "ship-mode", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub ship_modes: Vec<String>,
    /// Customer segments to include
    #[arg(long = "segment", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub segments: Vec<String>,
}

impl FilterArgs {
    /// Filter flags as a preset, ready to overlay on a loaded one.
    pub fn overrides(&self) -> FilterPreset {
        FilterPreset {
            start: self.start,
            end: self.end,
            categories: self.categories.clone(),
            regions: self.regions.clone(),
            sub_categories: self.sub_categories.clone(),
            states: self.states.clone(),
            ship_modes: self.ship_modes.clone(),
            segments: self.segments.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct TabArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
    /// Width of proportional bars in text output
    #[arg(long = "bar-width", default_value_t = 30)]
    pub bar_width: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output CSV file (stdout if omitted or '-')
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to the output extension, then the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format for rendered tabs
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "," | "comma" => Ok(b','),
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        ";" | "semicolon" => Ok(b';'),
        "|" | "pipe" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!("Unsupported delimiter '{other}'")),
    }
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_naive_date(value).map_err(|err| err.to_string())
}
