//! Event-driven recomputation.
//!
//! A [`Session`] borrows the loaded dataset and owns the current
//! [`FilterSelection`]. Each [`FilterEvent`] produces a fresh [`Snapshot`]
//! computed by the pure filter and aggregation stages; nothing is updated
//! incrementally. The `explore` command drives a session from text
//! commands read line by line.

use std::{
    fmt,
    io::{BufRead, Write},
    path::PathBuf,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use log::{debug, info};

use crate::{
    aggregate::{self, OverviewTab, ProfitTab, SalesTab},
    data::parse_naive_date,
    dataset::Dataset,
    error::SelectionError,
    export,
    filter::{self, Dimension, FilterSelection, FilteredView},
    io_utils,
    preset::FilterPreset,
    render::{self, Page, Renderer},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    SetStart(Option<NaiveDate>),
    SetEnd(Option<NaiveDate>),
    Select(Dimension, Vec<String>),
    Toggle(Dimension, String),
    Clear(Dimension),
    Reset,
}

impl FilterEvent {
    /// Applies the event to a copy of `selection`, leaving the original
    /// untouched when the result would be invalid.
    pub fn apply_to(&self, selection: &FilterSelection) -> Result<FilterSelection, SelectionError> {
        let mut next = selection.clone();
        match self {
            FilterEvent::SetStart(start) => next.set_start(*start)?,
            FilterEvent::SetEnd(end) => next.set_end(*end)?,
            FilterEvent::Select(dimension, values) => next.select(*dimension, values.clone()),
            FilterEvent::Toggle(dimension, value) => next.toggle(*dimension, value),
            FilterEvent::Clear(dimension) => next.clear(*dimension),
            FilterEvent::Reset => next = FilterSelection::all(),
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Sales,
    Profit,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Overview, Tab::Sales, Tab::Profit];
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(Tab::Overview),
            "sales" => Ok(Tab::Sales),
            "profit" | "loss" | "profit-loss" => Ok(Tab::Profit),
            other => Err(anyhow!("Unknown tab '{other}' (expected overview, sales, profit)")),
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tab::Overview => "overview",
            Tab::Sales => "sales",
            Tab::Profit => "profit",
        })
    }
}

/// Everything one pipeline pass produces for a selection.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    pub selection: FilterSelection,
    pub view: FilteredView<'a>,
    pub overview: OverviewTab,
    pub sales: SalesTab,
    pub profit: ProfitTab,
}

impl Snapshot<'_> {
    pub fn page(&self, tab: Tab) -> Page {
        let selection = self.selection.to_string();
        match tab {
            Tab::Overview => render::overview_page(&self.overview, &selection),
            Tab::Sales => render::sales_page(&self.sales, &selection),
            Tab::Profit => render::profit_page(&self.profit, &selection),
        }
    }
}

/// Runs filter and aggregation for `selection` over `dataset`.
pub fn compute<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> Snapshot<'a> {
    let view = filter::filter_dataset(dataset, selection);
    Snapshot {
        overview: aggregate::overview(&view),
        sales: aggregate::sales(&view),
        profit: aggregate::profit(&view),
        selection: selection.clone(),
        view,
    }
}

#[derive(Debug, Clone)]
pub struct Session<'a> {
    dataset: &'a Dataset,
    selection: FilterSelection,
}

impl<'a> Session<'a> {
    pub fn new(dataset: &'a Dataset, selection: FilterSelection) -> Self {
        Self { dataset, selection }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn snapshot(&self) -> Snapshot<'a> {
        compute(self.dataset, &self.selection)
    }

    /// Applies `event` and recomputes. An invalid event leaves the current
    /// selection in place.
    pub fn apply(&mut self, event: &FilterEvent) -> Result<Snapshot<'a>, SelectionError> {
        let next = event.apply_to(&self.selection)?;
        debug!("Event {event:?} -> [{next}]");
        next.warn_unknown_values(self.dataset);
        self.selection = next;
        Ok(self.snapshot())
    }
}

/// One line of `explore` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(FilterEvent),
    Show(Option<Tab>),
    Export(Option<PathBuf>),
    SavePreset(PathBuf),
    Options,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  start <YYYY-MM-DD|*>            set or clear the start date
  end <YYYY-MM-DD|*>              set or clear the end date
  select <dimension> <v1, v2...>  restrict a dimension to the listed values
  toggle <dimension> <value>      add or remove a single value
  clear <dimension>               remove the restriction on a dimension
  reset                           clear every filter
  show [overview|sales|profit|all]
  export [path]                   write the filtered rows (stdout if no path)
  save <path>                     write the current filters as a YAML preset
  options                         list filter values present in the dataset
  quit
Dimensions: category, region, sub-category, state, ship-mode, segment";

pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => Command::Event(FilterEvent::SetStart(parse_bound(rest)?)),
        "end" => Command::Event(FilterEvent::SetEnd(parse_bound(rest)?)),
        "select" => {
            let (dimension, values) = split_dimension(rest)?;
            let values = values
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            Command::Event(FilterEvent::Select(dimension, values))
        }
        "toggle" => {
            let (dimension, value) = split_dimension(rest)?;
            if value.is_empty() {
                bail!("toggle requires a value");
            }
            Command::Event(FilterEvent::Toggle(dimension, value.to_string()))
        }
        "clear" => Command::Event(FilterEvent::Clear(rest.parse::<Dimension>()?)),
        "reset" => Command::Event(FilterEvent::Reset),
        "show" => match rest {
            "" | "all" => Command::Show(None),
            tab => Command::Show(Some(tab.parse()?)),
        },
        "export" => Command::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "save" => {
            if rest.is_empty() {
                bail!("save requires a file path");
            }
            Command::SavePreset(PathBuf::from(rest))
        }
        "options" => Command::Options,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("Unknown command '{other}' (type 'help')"),
    };
    Ok(Some(command))
}

fn parse_bound(value: &str) -> Result<Option<NaiveDate>> {
    match value {
        "" => bail!("expected a date or '*'"),
        "*" => Ok(None),
        date => parse_naive_date(date).map(Some),
    }
}

fn split_dimension(rest: &str) -> Result<(Dimension, &str)> {
    let (name, tail) = rest
        .split_once(char::is_whitespace)
        .map(|(name, tail)| (name, tail.trim()))
        .unwrap_or((rest, ""));
    if name.is_empty() {
        bail!("expected a dimension");
    }
    Ok((name.parse::<Dimension>()?, tail))
}

/// Drives `session` from `input` until EOF or `quit`, rendering the current
/// tab after every filter change.
pub fn run_interactive<R, W>(
    session: &mut Session<'_>,
    renderer: &dyn Renderer,
    input: R,
    output: &mut W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut tab = Tab::Overview;
    let mut snapshot = session.snapshot();
    write_tabs(output, renderer, &snapshot, Some(tab))?;

    for (idx, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("Reading command line {}", idx + 1))?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(output, "error: {err}")?;
                continue;
            }
        };
        match command {
            Command::Event(event) => match session.apply(&event) {
                Ok(next) => {
                    snapshot = next;
                    write_tabs(output, renderer, &snapshot, Some(tab))?;
                }
                Err(err) => writeln!(output, "error: {err}")?,
            },
            Command::Show(requested) => {
                if let Some(requested) = requested {
                    tab = requested;
                }
                write_tabs(output, renderer, &snapshot, requested)?;
            }
            Command::Export(path) => {
                let dataset = session.dataset();
                let written = match path.as_deref().filter(|p| !io_utils::is_dash(p)) {
                    Some(path) => export::write_view(dataset, &snapshot.view, Some(path), None),
                    None => export::write_view_to(dataset, &snapshot.view, &mut *output),
                };
                match written {
                    Ok(rows) => writeln!(output, "exported {rows} row(s)")?,
                    Err(err) => writeln!(output, "error: {err:#}")?,
                }
            }
            Command::SavePreset(path) => {
                match FilterPreset::from_selection(session.selection()).save(&path) {
                    Ok(()) => writeln!(output, "saved filters to {}", path.display())?,
                    Err(err) => writeln!(output, "error: {err:#}")?,
                }
            }
            Command::Options => {
                let options = session.dataset().options();
                writeln!(output, "{}", serde_json::to_string_pretty(&options)?)?;
            }
            Command::Help => writeln!(output, "{HELP}")?,
            Command::Quit => break,
        }
    }
    info!("Interactive session finished with [{}]", session.selection());
    Ok(())
}

fn write_tabs<W: Write>(
    output: &mut W,
    renderer: &dyn Renderer,
    snapshot: &Snapshot<'_>,
    tab: Option<Tab>,
) -> Result<()> {
    let tabs = match tab {
        Some(tab) => vec![tab],
        None => Tab::ALL.to_vec(),
    };
    for tab in tabs {
        let page = snapshot.page(tab);
        output.write_all(renderer.render(&page)?.as_bytes())?;
        writeln!(output)?;
    }
    Ok(())
}
