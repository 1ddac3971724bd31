pub mod aggregate;
pub mod cli;
pub mod data;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod io_utils;
pub mod preset;
pub mod render;
pub mod session;
pub mod table;

use std::{
    env,
    io::{self, Write},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, DatasetArgs, FilterArgs, OutputFormat},
    dataset::{Dataset, LoadOptions},
    filter::FilterSelection,
    preset::FilterPreset,
    render::{JsonRenderer, Renderer, TextRenderer},
    session::{Session, Tab},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("superstore_dash", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Overview(args) => handle_tabs(&args, &[Tab::Overview]),
        Commands::Sales(args) => handle_tabs(&args, &[Tab::Sales]),
        Commands::Profit(args) => handle_tabs(&args, &[Tab::Profit]),
        Commands::Dashboard(args) => handle_tabs(&args, &Tab::ALL),
        Commands::Export(args) => handle_export(&args),
        Commands::Options(args) => handle_options(&args),
        Commands::Explore(args) => handle_explore(&args),
    }
}

fn load_dataset(args: &DatasetArgs) -> Result<Dataset> {
    let path = match &args.input {
        Some(path) => path.clone(),
        None => dataset::locate_default_dataset()?,
    };
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
    };
    Dataset::load(&path, &options).with_context(|| format!("Loading dataset {path:?}"))
}

fn resolve_selection(args: &FilterArgs, dataset: &Dataset) -> Result<FilterSelection> {
    let base = match &args.preset {
        Some(path) => {
            FilterPreset::load(path).with_context(|| format!("Loading preset {path:?}"))?
        }
        None => FilterPreset::default(),
    };
    let selection = base
        .overlay(args.overrides())
        .to_selection()
        .context("Resolving filter selection")?;
    selection.warn_unknown_values(dataset);
    debug!("Active selection: {selection}");
    Ok(selection)
}

fn renderer_for(format: OutputFormat, bar_width: usize) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Text => Box::new(TextRenderer { bar_width }),
        OutputFormat::Json => Box::new(JsonRenderer { pretty: true }),
    }
}

fn handle_tabs(args: &cli::TabArgs, tabs: &[Tab]) -> Result<()> {
    let dataset = load_dataset(&args.dataset)?;
    let selection = resolve_selection(&args.filters, &dataset)?;
    let snapshot = session::compute(&dataset, &selection);
    info!(
        "Filtered {} of {} record(s)",
        snapshot.view.len(),
        dataset.len()
    );
    let renderer = renderer_for(args.format, args.bar_width);
    let mut stdout = io::stdout().lock();
    for tab in tabs {
        let page = snapshot.page(*tab);
        let rendered = renderer
            .render(&page)
            .with_context(|| format!("Rendering {tab} tab"))?;
        stdout.write_all(rendered.as_bytes())?;
    }
    stdout.flush()?;
    Ok(())
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let dataset = load_dataset(&args.dataset)?;
    let selection = resolve_selection(&args.filters, &dataset)?;
    let view = filter::filter_dataset(&dataset, &selection);
    export::write_view(
        &dataset,
        &view,
        args.output.as_deref(),
        args.output_delimiter,
    )?;
    Ok(())
}

fn handle_options(args: &cli::OptionsArgs) -> Result<()> {
    let dataset = load_dataset(&args.dataset)?;
    let options = dataset.options();
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let rows = vec![
        vec![
            "order date".to_string(),
            format!(
                "{} .. {}",
                date(options.min_order_date),
                date(options.max_order_date)
            ),
        ],
        vec!["category".to_string(), options.categories.join(", ")],
        vec!["region".to_string(), options.regions.join(", ")],
        vec!["sub-category".to_string(), options.sub_categories.join(", ")],
        vec!["state".to_string(), options.states.join(", ")],
        vec!["ship-mode".to_string(), options.ship_modes.join(", ")],
        vec!["segment".to_string(), options.segments.join(", ")],
    ];
    let headers = vec!["filter".to_string(), "values".to_string()];
    print!("{}", table::render_table(&headers, &rows));
    info!(
        "Listed filter options for {} record(s) in {:?}",
        dataset.len(),
        dataset.source()
    );
    Ok(())
}

fn handle_explore(args: &cli::ExploreArgs) -> Result<()> {
    let dataset = load_dataset(&args.dataset)?;
    let selection = resolve_selection(&args.filters, &dataset)?;
    let mut session = Session::new(&dataset, selection);
    let renderer = renderer_for(args.format, TextRenderer::default().bar_width);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    session::run_interactive(&mut session, renderer.as_ref(), stdin.lock(), &mut stdout)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
