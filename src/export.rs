use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use log::info;

use crate::{dataset::Dataset, filter::FilteredView, io_utils};

/// Writes the view's rows verbatim under the dataset's header row.
///
/// `None` or `-` writes to stdout. Returns the number of data rows written.
pub fn write_view(
    dataset: &Dataset,
    view: &FilteredView<'_>,
    output: Option<&Path>,
    output_delimiter: Option<u8>,
) -> Result<usize> {
    let delimiter =
        io_utils::resolve_output_delimiter(output, output_delimiter, dataset.delimiter());
    let rows = write_rows(dataset, view, io_utils::open_csv_writer(output, delimiter)?)?;
    info!(
        "Exported {rows} row(s) to {}",
        output
            .filter(|p| !io_utils::is_dash(p))
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(rows)
}

/// Same as [`write_view`], into a caller-owned sink using the dataset's
/// delimiter.
pub fn write_view_to<W: Write>(
    dataset: &Dataset,
    view: &FilteredView<'_>,
    sink: W,
) -> Result<usize> {
    let rows = write_rows(dataset, view, io_utils::csv_writer(sink, dataset.delimiter()))?;
    info!("Exported {rows} row(s) to the session output");
    Ok(rows)
}

fn write_rows<W: Write>(
    dataset: &Dataset,
    view: &FilteredView<'_>,
    mut writer: csv::Writer<W>,
) -> Result<usize> {
    writer
        .write_record(dataset.headers())
        .context("Writing export header")?;
    for (idx, record) in view.iter().enumerate() {
        writer
            .write_record(&record.raw)
            .with_context(|| format!("Writing export row {}", idx + 2))?;
    }
    writer.flush().context("Flushing export output")?;
    Ok(view.len())
}
