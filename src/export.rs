//! CSV output.
//!
//! One header row, then one row per author in retrieval order. The header is
//! written even when there are no rows.

use crate::error::{PubmedError, Result};
use crate::models::{output_rows, Article, OutputRow};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// CSV column order for the output file
pub const OUTPUT_COLUMNS: &[&str] = &[
    "Title",
    "Author",
    "Affiliation",
    "Company",
    "Publication Date",
    "DOI",
];

/// Write all author rows of `articles` to `path`, replacing any existing file.
///
/// With `companies_only`, authors without a detected company are left out.
/// Returns the number of data rows written.
pub fn write_csv(path: &Path, articles: &[Article], companies_only: bool) -> Result<usize> {
    let file = File::create(path).map_err(|source| PubmedError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(OUTPUT_COLUMNS)?;

    let mut written = 0;
    for row in output_rows(articles).filter(|r| keep_row(r, companies_only)) {
        wtr.serialize(&row)?;
        written += 1;
    }

    wtr.flush().map_err(|source| PubmedError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), rows = written, "CSV written");
    Ok(written)
}

fn keep_row(row: &OutputRow<'_>, companies_only: bool) -> bool {
    !companies_only || !row.company.is_empty()
}
