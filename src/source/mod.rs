// src/source/mod.rs
use csv::ReaderBuilder;
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::InputError;
use crate::schema::CsvColumnSet;

pub mod table;

pub use table::{CsvTable, RowRecord};

/// `<root>/events/<key>/<key>.csv`
pub fn event_csv_path(project_root: &Path, event_key: &str) -> PathBuf {
    project_root
        .join("events")
        .join(event_key)
        .join(format!("{}.csv", event_key))
}

/// Load the CSV belonging to `event_key` under `project_root`.
#[tracing::instrument(level = "info", skip(project_root), fields(root = %project_root.display()))]
pub fn load_event_csv(project_root: &Path, event_key: &str) -> Result<CsvTable, InputError> {
    let path = event_csv_path(project_root, event_key);
    if !path.is_file() {
        return Err(InputError::CsvNotFound(path));
    }
    let file = File::open(&path)?;
    let table = read_csv(file, &path)?;
    info!(
        columns = table.columns().len(),
        rows = table.row_count(),
        "loaded {}",
        path.display()
    );
    Ok(table)
}

/// Parse CSV text from `reader`. `path` is only used to label errors.
///
/// The first record is the header row. At least one data row must follow, and
/// every row must have as many fields as the header.
pub fn read_csv<R: Read>(reader: R, path: &Path) -> Result<CsvTable, InputError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let csv_err = |source: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(InputError::EmptyCsv(path.to_path_buf()));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if rows.is_empty() {
        return Err(InputError::NoDataRows(path.to_path_buf()));
    }

    debug!(headers = ?headers, "parsed {} data rows", rows.len());
    Ok(CsvTable::new(path, CsvColumnSet::new(headers), rows))
}
