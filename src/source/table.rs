use std::path::{Path, PathBuf};

use crate::schema::CsvColumnSet;

/// A fully loaded CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    /// Where the file was read from, for messages.
    pub path: PathBuf,
    /// Header row, verbatim.
    pub columns: CsvColumnSet,
    /// Data rows, each as long as the header row.
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>, columns: CsvColumnSet, rows: Vec<Vec<String>>) -> Self {
        Self {
            path: path.into(),
            columns,
            rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &CsvColumnSet {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn records(&self) -> impl Iterator<Item = RowRecord<'_>> {
        self.rows.iter().enumerate().map(|(index, fields)| RowRecord {
            index,
            columns: &self.columns,
            fields,
        })
    }
}

/// One data row with lookup by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRecord<'a> {
    index: usize,
    columns: &'a CsvColumnSet,
    fields: &'a [String],
}

impl<'a> RowRecord<'a> {
    /// 0-based position among the data rows (header excluded).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        let pos = self.columns.position(column)?;
        self.fields.get(pos).map(String::as_str)
    }
}
