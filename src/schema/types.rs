// src/schema/types.rs

use std::collections::HashMap;

pub const EMAIL: &str = "email";
pub const CRSID: &str = "crsid";
pub const NAME: &str = "name";
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";

/// Auto-incrementing primary key present in every created table.
pub const IDENTITY_COLUMN: &str = "id";

/// Appended to a crsid to form the institutional email address.
pub const CRSID_DOMAIN: &str = "@cam.ac.uk";

/// Separator inside a combined `name` cell: `last_name, first_name`.
pub const NAME_SEPARATOR: &str = ", ";

/// Longest identifier PostgreSQL stores unchanged, in bytes. Longer names are truncated.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Header names of a CSV file, in file order, with an index for O(1) lookups.
///
/// Names are kept verbatim: matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumnSet {
    ordered: Vec<String>,
    index: HashMap<String, usize>,
}

impl CsvColumnSet {
    pub fn new(ordered: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(ordered.len());
        for (i, name) in ordered.iter().enumerate() {
            // first occurrence wins for duplicated headers
            index.entry(name.clone()).or_insert(i);
        }
        Self { ordered, index }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Position of `column` in the header row.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn ordered(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CsvColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Columns of an existing table as reported by the catalog, minus the identity column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumnList(Vec<String>);

impl TableColumnList {
    pub fn from_catalog<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self(
            columns
                .into_iter()
                .filter(|c| c != IDENTITY_COLUMN)
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }
}
