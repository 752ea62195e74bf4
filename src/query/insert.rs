use serde::Serialize;
use tracing::debug;

use super::{quote_ident, Statement, MAX_BIND_PARAMS};
use crate::error::QueryBuildError;
use crate::schema::types::{
    CsvColumnSet, CRSID, CRSID_DOMAIN, EMAIL, FIRST_NAME, LAST_NAME, NAME, NAME_SEPARATOR,
};
use crate::source::{CsvTable, RowRecord};

/// What to do when an inserted row collides with a unique column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OnConflict {
    /// Skip the row silently.
    DoNothing { column: String },
}

impl OnConflict {
    fn sql(&self) -> String {
        match self {
            OnConflict::DoNothing { column } => {
                format!("ON CONFLICT ({}) DO NOTHING", quote_ident(column))
            }
        }
    }
}

/// One multi-row `INSERT`, with every value already derived from the CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertRows {
    pub table: String,
    pub columns: Vec<String>,
    /// One entry per CSV row, aligned with `columns`.
    pub rows: Vec<Vec<String>>,
    pub on_conflict: OnConflict,
}

impl InsertRows {
    pub fn param_count(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    pub fn statement(&self) -> Statement {
        let column_list = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let width = self.columns.len();
        let tuples = (0..self.rows.len())
            .map(|r| {
                let placeholders = (1..=width)
                    .map(|c| format!("${}", r * width + c))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", placeholders)
            })
            .collect::<Vec<_>>()
            .join(", ");

        Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {} {}",
                quote_ident(&self.table),
                column_list,
                tuples,
                self.on_conflict.sql()
            ),
            params: self.rows.iter().flatten().cloned().collect(),
        }
    }
}

/// Split a combined `last_name, first_name` cell into `(last_name, first_name)`.
///
/// Empty tokens are skipped and anything after the second token is ignored.
pub fn split_name(value: &str) -> Option<(String, String)> {
    let mut tokens = value.split(NAME_SEPARATOR).filter(|t| !t.is_empty());
    let last = tokens.next()?;
    let first = tokens.next()?;
    Some((last.to_string(), first.to_string()))
}

/// Build the insert for every CSV row into `columns` of `table`.
///
/// Values are derived per destination column:
/// - `email` from `crsid` (plus the institutional domain) when the CSV has one, else `email`
/// - `first_name` / `last_name` from a combined `name` when present, else the discrete column
/// - everything else straight from the CSV column of the same name
pub fn build_insert_rows(
    table: &str,
    columns: &[String],
    csv: &CsvTable,
) -> Result<InsertRows, QueryBuildError> {
    if columns.is_empty() {
        return Err(QueryBuildError::EmptyColumnList);
    }
    if csv.row_count() == 0 {
        return Err(QueryBuildError::NoRows);
    }
    let count = csv.row_count() * columns.len();
    if count > MAX_BIND_PARAMS {
        return Err(QueryBuildError::TooManyParameters {
            count,
            limit: MAX_BIND_PARAMS,
        });
    }

    let csv_columns = csv.columns();
    let mut rows = Vec::with_capacity(csv.row_count());
    for record in csv.records() {
        // split lazily, once per row
        let mut names: Option<(String, String)> = None;
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            let value = match column.as_str() {
                EMAIL => derive_email(&record, csv_columns)?,
                FIRST_NAME | LAST_NAME if csv_columns.contains(NAME) => {
                    if names.is_none() {
                        names = Some(combined_name(&record)?);
                    }
                    let (last, first) = names.as_ref().ok_or_else(|| missing(&record, NAME))?;
                    if column == FIRST_NAME {
                        first.clone()
                    } else {
                        last.clone()
                    }
                }
                other => field(&record, other)?.to_string(),
            };
            values.push(value);
        }
        rows.push(values);
    }

    debug!(table, rows = rows.len(), columns = ?columns, "built insert");
    Ok(InsertRows {
        table: table.to_string(),
        columns: columns.to_vec(),
        rows,
        on_conflict: OnConflict::DoNothing {
            column: EMAIL.to_string(),
        },
    })
}

fn derive_email(
    record: &RowRecord<'_>,
    csv_columns: &CsvColumnSet,
) -> Result<String, QueryBuildError> {
    if csv_columns.contains(CRSID) {
        return Ok(format!("{}{}", field(record, CRSID)?, CRSID_DOMAIN));
    }
    Ok(field(record, EMAIL)?.to_string())
}

fn combined_name(record: &RowRecord<'_>) -> Result<(String, String), QueryBuildError> {
    let value = field(record, NAME)?;
    split_name(value).ok_or_else(|| QueryBuildError::MalformedNameField {
        row: record.index(),
        value: value.to_string(),
    })
}

fn field<'a>(record: &RowRecord<'a>, column: &str) -> Result<&'a str, QueryBuildError> {
    record.get(column).ok_or_else(|| missing(record, column))
}

fn missing(record: &RowRecord<'_>, column: &str) -> QueryBuildError {
    QueryBuildError::MissingField {
        row: record.index(),
        column: column.to_string(),
    }
}
