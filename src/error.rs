use std::{fmt, path::PathBuf};
use thiserror::Error;

use crate::schema::types::MAX_IDENTIFIER_LEN;

/// Credential file problems. All of these are raised before a connection is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}, check that the file exists", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} format incorrect", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// CSV column set violates the identifier or name encoding rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("CSV file must contain exactly one of `email` or `crsid`")]
    MissingOrDuplicateIdentifier,

    #[error("CSV file must contain either `name` or both `first_name` and `last_name`, not both")]
    MissingOrDuplicateName,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("table column `{0}` cannot be filled from the CSV file")]
    UnsatisfiableColumn(String),

    #[error("column `{0}` would appear more than once in the table")]
    DuplicateColumn(String),

    #[error("column name `{0}` is longer than {limit} bytes", limit = MAX_IDENTIFIER_LEN)]
    IdentifierTooLong(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("cannot build a statement with no columns")]
    EmptyColumnList,

    #[error("CSV file has no data rows to insert")]
    NoRows,

    #[error("row {row}: `name` value {value:?} should be formatted 'last_name, first_name'")]
    MalformedNameField { row: usize, value: String },

    #[error("row {row}: CSV has no value for column `{column}`")]
    MissingField { row: usize, column: String },

    #[error("{count} values exceed the limit of {limit} bound parameters per statement")]
    TooManyParameters { count: usize, limit: usize },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Bad interactive input or an unusable CSV file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid operation {0:?}, should be 'create' or 'update'")]
    InvalidOperation(String),

    #[error("invalid table name {0:?}")]
    InvalidTableName(String),

    #[error("table name {0:?} is longer than {limit} bytes", limit = MAX_IDENTIFIER_LEN)]
    TableNameTooLong(String),

    #[error("CSV file {} not found", .0.display())]
    CsvNotFound(PathBuf),

    #[error("CSV file {} is empty", .0.display())]
    EmptyCsv(PathBuf),

    #[error("CSV file {} has a header but no data rows", .0.display())]
    NoDataRows(PathBuf),

    #[error("failed to parse CSV file {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read input")]
    Io(#[from] std::io::Error),
}

/// Which database step a [`ImportError::Query`] failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStep {
    CheckTable,
    CreateTable,
    FetchColumns,
    WriteRows,
    Commit,
}

impl fmt::Display for QueryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStep::CheckTable => "checking whether the table exists",
            QueryStep::CreateTable => "creating the table",
            QueryStep::FetchColumns => "reading the table columns",
            QueryStep::WriteRows => "writing to the table",
            QueryStep::Commit => "committing the transaction",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to database: {0}")]
    Connection(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Build(#[from] QueryBuildError),

    #[error("SQL error when {step}: {message}")]
    Query { step: QueryStep, message: String },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("tried to create table `{0}` which already exists")]
    TableAlreadyExists(String),

    #[error("tried to update table `{0}` which doesn't exist")]
    TableNotFound(String),
}

impl ImportError {
    pub fn query(step: QueryStep, err: impl fmt::Display) -> Self {
        ImportError::Query {
            step,
            message: err.to_string(),
        }
    }
}
