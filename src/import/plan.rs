use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::error::{InputError, QueryBuildError};
use crate::query::{build_insert_rows, InsertRows};
use crate::source::CsvTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive: only `create` and `update` are accepted.
impl FromStr for Operation {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            other => Err(InputError::InvalidOperation(other.to_string())),
        }
    }
}

/// What a run is going to write, fixed once columns are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportPlan {
    operation: Operation,
    table: String,
    columns: Vec<String>,
}

impl ImportPlan {
    pub fn new(operation: Operation, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            columns,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Turn the plan into the insert for `csv`. A plan is used for exactly one insert.
    pub fn into_insert(self, csv: &CsvTable) -> Result<InsertRows, QueryBuildError> {
        build_insert_rows(&self.table, &self.columns, csv)
    }
}
