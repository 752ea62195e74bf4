//! SQL synthesis for table creation and row import.
//!
//! Builders are pure: they return structured statements whose SQL uses `$n`
//! placeholders, with the values to bind carried alongside in placeholder order.
//! Identifiers cannot be bound, so table and column names are double-quoted.

use serde::Serialize;

pub mod create;
pub mod insert;

pub use create::{build_create_table, ColumnDef, CreateTable};
pub use insert::{build_insert_rows, split_name, InsertRows, OnConflict};

/// PostgreSQL's limit on bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Rendered SQL plus the values for its `$1..$n` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

impl Statement {
    pub fn new(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
