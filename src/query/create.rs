use serde::Serialize;

use super::{quote_ident, Statement};
use crate::error::QueryBuildError;
use crate::schema::table_columns_for;
use crate::schema::types::{EMAIL, IDENTITY_COLUMN};

/// A text column of a table about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub unique: bool,
}

/// `CREATE TABLE` for an event table: `id SERIAL PRIMARY KEY` followed by text columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl CreateTable {
    /// Column names the new table will have, identity column excluded.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn statement(&self) -> Statement {
        let mut defs = Vec::with_capacity(self.columns.len() + 1);
        defs.push(format!("{} SERIAL PRIMARY KEY", quote_ident(IDENTITY_COLUMN)));
        for col in &self.columns {
            let unique = if col.unique { " UNIQUE" } else { "" };
            defs.push(format!("{} TEXT{}", quote_ident(&col.name), unique));
        }
        Statement::new(format!(
            "CREATE TABLE {} ({})",
            quote_ident(&self.table),
            defs.join(", ")
        ))
    }
}

/// Build the DDL for a table holding the given logical CSV columns.
///
/// `crsid` and `email` both become a unique `email` column, `name` becomes
/// `first_name` and `last_name`, anything else is kept as a text column.
pub fn build_create_table(table: &str, columns: &[String]) -> Result<CreateTable, QueryBuildError> {
    if columns.is_empty() {
        return Err(QueryBuildError::EmptyColumnList);
    }

    let columns = table_columns_for(columns)?
        .into_iter()
        .map(|name| ColumnDef {
            unique: name == EMAIL,
            name,
        })
        .collect();

    Ok(CreateTable {
        table: table.to_string(),
        columns,
    })
}
