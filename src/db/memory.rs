//! In-process stand-in for PostgreSQL.
//!
//! Keeps tables as rows of optional text, enforces unique columns the way an
//! `ON CONFLICT ... DO NOTHING` insert would, and only publishes a
//! transaction's changes on commit. Every DDL/DML statement is recorded so
//! callers can assert on what was sent.
//!
//! Identifiers in statements are truncated to 63 bytes as PostgreSQL does,
//! while catalog lookups compare the name they are given as-is.

use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

use super::{Database, Transaction};
use crate::error::{ImportError, QueryStep};
use crate::query::{CreateTable, InsertRows, OnConflict};
use crate::schema::types::{IDENTITY_COLUMN, MAX_IDENTIFIER_LEN};

/// The name PostgreSQL actually stores for identifier `name`.
fn stored_ident(name: &str) -> &str {
    let mut end = name.len().min(MAX_IDENTIFIER_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    /// Catalog order, identity column first.
    pub columns: Vec<String>,
    pub unique: HashSet<String>,
    pub rows: Vec<Vec<Option<String>>>,
    next_id: u64,
}

impl MemoryTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec![IDENTITY_COLUMN.to_string()];
        all.extend(columns.into_iter().map(Into::into));
        Self {
            columns: all,
            unique: HashSet::new(),
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn with_unique(mut self, column: &str) -> Self {
        self.unique.insert(column.to_string());
        self
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Values of `column` across all rows.
    pub fn column_values(&self, column: &str) -> Vec<Option<String>> {
        match self.position(column) {
            Some(pos) => self.rows.iter().map(|r| r[pos].clone()).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, MemoryTable>,
    executed: Vec<String>,
    unreachable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed table.
    pub fn with_table(self, name: &str, table: MemoryTable) -> Self {
        self.lock().tables.insert(name.to_string(), table);
        self
    }

    /// Make every later `begin` fail as if the server were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Committed state of `name`.
    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.lock().tables.get(name).cloned()
    }

    /// SQL of every DDL/DML statement executed so far, committed or not.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, ImportError> {
        let state = self.lock();
        if state.unreachable {
            return Err(ImportError::Connection(
                "connection refused (memory database marked unreachable)".into(),
            ));
        }
        Ok(MemoryTransaction {
            db: self.clone(),
            staged: state.tables.clone(),
        })
    }
}

/// Works on a private copy of the tables; [`Transaction::commit`] publishes it.
#[derive(Debug)]
pub struct MemoryTransaction {
    db: MemoryDatabase,
    staged: BTreeMap<String, MemoryTable>,
}

impl MemoryTransaction {
    fn record(&self, sql: String) {
        self.db.lock().executed.push(sql);
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn table_exists(&mut self, table: &str) -> Result<bool, ImportError> {
        Ok(self.staged.contains_key(table))
    }

    async fn create_table(&mut self, ddl: &CreateTable) -> Result<(), ImportError> {
        self.record(ddl.statement().sql);
        let name = stored_ident(&ddl.table);
        if self.staged.contains_key(name) {
            return Err(ImportError::query(
                QueryStep::CreateTable,
                format!("relation \"{}\" already exists", name),
            ));
        }
        let mut table = MemoryTable::new(ddl.columns.iter().map(|c| stored_ident(&c.name)));
        for col in ddl.columns.iter().filter(|c| c.unique) {
            table.unique.insert(stored_ident(&col.name).to_string());
        }
        self.staged.insert(name.to_string(), table);
        Ok(())
    }

    async fn fetch_columns(&mut self, table: &str) -> Result<Vec<String>, ImportError> {
        Ok(self
            .staged
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn execute_write(&mut self, dml: &InsertRows) -> Result<u64, ImportError> {
        self.record(dml.statement().sql);
        let fail = |msg: String| ImportError::query(QueryStep::WriteRows, msg);

        let table = self
            .staged
            .get_mut(stored_ident(&dml.table))
            .ok_or_else(|| fail(format!("relation \"{}\" does not exist", dml.table)))?;

        let positions = dml
            .columns
            .iter()
            .map(|c| {
                table.position(stored_ident(c)).ok_or_else(|| {
                    fail(format!(
                        "column \"{}\" of relation \"{}\" does not exist",
                        c, dml.table
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let OnConflict::DoNothing { column: conflict } = &dml.on_conflict;
        let conflict = stored_ident(conflict);
        if !table.unique.contains(conflict) {
            return Err(fail(
                "there is no unique or exclusion constraint matching the ON CONFLICT specification"
                    .into(),
            ));
        }
        let key_slot = dml.columns.iter().position(|c| stored_ident(c) == conflict);
        let key_pos = table.position(conflict);

        let mut seen: HashSet<String> = match key_pos {
            Some(pos) => table.rows.iter().filter_map(|r| r[pos].clone()).collect(),
            None => HashSet::new(),
        };

        let mut inserted = 0;
        for values in &dml.rows {
            if let Some(slot) = key_slot {
                if !seen.insert(values[slot].clone()) {
                    continue;
                }
            }
            let mut row = vec![None; table.columns.len()];
            row[0] = Some(table.next_id.to_string());
            table.next_id += 1;
            for (value, &pos) in values.iter().zip(&positions) {
                row[pos] = Some(value.clone());
            }
            table.rows.push(row);
            inserted += 1;
        }
        debug!(table = %dml.table, inserted, "memory insert");
        Ok(inserted)
    }

    async fn commit(self) -> Result<(), ImportError> {
        let mut state = self.db.lock();
        state.tables = self.staged;
        state.executed.push("COMMIT".into());
        Ok(())
    }
}
