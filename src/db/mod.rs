//! Database capability used by the importer.
//!
//! A [`Database`] hands out one [`Transaction`] per import. Everything the
//! import does runs inside it. Dropping a transaction without calling
//! [`Transaction::commit`] discards all of its work.

use async_trait::async_trait;

use crate::error::ImportError;
use crate::query::{CreateTable, InsertRows};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

#[async_trait]
pub trait Database: Send + Sync {
    type Tx: Transaction;

    /// Open a transaction. Failing here means the database is unreachable.
    async fn begin(&self) -> Result<Self::Tx, ImportError>;
}

#[async_trait]
pub trait Transaction: Send {
    async fn table_exists(&mut self, table: &str) -> Result<bool, ImportError>;

    async fn create_table(&mut self, ddl: &CreateTable) -> Result<(), ImportError>;

    /// Every column of `table` in catalog order, identity column included.
    async fn fetch_columns(&mut self, table: &str) -> Result<Vec<String>, ImportError>;

    /// Run the insert and return how many rows were actually written.
    async fn execute_write(&mut self, dml: &InsertRows) -> Result<u64, ImportError>;

    async fn commit(self) -> Result<(), ImportError>;
}
