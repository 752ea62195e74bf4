use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    Postgres,
};
use std::time::Duration;
use tracing::{debug, info};

use super::{Database, Transaction};
use crate::config::DatabaseDetails;
use crate::error::{ImportError, QueryStep};
use crate::query::{CreateTable, InsertRows, Statement};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

const TABLE_EXISTS_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM information_schema.tables
        WHERE table_schema = current_schema()
            AND table_name = $1
    )
"#;

const TABLE_COLUMNS_SQL: &str = r#"
    SELECT column_name::text
    FROM information_schema.columns
    WHERE table_schema = current_schema()
        AND table_name = $1
    ORDER BY ordinal_position
"#;

/// PostgreSQL backed by a single-connection pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Build the pool without connecting. The first connection is made by
    /// [`Database::begin`], so a bad host surfaces there.
    pub fn connect_lazy(details: &DatabaseDetails) -> Self {
        Self::from_options(details.connect_options())
    }

    pub fn from_options(options: PgConnectOptions) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);
        Self { pool }
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, ImportError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ImportError::Connection(e.to_string()))?;
        info!("transaction started");
        Ok(PgTransaction { tx })
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PgTransaction {
    async fn execute(&mut self, stmt: &Statement, step: QueryStep) -> Result<u64, ImportError> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "executing");
        let mut query = sqlx::query(&stmt.sql);
        for value in &stmt.params {
            query = query.bind(value.as_str());
        }
        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| ImportError::query(step, e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn table_exists(&mut self, table: &str) -> Result<bool, ImportError> {
        sqlx::query_scalar::<_, bool>(TABLE_EXISTS_SQL)
            .bind(table)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| ImportError::query(QueryStep::CheckTable, e))
    }

    async fn create_table(&mut self, ddl: &CreateTable) -> Result<(), ImportError> {
        self.execute(&ddl.statement(), QueryStep::CreateTable).await?;
        Ok(())
    }

    async fn fetch_columns(&mut self, table: &str) -> Result<Vec<String>, ImportError> {
        sqlx::query_scalar::<_, String>(TABLE_COLUMNS_SQL)
            .bind(table)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| ImportError::query(QueryStep::FetchColumns, e))
    }

    async fn execute_write(&mut self, dml: &InsertRows) -> Result<u64, ImportError> {
        self.execute(&dml.statement(), QueryStep::WriteRows).await
    }

    async fn commit(self) -> Result<(), ImportError> {
        self.tx
            .commit()
            .await
            .map_err(|e| ImportError::query(QueryStep::Commit, e))
    }
}
