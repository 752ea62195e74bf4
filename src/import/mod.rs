// src/import/mod.rs
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::db::{Database, Transaction};
use crate::error::ImportError;
use crate::input::check_table_name;
use crate::query::build_create_table;
use crate::schema::{self, resolve_create_columns, resolve_update_columns, TableColumnList};
use crate::source::CsvTable;

pub mod plan;

pub use plan::{ImportPlan, Operation};

/// How far an import got. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Init,
    Connected,
    TableChecked,
    TableCreated,
    ColumnsResolved,
    RowsWritten,
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub table: String,
    pub operation: Operation,
    pub stage: Stage,
    pub rows_read: usize,
    /// Rows the database accepted; rows whose email already existed are not counted.
    pub rows_inserted: u64,
}

fn advance(stage: &mut Stage, next: Stage) {
    debug_assert!(next > *stage);
    info!(from = %stage, to = %next, "stage");
    *stage = next;
}

/// Import `csv` into `table` in a single transaction.
///
/// 1) validate the table name and the CSV columns, before touching the database
/// 2) begin a transaction and check whether `table` exists
/// 3) refuse to create an existing table or update a missing one
/// 4) create the table, or resolve the existing table's columns against the CSV
/// 5) insert every row with `ON CONFLICT (email) DO NOTHING`
/// 6) commit
///
/// Any error returns early and drops the transaction uncommitted.
#[tracing::instrument(
    level = "info",
    skip_all,
    fields(table = %table, operation = %operation, csv = %csv.path().display())
)]
pub async fn run<D: Database>(
    db: &D,
    operation: Operation,
    table: &str,
    csv: &CsvTable,
) -> Result<ImportReport, ImportError> {
    check_table_name(table)?;
    schema::validate(csv.columns())?;

    let mut stage = Stage::Init;
    let mut tx = db.begin().await?;
    advance(&mut stage, Stage::Connected);

    let exists = tx.table_exists(table).await?;
    advance(&mut stage, Stage::TableChecked);

    let plan = match (operation, exists) {
        (Operation::Create, true) => return Err(ImportError::TableAlreadyExists(table.into())),
        (Operation::Update, false) => return Err(ImportError::TableNotFound(table.into())),
        (Operation::Create, false) => {
            let ddl = build_create_table(table, &resolve_create_columns(csv.columns()))?;
            debug!(sql = %ddl.statement().sql, "create table");
            tx.create_table(&ddl).await?;
            advance(&mut stage, Stage::TableCreated);
            ImportPlan::new(operation, table, ddl.column_names())
        }
        (Operation::Update, true) => {
            let catalog = TableColumnList::from_catalog(tx.fetch_columns(table).await?);
            let columns = resolve_update_columns(&catalog, csv.columns())?;
            ImportPlan::new(operation, table, columns)
        }
    };
    advance(&mut stage, Stage::ColumnsResolved);

    let insert = plan.into_insert(csv)?;
    let rows_inserted = tx.execute_write(&insert).await?;
    advance(&mut stage, Stage::RowsWritten);
    info!(
        rows_read = csv.row_count(),
        rows_inserted,
        skipped = (csv.row_count() as u64).saturating_sub(rows_inserted),
        "rows written"
    );

    tx.commit().await?;
    advance(&mut stage, Stage::Committed);

    Ok(ImportReport {
        table: table.to_string(),
        operation,
        stage,
        rows_read: csv.row_count(),
        rows_inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryDatabase, MemoryTable};
    use crate::error::{InputError, QueryBuildError, SchemaError, ValidationError};
    use crate::schema::types::MAX_IDENTIFIER_LEN;
    use crate::schema::CsvColumnSet;
    use anyhow::Result;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,eventwriter=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn csv(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
        CsvTable::new(
            "event.csv",
            headers.iter().copied().collect::<CsvColumnSet>(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[tokio::test]
    async fn create_from_crsid_and_discrete_names() -> Result<()> {
        init_test_logging();
        let db = MemoryDatabase::new();
        let data = csv(
            &["first_name", "last_name", "crsid"],
            &[&["firstname", "lastname", "abc123"]],
        );

        let report = run(&db, Operation::Create, "formal", &data).await?;
        assert_eq!(report.stage, Stage::Committed);
        assert_eq!(report.rows_inserted, 1);

        let table = db.table("formal").expect("table created");
        assert_eq!(table.columns, vec!["id", "email", "first_name", "last_name"]);
        assert!(table.unique.contains("email"));
        assert_eq!(table.column_values("email"), some(&["abc123@cam.ac.uk"]));
        assert_eq!(table.column_values("first_name"), some(&["firstname"]));
        assert_eq!(table.column_values("last_name"), some(&["lastname"]));
        Ok(())
    }

    #[tokio::test]
    async fn conflicting_name_columns_fail_before_any_database_call() {
        init_test_logging();
        let db = MemoryDatabase::new();
        // a database call would fail with a connection error instead
        db.set_unreachable(true);
        let data = csv(&["name", "first_name", "crsid"], &[&["Doe, Jane", "Jane", "abc1"]]);

        let err = run(&db, Operation::Create, "formal", &data)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ImportError::Validation(ValidationError::MissingOrDuplicateName)
            ),
            "{err:?}"
        );
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn create_over_existing_table_executes_nothing() {
        init_test_logging();
        let db = MemoryDatabase::new().with_table(
            "formal",
            MemoryTable::new(["email", "first_name", "last_name"]).with_unique("email"),
        );
        let data = csv(&["email", "name"], &[&["x@y.com", "Doe, Jane"]]);

        let err = run(&db, Operation::Create, "formal", &data)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::TableAlreadyExists(ref t) if t == "formal"));
        assert!(db.executed().is_empty());
        assert!(db.table("formal").unwrap().rows.is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_table_fails() {
        let db = MemoryDatabase::new();
        let data = csv(&["email", "name"], &[&["x@y.com", "Doe, Jane"]]);
        let err = run(&db, Operation::Update, "ghost", &data)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::TableNotFound(ref t) if t == "ghost"));
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn repeated_update_is_idempotent() -> Result<()> {
        init_test_logging();
        let db = MemoryDatabase::new();
        let first = csv(
            &["name", "email", "college"],
            &[&["Doe, Jane", "jane@x.com", "Trinity"]],
        );
        run(&db, Operation::Create, "ball", &first).await?;

        let second = csv(
            &["college", "crsid", "first_name", "last_name"],
            &[&["King's", "rr1", "Rick", "Roe"], &["Clare", "ss2", "Sam", "Sue"]],
        );
        let report = run(&db, Operation::Update, "ball", &second).await?;
        assert_eq!(report.rows_inserted, 2);
        assert_eq!(db.table("ball").unwrap().rows.len(), 3);

        let again = run(&db, Operation::Update, "ball", &second).await?;
        assert_eq!(again.rows_read, 2);
        assert_eq!(again.rows_inserted, 0);

        let table = db.table("ball").unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.column_values("email"),
            some(&["jane@x.com", "rr1@cam.ac.uk", "ss2@cam.ac.uk"])
        );
        assert_eq!(
            table.column_values("college"),
            some(&["Trinity", "King's", "Clare"])
        );
        Ok(())
    }

    #[tokio::test]
    async fn update_with_unfillable_column_writes_nothing() -> Result<()> {
        let db = MemoryDatabase::new();
        let first = csv(
            &["name", "email", "college"],
            &[&["Doe, Jane", "jane@x.com", "Trinity"]],
        );
        run(&db, Operation::Create, "ball", &first).await?;
        let executed_before = db.executed().len();

        let second = csv(&["crsid", "name"], &[&["rr1", "Roe, Rick"]]);
        let err = run(&db, Operation::Update, "ball", &second)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Schema(SchemaError::UnsatisfiableColumn(ref c)) if c == "college"
        ));
        assert_eq!(db.executed().len(), executed_before);
        assert_eq!(db.table("ball").unwrap().rows.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_name_after_create_rolls_back_the_table() {
        init_test_logging();
        let db = MemoryDatabase::new();
        let data = csv(
            &["name", "crsid"],
            &[&["Doe, Jane", "abc1"], &["Cher", "abc2"]],
        );

        let err = run(&db, Operation::Create, "gala", &data)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Build(QueryBuildError::MalformedNameField { row: 1, .. })
        ));
        // the CREATE ran inside the transaction but was never committed
        assert_eq!(db.executed().len(), 1);
        assert!(db.table("gala").is_none());
    }

    #[tokio::test]
    async fn over_long_question_header_is_refused_before_any_ddl() {
        init_test_logging();
        let db = MemoryDatabase::new();
        let question = "Do you have any dietary requirements or allergies we should know about?";
        let data = csv(&["crsid", "name", question], &[&["abc1", "Doe, Jane", "none"]]);

        let err = run(&db, Operation::Create, "gala", &data)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ImportError::Build(QueryBuildError::Schema(SchemaError::IdentifierTooLong(ref c)))
                    if c == question
            ),
            "{err:?}"
        );
        assert!(db.executed().is_empty());
        assert!(db.table("gala").is_none());
    }

    #[tokio::test]
    async fn longest_header_survives_repeated_update() -> Result<()> {
        init_test_logging();
        let db = MemoryDatabase::new();
        let question = "q".repeat(MAX_IDENTIFIER_LEN);
        let data = csv(
            &["crsid", "name", question.as_str()],
            &[&["abc1", "Doe, Jane", "vegan"]],
        );

        run(&db, Operation::Create, "gala", &data).await?;
        let again = run(&db, Operation::Update, "gala", &data).await?;
        assert_eq!(again.rows_inserted, 0);
        assert_eq!(
            db.table("gala").unwrap().column_values(&question),
            some(&["vegan"])
        );
        Ok(())
    }

    #[tokio::test]
    async fn over_long_table_name_is_refused_before_connecting() {
        let db = MemoryDatabase::new();
        db.set_unreachable(true);
        let table = format!("formal_hall_{}", "x".repeat(MAX_IDENTIFIER_LEN));
        let data = csv(&["email", "name"], &[&["x@y.com", "Doe, Jane"]]);

        for operation in [Operation::Create, Operation::Update] {
            let err = run(&db, operation, &table, &data).await.unwrap_err();
            assert!(
                matches!(err, ImportError::Input(InputError::TableNameTooLong(_))),
                "{err:?}"
            );
        }
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connection_error() {
        let db = MemoryDatabase::new();
        db.set_unreachable(true);
        let data = csv(&["email", "name"], &[&["x@y.com", "Doe, Jane"]]);
        let err = run(&db, Operation::Create, "t", &data).await.unwrap_err();
        assert!(matches!(err, ImportError::Connection(_)));
    }
}
