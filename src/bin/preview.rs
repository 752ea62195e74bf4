use anyhow::{bail, Context, Result};
use eventwriter::{
    import::{ImportPlan, Operation},
    input,
    query::{build_create_table, InsertRows, Statement},
    schema, source,
};
use serde::Serialize;
use std::{env, io, path::{Path, PathBuf}};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// SQL without its bound values, which can be long and personal.
#[derive(Serialize)]
struct RenderedSql {
    sql: String,
    param_count: usize,
}

impl From<Statement> for RenderedSql {
    fn from(stmt: Statement) -> Self {
        Self {
            param_count: stmt.params.len(),
            sql: stmt.sql,
        }
    }
}

#[derive(Serialize)]
struct Preview {
    csv: PathBuf,
    rows: usize,
    plan: ImportPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    create_table: Option<RenderedSql>,
    insert: RenderedSql,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    // 1) <root> <key> <create|update>
    let args: Vec<String> = env::args().skip(1).collect();
    let [root, key, op] = args.as_slice() else {
        bail!("usage: preview <PROJECT_ROOT> <EVENT_KEY> <create|update>");
    };
    let operation: Operation = op.parse()?;
    input::check_table_name(key)?;

    // 2) load and check the CSV
    let csv = source::load_event_csv(Path::new(root), key)?;
    schema::validate(csv.columns())?;

    // 3) the table as a create would lay it out; an update against a table
    //    created from this CSV writes the same columns
    let ddl = build_create_table(key, &schema::resolve_create_columns(csv.columns()))?;
    let plan = ImportPlan::new(operation, key.as_str(), ddl.column_names());
    let insert: InsertRows = plan.clone().into_insert(&csv)?;
    info!(
        table = plan.table(),
        operation = %plan.operation(),
        columns = plan.columns().len(),
        params = insert.param_count(),
        "preview built"
    );

    let preview = Preview {
        csv: csv.path().to_path_buf(),
        rows: csv.row_count(),
        create_table: (operation == Operation::Create).then(|| ddl.statement().into()),
        insert: insert.statement().into(),
        plan,
    };

    // 4) print
    let json = serde_json::to_string_pretty(&preview).context("serializing preview")?;
    println!("{json}");
    Ok(())
}
