use anyhow::{Context, Result};
use eventwriter::{
    config::DatabaseDetails,
    db::PgDatabase,
    import::{self, ImportReport},
    input, source,
};
use std::{
    env,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const ROOT_ENV: &str = "EVENTWRITER_ROOT";

#[tokio::main]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stdout belongs to the prompt and the result line
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(report) => {
            info!(?report, "import finished");
            println!("Database operation successful");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// First argument, else `$EVENTWRITER_ROOT`, else the working directory.
fn project_root() -> Result<PathBuf> {
    if let Some(arg) = env::args_os().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    if let Some(root) = env::var_os(ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    env::current_dir().context("cannot determine the working directory")
}

async fn run() -> Result<ImportReport> {
    // ─── 2) credentials ──────────────────────────────────────────────
    let root = project_root()?;
    info!(root = %root.display(), "project root");
    let details = DatabaseDetails::load(&root)?;
    let db = PgDatabase::connect_lazy(&details);

    // ─── 3) ask what to do ───────────────────────────────────────────
    let request = {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let request = input::prompt(stdin.lock(), &mut stdout)?;
        stdout.flush()?;
        request
    };

    // ─── 4) load the CSV ─────────────────────────────────────────────
    let csv = source::load_event_csv(&root, &request.table)?;

    // ─── 5) import in one transaction ────────────────────────────────
    let report = import::run(&db, request.operation, &request.table, &csv).await?;
    info!(
        table = %report.table,
        rows_read = report.rows_read,
        rows_inserted = report.rows_inserted,
        "committed"
    );
    Ok(report)
}
