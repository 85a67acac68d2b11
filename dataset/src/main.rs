//! chess-dataset: turn a PGN dump into a table of engine-evaluated positions.
//!
//! Stages run one after another against a single SQLite file:
//!
//! 1. **extract**: read up to N games, keep the normally terminated ones
//! 2. **store**: insert them into `games`, skipping known URLs
//! 3. **expand**: one `positions` row per half-move of every new game
//! 4. **annotate**: evaluate each position without an `eval` with a UCI engine
//!
//! Each stage picks up where an interrupted run stopped.

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chess_dataset::config::{Cli, Command, EngineArgs, ExtractArgs, RunArgs};
use chess_dataset::persistence::Database;
use chess_dataset::pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    tracing::info!(database = %cli.database.display(), "Starting chess-dataset");
    let db = Database::open(&cli.database)
        .await
        .with_context(|| format!("Failed to open database {}", cli.database.display()))?;

    let outcome = match cli.into_command() {
        Command::Run(args) => run(&db, &args).await,
        Command::Extract(args) => extract(&db, &args).await,
        Command::Expand => expand(&db).await,
        Command::Annotate(args) => annotate(&db, &args).await,
    };

    db.close().await;
    outcome
}

/// Console logging filtered by `RUST_LOG` (default `info`), plus a daily
/// rolling file when `log_dir` is given. The returned guard flushes the file
/// writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let (file, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "chess-dataset");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}

async fn run(db: &Database, args: &RunArgs) -> anyhow::Result<()> {
    extract(db, &args.extract).await?;
    expand(db).await?;
    annotate(db, &args.engine).await
}

async fn extract(db: &Database, args: &ExtractArgs) -> anyhow::Result<()> {
    let input = args.input_path()?;
    let options = args.options();

    let path = input.clone();
    let (games, report) =
        tokio::task::spawn_blocking(move || pipeline::extract_games_from_path(&path, &options))
            .await
            .context("Extraction task failed")?
            .with_context(|| format!("Failed to extract games from {}", input.display()))?;
    tracing::info!(
        read = report.games_read,
        kept = report.games_kept,
        "Extraction complete"
    );

    pipeline::write_games(db, &games)
        .await
        .context("Failed to store games")?;
    Ok(())
}

async fn expand(db: &Database) -> anyhow::Result<()> {
    pipeline::expand_positions(db)
        .await
        .context("Failed to expand games into positions")?;
    Ok(())
}

async fn annotate(db: &Database, args: &EngineArgs) -> anyhow::Result<()> {
    let options = args.annotate_options()?;
    let config = args.engine_config();

    pipeline::annotate_with_engine(db, &config, &options)
        .await
        .context("Failed to annotate positions")?;
    Ok(())
}
