//! `qnaire` command-line front end.
//!
//! Renders a project's answers tree as JSON or CSV and lists the guidance
//! tasks whose conditions hold for its values.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use qnaire_core::repo::catalog_repo::SqliteCatalogRepository;
use qnaire_core::repo::domain_repo::SqliteDomainRepository;
use qnaire_core::repo::project_repo::SqliteProjectRepository;
use qnaire_core::repo::task_repo::SqliteTaskRepository;
use qnaire_core::repo::value_repo::SqliteValueRepository;
use qnaire_core::{
    core_version, default_log_level, init_logging, open_db, AnswersService, CsvDelimiter, Locale,
    TaskService,
};
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "qnaire")]
#[command(author, version, about = "Questionnaire answers reports")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "qnaire.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "QNAIRE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "QNAIRE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the answers tree of a project.
    Answers(AnswersArgs),
    /// List active guidance tasks of a project.
    Tasks(ScopeArgs),
}

#[derive(Args)]
struct ScopeArgs {
    /// Project id
    #[arg(long)]
    project: Uuid,

    /// Snapshot id; live values when omitted
    #[arg(long)]
    snapshot: Option<Uuid>,

    /// Output language (en|de)
    #[arg(long, default_value = "en")]
    locale: Locale,
}

#[derive(Args)]
struct AnswersArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    CsvSemicolon,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| anyhow!("log dir is not valid UTF-8: {}", log_dir.display()))?;
        init_logging(level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok core_version={}",
        core_version()
    );

    let conn = open_db(&cli.db).with_context(|| format!("open {}", cli.db.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Answers(args) => {
            let service = AnswersService::new(
                SqliteProjectRepository::try_new(&conn)?,
                SqliteCatalogRepository::try_new(&conn)?,
                SqliteDomainRepository::try_new(&conn)?,
                SqliteValueRepository::try_new(&conn)?,
            );
            let scope = &args.scope;
            match args.format {
                OutputFormat::Json => {
                    let tree = service.answers_tree(scope.project, scope.snapshot, scope.locale)?;
                    serde_json::to_writer_pretty(&mut out, &tree)?;
                    writeln!(out)?;
                }
                OutputFormat::Csv | OutputFormat::CsvSemicolon => {
                    let delimiter = match args.format {
                        OutputFormat::CsvSemicolon => CsvDelimiter::Semicolon,
                        _ => CsvDelimiter::Comma,
                    };
                    service.export_csv(
                        scope.project,
                        scope.snapshot,
                        scope.locale,
                        delimiter,
                        &mut out,
                    )?;
                }
            }
        }
        Commands::Tasks(scope) => {
            let service = TaskService::new(
                SqliteTaskRepository::try_new(&conn)?,
                SqliteDomainRepository::try_new(&conn)?,
                SqliteValueRepository::try_new(&conn)?,
            );
            let tasks = service.active_tasks(scope.project, scope.snapshot)?;
            let rendered: Vec<_> = tasks
                .iter()
                .map(|task| {
                    json!({
                        "key": task.key,
                        "title": task.title.get(scope.locale),
                        "text": task.text.get(scope.locale),
                    })
                })
                .collect();
            serde_json::to_writer_pretty(&mut out, &rendered)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
