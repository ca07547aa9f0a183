use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use txstore_batch::{BatchOrchestrator, BatchStatus, ImportOutcome, ImportPipeline, MockSubmitter};
use txstore_core::{NormalizedTransaction, Source};
use txstore_import::{import_csv, DocumentExtractor, StatementParser, Validator};

mod config;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "txstore", version, about = "Bank statement and CSV transaction ingestion")]
struct Cli {
    /// TOML config file (batch, csv, extract sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and parse a statement PDF (or plain-text export)
    Parse {
        file: PathBuf,

        /// Submit validated records through the local dry-run service and mirror confirmations
        #[arg(long)]
        submit: bool,

        /// Mirror database (defaults to `db_path` from the config)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Import a CSV file with description, amount, category and date columns
    Csv {
        file: PathBuf,

        #[arg(long)]
        submit: bool,

        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List mirrored records, newest first
    Records {
        #[arg(long)]
        db: PathBuf,
    },
}

#[derive(Serialize)]
struct ParseReport<'a> {
    bank_name: Option<&'a str>,
    format_name: Option<&'a str>,
    transactions: &'a [NormalizedTransaction],
    invalid_count: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let rules = config.rule_engine()?;

    match cli.command {
        Command::Parse { file, submit, db } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let extractor = DocumentExtractor::new(config.extract.clone());
            let parsed = StatementParser::new(&rules)
                .parse_document(&extractor, &data)
                .with_context(|| format!("extracting text from {}", file.display()))?;
            tracing::info!(
                file = %file.display(),
                parsed = parsed.transactions.len(),
                invalid = parsed.invalid_count,
                "statement parsed"
            );

            if submit {
                let db = mirror_path(db, &config)?;
                let mut ledger: Vec<NormalizedTransaction> = Vec::new();
                let mock = MockSubmitter::new();
                let pipeline = ImportPipeline::new(&rules, BatchOrchestrator::new(&mock, config.batch.clone())?);
                let outcome = pipeline.import_statement(&parsed, &mut ledger, log_progress).await?;
                finish_submission(&outcome, &db).await?;
                print_json(&outcome)?;
            } else {
                let report = Validator::new(&rules, Source::PdfImport).validate(&parsed.transactions);
                let mut errors = parsed.errors.clone();
                errors.extend(report.errors);
                let mut warnings = parsed.warnings.clone();
                warnings.extend(report.warnings);
                print_json(&ParseReport {
                    bank_name: parsed.bank_name.as_deref(),
                    format_name: parsed.format_name.as_deref(),
                    transactions: &report.transactions,
                    invalid_count: parsed.invalid_count,
                    errors,
                    warnings,
                })?;
            }
        }

        Command::Csv { file, submit, db } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let imported = import_csv(&content, &config.csv);
            tracing::info!(
                file = %file.display(),
                valid = imported.valid_rows,
                invalid = imported.invalid_rows,
                "CSV imported"
            );
            if !imported.success {
                print_json(&imported)?;
                bail!("CSV import failed: {}", imported.errors.join("; "));
            }

            if submit {
                let db = mirror_path(db, &config)?;
                let mut ledger: Vec<NormalizedTransaction> = Vec::new();
                let mock = MockSubmitter::new();
                let pipeline = ImportPipeline::new(&rules, BatchOrchestrator::new(&mock, config.batch.clone())?);
                let outcome = pipeline.import_csv(imported, &mut ledger, log_progress).await?;
                finish_submission(&outcome, &db).await?;
                print_json(&outcome)?;
            } else {
                print_json(&imported)?;
            }
        }

        Command::Records { db } => {
            let pool = txstore_storage::create_db(&db)
                .await
                .with_context(|| format!("opening {}", db.display()))?;
            let records = txstore_storage::get_records(&pool).await?;
            print_json(&records)?;
        }
    }

    Ok(())
}

fn mirror_path(flag: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    match flag.or_else(|| config.db_path.clone()) {
        Some(path) => Ok(path),
        None => bail!("--submit needs a mirror database (pass --db <path> or set db_path)"),
    }
}

fn log_progress(status: &BatchStatus) {
    tracing::debug!(
        completed = status.completed,
        failed = status.failed,
        pending = status.pending,
        total = status.total,
        "batch progress"
    );
}

async fn finish_submission(outcome: &ImportOutcome, db: &Path) -> Result<()> {
    let pool = txstore_storage::create_db(db)
        .await
        .with_context(|| format!("opening {}", db.display()))?;
    let mut mirrored = 0usize;
    for (record, hash) in outcome.status.confirmed() {
        if txstore_storage::mirror_confirmed(&pool, record, hash).await? {
            mirrored += 1;
        }
    }
    tracing::info!(mirrored, failed = outcome.status.failed, "submission finished");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
