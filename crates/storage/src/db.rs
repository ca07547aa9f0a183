use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use thiserror::Error;
use txstore_core::NormalizedTransaction;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

/// A confirmed transaction as stored in the mirror.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirroredRecord {
    pub id: String,
    pub description: String,
    /// Two-decimal amount text, e.g. `-4.50`.
    pub amount: String,
    pub category: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub source: String,
    /// `Original` for first entries, `Correction` for records that amend one.
    pub status: String,
    pub original_id: Option<String>,
    pub net_effect: Option<String>,
    pub tx_hash: String,
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            notes TEXT,
            source TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Original',
            original_id TEXT,
            net_effect TEXT,
            tx_hash TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Stores a confirmed record. Writing the same record (or the same hash)
/// again leaves the table unchanged; returns whether a row was added.
pub async fn mirror_confirmed(
    pool: &DbPool,
    record: &NormalizedTransaction,
    tx_hash: &str,
) -> Result<bool, StorageError> {
    let status = if record.is_correction() { "Correction" } else { "Original" };

    let result = sqlx::query(
        "INSERT OR IGNORE INTO transactions
            (id, description, amount, category, date, notes, source, status, original_id, net_effect, tx_hash)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id.to_string())
    .bind(&record.description)
    .bind(record.amount.to_string())
    .bind(record.category.as_str())
    .bind(record.date.format("%Y-%m-%d").to_string())
    .bind(&record.notes)
    .bind(record.source.to_string())
    .bind(status)
    .bind(record.original_id.map(|id| id.to_string()))
    .bind(record.net_effect.map(|n| n.to_string()))
    .bind(tx_hash)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() > 0;
    if !inserted {
        tracing::debug!(id = %record.id, tx_hash, "record already mirrored");
    }
    Ok(inserted)
}

type RecordRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
);

/// Newest first by date; insertion order breaks ties, latest first.
pub async fn get_records(pool: &DbPool) -> Result<Vec<MirroredRecord>, StorageError> {
    let rows = sqlx::query_as::<_, RecordRow>(
        "SELECT id, description, amount, category, date, notes, source, status, original_id, net_effect, tx_hash
         FROM transactions ORDER BY date DESC, row_id DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(
            |(id, description, amount, category, date, notes, source, status, original_id, net_effect, tx_hash)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| StorageError::CorruptRow {
                    id: id.clone(),
                    reason: format!("bad date '{date}': {e}"),
                })?;
                Ok(MirroredRecord {
                    id,
                    description,
                    amount,
                    category,
                    date,
                    notes,
                    source,
                    status,
                    original_id,
                    net_effect,
                    tx_hash,
                })
            },
        )
        .collect()
}
