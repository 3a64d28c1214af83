//! [`SqliteSecretStore`]: SQLite-backed secret storage.
//!
//! # Schema
//!
//! ```text
//! secrets(
//!     id               CHAR(36) PRIMARY KEY,   -- UUID v4
//!     encrypted_secret TEXT NOT NULL,          -- base64(ciphertext + tag)
//!     encryption_iv    TEXT NOT NULL,          -- base64(16-byte IV)
//!     expires_at       TEXT NOT NULL,          -- RFC 3339 UTC, indexed
//!     created_at       TEXT NOT NULL
//! )
//! ```
//!
//! Timestamps are written with a fixed format (UTC, microseconds, `Z`) so that
//! lexical comparison in SQL matches chronological order.

use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteRow, SqliteSynchronous,
};
use sqlx::Row;

use super::{SecretStore, StoreError};
use crate::secret::SecretRecord;

/// Repository for secret rows.
#[derive(Clone, Debug)]
pub struct SqliteSecretStore {
    pool: SqlitePool,
}

impl SqliteSecretStore {
    /// Wrap an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool with WAL mode and create the database file if missing.
    ///
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite:secrets.db")
    ///
    /// # Errors
    /// Returns `StoreError::Database` if the URL is invalid or connection fails.
    #[tracing::instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        tracing::debug!("database pool created");
        Ok(Self::new(pool))
    }

    /// Create the `secrets` table and its expiry index if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS secrets (
                id CHAR(36) PRIMARY KEY,
                encrypted_secret TEXT NOT NULL,
                encryption_iv VARCHAR(32) NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_secrets_expires_at ON secrets (expires_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
    #[tracing::instrument(skip(self, record), fields(secret_id = %record.id))]
    async fn create(&self, record: &SecretRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO secrets (id, encrypted_secret, encryption_iv, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(STANDARD.encode(&record.ciphertext))
        .bind(STANDARD.encode(&record.iv))
        .bind(format_timestamp(record.expires_at))
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        tracing::debug!("secret row inserted");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(secret_id = %id))]
    async fn find_if_present(&self, id: &str) -> Result<Option<SecretRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, encrypted_secret, encryption_iv, expires_at, created_at
            FROM secrets
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(parse_secret_row).transpose()
    }

    #[tracing::instrument(skip(self), fields(secret_id = %id))]
    async fn delete_if_present(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM secrets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM secrets WHERE expires_at <= ?")
            .bind(format_timestamp(now))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_secret_row(row: &SqliteRow) -> Result<SecretRecord, StoreError> {
    let id: String = row.try_get("id")?;
    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.clone(),
        reason,
    };

    let ciphertext = STANDARD
        .decode(row.try_get::<String, _>("encrypted_secret")?)
        .map_err(|e| corrupt(format!("encrypted_secret: {e}")))?;
    let iv = STANDARD
        .decode(row.try_get::<String, _>("encryption_iv")?)
        .map_err(|e| corrupt(format!("encryption_iv: {e}")))?;
    let expires_at = DateTime::parse_from_rfc3339(&row.try_get::<String, _>("expires_at")?)
        .map_err(|e| corrupt(format!("expires_at: {e}")))?
        .with_timezone(&Utc);
    let created_at = DateTime::parse_from_rfc3339(&row.try_get::<String, _>("created_at")?)
        .map_err(|e| corrupt(format!("created_at: {e}")))?
        .with_timezone(&Utc);

    Ok(SecretRecord {
        id,
        ciphertext,
        iv,
        expires_at,
        created_at,
    })
}
