use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::ProgressRecord,
    protocol::{decode_save_payload, encode_save_payload},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Slot name used when the host does not configure one.
pub const DEFAULT_SAVE_SLOT: &str = "aq_save";

/// Durable home of the learner's progress record.
///
/// `load` distinguishes a broken medium (`Err`) from an empty or unreadable
/// slot (`Ok(None)`); callers treat both as a fresh start.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self) -> Result<Option<ProgressRecord>>;
    async fn save(&self, record: &ProgressRecord) -> Result<()>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredSlot {
    pub payload: String,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every in-memory connection is its own database; the single one must outlive the pool.
        let pool_options = if database_url.starts_with("sqlite::memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open save database '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn write_slot(&self, slot: &str, payload: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO save_slots (slot, payload, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(slot) DO UPDATE SET payload=excluded.payload, updated_at=excluded.updated_at",
        )
        .bind(slot)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write save slot '{slot}'"))?;
        Ok(())
    }

    pub async fn read_slot(&self, slot: &str) -> Result<Option<StoredSlot>> {
        let row = sqlx::query("SELECT payload, updated_at FROM save_slots WHERE slot = ?")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read save slot '{slot}'"))?;
        Ok(row.map(|r| StoredSlot {
            payload: r.get::<String, _>(0),
            updated_at: r.get::<DateTime<Utc>, _>(1),
        }))
    }
}

/// One named save slot inside a [`Storage`] database.
#[derive(Clone)]
pub struct SaveSlot {
    storage: Storage,
    key: String,
}

impl SaveSlot {
    pub fn new(storage: Storage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl ProgressStore for SaveSlot {
    async fn load(&self) -> Result<Option<ProgressRecord>> {
        let Some(stored) = self.storage.read_slot(&self.key).await? else {
            debug!(slot = %self.key, "save slot is empty");
            return Ok(None);
        };

        let record = decode_save_payload(&stored.payload);
        if record.is_none() {
            warn!(slot = %self.key, "save slot payload is unreadable; ignoring it");
        } else {
            debug!(slot = %self.key, updated_at = %stored.updated_at, "restored save slot");
        }
        Ok(record)
    }

    async fn save(&self, record: &ProgressRecord) -> Result<()> {
        let payload = encode_save_payload(record).context("failed to encode progress record")?;
        self.storage.write_slot(&self.key, &payload).await
    }
}

/// Process-local store holding the encoded payload, so it goes through the
/// same codec as the sqlite slot.
#[derive(Default)]
pub struct MemoryStore {
    payload: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(raw: impl Into<String>) -> Self {
        Self {
            payload: Mutex::new(Some(raw.into())),
        }
    }

    pub async fn raw_payload(&self) -> Option<String> {
        self.payload.lock().await.clone()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load(&self) -> Result<Option<ProgressRecord>> {
        Ok(self
            .payload
            .lock()
            .await
            .as_deref()
            .and_then(decode_save_payload))
    }

    async fn save(&self, record: &ProgressRecord) -> Result<()> {
        let payload = encode_save_payload(record).context("failed to encode progress record")?;
        *self.payload.lock().await = Some(payload);
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
