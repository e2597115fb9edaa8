use super::ChatStore;
use crate::error::StoreError;
use crate::workflow::{WorkflowState, WorkflowStep};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;

/// SQLite-backed chat store using an sqlx async pool.
pub struct SqliteChatStore {
    pool: SqlitePool,
}

const CHAT_SCHEMA_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS chat_schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";
const CHAT_SCHEMA_VERSION_KEY: &str = "chat_schema_version";
const CHAT_SCHEMA_VERSION: u32 = 1;

async fn ensure_chat_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CHAT_SCHEMA_META_TABLE)
        .execute(pool)
        .await
        .context("create chat_schema_meta table")?;

    let stored_version: Option<(String,)> =
        sqlx::query_as("SELECT value FROM chat_schema_meta WHERE key = $1")
            .bind(CHAT_SCHEMA_VERSION_KEY)
            .fetch_optional(pool)
            .await
            .context("load chat schema version")?;

    if let Some((value,)) = stored_version {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("invalid chat schema version value: {value}"))?;
        anyhow::ensure!(
            parsed == CHAT_SCHEMA_VERSION,
            "incompatible chat schema version: stored={parsed}, expected={CHAT_SCHEMA_VERSION}. \
remove the chat database and restart."
        );
        return Ok(());
    }

    sqlx::query("INSERT INTO chat_schema_meta (key, value) VALUES ($1, $2)")
        .bind(CHAT_SCHEMA_VERSION_KEY)
        .bind(CHAT_SCHEMA_VERSION.to_string())
        .execute(pool)
        .await
        .context("persist chat schema version")?;

    Ok(())
}

impl SqliteChatStore {
    /// Create a new store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_chat_schema_version(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS response_snapshots (
                 chat_id TEXT PRIMARY KEY,
                 content TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create response_snapshots table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workflow_states (
                 chat_id TEXT PRIMARY KEY,
                 status TEXT NOT NULL,
                 current_step TEXT,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create workflow_states table")?;

        Ok(Self { pool })
    }

    /// Open (or create) a database file.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create database directory {}", parent.display()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("open chat database {}", path.display()))?;
        Self::new(pool).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_workflow_state(
    chat_id: &str,
    status: &str,
    current_step: Option<String>,
) -> Result<WorkflowState> {
    match (status, current_step) {
        ("idle", _) => Ok(WorkflowState::Idle),
        ("active", Some(raw)) => match WorkflowStep::from_str(&raw) {
            Ok(step) => Ok(WorkflowState::active(step)),
            Err(_) => Err(StoreError::UnknownStep {
                chat_id: chat_id.to_string(),
                raw,
            }
            .into()),
        },
        ("active", None) => Err(StoreError::UnknownStep {
            chat_id: chat_id.to_string(),
            raw: String::new(),
        }
        .into()),
        (other, _) => anyhow::bail!("unknown workflow status for {chat_id}: {other}"),
    }
}

impl ChatStore for SqliteChatStore {
    fn save_snapshot<'a>(
        &'a self,
        chat_id: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO response_snapshots (chat_id, content, updated_at)
                 VALUES ($1, $2, $3)
                 ON CONFLICT(chat_id) DO UPDATE
                 SET content = excluded.content, updated_at = excluded.updated_at",
            )
            .bind(chat_id)
            .bind(text)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("save response snapshot")?;
            Ok(())
        })
    }

    fn load_snapshot<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT content FROM response_snapshots WHERE chat_id = $1")
                    .bind(chat_id)
                    .fetch_optional(&self.pool)
                    .await
                    .context("load response snapshot")?;
            Ok(row.map(|(content,)| content))
        })
    }

    fn read_workflow_state<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowState>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT status, current_step FROM workflow_states WHERE chat_id = $1",
            )
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
            .context("query workflow state")?;

            let Some(row) = row else {
                return Ok(WorkflowState::Idle);
            };
            let status: String = row.try_get("status")?;
            let current_step: Option<String> = row.try_get("current_step")?;
            decode_workflow_state(chat_id, &status, current_step)
        })
    }

    fn write_workflow_state<'a>(
        &'a self,
        chat_id: &'a str,
        state: WorkflowState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO workflow_states (chat_id, status, current_step, updated_at)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT(chat_id) DO UPDATE
                 SET status = excluded.status,
                     current_step = excluded.current_step,
                     updated_at = excluded.updated_at",
            )
            .bind(chat_id)
            .bind(state.status().to_string())
            .bind(state.current_step().map(WorkflowStep::as_str))
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("write workflow state")?;
            Ok(())
        })
    }
}
