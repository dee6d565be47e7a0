use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Single slot for the persisted session. The client process holds exactly
/// one session at a time, so the table is keyed by a fixed slot id.
const SESSION_SLOT: i64 = 1;

/// Durable client-side state. Currently holds only the bearer token for
/// the active session; the callers treat every failure as soft and degrade
/// to in-memory state.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_session_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_session_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_session (
                slot       INTEGER PRIMARY KEY,
                token      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create auth_session table")?;
        Ok(())
    }

    pub async fn load_session_token(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT token FROM auth_session WHERE slot = ?1")
            .bind(SESSION_SLOT)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load session token")?;
        Ok(row.map(|row| row.get::<String, _>("token")))
    }

    pub async fn save_session_token(&self, token: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_session (slot, token, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slot) DO UPDATE SET token = excluded.token,
                                            updated_at = excluded.updated_at
            "#,
        )
        .bind(SESSION_SLOT)
        .bind(token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to save session token")?;
        Ok(())
    }

    pub async fn clear_session_token(&self) -> Result<()> {
        sqlx::query("DELETE FROM auth_session WHERE slot = ?1")
            .bind(SESSION_SLOT)
            .execute(&self.pool)
            .await
            .context("failed to clear session token")?;
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
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
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
