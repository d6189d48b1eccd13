//! Durable client-side storage for the departures console.
//!
//! The only thing persisted is the session token, in a single-row sqlite
//! table, so a restarted console keeps its signed-in session.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

#[derive(Clone)]
pub struct SessionDb {
    pool: Pool<Sqlite>,
}

impl SessionDb {
    pub async fn new(database_url: &str) -> Result<Self> {
        let database_url = normalize_database_url(database_url);
        ensure_sqlite_parent_dir_exists(&database_url)?;

        let connect_options =
            SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await?;

        let db = Self { pool };
        db.ensure_session_table().await?;
        Ok(db)
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
            CREATE TABLE IF NOT EXISTS session (
                id         INTEGER PRIMARY KEY CHECK (id = 1),
                token      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create session table")?;
        Ok(())
    }

    pub async fn load_token(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT token FROM session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("token")))
    }

    pub async fn save_token(&self, token: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session (id, token, updated_at)
            VALUES (1, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (id) DO UPDATE
            SET token = excluded.token, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .context("failed to persist session token")?;
        Ok(())
    }

    pub async fn clear_token(&self) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE id = 1")
            .execute(&self.pool)
            .await
            .context("failed to clear session token")?;
        Ok(())
    }
}

fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();

    if raw.is_empty() {
        return "sqlite://./data/session.db".to_string();
    }

    if raw.starts_with("sqlite::memory:") || raw.contains("://") {
        return raw.to_string();
    }

    if let Some(path) = raw.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw.replace('\\', "/"))
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
