use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tracing::info;

use shared::{
    domain::{ConversionState, MeetingId, PresentationId},
    protocol::{ReconcileSnapshot, ServerPresentationRecord},
};

/// Server-side store of presentation records, keyed by meeting and filename.
/// The reconciliation feed is built from this view; the deletion side-channel
/// clears it per meeting or wholesale.
#[derive(Clone)]
pub struct PresentationStore {
    pool: Pool<Sqlite>,
}

impl PresentationStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
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

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS presentations (
                meeting_id        TEXT NOT NULL,
                presentation_id   TEXT NOT NULL,
                filename          TEXT NOT NULL,
                is_current        INTEGER NOT NULL DEFAULT 0,
                conversion_done   INTEGER NOT NULL DEFAULT 0,
                conversion_error  TEXT,
                pages_completed   INTEGER NOT NULL DEFAULT 0,
                num_pages         INTEGER NOT NULL DEFAULT 0,
                conversion_status TEXT,
                updated_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (meeting_id, filename)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create presentations table")?;
        Ok(())
    }

    /// Inserts or replaces the record for `(meeting, filename)`. Conversion
    /// progress updates from the pipeline land here repeatedly for the same
    /// filename.
    pub async fn upsert_record(
        &self,
        meeting_id: &MeetingId,
        record: &ServerPresentationRecord,
    ) -> Result<()> {
        let conversion_error = record
            .conversion
            .error
            .map(|code| serde_json::to_string(&code))
            .transpose()?;
        let conversion_status = record
            .conversion
            .status
            .map(|code| serde_json::to_string(&code))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO presentations (
                meeting_id, presentation_id, filename, is_current,
                conversion_done, conversion_error, pages_completed, num_pages,
                conversion_status, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (meeting_id, filename) DO UPDATE SET
                presentation_id = excluded.presentation_id,
                is_current = excluded.is_current,
                conversion_done = excluded.conversion_done,
                conversion_error = excluded.conversion_error,
                pages_completed = excluded.pages_completed,
                num_pages = excluded.num_pages,
                conversion_status = excluded.conversion_status,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(meeting_id.as_str())
        .bind(record.id.as_str())
        .bind(&record.filename)
        .bind(record.is_current)
        .bind(record.conversion.done)
        .bind(conversion_error)
        .bind(record.conversion.pages_completed as i64)
        .bind(record.conversion.num_pages as i64)
        .bind(conversion_status)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "failed to upsert presentation {} for meeting {}",
                record.filename, meeting_id
            )
        })?;
        Ok(())
    }

    /// Records for one meeting, in insertion order.
    pub async fn list_records(&self, meeting_id: &MeetingId) -> Result<Vec<ServerPresentationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT presentation_id, filename, is_current, conversion_done,
                   conversion_error, pages_completed, num_pages, conversion_status
            FROM presentations
            WHERE meeting_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(meeting_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list presentations for meeting {meeting_id}"))?;

        rows.into_iter()
            .map(|row| {
                let conversion_error: Option<String> = row.get("conversion_error");
                let conversion_status: Option<String> = row.get("conversion_status");
                Ok(ServerPresentationRecord {
                    id: PresentationId::new(row.get::<String, _>("presentation_id")),
                    filename: row.get("filename"),
                    is_current: row.get("is_current"),
                    conversion: ConversionState {
                        done: row.get("conversion_done"),
                        error: conversion_error
                            .map(|raw| serde_json::from_str(&raw))
                            .transpose()
                            .context("invalid conversion_error column")?,
                        pages_completed: row.get::<i64, _>("pages_completed") as u32,
                        num_pages: row.get::<i64, _>("num_pages") as u32,
                        status: conversion_status
                            .map(|raw| serde_json::from_str(&raw))
                            .transpose()
                            .context("invalid conversion_status column")?,
                    },
                })
            })
            .collect()
    }

    /// Builds one reconciliation feed delivery for the meeting, stamped with
    /// the latest store write time (or now, for an empty meeting).
    pub async fn snapshot(&self, meeting_id: &MeetingId) -> Result<ReconcileSnapshot> {
        let records = self.list_records(meeting_id).await?;
        let latest: Option<String> =
            sqlx::query_scalar("SELECT MAX(updated_at) FROM presentations WHERE meeting_id = ?")
                .bind(meeting_id.as_str())
                .fetch_one(&self.pool)
                .await
                .context("failed to read latest presentation update time")?;
        let reported_at = latest
            .and_then(|raw| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S").ok())
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        Ok(ReconcileSnapshot {
            records,
            reported_at,
        })
    }

    /// Deletion side-channel: removes every stored record for the meeting,
    /// or every record in the store when no meeting is given. Administrative
    /// operation, separate from the per-item state machine.
    pub async fn clear_presentations(&self, meeting_id: Option<&MeetingId>) -> Result<u64> {
        let result = match meeting_id {
            Some(meeting_id) => {
                sqlx::query("DELETE FROM presentations WHERE meeting_id = ?")
                    .bind(meeting_id.as_str())
                    .execute(&self.pool)
                    .await
                    .with_context(|| {
                        format!("failed to clear presentations for meeting {meeting_id}")
                    })?
            }
            None => {
                let result = sqlx::query("DELETE FROM presentations")
                    .execute(&self.pool)
                    .await
                    .context("failed to clear presentations")?;
                info!(rows = result.rows_affected(), "cleared presentations (all)");
                result
            }
        };
        Ok(result.rows_affected())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database dir {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
