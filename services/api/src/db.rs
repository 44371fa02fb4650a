//! Data Access Layer
//!
//! The SQLite-backed [`TranscriptStore`]. Graded sessions land in the
//! append-only `interviews` table; nothing here updates or deletes a row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reflect_core::{
    grading::GradeStatus,
    store::{NewRecord, Record, RecordId, TranscriptStore},
};
use sqlx::SqlitePool;
use tracing::debug;

/// A wrapper around the `SqlitePool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    student_id: String,
    date: DateTime<Utc>,
    score: i64,
    status: String,
    transcript: String,
    topic_index: i64,
}

impl TryFrom<RecordRow> for Record {
    type Error = anyhow::Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok(Record {
            id: row.id,
            student_id: row.student_id,
            date: row.date,
            score: u8::try_from(row.score)
                .with_context(|| format!("Record {} has an out-of-range score", row.id))?,
            status: row
                .status
                .parse::<GradeStatus>()
                .with_context(|| format!("Record {} has an unknown status", row.id))?,
            transcript: row.transcript,
            topic_index: usize::try_from(row.topic_index).unwrap_or(0),
        })
    }
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for Db {
    async fn append(&self, record: NewRecord) -> Result<RecordId> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO interviews (student_id, date, score, status, transcript, topic_index)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&record.student_id)
        .bind(record.date)
        .bind(i64::from(record.score))
        .bind(record.status.as_str())
        .bind(&record.transcript)
        .bind(record.topic_index as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert interview record")?;

        debug!(id, student_id = %record.student_id, "Inserted interview record");
        Ok(id)
    }

    async fn read_all(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, student_id, date, score, status, transcript, topic_index
            FROM interviews
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read interview records")?;

        rows.into_iter().map(Record::try_from).collect()
    }

    async fn next_topic_index(&self, student_id: &str) -> Result<usize> {
        let latest = sqlx::query_scalar::<_, i64>(
            "SELECT topic_index FROM interviews WHERE student_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up student progress")?;

        Ok(latest.map_or(0, |index| usize::try_from(index).unwrap_or(0)))
    }
}

#[cfg(test)]
pub(crate) async fn memory_db() -> Db {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite should open");
    let db = Db::new(pool);
    db.run_migrations().await.expect("migrations should apply");
    db
}
