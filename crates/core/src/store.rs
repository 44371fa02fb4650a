//! Transcript Store
//!
//! The append-only persistence contract for graded sessions. Records are
//! written once and never updated or deleted. The SQLite implementation lives
//! in the API service; [`MemoryStore`] backs tests and scripted demos.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::grading::GradeStatus;

pub type RecordId = i64;

/// A graded session about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub student_id: String,
    pub date: DateTime<Utc>,
    pub score: u8,
    pub status: GradeStatus,
    pub transcript: String,
    /// Catalog position the student reached; the next session resumes here.
    pub topic_index: usize,
}

impl NewRecord {
    pub fn with_id(self, id: RecordId) -> Record {
        Record {
            id,
            student_id: self.student_id,
            date: self.date,
            score: self.score,
            status: self.status,
            transcript: self.transcript,
            topic_index: self.topic_index,
        }
    }
}

/// A persisted, immutable session outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub student_id: String,
    pub date: DateTime<Utc>,
    pub score: u8,
    pub status: GradeStatus,
    pub transcript: String,
    pub topic_index: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Inserts a record and returns its assigned, monotonically increasing id.
    async fn append(&self, record: NewRecord) -> Result<RecordId>;

    /// All records in insertion order.
    async fn read_all(&self) -> Result<Vec<Record>>;

    /// The `topic_index` of the student's most recent record, or 0.
    async fn next_topic_index(&self, student_id: &str) -> Result<usize>;
}

/// An in-process store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn append(&self, record: NewRecord) -> Result<RecordId> {
        let mut records = self.records.write().await;
        let id = records.last().map_or(1, |r| r.id + 1);
        records.push(record.with_id(id));
        Ok(id)
    }

    async fn read_all(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }

    async fn next_topic_index(&self, student_id: &str) -> Result<usize> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.student_id == student_id)
            .map_or(0, |r| r.topic_index))
    }
}

#[cfg(test)]
pub(crate) fn sample_record(student_id: &str, score: u8, topic_index: usize) -> NewRecord {
    NewRecord {
        student_id: student_id.to_string(),
        date: Utc::now(),
        score,
        status: GradeStatus::for_score(score, 60),
        transcript: format!("Student: answer from {student_id}"),
        topic_index,
    }
}
