//! Admin View
//!
//! Read-only projections over the stored records: per-student summaries,
//! per-student transcript listings and CSV exports.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::{
    grading::{GradeStatus, MAX_SCORE},
    store::Record,
    topic::CATALOG,
};

/// How far a student is through the topic catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningStatus {
    JustStarted,
    InProgress(usize),
    CompletedAllTopics,
}

impl LearningStatus {
    pub fn from_progress(topic_index: usize) -> Self {
        if topic_index >= CATALOG.len() {
            Self::CompletedAllTopics
        } else if topic_index == 0 {
            Self::JustStarted
        } else {
            Self::InProgress(topic_index)
        }
    }
}

impl std::fmt::Display for LearningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = CATALOG.len();
        match self {
            Self::JustStarted => write!(f, "Just Started (0/{total})"),
            Self::InProgress(n) => write!(f, "In Progress ({n}/{total})"),
            Self::CompletedAllTopics => f.write_str("Completed All Topics"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentSummary {
    pub student_id: String,
    pub learning_status: LearningStatus,
    pub topics_completed: usize,
    pub total_sessions: usize,
    pub latest_score: u8,
    /// Mean score over every session, rounded to one decimal.
    pub average_score: f64,
    pub latest_status: GradeStatus,
    pub last_active: DateTime<Utc>,
}

/// One summary per student, ordered by student id. Records written under the
/// admin id are left out.
pub fn summarize(records: &[Record], admin_id: &str) -> Vec<StudentSummary> {
    let mut by_student: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.student_id != admin_id) {
        by_student.entry(&record.student_id).or_default().push(record);
    }

    by_student
        .into_iter()
        .filter_map(|(student_id, sessions)| {
            let latest = sessions.iter().max_by_key(|r| (r.date, r.id))?;
            let total: u32 = sessions.iter().map(|r| u32::from(r.score)).sum();
            let average = f64::from(total) / sessions.len() as f64;
            let topics_completed = latest.topic_index.min(CATALOG.len());
            Some(StudentSummary {
                student_id: student_id.to_string(),
                learning_status: LearningStatus::from_progress(latest.topic_index),
                topics_completed,
                total_sessions: sessions.len(),
                latest_score: latest.score,
                average_score: (average * 10.0).round() / 10.0,
                latest_status: latest.status,
                last_active: latest.date,
            })
        })
        .collect()
}

/// Every record of `student_id`, newest first.
pub fn student_records(records: &[Record], student_id: &str) -> Vec<Record> {
    let mut own: Vec<Record> = records
        .iter()
        .filter(|r| r.student_id == student_id)
        .cloned()
        .collect();
    own.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
    own
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Records as CSV: `id,student_id,date,score,status,transcript`.
pub fn records_csv(records: &[Record]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["id", "student_id", "date", "score", "status", "transcript"])?;
    for record in records {
        writer.write_record([
            record.id.to_string(),
            record.student_id.clone(),
            format_date(&record.date),
            record.score.to_string(),
            record.status.to_string(),
            record.transcript.clone(),
        ])?;
    }
    finish(writer)
}

pub fn summaries_csv(summaries: &[StudentSummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "student_id",
        "learning_status",
        "topics_completed",
        "total_sessions",
        "latest_score",
        "average_score",
        "latest_status",
        "last_active",
    ])?;
    for s in summaries {
        writer.write_record([
            s.student_id.clone(),
            s.learning_status.to_string(),
            format!("{}/{}", s.topics_completed, CATALOG.len()),
            s.total_sessions.to_string(),
            format!("{}/{MAX_SCORE}", s.latest_score),
            format!("{:.1}/{MAX_SCORE}", s.average_score),
            s.latest_status.to_string(),
            format_date(&s.last_active),
        ])?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
