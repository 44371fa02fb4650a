//! API Models
//!
//! Request and response bodies for the REST API, with `utoipa` schemas for
//! the OpenAPI document. Responses are built from the core types through the
//! `From` impls below.

use chrono::{DateTime, Utc};
use reflect_core::{
    Entry, Outcome, Record, TurnOutcome,
    admin::StudentSummary,
    session::{Phase, SessionView},
    topic::{Resource, TopicMark},
    transcript::{self, Speaker},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct StartSessionPayload {
    #[schema(example = "S1")]
    pub student_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AnswerPayload {
    #[schema(example = "The restoring force is proportional to the displacement.")]
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Active,
    AwaitingGrade,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Student,
    Assistant,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
    Current,
    Answered,
    Skipped,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct MessageResponse {
    pub role: MessageRole,
    #[schema(example = "AI Learning Companion")]
    pub speaker: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TopicResponse {
    #[schema(example = "Simple Harmonic Motion")]
    pub name: String,
    pub state: TopicState,
    pub keywords: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionResponse {
    pub student_id: String,
    pub phase: SessionPhase,
    pub turn_count: u32,
    pub turn_limit: u32,
    pub messages: Vec<MessageResponse>,
    pub topics: Vec<TopicResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    Admin,
    Student,
}

/// Where an entered id leads: the admin view, or a student session.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct EntryResponse {
    pub mode: EntryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct RecordResponse {
    pub id: i64,
    pub student_id: String,
    pub date: DateTime<Utc>,
    pub score: u8,
    #[schema(example = "Pass")]
    pub status: String,
    pub transcript: String,
    pub topic_index: usize,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ResourceResponse {
    pub label: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct OutcomeResponse {
    pub record: RecordResponse,
    pub feedback: String,
    pub resources: Vec<ResourceResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Continue,
    Completed,
}

/// Either the updated session, or the saved outcome once it has been graded.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TurnResponse {
    pub state: TurnState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct StudentSummaryResponse {
    pub student_id: String,
    #[schema(example = "In Progress (5/17)")]
    pub learning_status: String,
    #[schema(example = "5/17")]
    pub topics_completed: String,
    pub total_sessions: usize,
    pub latest_score: u8,
    pub average_score: f64,
    pub latest_status: String,
    pub last_active: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "gateway_unavailable")]
    pub code: String,
    pub message: String,
}

impl From<Phase> for SessionPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Active => Self::Active,
            Phase::AwaitingGrade => Self::AwaitingGrade,
        }
    }
}

impl From<TopicMark> for TopicState {
    fn from(mark: TopicMark) -> Self {
        match mark {
            TopicMark::Current => Self::Current,
            TopicMark::Answered => Self::Answered,
            TopicMark::Skipped => Self::Skipped,
        }
    }
}

impl From<&transcript::Entry> for MessageResponse {
    fn from(entry: &transcript::Entry) -> Self {
        let role = match entry.speaker {
            Speaker::Student => MessageRole::Student,
            Speaker::Assistant => MessageRole::Assistant,
        };
        Self {
            role,
            speaker: entry.speaker.label().to_string(),
            text: entry.text.clone(),
        }
    }
}

impl From<SessionView> for SessionResponse {
    fn from(view: SessionView) -> Self {
        Self {
            student_id: view.student_id,
            phase: view.phase.into(),
            turn_count: view.turn_count,
            turn_limit: view.turn_limit,
            messages: view.messages.iter().map(MessageResponse::from).collect(),
            topics: view
                .topics
                .into_iter()
                .map(|t| TopicResponse {
                    name: t.name.to_string(),
                    state: t.mark.into(),
                    keywords: t.keywords.iter().map(|k| k.to_string()).collect(),
                })
                .collect(),
        }
    }
}

impl From<Entry> for EntryResponse {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Admin => Self {
                mode: EntryMode::Admin,
                session: None,
            },
            Entry::Student { session } => Self {
                mode: EntryMode::Student,
                session: Some(session.into()),
            },
        }
    }
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            date: record.date,
            score: record.score,
            status: record.status.to_string(),
            transcript: record.transcript,
            topic_index: record.topic_index,
        }
    }
}

impl From<Resource> for ResourceResponse {
    fn from(resource: Resource) -> Self {
        Self {
            label: resource.label.to_string(),
            url: resource.url.to_string(),
        }
    }
}

impl From<Outcome> for OutcomeResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            record: outcome.record.into(),
            feedback: outcome.feedback,
            resources: outcome.resources.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Outcome> for TurnResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            state: TurnState::Completed,
            session: None,
            outcome: Some(outcome.into()),
        }
    }
}

impl From<TurnOutcome> for TurnResponse {
    fn from(turn: TurnOutcome) -> Self {
        match turn {
            TurnOutcome::Continue { session } => Self {
                state: TurnState::Continue,
                session: Some(session.into()),
                outcome: None,
            },
            TurnOutcome::Completed { outcome } => outcome.into(),
        }
    }
}

impl From<StudentSummary> for StudentSummaryResponse {
    fn from(summary: StudentSummary) -> Self {
        Self {
            topics_completed: format!(
                "{}/{}",
                summary.topics_completed,
                reflect_core::topic::CATALOG.len()
            ),
            student_id: summary.student_id,
            learning_status: summary.learning_status.to_string(),
            total_sessions: summary.total_sessions,
            latest_score: summary.latest_score,
            average_score: summary.average_score,
            latest_status: summary.latest_status.to_string(),
            last_active: summary.last_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflect_core::{grading::GradeStatus, session::Session, topic::CATALOG};
    use serde_json::json;

    #[test]
    fn test_start_session_payload_deserialization() {
        let payload: StartSessionPayload =
            serde_json::from_str(r#"{"student_id": "S1"}"#).unwrap();
        assert_eq!(payload.student_id, "S1");
    }

    #[test]
    fn test_admin_entry_has_no_session() {
        let json = serde_json::to_value(EntryResponse::from(Entry::Admin)).unwrap();
        assert_eq!(json, json!({"mode": "admin"}));
    }

    #[test]
    fn test_session_response_from_view() {
        let mut session = Session::new("S1", 0, 5);
        session.push_reply("Welcome! Let's start with Simple Harmonic Motion.");
        session.record_skip();

        let response = SessionResponse::from(session.view());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["phase"], "active");
        assert_eq!(json["turn_count"], 0);
        assert_eq!(json["messages"][0]["role"], "assistant");
        assert_eq!(json["messages"][0]["speaker"], "AI Learning Companion");
        assert_eq!(json["messages"][1]["role"], "student");
        assert_eq!(json["topics"][0]["state"], "skipped");
        assert_eq!(json["topics"][1]["name"], CATALOG[1].name);
        assert_eq!(json["topics"][1]["state"], "current");
    }

    #[test]
    fn test_completed_turn_serialization() {
        let record = Record {
            id: 7,
            student_id: "S1".to_string(),
            date: Utc::now(),
            score: 72,
            status: GradeStatus::Pass,
            transcript: "Student: hi".to_string(),
            topic_index: 5,
        };
        let outcome = Outcome {
            record,
            feedback: "Good job".to_string(),
            resources: vec![CATALOG[0].resource],
        };

        let json = serde_json::to_value(TurnResponse::from(TurnOutcome::Completed { outcome }))
            .unwrap();
        assert_eq!(json["state"], "completed");
        assert!(json.get("session").is_none());
        assert_eq!(json["outcome"]["record"]["status"], "Pass");
        assert_eq!(json["outcome"]["record"]["score"], 72);
        assert_eq!(json["outcome"]["resources"][0]["url"], CATALOG[0].resource.url);
    }
}
