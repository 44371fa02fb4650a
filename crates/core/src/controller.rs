//! Session & Grading Controller
//!
//! Owns every stateful decision about a student's session: starting or
//! resuming it, advancing turns and topics, deciding when it ends, grading it
//! exactly once and handing the record to the store.
//!
//! A failed gateway call leaves the session exactly as it was before the
//! action, so the student can simply retry. Once a session is waiting to be
//! graded, `finish` retries whatever is left: the grading call if it failed,
//! or only the store write if grading already succeeded.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ControllerError,
    gateway::{Cue, LanguageModelGateway},
    grading::Grade,
    registry::{SessionRegistry, SessionSlot},
    session::{Advance, Phase, Session, SessionPolicy, SessionView},
    store::{NewRecord, Record, TranscriptStore},
    topic::Resource,
};

/// Where an entered id leads.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// The admin sentinel; no session was touched.
    Admin,
    /// A started or resumed student session.
    Student { session: SessionView },
}

/// The result of an answer or skip.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Continue { session: SessionView },
    Completed { outcome: Outcome },
}

/// What the student sees once their session is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub record: Record,
    pub feedback: String,
    pub resources: Vec<Resource>,
}

pub struct SessionController {
    gateway: Arc<dyn LanguageModelGateway>,
    store: Arc<dyn TranscriptStore>,
    registry: SessionRegistry,
    policy: SessionPolicy,
    admin_id: String,
}

impl SessionController {
    pub fn new(
        gateway: Arc<dyn LanguageModelGateway>,
        store: Arc<dyn TranscriptStore>,
        policy: SessionPolicy,
        admin_id: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            registry: SessionRegistry::new(),
            policy,
            admin_id: admin_id.into(),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    /// Case-sensitive comparison against the configured admin sentinel.
    pub fn is_admin(&self, id: &str) -> bool {
        id.trim() == self.admin_id
    }

    pub async fn live_sessions(&self) -> usize {
        self.registry.live_sessions().await
    }

    /// Routes an entered id: the admin sentinel goes to the admin view,
    /// anything else starts a session or resumes the live one.
    #[instrument(skip(self))]
    pub async fn enter(&self, student_id: &str) -> Result<Entry, ControllerError> {
        let student_id = normalize(student_id)?;
        if self.is_admin(student_id) {
            info!("Admin sentinel entered");
            return Ok(Entry::Admin);
        }

        let slot = self.registry.slot(student_id).await;
        let mut guard = slot.lock().await;
        let result = self.start_or_resume(&mut guard, student_id).await;
        self.release_if_empty(student_id, &slot, &guard).await;
        result
    }

    async fn start_or_resume(
        &self,
        slot: &mut Option<Session>,
        student_id: &str,
    ) -> Result<Entry, ControllerError> {
        if let Some(session) = slot.as_ref() {
            info!("Resuming live session");
            return Ok(Entry::Student {
                session: session.view(),
            });
        }

        let progress = self
            .store
            .next_topic_index(student_id)
            .await
            .map_err(ControllerError::StoreRead)?;
        let mut session = Session::new(student_id, progress, self.policy.turn_limit);

        let greeting = self
            .gateway
            .converse(session.transcript(), session.plan(), Cue::Opening)
            .await?;
        session.push_reply(greeting);

        info!(start = session.cursor(), "Started new session");
        let view = session.view();
        *slot = Some(session);
        Ok(Entry::Student { session: view })
    }

    /// The live session of `student_id`.
    pub async fn view(&self, student_id: &str) -> Result<SessionView, ControllerError> {
        let student_id = normalize(student_id)?;
        let slot = self
            .registry
            .existing(student_id)
            .await
            .ok_or_else(|| ControllerError::NoActiveSession(student_id.to_string()))?;
        let guard = slot.lock().await;
        let view = guard.as_ref().map(Session::view);
        self.release_if_empty(student_id, &slot, &guard).await;
        view.ok_or_else(|| ControllerError::NoActiveSession(student_id.to_string()))
    }

    /// Records an answer to the current topic.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn answer(&self, student_id: &str, text: &str) -> Result<TurnOutcome, ControllerError> {
        let student_id = normalize(student_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ControllerError::EmptyAnswer);
        }

        let slot = self
            .registry
            .existing(student_id)
            .await
            .ok_or_else(|| ControllerError::NoActiveSession(student_id.to_string()))?;
        let mut guard = slot.lock().await;
        let result = match active_session(&guard, student_id).cloned() {
            Ok(mut next) => {
                let advance = next.record_answer(text);
                self.apply(&mut guard, next, advance).await
            }
            Err(e) => Err(e),
        };
        self.release_if_empty(student_id, &slot, &guard).await;
        result
    }

    /// Skips the current topic without using up a turn.
    #[instrument(skip(self))]
    pub async fn skip(&self, student_id: &str) -> Result<TurnOutcome, ControllerError> {
        let student_id = normalize(student_id)?;
        let slot = self
            .registry
            .existing(student_id)
            .await
            .ok_or_else(|| ControllerError::NoActiveSession(student_id.to_string()))?;
        let mut guard = slot.lock().await;
        let result = match active_session(&guard, student_id).cloned() {
            Ok(mut next) => {
                let advance = next.record_skip();
                self.apply(&mut guard, next, advance).await
            }
            Err(e) => Err(e),
        };
        self.release_if_empty(student_id, &slot, &guard).await;
        result
    }

    /// Ends the session now and grades it, or retries a failed grading/save.
    #[instrument(skip(self))]
    pub async fn finish(&self, student_id: &str) -> Result<Outcome, ControllerError> {
        let student_id = normalize(student_id)?;
        let slot = self
            .registry
            .existing(student_id)
            .await
            .ok_or_else(|| ControllerError::NoActiveSession(student_id.to_string()))?;
        let mut guard = slot.lock().await;
        let result = match guard.as_mut() {
            Some(session) => {
                session.request_grading();
                self.complete(&mut guard).await
            }
            None => Err(ControllerError::NoActiveSession(student_id.to_string())),
        };
        self.release_if_empty(student_id, &slot, &guard).await;
        result
    }

    /// Forgets the slot of `student_id` once it no longer holds a session.
    async fn release_if_empty(&self, student_id: &str, slot: &SessionSlot, held: &Option<Session>) {
        if held.is_none() && self.registry.release(student_id, slot).await {
            debug!("Released empty session slot");
        }
    }

    /// Commits `next` once the step it asks for has succeeded.
    async fn apply(
        &self,
        slot: &mut Option<Session>,
        mut next: Session,
        advance: Advance,
    ) -> Result<TurnOutcome, ControllerError> {
        match advance {
            Advance::Ask(cue) => {
                let reply = self
                    .gateway
                    .converse(next.transcript(), next.plan(), cue)
                    .await?;
                next.push_reply(reply);
                let session = next.view();
                *slot = Some(next);
                Ok(TurnOutcome::Continue { session })
            }
            Advance::Grade => {
                *slot = Some(next);
                let outcome = self.complete(slot).await?;
                Ok(TurnOutcome::Completed { outcome })
            }
        }
    }

    /// Grades the session (at most once), persists the record and discards
    /// the session. On failure the session stays in the slot.
    async fn complete(&self, slot: &mut Option<Session>) -> Result<Outcome, ControllerError> {
        let Some(session) = slot.as_mut() else {
            return Err(ControllerError::NoActiveSession(String::new()));
        };
        let transcript = session.transcript().render();

        let grade = match session.pending_grade().cloned() {
            Some(grade) => grade,
            None => {
                let report = self.gateway.grade(&transcript).await.inspect_err(|e| {
                    warn!(error = %e, "Grading failed; session kept for retry");
                })?;
                let grade = Grade::from_report(report, self.policy.pass_threshold);
                session.set_pending_grade(grade.clone());
                grade
            }
        };

        let record = NewRecord {
            student_id: session.student_id().to_string(),
            date: Utc::now(),
            score: grade.score,
            status: grade.status,
            transcript,
            topic_index: session.cursor(),
        };
        let id = self.store.append(record.clone()).await.map_err(|e| {
            warn!(error = %e, score = grade.score, "Saving graded session failed; grade kept for retry");
            ControllerError::StoreWrite(e)
        })?;

        let outcome = Outcome {
            record: record.with_id(id),
            feedback: grade.feedback,
            resources: session.resources(),
        };
        info!(
            record_id = id,
            score = outcome.record.score,
            status = %outcome.record.status,
            "Session graded and saved"
        );
        *slot = None;
        Ok(outcome)
    }
}

fn normalize(student_id: &str) -> Result<&str, ControllerError> {
    let student_id = student_id.trim();
    if student_id.is_empty() {
        Err(ControllerError::EmptyStudentId)
    } else {
        Ok(student_id)
    }
}

fn active_session<'a>(
    slot: &'a Option<Session>,
    student_id: &str,
) -> Result<&'a Session, ControllerError> {
    let session = slot
        .as_ref()
        .ok_or_else(|| ControllerError::NoActiveSession(student_id.to_string()))?;
    match session.phase() {
        Phase::Active => Ok(session),
        Phase::AwaitingGrade => Err(ControllerError::GradingPending(student_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{GatewayError, MockLanguageModelGateway},
        grading::{GradeReport, GradeStatus},
        store::{MemoryStore, MockTranscriptStore},
        topic::CATALOG,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn report(score: i64, status: &str) -> GradeReport {
        GradeReport {
            raw_score: score,
            claimed_status: Some(status.to_string()),
            feedback: "Nice reflections.".to_string(),
        }
    }

    fn controller(
        gateway: MockLanguageModelGateway,
        store: Arc<dyn TranscriptStore>,
    ) -> SessionController {
        SessionController::new(
            Arc::new(gateway),
            store,
            SessionPolicy::default(),
            "ADMIN123",
        )
    }

    fn completed(outcome: TurnOutcome) -> Outcome {
        match outcome {
            TurnOutcome::Completed { outcome } => outcome,
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn five_answers_grade_once_and_persist_a_passing_record() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(5)
            .returning(|_, _, _| Ok("Tell me more?".to_string()));
        gateway
            .expect_grade()
            .withf(|transcript: &str| {
                transcript.split("\n\n").count() == 10
                    && transcript.matches("Student: ").count() == 5
            })
            .times(1)
            .returning(|_| Ok(report(72, "Pass")));

        let store = Arc::new(MemoryStore::new());
        let controller = controller(gateway, store.clone());

        assert!(matches!(
            controller.enter("S1").await.unwrap(),
            Entry::Student { .. }
        ));
        for i in 1..5 {
            let turn = controller.answer("S1", &format!("answer {i}")).await.unwrap();
            assert!(matches!(turn, TurnOutcome::Continue { .. }), "turn {i}");
        }
        let outcome = completed(controller.answer("S1", "answer 5").await.unwrap());

        assert_eq!(outcome.record.student_id, "S1");
        assert_eq!(outcome.record.score, 72);
        assert_eq!(outcome.record.status, GradeStatus::Pass);
        assert_eq!(outcome.record.topic_index, 5);
        assert_eq!(outcome.resources.len(), 5);

        let records = store.read_all().await.unwrap();
        assert_eq!(records, vec![outcome.record]);
        assert_eq!(controller.live_sessions().await, 0);
        assert_eq!(controller.registry.slot_count().await, 0);
        assert!(matches!(
            controller.answer("S1", "too late").await,
            Err(ControllerError::NoActiveSession(_))
        ));
    }

    #[tokio::test]
    async fn stored_status_ignores_the_model_label() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .returning(|_, _, _| Ok("Question?".to_string()));
        gateway
            .expect_grade()
            .times(1)
            .returning(|_| Ok(report(130, "Fail")));

        let store = Arc::new(MemoryStore::new());
        let controller = controller(gateway, store.clone());
        controller.enter("S1").await.unwrap();
        let outcome = controller.finish("S1").await.unwrap();

        assert_eq!(outcome.record.score, 100);
        assert_eq!(outcome.record.status, GradeStatus::Pass);
    }

    #[tokio::test]
    async fn admin_sentinel_touches_no_session_or_gateway() {
        // No expectations: any gateway or store call panics.
        let controller = SessionController::new(
            Arc::new(MockLanguageModelGateway::new()),
            Arc::new(MockTranscriptStore::new()),
            SessionPolicy::default(),
            "ADMIN123",
        );

        assert_eq!(controller.enter("ADMIN123").await.unwrap(), Entry::Admin);
        assert_eq!(controller.enter("  ADMIN123 ").await.unwrap(), Entry::Admin);
        assert_eq!(controller.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn differently_cased_sentinel_is_a_student() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(1)
            .returning(|_, _, _| Ok("Hello!".to_string()));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        assert!(matches!(
            controller.enter("admin123").await.unwrap(),
            Entry::Student { .. }
        ));
        assert!(!controller.is_admin("Admin123"));
    }

    #[tokio::test]
    async fn entering_twice_resumes_the_live_session() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(1)
            .returning(|_, _, _| Ok("Hello!".to_string()));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        let first = controller.enter("S1").await.unwrap();
        let second = controller.enter(" S1 ").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_ids_and_answers_are_rejected() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(1)
            .returning(|_, _, _| Ok("Hello!".to_string()));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        assert!(matches!(
            controller.enter("   ").await,
            Err(ControllerError::EmptyStudentId)
        ));
        controller.enter("S1").await.unwrap();
        assert!(matches!(
            controller.answer("S1", " \n ").await,
            Err(ControllerError::EmptyAnswer)
        ));
        assert_eq!(controller.view("S1").await.unwrap().turn_count, 0);
    }

    #[tokio::test]
    async fn failed_follow_up_leaves_session_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut gateway = MockLanguageModelGateway::new();
        gateway.expect_converse().times(3).returning(move |_, _, _| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                1 => Err(GatewayError::Unavailable("429 quota".to_string())),
                _ => Ok("Next question?".to_string()),
            }
        });
        let controller = controller(gateway, Arc::new(MemoryStore::new()));
        controller.enter("S1").await.unwrap();
        let before = controller.view("S1").await.unwrap();

        let err = controller.answer("S1", "an answer").await.unwrap_err();
        assert!(matches!(err, ControllerError::GatewayUnavailable(_)));
        assert_eq!(controller.view("S1").await.unwrap(), before);

        let retried = controller.answer("S1", "an answer").await.unwrap();
        match retried {
            TurnOutcome::Continue { session } => {
                assert_eq!(session.turn_count, 1);
                assert_eq!(session.messages.len(), 3);
            }
            other => panic!("expected to continue, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_start_creates_no_session() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(1)
            .returning(|_, _, _| Err(GatewayError::Unavailable("timeout".to_string())));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        assert!(matches!(
            controller.enter("S1").await,
            Err(ControllerError::GatewayUnavailable(_))
        ));
        assert_eq!(controller.live_sessions().await, 0);
        assert!(matches!(
            controller.view("S1").await,
            Err(ControllerError::NoActiveSession(_))
        ));
    }

    #[tokio::test]
    async fn failed_starts_leave_no_slots_behind() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(50)
            .returning(|_, _, _| Err(GatewayError::Unavailable("timeout".to_string())));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        for i in 0..50 {
            let id = format!("S{i}");
            assert!(controller.enter(&id).await.is_err());
        }
        assert_eq!(controller.registry.slot_count().await, 0);
    }

    #[tokio::test]
    async fn finished_session_releases_its_slot() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .returning(|_, _, _| Ok("Question?".to_string()));
        gateway
            .expect_grade()
            .times(1)
            .returning(|_| Ok(report(80, "Pass")));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        controller.enter("S1").await.unwrap();
        controller.enter("S2").await.unwrap();
        assert_eq!(controller.registry.slot_count().await, 2);

        controller.finish("S1").await.unwrap();
        assert!(controller.registry.existing("S1").await.is_none());
        assert_eq!(controller.registry.slot_count().await, 1);
        assert_eq!(controller.live_sessions().await, 1);
    }

    #[tokio::test]
    async fn grading_failure_persists_nothing_and_retry_saves_once() {
        let grades = Arc::new(AtomicUsize::new(0));
        let counter = grades.clone();
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .returning(|_, _, _| Ok("Question?".to_string()));
        gateway.expect_grade().times(2).returning(move |_| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(GatewayError::MalformedGrading(
                    "grading response has no numeric score".to_string(),
                )),
                _ => Ok(report(55, "Fail")),
            }
        });

        let store = Arc::new(MemoryStore::new());
        let controller = controller(gateway, store.clone());
        controller.enter("S1").await.unwrap();
        controller.answer("S1", "first").await.unwrap();

        let err = controller.finish("S1").await.unwrap_err();
        assert!(matches!(err, ControllerError::MalformedGradingResponse(_)));
        assert!(store.read_all().await.unwrap().is_empty());
        assert_eq!(
            controller.view("S1").await.unwrap().phase,
            Phase::AwaitingGrade
        );
        assert!(matches!(
            controller.answer("S1", "second").await,
            Err(ControllerError::GradingPending(_))
        ));

        let outcome = controller.finish("S1").await.unwrap();
        assert_eq!(outcome.record.status, GradeStatus::Fail);
        assert_eq!(store.read_all().await.unwrap().len(), 1);
        assert_eq!(grades.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn store_failure_retries_the_write_without_regrading() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .returning(|_, _, _| Ok("Question?".to_string()));
        gateway
            .expect_grade()
            .times(1)
            .returning(|_| Ok(report(88, "Pass")));

        let appends = Arc::new(AtomicUsize::new(0));
        let counter = appends.clone();
        let mut store = MockTranscriptStore::new();
        store.expect_next_topic_index().returning(|_| Ok(0));
        store.expect_append().times(2).returning(move |_| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(anyhow::anyhow!("database is locked")),
                _ => Ok(41),
            }
        });

        let controller = controller(gateway, Arc::new(store));
        controller.enter("S1").await.unwrap();

        let err = controller.finish("S1").await.unwrap_err();
        assert!(matches!(err, ControllerError::StoreWrite(_)));
        assert!(err.to_string().contains("database is locked"));

        let outcome = controller.finish("S1").await.unwrap();
        assert_eq!(outcome.record.id, 41);
        assert_eq!(outcome.record.score, 88);
        assert_eq!(controller.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn skips_are_exempt_from_the_turn_limit() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .times(7)
            .returning(|_, _, _| Ok("Question?".to_string()));
        gateway.expect_grade().never();
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        controller.enter("S1").await.unwrap();
        for _ in 0..5 {
            controller.skip("S1").await.unwrap();
        }
        let turn = controller.answer("S1", "standing waves have nodes").await.unwrap();

        match turn {
            TurnOutcome::Continue { session } => {
                assert_eq!(session.turn_count, 1);
                assert_eq!(session.phase, Phase::Active);
            }
            other => panic!("expected to continue, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn next_session_continues_from_saved_progress() {
        let mut gateway = MockLanguageModelGateway::new();
        gateway
            .expect_converse()
            .returning(|_, _, _| Ok("Question?".to_string()));
        gateway
            .expect_grade()
            .times(2)
            .returning(|_| Ok(report(65, "Pass")));
        let controller = controller(gateway, Arc::new(MemoryStore::new()));

        controller.enter("S1").await.unwrap();
        controller.answer("S1", "one").await.unwrap();
        controller.skip("S1").await.unwrap();
        let first = controller.finish("S1").await.unwrap();
        assert_eq!(first.record.topic_index, 2);

        let Entry::Student { session } = controller.enter("S1").await.unwrap() else {
            panic!("expected a student session");
        };
        assert_eq!(session.topics[0].name, CATALOG[2].name);
        assert_eq!(session.turn_count, 0);
        controller.finish("S1").await.unwrap();
    }
}
