//! Session State
//!
//! The in-memory state of one student's reflection session and the rules for
//! advancing it. Nothing in here performs I/O: every mutation returns what
//! should happen next and the controller decides whether to call out.


use crate::{
    gateway::Cue,
    grading::Grade,
    topic::{self, CATALOG, Resource, Topic, TopicMark, VisitedTopic},
    transcript::{Entry, Speaker, Transcript, skip_marker},
};

/// Limits applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Number of answered topics after which the session is graded.
    pub turn_limit: u32,
    /// Minimum score for a `Pass`.
    pub pass_threshold: u8,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            turn_limit: 5,
            pass_threshold: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting answers and skips.
    Active,
    /// The transcript is complete; only grading (or its retry) remains.
    AwaitingGrade,
}

/// What the controller must do after a student action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Ask the gateway for the next assistant message.
    Ask(Cue),
    /// The session is over; grade it.
    Grade,
}

#[derive(Debug, Clone)]
pub struct Session {
    student_id: String,
    start: usize,
    visited: Vec<VisitedTopic>,
    cursor: usize,
    turn_count: u32,
    turn_limit: u32,
    transcript: Transcript,
    phase: Phase,
    pending_grade: Option<Grade>,
}

impl Session {
    /// Starts a session at catalog position `progress`, wrapping to the first
    /// topic once the catalog has been completed.
    pub fn new(student_id: impl Into<String>, progress: usize, turn_limit: u32) -> Self {
        let start = topic::starting_index(progress);
        let turn_limit = turn_limit.max(1);
        Self {
            student_id: student_id.into(),
            start,
            visited: vec![VisitedTopic {
                topic: &CATALOG[start],
                mark: TopicMark::Current,
            }],
            cursor: start,
            turn_count: 0,
            turn_limit,
            transcript: Transcript::new(),
            phase: Phase::Active,
            pending_grade: None,
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    /// The route of the session in catalog order: every topic reached so
    /// far (skipped ones included) followed by as many upcoming topics as
    /// there are answers left.
    pub fn plan(&self) -> &'static [Topic] {
        let reached = self.cursor - self.start;
        let remaining = self.turn_limit.saturating_sub(self.turn_count) as usize;
        topic::window(self.start, reached + remaining)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Catalog position of the first topic not yet answered or skipped.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_topic(&self) -> Option<&'static Topic> {
        match self.phase {
            Phase::Active => topic::topic_at(self.cursor),
            Phase::AwaitingGrade => None,
        }
    }

    pub fn pending_grade(&self) -> Option<&Grade> {
        self.pending_grade.as_ref()
    }

    pub(crate) fn set_pending_grade(&mut self, grade: Grade) {
        self.pending_grade = Some(grade);
    }

    pub fn push_reply(&mut self, text: impl Into<String>) {
        self.transcript.push(Speaker::Assistant, text);
    }

    /// Records an answer to the current topic. Counts against the turn limit.
    pub fn record_answer(&mut self, text: impl Into<String>) -> Advance {
        self.transcript.push(Speaker::Student, text);
        self.turn_count += 1;
        self.close_current(TopicMark::Answered);

        if self.turn_count >= self.turn_limit {
            return self.request_grading();
        }
        match self.open_next() {
            Some(next) => Advance::Ask(Cue::FollowUp { next }),
            None => self.request_grading(),
        }
    }

    /// Marks the current topic as not yet covered in class and moves on.
    /// Does not count against the turn limit.
    pub fn record_skip(&mut self) -> Advance {
        let Some(skipped) = topic::topic_at(self.cursor) else {
            return self.request_grading();
        };
        self.transcript.push(Speaker::Student, skip_marker(skipped.name));
        self.close_current(TopicMark::Skipped);

        match self.open_next() {
            Some(next) => Advance::Ask(Cue::Skipped { skipped, next }),
            None => self.request_grading(),
        }
    }

    /// Ends the conversation. Further answers and skips are refused.
    pub fn request_grading(&mut self) -> Advance {
        if let Some(last) = self.visited.last_mut() {
            if last.mark == TopicMark::Current && self.phase == Phase::Active {
                // An unanswered current topic is dropped from the session.
                self.visited.pop();
            }
        }
        self.phase = Phase::AwaitingGrade;
        Advance::Grade
    }

    fn close_current(&mut self, mark: TopicMark) {
        if let Some(last) = self.visited.last_mut() {
            last.mark = mark;
        }
        self.cursor += 1;
    }

    fn open_next(&mut self) -> Option<&'static Topic> {
        let next = topic::topic_at(self.cursor)?;
        self.visited.push(VisitedTopic {
            topic: next,
            mark: TopicMark::Current,
        });
        Some(next)
    }

    /// Resources for the topics the student actually discussed or skipped.
    pub fn resources(&self) -> Vec<Resource> {
        self.visited.iter().map(|v| v.topic.resource).collect()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            student_id: self.student_id.clone(),
            phase: self.phase,
            turn_count: self.turn_count,
            turn_limit: self.turn_limit,
            messages: self.transcript.entries().to_vec(),
            topics: self
                .visited
                .iter()
                .map(|v| TopicView {
                    name: v.topic.name,
                    mark: v.mark,
                    keywords: v.topic.keywords,
                })
                .collect(),
        }
    }
}

/// Read-only snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub student_id: String,
    pub phase: Phase,
    pub turn_count: u32,
    pub turn_limit: u32,
    pub messages: Vec<Entry>,
    pub topics: Vec<TopicView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicView {
    pub name: &'static str,
    pub mark: TopicMark,
    pub keywords: &'static [&'static str],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_is_requested_on_the_fifth_answer() {
        let mut session = Session::new("S1", 0, 5);
        for i in 1..5 {
            assert!(matches!(
                session.record_answer(format!("answer {i}")),
                Advance::Ask(Cue::FollowUp { .. })
            ));
            assert_eq!(session.phase(), Phase::Active);
        }
        assert_eq!(session.record_answer("answer 5"), Advance::Grade);
        assert_eq!(session.turn_count(), 5);
        assert_eq!(session.phase(), Phase::AwaitingGrade);
    }

    #[test]
    fn follow_up_names_the_next_catalog_topic() {
        let mut session = Session::new("S1", 3, 5);
        assert_eq!(
            session.record_answer("damping takes energy away"),
            Advance::Ask(Cue::FollowUp { next: &CATALOG[4] })
        );
        assert_eq!(session.cursor(), 4);
    }

    #[test]
    fn skips_do_not_count_as_turns() {
        let mut session = Session::new("S1", 0, 5);
        for _ in 0..5 {
            assert!(matches!(session.record_skip(), Advance::Ask(Cue::Skipped { .. })));
        }
        assert_eq!(session.turn_count(), 0);
        assert!(matches!(
            session.record_answer("finally one I know"),
            Advance::Ask(_)
        ));
        assert_eq!(session.turn_count(), 1);
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.current_topic().map(|t| t.index), Some(6));
    }

    #[test]
    fn skip_writes_marker_and_marks_topic() {
        let mut session = Session::new("S1", 0, 5);
        session.record_skip();

        let view = session.view();
        assert_eq!(
            view.messages.last().map(|e| e.text.as_str()),
            Some("[Student hasn't learned: Simple Harmonic Motion - Not yet covered in class]")
        );
        assert_eq!(view.topics[0].mark, TopicMark::Skipped);
        assert_eq!(view.topics[1].mark, TopicMark::Current);
    }

    #[test]
    fn running_off_the_catalog_ends_the_session() {
        let mut session = Session::new("S1", 15, 5);
        assert!(matches!(session.record_answer("decay"), Advance::Ask(_)));
        assert_eq!(session.record_skip(), Advance::Grade);
        assert_eq!(session.phase(), Phase::AwaitingGrade);
        assert_eq!(session.cursor(), CATALOG.len());
    }

    #[test]
    fn plan_follows_skips_to_the_current_topic() {
        let mut session = Session::new("S1", 0, 5);
        assert_eq!(session.plan(), &CATALOG[0..5]);

        for _ in 0..5 {
            session.record_skip();
        }
        let plan = session.plan();
        assert_eq!(plan, &CATALOG[0..10]);
        assert!(plan.contains(&CATALOG[5]));
        assert_eq!(session.current_topic(), Some(&CATALOG[5]));

        session.record_answer("interference");
        assert_eq!(session.plan(), &CATALOG[0..10]);
        assert_eq!(session.current_topic(), Some(&CATALOG[6]));
    }

    #[test]
    fn completed_catalog_wraps_to_first_topic() {
        let session = Session::new("S1", CATALOG.len(), 5);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.plan().len(), 5);
    }

    #[test]
    fn early_finish_drops_the_unanswered_topic() {
        let mut session = Session::new("S1", 0, 5);
        session.record_answer("spring force");
        assert_eq!(session.request_grading(), Advance::Grade);

        let view = session.view();
        assert_eq!(view.topics.len(), 1);
        assert_eq!(view.topics[0].mark, TopicMark::Answered);
        assert_eq!(session.resources().len(), 1);
        assert!(session.current_topic().is_none());
    }
}
