//! Language-Model Gateway
//!
//! The boundary between the session controller and the hosted model. The
//! controller only ever sees two calls: produce the next assistant message, and
//! grade a finished transcript. Responses are validated here so nothing
//! loosely shaped leaks past this module.

mod openai;
mod scripted;

pub use openai::OpenAICompatibleGateway;
pub use scripted::ScriptedGateway;

use async_trait::async_trait;

use crate::{grading::GradeReport, topic::Topic, transcript::Transcript};

/// Why the next assistant message is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Greet the student and ask about the first planned topic.
    Opening,
    /// The student answered; acknowledge and move on to `next`.
    FollowUp { next: &'static Topic },
    /// The student has not covered `skipped` yet; reassure and move on.
    Skipped {
        skipped: &'static Topic,
        next: &'static Topic,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Network, timeout, quota or empty-reply failure.
    #[error("language model unavailable: {0}")]
    Unavailable(String),
    /// The grading call answered, but not with a usable score.
    #[error("grading response could not be parsed: {0}")]
    MalformedGrading(String),
}

impl GatewayError {
    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// The two black-box calls made to the hosted model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Produces the next assistant message.
    ///
    /// * `history` - The transcript so far; for follow-ups and skips its last
    ///   entry is the student's input being responded to.
    /// * `plan` - The session route: topics reached so far, then upcoming ones.
    /// * `cue` - What the reply should do.
    async fn converse(
        &self,
        history: &Transcript,
        plan: &'static [Topic],
        cue: Cue,
    ) -> Result<String, GatewayError>;

    /// Grades a rendered transcript.
    async fn grade(&self, transcript: &str) -> Result<GradeReport, GatewayError>;
}

/// Validates a raw grading answer at the gateway boundary.
pub(crate) fn parse_grading(response: &str) -> Result<GradeReport, GatewayError> {
    GradeReport::parse(response).map_err(|e| GatewayError::MalformedGrading(e.to_string()))
}
