use crate::gateway::GatewayError;

/// Everything a single controller interaction can fail with. None of these
/// are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("a student id is required")]
    EmptyStudentId,

    #[error("answers cannot be empty")]
    EmptyAnswer,

    #[error("no active session for student '{0}'")]
    NoActiveSession(String),

    #[error("the session for '{0}' is finished and waiting to be graded")]
    GradingPending(String),

    #[error("the language model is unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("the grading response was unusable: {0}")]
    MalformedGradingResponse(String),

    /// The grade was computed but could not be saved. The session keeps the
    /// grade so finishing again only retries the write.
    #[error("the session was graded but could not be saved: {0:#}")]
    StoreWrite(anyhow::Error),

    #[error("failed to read stored sessions: {0:#}")]
    StoreRead(anyhow::Error),
}

impl From<GatewayError> for ControllerError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => Self::GatewayUnavailable(msg),
            GatewayError::MalformedGrading(msg) => Self::MalformedGradingResponse(msg),
        }
    }
}
