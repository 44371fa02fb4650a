//! Axum Handlers for the REST API
//!
//! Student endpoints drive the session controller; admin endpoints are
//! read-only views over stored records and require the admin sentinel in the
//! `x-student-id` header. It uses `utoipa` doc comments to generate OpenAPI
//! documentation.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
};
use reflect_core::{ControllerError, Record, admin};
use std::sync::Arc;
use tracing::{error, warn};

use crate::{
    models::{
        AnswerPayload, EntryResponse, ErrorResponse, RecordResponse, SessionResponse,
        StartSessionPayload, StudentSummaryResponse, TurnResponse,
    },
    state::AppState,
};

const ADMIN_HEADER: &str = "x-student-id";
const INDEX_HTML: &str = include_str!("../web/index.html");

#[derive(Debug)]
pub enum ApiError {
    Controller(ControllerError),
    Forbidden,
    InternalServerError(anyhow::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Controller(err) => {
                let (status, code) = match err {
                    ControllerError::EmptyStudentId => (StatusCode::BAD_REQUEST, "empty_student_id"),
                    ControllerError::EmptyAnswer => (StatusCode::BAD_REQUEST, "empty_answer"),
                    ControllerError::NoActiveSession(_) => (StatusCode::NOT_FOUND, "no_active_session"),
                    ControllerError::GradingPending(_) => (StatusCode::CONFLICT, "grading_pending"),
                    ControllerError::GatewayUnavailable(_) => {
                        (StatusCode::BAD_GATEWAY, "gateway_unavailable")
                    }
                    ControllerError::MalformedGradingResponse(_) => {
                        (StatusCode::BAD_GATEWAY, "malformed_grading_response")
                    }
                    ControllerError::StoreWrite(_) => {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "store_write_failed",
                            "Your session was graded but could not be saved. Finish again to retry saving it."
                                .to_string(),
                        );
                    }
                    ControllerError::StoreRead(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "store_read_failed")
                    }
                };
                (status, code, err.to_string())
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "This view is only available to the administrator.".to_string(),
            ),
            ApiError::InternalServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal server error occurred.".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        match &self {
            ApiError::InternalServerError(err) => error!("Internal Server Error: {:?}", err),
            ApiError::Controller(err) if status.is_server_error() => {
                error!(code, "Request failed: {err}")
            }
            ApiError::Controller(err) => warn!(code, "Request rejected: {err}"),
            ApiError::Forbidden => warn!("Admin endpoint called without the admin id"),
        }
        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        Self::Controller(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let caller = headers
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if state.controller.is_admin(caller) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

async fn all_records(state: &AppState) -> Result<Vec<Record>, ApiError> {
    state
        .store
        .read_all()
        .await
        .map_err(|e| ControllerError::StoreRead(e).into())
}

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Serves the single-page UI.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Enter an id: starts or resumes a student session, or opens the admin view.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = StartSessionPayload,
    responses(
        (status = 200, description = "Admin mode, or the started/resumed session", body = EntryResponse),
        (status = 400, description = "Empty student id", body = ErrorResponse),
        (status = 502, description = "The language model could not be reached", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StartSessionPayload>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state.controller.enter(&payload.student_id).await?;
    Ok(Json(entry.into()))
}

/// Get the live session of a student.
#[utoipa::path(
    get,
    path = "/sessions/{student_id}",
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 404, description = "No live session", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = state.controller.view(&student_id).await?;
    Ok(Json(view.into()))
}

/// Answer the current topic.
#[utoipa::path(
    post,
    path = "/sessions/{student_id}/messages",
    request_body = AnswerPayload,
    responses(
        (status = 200, description = "The next question, or the graded outcome", body = TurnResponse),
        (status = 400, description = "Empty answer", body = ErrorResponse),
        (status = 404, description = "No live session", body = ErrorResponse),
        (status = 409, description = "The session is waiting to be graded", body = ErrorResponse),
        (status = 502, description = "The language model failed", body = ErrorResponse),
        (status = 500, description = "The graded session could not be saved", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID")
    )
)]
pub async fn answer(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let turn = state.controller.answer(&student_id, &payload.text).await?;
    Ok(Json(turn.into()))
}

/// Skip the current topic because it has not been covered in class yet.
#[utoipa::path(
    post,
    path = "/sessions/{student_id}/skip",
    responses(
        (status = 200, description = "The next question, or the graded outcome", body = TurnResponse),
        (status = 404, description = "No live session", body = ErrorResponse),
        (status = 409, description = "The session is waiting to be graded", body = ErrorResponse),
        (status = 502, description = "The language model failed", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID")
    )
)]
pub async fn skip(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<TurnResponse>, ApiError> {
    let turn = state.controller.skip(&student_id).await?;
    Ok(Json(turn.into()))
}

/// End the session now and grade it. Also retries a failed grading or save.
#[utoipa::path(
    post,
    path = "/sessions/{student_id}/finish",
    responses(
        (status = 200, description = "The graded outcome", body = TurnResponse),
        (status = 404, description = "No live session", body = ErrorResponse),
        (status = 502, description = "Grading failed; finish again to retry", body = ErrorResponse),
        (status = 500, description = "The graded session could not be saved", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID")
    )
)]
pub async fn finish(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<TurnResponse>, ApiError> {
    let outcome = state.controller.finish(&student_id).await?;
    Ok(Json(outcome.into()))
}

/// List every stored record in insertion order.
#[utoipa::path(
    get,
    path = "/admin/records",
    responses(
        (status = 200, description = "All records", body = [RecordResponse]),
        (status = 403, description = "Caller is not the administrator", body = ErrorResponse)
    ),
    params(
        ("x-student-id" = String, Header, description = "The admin id")
    )
)]
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RecordResponse>>, ApiError> {
    require_admin(&state, &headers)?;
    let records = all_records(&state).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Download every stored record as CSV.
#[utoipa::path(
    get,
    path = "/admin/export/records",
    responses(
        (status = 200, description = "CSV with columns id, student_id, date, score, status, transcript", content_type = "text/csv", body = String),
        (status = 403, description = "Caller is not the administrator", body = ErrorResponse)
    ),
    params(
        ("x-student-id" = String, Header, description = "The admin id")
    )
)]
pub async fn export_records(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let records = all_records(&state).await?;
    let csv = admin::records_csv(&records)?;
    Ok(csv_attachment("interview_records.csv", csv))
}

/// One summary row per student.
#[utoipa::path(
    get,
    path = "/admin/students",
    responses(
        (status = 200, description = "Per-student summaries", body = [StudentSummaryResponse]),
        (status = 403, description = "Caller is not the administrator", body = ErrorResponse)
    ),
    params(
        ("x-student-id" = String, Header, description = "The admin id")
    )
)]
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<StudentSummaryResponse>>, ApiError> {
    require_admin(&state, &headers)?;
    let records = all_records(&state).await?;
    let summaries = admin::summarize(&records, state.controller.admin_id());
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// Download the per-student summaries as CSV.
#[utoipa::path(
    get,
    path = "/admin/export/students",
    responses(
        (status = 200, description = "Student summary CSV", content_type = "text/csv", body = String),
        (status = 403, description = "Caller is not the administrator", body = ErrorResponse)
    ),
    params(
        ("x-student-id" = String, Header, description = "The admin id")
    )
)]
pub async fn export_students(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let records = all_records(&state).await?;
    let summaries = admin::summarize(&records, state.controller.admin_id());
    let csv = admin::summaries_csv(&summaries)?;
    Ok(csv_attachment("student_summary.csv", csv))
}

/// All transcripts of one student, newest first.
#[utoipa::path(
    get,
    path = "/admin/students/{student_id}/records",
    responses(
        (status = 200, description = "The student's records", body = [RecordResponse]),
        (status = 403, description = "Caller is not the administrator", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID"),
        ("x-student-id" = String, Header, description = "The admin id")
    )
)]
pub async fn student_records(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<RecordResponse>>, ApiError> {
    require_admin(&state, &headers)?;
    let records = all_records(&state).await?;
    let own = admin::student_records(&records, student_id.trim());
    Ok(Json(own.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_code(err: ApiError) -> (StatusCode, &'static str) {
        let (status, code, _) = err.parts();
        (status, code)
    }

    #[test]
    fn test_controller_errors_map_to_status_codes() {
        let cases = [
            (ControllerError::EmptyStudentId, StatusCode::BAD_REQUEST, "empty_student_id"),
            (ControllerError::EmptyAnswer, StatusCode::BAD_REQUEST, "empty_answer"),
            (
                ControllerError::NoActiveSession("S1".into()),
                StatusCode::NOT_FOUND,
                "no_active_session",
            ),
            (
                ControllerError::GradingPending("S1".into()),
                StatusCode::CONFLICT,
                "grading_pending",
            ),
            (
                ControllerError::GatewayUnavailable("quota".into()),
                StatusCode::BAD_GATEWAY,
                "gateway_unavailable",
            ),
            (
                ControllerError::MalformedGradingResponse("no score".into()),
                StatusCode::BAD_GATEWAY,
                "malformed_grading_response",
            ),
            (
                ControllerError::StoreWrite(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_write_failed",
            ),
            (
                ControllerError::StoreRead(anyhow::anyhow!("locked")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_read_failed",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(status_and_code(err.into()), (status, code));
        }
    }

    #[test]
    fn test_store_write_message_explains_retry() {
        let (_, _, message) =
            ApiError::from(ControllerError::StoreWrite(anyhow::anyhow!("disk full"))).parts();
        assert!(message.contains("graded"));
        assert!(message.contains("retry"));
    }

    #[test]
    fn test_forbidden() {
        assert_eq!(
            status_and_code(ApiError::Forbidden),
            (StatusCode::FORBIDDEN, "forbidden")
        );
    }
}
