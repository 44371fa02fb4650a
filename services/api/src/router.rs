//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the single-page UI, the REST API, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AnswerPayload, EntryMode, EntryResponse, ErrorResponse, MessageResponse, MessageRole,
        OutcomeResponse, RecordResponse, ResourceResponse, SessionPhase, SessionResponse,
        StartSessionPayload, StudentSummaryResponse, TopicResponse, TopicState, TurnResponse,
        TurnState,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::start_session,
        handlers::get_session,
        handlers::answer,
        handlers::skip,
        handlers::finish,
        handlers::list_records,
        handlers::export_records,
        handlers::list_students,
        handlers::export_students,
        handlers::student_records,
    ),
    components(
        schemas(
            StartSessionPayload, AnswerPayload, EntryResponse, EntryMode, SessionResponse,
            SessionPhase, MessageResponse, MessageRole, TopicResponse, TopicState, TurnResponse,
            TurnState, OutcomeResponse, RecordResponse, ResourceResponse, StudentSummaryResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Reflection API", description = "Physics reflection sessions, grading and the admin view")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/{student_id}", get(handlers::get_session))
        .route("/sessions/{student_id}/messages", post(handlers::answer))
        .route("/sessions/{student_id}/skip", post(handlers::skip))
        .route("/sessions/{student_id}/finish", post(handlers::finish))
        .route("/admin/records", get(handlers::list_records))
        .route("/admin/export/records", get(handlers::export_records))
        .route("/admin/students", get(handlers::list_students))
        .route("/admin/export/students", get(handlers::export_students))
        .route(
            "/admin/students/{student_id}/records",
            get(handlers::student_records),
        )
        .with_state(app_state);

    Router::new()
        .route("/", get(handlers::index))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
