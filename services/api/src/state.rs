//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the controller and
//! the store shared by every handler.

use reflect_core::{SessionController, TranscriptStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    /// Read side for the admin view. The controller owns all writes.
    pub store: Arc<dyn TranscriptStore>,
}
