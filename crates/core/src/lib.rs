//! Core of the physics reflection companion: the topic catalog, session
//! state machine, grading, the language-model gateway and the transcript
//! store contract.

pub mod admin;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod grading;
pub mod prompts;
pub mod registry;
pub mod session;
pub mod store;
pub mod topic;
pub mod transcript;

pub use controller::{Entry, Outcome, SessionController, TurnOutcome};
pub use error::ControllerError;
pub use gateway::{GatewayError, LanguageModelGateway, OpenAICompatibleGateway, ScriptedGateway};
pub use store::{MemoryStore, NewRecord, Record, RecordId, TranscriptStore};
