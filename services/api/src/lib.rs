//! Reflection API Library Crate
//!
//! This library contains the web-facing half of the physics reflection
//! companion: configuration, the SQLite transcript store, API handlers, and
//! routing. The binaries in `bin/` are thin wrappers around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
