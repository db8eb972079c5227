//! Client library and terminal front-end for the Bolt chat backend.
//!
//! [`BoltClient`] speaks the backend's HTTP API. [`chat::ChatController`]
//! layers session handling on top of any [`ChatBackend`]: it keeps one
//! conversation current, persists its id through a [`SessionStore`], and
//! discards replies that arrive after the user moved on.

// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod render;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports
pub use backend::ChatBackend;
pub use client::BoltClient;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::*;
