//! Session-aware chat control for the Bolt backend.
//!
//! This module holds everything between the HTTP client and the terminal:
//!
//! - [`state`]: the pure message list and session reducer
//! - [`controller`]: the operations that drive backend, store, and renderer
//! - [`commands`]: slash command parsing for the REPL
//! - [`config`]: CLI argument parsing and configuration

mod commands;
mod config;
mod controller;
mod state;

pub use crate::render::{
    NO_CHATS, PlainTextRenderer, RecordingRenderer, RenderEvent, Renderer, WELCOME_BODY,
    WELCOME_TITLE,
};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use controller::{
    AUDIO_FAILED, AUDIO_PROMPT_REQUIRED, AudioOutcome, CANCELLED_MESSAGE, ChatController,
    FALLBACK_MESSAGE, HistoryOutcome, SendOutcome, Skipped, StartOutcome,
};
pub use state::{ChatState, StateEvent};
