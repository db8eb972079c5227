//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! [`ChatConfig`] used to build a client, a session store, and a controller.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{BASE_URL_ENV, DEFAULT_BASE_URL};
use crate::storage::FileSessionStore;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the boltchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (default: $BOLTCHAT_BASE_URL or http://localhost:8000)", "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout: Option<u64>,

    /// Where the current session id is persisted.
    #[arrrg(optional, "File holding the current session id", "PATH")]
    pub session_file: Option<String>,

    /// Start without restoring the persisted session.
    #[arrrg(flag, "Start a fresh chat instead of resuming the last one")]
    pub fresh: bool,

    /// Keep the session id in memory only.
    #[arrrg(flag, "Do not persist the session id")]
    pub ephemeral: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat client.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend base URL; `None` defers to the environment, then the default.
    pub base_url: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Where to persist the session id; `None` keeps it in memory.
    pub session_file: Option<PathBuf>,

    /// Whether startup resumes the persisted session.
    pub restore_session: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: from the environment, else `http://localhost:8000`
    /// - Timeout: 60 seconds
    /// - Session file: the platform data directory
    /// - Restore session: enabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: FileSessionStore::default_path(),
            restore_session: true,
            use_color: true,
        }
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the session file; `None` keeps the id in memory.
    pub fn with_session_file(mut self, path: Option<PathBuf>) -> Self {
        self.session_file = path;
        self
    }

    /// Sets whether startup resumes the persisted session.
    pub fn with_restore_session(mut self, restore: bool) -> Self {
        self.restore_session = restore;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The base URL that a client built from this config will use.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let session_file = if args.ephemeral {
            None
        } else {
            args.session_file
                .map(PathBuf::from)
                .or_else(FileSessionStore::default_path)
        };

        ChatConfig {
            base_url: args.base_url,
            timeout: Duration::from_secs(args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            session_file,
            restore_session: !args.fresh,
            use_color: !args.no_color,
        }
    }
}
