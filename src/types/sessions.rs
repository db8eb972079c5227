use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Body returned by `GET /chat/sessions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessions {
    /// Every session the backend currently tracks.
    pub active_sessions: Vec<SessionId>,

    /// Session count as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sessions: Option<usize>,
}

/// Body returned by `POST /chat/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    /// The freshly created session.
    pub session_id: SessionId,
}

/// A session as presented in the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// The session identifier.
    pub id: SessionId,
    /// Whether this is the controller's current session.
    pub is_current: bool,
}

impl SessionEntry {
    /// Label shown for the entry: `Current Chat` or `Chat: <prefix>...`.
    pub fn label(&self) -> String {
        if self.is_current {
            "Current Chat".to_string()
        } else {
            format!("Chat: {}...", self.id.short())
        }
    }
}
