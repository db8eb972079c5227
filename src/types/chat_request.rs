use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Body of `POST /chat`.
///
/// `session_id` is sent as an explicit `null` on the first message so the
/// backend assigns a fresh session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message text.
    pub message: String,

    /// The current session, if any.
    pub session_id: Option<SessionId>,
}

impl ChatRequest {
    /// Creates a new chat request.
    pub fn new(message: impl Into<String>, session_id: Option<SessionId>) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }
}
