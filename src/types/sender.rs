use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing into the client.
    User,
    /// The backend model, or a fallback message standing in for it.
    Bot,
}

impl Sender {
    /// Maps a history entry `type` to a sender.
    ///
    /// Only `"user"` maps to [`Sender::User`]; the backend labels replies
    /// `"assistant"`, and anything unrecognized is shown as a bot message.
    pub fn from_history_type(kind: &str) -> Self {
        if kind == "user" {
            Sender::User
        } else {
            Sender::Bot
        }
    }
}
