use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Message, Sender, SessionId};

/// Body returned by `GET /chat/history/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    /// Echo of the requested session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Stored messages, oldest first.
    pub messages: Vec<HistoryEntry>,
}

/// One stored message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Message body.
    pub content: String,

    /// Author label, `"user"` or `"assistant"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// When the message was recorded.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}

impl HistoryEntry {
    /// Converts the entry into a local message with the given id.
    pub fn into_message(self, id: String) -> Message {
        Message {
            id,
            sender: Sender::from_history_type(&self.kind),
            text: self.content,
            timestamp: self.timestamp,
        }
    }
}

/// Body returned by `DELETE /chat/history/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    /// Acknowledgement text.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_python_timestamps() {
        let json = serde_json::json!({
            "session_id": "s1",
            "messages": [
                {"type": "user", "content": "hello", "timestamp": "2024-05-01T10:00:00.000001"},
                {"type": "assistant", "content": "hi", "timestamp": "2024-05-01T10:00:02.5"}
            ]
        });
        let history: ChatHistory = serde_json::from_value(json).unwrap();
        assert_eq!(history.messages.len(), 2);
        let first = history.messages[0].clone().into_message("m1".to_string());
        assert_eq!(first.sender, Sender::User);
        assert_eq!(first.text, "hello");
        let second = history.messages[1].clone().into_message("m2".to_string());
        assert_eq!(second.sender, Sender::Bot);
    }

    #[test]
    fn entry_without_timestamp_is_rejected() {
        let json = serde_json::json!({
            "messages": [{"type": "user", "content": "hello"}]
        });
        assert!(serde_json::from_value::<ChatHistory>(json).is_err());
    }
}
