//! The chat backend seam.
//!
//! [`ChatBackend`] describes the HTTP API the controller talks to. The
//! reqwest-backed [`BoltClient`](crate::BoltClient) is the production
//! implementation; tests substitute in-process fakes.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{
    ActiveSessions, AudioQuery, AudioQueryResponse, ChatHistory, ChatRequest, ChatResponse,
    ClearHistoryResponse, HealthStatus, NewSession, SessionId,
};

/// Operations exposed by the chat backend.
///
/// Each method performs exactly one request. A missing session is reported
/// as [`Error::NotFound`](crate::Error::NotFound); every other non-success
/// status is [`Error::Api`](crate::Error::Api).
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat`
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// `GET /chat/history/{session_id}`
    async fn fetch_history(&self, session_id: &SessionId) -> Result<ChatHistory>;

    /// `DELETE /chat/history/{session_id}`
    async fn clear_history(&self, session_id: &SessionId) -> Result<ClearHistoryResponse>;

    /// `GET /chat/sessions`
    async fn list_sessions(&self) -> Result<ActiveSessions>;

    /// `POST /chat/new`
    async fn new_session(&self) -> Result<NewSession>;

    /// `POST /audio/query`
    async fn audio_query(&self, query: AudioQuery) -> Result<AudioQueryResponse>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus>;
}

#[async_trait::async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for Arc<B> {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        (**self).send_chat(request).await
    }

    async fn fetch_history(&self, session_id: &SessionId) -> Result<ChatHistory> {
        (**self).fetch_history(session_id).await
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<ClearHistoryResponse> {
        (**self).clear_history(session_id).await
    }

    async fn list_sessions(&self) -> Result<ActiveSessions> {
        (**self).list_sessions().await
    }

    async fn new_session(&self) -> Result<NewSession> {
        (**self).new_session().await
    }

    async fn audio_query(&self, query: AudioQuery) -> Result<AudioQueryResponse> {
        (**self).audio_query(query).await
    }

    async fn health(&self) -> Result<HealthStatus> {
        (**self).health().await
    }
}
