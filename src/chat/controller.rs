//! The session and message controller.
//!
//! [`ChatController`] owns the chat state and drives the backend, the session
//! store, and the renderer. Every operation catches its own failures: the
//! caller gets an outcome value and the user sees a fallback message, an
//! alert, or nothing, but no error escapes.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::backend::ChatBackend;
use crate::chat::state::{ChatState, StateEvent};
use crate::error::{Error, Result};
use crate::observability::{
    AUDIO_FAILURES, AUDIO_QUERIES, CHAT_SEND_BUSY, CHAT_SEND_FALLBACKS, CHAT_SENDS,
    CHAT_STALE_RESPONSES, HISTORY_ERRORS, HISTORY_LOADS, HISTORY_NOT_FOUND, SESSION_STORE_ERRORS,
    SESSION_SWITCHES, SESSIONS_CREATED,
};
use crate::render::Renderer;
use crate::storage::SessionStore;
use crate::types::{AudioQuery, ChatRequest, HealthStatus, Message, SessionEntry, SessionId};

/// Bot message substituted when a chat request fails.
pub const FALLBACK_MESSAGE: &str = "Sorry, I couldn't reach the AI backend.";

/// Alert shown when an audio query is submitted without a prompt.
pub const AUDIO_PROMPT_REQUIRED: &str = "Please enter your question or prompt about the audio.";

/// Alert shown when an audio query fails.
pub const AUDIO_FAILED: &str = "Audio processing failed.";

/// Bot message appended when the user cancels a pending chat request.
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

/// Why a request was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    /// The input was empty after trimming.
    EmptyInput,
    /// Another request of the same kind is still in flight.
    Busy,
}

/// Result of [`ChatController::send_message`].
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Nothing was sent.
    Skipped(Skipped),
    /// The backend replied; the reply was appended.
    Replied(Message),
    /// The request failed; the fallback message was appended.
    Fallback {
        /// The appended fallback message.
        message: Message,
        /// What went wrong.
        error: Error,
    },
    /// [`ChatController::cancel`] abandoned the request; [`CANCELLED_MESSAGE`]
    /// was appended.
    Cancelled(Message),
    /// The session changed while the request was in flight; nothing was applied.
    Stale,
}

/// Result of [`ChatController::load_history`].
#[derive(Debug, Clone)]
pub enum HistoryOutcome {
    /// There is no current session.
    NoSession,
    /// History replaced the message list.
    Loaded(usize),
    /// The backend no longer knows the session; a replacement was requested.
    SessionMissing {
        /// The freshly created session, if creation succeeded.
        replacement: Option<SessionId>,
    },
    /// History could not be fetched; the message list was left alone.
    Unavailable(Error),
    /// The session changed while the request was in flight.
    Stale,
}

/// Result of [`ChatController::submit_audio`].
#[derive(Debug, Clone)]
pub enum AudioOutcome {
    /// Nothing was sent.
    Skipped(Skipped),
    /// The backend answered; the answer was appended as a bot message.
    Answered(Message),
    /// The query failed and the user was alerted.
    Failed(Error),
    /// [`ChatController::cancel`] abandoned the query.
    Cancelled,
    /// The session changed while the request was in flight.
    Stale,
}

/// Result of [`ChatController::start`].
#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// A persisted session was restored.
    Restored(HistoryOutcome),
    /// The controller started without a session.
    Fresh,
}

struct Inner {
    state: ChatState,
    epoch: u64,
    token: CancellationToken,
}

/// Controls one chat conversation at a time.
///
/// All methods take `&self`, so a controller can be shared between an input
/// loop and background tasks. State locks are never held across an `.await`.
pub struct ChatController<B, S, R> {
    backend: B,
    store: S,
    renderer: Mutex<R>,
    inner: Mutex<Inner>,
    // Serializes store writes so each one can check the epoch first.
    store_lock: tokio::sync::Mutex<()>,
    restore_session: bool,
    chat_busy: AtomicBool,
    audio_busy: AtomicBool,
    in_flight: AtomicUsize,
}

impl<B: ChatBackend, S: SessionStore, R: Renderer> ChatController<B, S, R> {
    /// Creates a controller with no session that restores persisted
    /// sessions on [`start`](Self::start).
    pub fn new(backend: B, store: S, renderer: R) -> Self {
        Self {
            backend,
            store,
            renderer: Mutex::new(renderer),
            inner: Mutex::new(Inner {
                state: ChatState::new(),
                epoch: 0,
                token: CancellationToken::new(),
            }),
            store_lock: tokio::sync::Mutex::new(()),
            restore_session: true,
            chat_busy: AtomicBool::new(false),
            audio_busy: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets whether [`start`](Self::start) resumes the persisted session.
    pub fn with_restore_session(mut self, restore: bool) -> Self {
        self.restore_session = restore;
        self
    }

    /// The backend this controller talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The store the current session id is mirrored into.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `f` with exclusive access to the renderer.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut *self.renderer())
    }

    /// A snapshot of the current messages.
    pub fn messages(&self) -> Vec<Message> {
        self.inner().state.messages().to_vec()
    }

    /// The current session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner().state.session_id().cloned()
    }

    /// Returns true while a chat message is awaiting its reply.
    pub fn is_busy(&self) -> bool {
        self.chat_busy.load(Ordering::Acquire)
    }

    /// Number of requests currently driving the typing indicator.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Applies the startup policy.
    ///
    /// With restoration enabled and a persisted id present, switches to that
    /// session. Otherwise forgets any persisted id and shows the welcome
    /// banner. The session list is refreshed either way.
    pub async fn start(&self) -> StartOutcome {
        if self.restore_session {
            match self.store.load().await {
                Ok(Some(session_id)) => {
                    tracing::info!(session_id = %session_id, "restoring persisted session");
                    return StartOutcome::Restored(self.switch_session(session_id).await);
                }
                Ok(None) => {}
                Err(err) => {
                    SESSION_STORE_ERRORS.click();
                    tracing::warn!(error = %err, "could not read persisted session");
                }
            }
        }
        let epoch = self.begin_scope(StateEvent::SessionReset(None));
        if !self.restore_session {
            self.forget_session(epoch).await;
        }
        self.with_renderer(|r| {
            r.clear_messages();
            r.show_welcome();
        });
        self.list_sessions().await;
        StartOutcome::Fresh
    }

    /// Sends a chat message.
    ///
    /// No-op for blank input or while another message awaits its reply. The
    /// user message is appended before the request goes out. On success the
    /// returned session id is adopted and persisted and the reply appended;
    /// on any failure [`FALLBACK_MESSAGE`] is appended instead.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Skipped(Skipped::EmptyInput);
        }
        let Some(_busy) = FlightGuard::acquire(&self.chat_busy) else {
            CHAT_SEND_BUSY.click();
            tracing::debug!("message dropped: a reply is still pending");
            return SendOutcome::Skipped(Skipped::Busy);
        };
        CHAT_SENDS.click();

        let (epoch, token, session_id, user_message) = {
            let mut inner = self.inner();
            let session_id = inner.state.session_id().cloned();
            apply(
                &mut inner.state,
                StateEvent::UserMessage {
                    text: text.to_string(),
                    at: OffsetDateTime::now_utc(),
                },
            );
            let user_message = inner.state.last_message().cloned();
            (inner.epoch, inner.token.clone(), session_id, user_message)
        };
        if let Some(message) = &user_message {
            self.with_renderer(|r| r.render_message(message));
        }

        let typing = self.typing();
        let request = ChatRequest::new(text, session_id);
        let result = race(&token, self.backend.send_chat(request)).await;
        drop(typing);

        match result {
            Ok(reply) => {
                let session_id = reply.session_id.clone();
                let applied = self.update_if_current(epoch, |state| {
                    apply(state, StateEvent::SessionAdopted(reply.session_id));
                    apply(
                        state,
                        StateEvent::BotMessage {
                            text: reply.response,
                            at: reply.timestamp,
                        },
                    );
                    state.last_message().cloned()
                });
                let Some(message) = applied.flatten() else {
                    self.note_stale("send_message");
                    return SendOutcome::Stale;
                };
                if !self.persist_session(epoch, &session_id).await {
                    self.note_stale("send_message");
                    return SendOutcome::Stale;
                }
                self.with_renderer(|r| r.render_message(&message));
                SendOutcome::Replied(message)
            }
            Err(err) if err.is_abort() => {
                let applied = self.update_if_current(epoch, |state| {
                    apply(
                        state,
                        StateEvent::BotMessage {
                            text: CANCELLED_MESSAGE.to_string(),
                            at: OffsetDateTime::now_utc(),
                        },
                    );
                    state.last_message().cloned()
                });
                match applied.flatten() {
                    Some(message) => {
                        tracing::info!("chat request cancelled");
                        self.with_renderer(|r| r.render_message(&message));
                        SendOutcome::Cancelled(message)
                    }
                    None => {
                        self.note_stale("send_message");
                        SendOutcome::Stale
                    }
                }
            }
            Err(err) => {
                CHAT_SEND_FALLBACKS.click();
                tracing::warn!(error = %err, "chat request failed");
                let applied = self.update_if_current(epoch, |state| {
                    apply(
                        state,
                        StateEvent::BotMessage {
                            text: FALLBACK_MESSAGE.to_string(),
                            at: OffsetDateTime::now_utc(),
                        },
                    );
                    state.last_message().cloned()
                });
                match applied.flatten() {
                    Some(message) => {
                        self.with_renderer(|r| r.render_message(&message));
                        SendOutcome::Fallback {
                            message,
                            error: err,
                        }
                    }
                    None => {
                        self.note_stale("send_message");
                        SendOutcome::Stale
                    }
                }
            }
        }
    }

    /// Reloads the current session's history from the backend.
    ///
    /// On success the message list is replaced, never merged. A 404 means the
    /// backend forgot the session: the persisted id is cleared and a new
    /// session is created. Other failures leave the list untouched and are
    /// only logged.
    pub async fn load_history(&self) -> HistoryOutcome {
        let (epoch, token, session_id) = {
            let inner = self.inner();
            (
                inner.epoch,
                inner.token.clone(),
                inner.state.session_id().cloned(),
            )
        };
        let Some(session_id) = session_id else {
            return HistoryOutcome::NoSession;
        };
        HISTORY_LOADS.click();

        match race(&token, self.backend.fetch_history(&session_id)).await {
            Ok(history) => {
                let applied = self.update_if_current(epoch, |state| {
                    apply(state, StateEvent::HistoryLoaded(history.messages));
                    state.messages().to_vec()
                });
                match applied {
                    Some(messages) => {
                        self.with_renderer(|r| {
                            r.clear_messages();
                            for message in &messages {
                                r.render_message(message);
                            }
                        });
                        HistoryOutcome::Loaded(messages.len())
                    }
                    None => {
                        self.note_stale("load_history");
                        HistoryOutcome::Stale
                    }
                }
            }
            Err(err) if err.is_abort() => {
                if self.is_current(epoch) {
                    return HistoryOutcome::Unavailable(err);
                }
                self.note_stale("load_history");
                HistoryOutcome::Stale
            }
            Err(err) if err.is_not_found() => {
                HISTORY_NOT_FOUND.click();
                tracing::info!(session_id = %session_id, "session no longer exists on backend");
                let Some(epoch) = self.reset_if_current(epoch, StateEvent::SessionReset(None))
                else {
                    self.note_stale("load_history");
                    return HistoryOutcome::Stale;
                };
                self.forget_session(epoch).await;
                let replacement = self.create_session().await;
                HistoryOutcome::SessionMissing { replacement }
            }
            Err(err) => {
                HISTORY_ERRORS.click();
                tracing::warn!(session_id = %session_id, error = %err, "could not load history");
                HistoryOutcome::Unavailable(err)
            }
        }
    }

    /// Fetches and renders the backend's sessions, marking the current one.
    ///
    /// On failure the "no chats" placeholder is rendered and `None` returned.
    pub async fn list_sessions(&self) -> Option<Vec<SessionEntry>> {
        match self.backend.list_sessions().await {
            Ok(sessions) => {
                let current = self.session_id();
                let entries: Vec<SessionEntry> = sessions
                    .active_sessions
                    .into_iter()
                    .map(|id| SessionEntry {
                        is_current: current.as_ref() == Some(&id),
                        id,
                    })
                    .collect();
                self.with_renderer(|r| r.render_sessions(&entries));
                Some(entries)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not list sessions");
                self.with_renderer(|r| r.render_no_sessions());
                None
            }
        }
    }

    /// Starts a new, empty session on the backend and makes it current.
    ///
    /// In-flight work for the previous session is cancelled. Returns the new
    /// id, or `None` if the backend refused.
    pub async fn create_session(&self) -> Option<SessionId> {
        let created = match self.backend.new_session().await {
            Ok(created) => created,
            Err(err) => {
                tracing::warn!(error = %err, "could not create session");
                self.with_renderer(|r| r.print_error(&format!("Could not start a new chat: {err}")));
                return None;
            }
        };
        SESSIONS_CREATED.click();
        let session_id = created.session_id;
        tracing::info!(session_id = %session_id, "created session");

        let epoch = self.begin_scope(StateEvent::SessionReset(Some(session_id.clone())));
        self.persist_session(epoch, &session_id).await;
        self.with_renderer(|r| {
            r.clear_messages();
            r.show_welcome();
        });
        self.list_sessions().await;
        Some(session_id)
    }

    /// Makes `session_id` current and loads its history.
    ///
    /// The message list is cleared first and in-flight work for the previous
    /// session is cancelled. There is no confirmation step.
    pub async fn switch_session(&self, session_id: SessionId) -> HistoryOutcome {
        SESSION_SWITCHES.click();
        tracing::info!(session_id = %session_id, "switching session");
        let epoch = self.begin_scope(StateEvent::SessionReset(Some(session_id.clone())));
        self.persist_session(epoch, &session_id).await;
        self.with_renderer(|r| r.clear_messages());
        let outcome = self.load_history().await;
        // A replacement session already refreshed the list.
        if !matches!(
            outcome,
            HistoryOutcome::SessionMissing {
                replacement: Some(_)
            }
        ) {
            self.list_sessions().await;
        }
        outcome
    }

    /// Reads an audio file and submits it with `prompt`.
    ///
    /// The prompt is validated before the file is touched.
    pub async fn submit_audio_file(
        &self,
        path: impl AsRef<std::path::Path>,
        prompt: &str,
    ) -> AudioOutcome {
        if let Err(err) = validate_prompt(prompt) {
            self.with_renderer(|r| r.alert(AUDIO_PROMPT_REQUIRED));
            return AudioOutcome::Failed(err);
        }
        match AudioQuery::from_path(path, prompt.trim()).await {
            Ok(query) => self.submit_audio(query).await,
            Err(err) => {
                self.with_renderer(|r| r.alert(&format!("Could not read audio file: {err}")));
                AudioOutcome::Failed(err)
            }
        }
    }

    /// Uploads an audio clip with a prompt and appends the answer.
    ///
    /// An empty prompt is rejected with an alert and no request. Only one
    /// upload runs at a time; it does not block chat messages, but it does
    /// share the typing indicator with them.
    pub async fn submit_audio(&self, mut query: AudioQuery) -> AudioOutcome {
        if let Err(err) = validate_prompt(&query.prompt) {
            self.with_renderer(|r| r.alert(AUDIO_PROMPT_REQUIRED));
            return AudioOutcome::Failed(err);
        }
        query.prompt = query.prompt.trim().to_string();
        let Some(_busy) = FlightGuard::acquire(&self.audio_busy) else {
            self.with_renderer(|r| r.print_info("An audio query is already in progress."));
            return AudioOutcome::Skipped(Skipped::Busy);
        };
        AUDIO_QUERIES.click();

        let (epoch, token) = {
            let inner = self.inner();
            (inner.epoch, inner.token.clone())
        };
        let typing = self.typing();
        let result = race(&token, self.backend.audio_query(query)).await;
        drop(typing);

        match result {
            Ok(answer) => {
                let applied = self.update_if_current(epoch, |state| {
                    apply(
                        state,
                        StateEvent::BotMessage {
                            text: answer.response,
                            at: OffsetDateTime::now_utc(),
                        },
                    );
                    state.last_message().cloned()
                });
                match applied.flatten() {
                    Some(message) => {
                        self.with_renderer(|r| r.render_message(&message));
                        AudioOutcome::Answered(message)
                    }
                    None => {
                        self.note_stale("submit_audio");
                        AudioOutcome::Stale
                    }
                }
            }
            Err(err) if err.is_abort() => {
                if self.is_current(epoch) {
                    self.with_renderer(|r| r.print_info("Audio query cancelled."));
                    return AudioOutcome::Cancelled;
                }
                self.note_stale("submit_audio");
                AudioOutcome::Stale
            }
            Err(err) => {
                AUDIO_FAILURES.click();
                tracing::warn!(error = %err, "audio query failed");
                self.with_renderer(|r| r.alert(AUDIO_FAILED));
                AudioOutcome::Failed(err)
            }
        }
    }

    /// Deletes the current session's history on the backend and locally.
    ///
    /// Returns true if the history was cleared.
    pub async fn clear_history(&self) -> bool {
        let (epoch, token, session_id) = {
            let inner = self.inner();
            (
                inner.epoch,
                inner.token.clone(),
                inner.state.session_id().cloned(),
            )
        };
        let Some(session_id) = session_id else {
            self.with_renderer(|r| r.print_info("No active chat to clear."));
            return false;
        };
        match race(&token, self.backend.clear_history(&session_id)).await {
            Ok(_) => {
                if self
                    .update_if_current(epoch, |state| apply(state, StateEvent::MessagesCleared))
                    .is_none()
                {
                    return false;
                }
                self.with_renderer(|r| {
                    r.clear_messages();
                    r.show_welcome();
                });
                true
            }
            Err(err) if err.is_abort() => false,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "could not clear history");
                self.with_renderer(|r| r.print_error(&format!("Could not clear chat: {err}")));
                false
            }
        }
    }

    /// Checks backend health.
    pub async fn health(&self) -> Result<HealthStatus> {
        self.backend.health().await
    }

    /// Cancels every in-flight request without changing the session.
    ///
    /// Responses that arrive afterwards are discarded. A cancelled chat
    /// request settles with [`CANCELLED_MESSAGE`] in place of a reply.
    /// Returns true if anything was in flight.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner();
        inner.token.cancel();
        inner.token = CancellationToken::new();
        self.in_flight() > 0
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn renderer(&self) -> MutexGuard<'_, R> {
        self.renderer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies a session-changing event and invalidates in-flight work.
    /// Returns the new epoch.
    fn begin_scope(&self, event: StateEvent) -> u64 {
        let mut inner = self.inner();
        Self::advance(&mut inner, event)
    }

    /// Like [`begin_scope`](Self::begin_scope), but only if no session
    /// change happened since `epoch`.
    fn reset_if_current(&self, epoch: u64, event: StateEvent) -> Option<u64> {
        let mut inner = self.inner();
        if inner.epoch != epoch {
            return None;
        }
        Some(Self::advance(&mut inner, event))
    }

    fn advance(inner: &mut Inner, event: StateEvent) -> u64 {
        inner.epoch += 1;
        inner.token.cancel();
        inner.token = CancellationToken::new();
        apply(&mut inner.state, event);
        inner.epoch
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner().epoch == epoch
    }

    /// Runs `f` on the state if no session change happened since `epoch`.
    fn update_if_current<T>(&self, epoch: u64, f: impl FnOnce(&mut ChatState) -> T) -> Option<T> {
        let mut inner = self.inner();
        if inner.epoch != epoch {
            return None;
        }
        Some(f(&mut inner.state))
    }

    fn note_stale(&self, operation: &'static str) {
        CHAT_STALE_RESPONSES.click();
        tracing::debug!(operation, "discarding response for a previous session");
    }

    fn typing(&self) -> TypingGuard<'_, R> {
        if self.in_flight.fetch_add(1, Ordering::AcqRel) == 0 {
            self.renderer().show_typing();
        }
        TypingGuard {
            in_flight: &self.in_flight,
            renderer: &self.renderer,
        }
    }

    /// Saves `session_id` unless the session changed since `epoch`.
    ///
    /// Returns false if the session changed before or during the write; the
    /// newer session's own write is queued behind this one and wins.
    async fn persist_session(&self, epoch: u64, session_id: &SessionId) -> bool {
        let _write = self.store_lock.lock().await;
        if !self.is_current(epoch) {
            return false;
        }
        if let Err(err) = self.store.save(session_id).await {
            SESSION_STORE_ERRORS.click();
            tracing::warn!(session_id = %session_id, error = %err, "could not persist session");
        }
        self.is_current(epoch)
    }

    async fn forget_session(&self, epoch: u64) {
        let _write = self.store_lock.lock().await;
        if !self.is_current(epoch) {
            return;
        }
        if let Err(err) = self.store.clear().await {
            SESSION_STORE_ERRORS.click();
            tracing::warn!(error = %err, "could not clear persisted session");
        }
    }
}

fn apply(state: &mut ChatState, event: StateEvent) {
    *state = std::mem::take(state).apply(event);
}

fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        Err(Error::validation(
            "audio queries need a prompt",
            Some("prompt".to_string()),
        ))
    } else {
        Ok(())
    }
}

async fn race<T>(
    token: &CancellationToken,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::abort("superseded by a session change")),
        result = operation => result,
    }
}

/// Holds a single-flight flag; released on drop.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Keeps the typing indicator up while any request is in flight.
struct TypingGuard<'a, R: Renderer> {
    in_flight: &'a AtomicUsize,
    renderer: &'a Mutex<R>,
}

impl<R: Renderer> Drop for TypingGuard<'_, R> {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.renderer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .hide_typing();
        }
    }
}
