//! Controller tests against an in-process backend.
//! No network access is needed; every response is scripted.

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use time::OffsetDateTime;
    use time::macros::datetime;
    use tokio::sync::{Notify, Semaphore};

    use boltchat::chat::{
        AUDIO_FAILED, AUDIO_PROMPT_REQUIRED, AudioOutcome, CANCELLED_MESSAGE, ChatController,
        FALLBACK_MESSAGE, HistoryOutcome, RecordingRenderer, RenderEvent, SendOutcome, Skipped,
        StartOutcome,
    };
    use boltchat::{
        ActiveSessions, AudioQuery, AudioQueryResponse, ChatBackend, ChatHistory, ChatRequest,
        ChatResponse, ClearHistoryResponse, Error, HealthStatus, HistoryEntry, MemorySessionStore,
        NewSession, Result, Sender, SessionId, SessionStore,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Chat {
            message: String,
            session_id: Option<SessionId>,
        },
        History(SessionId),
        Clear(SessionId),
        Sessions,
        NewSession,
        Audio(String),
    }

    /// Scripted backend. Chat and audio requests wait on `gate` when one is set.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<Call>>,
        chat: Mutex<VecDeque<Result<ChatResponse>>>,
        histories: Mutex<HashMap<SessionId, Result<Vec<HistoryEntry>>>>,
        sessions: Mutex<Option<Vec<SessionId>>>,
        new_sessions: Mutex<VecDeque<SessionId>>,
        audio: Mutex<VecDeque<Result<String>>>,
        gate: Option<Arc<Semaphore>>,
        started: Arc<Notify>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self::default()
        }

        fn gated() -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let backend = Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            };
            (backend, gate)
        }

        fn reply(&self, session_id: &str, response: &str) {
            self.chat.lock().unwrap().push_back(Ok(ChatResponse {
                session_id: SessionId::new(session_id),
                response: response.to_string(),
                timestamp: datetime!(2024-05-01 12:00:00 UTC),
            }));
        }

        fn fail_chat(&self, err: Error) {
            self.chat.lock().unwrap().push_back(Err(err));
        }

        fn set_history(&self, session_id: &str, history: Result<Vec<HistoryEntry>>) {
            self.histories
                .lock()
                .unwrap()
                .insert(SessionId::new(session_id), history);
        }

        fn set_sessions(&self, sessions: &[&str]) {
            *self.sessions.lock().unwrap() =
                Some(sessions.iter().map(|s| SessionId::new(*s)).collect());
        }

        fn queue_new_session(&self, session_id: &str) {
            self.new_sessions
                .lock()
                .unwrap()
                .push_back(SessionId::new(session_id));
        }

        fn answer_audio(&self, answer: Result<String>) {
            self.audio.lock().unwrap().push_back(answer);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        async fn wait_for_gate(&self) {
            self.started.notify_one();
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for FakeBackend {
        async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.record(Call::Chat {
                message: request.message.clone(),
                session_id: request.session_id.clone(),
            });
            self.wait_for_gate().await;
            self.chat
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::api(500, "no scripted reply")))
        }

        async fn fetch_history(&self, session_id: &SessionId) -> Result<ChatHistory> {
            self.record(Call::History(session_id.clone()));
            match self.histories.lock().unwrap().get(session_id) {
                Some(Ok(messages)) => Ok(ChatHistory {
                    session_id: Some(session_id.clone()),
                    messages: messages.clone(),
                }),
                Some(Err(err)) => Err(err.clone()),
                None => Err(Error::not_found(
                    "Session not found",
                    Some(session_id.to_string()),
                )),
            }
        }

        async fn clear_history(&self, session_id: &SessionId) -> Result<ClearHistoryResponse> {
            self.record(Call::Clear(session_id.clone()));
            self.histories
                .lock()
                .unwrap()
                .insert(session_id.clone(), Ok(Vec::new()));
            Ok(ClearHistoryResponse {
                message: "Chat history cleared".to_string(),
            })
        }

        async fn list_sessions(&self) -> Result<ActiveSessions> {
            self.record(Call::Sessions);
            match self.sessions.lock().unwrap().clone() {
                Some(active_sessions) => Ok(ActiveSessions {
                    total_sessions: Some(active_sessions.len()),
                    active_sessions,
                }),
                None => Err(Error::connection("connection refused", None)),
            }
        }

        async fn new_session(&self) -> Result<NewSession> {
            self.record(Call::NewSession);
            match self.new_sessions.lock().unwrap().pop_front() {
                Some(session_id) => Ok(NewSession { session_id }),
                None => Err(Error::api(500, "no scripted session")),
            }
        }

        async fn audio_query(&self, query: AudioQuery) -> Result<AudioQueryResponse> {
            self.record(Call::Audio(query.prompt.clone()));
            self.wait_for_gate().await;
            let answer = self
                .audio
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::api(500, "no scripted answer")))?;
            Ok(AudioQueryResponse { response: answer })
        }

        async fn health(&self) -> Result<HealthStatus> {
            Ok(HealthStatus {
                status: "healthy".to_string(),
                timestamp: None,
            })
        }
    }

    /// Session store that can hold its next `save` until `gate` opens.
    struct SlowStore {
        inner: MemorySessionStore,
        hold_next_save: AtomicBool,
        gate: Semaphore,
        saving: Notify,
    }

    impl SlowStore {
        fn holding_next_save() -> Self {
            Self {
                inner: MemorySessionStore::new(),
                hold_next_save: AtomicBool::new(true),
                gate: Semaphore::new(0),
                saving: Notify::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionStore for SlowStore {
        async fn load(&self) -> Result<Option<SessionId>> {
            self.inner.load().await
        }

        async fn save(&self, session_id: &SessionId) -> Result<()> {
            if self.hold_next_save.swap(false, Ordering::SeqCst) {
                self.saving.notify_one();
                self.gate.acquire().await.unwrap().forget();
            }
            self.inner.save(session_id).await
        }

        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
    }

    type TestController =
        ChatController<Arc<FakeBackend>, Arc<MemorySessionStore>, RecordingRenderer>;

    fn controller(
        backend: &Arc<FakeBackend>,
        store: &Arc<MemorySessionStore>,
    ) -> (Arc<TestController>, RecordingRenderer) {
        let renderer = RecordingRenderer::new();
        let controller = ChatController::new(
            Arc::clone(backend),
            Arc::clone(store),
            renderer.clone(),
        );
        (Arc::new(controller), renderer)
    }

    fn entry(kind: &str, content: &str) -> HistoryEntry {
        HistoryEntry {
            content: content.to_string(),
            kind: kind.to_string(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn texts(controller: &TestController) -> Vec<String> {
        controller.messages().into_iter().map(|m| m.text).collect()
    }

    fn audio(prompt: &str) -> AudioQuery {
        AudioQuery::new("clip.wav", vec![0x52, 0x49, 0x46, 0x46], prompt)
    }

    #[tokio::test]
    async fn reply_is_appended_and_session_persisted() {
        let backend = Arc::new(FakeBackend::new());
        backend.reply("s1", "hi");
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        let outcome = controller.send_message("hello").await;
        assert!(matches!(outcome, SendOutcome::Replied(ref m) if m.text == "hi"));

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].text, "hi");
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_ne!(messages[0].id, messages[1].id);

        assert_eq!(controller.session_id(), Some(SessionId::new("s1")));
        assert_eq!(store.current(), Some(SessionId::new("s1")));
        assert_eq!(
            backend.calls(),
            vec![Call::Chat {
                message: "hello".to_string(),
                session_id: None,
            }]
        );

        let events = renderer.events();
        assert!(events.contains(&RenderEvent::TypingShown));
        assert_eq!(events.last(), Some(&RenderEvent::Message(messages[1].clone())));
        assert_eq!(controller.in_flight(), 0);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn follow_up_messages_carry_the_session() {
        let backend = Arc::new(FakeBackend::new());
        backend.reply("s1", "hi");
        backend.reply("s1", "still here");
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        controller.send_message("hello").await;
        controller.send_message("  again  ").await;

        assert_eq!(
            backend.calls()[1],
            Call::Chat {
                message: "again".to_string(),
                session_id: Some(SessionId::new("s1")),
            }
        );
        assert_eq!(texts(&controller), vec!["hello", "hi", "again", "still here"]);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        let outcome = controller.send_message("   ").await;
        assert!(matches!(outcome, SendOutcome::Skipped(Skipped::EmptyInput)));
        assert!(backend.calls().is_empty());
        assert!(controller.messages().is_empty());
        assert!(renderer.events().is_empty());
    }

    #[tokio::test]
    async fn sending_while_busy_is_a_no_op() {
        let (backend, gate) = FakeBackend::gated();
        let backend = Arc::new(backend);
        backend.reply("s1", "first reply");
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send_message("one").await }
        });
        backend.started.notified().await;
        assert!(controller.is_busy());

        let second = controller.send_message("two").await;
        assert!(matches!(second, SendOutcome::Skipped(Skipped::Busy)));
        assert_eq!(backend.calls().len(), 1);

        gate.add_permits(1);
        let first = pending.await.unwrap();
        assert!(matches!(first, SendOutcome::Replied(_)));
        assert_eq!(texts(&controller), vec!["one", "first reply"]);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn failed_request_appends_fallback() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_chat(Error::api(500, "Internal server error: model offline"));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        match controller.send_message("hello").await {
            SendOutcome::Fallback { message, error } => {
                assert_eq!(message.text, FALLBACK_MESSAGE);
                assert_eq!(message.sender, Sender::Bot);
                assert_eq!(error.status_code(), Some(500));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert_eq!(texts(&controller), vec!["hello", FALLBACK_MESSAGE]);
        assert_eq!(controller.session_id(), None);
        assert_eq!(store.current(), None);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn missing_session_is_replaced_on_startup() {
        let backend = Arc::new(FakeBackend::new());
        backend.queue_new_session("fresh");
        backend.set_sessions(&["fresh"]);
        let store = Arc::new(MemorySessionStore::with_session(SessionId::new("gone")));
        let (controller, renderer) = controller(&backend, &store);

        let outcome = controller.start().await;
        match outcome {
            StartOutcome::Restored(HistoryOutcome::SessionMissing { replacement }) => {
                assert_eq!(replacement, Some(SessionId::new("fresh")));
            }
            other => panic!("expected a replaced session, got {other:?}"),
        }

        assert!(controller.messages().is_empty());
        assert_eq!(controller.session_id(), Some(SessionId::new("fresh")));
        assert_eq!(store.current(), Some(SessionId::new("fresh")));

        let calls = backend.calls();
        assert_eq!(calls[0], Call::History(SessionId::new("gone")));
        assert!(calls.contains(&Call::NewSession));
        assert_eq!(calls.iter().filter(|c| **c == Call::Sessions).count(), 1);
        assert!(renderer.events().contains(&RenderEvent::Welcome));
    }

    #[tokio::test]
    async fn missing_session_is_forgotten_when_replacement_fails() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::with_session(SessionId::new("gone")));
        let (controller, renderer) = controller(&backend, &store);

        match controller.start().await {
            StartOutcome::Restored(HistoryOutcome::SessionMissing { replacement }) => {
                assert_eq!(replacement, None);
            }
            other => panic!("expected a missing session, got {other:?}"),
        }

        assert_eq!(controller.session_id(), None);
        assert_eq!(store.current(), None);
        assert!(controller.messages().is_empty());
        assert!(
            renderer
                .events()
                .iter()
                .any(|e| matches!(e, RenderEvent::Error(_)))
        );
        assert_eq!(renderer.last_sessions(), Some(RenderEvent::NoSessions));
    }

    #[tokio::test]
    async fn switching_back_reloads_identical_history() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history(
            "a",
            Ok(vec![entry("user", "hello"), entry("assistant", "hi there")]),
        );
        backend.set_history("b", Ok(vec![entry("user", "other chat")]));
        backend.set_sessions(&["a", "b"]);
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        assert!(matches!(
            controller.switch_session(SessionId::new("a")).await,
            HistoryOutcome::Loaded(2)
        ));
        let first = texts(&controller);
        assert_eq!(first, vec!["hello", "hi there"]);
        assert_eq!(controller.messages()[1].sender, Sender::Bot);

        assert!(matches!(
            controller.switch_session(SessionId::new("b")).await,
            HistoryOutcome::Loaded(1)
        ));
        assert_eq!(texts(&controller), vec!["other chat"]);
        assert_eq!(store.current(), Some(SessionId::new("b")));

        assert!(matches!(
            controller.switch_session(SessionId::new("a")).await,
            HistoryOutcome::Loaded(2)
        ));
        assert_eq!(texts(&controller), first);

        match renderer.last_sessions() {
            Some(RenderEvent::Sessions(entries)) => {
                assert_eq!(entries.len(), 2);
                assert!(entries[0].is_current);
                assert!(!entries[1].is_current);
            }
            other => panic!("expected a session list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_for_previous_session_is_discarded() {
        let (backend, gate) = FakeBackend::gated();
        let backend = Arc::new(backend);
        backend.reply("s1", "late reply");
        backend.set_history("s2", Ok(Vec::new()));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send_message("hello").await }
        });
        backend.started.notified().await;

        let switched = controller.switch_session(SessionId::new("s2")).await;
        assert!(matches!(switched, HistoryOutcome::Loaded(0)));
        gate.add_permits(1);

        assert!(matches!(pending.await.unwrap(), SendOutcome::Stale));
        assert!(controller.messages().is_empty());
        assert_eq!(controller.session_id(), Some(SessionId::new("s2")));
        assert_eq!(store.current(), Some(SessionId::new("s2")));
        assert_eq!(controller.in_flight(), 0);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn cancel_abandons_the_pending_reply() {
        let (backend, _gate) = FakeBackend::gated();
        let backend = Arc::new(backend);
        backend.reply("s1", "never shown");
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send_message("hello").await }
        });
        backend.started.notified().await;

        assert!(controller.cancel());
        match pending.await.unwrap() {
            SendOutcome::Cancelled(message) => {
                assert_eq!(message.text, CANCELLED_MESSAGE);
                assert_eq!(message.sender, Sender::Bot);
            }
            other => panic!("expected a cancelled send, got {other:?}"),
        }
        assert_eq!(texts(&controller), vec!["hello", CANCELLED_MESSAGE]);
        assert_eq!(store.current(), None);
        assert!(!controller.is_busy());
        assert!(!controller.cancel());
    }

    #[tokio::test]
    async fn cancel_abandons_a_pending_audio_query() {
        let (backend, _gate) = FakeBackend::gated();
        let backend = Arc::new(backend);
        backend.answer_audio(Ok("never shown".to_string()));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit_audio(audio("what is this?")).await }
        });
        backend.started.notified().await;

        assert!(controller.cancel());
        assert!(matches!(pending.await.unwrap(), AudioOutcome::Cancelled));
        assert!(controller.messages().is_empty());
        assert!(renderer.alerts().is_empty());
        assert_eq!(controller.in_flight(), 0);
    }

    #[tokio::test]
    async fn late_save_does_not_overwrite_newer_session() {
        let backend = Arc::new(FakeBackend::new());
        backend.reply("s1", "hi");
        backend.set_history("s2", Ok(Vec::new()));
        let store = Arc::new(SlowStore::holding_next_save());
        let controller = Arc::new(ChatController::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            RecordingRenderer::new(),
        ));

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send_message("hello").await }
        });
        store.saving.notified().await;

        let switch = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.switch_session(SessionId::new("s2")).await }
        });
        while controller.session_id() != Some(SessionId::new("s2")) {
            tokio::task::yield_now().await;
        }
        store.gate.add_permits(1);

        assert!(matches!(pending.await.unwrap(), SendOutcome::Stale));
        assert!(matches!(switch.await.unwrap(), HistoryOutcome::Loaded(0)));
        assert_eq!(controller.session_id(), Some(SessionId::new("s2")));
        assert_eq!(store.inner.current(), Some(SessionId::new("s2")));
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn audio_without_prompt_sends_nothing() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        let outcome = controller.submit_audio(audio("   ")).await;
        assert!(matches!(outcome, AudioOutcome::Failed(ref err) if err.is_validation()));
        assert_eq!(renderer.alerts(), vec![AUDIO_PROMPT_REQUIRED.to_string()]);
        assert!(backend.calls().is_empty());

        let outcome = controller
            .submit_audio_file("/nonexistent/clip.wav", "")
            .await;
        assert!(matches!(outcome, AudioOutcome::Failed(ref err) if err.is_validation()));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn audio_answer_is_appended_as_bot_message() {
        let backend = Arc::new(FakeBackend::new());
        backend.answer_audio(Ok("Someone says hello.".to_string()));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        let outcome = controller.submit_audio(audio("  what is said?  ")).await;
        assert!(matches!(outcome, AudioOutcome::Answered(ref m) if m.sender == Sender::Bot));
        assert_eq!(texts(&controller), vec!["Someone says hello."]);
        assert_eq!(backend.calls(), vec![Call::Audio("what is said?".to_string())]);
    }

    #[tokio::test]
    async fn concurrent_audio_is_rejected() {
        let (backend, gate) = FakeBackend::gated();
        let backend = Arc::new(backend);
        backend.answer_audio(Ok("a dog barking".to_string()));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit_audio(audio("what is this?")).await }
        });
        backend.started.notified().await;

        let second = controller.submit_audio(audio("and this?")).await;
        assert!(matches!(second, AudioOutcome::Skipped(Skipped::Busy)));
        assert_eq!(backend.calls().len(), 1);

        gate.add_permits(1);
        assert!(matches!(pending.await.unwrap(), AudioOutcome::Answered(_)));
        assert_eq!(texts(&controller), vec!["a dog barking"]);
    }

    #[tokio::test]
    async fn failed_audio_alerts_the_user() {
        let backend = Arc::new(FakeBackend::new());
        backend.answer_audio(Err(Error::api(500, "Audio processing error")));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        let outcome = controller.submit_audio(audio("transcribe")).await;
        assert!(matches!(outcome, AudioOutcome::Failed(_)));
        assert_eq!(renderer.alerts(), vec![AUDIO_FAILED.to_string()]);
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn chat_and_audio_share_the_typing_indicator() {
        let (backend, gate) = FakeBackend::gated();
        let backend = Arc::new(backend);
        backend.reply("s1", "hi");
        backend.answer_audio(Ok("music".to_string()));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        let chat = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send_message("hello").await }
        });
        backend.started.notified().await;
        let upload = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit_audio(audio("what is playing?")).await }
        });
        backend.started.notified().await;
        assert_eq!(controller.in_flight(), 2);

        gate.add_permits(2);
        assert!(matches!(chat.await.unwrap(), SendOutcome::Replied(_)));
        assert!(matches!(upload.await.unwrap(), AudioOutcome::Answered(_)));
        assert_eq!(controller.in_flight(), 0);

        let events = renderer.events();
        let shown = events.iter().filter(|e| **e == RenderEvent::TypingShown).count();
        let hidden = events.iter().filter(|e| **e == RenderEvent::TypingHidden).count();
        assert_eq!((shown, hidden), (1, 1));
    }

    #[tokio::test]
    async fn history_errors_leave_messages_alone() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history("s1", Ok(vec![entry("user", "kept")]));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);
        controller.switch_session(SessionId::new("s1")).await;

        backend.set_history("s1", Err(Error::api(500, "database locked")));
        let outcome = controller.load_history().await;
        assert!(matches!(outcome, HistoryOutcome::Unavailable(ref err) if err.status_code() == Some(500)));
        assert_eq!(texts(&controller), vec!["kept"]);
        assert_eq!(controller.session_id(), Some(SessionId::new("s1")));
        assert!(!backend.calls().contains(&Call::NewSession));
    }

    #[tokio::test]
    async fn load_history_without_session_does_nothing() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        assert!(matches!(controller.load_history().await, HistoryOutcome::NoSession));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn session_list_failure_shows_placeholder() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        assert_eq!(controller.list_sessions().await, None);
        assert_eq!(renderer.last_sessions(), Some(RenderEvent::NoSessions));
    }

    #[tokio::test]
    async fn session_list_marks_current() {
        let backend = Arc::new(FakeBackend::new());
        backend.reply("s1", "hi");
        backend.set_sessions(&["s0", "s1"]);
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);
        controller.send_message("hello").await;

        let entries = controller.list_sessions().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_current);
        assert!(entries[1].is_current);
        assert_eq!(entries[1].label(), "Current Chat");
    }

    #[tokio::test]
    async fn new_session_clears_messages() {
        let backend = Arc::new(FakeBackend::new());
        backend.reply("s1", "hi");
        backend.queue_new_session("s2");
        backend.set_sessions(&["s1", "s2"]);
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);
        controller.send_message("hello").await;

        assert_eq!(controller.create_session().await, Some(SessionId::new("s2")));
        assert!(controller.messages().is_empty());
        assert_eq!(store.current(), Some(SessionId::new("s2")));
        assert!(renderer.events().contains(&RenderEvent::Welcome));

        assert_eq!(controller.create_session().await, None);
        assert_eq!(controller.session_id(), Some(SessionId::new("s2")));
        assert!(matches!(
            renderer.events().last(),
            Some(RenderEvent::Error(_))
        ));
    }

    #[tokio::test]
    async fn start_without_restore_forgets_persisted_session() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_sessions(&[]);
        let store = Arc::new(MemorySessionStore::with_session(SessionId::new("old")));
        let renderer = RecordingRenderer::new();
        let controller = ChatController::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            renderer.clone(),
        )
        .with_restore_session(false);

        assert!(matches!(controller.start().await, StartOutcome::Fresh));
        assert_eq!(controller.session_id(), None);
        assert_eq!(store.current(), None);
        assert_eq!(backend.calls(), vec![Call::Sessions]);
        assert!(renderer.events().contains(&RenderEvent::Welcome));
    }

    #[tokio::test]
    async fn start_restores_persisted_session() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history("old", Ok(vec![entry("user", "hello"), entry("bot", "hi")]));
        backend.set_sessions(&["old"]);
        let store = Arc::new(MemorySessionStore::with_session(SessionId::new("old")));
        let (controller, _) = controller(&backend, &store);

        assert!(matches!(
            controller.start().await,
            StartOutcome::Restored(HistoryOutcome::Loaded(2))
        ));
        assert_eq!(controller.session_id(), Some(SessionId::new("old")));
        assert_eq!(texts(&controller), vec!["hello", "hi"]);
    }

    #[tokio::test]
    async fn start_with_nothing_persisted_is_fresh() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::new());
        let (controller, renderer) = controller(&backend, &store);

        assert!(matches!(controller.start().await, StartOutcome::Fresh));
        assert_eq!(backend.calls(), vec![Call::Sessions]);
        assert_eq!(renderer.last_sessions(), Some(RenderEvent::NoSessions));
    }

    #[tokio::test]
    async fn clear_history_empties_current_chat() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history("s1", Ok(vec![entry("user", "hello")]));
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);
        controller.switch_session(SessionId::new("s1")).await;

        assert!(controller.clear_history().await);
        assert!(controller.messages().is_empty());
        assert_eq!(controller.session_id(), Some(SessionId::new("s1")));
        assert!(backend.calls().contains(&Call::Clear(SessionId::new("s1"))));
    }

    #[tokio::test]
    async fn health_passes_through() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemorySessionStore::new());
        let (controller, _) = controller(&backend, &store);

        assert!(controller.health().await.unwrap().is_healthy());
    }
}
