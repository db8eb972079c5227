use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("boltchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("boltchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("boltchat.client.request_duration_seconds");

pub(crate) static CHAT_SENDS: Counter = Counter::new("boltchat.chat.sends");
pub(crate) static CHAT_SEND_BUSY: Counter = Counter::new("boltchat.chat.sends_rejected_busy");
pub(crate) static CHAT_SEND_FALLBACKS: Counter = Counter::new("boltchat.chat.fallbacks");
pub(crate) static CHAT_STALE_RESPONSES: Counter = Counter::new("boltchat.chat.stale_responses");

pub(crate) static HISTORY_LOADS: Counter = Counter::new("boltchat.history.loads");
pub(crate) static HISTORY_NOT_FOUND: Counter = Counter::new("boltchat.history.not_found");
pub(crate) static HISTORY_ERRORS: Counter = Counter::new("boltchat.history.errors");

pub(crate) static SESSIONS_CREATED: Counter = Counter::new("boltchat.session.created");
pub(crate) static SESSION_SWITCHES: Counter = Counter::new("boltchat.session.switches");
pub(crate) static SESSION_STORE_ERRORS: Counter = Counter::new("boltchat.session.store_errors");

pub(crate) static AUDIO_QUERIES: Counter = Counter::new("boltchat.audio.queries");
pub(crate) static AUDIO_FAILURES: Counter = Counter::new("boltchat.audio.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SEND_BUSY);
    collector.register_counter(&CHAT_SEND_FALLBACKS);
    collector.register_counter(&CHAT_STALE_RESPONSES);

    collector.register_counter(&HISTORY_LOADS);
    collector.register_counter(&HISTORY_NOT_FOUND);
    collector.register_counter(&HISTORY_ERRORS);

    collector.register_counter(&SESSIONS_CREATED);
    collector.register_counter(&SESSION_SWITCHES);
    collector.register_counter(&SESSION_STORE_ERRORS);

    collector.register_counter(&AUDIO_QUERIES);
    collector.register_counter(&AUDIO_FAILURES);
}
