//! Voice-agent notifications and the hub that routes them to call sessions.
//!
//! Subscriptions are scoped: a `Subscription` receives events for one session
//! until it is dropped, so teardown happens on every exit path of its owner.
//! Each subscription owns its own queue, so a burst for one session never
//! displaces another session's events.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::models::transcript::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    Partial,
    Final,
}

/// Conversation message relayed by the voice agent. Only transcripts are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentMessage {
    Transcript {
        role: Role,
        #[serde(rename = "transcriptType")]
        transcript_type: TranscriptType,
        transcript: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    Message(AgentMessage),
    SpeechStart,
    SpeechEnd,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CallStart,
    CallEnd,
    Message,
    SpeechStart,
    SpeechEnd,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::CallStart,
        EventKind::CallEnd,
        EventKind::Message,
        EventKind::SpeechStart,
        EventKind::SpeechEnd,
        EventKind::Error,
    ];
}

impl VoiceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            VoiceEvent::CallStart => EventKind::CallStart,
            VoiceEvent::CallEnd => EventKind::CallEnd,
            VoiceEvent::Message(_) => EventKind::Message,
            VoiceEvent::SpeechStart => EventKind::SpeechStart,
            VoiceEvent::SpeechEnd => EventKind::SpeechEnd,
            VoiceEvent::Error(_) => EventKind::Error,
        }
    }
}

struct Route {
    token: u64,
    kinds: Vec<EventKind>,
    tx: mpsc::UnboundedSender<VoiceEvent>,
}

#[derive(Default)]
struct Routes {
    next_token: u64,
    by_session: HashMap<Uuid, Vec<Route>>,
}

/// Process-wide event router between the vendor webhook and live call sessions.
#[derive(Clone, Default)]
pub struct EventHub {
    routes: Arc<Mutex<Routes>>,
}

impl EventHub {
    /// Publishes an event for a session. Returns the number of live subscriptions
    /// that received it (zero when nobody is listening).
    pub fn publish(&self, session_id: Uuid, event: VoiceEvent) -> usize {
        let routes = self.routes.lock();
        let Some(subscribers) = routes.by_session.get(&session_id) else {
            return 0;
        };
        let kind = event.kind();
        subscribers
            .iter()
            .filter(|route| route.kinds.contains(&kind))
            .filter(|route| route.tx.send(event.clone()).is_ok())
            .count()
    }

    pub fn subscribe(&self, session_id: Uuid, kinds: &[EventKind]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.routes.lock();
        let token = routes.next_token;
        routes.next_token += 1;
        routes.by_session.entry(session_id).or_default().push(Route {
            token,
            kinds: kinds.to_vec(),
            tx,
        });
        debug!(%session_id, ?kinds, "Voice event subscription acquired");

        Subscription {
            rx,
            session_id,
            token,
            routes: Arc::downgrade(&self.routes),
        }
    }

    /// Number of live subscriptions across all sessions.
    pub fn subscriber_count(&self) -> usize {
        self.routes.lock().by_session.values().map(Vec::len).sum()
    }
}

/// Receives one session's events of the requested kinds until dropped.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<VoiceEvent>,
    session_id: Uuid,
    token: u64,
    routes: Weak<Mutex<Routes>>,
}

impl Subscription {
    /// Next matching event in publish order, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<VoiceEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(routes) = self.routes.upgrade() {
            let mut routes = routes.lock();
            if let Some(subscribers) = routes.by_session.get_mut(&self.session_id) {
                subscribers.retain(|route| route.token != self.token);
                if subscribers.is_empty() {
                    routes.by_session.remove(&self.session_id);
                }
            }
        }
        debug!(session_id = %self.session_id, "Voice event subscription released");
    }
}
