//! Session runtime: owns live call sessions and the tasks that drive them.
//!
//! Flow: subscribe → start vendor call → drive events into `CallSession` →
//! on FINISHED (event or user disconnect) drop the subscription → finalize.
//! Idle sessions are expired by a periodic sweep and the registry is capped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::finalize::{finalize, Navigation};
use crate::llm_client::LanguageModel;
use crate::models::transcript::SavedMessage;
use crate::session::agent::{
    generate_variables, interview_variables, CallHandle, SessionDescriptor, VariableValues,
    VoiceAgent,
};
use crate::session::assistant::interviewer_assistant;
use crate::session::events::{EventKind, Subscription};
use crate::session::{CallSession, CallStatus, SessionError, SessionKind};
use crate::store::DocumentStore;
use crate::transcript::aggregate;

/// Capacity and expiry policy for the session registry.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    /// A session with no activity for this long is expired.
    pub session_timeout: Duration,
    pub cleanup_interval: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            session_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// One live or finished call session.
pub struct SessionHandle {
    id: Uuid,
    kind: SessionKind,
    session: Mutex<CallSession>,
    call: Mutex<Option<CallHandle>>,
    navigation: Mutex<Option<Navigation>>,
    disconnected: Notify,
    driver: Mutex<Option<JoinHandle<()>>>,
    finalizing: AtomicBool,
    last_activity: Mutex<Instant>,
}

impl SessionHandle {
    fn new(kind: SessionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            session: Mutex::new(CallSession::new()),
            call: Mutex::new(None),
            navigation: Mutex::new(None),
            disconnected: Notify::new(),
            driver: Mutex::new(None),
            finalizing: AtomicBool::new(false),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.lock().elapsed() >= timeout
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock();
        SessionSnapshot {
            session_id: self.id,
            session_type: self.kind.as_str(),
            status: session.status(),
            is_speaking: session.is_speaking(),
            transcript: aggregate(session.messages()),
            web_call_url: self.call.lock().as_ref().and_then(|c| c.web_call_url.clone()),
            redirect: self.navigation.lock().as_ref().map(Navigation::path),
        }
    }
}

/// Client-facing view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub session_type: &'static str,
    pub status: CallStatus,
    pub is_speaking: bool,
    /// Display blocks: consecutive same-speaker fragments merged.
    pub transcript: Vec<SavedMessage>,
    pub web_call_url: Option<String>,
    /// Set once finalization has decided where the client goes next.
    pub redirect: Option<String>,
}

/// Process-wide table of sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionHandle>>>>,
}

impl SessionRegistry {
    pub fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>, SessionError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    fn insert(&self, handle: Arc<SessionHandle>) {
        self.sessions.write().insert(handle.id, handle);
    }

    fn remove(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        self.sessions.write().remove(&id)
    }

    /// Removes and returns every session idle for at least `timeout`.
    fn take_expired(&self, timeout: Duration) -> Vec<Arc<SessionHandle>> {
        let mut sessions = self.sessions.write();
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, handle)| handle.is_expired(timeout))
            .map(|(id, _)| *id)
            .collect();
        expired
            .iter()
            .filter_map(|id| sessions.remove(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

#[derive(Clone)]
pub struct SessionRuntime {
    registry: SessionRegistry,
    voice: Arc<dyn VoiceAgent>,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn DocumentStore>,
    workflow_id: String,
    limits: SessionLimits,
}

impl SessionRuntime {
    pub fn new(
        voice: Arc<dyn VoiceAgent>,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn DocumentStore>,
        workflow_id: String,
    ) -> Self {
        Self {
            registry: SessionRegistry::default(),
            voice,
            model,
            store,
            workflow_id,
            limits: SessionLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Starts a vendor call for a new session and begins driving it.
    pub async fn start(&self, kind: SessionKind) -> Result<SessionSnapshot, AppError> {
        self.ensure_capacity()?;

        let handle = Arc::new(SessionHandle::new(kind));
        let session_id = handle.id;
        handle.session.lock().begin()?;

        // Subscribe before starting so no early vendor event is missed.
        let subscription = self.voice.subscribe(session_id, &EventKind::ALL);
        let (descriptor, variables) = self.call_request(&handle.kind);

        let call = match self.voice.start(session_id, &descriptor, &variables).await {
            Ok(call) => call,
            Err(e) => {
                warn!(%session_id, "Voice call failed to start: {e}");
                return Err(e.into());
            }
        };
        *handle.call.lock() = Some(call);
        self.registry.insert(handle.clone());

        let driver = tokio::spawn(drive(handle.clone(), subscription, self.clone()));
        *handle.driver.lock() = Some(driver);

        info!(%session_id, kind = handle.kind.as_str(), "Call session started");
        Ok(handle.snapshot())
    }

    fn ensure_capacity(&self) -> Result<(), SessionError> {
        if self.registry.len() < self.limits.max_sessions {
            return Ok(());
        }
        self.cleanup_expired();
        if self.registry.len() < self.limits.max_sessions {
            return Ok(());
        }
        warn!(
            "Rejecting call session: {} of {} slots in use",
            self.registry.len(),
            self.limits.max_sessions
        );
        Err(SessionError::CapacityReached(self.limits.max_sessions))
    }

    pub fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let handle = self.registry.get(id)?;
        handle.touch();
        Ok(handle.snapshot())
    }

    /// User-initiated hang-up: FINISHED immediately, finalization is handed
    /// off, then the vendor call is stopped.
    pub async fn disconnect(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let handle = self.registry.get(id)?;
        handle.touch();
        let transition = handle.session.lock().disconnect();

        if transition.finished() {
            self.spawn_finalization(handle.clone());
            if let Err(e) = self.voice.stop(id).await {
                warn!(session_id = %id, "Failed to stop voice call: {e}");
            }
            handle.disconnected.notify_one();
        }

        Ok(handle.snapshot())
    }

    /// Forgets a session and tears down its subscription. A finalization that
    /// has already been handed off keeps running.
    pub fn detach(&self, id: Uuid) -> Result<(), SessionError> {
        let handle = self.registry.remove(id).ok_or(SessionError::NotFound(id))?;
        self.teardown(&handle);
        info!(session_id = %id, "Call session detached");
        Ok(())
    }

    /// Drops every session idle past the timeout. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let expired = self.registry.take_expired(self.limits.session_timeout);
        for handle in &expired {
            self.teardown(handle);
            debug!(session_id = %handle.id, "Expired idle call session");
        }
        expired.len()
    }

    /// Periodically expires idle sessions. Send `true` on the returned
    /// channel to stop the task.
    pub fn start_cleanup_task(&self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let runtime = self.clone();
        let period = self.limits.cleanup_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = runtime.cleanup_expired();
                        if removed > 0 {
                            info!(
                                "Session cleanup: removed {} expired sessions ({} remaining)",
                                removed,
                                runtime.registry.len()
                            );
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    fn teardown(&self, handle: &SessionHandle) {
        if let Some(driver) = handle.driver.lock().take() {
            driver.abort();
        }
        self.voice.release(handle.id);
    }

    /// Hands the transcript to finalization. Runs at most once per session.
    fn spawn_finalization(&self, handle: Arc<SessionHandle>) {
        if handle.finalizing.swap(true, Ordering::SeqCst) {
            return;
        }
        let session_id = handle.id;
        let transcript = handle.session.lock().messages().to_vec();
        info!(%session_id, "Call finished with {} transcript messages", transcript.len());

        let runtime = self.clone();
        tokio::spawn(async move {
            let navigation = finalize(
                &handle.kind,
                &transcript,
                runtime.model.as_ref(),
                runtime.store.as_ref(),
            )
            .await;
            info!(%session_id, "Finalized; redirecting to {}", navigation.path());
            *handle.navigation.lock() = Some(navigation);
            handle.touch();
        });
    }

    fn call_request(&self, kind: &SessionKind) -> (SessionDescriptor, VariableValues) {
        match kind {
            SessionKind::Generate {
                user_name,
                user_id,
                job_description,
                resume_text,
            } => (
                SessionDescriptor::Workflow {
                    workflow_id: self.workflow_id.clone(),
                },
                generate_variables(user_name, user_id, job_description, resume_text),
            ),
            SessionKind::Interview { questions, .. } => (
                SessionDescriptor::Assistant(interviewer_assistant()),
                interview_variables(questions),
            ),
        }
    }
}

/// Applies vendor events in arrival order until the session finishes, then
/// releases the subscription and hands the transcript to finalization.
async fn drive(handle: Arc<SessionHandle>, mut subscription: Subscription, runtime: SessionRuntime) {
    let session_id = handle.id;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    warn!(%session_id, "Voice event stream closed");
                    return;
                };
                handle.touch();
                let transition = handle.session.lock().apply(&event);
                if transition.finished() {
                    break;
                }
            }
            _ = handle.disconnected.notified() => break,
        }
    }

    drop(subscription);
    runtime.voice.release(session_id);
    runtime.spawn_finalization(handle);
}
