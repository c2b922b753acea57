//! In-memory fakes for the store, model, voice-agent and form ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::feedback::prompts::FEEDBACK_CATEGORIES;
use crate::form::extract::{ExtractError, ResumeExtractor};
use crate::form::GenerationGateway;
use crate::generation::GenerateRequest;
use crate::llm_client::{LanguageModel, LlmError};
use crate::session::agent::{CallHandle, SessionDescriptor, VariableValues, VoiceAgent, VoiceError};
use crate::session::events::{EventHub, EventKind, Subscription};
use crate::session::runtime::SessionRuntime;
use crate::state::AppState;
use crate::store::{Collection, DocumentStore, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Document store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDocumentStore {
    records: Mutex<HashMap<Collection, Vec<(String, Value)>>>,
    failing: Option<Option<Collection>>,
}

impl MemoryDocumentStore {
    /// Every write and read fails.
    pub fn failing() -> Self {
        Self {
            failing: Some(None),
            ..Self::default()
        }
    }

    /// Operations on `collection` fail; the others succeed.
    pub fn failing_for(collection: Collection) -> Self {
        Self {
            failing: Some(Some(collection)),
            ..Self::default()
        }
    }

    pub fn get(&self, collection: Collection, id: &str) -> Option<Value> {
        self.records
            .lock()
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(key, _)| key == id))
            .map(|(_, value)| value.clone())
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.records.lock().get(&collection).map_or(0, Vec::len)
    }

    pub fn all(&self, collection: Collection) -> Vec<Value> {
        self.records
            .lock()
            .get(&collection)
            .map(|docs| docs.iter().map(|(_, value)| value.clone()).collect())
            .unwrap_or_default()
    }

    fn check(&self, collection: Collection) -> Result<(), StoreError> {
        match self.failing {
            Some(None) => Err(StoreError::Database(sqlx::Error::PoolTimedOut)),
            Some(Some(c)) if c == collection => Err(StoreError::Database(sqlx::Error::PoolTimedOut)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add_record(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
        self.check(collection)?;
        let id = Uuid::new_v4().to_string();
        self.records
            .lock()
            .entry(collection)
            .or_default()
            .push((id.clone(), record));
        Ok(id)
    }

    async fn set_record(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        self.check(collection)?;
        let mut records = self.records.lock();
        let docs = records.entry(collection).or_default();
        match docs.iter_mut().find(|(key, _)| key == id) {
            Some((_, existing)) => *existing = record,
            None => docs.push((id.to_string(), record)),
        }
        Ok(())
    }

    async fn get_record(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        self.check(collection)?;
        Ok(self.get(collection, id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Language model
// ────────────────────────────────────────────────────────────────────────────

/// Replies with a fixed text (or fails) and records every prompt it sees.
pub struct ScriptedModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_text(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        self.reply.clone().ok_or_else(|| LlmError::Api {
            status: 503,
            message: "model unavailable".to_string(),
        })
    }
}

/// A well-formed assessment covering every feedback category.
pub fn sample_assessment_json() -> String {
    let categories: Vec<Value> = FEEDBACK_CATEGORIES
        .iter()
        .map(|name| json!({ "name": name, "score": 70, "comment": "Solid." }))
        .collect();
    json!({
        "totalScore": 72,
        "categoryScores": categories,
        "strengths": ["Clear explanations"],
        "areasForImprovement": ["Go deeper on trade-offs"],
        "finalAssessment": "A capable candidate."
    })
    .to_string()
}

pub fn sample_generate_request() -> GenerateRequest {
    GenerateRequest {
        interview_type: "technical".to_string(),
        role: "Backend Engineer".to_string(),
        level: "senior".to_string(),
        techstack: "rust, tokio, postgres".to_string(),
        amount: 5,
        user_id: "u-1".to_string(),
        job_description: "Design low-latency services".to_string(),
        resume_text: "Ten years of distributed systems".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Voice agent
// ────────────────────────────────────────────────────────────────────────────

/// Records calls and routes subscriptions through a shared hub; tests publish
/// events on the hub in place of the vendor webhook.
pub struct FakeVoiceAgent {
    hub: EventHub,
    starts: Mutex<Vec<(Uuid, SessionDescriptor, VariableValues)>>,
    stops: Mutex<Vec<Uuid>>,
    released: Mutex<Vec<Uuid>>,
    fail_next: AtomicBool,
}

impl FakeVoiceAgent {
    pub fn new(hub: EventHub) -> Self {
        Self {
            hub,
            starts: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn starts(&self) -> Vec<(Uuid, SessionDescriptor, VariableValues)> {
        self.starts.lock().clone()
    }

    pub fn stops(&self) -> Vec<Uuid> {
        self.stops.lock().clone()
    }

    pub fn released(&self) -> Vec<Uuid> {
        self.released.lock().clone()
    }

    pub fn fail_next_start(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoiceAgent for FakeVoiceAgent {
    async fn start(
        &self,
        session_id: Uuid,
        descriptor: &SessionDescriptor,
        variables: &VariableValues,
    ) -> Result<CallHandle, VoiceError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(VoiceError::Api {
                status: 500,
                message: "vendor unavailable".to_string(),
            });
        }
        self.starts
            .lock()
            .push((session_id, descriptor.clone(), variables.clone()));
        Ok(CallHandle {
            call_id: format!("call-{session_id}"),
            web_call_url: Some(format!("https://calls.test/{session_id}")),
        })
    }

    async fn stop(&self, session_id: Uuid) -> Result<(), VoiceError> {
        self.stops.lock().push(session_id);
        Ok(())
    }

    fn subscribe(&self, session_id: Uuid, kinds: &[EventKind]) -> Subscription {
        self.hub.subscribe(session_id, kinds)
    }

    fn release(&self, session_id: Uuid) {
        self.released.lock().push(session_id);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Form ports
// ────────────────────────────────────────────────────────────────────────────

pub struct FakeExtractor {
    text: Option<String>,
}

impl FakeExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl ResumeExtractor for FakeExtractor {
    async fn extract_text(&self, _file: &Bytes) -> Result<String, ExtractError> {
        self.text.clone().ok_or(ExtractError::Empty)
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<GenerateRequest>>,
    reject: bool,
}

impl RecordingGateway {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerationGateway for RecordingGateway {
    async fn submit(&self, request: &GenerateRequest) -> Result<(), AppError> {
        if self.reject {
            return Err(AppError::Upstream("generation endpoint returned 500".to_string()));
        }
        self.requests.lock().push(request.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Application state
// ────────────────────────────────────────────────────────────────────────────

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryDocumentStore>,
    pub voice: Arc<FakeVoiceAgent>,
    pub gateway: Arc<RecordingGateway>,
    pub extractor_text: String,
}

pub fn test_state() -> TestHarness {
    test_state_with_model(ScriptedModel::replying(&sample_assessment_json()))
}

pub fn test_state_with_model(model: ScriptedModel) -> TestHarness {
    let config = Config::for_tests();
    let events = EventHub::default();
    let store = Arc::new(MemoryDocumentStore::default());
    let voice = Arc::new(FakeVoiceAgent::new(events.clone()));
    let model: Arc<dyn LanguageModel> = Arc::new(model);
    let gateway = Arc::new(RecordingGateway::default());
    let extractor_text = "Jane Doe. Rust engineer, five years.".to_string();

    let sessions = SessionRuntime::new(
        voice.clone(),
        model.clone(),
        store.clone(),
        config.vapi_workflow_id.clone(),
    );

    let state = AppState {
        config,
        store: store.clone(),
        model,
        events,
        sessions,
        resume_extractor: Arc::new(FakeExtractor::returning(&extractor_text)),
        generation_gateway: gateway.clone(),
    };

    TestHarness {
        state,
        store,
        voice,
        gateway,
        extractor_text,
    }
}
