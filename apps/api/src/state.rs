use std::sync::Arc;

use crate::config::Config;
use crate::form::extract::ResumeExtractor;
use crate::form::GenerationGateway;
use crate::llm_client::LanguageModel;
use crate::session::events::EventHub;
use crate::session::runtime::SessionRuntime;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    /// Generative model for questions and feedback. Default: `LlmClient` (Gemini).
    pub model: Arc<dyn LanguageModel>,
    /// Vendor webhook events are published here; sessions subscribe through the voice agent.
    pub events: EventHub,
    pub sessions: SessionRuntime,
    pub resume_extractor: Arc<dyn ResumeExtractor>,
    pub generation_gateway: Arc<dyn GenerationGateway>,
}
