use anyhow::{Context, Result};

const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";
const DEFAULT_MAX_SESSIONS: usize = 1000;
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub google_api_key: String,
    pub vapi_api_key: String,
    pub vapi_base_url: String,
    /// Workflow used for question-generation calls.
    pub vapi_workflow_id: String,
    /// Shared secret the voice vendor sends with every webhook, if configured.
    pub vapi_webhook_secret: Option<String>,
    /// Public base URL of this application. Used to address the generation
    /// endpoint absolutely from the form flow.
    pub project_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on concurrently tracked call sessions.
    pub max_sessions: usize,
    /// Sessions idle for longer than this are expired.
    pub session_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            google_api_key: require_env("GOOGLE_GENERATIVE_AI_API_KEY")?,
            vapi_api_key: require_env("VAPI_API_KEY")?,
            vapi_base_url: std::env::var("VAPI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_VAPI_BASE_URL.to_string()),
            vapi_workflow_id: require_env("VAPI_WORKFLOW_ID")?,
            vapi_webhook_secret: std::env::var("VAPI_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            project_url: require_env("PROJECT_URL")?
                .trim_end_matches('/')
                .to_string(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_sessions: std::env::var("MAX_SESSIONS")
                .unwrap_or_else(|_| DEFAULT_MAX_SESSIONS.to_string())
                .parse::<usize>()
                .context("MAX_SESSIONS must be a positive integer")?,
            session_timeout_secs: std::env::var("SESSION_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_SESSION_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .context("SESSION_TIMEOUT_SECS must be a number of seconds")?,
        })
    }

    /// Absolute URL of the question generation endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}/api/vapi/generate", self.project_url)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/interviews_test".to_string(),
            google_api_key: "test-key".to_string(),
            vapi_api_key: "test-vapi-key".to_string(),
            vapi_base_url: DEFAULT_VAPI_BASE_URL.to_string(),
            vapi_workflow_id: "wf-test".to_string(),
            vapi_webhook_secret: None,
            project_url: "http://localhost:8080".to_string(),
            port: 8080,
            rust_log: "debug".to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        }
    }
}
