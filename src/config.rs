//! Service configuration.
//!
//! All configuration comes from the environment and is read exactly once at
//! startup; the resulting structs are passed explicitly to the components
//! that need them so tests can substitute their own values.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen port for the HTTP server
const DEFAULT_PORT: u16 = 3100;

/// OpenRouter chat completions endpoint (primary backend)
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used on the OpenRouter backend
pub const OPENROUTER_MODEL: &str = "mistralai/mistral-7b-instruct:free";

/// OpenAI chat completions endpoint (secondary backend)
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Model used on the OpenAI backend
pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// LLM credentials as provided by the environment.
///
/// Either, both, or neither key may be present. Resolution order is fixed:
/// OpenRouter wins when both are configured, and with neither configured the
/// pipeline never calls out at all and serves the deterministic fallback.
#[derive(Debug, Clone, Default)]
pub struct LlmCredentials {
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

/// A resolved backend: endpoint, model, and the credential to send.
#[derive(Debug, Clone)]
pub struct LlmBackend {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

impl LlmCredentials {
    /// Read both optional keys from the environment. Blank values are
    /// treated as unset.
    pub fn from_env() -> Self {
        Self {
            openrouter_api_key: non_empty_env("OPENROUTER_API_KEY"),
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
        }
    }

    /// Resolve the backend to use, or `None` when no credential is
    /// configured.
    pub fn backend(&self) -> Option<LlmBackend> {
        if let Some(key) = &self.openrouter_api_key {
            return Some(LlmBackend {
                endpoint: OPENROUTER_ENDPOINT.to_string(),
                model: OPENROUTER_MODEL.to_string(),
                api_key: key.clone(),
            });
        }
        if let Some(key) = &self.openai_api_key {
            return Some(LlmBackend {
                endpoint: OPENAI_ENDPOINT.to_string(),
                model: OPENAI_MODEL.to_string(),
                api_key: key.clone(),
            });
        }
        None
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub llm: LlmCredentials,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_dir = std::env::var("CONSULT_DATA_DIR")
            .map(PathBuf::from)
            .ok()
            .unwrap_or_else(default_data_dir);

        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            data_dir,
            llm: LlmCredentials::from_env(),
        }
    }
}

/// Default session store location: `~/.consult-service/sessions`
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".consult-service")
        .join("sessions")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
