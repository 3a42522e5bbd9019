// Server configuration. The chat behavior itself is fixed: one model, one
// system prompt, no per-request knobs.

use serde::{Deserialize, Serialize};

use crate::log_warn;

/// Fixed system instruction prefixed to every forwarded conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const CONFIG_PATH: &str = "assets/config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,
    /// Name of the environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_port() -> u16 {
    8000
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_provider_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_GENERATIVE_AI_API_KEY".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            model: default_model(),
            provider_base_url: default_provider_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ServerConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Load configuration from `assets/config.json`, falling back to defaults.
pub fn load_config() -> ServerConfig {
    match std::fs::read_to_string(CONFIG_PATH) {
        Ok(content) => match serde_json::from_str::<ServerConfig>(&content) {
            Ok(config) => config,
            Err(e) => {
                log_warn!("[CONFIG] Invalid {}: {}, using defaults", CONFIG_PATH, e);
                ServerConfig::default()
            }
        },
        Err(_) => ServerConfig::default(),
    }
}
