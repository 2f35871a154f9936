//! Global configuration types for KB-Atlas.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! agent provider endpoint and builder defaults.

use serde::{Deserialize, Serialize};

use crate::builder::DEFAULT_MODEL;

/// Top-level configuration, loaded from `~/.kbatlas/config.toml`.
/// All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub builder: BuilderSettings,
}

/// Connection settings for the agent-execution provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of an OpenAI-compatible Assistants API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderSettings {
    /// Model preselected in new builder sessions.
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            default_model: default_model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.builder.default_model, "gpt-4o");
    }

    #[test]
    fn test_global_config_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.builder.default_model, "gpt-4o");
    }

    #[test]
    fn test_global_config_deserialize_partial_sections() {
        let toml_str = r#"
[provider]
base_url = "http://localhost:8080/v1"

[builder]
default_model = "gpt-4o-mini"
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.builder.default_model, "gpt-4o-mini");
    }
}
