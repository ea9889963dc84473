//! Credential lookup
//!
//! Provider keys are read through a small read-only trait so the orchestrator
//! never cares where they live. Blank values always count as absent.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::llm::ModelKind;

/// Read-only key/value source of provider keys
pub trait CredentialProvider: Send + Sync {
    /// Key for a provider id (`anthropic`, `openai`), if one is configured
    fn get_credential(&self, provider_id: &str) -> Option<String>;
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Where one provider's key can be found
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeySource {
    env: String,
    file: Option<PathBuf>,
}

/// Keys from environment variables, falling back to key files
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    sources: HashMap<String, KeySource>,
}

impl EnvCredentials {
    /// Build lookups from each provider's `api-key-env` and `api-key-file`
    pub fn from_config(config: &LlmConfig) -> Self {
        debug!("EnvCredentials::from_config: called");
        let sources = [ModelKind::Claude, ModelKind::Gpt]
            .into_iter()
            .map(|model| {
                let resolved = config.resolve(model);
                (
                    model.provider_id().to_string(),
                    KeySource {
                        env: resolved.api_key_env,
                        file: resolved.api_key_file.as_deref().map(expand_home),
                    },
                )
            })
            .collect();
        Self { sources }
    }
}

impl CredentialProvider for EnvCredentials {
    fn get_credential(&self, provider_id: &str) -> Option<String> {
        debug!(%provider_id, "EnvCredentials::get_credential: called");
        let source = self.sources.get(provider_id)?;

        if let Some(key) = std::env::var(&source.env).ok().and_then(non_blank) {
            debug!(%provider_id, env = %source.env, "get_credential: found in environment");
            return Some(key);
        }

        let file = source.file.as_ref()?;
        match fs::read_to_string(file) {
            Ok(content) => {
                debug!(%provider_id, file = %file.display(), "get_credential: read key file");
                non_blank(content)
            }
            Err(e) => {
                debug!(%provider_id, file = %file.display(), error = %e, "get_credential: key file unreadable");
                None
            }
        }
    }
}

/// Fixed in-memory keys
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider_id: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(provider_id.into(), key.into());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn get_credential(&self, provider_id: &str) -> Option<String> {
        self.keys.get(provider_id).cloned().and_then(non_blank)
    }
}

/// Resolved keys carried in an outbound completion request
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

impl Credentials {
    /// Gather every known provider's key from a source
    pub fn resolve(provider: &dyn CredentialProvider) -> Self {
        debug!("Credentials::resolve: called");
        Self {
            anthropic: provider.get_credential("anthropic"),
            openai: provider.get_credential("openai"),
        }
    }

    /// Key required by a model, if present
    pub fn for_model(&self, model: ModelKind) -> Option<&str> {
        match model {
            ModelKind::Claude => self.anthropic.as_deref(),
            ModelKind::Gpt => self.openai.as_deref(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("anthropic", &redact(&self.anthropic))
            .field("openai", &redact(&self.openai))
            .finish()
    }
}
