//! specdraft configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::document::CompileMode;
use crate::domain::SectionRegistry;
use crate::llm::ModelKind;

/// Main specdraft configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when `--log-level` is not given
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// External completion server
    pub service: ServiceConfig,

    /// How the document is recomputed locally
    pub document: DocumentConfig,

    /// Initial section registry
    pub sections: SectionRegistry,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::implicit_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {:#}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Any failure yields None; the full load reports problems later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        #[derive(Deserialize)]
        struct LogLevelOnly {
            #[serde(rename = "log-level")]
            log_level: Option<String>,
        }

        let paths: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::implicit_paths(),
        };

        paths.into_iter().filter(|p| p.exists()).find_map(|p| {
            let content = fs::read_to_string(&p).ok()?;
            serde_yaml::from_str::<LogLevelOnly>(&content).ok()?.log_level
        })
    }

    /// Project-local then user config locations
    fn implicit_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".specdraft.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("specdraft").join("specdraft.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Compile mode for recomputing the document with the given model
    pub fn compile_mode(&self, model: ModelKind) -> CompileMode {
        debug!(%model, mode = ?self.document.mode, "compile_mode: called");
        match self.document.mode {
            DocumentMode::Auto => model.default_compile_mode(),
            DocumentMode::UserMessages => CompileMode::UserMessages,
            DocumentMode::LatestAssistant => CompileMode::LatestAssistant,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model used when none is given on the command line
    pub default: ModelKind,

    /// Anthropic settings (claude)
    pub anthropic: ProviderConfig,

    /// OpenAI settings (gpt)
    pub openai: ProviderConfig,
}

impl LlmConfig {
    /// Provider settings for a model
    pub fn provider(&self, model: ModelKind) -> &ProviderConfig {
        match model {
            ModelKind::Claude => &self.anthropic,
            ModelKind::Gpt => &self.openai,
        }
    }

    /// Fill in provider defaults for a model
    pub fn resolve(&self, model: ModelKind) -> ResolvedLlmConfig {
        debug!(%model, "LlmConfig::resolve: called");
        let provider = self.provider(model);
        let (default_model, default_url, default_env, default_max_tokens) = match model {
            ModelKind::Claude => (
                "claude-sonnet-4-20250514",
                "https://api.anthropic.com",
                "ANTHROPIC_API_KEY",
                16384,
            ),
            ModelKind::Gpt => ("gpt-4", "https://api.openai.com", "OPENAI_API_KEY", 8192),
        };

        ResolvedLlmConfig {
            kind: model,
            model: provider.model.clone().unwrap_or_else(|| default_model.to_string()),
            base_url: provider.base_url.clone().unwrap_or_else(|| default_url.to_string()),
            api_key_env: provider.api_key_env.clone().unwrap_or_else(|| default_env.to_string()),
            api_key_file: provider.api_key_file.clone(),
            max_tokens: provider.max_tokens.unwrap_or(default_max_tokens),
            timeout_ms: provider.timeout_ms.unwrap_or(300_000),
        }
    }
}

/// Per-provider overrides; unset fields take the provider's defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// API base URL
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// File containing the API key, used when the variable is unset
    #[serde(rename = "api-key-file", skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Provider settings with every default applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLlmConfig {
    pub kind: ModelKind,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub api_key_file: Option<PathBuf>,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

/// External completion server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of a completion server; unset means talk to providers directly
    #[serde(rename = "remote-url", skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            timeout_ms: 120_000,
        }
    }
}

/// Document recompute configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub mode: DocumentMode,
}

/// Which compile variant is used when the document is recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentMode {
    /// Follow the model: latest assistant turn for claude, user messages for gpt
    #[default]
    Auto,
    UserMessages,
    LatestAssistant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.default, ModelKind::Claude);
        assert!(config.service.remote_url.is_none());
        assert_eq!(config.document.mode, DocumentMode::Auto);
        assert_eq!(config.sections.len(), 4);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_resolve_defaults_per_provider() {
        let config = LlmConfig::default();

        let claude = config.resolve(ModelKind::Claude);
        assert!(claude.model.contains("sonnet"));
        assert_eq!(claude.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(claude.base_url, "https://api.anthropic.com");

        let gpt = config.resolve(ModelKind::Gpt);
        assert_eq!(gpt.model, "gpt-4");
        assert_eq!(gpt.api_key_env, "OPENAI_API_KEY");
        assert_eq!(gpt.base_url, "https://api.openai.com");
        assert!(gpt.api_key_file.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

llm:
  default: gpt
  anthropic:
    model: claude-opus-4
    api-key-env: MY_API_KEY
    max-tokens: 8192
  openai:
    base-url: https://proxy.example.com
    api-key-file: ~/.config/openai/key
    timeout-ms: 60000

service:
  remote-url: http://localhost:3001

document:
  mode: user-messages

sections:
  - id: goals
    label: Goals
  - id: risks
    label: Risks
    placeholder: What could go wrong?
    guidance-prompt: Focus on failure modes.
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.llm.default, ModelKind::Gpt);

        let claude = config.llm.resolve(ModelKind::Claude);
        assert_eq!(claude.model, "claude-opus-4");
        assert_eq!(claude.api_key_env, "MY_API_KEY");
        assert_eq!(claude.max_tokens, 8192);

        let gpt = config.llm.resolve(ModelKind::Gpt);
        assert_eq!(gpt.base_url, "https://proxy.example.com");
        assert_eq!(gpt.api_key_file, Some(PathBuf::from("~/.config/openai/key")));
        assert_eq!(gpt.timeout_ms, 60000);

        assert_eq!(config.service.remote_url.as_deref(), Some("http://localhost:3001"));
        assert_eq!(config.service.timeout_ms, 120_000);
        assert_eq!(config.document.mode, DocumentMode::UserMessages);

        let ids: Vec<&str> = config.sections.ids().collect();
        assert_eq!(ids, vec!["goals", "risks"]);
        assert_eq!(config.sections.get("risks").unwrap().guidance_prompt, "Focus on failure modes.");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  anthropic:
    model: claude-haiku
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.llm.resolve(ModelKind::Claude).model, "claude-haiku");

        // Defaults for unspecified
        assert_eq!(config.llm.default, ModelKind::Claude);
        assert_eq!(config.llm.resolve(ModelKind::Claude).api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.sections.first().id(), "description");
    }

    #[test]
    fn test_invalid_sections_rejected() {
        assert!(serde_yaml::from_str::<Config>("sections: []").is_err());

        let duplicate = r#"
sections:
  - id: goals
    label: Goals
  - id: goals
    label: Goals again
"#;
        assert!(serde_yaml::from_str::<Config>(duplicate).is_err());

        assert!(serde_yaml::from_str::<Config>("sections:\n  - id: Tab-5\n    label: x\n").is_err());
    }

    #[test]
    fn test_compile_mode() {
        let mut config = Config::default();
        assert_eq!(config.compile_mode(ModelKind::Claude), CompileMode::LatestAssistant);
        assert_eq!(config.compile_mode(ModelKind::Gpt), CompileMode::UserMessages);

        config.document.mode = DocumentMode::LatestAssistant;
        assert_eq!(config.compile_mode(ModelKind::Gpt), CompileMode::LatestAssistant);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log-level: trace\nllm:\n  default: gpt").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.llm.default, ModelKind::Gpt);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("trace"));
    }

    #[test]
    fn test_load_explicit_path_errors_propagate() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "llm: [not, a, map]").unwrap();
        let path = file.path().to_path_buf();

        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());

        let missing = PathBuf::from("/nonexistent/specdraft.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
