//! In-process completion through the provider clients
//!
//! Claude is asked to rewrite the whole document and answer with a JSON
//! object; GPT replies conversationally under the section's guidance prompt.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CompletionError, CompletionReply, CompletionResult, CompletionService, SectionRequest};
use crate::config::{LlmConfig, ResolvedLlmConfig};
use crate::domain::SectionRegistry;
use crate::llm::{self, CompletionRequest, LlmClient, LlmError, Message, ModelKind};

/// Builds a provider client from resolved settings and a key
pub type ClientFactory =
    Arc<dyn Fn(&ResolvedLlmConfig, &str) -> Result<Arc<dyn LlmClient>, LlmError> + Send + Sync>;

const JSON_ONLY_SYSTEM_PROMPT: &str =
    "You are a JSON-only response AI. You must respond with valid JSON objects only, no other text.";

const EMPTY_DOCUMENT: &str = "The document is currently empty.";

const DOCUMENT_MAX_TOKENS: u32 = 4096;

const CHAT_TEMPERATURE: f32 = 0.7;

/// Talks to Anthropic or OpenAI with the key carried in each request
pub struct LlmCompletionService {
    config: LlmConfig,
    factory: ClientFactory,
}

impl LlmCompletionService {
    pub fn new(config: LlmConfig) -> Self {
        debug!("LlmCompletionService::new: called");
        let factory: ClientFactory =
            Arc::new(|resolved: &ResolvedLlmConfig, key: &str| llm::create_client(resolved, key));
        Self { config, factory }
    }

    /// Use a custom client factory, e.g. a mock client in tests
    pub fn with_factory(config: LlmConfig, factory: ClientFactory) -> Self {
        Self { config, factory }
    }

    async fn complete_document(
        &self,
        client: &dyn LlmClient,
        request: &SectionRequest,
    ) -> Result<CompletionResult, CompletionError> {
        debug!(section = %request.section, "complete_document: called");
        let response = client
            .complete(CompletionRequest {
                system_prompt: JSON_ONLY_SYSTEM_PROMPT.to_string(),
                messages: vec![Message::user(document_prompt(request))],
                max_tokens: DOCUMENT_MAX_TOKENS,
                temperature: None,
            })
            .await?;

        let text = response.content.ok_or(LlmError::EmptyResponse)?;
        let json = extract_json(&text);
        let authored: AuthoredDocument = serde_json::from_str(json).map_err(|e| {
            warn!(error = %e, "complete_document: reply is not the expected JSON object");
            CompletionError::Malformed(e.to_string())
        })?;

        CompletionReply::document(
            ModelKind::Claude.to_string(),
            authored.chat_response,
            authored.document,
            authored.section,
            authored.confidence,
        )
        .into_result()
    }

    async fn complete_message(
        &self,
        client: &dyn LlmClient,
        request: &SectionRequest,
        max_tokens: u32,
    ) -> Result<CompletionResult, CompletionError> {
        debug!(section = %request.section, "complete_message: called");
        let system_prompt = match &request.guidance_prompt {
            Some(guidance) if !guidance.trim().is_empty() => guidance.clone(),
            _ => {
                debug!("complete_message: no guidance, using the description prompt");
                SectionRegistry::default().first().guidance_prompt.clone()
            }
        };

        let response = client
            .complete(CompletionRequest {
                system_prompt,
                messages: vec![Message::user(request.prompt.clone())],
                max_tokens,
                temperature: Some(CHAT_TEMPERATURE),
            })
            .await?;

        let text = response.content.ok_or(LlmError::EmptyResponse)?;
        CompletionReply::message(ModelKind::Gpt.to_string(), text).into_result()
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn complete(&self, request: SectionRequest) -> Result<CompletionResult, CompletionError> {
        debug!(section = %request.section, model = %request.model, "complete: called");
        let provider = request.model.provider_id();
        let key = request
            .credentials
            .for_model(request.model)
            .ok_or_else(|| CompletionError::MissingCredential {
                provider: provider.to_string(),
            })?;

        let resolved = self.config.resolve(request.model);
        let client = (self.factory)(&resolved, key)?;

        if request.model.authors_document() {
            self.complete_document(client.as_ref(), &request).await
        } else {
            self.complete_message(client.as_ref(), &request, resolved.max_tokens).await
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// The JSON object Claude is asked to produce
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthoredDocument {
    section: String,
    document: String,
    chat_response: String,
    confidence: f64,
}

fn document_prompt(request: &SectionRequest) -> String {
    let current = request
        .current_document
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(EMPTY_DOCUMENT);
    let guidance = request
        .guidance_prompt
        .as_deref()
        .map(|g| format!("\nGuidance for the {} section:\n{}\n", request.section, g))
        .unwrap_or_default();

    format!(
        r####"You are helping a tech lead refine a task specification document.

CURRENT DOCUMENT STATE:
{current}

The tech lead wants to update the {section} section. Here is their request:
{prompt}
{guidance}
Respond with ONLY a JSON object, no text or markdown around it, with exactly these fields:
{{
    "section": "{section}",
    "document": "<the complete updated document in markdown format>",
    "chatResponse": "<a conversational explanation of what you changed and why>",
    "confidence": <number between 0 and 1>
}}

Rules for "document":
1. It is the ENTIRE document after applying the requested change.
2. Keep the current structure and content; change only what was requested.
3. Each section starts with "### Sectionname" on its own line.
4. Do not add or remove sections unless asked.

If the request belongs in a different section, set "section" to that section's id."####,
        current = current,
        section = request.section,
        prompt = request.prompt,
        guidance = guidance,
    )
}

/// Strip code fences and surrounding chatter down to the outermost JSON object
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
