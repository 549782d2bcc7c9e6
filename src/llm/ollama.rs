//! Ollama backends for local inference
//!
//! [`OllamaChat`] speaks the chat convention through `/api/chat`;
//! [`OllamaGenerate`] speaks the completion convention through `/api/generate`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::prompt::{PromptMessage, Role};
use crate::llm::{ChatCapable, CompletionCapable, LLMError, LanguageModel};

/// Configuration shared by both Ollama backends
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama server URL (default: http://localhost:11434)
    pub host: String,
    /// Default model to use (default: phi4)
    pub default_model: String,
    /// Ask the server to constrain output to JSON (default: true)
    pub json_mode: bool,
    pub options: Option<OllamaOptions>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            default_model: "phi4".to_string(),
            json_mode: true,
            options: None,
        }
    }
}

/// Options for Ollama generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// A message in Ollama's chat format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

impl From<&PromptMessage> for OllamaMessage {
    fn from(message: &PromptMessage) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::Human => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

/// Request structure for Ollama chat completions
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Response from Ollama's chat endpoint
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub message: OllamaMessage,
    pub done: bool,
    #[serde(default)]
    pub done_reason: String,
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub eval_count: u32,
}

/// Request structure for Ollama's generate endpoint
#[derive(Debug, Serialize)]
pub struct OllamaGenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Response from Ollama's generate endpoint
#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub response: String,
    pub done: bool,
    #[serde(default)]
    pub done_reason: String,
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub eval_count: u32,
}

fn format_for(config: &OllamaConfig) -> Option<String> {
    config.json_mode.then(|| "json".to_string())
}

/// A non-streaming request must come back with `done` set.
fn ensure_done(model: &str, done: bool, done_reason: &str) -> Result<(), LLMError> {
    if done {
        return Ok(());
    }
    Err(LLMError::InvalidResponse(format!(
        "generation for `{}` did not finish ({})",
        model, done_reason
    )))
}

fn post<Req: Serialize, Res: for<'de> Deserialize<'de>>(
    client: &reqwest::blocking::Client,
    url: String,
    request: &Req,
) -> Result<Res, LLMError> {
    let response = client.post(url).json(request).send()?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().unwrap_or_default();
        return Err(LLMError::OllamaError(format!(
            "HTTP {}: {}",
            status, error_text
        )));
    }

    Ok(response.json()?)
}

/// Chat-convention backend over `/api/chat`
#[derive(Clone, Debug, Default)]
pub struct OllamaChat {
    client: reqwest::blocking::Client,
    config: OllamaConfig,
}

impl OllamaChat {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    pub(crate) fn request(&self, messages: &[PromptMessage]) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.default_model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: self.config.options.clone(),
            format: format_for(&self.config),
        }
    }
}

impl ChatCapable for OllamaChat {
    fn chat(&self, messages: &[PromptMessage]) -> Result<String, LLMError> {
        let url = format!("{}/api/chat", self.config.host);
        let response: OllamaChatResponse = post(&self.client, url, &self.request(messages))?;
        ensure_done(&response.model, response.done, &response.done_reason)?;
        log::debug!(
            "ollama chat `{}` finished (eval_count: {})",
            response.model,
            response.eval_count
        );
        Ok(response.message.content)
    }
}

impl LanguageModel for OllamaChat {
    fn name(&self) -> &str {
        &self.config.default_model
    }

    fn into_chat(self: Arc<Self>) -> Option<Arc<dyn ChatCapable>> {
        Some(self)
    }
}

/// Completion-convention backend over `/api/generate`
#[derive(Clone, Debug, Default)]
pub struct OllamaGenerate {
    client: reqwest::blocking::Client,
    config: OllamaConfig,
}

impl OllamaGenerate {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    pub(crate) fn request(&self, prompt: &str) -> OllamaGenerateRequest {
        OllamaGenerateRequest {
            model: self.config.default_model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: self.config.options.clone(),
            format: format_for(&self.config),
        }
    }
}

impl CompletionCapable for OllamaGenerate {
    fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        let url = format!("{}/api/generate", self.config.host);
        let response: OllamaResponse = post(&self.client, url, &self.request(prompt))?;
        ensure_done(&response.model, response.done, &response.done_reason)?;
        Ok(response.response)
    }
}

impl LanguageModel for OllamaGenerate {
    fn name(&self) -> &str {
        &self.config.default_model
    }

    fn into_completion(self: Arc<Self>) -> Option<Arc<dyn CompletionCapable>> {
        Some(self)
    }
}
