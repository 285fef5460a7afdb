//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! This agent calls the Google Generative Language REST API directly.
//! Configuration comes from environment variables (GEMINI_API_KEY,
//! GEMINI_MODEL_NAME).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;

use contextguard_core::completion::CompletionEngine;
use contextguard_core::error::{ContextGuardError, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4000;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Shown when the model answers with an empty candidate list or blank text.
const EMPTY_RESPONSE_FALLBACK: &str =
    "I understand your question. Let me think about that and provide you with a helpful response.";

/// Prompt used by the connectivity health check.
const HEALTH_CHECK_PROMPT: &str = "Hello, respond with just one word: OK";

/// Completion engine implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiApiAgent {
    /// Creates a new agent with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; `GEMINI_MODEL_NAME` defaults to
    /// `gemini-2.5-flash` if not specified.
    pub fn try_from_env() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            ContextGuardError::completion("GEMINI_API_KEY not found in environment variables")
        })?;

        let model = env::var("GEMINI_MODEL_NAME").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into());
        Ok(Self::new(api_key, model))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sends a one-shot probe prompt to verify the API is reachable.
    pub async fn health_check(&self) -> Result<String> {
        self.complete(HEALTH_CHECK_PROMPT).await
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", BASE_URL, self.model)
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                ContextGuardError::completion_retryable(
                    format!("Gemini API request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            ContextGuardError::completion(format!("Failed to parse Gemini response: {err}"))
        })?;

        Ok(extract_text_response(parsed))
    }
}

#[async_trait]
impl CompletionEngine for GeminiApiAgent {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");
        self.send_request(&request).await
    }
}

fn map_http_error(status: StatusCode, body: String) -> ContextGuardError {
    let is_retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
    ContextGuardError::completion_retryable(
        format!("Gemini API returned {status}: {body}"),
        is_retryable,
    )
}

/// Pulls the answer text out of a response, falling back to a fixed reply
/// when the model returned nothing usable.
fn extract_text_response(response: GenerateContentResponse) -> String {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        EMPTY_RESPONSE_FALLBACK.to_string()
    } else {
        text
    }
}

// ============================================================================
// Request/response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
