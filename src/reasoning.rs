//! Reasoning provider implementations.
//!
//! Concrete backends for [`wardrobe_core::reasoning::ReasoningProvider`]:
//! - **[`DisabledReasoner`]**: returns errors; used when no model is configured.
//! - **[`GeminiProvider`]**: Gemini `generateContent` with inline image data.
//!   Requires `GEMINI_API_KEY`.
//! - **[`OllamaReasoner`]**: a local Ollama instance's `/api/generate`
//!   endpoint with a vision-capable model.
//!
//! Both HTTP backends use the shared retry loop in [`crate::retry`]. The
//! client timeout (`reasoning.timeout_secs`) bounds each attempt.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use std::time::Duration;

use wardrobe_core::reasoning::{
    GenerationOptions, ReasoningProvider, ReasoningRequest, ResponseFormat,
};

use crate::config::ReasoningConfig;
use crate::retry::send_json_with_retry;

// ============ Disabled ============

pub struct DisabledReasoner;

#[async_trait]
impl ReasoningProvider for DisabledReasoner {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(
        &self,
        _request: &ReasoningRequest<'_>,
        _options: &GenerationOptions,
    ) -> Result<String> {
        bail!("Reasoning provider is disabled")
    }
}

// ============ Gemini ============

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl GeminiProvider {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            max_retries: config.max_retries,
        })
    }
}

/// Build a `generateContent` request body. The image part precedes the text.
fn gemini_body(request: &ReasoningRequest<'_>, options: &GenerationOptions) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = &request.image {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime_type,
                "data": BASE64.encode(image.data),
            }
        }));
    }
    parts.push(json!({ "text": request.prompt }));

    let mut generation_config = json!({ "temperature": options.temperature });
    if options.response_format == ResponseFormat::Json {
        generation_config["responseMimeType"] = json!("application/json");
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidates[0].content.parts"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    Ok(text)
}

#[async_trait]
impl ReasoningProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &ReasoningRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = gemini_body(request, options);
        tracing::debug!(
            model = %self.model,
            temperature = options.temperature,
            with_image = request.image.is_some(),
            "calling gemini"
        );

        let json = send_json_with_retry("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;
        parse_gemini_response(&json)
    }
}

// ============ Ollama ============

pub struct OllamaReasoner {
    client: reqwest::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaReasoner {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("reasoning.model required for Ollama provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            max_retries: config.max_retries,
        })
    }
}

fn ollama_body(model: &str, request: &ReasoningRequest<'_>, options: &GenerationOptions) -> Value {
    let mut body = json!({
        "model": model,
        "prompt": request.prompt,
        "stream": false,
        "options": { "temperature": options.temperature },
    });
    if let Some(image) = &request.image {
        body["images"] = json!([BASE64.encode(image.data)]);
    }
    if options.response_format == ResponseFormat::Json {
        body["format"] = json!("json");
    }
    body
}

#[async_trait]
impl ReasoningProvider for OllamaReasoner {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &ReasoningRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.url);
        let body = ollama_body(&self.model, request, options);

        let json = send_json_with_retry("Ollama", self.max_retries, || {
            self.client.post(&url).json(&body)
        })
        .await
        .map_err(|e| anyhow!("{} (is Ollama running at {}?)", e, self.url))?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
    }
}

/// Create the appropriate reasoning provider based on configuration.
pub fn create_provider(config: &ReasoningConfig) -> Result<Box<dyn ReasoningProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledReasoner)),
        "gemini" => Ok(Box::new(GeminiProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaReasoner::new(config)?)),
        other => bail!("Unknown reasoning provider: {}", other),
    }
}
