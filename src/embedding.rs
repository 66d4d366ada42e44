//! Embedding provider implementations.
//!
//! Concrete backends for [`wardrobe_core::embedding::EmbeddingProvider`]:
//! - **[`DisabledProvider`]**: returns errors; used when embeddings are not configured.
//! - **[`VertexProvider`]**: Vertex AI `multimodalembedding` for images and
//!   `text-embedding-004` for text, with retry and backoff.
//! - **`LocalProvider`**: CLIP image and text models run locally via fastembed
//!   (feature `local-embeddings-fastembed`).
//!
//! Use [`create_provider`] to pick one from configuration.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::time::Duration;

use wardrobe_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::retry::send_json_with_retry;

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider {
    visual_dims: usize,
    semantic_dims: usize,
}

impl DisabledProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            visual_dims: config.visual_dims,
            semantic_dims: config.semantic_dims,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn visual_dims(&self) -> usize {
        self.visual_dims
    }
    fn semantic_dims(&self) -> usize {
        self.semantic_dims
    }
    async fn embed_image(&self, _image: &[u8], _context_text: Option<&str>) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ Vertex AI Provider ============

/// Embedding provider using Vertex AI prediction endpoints.
///
/// Requires `VERTEX_ACCESS_TOKEN` and `VERTEX_PROJECT` in the environment;
/// `VERTEX_LOCATION` defaults to `us-central1`.
pub struct VertexProvider {
    client: reqwest::Client,
    base_url: String,
    project: String,
    location: String,
    token: String,
    model: String,
    text_model: String,
    visual_dims: usize,
    semantic_dims: usize,
    max_retries: u32,
}

impl VertexProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let token = std::env::var("VERTEX_ACCESS_TOKEN")
            .map_err(|_| anyhow!("VERTEX_ACCESS_TOKEN environment variable not set"))?;
        let project = std::env::var("VERTEX_PROJECT")
            .map_err(|_| anyhow!("VERTEX_PROJECT environment variable not set"))?;
        let location =
            std::env::var("VERTEX_LOCATION").unwrap_or_else(|_| "us-central1".to_string());
        let base_url = config
            .url
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", location));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project,
            location,
            token,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "multimodalembedding@001".to_string()),
            text_model: config
                .text_model
                .clone()
                .unwrap_or_else(|| "text-embedding-004".to_string()),
            visual_dims: config.visual_dims,
            semantic_dims: config.semantic_dims,
            max_retries: config.max_retries,
        })
    }

    fn predict_url(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.base_url, self.project, self.location, model
        )
    }

    async fn predict(&self, model: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = self.predict_url(model);
        send_json_with_retry("Vertex AI", self.max_retries, || {
            self.client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&body)
        })
        .await
    }
}

#[async_trait]
impl EmbeddingProvider for VertexProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn visual_dims(&self) -> usize {
        self.visual_dims
    }
    fn semantic_dims(&self) -> usize {
        self.semantic_dims
    }

    async fn embed_image(&self, image: &[u8], context_text: Option<&str>) -> Result<Vec<f32>> {
        let mut instance = serde_json::json!({
            "image": { "bytesBase64Encoded": BASE64.encode(image) },
        });
        if let Some(text) = context_text.filter(|t| !t.trim().is_empty()) {
            instance["text"] = serde_json::Value::String(text.to_string());
        }
        let body = serde_json::json!({
            "instances": [instance],
            "parameters": { "dimension": self.visual_dims },
        });
        let json = self.predict(&self.model, body).await?;
        parse_image_embedding(&json)
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "instances": [{ "content": text }],
        });
        let json = self.predict(&self.text_model, body).await?;
        parse_text_embedding(&json)
    }
}

fn to_f32_vec(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

/// Extract `predictions[0].imageEmbedding` from a multimodal response.
fn parse_image_embedding(json: &serde_json::Value) -> Result<Vec<f32>> {
    let values = json
        .pointer("/predictions/0/imageEmbedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Vertex response: missing imageEmbedding"))?;
    Ok(to_f32_vec(values))
}

/// Extract `predictions[0].embeddings.values` from a text-embedding response.
fn parse_text_embedding(json: &serde_json::Value) -> Result<Vec<f32>> {
    let values = json
        .pointer("/predictions/0/embeddings/values")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Vertex response: missing embeddings.values"))?;
    Ok(to_f32_vec(values))
}

// ============ Local Provider (fastembed) ============

/// CLIP ViT-B/32 image and text encoders run locally.
///
/// Both towers share one embedding space, so text queries rank images
/// meaningfully. Models download on first use and are cached.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalProvider {
    visual_dims: usize,
    semantic_dims: usize,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            visual_dims: config.visual_dims,
            semantic_dims: config.semantic_dims,
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        "clip-vit-b-32"
    }
    fn visual_dims(&self) -> usize {
        self.visual_dims
    }
    fn semantic_dims(&self) -> usize {
        self.semantic_dims
    }

    async fn embed_image(&self, image: &[u8], _context_text: Option<&str>) -> Result<Vec<f32>> {
        let bytes = image.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut model = fastembed::ImageEmbedding::try_new(fastembed::ImageInitOptions::new(
                fastembed::ImageEmbeddingModel::ClipVitB32,
            ))
            .map_err(|e| anyhow!("Failed to initialize local image model: {}", e))?;
            let mut out = model
                .embed_bytes(&[bytes.as_slice()], None)
                .map_err(|e| anyhow!("Local image embedding failed: {}", e))?;
            out.pop().ok_or_else(|| anyhow!("Empty embedding response"))
        })
        .await?
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        tokio::task::spawn_blocking(move || {
            let mut model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed::EmbeddingModel::ClipVitB32)
                    .with_show_download_progress(false),
            )
            .map_err(|e| anyhow!("Failed to initialize local text model: {}", e))?;
            let mut out = model
                .embed(texts, None)
                .map_err(|e| anyhow!("Local text embedding failed: {}", e))?;
            out.pop().ok_or_else(|| anyhow!("Empty embedding response"))
        })
        .await?
    }
}

/// Create the appropriate embedding provider based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"vertex"` | [`VertexProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings-fastembed`) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider::new(config))),
        "vertex" => Ok(Box::new(VertexProvider::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-fastembed"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
