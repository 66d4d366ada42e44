//! Reasoning (generative model) provider trait.
//!
//! The reasoning service takes a prompt, optionally with one image, and
//! returns free-form text. Callers must treat that text as untrusted: it is
//! often meant to be JSON but may arrive fenced, prefixed with prose, or
//! truncated. See [`crate::extract`] for how it is parsed.

use anyhow::Result;
use async_trait::async_trait;

/// Requested shape of the model's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text; the prompt itself asks for JSON.
    #[default]
    Text,
    /// Ask the backend to constrain output to JSON where supported.
    Json,
}

/// Sampling options for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

impl GenerationOptions {
    pub fn text(temperature: f32) -> Self {
        Self {
            temperature,
            response_format: ResponseFormat::Text,
        }
    }

    pub fn json(temperature: f32) -> Self {
        Self {
            temperature,
            response_format: ResponseFormat::Json,
        }
    }
}

/// An inline image attached to a prompt.
#[derive(Debug, Clone, Copy)]
pub struct ImagePart<'a> {
    pub data: &'a [u8],
    pub mime_type: &'static str,
}

impl<'a> ImagePart<'a> {
    /// Wrap raw bytes, detecting the MIME type from the file signature.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            mime_type: sniff_image_mime(data),
        }
    }
}

/// Prompt parts for one generation call: the image (if any) precedes the text.
#[derive(Debug, Clone)]
pub struct ReasoningRequest<'a> {
    pub image: Option<ImagePart<'a>>,
    pub prompt: String,
}

impl<'a> ReasoningRequest<'a> {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            image: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_image(image: &'a [u8], prompt: impl Into<String>) -> Self {
        Self {
            image: Some(ImagePart::new(image)),
            prompt: prompt.into(),
        }
    }
}

/// Trait for generative reasoning backends.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    /// Generate text for the given prompt parts.
    ///
    /// Transport and API failures are returned as errors; malformed content
    /// is returned as-is for the caller to validate.
    async fn generate(
        &self,
        request: &ReasoningRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<String>;
}

/// Detect an image MIME type from magic bytes. Defaults to JPEG.
pub fn sniff_image_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
