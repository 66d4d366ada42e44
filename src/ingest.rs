//! Garment ingestion.
//!
//! photo + tactile readings → reasoning analysis → semantic text →
//! visual + semantic embeddings → store. Items are written once and never
//! updated.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use thiserror::Error;

use wardrobe_core::embedding::EmbeddingProvider;
use wardrobe_core::extract;
use wardrobe_core::models::{GarmentAnalysis, NewWardrobeItem, Tactile};
use wardrobe_core::prompt::garment_analysis_prompt;
use wardrobe_core::reasoning::{GenerationOptions, ReasoningProvider, ReasoningRequest};
use wardrobe_core::store::Store;

const ANALYSIS_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("garment analysis failed: {0}")]
    Analysis(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("storage failed: {0}")]
    Storage(String),
}

/// Response returned after a garment is stored.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub status: &'static str,
    pub id: i64,
    pub analysis: GarmentAnalysis,
}

/// Analyse, embed and persist one garment photo.
pub async fn ingest_garment(
    store: &dyn Store,
    embedder: &dyn EmbeddingProvider,
    reasoner: &dyn ReasoningProvider,
    image: &[u8],
    tactile: Tactile,
) -> Result<IngestReceipt, IngestError> {
    if image.is_empty() {
        return Err(IngestError::InvalidInput("image is empty".to_string()));
    }
    tactile
        .validate()
        .map_err(|e| IngestError::InvalidInput(e.to_string()))?;

    let request = ReasoningRequest::with_image(image, garment_analysis_prompt(&tactile));
    let raw = reasoner
        .generate(&request, &GenerationOptions::json(ANALYSIS_TEMPERATURE))
        .await
        .map_err(|e| IngestError::Analysis(format!("{:#}", e)))?;
    let analysis: GarmentAnalysis =
        extract::parse_object(&raw).map_err(|e| IngestError::Analysis(e.to_string()))?;

    let semantic_text = analysis.semantic_text();
    let embedding = embedder
        .embed_garment(image, Some(&semantic_text))
        .await
        .map_err(|e| IngestError::Embedding(format!("{:#}", e)))?;

    if embedding.visual.len() != embedder.visual_dims()
        || embedding.semantic.len() != embedder.semantic_dims()
    {
        return Err(IngestError::Embedding(format!(
            "expected {}/{} dims, got {}/{}",
            embedder.visual_dims(),
            embedder.semantic_dims(),
            embedding.visual.len(),
            embedding.semantic.len()
        )));
    }

    let item = NewWardrobeItem {
        image_base64: BASE64.encode(image),
        tactile,
        attributes: analysis.attributes(),
        visual_embedding: embedding.visual,
        semantic_embedding: embedding.semantic,
    };
    let id = store
        .insert_item(&item)
        .await
        .map_err(|e| IngestError::Storage(format!("{:#}", e)))?;

    tracing::info!(
        id,
        category = %analysis.category,
        material = %analysis.material_inference,
        "ingested garment"
    );

    Ok(IngestReceipt {
        status: "success",
        id,
        analysis,
    })
}
