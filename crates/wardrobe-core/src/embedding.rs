//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus pure helper functions for vector serialization and
//! distance computation.
//!
//! Concrete providers (Vertex AI, fastembed) live in the `wardrobe-agent`
//! app crate.
//!
//! # Storage format
//!
//! Vectors are persisted as BLOBs of little-endian `f32` values, `len × 4`
//! bytes, with no header. [`vec_to_blob`] and [`blob_to_vec`] are the only
//! encode/decode boundary.

use anyhow::Result;
use async_trait::async_trait;

/// The two vectors computed for a garment at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct GarmentEmbedding {
    /// Visual vector (dimension D_v).
    pub visual: Vec<f32>,
    /// Semantic vector (dimension D_s).
    pub semantic: Vec<f32>,
}

/// Trait for embedding providers.
///
/// A provider turns an image (with optional contextual text) into a visual
/// vector and turns text into a semantic vector. Implementations are created
/// once at startup and shared by reference.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"multimodalembedding@001"`).
    fn model_name(&self) -> &str;

    /// Dimensionality of visual vectors (D_v).
    fn visual_dims(&self) -> usize;

    /// Dimensionality of semantic vectors (D_s).
    fn semantic_dims(&self) -> usize;

    /// Embed an image, optionally conditioned on descriptive text.
    async fn embed_image(&self, image: &[u8], context_text: Option<&str>) -> Result<Vec<f32>>;

    /// Embed a text into the semantic space.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Compute both vectors for a garment.
    ///
    /// The semantic vector is all zeros when no description text is given.
    async fn embed_garment(&self, image: &[u8], text: Option<&str>) -> Result<GarmentEmbedding> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        let visual = self.embed_image(image, text).await?;
        let semantic = match text {
            Some(t) => self.embed_text(t).await?,
            None => vec![0.0; self.semantic_dims()],
        };
        Ok(GarmentEmbedding { visual, semantic })
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use wardrobe_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Trailing bytes that do not form a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, and zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance (`1 - similarity`), in `[0.0, 2.0]`. Smaller is nearer.
///
/// This is the metric used for nearest-neighbor candidate retrieval.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn visual_dims(&self) -> usize {
            2
        }
        fn semantic_dims(&self) -> usize {
            3
        }
        async fn embed_image(&self, _image: &[u8], _text: Option<&str>) -> Result<Vec<f32>> {
            Ok(vec![1.0, 1.0])
        }
        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5, 0.5, 0.5])
        }
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_blob_ignores_partial_tail() {
        let mut blob = vec_to_blob(&[2.0]);
        blob.push(0xff);
        assert_eq!(blob_to_vec(&blob), vec![2.0]);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_embed_garment_without_text_is_zero_semantic() {
        let e = FixedEmbedder.embed_garment(b"img", None).await.unwrap();
        assert_eq!(e.visual, vec![1.0, 1.0]);
        assert_eq!(e.semantic, vec![0.0, 0.0, 0.0]);

        let blank = FixedEmbedder.embed_garment(b"img", Some("   ")).await.unwrap();
        assert_eq!(blank.semantic, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_embed_garment_with_text() {
        let e = FixedEmbedder
            .embed_garment(b"img", Some("linen summer"))
            .await
            .unwrap();
        assert_eq!(e.semantic, vec![0.5, 0.5, 0.5]);
    }
}
