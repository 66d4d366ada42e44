//! Core data models used throughout Wardrobe Agent.
//!
//! These types represent garments as they are ingested, the candidate
//! summaries surfaced to the reasoning step, and the resolved items returned
//! to callers.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Tactile sensor readings captured alongside a garment photo.
///
/// Both readings are optional; when present each must lie in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tactile {
    #[serde(default)]
    pub roughness: Option<f64>,
    #[serde(default)]
    pub stiffness: Option<f64>,
}

impl Tactile {
    /// Reject readings outside the sensor's unit range.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("roughness", self.roughness), ("stiffness", self.stiffness)] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    bail!("tactile.{} must be in [0.0, 1.0], got {}", name, v);
                }
            }
        }
        Ok(())
    }
}

/// Descriptive attributes inferred once at ingestion and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GarmentAttributes {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub material_inference: String,
    #[serde(default)]
    pub season: String,
}

/// A garment ready to be inserted into the store.
///
/// The store assigns the integer id and creation timestamp.
#[derive(Debug, Clone)]
pub struct NewWardrobeItem {
    /// Raw image bytes, base64-encoded (standard alphabet, padded).
    pub image_base64: String,
    pub tactile: Tactile,
    pub attributes: GarmentAttributes,
    /// Visual embedding (dimension D_v).
    pub visual_embedding: Vec<f32>,
    /// Semantic embedding (dimension D_s); all zeros when no description exists.
    pub semantic_embedding: Vec<f32>,
}

/// A wardrobe item as surfaced to the reasoning step.
///
/// Carries descriptive attributes only. The image is populated for the
/// visual-match flow and for listings, and left empty for the stylist flow.
/// Embeddings never leave the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub id: i64,
    pub category: String,
    pub color: String,
    pub material: String,
    pub season: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// A selected item resolved to its full record for the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: i64,
    pub image_base64: String,
    pub category: String,
    pub material: String,
    pub color: String,
}

impl From<&CandidateSummary> for ItemSummary {
    fn from(c: &CandidateSummary) -> Self {
        Self {
            id: c.id,
            image_base64: c.image_base64.clone().unwrap_or_default(),
            category: c.category.clone(),
            material: c.material.clone(),
            color: c.color.clone(),
        }
    }
}

/// Structured analysis of a garment photo returned by the reasoning service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GarmentAnalysis {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub material_inference: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub vibe_description: String,
}

impl GarmentAnalysis {
    /// Text embedded into the semantic vector: the vibe followed by the material.
    pub fn semantic_text(&self) -> String {
        format!("{} {}", self.vibe_description, self.material_inference)
            .trim()
            .to_string()
    }

    pub fn attributes(&self) -> GarmentAttributes {
        GarmentAttributes {
            category: self.category.clone(),
            color: self.color.clone(),
            material_inference: self.material_inference.clone(),
            season: self.season.clone(),
        }
    }
}
