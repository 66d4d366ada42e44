//! Storage abstraction for Wardrobe Agent.
//!
//! The [`Store`] trait defines the vector-store operations the retrieval and
//! agent pipeline needs, enabling pluggable backends (SQLite in the app
//! crate, in-memory here for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CandidateSummary, ItemSummary, NewWardrobeItem};

/// Abstract wardrobe store with a vector-searchable semantic column.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_item`](Store::insert_item) | Persist a new garment, returning its id |
/// | [`nearest_neighbors`](Store::nearest_neighbors) | Semantic nearest-neighbor query |
/// | [`recent_items`](Store::recent_items) | Most recently ingested items |
/// | [`fetch_by_ids`](Store::fetch_by_ids) | Exact-match fetch of full records |
/// | [`list_items`](Store::list_items) | Newest items for browsing |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new item. Ids are assigned by the store and never reused.
    async fn insert_item(&self, item: &NewWardrobeItem) -> Result<i64>;

    /// Return up to `limit` items ordered by ascending cosine distance between
    /// `query` and each item's semantic embedding.
    ///
    /// Ties keep insertion order. Summaries carry no image.
    async fn nearest_neighbors(&self, query: &[f32], limit: usize)
        -> Result<Vec<CandidateSummary>>;

    /// Return up to `limit` items, newest first.
    ///
    /// When `with_images` is set, each summary includes the base64 image.
    async fn recent_items(&self, limit: usize, with_images: bool)
        -> Result<Vec<CandidateSummary>>;

    /// Fetch full records for the given ids. Unknown ids are skipped; the
    /// result order is unspecified.
    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<ItemSummary>>;

    /// List up to `limit` items with images, newest first.
    async fn list_items(&self, limit: usize) -> Result<Vec<ItemSummary>> {
        let recent = self.recent_items(limit, true).await?;
        Ok(recent.iter().map(ItemSummary::from).collect())
    }
}
