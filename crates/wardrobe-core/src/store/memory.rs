//! In-memory [`Store`] implementation for testing.
//!
//! Items live in a `Vec` behind `std::sync::RwLock`, kept in insertion
//! order. Nearest-neighbor search is brute-force cosine distance with a
//! stable sort, so equal distances keep insertion order.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{CandidateSummary, ItemSummary, NewWardrobeItem};

use super::Store;

struct StoredItem {
    id: i64,
    created_at: i64,
    item: NewWardrobeItem,
}

impl StoredItem {
    fn summary(&self, with_image: bool) -> CandidateSummary {
        let attrs = &self.item.attributes;
        CandidateSummary {
            id: self.id,
            category: attrs.category.clone(),
            color: attrs.color.clone(),
            material: attrs.material_inference.clone(),
            season: attrs.season.clone(),
            image_base64: with_image.then(|| self.item.image_base64.clone()),
        }
    }
}

/// In-memory store for tests and local experiments.
pub struct InMemoryStore {
    items: RwLock<Vec<StoredItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_item(&self, item: &NewWardrobeItem) -> Result<i64> {
        let mut items = self.items.write().map_err(poisoned)?;
        let id = items.last().map(|s| s.id + 1).unwrap_or(1);
        items.push(StoredItem {
            id,
            created_at: chrono::Utc::now().timestamp(),
            item: item.clone(),
        });
        Ok(id)
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<CandidateSummary>> {
        let items = self.items.read().map_err(poisoned)?;
        let mut scored: Vec<(f32, &StoredItem)> = items
            .iter()
            .map(|s| (cosine_distance(query, &s.item.semantic_embedding), s))
            .collect();
        // sort_by is stable: equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, s)| s.summary(false))
            .collect())
    }

    async fn recent_items(
        &self,
        limit: usize,
        with_images: bool,
    ) -> Result<Vec<CandidateSummary>> {
        let items = self.items.read().map_err(poisoned)?;
        let mut ordered: Vec<&StoredItem> = items.iter().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|s| s.summary(with_images))
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<ItemSummary>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items
            .iter()
            .filter(|s| ids.contains(&s.id))
            .map(|s| ItemSummary::from(&s.summary(true)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GarmentAttributes, Tactile};

    fn item(category: &str, semantic: Vec<f32>) -> NewWardrobeItem {
        NewWardrobeItem {
            image_base64: format!("img-{}", category),
            tactile: Tactile::default(),
            attributes: GarmentAttributes {
                category: category.to_string(),
                color: "black".to_string(),
                material_inference: "cotton".to_string(),
                season: "all".to_string(),
            },
            visual_embedding: vec![0.0; 2],
            semantic_embedding: semantic,
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        let a = store.insert_item(&item("top", vec![1.0, 0.0])).await.unwrap();
        let b = store.insert_item(&item("skirt", vec![0.0, 1.0])).await.unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_nearest_neighbors_orders_by_distance() {
        let store = InMemoryStore::new();
        store.insert_item(&item("far", vec![0.0, 1.0])).await.unwrap();
        store.insert_item(&item("near", vec![1.0, 0.1])).await.unwrap();
        store.insert_item(&item("mid", vec![1.0, 1.0])).await.unwrap();

        let hits = store.nearest_neighbors(&[1.0, 0.0], 10).await.unwrap();
        let cats: Vec<&str> = hits.iter().map(|h| h.category.as_str()).collect();
        assert_eq!(cats, vec!["near", "mid", "far"]);
        assert!(hits.iter().all(|h| h.image_base64.is_none()));
    }

    #[tokio::test]
    async fn test_nearest_neighbors_ties_keep_insertion_order() {
        let store = InMemoryStore::new();
        for c in ["a", "b", "c"] {
            store.insert_item(&item(c, vec![0.0, 0.0])).await.unwrap();
        }
        let hits = store.nearest_neighbors(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_nearest_neighbors_tolerates_nan_distance() {
        let store = InMemoryStore::new();
        store.insert_item(&item("far", vec![0.0, 1.0])).await.unwrap();
        store.insert_item(&item("broken", vec![f32::NAN, 1.0])).await.unwrap();
        store.insert_item(&item("mid", vec![1.0, 1.0])).await.unwrap();
        store.insert_item(&item("near", vec![1.0, 0.1])).await.unwrap();

        let hits = store.nearest_neighbors(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 4);
        let finite: Vec<&str> = hits
            .iter()
            .map(|h| h.category.as_str())
            .filter(|c| *c != "broken")
            .collect();
        assert_eq!(finite, vec!["near", "mid", "far"]);
    }

    #[tokio::test]
    async fn test_recent_items_newest_first() {
        let store = InMemoryStore::new();
        for c in ["a", "b", "c"] {
            store.insert_item(&item(c, vec![1.0])).await.unwrap();
        }
        let recent = store.recent_items(2, true).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(recent[0].image_base64.as_deref(), Some("img-c"));
    }

    #[tokio::test]
    async fn test_fetch_by_ids_skips_unknown() {
        let store = InMemoryStore::new();
        store.insert_item(&item("a", vec![1.0])).await.unwrap();
        store.insert_item(&item("b", vec![1.0])).await.unwrap();
        let found = store.fetch_by_ids(&[2, 99]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, "b");
        assert_eq!(found[0].image_base64, "img-b");
    }

    #[tokio::test]
    async fn test_empty_store_queries() {
        let store = InMemoryStore::new();
        assert!(store.nearest_neighbors(&[1.0], 10).await.unwrap().is_empty());
        assert!(store.recent_items(25, true).await.unwrap().is_empty());
    }
}
