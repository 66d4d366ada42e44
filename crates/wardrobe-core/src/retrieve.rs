//! Candidate retrieval.
//!
//! Produces the bounded, ordered [`CandidateSet`] that a reasoning step is
//! allowed to choose from. The set is built fresh for each request and
//! dropped when the request completes.
//!
//! An empty set is a valid result: it means the wardrobe has nothing to
//! offer, and callers answer with their "no suitable items" response.

use anyhow::Result;

use crate::models::CandidateSummary;
use crate::store::Store;

/// How candidates are selected.
#[derive(Debug, Clone, Copy)]
pub enum CandidateQuery<'a> {
    /// Nearest items to a semantic query vector (ascending cosine distance).
    Semantic(&'a [f32]),
    /// Most recently ingested items, newest first.
    Recent { with_images: bool },
}

/// Ordered candidate summaries, at most `cap` long.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    items: Vec<CandidateSummary>,
}

impl CandidateSet {
    /// Build a set from already-ordered summaries, truncating to `cap`.
    pub fn new(mut items: Vec<CandidateSummary>, cap: usize) -> Self {
        items.truncate(cap);
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.iter().any(|c| c.id == id)
    }

    pub fn get(&self, id: i64) -> Option<&CandidateSummary> {
        self.items.iter().find(|c| c.id == id)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.items.iter().map(|c| c.id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateSummary> {
        self.items.iter()
    }
}

/// Query the store for at most `cap` candidates.
pub async fn retrieve_candidates<S: Store + ?Sized>(
    store: &S,
    query: CandidateQuery<'_>,
    cap: usize,
) -> Result<CandidateSet> {
    let items = match query {
        CandidateQuery::Semantic(vec) => store.nearest_neighbors(vec, cap).await?,
        CandidateQuery::Recent { with_images } => store.recent_items(cap, with_images).await?,
    };
    let set = CandidateSet::new(items, cap);
    tracing::debug!(count = set.len(), cap, ids = ?set.ids(), "retrieved candidates");
    Ok(set)
}
