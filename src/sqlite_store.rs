//! SQLite-backed [`Store`] implementation.
//!
//! Items live in the `wardrobe_items` table created by
//! [`crate::migrate::apply_schema`]. Nearest-neighbor search decodes every
//! semantic BLOB and ranks in Rust; rows are read in `id ASC` order and the
//! sort is stable, so equal distances keep insertion order.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use wardrobe_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use wardrobe_core::models::{CandidateSummary, ItemSummary, NewWardrobeItem};
use wardrobe_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn candidate_from_row(row: &SqliteRow, with_image: bool) -> CandidateSummary {
    CandidateSummary {
        id: row.get("id"),
        category: row.get("category"),
        color: row.get("color"),
        material: row.get("material_inference"),
        season: row.get("season"),
        image_base64: if with_image {
            Some(row.get("image_base64"))
        } else {
            None
        },
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_item(&self, item: &NewWardrobeItem) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let attrs = &item.attributes;

        let row = sqlx::query(
            r#"
            INSERT INTO wardrobe_items (image_base64, tactile_roughness, tactile_stiffness,
                                        category, color, material_inference, season,
                                        visual_embedding, semantic_embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&item.image_base64)
        .bind(item.tactile.roughness)
        .bind(item.tactile.stiffness)
        .bind(&attrs.category)
        .bind(&attrs.color)
        .bind(&attrs.material_inference)
        .bind(&attrs.season)
        .bind(vec_to_blob(&item.visual_embedding))
        .bind(vec_to_blob(&item.semantic_embedding))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<CandidateSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category, color, material_inference, season, semantic_embedding
            FROM wardrobe_items
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, CandidateSummary)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("semantic_embedding");
                let distance = cosine_distance(query, &blob_to_vec(&blob));
                (distance, candidate_from_row(row, false))
            })
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }

    async fn recent_items(
        &self,
        limit: usize,
        with_images: bool,
    ) -> Result<Vec<CandidateSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, image_base64, category, color, material_inference, season
            FROM wardrobe_items
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| candidate_from_row(row, with_images))
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<ItemSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, image_base64, category, color, material_inference, season \
             FROM wardrobe_items WHERE id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| ItemSummary::from(&candidate_from_row(row, true)))
            .collect())
    }
}
