use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Open the configured database and apply the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the wardrobe tables. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Embeddings are little-endian f32 BLOBs (see `vec_to_blob`).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wardrobe_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_base64 TEXT NOT NULL,
            tactile_roughness REAL,
            tactile_stiffness REAL,
            category TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '',
            material_inference TEXT NOT NULL DEFAULT '',
            season TEXT NOT NULL DEFAULT '',
            visual_embedding BLOB NOT NULL,
            semantic_embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wardrobe_items_created_at ON wardrobe_items(created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
