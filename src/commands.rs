//! CLI command implementations.
//!
//! Each command loads what it needs from the config, runs one operation and
//! prints its JSON result to stdout.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use wardrobe_core::agent::OutfitAgent;
use wardrobe_core::embedding::EmbeddingProvider;
use wardrobe_core::models::Tactile;
use wardrobe_core::reasoning::ReasoningProvider;
use wardrobe_core::store::Store;

use crate::config::Config;
use crate::context::EventContext;
use crate::sqlite_store::SqliteStore;
use crate::{db, embedding, ingest, migrate, reasoning};

/// Store and providers built from configuration.
pub struct Services {
    pub store: SqliteStore,
    pub embedder: Box<dyn EmbeddingProvider>,
    pub reasoner: Box<dyn ReasoningProvider>,
}

impl Services {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self {
            store: SqliteStore::new(pool),
            embedder: embedding::create_provider(&config.embedding)?,
            reasoner: reasoning::create_provider(&config.reasoning)?,
        })
    }

    pub fn agent<'a>(&'a self, config: &Config) -> OutfitAgent<'a> {
        OutfitAgent::new(&self.store, self.embedder.as_ref(), self.reasoner.as_ref())
            .with_settings(config.agent_settings())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))
}

pub async fn run_ingest(config: &Config, image: &Path, tactile: Tactile) -> Result<()> {
    let services = Services::open(config).await?;
    let bytes = read_image(image)?;
    let receipt = ingest::ingest_garment(
        &services.store,
        services.embedder.as_ref(),
        services.reasoner.as_ref(),
        &bytes,
        tactile,
    )
    .await?;
    print_json(&receipt)
}

pub async fn run_items(config: &Config, limit: usize) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = SqliteStore::new(pool);

    let items = store.list_items(limit).await?;
    if items.is_empty() {
        println!("No items in wardrobe.");
        return Ok(());
    }
    for item in &items {
        println!(
            "{:>5}  {:<14} {:<12} {}",
            item.id, item.category, item.color, item.material
        );
    }
    Ok(())
}

/// Stylist input: free text, or a calendar event rendered to text.
pub enum StylistInput {
    Text(String),
    Event(EventContext),
}

pub async fn run_stylist(config: &Config, input: StylistInput) -> Result<()> {
    let context = match input {
        StylistInput::Text(text) => text,
        StylistInput::Event(event) => event.render(),
    };
    let services = Services::open(config).await?;
    let outcome = services.agent(config).run_stylist_flow(&context).await;
    print_json(&outcome)
}

pub async fn run_match(config: &Config, image: &Path) -> Result<()> {
    let services = Services::open(config).await?;
    let bytes = read_image(image)?;
    let outcome = services.agent(config).run_visual_match_flow(&bytes).await;
    print_json(&outcome)
}
