//! # Wardrobe Agent
//!
//! Outfit recommendations over a photographed wardrobe.
//!
//! Garments are ingested from a photo plus optional tactile readings,
//! analysed by a generative model, embedded and stored in SQLite. Two agents
//! then recommend outfits: a text-context stylist and an image-based visual
//! matcher. The agent pipeline itself lives in [`wardrobe_core`]; this crate
//! supplies configuration, storage, HTTP providers, the CLI and the server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ photo +     │──▶│ analyse +    │──▶│  SQLite   │
//! │ tactile     │   │ embed        │   │ items+vec │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │(wardrobe)│       │  (axum)  │
//!                  └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`embedding`] | Embedding providers |
//! | [`reasoning`] | Reasoning providers |
//! | [`ingest`] | Garment ingestion |
//! | [`context`] | Event context rendering |
//! | [`server`] | HTTP server |

pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod reasoning;
pub mod retry;
pub mod server;
pub mod sqlite_store;
