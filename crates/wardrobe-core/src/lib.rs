//! # Wardrobe Core
//!
//! Shared logic for Wardrobe Agent: data models, store abstraction,
//! candidate retrieval, prompt building, tolerant extraction of model
//! output, and the two outfit agent flows.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or filesystem I/O.
//! Collaborators (vector store, embedding service, reasoning service) are
//! reached only through the traits in [`store`], [`embedding`], and
//! [`reasoning`], so the flows can be driven by real backends or by fakes.
//!
//! ## Request pipeline
//!
//! ```text
//! context / image
//!       │
//!       ▼
//! ┌───────────┐   ┌──────────┐   ┌───────────┐   ┌────────────┐
//! │ Retrieve  │──▶│  Prompt  │──▶│  Reason   │──▶│  Extract + │──▶ outcome
//! │ (Store)   │   │ (builder)│   │ (LLM)     │   │  sanitize  │
//! └───────────┘   └──────────┘   └───────────┘   └────────────┘
//! ```

pub mod agent;
pub mod embedding;
pub mod extract;
pub mod models;
pub mod prompt;
pub mod reasoning;
pub mod retrieve;
pub mod store;
