//! # Wardrobe CLI (`wardrobe`)
//!
//! ## Usage
//!
//! ```bash
//! wardrobe --config ./config/wardrobe.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wardrobe init` | Create the SQLite database and run schema migrations |
//! | `wardrobe ingest <image>` | Analyse, embed and store a garment photo |
//! | `wardrobe items` | List stored items, newest first |
//! | `wardrobe stylist "<context>"` | Recommend an outfit for a context |
//! | `wardrobe match <image>` | Pick items that complement a garment photo |
//! | `wardrobe serve` | Start the HTTP server |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wardrobe_agent::commands::{self, StylistInput};
use wardrobe_agent::config;
use wardrobe_agent::context::EventContext;
use wardrobe_agent::migrate;
use wardrobe_agent::server;
use wardrobe_core::models::Tactile;

/// Wardrobe Agent: outfit recommendations over a photographed wardrobe.
#[derive(Parser)]
#[command(name = "wardrobe", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/wardrobe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Ingest a garment photo.
    Ingest {
        /// Path to the image file.
        image: PathBuf,
        /// Fabric roughness reading in [0, 1].
        #[arg(long)]
        roughness: Option<f64>,
        /// Fabric stiffness reading in [0, 1].
        #[arg(long)]
        stiffness: Option<f64>,
    },

    /// List stored items, newest first.
    Items {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Recommend an outfit for a free-text context or a calendar event.
    Stylist {
        /// Free-text context (e.g. "rainy client meeting downtown").
        #[arg(required_unless_present = "summary")]
        context: Option<String>,
        /// Event title; builds the context from the event fields instead.
        #[arg(long, conflicts_with = "context")]
        summary: Option<String>,
        #[arg(long, requires = "summary", default_value = "")]
        start: String,
        #[arg(long, requires = "summary", default_value = "")]
        location: String,
        #[arg(long, requires = "summary", default_value = "")]
        description: String,
        #[arg(long, requires = "summary")]
        weather: Option<String>,
    },

    /// Pick wardrobe items that complement a garment photo.
    Match {
        /// Path to the reference image.
        image: PathBuf,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wardrobe_agent=info,wardrobe_core=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            image,
            roughness,
            stiffness,
        } => {
            let tactile = Tactile {
                roughness,
                stiffness,
            };
            commands::run_ingest(&cfg, &image, tactile).await?;
        }
        Commands::Items { limit } => {
            commands::run_items(&cfg, limit).await?;
        }
        Commands::Stylist {
            context,
            summary,
            start,
            location,
            description,
            weather,
        } => {
            let input = match (context, summary) {
                (Some(text), _) => StylistInput::Text(text),
                (None, Some(summary)) => StylistInput::Event(EventContext {
                    summary,
                    start,
                    location,
                    description,
                    weather,
                }),
                (None, None) => anyhow::bail!("either a context or --summary is required"),
            };
            commands::run_stylist(&cfg, input).await?;
        }
        Commands::Match { image } => {
            commands::run_match(&cfg, &image).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
