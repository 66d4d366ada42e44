//! TOML configuration.
//!
//! Loaded once at startup by [`load_config`] and passed by reference into
//! the store, the providers and the agent. Secrets (API keys, access
//! tokens) are read from the environment by the providers that need them
//! and never appear in the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use wardrobe_core::agent::AgentSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    /// Image (multimodal) model.
    #[serde(default)]
    pub model: Option<String>,
    /// Text model for the semantic vector.
    #[serde(default)]
    pub text_model: Option<String>,
    #[serde(default = "default_visual_dims")]
    pub visual_dims: usize,
    #[serde(default = "default_semantic_dims")]
    pub semantic_dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            text_model: None,
            visual_dims: default_visual_dims(),
            semantic_dims: default_semantic_dims(),
            url: None,
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReasoningConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_reasoning_retries")]
    pub max_retries: u32,
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_stylist_temperature")]
    pub stylist_temperature: f32,
    #[serde(default = "default_visual_match_temperature")]
    pub visual_match_temperature: f32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            url: None,
            max_retries: default_reasoning_retries(),
            timeout_secs: default_reasoning_timeout(),
            stylist_temperature: default_stylist_temperature(),
            visual_match_temperature: default_visual_match_temperature(),
        }
    }
}

impl ReasoningConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_stylist_candidates")]
    pub stylist_candidates: usize,
    #[serde(default = "default_visual_match_candidates")]
    pub visual_match_candidates: usize,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    #[serde(default = "default_malformed_retries")]
    pub malformed_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stylist_candidates: default_stylist_candidates(),
            visual_match_candidates: default_visual_match_candidates(),
            max_matches: default_max_matches(),
            malformed_retries: default_malformed_retries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_visual_dims() -> usize {
    1408
}
fn default_semantic_dims() -> usize {
    768
}
fn default_embedding_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_reasoning_retries() -> u32 {
    3
}
fn default_reasoning_timeout() -> u64 {
    60
}
fn default_stylist_temperature() -> f32 {
    0.3
}
fn default_visual_match_temperature() -> f32 {
    0.4
}
fn default_stylist_candidates() -> usize {
    10
}
fn default_visual_match_candidates() -> usize {
    25
}
fn default_max_matches() -> usize {
    3
}
fn default_malformed_retries() -> u32 {
    1
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Config {
    /// Agent tunables assembled from the `[agent]` and `[reasoning]` sections.
    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            stylist_candidates: self.agent.stylist_candidates,
            visual_match_candidates: self.agent.visual_match_candidates,
            max_matches: self.agent.max_matches,
            malformed_retries: self.agent.malformed_retries,
            stylist_temperature: self.reasoning.stylist_temperature,
            visual_match_temperature: self.reasoning.visual_match_temperature,
        }
    }

    /// A config pointing at `db_path` with every provider disabled.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            embedding: EmbeddingConfig::default(),
            reasoning: ReasoningConfig::default(),
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Embedding
    match config.embedding.provider.as_str() {
        "disabled" | "vertex" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, vertex, or local.",
            other
        ),
    }
    if config.embedding.visual_dims == 0 || config.embedding.semantic_dims == 0 {
        bail!("embedding.visual_dims and embedding.semantic_dims must be > 0");
    }

    // Reasoning
    match config.reasoning.provider.as_str() {
        "disabled" | "gemini" | "ollama" => {}
        other => bail!(
            "Unknown reasoning provider: '{}'. Must be disabled, gemini, or ollama.",
            other
        ),
    }
    if config.reasoning.provider == "ollama" && config.reasoning.model.is_none() {
        bail!("reasoning.model must be specified when provider is 'ollama'");
    }
    for (name, t) in [
        ("stylist_temperature", config.reasoning.stylist_temperature),
        (
            "visual_match_temperature",
            config.reasoning.visual_match_temperature,
        ),
    ] {
        if !(0.0..=2.0).contains(&t) {
            bail!("reasoning.{} must be in [0.0, 2.0]", name);
        }
    }

    // Agent
    if config.agent.stylist_candidates == 0 || config.agent.visual_match_candidates == 0 {
        bail!("agent.stylist_candidates and agent.visual_match_candidates must be >= 1");
    }
    if config.agent.max_matches == 0 {
        bail!("agent.max_matches must be >= 1");
    }

    // Server
    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let cfg = parse("[db]\npath = \"./data/wardrobe.sqlite\"\n").unwrap();
        assert_eq!(cfg.embedding.provider, "disabled");
        assert_eq!(cfg.embedding.visual_dims, 1408);
        assert_eq!(cfg.embedding.semantic_dims, 768);
        assert_eq!(cfg.reasoning.max_retries, 3);
        assert_eq!(cfg.agent_settings(), AgentSettings::default());
        assert_eq!(cfg.server.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_rejects_unknown_providers() {
        let err = parse("[db]\npath = \"x\"\n[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
        let err = parse("[db]\npath = \"x\"\n[reasoning]\nprovider = \"gpt\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown reasoning provider"));
    }

    #[test]
    fn test_rejects_bad_agent_caps() {
        let err = parse("[db]\npath = \"x\"\n[agent]\nmax_matches = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_matches"));
        let err = parse("[db]\npath = \"x\"\n[agent]\nstylist_candidates = 0\n").unwrap_err();
        assert!(err.to_string().contains("stylist_candidates"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let err =
            parse("[db]\npath = \"x\"\n[reasoning]\nstylist_temperature = 2.5\n").unwrap_err();
        assert!(err.to_string().contains("stylist_temperature"));
    }

    #[test]
    fn test_ollama_requires_model() {
        assert!(parse("[db]\npath = \"x\"\n[reasoning]\nprovider = \"ollama\"\n").is_err());
        assert!(parse(
            "[db]\npath = \"x\"\n[reasoning]\nprovider = \"ollama\"\nmodel = \"llava\"\n"
        )
        .is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
