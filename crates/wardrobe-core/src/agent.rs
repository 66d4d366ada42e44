//! Outfit agent flows.
//!
//! [`OutfitAgent`] ties the retriever, prompt builder, reasoning provider and
//! extractor into two flows:
//!
//! - **Stylist**: context text → semantic embedding → top candidates →
//!   reasoning → `{explanation, item_ids}` → resolved items.
//! - **Visual match**: reference image → most recent candidates (with
//!   images) → reasoning over image + listing → id list → resolved matches.
//!
//! Neither flow returns an error to its caller. Every failure becomes a
//! structurally valid degraded outcome and is logged with the
//! [`AgentError`] that caused it.
//!
//! Each request walks the stages of [`FlowStage`] in order. The only
//! backward edge is the bounded retry after malformed output, which
//! re-enters [`FlowStage::Reasoning`] with a stricter format reminder.

use serde::Serialize;
use thiserror::Error;

use crate::embedding::EmbeddingProvider;
use crate::extract::{self, AgentDecision, ExtractError, JsonShape};
use crate::models::ItemSummary;
use crate::prompt;
use crate::reasoning::{GenerationOptions, ReasoningProvider, ReasoningRequest};
use crate::retrieve::{retrieve_candidates, CandidateQuery, CandidateSet};
use crate::store::Store;

pub const NO_SUITABLE_ITEMS: &str = "No suitable items found in wardrobe.";
pub const TROUBLE_MESSAGE: &str = "I had trouble creating an outfit right now.";
pub const INVENTORY_EMPTY: &str = "Inventory is empty.";

/// Tunables for both flows.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Candidate cap for the stylist flow.
    pub stylist_candidates: usize,
    /// Candidate cap for the visual-match flow.
    pub visual_match_candidates: usize,
    /// Upper bound on returned visual matches.
    pub max_matches: usize,
    /// Extra reasoning attempts after a malformed response.
    pub malformed_retries: u32,
    pub stylist_temperature: f32,
    pub visual_match_temperature: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            stylist_candidates: 10,
            visual_match_candidates: 25,
            max_matches: 3,
            malformed_retries: 1,
            stylist_temperature: 0.3,
            visual_match_temperature: 0.4,
        }
    }
}

/// Failure taxonomy for a single flow run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("wardrobe inventory is empty")]
    EmptyInventory,
    #[error("malformed reasoning response: {0}")]
    MalformedResponse(String),
    #[error("reasoning response selected no usable items")]
    NoSelection,
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<ExtractError> for AgentError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Malformed(reason) => AgentError::MalformedResponse(reason),
            ExtractError::NoSelection => AgentError::NoSelection,
        }
    }
}

fn upstream(err: anyhow::Error) -> AgentError {
    AgentError::UpstreamUnavailable(format!("{:#}", err))
}

/// Per-request pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    #[default]
    Idle,
    Retrieving,
    Prompting,
    Reasoning,
    Validating,
    Resolved,
    DegradedFallback,
}

struct StageTracker {
    flow: &'static str,
    stage: FlowStage,
}

impl StageTracker {
    fn new(flow: &'static str) -> Self {
        Self {
            flow,
            stage: FlowStage::Idle,
        }
    }

    fn advance(&mut self, next: FlowStage) {
        tracing::debug!(flow = self.flow, from = ?self.stage, to = ?next, "stage transition");
        self.stage = next;
    }
}

/// Result of the stylist flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StylistOutcome {
    pub explanation: String,
    pub items: Vec<ItemSummary>,
    #[serde(skip)]
    pub stage: FlowStage,
}

impl StylistOutcome {
    fn degraded(err: &AgentError) -> Self {
        let explanation = match err {
            AgentError::EmptyInventory => NO_SUITABLE_ITEMS.to_string(),
            AgentError::MalformedResponse(_) | AgentError::NoSelection => {
                TROUBLE_MESSAGE.to_string()
            }
            AgentError::UpstreamUnavailable(msg) => {
                format!("{} (Technical error: {})", TROUBLE_MESSAGE, msg)
            }
        };
        Self {
            explanation,
            items: Vec::new(),
            stage: FlowStage::DegradedFallback,
        }
    }
}

/// Result of the visual-match flow.
///
/// Serializes as `{"matches": [...]}`, with `reasoning` for an empty
/// inventory or `error` for a failed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualMatchOutcome {
    pub matches: Vec<ItemSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub stage: FlowStage,
}

impl VisualMatchOutcome {
    fn degraded(err: &AgentError) -> Self {
        let (reasoning, error) = match err {
            AgentError::EmptyInventory => (Some(INVENTORY_EMPTY.to_string()), None),
            other => (None, Some(other.to_string())),
        };
        Self {
            matches: Vec::new(),
            reasoning,
            error,
            stage: FlowStage::DegradedFallback,
        }
    }
}

/// Orchestrates the stylist and visual-match flows over injected collaborators.
pub struct OutfitAgent<'a> {
    store: &'a dyn Store,
    embedder: &'a dyn EmbeddingProvider,
    reasoner: &'a dyn ReasoningProvider,
    settings: AgentSettings,
}

impl<'a> OutfitAgent<'a> {
    pub fn new(
        store: &'a dyn Store,
        embedder: &'a dyn EmbeddingProvider,
        reasoner: &'a dyn ReasoningProvider,
    ) -> Self {
        Self {
            store,
            embedder,
            reasoner,
            settings: AgentSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Recommend an outfit for a free-text context.
    pub async fn run_stylist_flow(&self, context: &str) -> StylistOutcome {
        let mut stage = StageTracker::new("stylist");
        tracing::info!(
            model = self.reasoner.model_name(),
            context_len = context.len(),
            "stylist flow started"
        );
        match self.stylist(context, &mut stage).await {
            Ok(outcome) => {
                tracing::info!(items = outcome.items.len(), "stylist flow resolved");
                outcome
            }
            Err(err) => {
                stage.advance(FlowStage::DegradedFallback);
                log_degraded("stylist", &err);
                StylistOutcome::degraded(&err)
            }
        }
    }

    /// Pick complementary items for a reference garment photo.
    pub async fn run_visual_match_flow(&self, image: &[u8]) -> VisualMatchOutcome {
        let mut stage = StageTracker::new("visual_match");
        tracing::info!(
            model = self.reasoner.model_name(),
            image_bytes = image.len(),
            "visual match flow started"
        );
        match self.visual_match(image, &mut stage).await {
            Ok(outcome) => {
                tracing::info!(matches = outcome.matches.len(), "visual match flow resolved");
                outcome
            }
            Err(err) => {
                stage.advance(FlowStage::DegradedFallback);
                log_degraded("visual_match", &err);
                VisualMatchOutcome::degraded(&err)
            }
        }
    }

    async fn stylist(
        &self,
        context: &str,
        stage: &mut StageTracker,
    ) -> Result<StylistOutcome, AgentError> {
        stage.advance(FlowStage::Retrieving);
        let query = self.embedder.embed_text(context).await.map_err(upstream)?;
        let candidates = retrieve_candidates(
            self.store,
            CandidateQuery::Semantic(&query),
            self.settings.stylist_candidates,
        )
        .await
        .map_err(upstream)?;
        if candidates.is_empty() {
            return Err(AgentError::EmptyInventory);
        }

        stage.advance(FlowStage::Prompting);
        let text = prompt::stylist_prompt(context, &candidates);

        let decision = self
            .reason_and_validate(
                stage,
                None,
                &text,
                JsonShape::Object,
                GenerationOptions::text(self.settings.stylist_temperature),
                |raw| extract::parse_stylist_decision(raw, &candidates),
            )
            .await?;

        let items = self.resolve_in_order(&decision.item_ids).await?;
        stage.advance(FlowStage::Resolved);
        Ok(StylistOutcome {
            explanation: decision.explanation.unwrap_or_default(),
            items,
            stage: FlowStage::Resolved,
        })
    }

    async fn visual_match(
        &self,
        image: &[u8],
        stage: &mut StageTracker,
    ) -> Result<VisualMatchOutcome, AgentError> {
        stage.advance(FlowStage::Retrieving);
        let candidates = retrieve_candidates(
            self.store,
            CandidateQuery::Recent { with_images: true },
            self.settings.visual_match_candidates,
        )
        .await
        .map_err(upstream)?;
        if candidates.is_empty() {
            return Err(AgentError::EmptyInventory);
        }

        stage.advance(FlowStage::Prompting);
        let text = prompt::visual_match_prompt(&candidates, self.settings.max_matches);

        let decision = self
            .reason_and_validate(
                stage,
                Some(image),
                &text,
                JsonShape::List,
                GenerationOptions::text(self.settings.visual_match_temperature),
                |raw| extract::parse_visual_selection(raw, &candidates),
            )
            .await?;

        let matches = resolve_from_candidates(&decision, &candidates, self.settings.max_matches);
        stage.advance(FlowStage::Resolved);
        Ok(VisualMatchOutcome {
            matches,
            reasoning: None,
            error: None,
            stage: FlowStage::Resolved,
        })
    }

    /// Call the reasoner and validate its output, retrying malformed output
    /// up to `malformed_retries` times with a stricter reminder.
    async fn reason_and_validate<F>(
        &self,
        stage: &mut StageTracker,
        image: Option<&[u8]>,
        base_prompt: &str,
        shape: JsonShape,
        options: GenerationOptions,
        validate: F,
    ) -> Result<AgentDecision, AgentError>
    where
        F: Fn(&str) -> Result<AgentDecision, ExtractError>,
    {
        let mut attempt: u32 = 0;
        let mut text = base_prompt.to_string();
        loop {
            stage.advance(FlowStage::Reasoning);
            let request = match image {
                Some(bytes) => ReasoningRequest::with_image(bytes, text.clone()),
                None => ReasoningRequest::text(text.clone()),
            };
            let raw = self
                .reasoner
                .generate(&request, &options)
                .await
                .map_err(upstream)?;

            stage.advance(FlowStage::Validating);
            match validate(&raw) {
                Ok(decision) => return Ok(decision),
                Err(ExtractError::Malformed(reason)) if attempt < self.settings.malformed_retries => {
                    attempt += 1;
                    tracing::warn!(
                        flow = stage.flow,
                        attempt,
                        reason = %reason,
                        "malformed reasoning output, retrying"
                    );
                    text = prompt::with_strict_reminder(base_prompt, shape);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Fetch full records and return them in selection order.
    async fn resolve_in_order(&self, ids: &[i64]) -> Result<Vec<ItemSummary>, AgentError> {
        let mut fetched = self.store.fetch_by_ids(ids).await.map_err(upstream)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(pos) = fetched.iter().position(|item| item.id == *id) {
                items.push(fetched.swap_remove(pos));
            }
        }
        if items.is_empty() {
            return Err(AgentError::NoSelection);
        }
        Ok(items)
    }
}

/// Dedupe has already happened in sanitization; truncation follows it.
fn resolve_from_candidates(
    decision: &AgentDecision,
    candidates: &CandidateSet,
    max_matches: usize,
) -> Vec<ItemSummary> {
    decision
        .item_ids
        .iter()
        .filter_map(|id| candidates.get(*id))
        .take(max_matches)
        .map(ItemSummary::from)
        .collect()
}

fn log_degraded(flow: &'static str, err: &AgentError) {
    match err {
        AgentError::EmptyInventory => tracing::info!(flow, "inventory empty, skipping reasoning"),
        other => tracing::warn!(flow, error = %other, "flow degraded to fallback"),
    }
}
