//! Prompt construction for the reasoning service.
//!
//! Every builder here is a pure function of its inputs. Candidate listings
//! include ids and descriptive attributes only, never embeddings or images,
//! and output-format examples use placeholders rather than real ids so a
//! prompt never mentions an item outside the current [`CandidateSet`].

use serde_json::json;

use crate::extract::JsonShape;
use crate::models::Tactile;
use crate::retrieve::CandidateSet;

/// Categories that may repeat the reference item's broad category because
/// they are worn as a layer or as part of an ensemble.
pub const LAYERING_CATEGORIES: &[&str] = &["blazer", "cardigan", "ensemble"];

/// Minimum and maximum number of items the stylist may pick.
pub const STYLIST_MIN_ITEMS: usize = 2;
pub const STYLIST_MAX_ITEMS: usize = 3;

/// Render the stylist candidate listing, one line per item.
pub fn render_stylist_candidates(candidates: &CandidateSet) -> String {
    let mut out = String::new();
    for c in candidates.iter() {
        out.push_str(&format!(
            "- ID {}: {} {} (Material: {}, Season: {})\n",
            c.id, c.color, c.category, c.material, c.season
        ));
    }
    out
}

/// Render the visual-match candidate listing as a pretty JSON array.
pub fn render_visual_candidates(candidates: &CandidateSet) -> String {
    let listing: Vec<serde_json::Value> = candidates
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "category": c.category,
                "color": c.color,
                "material": c.material,
                "season": c.season,
            })
        })
        .collect();
    serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "[]".to_string())
}

/// Prompt for the text-context stylist flow.
pub fn stylist_prompt(context: &str, candidates: &CandidateSet) -> String {
    format!(
        r#"You are an expert fashion stylist.
User Context/Request: "{context}"

Available Wardrobe Candidates (pre-filtered by relevance):
{listing}
Task: Select the best {min}-{max} items from the list above to create a complete outfit for the context.
Only use IDs that appear in the list above.

Output Requirement: You MUST return ONLY raw JSON with this exact structure:
{{
    "explanation": "A short, friendly stylist note explaining why these items work together for the context.",
    "item_ids": [<id>, <id>]
}}
Return a single JSON object. Do not use markdown code fences and do not add any text before or after the JSON."#,
        context = context.trim(),
        listing = render_stylist_candidates(candidates),
        min = STYLIST_MIN_ITEMS,
        max = STYLIST_MAX_ITEMS,
    )
}

/// Prompt for the visual-match flow. The reference image is sent alongside.
pub fn visual_match_prompt(candidates: &CandidateSet, picks: usize) -> String {
    let placeholders = vec!["<id>"; picks].join(", ");
    format!(
        r#"You are an expert fashion stylist.

Task: Create a complete outfit.
1. Look at the input image provided (this is the item the user wants to wear).
2. Look at the following inventory list from their closet:
{listing}

3. Select exactly {picks} distinct items from the inventory list that best complement the input image to create a stylish, complete outfit.
Exclude items that are too similar to the input (e.g., if the input is shoes, do not pick other shoes).
Do not pick another item from the same broad category as the input unless it is one of: {layering}.

Output Requirement:
Return ONLY a raw JSON list of the {picks} selected item IDs, using only IDs from the inventory list.
Example format: [{placeholders}]
Return a single JSON array. Do not use markdown code fences and do not add any text before or after the JSON."#,
        listing = render_visual_candidates(candidates),
        picks = picks,
        layering = LAYERING_CATEGORIES.join(", "),
        placeholders = placeholders,
    )
}

/// Prompt for analysing a newly photographed garment at ingestion.
pub fn garment_analysis_prompt(tactile: &Tactile) -> String {
    format!(
        r#"Analyze this garment image.
I also have tactile sensor data from the fabric:
- Roughness (0-1): {roughness}
- Stiffness (0-1): {stiffness}

Based on the image AND the tactile feel, provide a JSON object with these string fields:
category, color, material_inference, season, vibe_description.
Return a single JSON object with no markdown code fences and no surrounding text."#,
        roughness = tactile.roughness.unwrap_or(0.0),
        stiffness = tactile.stiffness.unwrap_or(0.0),
    )
}

/// Append a stricter format reminder used when retrying after malformed output.
pub fn with_strict_reminder(prompt: &str, shape: JsonShape) -> String {
    let what = match shape {
        JsonShape::Object => "one JSON object starting with { and ending with }",
        JsonShape::List => "one JSON array starting with [ and ending with ]",
    };
    format!(
        "{prompt}\n\nIMPORTANT: Your previous answer could not be parsed. Reply with {what} and nothing else."
    )
}
