//! HTTP API tests driving the router with `tower::ServiceExt::oneshot`.
//!
//! The store is in-memory and both providers are fakes, so no network or
//! database is touched.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use wardrobe_agent::server::{create_router, AppState};
use wardrobe_core::agent::AgentSettings;
use wardrobe_core::embedding::EmbeddingProvider;
use wardrobe_core::models::{GarmentAttributes, NewWardrobeItem, Tactile};
use wardrobe_core::reasoning::{GenerationOptions, ReasoningProvider, ReasoningRequest};
use wardrobe_core::store::memory::InMemoryStore;
use wardrobe_core::store::Store;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

struct FakeEmbedder {
    name: &'static str,
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model_name(&self) -> &str {
        self.name
    }
    fn visual_dims(&self) -> usize {
        2
    }
    fn semantic_dims(&self) -> usize {
        2
    }
    async fn embed_image(&self, _image: &[u8], _text: Option<&str>) -> Result<Vec<f32>> {
        Ok(vec![1.0, 1.0])
    }
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

/// Answers every prompt with the same text.
struct CannedReasoner(&'static str);

#[async_trait]
impl ReasoningProvider for CannedReasoner {
    fn model_name(&self) -> &str {
        "canned"
    }
    async fn generate(
        &self,
        _request: &ReasoningRequest<'_>,
        _options: &GenerationOptions,
    ) -> Result<String> {
        Ok(self.0.to_string())
    }
}

async fn seeded_store(n: usize) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for i in 1..=n {
        store
            .insert_item(&NewWardrobeItem {
                image_base64: format!("aW1n{}", i),
                tactile: Tactile::default(),
                attributes: GarmentAttributes {
                    category: format!("category-{}", i),
                    color: "black".into(),
                    material_inference: "leather".into(),
                    season: "autumn".into(),
                },
                visual_embedding: vec![1.0, 1.0],
                semantic_embedding: vec![1.0, i as f32 / 10.0],
            })
            .await
            .unwrap();
    }
    store
}

fn app(store: Arc<InMemoryStore>, reply: &'static str) -> Router {
    app_with(store, "fake", true, reply)
}

fn app_with(
    store: Arc<InMemoryStore>,
    model_name: &'static str,
    embeddings_enabled: bool,
    reply: &'static str,
) -> Router {
    create_router(AppState {
        store,
        embedder: Arc::new(FakeEmbedder { name: model_name }),
        reasoner: Arc::new(CannedReasoner(reply)),
        settings: AgentSettings::default(),
        max_upload_bytes: 64 * 1024,
        embeddings_enabled,
    })
}

fn multipart(fields: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, filename, content) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(f) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, f
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

fn post_multipart(uri: &str, fields: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let (content_type, body) = multipart(fields);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Health & listing
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = app(seeded_store(0).await, "");
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_list_items_newest_first() {
    let app = app(seeded_store(4).await, "");
    let req = Request::builder()
        .uri("/api/items?limit=2")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 4);
    assert_eq!(items[0]["image_base64"], "aW1n4");
    assert_eq!(items[1]["id"], 3);
}

// ============================================================================
// Stylist
// ============================================================================

#[tokio::test]
async fn test_stylist_returns_resolved_items() {
    let reply = "```json\n{\"explanation\":\"Sharp and warm\",\"item_ids\":[2,1,77]}\n```";
    let app = app(seeded_store(5).await, reply);
    let (status, json) = send(
        app,
        post_json("/api/agent/stylist", json!({"context": "gallery opening"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["explanation"], "Sharp and warm");
    let ids: Vec<i64> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(json["items"][0]["image_base64"], "aW1n2");
    assert!(json.get("stage").is_none());
}

#[tokio::test]
async fn test_stylist_accepts_event() {
    let app = app(seeded_store(2).await, r#"{"explanation":"ok","item_ids":[1]}"#);
    let body = json!({"event": {"summary": "Dinner", "start": "19:00", "location": "Paris"}});
    let (status, json) = send(app, post_json("/api/agent/stylist", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"][0]["id"], 1);
}

#[tokio::test]
async fn test_stylist_empty_inventory() {
    let app = app(seeded_store(0).await, "unused");
    let (status, json) = send(
        app,
        post_json("/api/agent/stylist", json!({"context": "beach"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"explanation": "No suitable items found in wardrobe.", "items": []})
    );
}

#[tokio::test]
async fn test_stylist_garbage_degrades() {
    let app = app(seeded_store(3).await, "I can't decide, sorry!");
    let (status, json) = send(
        app,
        post_json("/api/agent/stylist", json!({"context": "wedding"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["explanation"].as_str().unwrap().contains("trouble"));
    assert_eq!(json["items"], json!([]));
}

#[tokio::test]
async fn test_stylist_requires_context() {
    let app = app(seeded_store(1).await, "");
    let (status, json) = send(
        app,
        post_json("/api/agent/stylist", json!({"context": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

// ============================================================================
// Visual match
// ============================================================================

#[tokio::test]
async fn test_visual_match_dedupes_and_truncates() {
    let app = app(seeded_store(6).await, "Picks: [5, 5, 2, 3, 4]");
    let req = post_multipart(
        "/api/agent/visual-match",
        &[("image", Some("ref.jpg"), b"\xff\xd8\xff")],
    );
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = json["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 2, 3]);
}

#[tokio::test]
async fn test_visual_match_empty_inventory() {
    let app = app(seeded_store(0).await, "[1]");
    let req = post_multipart(
        "/api/agent/visual-match",
        &[("image", Some("ref.jpg"), b"\xff\xd8\xff")],
    );
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"matches": [], "reasoning": "Inventory is empty."}));
}

#[tokio::test]
async fn test_visual_match_requires_image() {
    let app = app(seeded_store(2).await, "[1]");
    let req = post_multipart("/api/agent/visual-match", &[("note", None, b"hello")]);
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_visual_match_reads_only_the_image() {
    let app = app(seeded_store(2).await, "[1]");
    let req = post_multipart(
        "/api/agent/visual-match",
        &[
            ("tactile_json", None, b"not even json"),
            ("image", Some("ref.jpg"), b"\xff\xd8\xff"),
        ],
    );
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["matches"][0]["id"], 1);
}

#[tokio::test]
async fn test_visual_match_malformed_reply_degrades() {
    let app = app(seeded_store(3).await, "{\"ids\": 3}");
    let req = post_multipart(
        "/api/agent/visual-match",
        &[("image", Some("ref.jpg"), b"\xff\xd8\xff")],
    );
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["matches"], json!([]));
    assert!(json["error"].as_str().unwrap().contains("malformed"));
    assert!(json.get("reasoning").is_none());
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = app(seeded_store(1).await, "[1]");
    let big = vec![0u8; 128 * 1024];
    let req = post_multipart("/api/agent/visual-match", &[("image", Some("big.jpg"), &big)]);
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// Ingest
// ============================================================================

const ANALYSIS: &str = r#"{"category":"blazer","color":"charcoal","material_inference":"wool blend","season":"autumn","vibe_description":"tailored and sharp"}"#;

#[tokio::test]
async fn test_ingest_success() {
    let store = seeded_store(0).await;
    let app = app(store.clone(), ANALYSIS);
    let req = post_multipart(
        "/api/ingest",
        &[
            ("image", Some("blazer.jpg"), b"\xff\xd8\xffblazer"),
            ("tactile_json", None, br#"{"roughness": 0.3, "stiffness": 0.7}"#),
        ],
    );
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["id"], 1);
    assert_eq!(json["analysis"]["category"], "blazer");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_ingest_bad_tactile() {
    let app = app(seeded_store(0).await, ANALYSIS);
    let req = post_multipart(
        "/api/ingest",
        &[
            ("image", Some("a.jpg"), b"\xff\xd8"),
            ("tactile_json", None, br#"{"roughness": 7}"#),
        ],
    );
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("roughness"));
}

#[tokio::test]
async fn test_ingest_with_embeddings_disabled() {
    let app = app_with(seeded_store(0).await, "fake", false, ANALYSIS);
    let req = post_multipart("/api/ingest", &[("image", Some("a.jpg"), b"\xff\xd8")]);
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "embeddings_disabled");
}

#[tokio::test]
async fn test_ingest_gate_follows_config_not_model_name() {
    let store = seeded_store(0).await;
    let app = app_with(store.clone(), "disabled", true, ANALYSIS);
    let req = post_multipart("/api/ingest", &[("image", Some("a.jpg"), b"\xff\xd8")]);
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_ingest_upstream_failure() {
    let app = app(seeded_store(0).await, "not json at all");
    let req = post_multipart("/api/ingest", &[("image", Some("a.jpg"), b"\xff\xd8")]);
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "upstream_unavailable");
}
