//! Configuration echo endpoint
//!
//! Redacted view for operators: reports what is configured without exposing
//! tokens or keys.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// GET /config
pub async fn show_config(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;

    Json(json!({
        "telegram": {
            "enabled": config.telegram.enabled,
            "chat_id": config.telegram.chat_id,
            "webhook_url": config.telegram.webhook_url,
        },
        "rss": {
            "feed_url": config.rss.feed_url,
            "poll_interval_seconds": config.rss.poll_interval_seconds,
            "keywords": config.rss.keywords.len(),
        },
        "supabase": {
            "configured": config.supabase.is_configured(),
            "poll_interval_seconds": config.supabase.poll_interval_seconds,
        },
    }))
}

pub fn config_routes() -> Router<AppState> {
    Router::new().route("/config", get(show_config))
}
