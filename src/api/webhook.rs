//! Telegram webhook endpoint
//!
//! Always acknowledges parseable updates with 200 so the transport does not
//! re-deliver them; handling failures are logged and retried on the next
//! natural trigger (Telegram re-sends nothing, the sweep picks up persistence
//! work). Malformed JSON is rejected by the extractor with 400.

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::error;

use crate::models::TelegramUpdate;
use crate::AppState;

/// POST /telegram/webhook
pub async fn receive_update(
    State(state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> Json<Value> {
    let update_id = update.update_id;

    match state.webhook_handler.handle_update(update).await {
        Ok(handled) => Json(json!({ "ok": true, "handled": handled })),
        Err(e) => {
            error!(update_id, "Failed to handle webhook update: {}", e);
            Json(json!({ "ok": true, "handled": false }))
        }
    }
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/telegram/webhook", post(receive_update))
}
