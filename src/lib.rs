//! firewatch library interface
//!
//! Ingests fire-incident candidates from an RSS feed, runs them through a
//! human approval workflow in a Telegram chat, and persists approved
//! incidents to Supabase. The webhook dispatcher, background loops, and the
//! concurrent candidate store are exposed here for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use crate::error::{Error, Result};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::services::WebhookHandler;
use crate::store::CandidateStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CandidateStore>,
    pub webhook_handler: Arc<WebhookHandler>,
    pub config: Arc<AppConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<CandidateStore>,
        webhook_handler: Arc<WebhookHandler>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            webhook_handler,
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::webhook_routes())
        .merge(api::health_routes())
        .merge(api::config_routes())
        .with_state(state)
}
