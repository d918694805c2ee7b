//! Persisted incident record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row in the `fire_incidents` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Row id assigned by the database; absent on insert payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// When the incident happened (article publication time, or insert time)
    pub datetime: DateTime<Utc>,
    /// Photo to display for the incident
    pub photo_url: String,
    /// Street the incident happened on
    pub street: String,
}
