//! Feed item candidate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One deduplicated feed item under review.
///
/// Immutable once created; identity comes from the feed item GUID, falling
/// back to the item link. Id equality is case-insensitive throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable identity (feed GUID or link)
    pub id: String,
    /// Article headline
    pub title: String,
    /// Article URL
    pub link: String,
    /// Publication timestamp, when the feed provides one
    pub published_at: Option<DateTime<Utc>>,
    /// Feed summary/description, when present
    pub summary: Option<String>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
        summary: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            link: link.into(),
            published_at,
            summary,
        }
    }
}
