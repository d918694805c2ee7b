//! Scraped article details

/// Details extracted from an article page: a representative photo and any
/// street mentions found in the text.
#[derive(Debug, Clone, Default)]
pub struct ArticleDetails {
    pub photo_url: Option<String>,
    /// Detected street mentions, deduplicated, in first-seen order
    pub streets: Vec<String>,
}

impl ArticleDetails {
    pub fn empty() -> Self {
        Self::default()
    }
}
