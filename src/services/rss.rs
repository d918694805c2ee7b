//! RSS feed client
//!
//! Fetches the configured feed, filters items by keyword, and maps them to
//! [`Candidate`]s. Feeds routinely redeliver old items; dedup happens at the
//! store, not here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::RssOptions;
use crate::error::{Error, Result};
use crate::models::Candidate;

const USER_AGENT: &str = "firewatch/0.1 (+https://github.com/firewatch/firewatch)";
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Source of review candidates.
#[async_trait]
pub trait CandidateFetcher: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>>;
}

/// HTTP + RSS implementation over the configured feed.
pub struct RssFetcher {
    http_client: reqwest::Client,
    options: RssOptions,
}

impl RssFetcher {
    pub fn new(options: RssOptions) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http_client, options })
    }
}

#[async_trait]
impl CandidateFetcher for RssFetcher {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let feed_url = match self.options.feed_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                warn!("RSS feed URL is not configured");
                return Ok(Vec::new());
            }
        };

        let response = self
            .http_client
            .get(feed_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Feed(format!("Feed request failed: {}", e)))?;

        let body = response.bytes().await?;
        let channel = rss::Channel::read_from(&body[..])
            .map_err(|e| Error::Feed(format!("Feed parse failed: {}", e)))?;

        Ok(candidates_from_channel(&channel, &self.options.keywords))
    }
}

/// Map feed items to candidates, applying the keyword filter. Items without
/// a usable identity (no GUID and no link) are skipped.
pub fn candidates_from_channel(channel: &rss::Channel, keywords: &[String]) -> Vec<Candidate> {
    let normalized_keywords: Vec<&str> = keywords
        .iter()
        .map(|keyword| keyword.trim())
        .filter(|keyword| !keyword.is_empty())
        .collect();

    let mut candidates = Vec::new();
    for item in channel.items() {
        let title = item.title().unwrap_or_default();
        let summary = item.description();
        let link = item.link().unwrap_or_default();

        let mut content = title.to_string();
        if let Some(summary) = summary {
            if !summary.trim().is_empty() {
                content.push(' ');
                content.push_str(summary);
            }
        }

        if !matches_keywords(&content, &normalized_keywords) {
            continue;
        }

        let id = match item.guid().map(|guid| guid.value()) {
            Some(guid) if !guid.trim().is_empty() => guid,
            _ => link,
        };
        if id.trim().is_empty() {
            debug!(title, "Skipping RSS item without id or link");
            continue;
        }

        candidates.push(Candidate::new(
            id,
            title,
            link,
            parse_pub_date(item.pub_date()),
            summary
                .map(str::to_string)
                .filter(|s| !s.trim().is_empty()),
        ));
    }

    candidates
}

/// Case-insensitive substring match; an empty keyword list matches all.
fn matches_keywords(content: &str, keywords: &[&str]) -> bool {
    if keywords.is_empty() {
        return true;
    }

    let haystack = content.to_lowercase();
    keywords
        .iter()
        .any(|keyword| haystack.contains(&keyword.to_lowercase()))
}

fn parse_pub_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>City News</title>
            <link>https://news.example.com</link>
            <description>Local news</description>
            <item>
              <title>Incendiu pe Strada Mare</title>
              <link>https://news.example.com/articles/1</link>
              <guid>urn:news:1</guid>
              <description>Pompierii au intervenit.</description>
              <pubDate>Tue, 05 Aug 2025 10:30:00 +0200</pubDate>
            </item>
            <item>
              <title>Weather update</title>
              <link>https://news.example.com/articles/2</link>
              <guid>urn:news:2</guid>
            </item>
            <item>
              <title>Fire without guid</title>
              <link>https://news.example.com/articles/3</link>
            </item>
            <item>
              <title>Fire with no identity at all</title>
            </item>
          </channel>
        </rss>"#;

    fn channel() -> rss::Channel {
        rss::Channel::read_from(FEED.as_bytes()).unwrap()
    }

    #[test]
    fn keyword_filter_is_case_insensitive_over_title_and_summary() {
        let candidates = candidates_from_channel(&channel(), &["INCENDIU".to_string()]);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "urn:news:1");
        assert_eq!(candidates[0].title, "Incendiu pe Strada Mare");
        assert!(candidates[0].published_at.is_some());
        assert_eq!(candidates[0].summary.as_deref(), Some("Pompierii au intervenit."));
    }

    #[test]
    fn empty_keyword_list_matches_everything_with_identity() {
        let candidates = candidates_from_channel(&channel(), &[]);

        // The guid-less item falls back to its link; the identity-less item
        // is dropped.
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].id, "https://news.example.com/articles/3");
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let candidates =
            candidates_from_channel(&channel(), &["  ".to_string(), "fire".to_string()]);

        // Only the guid-less item matches "fire" and still has an identity.
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "https://news.example.com/articles/3");
    }

    #[test]
    fn unparseable_pub_date_becomes_none() {
        assert!(parse_pub_date(Some("not a date")).is_none());
        assert!(parse_pub_date(Some("")).is_none());
        assert!(parse_pub_date(None).is_none());
    }
}
