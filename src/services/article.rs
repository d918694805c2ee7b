//! Article page scraping
//!
//! Pulls a representative photo (OpenGraph/Twitter meta, falling back to the
//! first article image) and street mentions out of the linked article. Street
//! detection is a best-effort regex over the page text; its hits are only
//! suggestions the reviewer picks from. Any fetch or parse trouble yields
//! empty details, never an error.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::warn;

use crate::error::Result;
use crate::models::{ArticleDetails, Candidate};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; firewatch/0.1)";
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Street mention pattern: Romanian and Russian street-type prefixes followed
/// by a capitalized name.
const STREET_PATTERN: &str = r"\b(?:Strada|strada|Str\.|str\.|Bulevardul|Bulevard|bd\.|bd|Bul\.|bul\.|Aleea|Șoseaua|Soseaua|Prospectul|ул\.|улица|проспект|пр-т)\s+[A-ZĂÂÎȘȚ][^,\n]{2,60}";

/// Source of scraped article details.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Failures degrade to empty details; candidates without a photo or
    /// detected street still go through the review flow.
    async fn fetch_details(&self, candidate: &Candidate) -> ArticleDetails;
}

pub struct HttpArticleFetcher {
    http_client: reqwest::Client,
    street_regex: Regex,
    whitespace_regex: Regex,
    meta_photo_selector: Selector,
    article_image_selector: Selector,
    any_image_selector: Selector,
    article_selector: Selector,
}

impl HttpArticleFetcher {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;

        let street_regex = Regex::new(STREET_PATTERN)
            .map_err(|e| crate::error::Error::Config(format!("street pattern: {}", e)))?;
        let whitespace_regex = Regex::new(r"\s+")
            .map_err(|e| crate::error::Error::Config(format!("whitespace pattern: {}", e)))?;

        Ok(Self {
            http_client,
            street_regex,
            whitespace_regex,
            meta_photo_selector: parse_selector(
                r#"meta[property="og:image"], meta[name="og:image"], meta[property="twitter:image"], meta[name="twitter:image"]"#,
            )?,
            article_image_selector: parse_selector("article img")?,
            any_image_selector: parse_selector("img")?,
            article_selector: parse_selector("article")?,
        })
    }

    /// Extract details from already-fetched HTML. Split out from the HTTP
    /// path so parsing is testable against static pages.
    pub fn extract_details(&self, html: &str, base_url: &Url) -> ArticleDetails {
        let document = Html::parse_document(html);

        ArticleDetails {
            photo_url: self.resolve_photo_url(&document, base_url),
            streets: self.resolve_streets(&document),
        }
    }

    fn resolve_photo_url(&self, document: &Html, base_url: &Url) -> Option<String> {
        let meta_photo = document
            .select(&self.meta_photo_selector)
            .find_map(|meta| meta.value().attr("content"))
            .filter(|content| !content.trim().is_empty());

        let photo = meta_photo.or_else(|| {
            document
                .select(&self.article_image_selector)
                .chain(document.select(&self.any_image_selector))
                .find_map(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
                .filter(|src| !src.trim().is_empty())
        })?;

        normalize_url(base_url, photo)
    }

    fn resolve_streets(&self, document: &Html) -> Vec<String> {
        let article_text = document
            .select(&self.article_selector)
            .next()
            .map(|article| article.text().collect::<String>())
            .unwrap_or_else(|| document.root_element().text().collect::<String>());

        if article_text.trim().is_empty() {
            return Vec::new();
        }

        let normalized = self.whitespace_regex.replace_all(&article_text, " ");

        let mut streets: Vec<String> = Vec::new();
        for found in self.street_regex.find_iter(normalized.trim()) {
            let street = found.as_str().trim();
            if street.is_empty() {
                continue;
            }

            if !streets.iter().any(|seen| seen.eq_ignore_ascii_case(street)) {
                streets.push(street.to_string());
            }
        }

        streets
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_details(&self, candidate: &Candidate) -> ArticleDetails {
        if candidate.link.trim().is_empty() {
            return ArticleDetails::empty();
        }

        let base_url = match Url::parse(&candidate.link) {
            Ok(url) => url,
            Err(_) => return ArticleDetails::empty(),
        };

        let response = match self.http_client.get(base_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %base_url, "Unable to fetch article details: {}", e);
                return ArticleDetails::empty();
            }
        };

        if !response.status().is_success() {
            warn!(url = %base_url, status = %response.status(), "Article fetch failed");
            return ArticleDetails::empty();
        }

        match response.text().await {
            Ok(html) if !html.trim().is_empty() => self.extract_details(&html, &base_url),
            Ok(_) => ArticleDetails::empty(),
            Err(e) => {
                warn!(url = %base_url, "Unable to read article body: {}", e);
                ArticleDetails::empty()
            }
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| crate::error::Error::Config(format!("selector {:?}: {}", selector, e)))
}

fn normalize_url(base_url: &Url, raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => base_url.join(raw).ok().map(|joined| joined.to_string()),
    }
}
