//! Telegram Bot API client
//!
//! Thin JSON-over-HTTP wrapper around the handful of Bot API methods the
//! review flow needs. Delivery is best-effort: an unconfigured or disabled
//! bot short-circuits to `None`, and callers treat a lost message as
//! retryable on the next natural trigger.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::TelegramOptions;
use crate::error::{Error, Result};
use crate::models::Candidate;

const API_BASE_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT_SECS: u64 = 30;

/// Outbound chat surface used by the review workflow.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce a new candidate with Approve/Reject buttons. Returns the
    /// message id when the transport accepted the message.
    async fn send_candidate(&self, candidate: &Candidate, callback_token: &str)
        -> Result<Option<i64>>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Option<i64>>;

    /// Present one button per street option; buttons carry
    /// `street:<token>:<index>`.
    async fn send_street_selection(
        &self,
        chat_id: &str,
        prompt: &str,
        options: &[String],
        callback_token: &str,
    ) -> Result<Option<i64>>;

    async fn answer_callback(&self, callback_id: &str, text: &str, show_alert: bool) -> Result<()>;

    async fn remove_inline_keyboard(&self, chat_id: i64, message_id: i64) -> Result<()>;

    async fn update_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;
}

/// HTTP implementation over the Bot API.
pub struct TelegramNotifier {
    http_client: reqwest::Client,
    options: TelegramOptions,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramNotifier {
    pub fn new(options: TelegramOptions) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http_client, options })
    }

    /// Best-effort webhook registration at startup. Failures are logged and
    /// the service keeps running; updates simply stop arriving until the
    /// webhook is registered out of band.
    pub async fn setup_webhook(&self) -> Result<bool> {
        if !self.options.enabled {
            return Ok(false);
        }

        let webhook_url = match self.options.webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                tracing::info!("Webhook setup skipped: no webhook URL configured");
                return Ok(false);
            }
        };

        self.call("setWebhook", json!({ "url": webhook_url, "drop_pending_updates": false }))
            .await?;
        tracing::info!(url = webhook_url, "Telegram webhook configured");
        Ok(true)
    }

    fn bot_token(&self) -> Option<&str> {
        if !self.options.enabled {
            return None;
        }

        self.options
            .bot_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Value> {
        let token = self
            .bot_token()
            .ok_or_else(|| Error::Telegram("bot token is not configured".to_string()))?;

        let url = format!("{}/bot{}/{}", API_BASE_URL, token, method);
        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(Error::Telegram(format!(
                "{} failed with status {}",
                method,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    async fn send_payload(&self, chat_id: &str, mut payload: Value) -> Result<Option<i64>> {
        if self.bot_token().is_none() || chat_id.trim().is_empty() {
            warn!("Telegram bot token or chat id is missing");
            return Ok(None);
        }

        payload["chat_id"] = Value::String(chat_id.to_string());

        let response = self.call("sendMessage", payload).await?;
        let parsed: SendMessageResponse =
            serde_json::from_value(response).unwrap_or(SendMessageResponse { result: None });
        Ok(parsed.result.map(|message| message.message_id))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_candidate(
        &self,
        candidate: &Candidate,
        callback_token: &str,
    ) -> Result<Option<i64>> {
        let chat_id = match self.options.chat_id.as_deref() {
            Some(chat_id) if !chat_id.trim().is_empty() => chat_id.to_string(),
            _ => {
                warn!("Telegram chat id is missing, candidate not announced");
                return Ok(None);
            }
        };

        let payload = json!({
            "text": build_candidate_message(candidate),
            "parse_mode": "HTML",
            "reply_markup": {
                "inline_keyboard": [[
                    { "text": "Approve", "callback_data": format!("approve:{}", callback_token) },
                    { "text": "Reject", "callback_data": format!("reject:{}", callback_token) },
                ]]
            }
        });

        self.send_payload(&chat_id, payload).await
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Option<i64>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let payload = json!({
            "text": escape_html(text),
            "parse_mode": "HTML",
        });

        self.send_payload(chat_id, payload).await
    }

    async fn send_street_selection(
        &self,
        chat_id: &str,
        prompt: &str,
        options: &[String],
        callback_token: &str,
    ) -> Result<Option<i64>> {
        let keyboard: Vec<Vec<Value>> = options
            .iter()
            .enumerate()
            .map(|(index, option)| {
                vec![json!({
                    "text": option,
                    "callback_data": format!("street:{}:{}", callback_token, index),
                })]
            })
            .collect();

        let payload = json!({
            "text": escape_html(prompt),
            "parse_mode": "HTML",
            "reply_markup": { "inline_keyboard": keyboard }
        });

        self.send_payload(chat_id, payload).await
    }

    async fn answer_callback(&self, callback_id: &str, text: &str, show_alert: bool) -> Result<()> {
        if callback_id.trim().is_empty() {
            return Ok(());
        }

        self.call(
            "answerCallbackQuery",
            json!({
                "callback_query_id": callback_id,
                "text": text,
                "show_alert": show_alert,
            }),
        )
        .await?;
        Ok(())
    }

    async fn remove_inline_keyboard(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.call(
            "editMessageReplyMarkup",
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "reply_markup": { "inline_keyboard": [] },
            }),
        )
        .await?;
        Ok(())
    }

    async fn update_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        self.call(
            "editMessageText",
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text,
                "parse_mode": "HTML",
            }),
        )
        .await?;
        Ok(())
    }
}

/// HTML-formatted announcement for a new candidate.
pub fn build_candidate_message(candidate: &Candidate) -> String {
    let mut message = format!("<b>{}</b>\n", escape_html(&candidate.title));

    if !candidate.link.trim().is_empty() {
        message.push_str(&format!(
            "<a href=\"{}\">Open article</a>\n",
            escape_html(&candidate.link)
        ));
    }

    if let Some(published_at) = candidate.published_at {
        message.push_str(&format!(
            "Published: {}\n",
            published_at.format("%Y-%m-%d %H:%M")
        ));
    }

    if let Some(summary) = candidate.summary.as_deref() {
        if !summary.trim().is_empty() {
            message.push('\n');
            message.push_str(&escape_html(summary));
            message.push('\n');
        }
    }

    message
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape_html("a & <b> > c"), "a &amp; &lt;b&gt; &gt; c");
    }

    #[test]
    fn candidate_message_includes_title_link_and_summary() {
        let candidate = Candidate::new(
            "id-1",
            "Fire <downtown>",
            "https://example.com/a?x=1&y=2",
            Some(chrono::Utc.with_ymd_and_hms(2025, 8, 5, 10, 30, 0).unwrap()),
            Some("Big & serious".to_string()),
        );

        let message = build_candidate_message(&candidate);

        assert!(message.contains("<b>Fire &lt;downtown&gt;</b>"));
        assert!(message.contains("https://example.com/a?x=1&amp;y=2"));
        assert!(message.contains("Published: 2025-08-05 10:30"));
        assert!(message.contains("Big &amp; serious"));
    }

    #[test]
    fn candidate_message_omits_absent_parts() {
        let candidate = Candidate::new("id-1", "Fire", "", None, None);
        let message = build_candidate_message(&candidate);

        assert!(!message.contains("Open article"));
        assert!(!message.contains("Published:"));
    }
}
