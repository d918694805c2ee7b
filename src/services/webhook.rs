//! Webhook update dispatcher
//!
//! Translates inbound Telegram updates into store transitions:
//!
//! - `/start` → configuration summary
//! - free-text message → manual street entry, when the chat was prompted
//! - `approve:`/`reject:` callbacks → decision, then street options
//! - `street:` callbacks → street selection or manual-entry prompt, then
//!   immediate persistence (the fast path; the sweep is the safety net)
//!
//! Race losers (a second approve, a second street pick, a concurrent
//! persistence attempt) get an "already processed" style reply and no state
//! changes. Unresolvable tokens get an "expired" reply; after a restart every
//! old button lands here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{
    ArticleDetails, Decision, Incident, TelegramCallbackQuery, TelegramUpdate,
};
use crate::services::article::ArticleFetcher;
use crate::services::callback::{self, CallbackAction};
use crate::services::persist::{persist_selected_street, PersistOutcome};
use crate::services::repository::IncidentRepository;
use crate::services::telegram::Notifier;
use crate::store::CandidateStore;

const MANUAL_STREET_OPTION: &str = "Enter manually";
const UNKNOWN_STREET_OPTION: &str = "(unknown)";
const STATUS_MARKER: &str = "<b>Status:</b>";

pub struct WebhookHandler {
    store: Arc<CandidateStore>,
    notifier: Arc<dyn Notifier>,
    repository: Arc<dyn IncidentRepository>,
    article_fetcher: Arc<dyn ArticleFetcher>,
    config: Arc<AppConfig>,
}

impl WebhookHandler {
    pub fn new(
        store: Arc<CandidateStore>,
        notifier: Arc<dyn Notifier>,
        repository: Arc<dyn IncidentRepository>,
        article_fetcher: Arc<dyn ArticleFetcher>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            repository,
            article_fetcher,
            config,
        }
    }

    /// Dispatch one update. Returns whether the update was acted on.
    pub async fn handle_update(&self, update: TelegramUpdate) -> Result<bool> {
        if self.try_handle_start(&update).await? {
            return Ok(true);
        }

        if self.try_handle_manual_street(&update).await? {
            return Ok(true);
        }

        let Some(callback) = update.callback_query.as_ref() else {
            debug!(update_id = update.update_id, "Ignoring non-callback update");
            return Ok(false);
        };
        let Some(data) = callback.data.as_deref() else {
            debug!(update_id = update.update_id, "Ignoring callback without data");
            return Ok(false);
        };

        let chat_id = callback.message.as_ref().and_then(|m| m.chat.as_ref()).map(|c| c.id);
        let user_id = callback.from.as_ref().map(|u| u.id);
        if !self.config.telegram.authorizes(chat_id, user_id) {
            warn!("Ignoring callback from unauthorized chat");
            self.answer(callback, "Not authorized.").await?;
            return Ok(false);
        }

        let Some(action) = callback::parse(data) else {
            warn!(data, "Unable to parse callback data");
            self.answer(callback, "Unable to parse action.").await?;
            return Ok(false);
        };

        let Some(candidate_id) = self.store.candidate_id_for_token(action.token()) else {
            warn!(token = action.token(), "Unable to resolve callback token");
            self.answer(callback, "This action has expired.").await?;
            return Ok(false);
        };

        match action {
            CallbackAction::SelectStreet { index, .. } => {
                self.handle_street_selection(callback, &candidate_id, index).await
            }
            CallbackAction::Approve { token } => {
                self.handle_decision(callback, &candidate_id, &token, Decision::Approved)
                    .await
            }
            CallbackAction::Reject { token } => {
                self.handle_decision(callback, &candidate_id, &token, Decision::Rejected)
                    .await
            }
        }
    }

    async fn handle_decision(
        &self,
        callback: &TelegramCallbackQuery,
        candidate_id: &str,
        callback_token: &str,
        decision: Decision,
    ) -> Result<bool> {
        if !self.store.try_set_decision(candidate_id, decision) {
            warn!(candidate_id, "Candidate decision could not be updated");
            self.answer(callback, "Unable to update this item.").await?;
            return Ok(false);
        }

        let Some(pending) = self.store.get(candidate_id) else {
            warn!(candidate_id, "Candidate could not be loaded after decision");
            return Ok(false);
        };

        let Some(chat_id) = callback.chat_id() else {
            warn!(candidate_id, "Missing chat id, decision response not sent");
            return Ok(false);
        };
        let chat = chat_id.to_string();

        self.remove_inline_keyboard(callback).await;
        self.append_status_line(callback, decision).await;

        if decision == Decision::Rejected {
            self.answer(callback, "Rejected.").await?;
            self.notifier
                .send_message(&chat, "This article will be ignored and will not be considered.")
                .await?;
            info!(candidate_id, "Candidate rejected");
            return Ok(true);
        }

        let details = self
            .article_fetcher
            .fetch_details(pending.candidate())
            .await;
        let options = build_street_options(&details);

        if !self.store.try_set_street_options(candidate_id, options.clone()) {
            warn!(candidate_id, "Unable to store street options");
            self.answer(callback, "Unable to prepare street options.").await?;
            return Ok(false);
        }

        self.answer(callback, "Approved. Select a street.").await?;
        self.notifier
            .send_street_selection(
                &chat,
                "Select the street to insert for this incident:",
                &options,
                callback_token,
            )
            .await?;

        info!(candidate_id, "Candidate approved, street options presented");
        Ok(true)
    }

    async fn handle_street_selection(
        &self,
        callback: &TelegramCallbackQuery,
        candidate_id: &str,
        index: usize,
    ) -> Result<bool> {
        let Some(pending) = self.store.get(candidate_id) else {
            warn!(candidate_id, "Candidate could not be loaded for street selection");
            self.answer(callback, "This action has expired.").await?;
            return Ok(false);
        };

        let options = pending.street_options();
        let Some(selected_street) = options.get(index).cloned() else {
            warn!(candidate_id, index, "Street selection out of range");
            self.answer(callback, "Unknown street selection.").await?;
            return Ok(false);
        };

        let Some(chat_id) = callback.chat_id() else {
            warn!(candidate_id, "Missing chat id, street selection not handled");
            return Ok(false);
        };
        let chat = chat_id.to_string();

        self.remove_inline_keyboard(callback).await;

        if selected_street.eq_ignore_ascii_case(MANUAL_STREET_OPTION) {
            if !self.store.try_begin_manual_street(candidate_id, &chat) {
                warn!(candidate_id, "Manual street entry could not be started");
                self.answer(callback, "Already awaiting a manual street.").await?;
                return Ok(false);
            }

            self.answer(callback, "Send the street name in chat.").await?;
            self.notifier
                .send_message(&chat, "Please type the street name to use for this incident.")
                .await?;
            return Ok(true);
        }

        if !self.store.try_select_street(candidate_id, &selected_street) {
            warn!(candidate_id, "Street selection could not be updated");
            self.answer(callback, "Street already selected.").await?;
            return Ok(false);
        }

        let outcome =
            persist_selected_street(&self.store, &self.repository, pending.candidate(), &selected_street)
                .await;
        self.report_persist_outcome(&chat, &selected_street, outcome, Some(callback))
            .await?;
        Ok(true)
    }

    async fn try_handle_manual_street(&self, update: &TelegramUpdate) -> Result<bool> {
        let Some(message) = update.message.as_ref() else {
            return Ok(false);
        };
        let Some(text) = message.text.as_deref() else {
            return Ok(false);
        };
        if is_start_command(text) {
            return Ok(false);
        }

        let chat_id = message.chat.as_ref().map(|c| c.id);
        let user_id = message.from.as_ref().map(|u| u.id);
        if !self.config.telegram.authorizes(chat_id, user_id) {
            warn!("Ignoring manual street entry from unauthorized chat");
            return Ok(false);
        }

        let Some(chat_id) = message.chat_id() else {
            warn!("Manual street entry missing chat id");
            return Ok(false);
        };
        let chat = chat_id.to_string();

        let Some(candidate_id) = self.store.manual_request_for_chat(&chat) else {
            return Ok(false);
        };

        let Some(pending) = self.store.get(&candidate_id) else {
            warn!(%candidate_id, "Manual street entry candidate could not be loaded");
            self.store.clear_manual_request(&chat, &candidate_id);
            return Ok(false);
        };

        let selected_street = text.trim();
        if selected_street.is_empty() {
            self.notifier
                .send_message(&chat, "Please send a valid street name.")
                .await?;
            return Ok(true);
        }

        if !self.store.try_select_manual_street(&candidate_id, selected_street) {
            warn!(%candidate_id, "Manual street selection could not be updated");
            self.notifier.send_message(&chat, "Street already selected.").await?;
            self.store.clear_manual_request(&chat, &candidate_id);
            return Ok(true);
        }

        self.store.clear_manual_request(&chat, &candidate_id);

        let outcome =
            persist_selected_street(&self.store, &self.repository, pending.candidate(), selected_street)
                .await;
        self.report_persist_outcome(&chat, selected_street, outcome, None).await?;
        Ok(true)
    }

    async fn try_handle_start(&self, update: &TelegramUpdate) -> Result<bool> {
        let Some(message) = update.message.as_ref() else {
            return Ok(false);
        };
        let Some(text) = message.text.as_deref() else {
            return Ok(false);
        };
        if !is_start_command(text) {
            return Ok(false);
        }

        let chat_id = message.chat.as_ref().map(|c| c.id);
        let user_id = message.from.as_ref().map(|u| u.id);
        if !self.config.telegram.authorizes(chat_id, user_id) {
            warn!("Ignoring /start from unauthorized chat");
            return Ok(false);
        }

        if !self.config.telegram.enabled {
            info!("Ignoring /start because Telegram is disabled");
            return Ok(false);
        }

        let Some(chat_id) = message.chat_id() else {
            return Ok(false);
        };

        self.notifier
            .send_message(&chat_id.to_string(), &self.build_configuration_message())
            .await?;
        Ok(true)
    }

    fn build_configuration_message(&self) -> String {
        let rss = &self.config.rss;
        let supabase_configured = if self.config.supabase.is_configured() {
            "yes"
        } else {
            "no"
        };

        format!(
            "Configuration\nRSS feed: {}\nRSS poll interval: {}s\nRSS keywords: {}\nSupabase configured: {}",
            rss.feed_url.as_deref().unwrap_or("(not set)"),
            rss.poll_interval_seconds,
            rss.keywords.len(),
            supabase_configured,
        )
    }

    async fn report_persist_outcome(
        &self,
        chat: &str,
        street: &str,
        outcome: PersistOutcome,
        callback: Option<&TelegramCallbackQuery>,
    ) -> Result<()> {
        match outcome {
            PersistOutcome::AlreadyInFlight => {
                if let Some(callback) = callback {
                    self.answer(callback, "Already processing.").await?;
                }
                self.notifier
                    .send_message(chat, "This article is already being processed.")
                    .await?;
            }
            PersistOutcome::Inserted(inserted) => {
                if let Some(callback) = callback {
                    self.answer(callback, &format!("Selected: {}", street)).await?;
                }
                let response = match inserted {
                    Some(incident) => build_approval_response(&incident),
                    None => {
                        "Supabase is not configured, so the approved article was not inserted."
                            .to_string()
                    }
                };
                self.notifier.send_message(chat, &response).await?;
            }
            PersistOutcome::Failed => {
                if let Some(callback) = callback {
                    self.answer(callback, "Insert failed, please retry.").await?;
                }
                self.notifier
                    .send_message(
                        chat,
                        "Failed to insert the approved article into Supabase. Please retry.",
                    )
                    .await?;
            }
        }

        Ok(())
    }

    async fn answer(&self, callback: &TelegramCallbackQuery, text: &str) -> Result<()> {
        let Some(callback_id) = callback.id.as_deref().filter(|id| !id.trim().is_empty()) else {
            return Ok(());
        };

        self.notifier.answer_callback(callback_id, text, true).await
    }

    /// Cosmetic edit; failures are logged and ignored.
    async fn remove_inline_keyboard(&self, callback: &TelegramCallbackQuery) {
        let Some(message) = callback.message.as_ref() else {
            return;
        };
        let Some(chat) = message.chat.as_ref() else {
            return;
        };

        if let Err(e) = self
            .notifier
            .remove_inline_keyboard(chat.id, message.message_id)
            .await
        {
            warn!("Failed to remove inline keyboard: {}", e);
        }
    }

    /// Append a status line to the original candidate message, once.
    /// Cosmetic edit; failures are logged and ignored.
    async fn append_status_line(&self, callback: &TelegramCallbackQuery, decision: Decision) {
        let Some(message) = callback.message.as_ref() else {
            return;
        };
        let Some(chat) = message.chat.as_ref() else {
            return;
        };
        let Some(updated) = build_status_message(message.text.as_deref(), decision) else {
            return;
        };

        if let Err(e) = self
            .notifier
            .update_message_text(chat.id, message.message_id, &updated)
            .await
        {
            warn!("Failed to update message status: {}", e);
        }
    }
}

/// Street options offered to the reviewer: detected streets (trimmed,
/// deduplicated case-insensitively), `(unknown)` when nothing was detected,
/// plus the manual-entry option.
pub fn build_street_options(details: &ArticleDetails) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for street in &details.streets {
        let street = street.trim();
        if street.is_empty() {
            continue;
        }
        if !options.iter().any(|seen| seen.eq_ignore_ascii_case(street)) {
            options.push(street.to_string());
        }
    }

    if options.is_empty() {
        options.push(UNKNOWN_STREET_OPTION.to_string());
    }

    if !options
        .iter()
        .any(|option| option.eq_ignore_ascii_case(MANUAL_STREET_OPTION))
    {
        options.push(MANUAL_STREET_OPTION.to_string());
    }

    options
}

/// Status line appended to the candidate announcement after a decision.
/// `None` when there is nothing to edit or a status was already appended.
pub fn build_status_message(message: Option<&str>, decision: Decision) -> Option<String> {
    let message = message?.trim();
    if message.is_empty() {
        return None;
    }

    if message.to_lowercase().contains(&STATUS_MARKER.to_lowercase()) {
        return None;
    }

    let decision_text = match decision {
        Decision::Approved => "Approved",
        Decision::Rejected => "Rejected",
        Decision::Pending => return None,
    };

    Some(format!("{}\n\n{} {}", message, STATUS_MARKER, decision_text))
}

fn is_start_command(text: &str) -> bool {
    text.get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("/start"))
}

fn build_approval_response(incident: &Incident) -> String {
    format!(
        "Approved and inserted into Supabase:\nDatetime (UTC): {}\nStreet: {}\nPhoto URL: {}",
        incident.datetime.to_rfc3339(),
        incident.street,
        incident.photo_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_options_dedupe_and_append_manual_entry() {
        let details = ArticleDetails {
            photo_url: None,
            streets: vec![
                " Strada Mare ".to_string(),
                "strada mare".to_string(),
                "Bulevardul Dacia".to_string(),
            ],
        };

        assert_eq!(
            build_street_options(&details),
            [
                "Strada Mare".to_string(),
                "Bulevardul Dacia".to_string(),
                MANUAL_STREET_OPTION.to_string(),
            ]
        );
    }

    #[test]
    fn no_detected_streets_fall_back_to_unknown() {
        let details = ArticleDetails::empty();

        assert_eq!(
            build_street_options(&details),
            [UNKNOWN_STREET_OPTION.to_string(), MANUAL_STREET_OPTION.to_string()]
        );
    }

    #[test]
    fn detected_manual_entry_text_is_not_duplicated() {
        let details = ArticleDetails {
            photo_url: None,
            streets: vec!["enter manually".to_string()],
        };

        assert_eq!(build_street_options(&details), ["enter manually".to_string()]);
    }

    #[test]
    fn status_message_appends_once() {
        let first = build_status_message(Some("Fire on Main St"), Decision::Approved).unwrap();
        assert!(first.ends_with("<b>Status:</b> Approved"));

        assert!(build_status_message(Some(&first), Decision::Rejected).is_none());
        assert!(build_status_message(Some("  "), Decision::Approved).is_none());
        assert!(build_status_message(None, Decision::Approved).is_none());
    }
}
