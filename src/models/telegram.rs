//! Inbound Telegram update wire types
//!
//! Field names follow the Bot API payloads delivered to the webhook. Only the
//! subset the dispatcher consumes is modeled.

use serde::Deserialize;

/// Update envelope: carries either a callback query (button press) or a plain
/// chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub callback_query: Option<TelegramCallbackQuery>,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramCallbackQuery {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chat: Option<TelegramChat>,
    #[serde(default)]
    pub from: Option<TelegramUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

impl TelegramCallbackQuery {
    /// Chat to reply in: the chat the button message lives in, falling back
    /// to the sender's private chat.
    pub fn chat_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .and_then(|m| m.chat.as_ref().map(|c| c.id))
            .or_else(|| self.from.as_ref().map(|u| u.id))
    }
}

impl TelegramMessage {
    pub fn chat_id(&self) -> Option<i64> {
        self.chat
            .as_ref()
            .map(|c| c.id)
            .or_else(|| self.from.as_ref().map(|u| u.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_callback_update() {
        let update: TelegramUpdate = serde_json::from_str(
            r#"{
                "update_id": 7,
                "callback_query": {
                    "id": "cb-1",
                    "data": "approve:abcdef",
                    "from": {"id": 42},
                    "message": {"message_id": 9, "chat": {"id": 100}}
                }
            }"#,
        )
        .unwrap();

        let callback = update.callback_query.unwrap();
        assert_eq!(callback.data.as_deref(), Some("approve:abcdef"));
        assert_eq!(callback.chat_id(), Some(100));
    }

    #[test]
    fn callback_chat_falls_back_to_sender() {
        let callback: TelegramCallbackQuery =
            serde_json::from_str(r#"{"id": "cb-1", "data": "x", "from": {"id": 42}}"#).unwrap();

        assert_eq!(callback.chat_id(), Some(42));
    }

    #[test]
    fn tolerates_unknown_fields_and_missing_parts() {
        let update: TelegramUpdate = serde_json::from_str(
            r#"{"update_id": 1, "message": {"message_id": 2, "text": "hi", "chat": {"id": 5, "type": "private"}, "extra": true}}"#,
        )
        .unwrap();

        assert!(update.callback_query.is_none());
        assert_eq!(update.message.unwrap().chat_id(), Some(5));
    }
}
