//! Configuration resolution
//!
//! Values come from a TOML file overridden by environment variables
//! (`FIREWATCH_*`). Environment wins so deployments can inject secrets
//! without touching the config file.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

const DEFAULT_RSS_POLL_SECONDS: u64 = 60;
const DEFAULT_SWEEP_POLL_SECONDS: u64 = 30;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramOptions,
    pub rss: RssOptions,
    pub supabase: SupabaseOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramOptions {
    /// Master switch; a disabled bot sends nothing and registers no webhook
    pub enabled: bool,
    pub bot_token: Option<String>,
    /// Chat that receives candidates; doubles as the authorization id for
    /// inbound updates. Unset means open mode: every chat is authorized.
    pub chat_id: Option<String>,
    /// Public URL registered with Telegram's setWebhook at startup
    pub webhook_url: Option<String>,
}

impl Default for TelegramOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            chat_id: None,
            webhook_url: None,
        }
    }
}

impl TelegramOptions {
    pub fn is_configured(&self) -> bool {
        self.enabled && self.bot_token.is_some() && self.chat_id.is_some()
    }

    /// Authorization check for inbound updates: string equality of the
    /// expected id against either the chat id or the sender id. Open mode
    /// (no expected id) authorizes everything.
    pub fn authorizes(&self, chat_id: Option<i64>, user_id: Option<i64>) -> bool {
        let expected = match self.chat_id.as_deref() {
            Some(expected) if !expected.trim().is_empty() => expected,
            _ => return true,
        };

        chat_id.map(|id| id.to_string()) == Some(expected.to_string())
            || user_id.map(|id| id.to_string()) == Some(expected.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RssOptions {
    pub feed_url: Option<String>,
    pub poll_interval_seconds: u64,
    /// Case-insensitive substring filters over title + summary. Empty list
    /// matches every item.
    pub keywords: Vec<String>,
}

impl Default for RssOptions {
    fn default() -> Self {
        Self {
            feed_url: None,
            poll_interval_seconds: DEFAULT_RSS_POLL_SECONDS,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupabaseOptions {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub poll_interval_seconds: u64,
    /// Photo URL to persist when the article yields none
    pub default_photo_url: Option<String>,
}

impl Default for SupabaseOptions {
    fn default() -> Self {
        Self {
            url: None,
            service_role_key: None,
            poll_interval_seconds: DEFAULT_SWEEP_POLL_SECONDS,
            default_photo_url: None,
        }
    }
}

impl SupabaseOptions {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.service_role_key.is_some()
    }
}

/// Load configuration: TOML file (when present), then environment overrides.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
            let parsed: AppConfig = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?;
            info!("Configuration loaded from {}", path.display());
            parsed
        }
        Some(path) => {
            info!("Config file {} not found, using defaults", path.display());
            AppConfig::default()
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(value) = env_string("FIREWATCH_TELEGRAM_BOT_TOKEN") {
        config.telegram.bot_token = Some(value);
    }
    if let Some(value) = env_string("FIREWATCH_TELEGRAM_CHAT_ID") {
        config.telegram.chat_id = Some(value);
    }
    if let Some(value) = env_string("FIREWATCH_TELEGRAM_WEBHOOK_URL") {
        config.telegram.webhook_url = Some(value);
    }
    if let Some(value) = env_string("FIREWATCH_RSS_FEED_URL") {
        config.rss.feed_url = Some(value);
    }
    if let Some(value) = env_string("FIREWATCH_SUPABASE_URL") {
        config.supabase.url = Some(value);
    }
    if let Some(value) = env_string("FIREWATCH_SUPABASE_SERVICE_ROLE_KEY") {
        config.supabase.service_role_key = Some(value);
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();

        assert!(config.telegram.enabled);
        assert_eq!(config.rss.poll_interval_seconds, 60);
        assert_eq!(config.supabase.poll_interval_seconds, 30);
        assert!(!config.supabase.is_configured());
    }

    #[test]
    fn parses_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [telegram]
            bot_token = "123:abc"
            chat_id = "42"

            [rss]
            feed_url = "https://news.example.com/rss"
            poll_interval_seconds = 15
            keywords = ["incendiu", "fire"]

            [supabase]
            url = "https://xyz.supabase.co"
            service_role_key = "key"
            "#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();

        assert!(config.telegram.is_configured());
        assert_eq!(config.rss.poll_interval_seconds, 15);
        assert_eq!(config.rss.keywords.len(), 2);
        assert!(config.supabase.is_configured());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        // Asserts only on fields with no env override, so this test cannot
        // race the env-override test in the same process.
        let config = load(Some(Path::new("/nonexistent/firewatch.toml"))).unwrap();
        assert_eq!(config.rss.poll_interval_seconds, 60);
        assert!(config.rss.keywords.is_empty());
        assert!(config.telegram.enabled);
    }

    #[test]
    fn env_overrides_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[rss]\nfeed_url = \"https://file.example.com/rss\"\n").unwrap();

        std::env::set_var("FIREWATCH_RSS_FEED_URL", "https://env.example.com/rss");
        let config = load(Some(file.path())).unwrap();
        std::env::remove_var("FIREWATCH_RSS_FEED_URL");

        assert_eq!(
            config.rss.feed_url.as_deref(),
            Some("https://env.example.com/rss")
        );
    }

    #[test]
    fn open_mode_authorizes_everything() {
        let options = TelegramOptions::default();

        assert!(options.authorizes(Some(1), None));
        assert!(options.authorizes(None, None));
    }

    #[test]
    fn authorization_matches_chat_or_user_id() {
        let options = TelegramOptions {
            chat_id: Some("42".to_string()),
            ..TelegramOptions::default()
        };

        assert!(options.authorizes(Some(42), None));
        assert!(options.authorizes(None, Some(42)));
        assert!(options.authorizes(Some(7), Some(42)));
        assert!(!options.authorizes(Some(7), Some(8)));
        assert!(!options.authorizes(None, None));
    }
}
