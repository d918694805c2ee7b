//! Data types for candidate review and incident persistence

mod article;
mod candidate;
mod incident;
mod pending;
mod telegram;

pub use article::ArticleDetails;
pub use candidate::Candidate;
pub use incident::Incident;
pub use pending::{Decision, PendingCandidate, PersistState};
pub use telegram::{TelegramCallbackQuery, TelegramChat, TelegramMessage, TelegramUpdate, TelegramUser};
