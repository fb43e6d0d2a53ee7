//! Notification delivery.
//!
//! Formatted alert payloads leave the pipeline through a [`NotifyChannel`].
//! The built-in implementation ([`telegram::TelegramChannel`]) posts to the
//! Telegram Bot API; rate limiting surfaces as
//! [`error::NotifyError::RateLimited`] so the dispatcher can honor the
//! suggested wait.

pub mod error;
pub mod telegram;


pub use error::NotifyError;
pub use telegram::TelegramChannel;

use async_trait::async_trait;

/// A delivery channel for notification payloads.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Delivers one payload. Errors classify the failure; they never retry
    /// internally — retry policy belongs to the dispatcher.
    async fn send(&self, text: &str) -> error::Result<()>;

    /// Returns the channel type name (e.g., `"telegram"`).
    fn channel_name(&self) -> &str;
}
