//! Mail-source client.
//!
//! The pipeline consumes mailboxes through the [`MailSource`] trait: list
//! message ids for a time window and sender, then fetch individual messages.
//! The default implementation ([`gmail::GmailClient`]) talks to the Gmail
//! REST API with a bearer token read from a token file; acquiring and
//! refreshing that token is the deployment's concern, not this crate's.

pub mod error;
pub mod gmail;

pub use gmail::GmailClient;

use async_trait::async_trait;
use chrono::NaiveDate;

use error::Result;

/// A raw message as the pipeline sees it: routing headers plus decoded body.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    /// The `Date` header as reported by the source, unparsed.
    pub date: String,
    pub body: String,
}

/// Read-only access to a mailbox.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Ids of messages received on or after `since` from `sender`, newest
    /// data the source has; order is source-defined.
    async fn list_message_ids(&self, since: NaiveDate, sender: &str) -> Result<Vec<String>>;

    /// Full content of one message, with the body decoded to text.
    async fn fetch_message(&self, id: &str) -> Result<MailMessage>;
}
