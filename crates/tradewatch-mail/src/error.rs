/// Errors from the mail-source client.
///
/// # Examples
///
/// ```rust
/// use tradewatch_mail::error::MailError;
///
/// let err = MailError::Token("token file missing".to_string());
/// assert!(err.to_string().contains("token file"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The mail API returned a non-2xx status code.
    #[error("Mail: API HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Mail: network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The access token could not be loaded from the token file.
    #[error("Mail: token error: {0}")]
    Token(String),

    /// A message body could not be decoded into text.
    #[error("Mail: body decode error: {0}")]
    Decode(String),
}

/// Convenience `Result` alias for mail-source operations.
pub type Result<T> = std::result::Result<T, MailError>;
