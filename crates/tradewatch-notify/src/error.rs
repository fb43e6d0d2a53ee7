/// Errors from the messaging-channel client.
///
/// `RateLimited` is the one variant the dispatcher treats specially: it
/// carries the channel-suggested wait before the single retry.
///
/// # Examples
///
/// ```rust
/// use tradewatch_notify::error::NotifyError;
///
/// let err = NotifyError::RateLimited { retry_after_secs: 5 };
/// assert!(err.to_string().contains("5"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The channel asked us to back off before sending again.
    #[error("Notify: rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The channel API rejected the request.
    #[error("Notify: API error: status={status}, body={body}")]
    Api { status: u16, body: String },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Notify: network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Channel configuration is missing a required value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience `Result` alias for channel operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
