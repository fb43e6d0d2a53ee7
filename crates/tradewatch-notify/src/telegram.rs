use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{NotifyError, Result};
use crate::NotifyChannel;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel: `sendMessage` to a fixed chat.
pub struct TelegramChannel {
    client: reqwest::Client,
    token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(token: &str, chat_id: &str) -> Result<Self> {
        if token.is_empty() || chat_id.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "telegram token and chat_id must be set".to_string(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

/// Maps a Bot API response to the channel error taxonomy. Telegram reports
/// rate limiting as HTTP 429 with `parameters.retry_after` in the body.
pub(crate) fn classify_response(status: u16, body: &str) -> Result<()> {
    if let Ok(parsed) = serde_json::from_str::<ApiResponse>(body) {
        if parsed.ok {
            return Ok(());
        }
        if let Some(retry_after_secs) = parsed.parameters.and_then(|p| p.retry_after) {
            return Err(NotifyError::RateLimited { retry_after_secs });
        }
    }
    Err(NotifyError::Api {
        status,
        body: body.to_string(),
    })
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{API_BASE}/bot{}/sendMessage", self.token);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
            }))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        classify_response(status, &body)
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}
