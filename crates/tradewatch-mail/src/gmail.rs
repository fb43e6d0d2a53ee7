use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::{MailError, Result};
use crate::{MailMessage, MailSource};

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail REST API client authenticated with a pre-provisioned OAuth access
/// token. Session renewal is external: when the token expires, requests fail
/// with an HTTP error and the fetcher's retry/shutdown path takes over.
pub struct GmailClient {
    client: reqwest::Client,
    access_token: String,
}

impl GmailClient {
    /// Loads the access token from a `token.json`-style file. Both the
    /// `token` key (google-auth token files) and `access_token` are accepted.
    pub fn from_token_file(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct TokenFile {
            token: Option<String>,
            access_token: Option<String>,
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MailError::Token(format!("cannot read token file '{}': {e}", path.display()))
        })?;
        let parsed: TokenFile = serde_json::from_str(&content).map_err(|e| {
            MailError::Token(format!("cannot parse token file '{}': {e}", path.display()))
        })?;
        let token = parsed
            .token
            .or(parsed.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                MailError::Token(format!(
                    "token file '{}' has no access token",
                    path.display()
                ))
            })?;
        Ok(Self::with_token(token))
    }

    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MailError::Http {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    payload: MessagePayload,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    data: Option<String>,
}

#[async_trait]
impl MailSource for GmailClient {
    async fn list_message_ids(&self, since: NaiveDate, sender: &str) -> Result<Vec<String>> {
        let query = list_query(since, sender);
        let resp: ListResponse = self
            .get_json(
                &format!("{API_BASE}/messages"),
                &[("q", query.as_str())],
            )
            .await?;
        Ok(resp.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<MailMessage> {
        let resp: MessageResponse = self
            .get_json(&format!("{API_BASE}/messages/{id}"), &[])
            .await?;

        let subject = header_value(&resp.payload.headers, "Subject")
            .unwrap_or("No Subject")
            .to_string();
        let date = header_value(&resp.payload.headers, "Date")
            .unwrap_or("No Date")
            .to_string();

        let data = resp
            .payload
            .body
            .and_then(|b| b.data)
            .ok_or_else(|| MailError::Decode(format!("message {id} has no body data")))?;
        let body = decode_body(&data)?;

        Ok(MailMessage {
            id: id.to_string(),
            subject,
            date,
            body,
        })
    }
}

/// Gmail search expression for "received on or after `since`, from `sender`".
fn list_query(since: NaiveDate, sender: &str) -> String {
    format!("after:{} from:{sender}", since.format("%Y/%m/%d"))
}

fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}

/// Decodes the URL-safe base64 body payload Gmail returns into UTF-8 text.
fn decode_body(data: &str) -> Result<String> {
    // Gmail pads its url-safe base64; tolerate unpadded input too.
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(data))
        .map_err(|e| MailError::Decode(format!("invalid base64 body: {e}")))?;
    String::from_utf8(bytes).map_err(|e| MailError::Decode(format!("body is not utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_formats_window_and_sender() {
        let since = NaiveDate::from_ymd_opt(2023, 11, 6).unwrap();
        assert_eq!(
            list_query(since, "TradingView <noreply@tradingview.com>"),
            "after:2023/11/06 from:TradingView <noreply@tradingview.com>"
        );
    }

    #[test]
    fn decode_body_handles_padded_and_unpadded() {
        let padded = URL_SAFE.encode("Ticker: BTCUSD");
        assert_eq!(decode_body(&padded).unwrap(), "Ticker: BTCUSD");

        let unpadded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("Ticker: BTCUSD");
        assert_eq!(decode_body(&unpadded).unwrap(), "Ticker: BTCUSD");
    }

    #[test]
    fn decode_body_rejects_garbage() {
        assert!(decode_body("!!not base64!!").is_err());
    }

    #[test]
    fn header_lookup_is_exact_and_first_wins() {
        let headers = vec![
            Header {
                name: "Subject".to_string(),
                value: "Alert: Momentum Long".to_string(),
            },
            Header {
                name: "Subject".to_string(),
                value: "second".to_string(),
            },
        ];
        assert_eq!(
            header_value(&headers, "Subject"),
            Some("Alert: Momentum Long")
        );
        assert_eq!(header_value(&headers, "subject"), None);
    }

    #[test]
    fn token_file_accepts_google_auth_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"token": "ya29.abc", "refresh_token": "r"}"#).unwrap();
        let client = GmailClient::from_token_file(&path).unwrap();
        assert_eq!(client.access_token, "ya29.abc");
    }

    #[test]
    fn token_file_missing_token_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"refresh_token": "r"}"#).unwrap();
        match GmailClient::from_token_file(&path) {
            Err(MailError::Token(msg)) => assert!(msg.contains("no access token")),
            Err(other) => panic!("expected Token error, got {other:?}"),
            Ok(_) => panic!("expected Token error, got a client"),
        }
    }
}
