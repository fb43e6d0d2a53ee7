#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tradewatch_common::types::FieldSet;
use tradewatch_mail::error::{MailError, Result as MailResult};
use tradewatch_mail::{MailMessage, MailSource};
use tradewatch_notify::NotifyChannel;
use tradewatch_notify::error::{NotifyError, Result as NotifyResult};

pub fn fields() -> FieldSet {
    FieldSet::new(vec!["Ticker".into(), "Action".into()]).unwrap()
}

/// An alert email shaped like the production template: subject tag plus an
/// HTML paragraph opening with the first configured field.
pub fn alert_message(id: &str, name: &str, ticker: &str, action: &str) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        subject: format!("Alert: {name}"),
        date: "Mon, 6 Nov 2023 14:30:00 +0000".to_string(),
        body: format!("<p style=\"margin:0\">Ticker: {ticker}\r\nAction: {action}</p>"),
    }
}

/// In-memory mailbox the tests can grow between fetch cycles.
pub struct TestMailbox {
    messages: Mutex<Vec<MailMessage>>,
    pub list_calls: AtomicUsize,
}

impl TestMailbox {
    pub fn new(messages: Vec<MailMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, message: MailMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

#[async_trait]
impl MailSource for TestMailbox {
    async fn list_message_ids(&self, _since: NaiveDate, _sender: &str) -> MailResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.id.clone())
            .collect())
    }

    async fn fetch_message(&self, id: &str) -> MailResult<MailMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| MailError::Decode(format!("unknown message {id}")))
    }
}

/// A mailbox whose listing always fails, for backoff-budget tests.
pub struct UnreachableMailbox {
    pub list_calls: AtomicUsize,
}

impl UnreachableMailbox {
    pub fn new() -> Self {
        Self {
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MailSource for UnreachableMailbox {
    async fn list_message_ids(&self, _since: NaiveDate, _sender: &str) -> MailResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Err(MailError::Http {
            status: 503,
            body: "upstream unavailable".to_string(),
        })
    }

    async fn fetch_message(&self, id: &str) -> MailResult<MailMessage> {
        Err(MailError::Decode(format!("unknown message {id}")))
    }
}

/// Scripted per-call outcomes for the notification channel; once the script
/// is exhausted every send delivers.
pub enum SendScript {
    Deliver,
    RateLimited(u64),
    Reject,
}

pub struct ScriptedChannel {
    script: Mutex<VecDeque<SendScript>>,
    pub attempts: Mutex<Vec<String>>,
    pub delivered: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    pub fn new(script: Vec<SendScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotifyChannel for ScriptedChannel {
    async fn send(&self, text: &str) -> NotifyResult<()> {
        self.attempts.lock().unwrap().push(text.to_string());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendScript::Deliver);
        match outcome {
            SendScript::Deliver => {
                self.delivered.lock().unwrap().push(text.to_string());
                Ok(())
            }
            SendScript::RateLimited(retry_after_secs) => {
                Err(NotifyError::RateLimited { retry_after_secs })
            }
            SendScript::Reject => Err(NotifyError::Api {
                status: 400,
                body: "chat not found".to_string(),
            }),
        }
    }

    fn channel_name(&self) -> &str {
        "scripted"
    }
}
