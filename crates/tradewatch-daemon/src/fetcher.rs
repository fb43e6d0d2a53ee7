use anyhow::{Result, anyhow};
use chrono::{Duration as ChronoDuration, Local, Timelike, Utc};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

use tradewatch_common::types::{FieldSet, NewAlert};
use tradewatch_mail::MailSource;
use tradewatch_store::AlertStore;

use crate::config::{FetchConfig, MailConfig};
use crate::context::DaemonContext;
use crate::extract::{alert_name_from_subject, extract_fields, extract_fragment, values_in_order};

/// Polls the mail source, extracts alert records, and persists them.
///
/// Each cycle is `Idle → Querying → (Success | Retrying) → Idle`: the mailbox
/// query retries with exponential backoff up to the configured budget, and an
/// exhausted budget is fatal — `run` returns an error and the orchestrator
/// tears the process down for its supervisor to restart.
pub struct Fetcher {
    store: Arc<AlertStore>,
    mail: Arc<dyn MailSource>,
    fields: FieldSet,
    mail_cfg: MailConfig,
    fetch_cfg: FetchConfig,
    ctx: DaemonContext,
}

impl Fetcher {
    pub fn new(
        store: Arc<AlertStore>,
        mail: Arc<dyn MailSource>,
        fields: FieldSet,
        mail_cfg: MailConfig,
        fetch_cfg: FetchConfig,
        ctx: DaemonContext,
    ) -> Self {
        Self {
            store,
            mail,
            fields,
            mail_cfg,
            fetch_cfg,
            ctx,
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.ctx.wait_start().await;
        tracing::info!(
            sender = %self.mail_cfg.sender,
            lookback_days = self.mail_cfg.lookback_days,
            "Alert fetcher started"
        );

        loop {
            if self.ctx.is_shutdown() {
                break;
            }

            let found = self.fetch_cycle().await?;
            if !found {
                // First empty cycle ends the startup-quiet window: everything
                // ingested before this point was backlog, not a live alert.
                self.ctx.clear_quiet();
                tracing::info!("No new alerts found");
            }

            let delay = next_poll_delay(Local::now().second());
            tracing::debug!(delay_secs = delay.as_secs(), "Checking again");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.ctx.cancelled() => break,
            }
        }
        Ok(())
    }

    /// One fetch cycle. Returns whether at least one new record was stored.
    pub async fn fetch_cycle(&self) -> Result<bool> {
        let ids = self.list_with_backoff().await?;
        let mut found = false;

        for id in ids {
            // Existence probe before downloading the full message.
            if self.store.contains(&id)? {
                continue;
            }

            let msg = self.mail.fetch_message(&id).await?;
            if !msg.subject.starts_with(&self.mail_cfg.subject_prefix) {
                continue;
            }

            let fragment =
                extract_fragment(&msg.body, self.fields.first_label()).unwrap_or(&msg.body);
            let info = extract_fields(fragment, &self.fields);
            let alert = NewAlert {
                message_id: msg.id.clone(),
                timestamp: msg.date.clone(),
                alert_name: alert_name_from_subject(&msg.subject, &self.mail_cfg.subject_prefix),
                fields: values_in_order(&info, &self.fields),
            };

            if self.store.insert_if_absent(&alert)? {
                found = true;
                tracing::info!(subject = %msg.subject, date = %msg.date, "Stored new alert");
            }
        }
        Ok(found)
    }

    async fn list_with_backoff(&self) -> Result<Vec<String>> {
        let since = (Utc::now() - ChronoDuration::days(self.mail_cfg.lookback_days)).date_naive();
        let mut attempt = 0u32;
        loop {
            match self
                .mail
                .list_message_ids(since, &self.mail_cfg.sender)
                .await
            {
                Ok(ids) => return Ok(ids),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.fetch_cfg.max_retries {
                        return Err(anyhow!(
                            "mail query failed after {attempt} attempts: {e}"
                        ));
                    }
                    let delay = backoff_delay(self.fetch_cfg.base_delay_secs, attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "Mail query failed, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Exponential backoff for the mailbox query: `base * 2^attempt` seconds.
pub fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs.saturating_mul(1u64 << attempt.min(16)))
}

/// Wall-clock-aligned delay until the next poll: seconds remaining in the
/// current minute plus a 5s offset, folded into an 11-second window with a
/// 2-second floor. Always within 2..=12 seconds.
pub fn next_poll_delay(second_of_minute: u32) -> Duration {
    const OFFSET: u64 = 5;
    const WINDOW: u64 = 11;
    const FLOOR: u64 = 2;

    let remaining = 60 - u64::from(second_of_minute.min(59));
    let mut wait = (remaining + OFFSET) % WINDOW;
    if wait < FLOOR {
        wait += WINDOW;
    }
    Duration::from_secs(wait)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_doubles_from_base() {
        assert_eq!(backoff_delay(3, 1), Duration::from_secs(6));
        assert_eq!(backoff_delay(3, 2), Duration::from_secs(12));
        assert_eq!(backoff_delay(3, 3), Duration::from_secs(24));
        assert_eq!(backoff_delay(3, 4), Duration::from_secs(48));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let delay = backoff_delay(u64::MAX / 2, 3);
        assert_eq!(delay, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn poll_delay_stays_in_window() {
        for second in 0..60 {
            let delay = next_poll_delay(second).as_secs();
            assert!((2..=12).contains(&delay), "second {second} gave {delay}s");
        }
    }

    #[test]
    fn poll_delay_is_deterministic_per_second() {
        assert_eq!(next_poll_delay(30), next_poll_delay(30));
        // 60 - 59 + 5 = 6
        assert_eq!(next_poll_delay(59), Duration::from_secs(6));
        // 60 - 0 + 5 = 65, 65 % 11 = 10
        assert_eq!(next_poll_delay(0), Duration::from_secs(10));
        // 60 - 10 + 5 = 55, 55 % 11 = 0 -> floored to 11
        assert_eq!(next_poll_delay(10), Duration::from_secs(11));
    }
}
