use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use tradewatch_notify::{NotifyChannel, NotifyError};

use crate::context::DaemonContext;

/// Drains the notification queue into the messaging channel, strictly FIFO.
///
/// Delivery is at-most-twice: a rate-limited send is retried once after the
/// channel-suggested wait, any other failure (or a failed retry) drops the
/// payload with a warning. The loop itself survives delivery failures; only
/// shutdown or a closed queue ends it.
pub struct Dispatcher {
    queue: mpsc::UnboundedReceiver<String>,
    channel: Arc<dyn NotifyChannel>,
    ctx: DaemonContext,
    send_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: mpsc::UnboundedReceiver<String>,
        channel: Arc<dyn NotifyChannel>,
        ctx: DaemonContext,
        send_delay_secs: u64,
    ) -> Self {
        Self {
            queue,
            channel,
            ctx,
            send_delay: Duration::from_secs(send_delay_secs),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        self.ctx.wait_start().await;
        tracing::info!(
            channel = self.channel.channel_name(),
            send_delay_secs = self.send_delay.as_secs(),
            "Notification dispatcher started"
        );

        loop {
            let payload = tokio::select! {
                payload = self.queue.recv() => payload,
                _ = self.ctx.cancelled() => break,
            };
            let Some(payload) = payload else {
                // Producer gone; nothing more will ever arrive.
                break;
            };

            tracing::info!("Sending notification");
            self.deliver(&payload).await;

            tokio::select! {
                _ = sleep(self.send_delay) => {}
                _ = self.ctx.cancelled() => break,
            }
        }
        Ok(())
    }

    async fn deliver(&self, payload: &str) {
        match self.channel.send(payload).await {
            Ok(()) => tracing::debug!("Notification delivered"),
            Err(NotifyError::RateLimited { retry_after_secs }) => {
                tracing::warn!(retry_after_secs, "Channel rate limited, retrying once");
                sleep(Duration::from_secs(retry_after_secs)).await;
                if let Err(e) = self.channel.send(payload).await {
                    tracing::warn!(error = %e, "Retry failed, dropping notification");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send notification, dropping");
            }
        }
    }
}
