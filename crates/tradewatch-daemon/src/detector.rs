use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use tradewatch_common::types::{AlertRecord, FieldSet, capitalize};
use tradewatch_store::AlertStore;

use crate::context::DaemonContext;

/// Diffs the store against a monotonically advancing cursor and turns new
/// records into notification payloads.
///
/// The cursor lives only in this task and only moves forward; a restart
/// rescans the whole store as "new" and relies on the quiet window to keep
/// that backlog off the channel.
pub struct Detector {
    store: Arc<AlertStore>,
    fields: FieldSet,
    queue: mpsc::UnboundedSender<String>,
    ctx: DaemonContext,
    interval_secs: u64,
}

impl Detector {
    pub fn new(
        store: Arc<AlertStore>,
        fields: FieldSet,
        queue: mpsc::UnboundedSender<String>,
        ctx: DaemonContext,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            fields,
            queue,
            ctx,
            interval_secs,
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.ctx.wait_start().await;
        tracing::info!(interval_secs = self.interval_secs, "Change detector started");

        let mut cursor: i64 = 0;
        let mut tick = interval(Duration::from_secs(self.interval_secs));
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = self.ctx.cancelled() => break,
            }
            cursor = self.check_cycle(cursor)?;
        }
        Ok(())
    }

    /// One detection pass: fetch records past the cursor, enqueue each
    /// formatted block unless the quiet window is active, and return the
    /// advanced cursor. The cursor advances even for suppressed records, so
    /// quiet-window backlog is consumed once rather than replayed later.
    pub fn check_cycle(&self, cursor: i64) -> Result<i64> {
        let records = match self.store.select_after(cursor) {
            Ok(records) => records,
            Err(e) => {
                // Transient store trouble reads as "nothing new this cycle".
                tracing::warn!(error = %e, "Store read failed");
                return Ok(cursor);
            }
        };

        let mut cursor = cursor;
        for record in records {
            if !self.ctx.in_quiet_window() {
                let block = format_alert(&record, &self.fields);
                self.queue
                    .send(block)
                    .map_err(|_| anyhow!("notification queue closed"))?;
            }
            cursor = record.seq;
        }
        Ok(cursor)
    }
}

/// Renders one record as the notification block: a `New Alert:` headline and
/// one `Label: value` line per configured field, in configured order. Absent
/// values render as `None`.
pub fn format_alert(record: &AlertRecord, fields: &FieldSet) -> String {
    let mut block = format!("New Alert: {}\n", record.alert_name);
    let last = fields.len() - 1;
    for (i, label) in fields.labels().iter().enumerate() {
        let value = record
            .fields
            .get(i)
            .and_then(|v| v.as_deref())
            .unwrap_or("None");
        block.push_str(&capitalize(label));
        block.push_str(": ");
        block.push_str(value);
        if i != last {
            block.push('\n');
        }
    }
    block
}
