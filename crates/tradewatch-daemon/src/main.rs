use anyhow::{Result, bail};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use tradewatch_common::types::FieldSet;
use tradewatch_daemon::config::Config;
use tradewatch_daemon::context::DaemonContext;
use tradewatch_daemon::detector::Detector;
use tradewatch_daemon::dispatcher::Dispatcher;
use tradewatch_daemon::fetcher::Fetcher;
use tradewatch_mail::{GmailClient, MailSource};
use tradewatch_notify::{NotifyChannel, TelegramChannel};
use tradewatch_store::AlertStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tradewatch=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/tradewatch.toml".to_string());
    run(&config_path).await
}

async fn run(config_path: &str) -> Result<()> {
    if !Path::new(config_path).exists() {
        Config::write_template(config_path)?;
        bail!(
            "wrote template config to '{config_path}'; set [telegram] token and chat_id before running again"
        );
    }

    let config = Config::load(config_path)?;
    if config.telegram.token.is_empty() || config.telegram.chat_id.is_empty() {
        bail!("[telegram] token and chat_id must be set in '{config_path}'");
    }
    let fields = FieldSet::new(config.strategy.fields.clone()).map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        data_dir = %config.data_dir,
        fields = fields.len(),
        sender = %config.mail.sender,
        "tradewatch starting"
    );

    let store = Arc::new(AlertStore::open(Path::new(&config.data_dir), fields.clone())?);
    let mail: Arc<dyn MailSource> = Arc::new(GmailClient::from_token_file(Path::new(
        &config.mail.token_file,
    ))?);
    let channel: Arc<dyn NotifyChannel> = Arc::new(TelegramChannel::new(
        &config.telegram.token,
        &config.telegram.chat_id,
    )?);

    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let ctx = DaemonContext::new(3);

    tracing::info!("Launching alert fetcher daemon...");
    let fetcher = Fetcher::new(
        store.clone(),
        mail,
        fields.clone(),
        config.mail.clone(),
        config.fetch.clone(),
        ctx.clone(),
    );
    let fetcher_ctx = ctx.clone();
    let fetcher_handle = tokio::spawn(async move {
        if let Err(e) = fetcher.run().await {
            tracing::error!(error = %e, "Alert fetcher failed");
            fetcher_ctx.trip_shutdown();
        }
    });

    tracing::info!("Launching change detector daemon...");
    let detector = Detector::new(
        store,
        fields,
        queue_tx,
        ctx.clone(),
        config.detect.interval_secs,
    );
    let detector_ctx = ctx.clone();
    let detector_handle = tokio::spawn(async move {
        if let Err(e) = detector.run().await {
            tracing::error!(error = %e, "Change detector failed");
            detector_ctx.trip_shutdown();
        }
    });

    tracing::info!("Launching notification dispatcher daemon...");
    let dispatcher = Dispatcher::new(
        queue_rx,
        channel,
        ctx.clone(),
        config.telegram.send_delay_secs,
    );
    let dispatcher_ctx = ctx.clone();
    let dispatcher_handle = tokio::spawn(async move {
        if let Err(e) = dispatcher.run().await {
            tracing::error!(error = %e, "Notification dispatcher failed");
            dispatcher_ctx.trip_shutdown();
        }
    });

    // Release the start gate so all three loops begin together.
    ctx.wait_start().await;
    tracing::info!("tradewatch is live");

    let graceful = tokio::select! {
        _ = ctx.cancelled() => false,
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
            ctx.trip_shutdown();
            true
        }
    };

    fetcher_handle.abort();
    detector_handle.abort();
    dispatcher_handle.abort();

    if !graceful {
        // Recovery is the external supervisor's restart, which rebuilds all
        // in-memory state (cursor included) from the store.
        bail!("a daemon hit a fatal condition; exiting for supervisor restart");
    }

    tracing::info!("tradewatch stopped");
    Ok(())
}
