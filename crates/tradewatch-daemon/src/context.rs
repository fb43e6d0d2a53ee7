use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

/// Shared control state handed to every daemon at construction: the start
/// gate, the shutdown signal, and the startup-quiet flag. Replaces the
/// ambient mutable flags of a classic daemon trio with explicit state.
#[derive(Clone)]
pub struct DaemonContext {
    start: Arc<Barrier>,
    shutdown: CancellationToken,
    quiet: Arc<AtomicBool>,
}

impl DaemonContext {
    /// `daemons` is the number of tasks that will wait on the start gate;
    /// the orchestrator itself is the extra participant that releases it.
    pub fn new(daemons: usize) -> Self {
        Self {
            start: Arc::new(Barrier::new(daemons + 1)),
            shutdown: CancellationToken::new(),
            quiet: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Blocks until all daemons and the orchestrator reached the gate, so
    /// the loops start together.
    pub async fn wait_start(&self) {
        self.start.wait().await;
    }

    /// Trips the shared shutdown signal. Any daemon hitting a fatal
    /// condition calls this; every loop observes it within one iteration.
    pub fn trip_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Completes once shutdown has been tripped.
    pub async fn cancelled(&self) {
        self.shutdown.cancelled().await;
    }

    /// True from startup until the first fetch cycle that found nothing new.
    /// While set, detected changes advance the cursor but are not forwarded.
    pub fn in_quiet_window(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    pub fn clear_quiet(&self) {
        self.quiet.store(false, Ordering::Relaxed);
    }
}
