//! Exit coordination: seal the store before the process goes away.
//!
//! The host's "about to quit" hook calls [`QuitCoordinator::handle_before_quit`].
//! Default termination is deferred, the store is sealed once, and the
//! process is then force-exited whatever the outcome, so a slow or broken
//! seal never keeps the user from closing the application.

use crate::lifecycle::SealOutcome;
use crate::store::DesktopStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Default upper bound for the pre-exit work.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// An interceptable "about to quit" event.
pub trait QuitSignal: Send + Sync {
    /// Stops the host from terminating immediately.
    fn prevent_default(&self);
}

/// Terminates the process.
pub trait ProcessControl: Send + Sync {
    fn exit(&self, code: i32);
}

/// Exits through `std::process::exit`.
pub struct StdProcess;

impl ProcessControl for StdProcess {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Runs the shutdown sequence on quit.
pub struct QuitCoordinator {
    store: Arc<DesktopStore>,
    process: Arc<dyn ProcessControl>,
    timeout: Duration,
}

impl QuitCoordinator {
    pub fn new(store: Arc<DesktopStore>, process: Arc<dyn ProcessControl>, timeout: Duration) -> Self {
        Self {
            store,
            process,
            timeout,
        }
    }

    /// Handles a quit request.
    ///
    /// `before_seal` runs first (flushing other stores); the whole sequence
    /// is bounded by the configured timeout. The process is exited in all
    /// cases.
    pub async fn handle_before_quit<F>(&self, signal: &dyn QuitSignal, before_seal: F) -> SealOutcome
    where
        F: Future<Output = ()>,
    {
        signal.prevent_default();

        let sequence = async {
            before_seal.await;
            self.store.lifecycle().encrypt_store_on_exit().await
        };

        let outcome = match tokio::time::timeout(self.timeout, sequence).await {
            Ok(outcome) => outcome,
            Err(_) => SealOutcome::Failed {
                reason: format!("shutdown exceeded {:?}", self.timeout),
            },
        };

        match &outcome {
            SealOutcome::Failed { reason } => error!(reason = %reason, "Store not sealed, exiting anyway"),
            other => info!(outcome = ?other, "Shutdown sequence finished"),
        }

        self.process.exit(0);
        outcome
    }
}
