//! # Telemetry Relay Service
//!
//! Hosts a [`TriggerOrchestrator`] and runs one worker task per inbound
//! command. Shutdown stops intake and waits for in-flight workers to finish
//! on their own; nothing is preempted.

use super::trigger_orchestrator::TriggerOrchestrator;
use super::types::TriggerOutcome;
use crate::error::{RelayError, Result};
use crate::logging::log_error;
use crate::models::InboundCommand;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct TelemetryRelay {
    orchestrator: Arc<TriggerOrchestrator>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    /// Held across the shutdown check and the spawn in `dispatch`, and across
    /// cancel and close in `shutdown`
    intake: Mutex<()>,
}

impl TelemetryRelay {
    pub fn new(orchestrator: Arc<TriggerOrchestrator>) -> Self {
        Self {
            orchestrator,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            intake: Mutex::new(()),
        }
    }

    pub fn orchestrator(&self) -> &Arc<TriggerOrchestrator> {
        &self.orchestrator
    }

    /// Token cancelled when shutdown begins; clones can trigger shutdown too
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Workers still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start a worker for `command`. The handle always resolves to an outcome;
    /// a panicking worker yields [`TriggerOutcome::Failed`].
    pub fn dispatch(&self, command: InboundCommand) -> Result<JoinHandle<TriggerOutcome>> {
        let _intake = self.intake.lock();
        if self.shutdown.is_cancelled() {
            return Err(RelayError::ShuttingDown {
                sender: command.sender,
            });
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = self.tracker.spawn(async move {
            match AssertUnwindSafe(orchestrator.handle(&command))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    let error = "worker panicked before the command was accepted".to_string();
                    log_error("telemetry_relay", "dispatch", &error, Some(&command.sender));
                    TriggerOutcome::Failed { error }
                }
            }
        });

        debug!(in_flight = self.tracker.len(), "Worker dispatched");
        Ok(handle)
    }

    /// Dispatch commands from `inbound` until the channel closes or shutdown
    /// is requested. Does not wait for workers; call [`Self::shutdown`] for that.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundCommand>) {
        info!("Telemetry relay accepting commands");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting commands");
                    break;
                }
                command = inbound.recv() => {
                    let Some(command) = command else {
                        info!("Inbound channel closed");
                        break;
                    };
                    if let Err(e) = self.dispatch(command) {
                        warn!(error = %e, "Command refused");
                    }
                }
            }
        }
    }

    /// Refuse new commands and wait for every in-flight worker
    pub async fn shutdown(&self) {
        {
            let _intake = self.intake.lock();
            self.shutdown.cancel();
            self.tracker.close();
        }
        info!(in_flight = self.tracker.len(), "Waiting for in-flight workers");
        self.tracker.wait().await;
        info!("Telemetry relay stopped");
    }
}
