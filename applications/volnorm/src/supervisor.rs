//! Single active normalization run
//!
//! At most one run is in flight. A start request while one is running keeps
//! the existing run and reports [`StartOutcome::AlreadyRunning`].

use crate::{
    error::{HostError, Result},
    host::{Host, RunSummary, SessionPlan},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use volnorm_control::ControlEvent;

/// Externally visible state of the supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing has run yet
    Idle,
    /// A run is in progress
    Normalizing { level: String },
    /// The last run ended with an error
    Failed { message: String },
    /// The last run completed or was cancelled
    Finished { ticks: u64 },
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Normalizing { .. })
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Publishes `Failed` if the run task ends without reporting, e.g. on panic
/// or abort
struct StatusGuard {
    status: Arc<watch::Sender<SessionStatus>>,
    armed: bool,
}

impl StatusGuard {
    fn publish(mut self, next: SessionStatus) {
        self.armed = false;
        self.status.send_replace(next);
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        if self.armed {
            self.status.send_replace(SessionStatus::Failed {
                message: "normalization task ended without a result".to_string(),
            });
        }
    }
}

struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<Result<RunSummary>>,
}

/// Owns the single normalization task
pub struct Supervisor {
    host: Arc<Host>,
    status: Arc<watch::Sender<SessionStatus>>,
    active: Mutex<Option<ActiveRun>>,
}

impl Supervisor {
    pub fn new(host: Arc<Host>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Idle);
        Self {
            host,
            status: Arc::new(status),
            active: Mutex::new(None),
        }
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Follow status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Follow per-tick events of every run
    pub fn subscribe_events(&self) -> broadcast::Receiver<ControlEvent> {
        self.host.subscribe()
    }

    /// Start a run unless one is already in flight
    pub async fn start(&self, plan: SessionPlan) -> StartOutcome {
        let mut active = self.active.lock().await;

        if active.as_ref().is_some_and(|run| !run.handle.is_finished()) {
            tracing::info!(
                requested = %plan.level,
                "Normalization already running, keeping the existing session"
            );
            return StartOutcome::AlreadyRunning;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let host = Arc::clone(&self.host);
        let status = Arc::clone(&self.status);

        self.status.send_replace(SessionStatus::Normalizing {
            level: plan.level.clone(),
        });

        let handle = tokio::spawn(async move {
            let guard = StatusGuard {
                status,
                armed: true,
            };
            let result = host.run(&plan, &token).await;
            let next = match &result {
                Ok(summary) => SessionStatus::Finished {
                    ticks: summary.ticks,
                },
                Err(e) => {
                    tracing::error!(level = %plan.level, "Normalization failed: {}", e);
                    SessionStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
            guard.publish(next);
            result
        });

        *active = Some(ActiveRun { cancel, handle });
        StartOutcome::Started
    }

    /// Ask the running task to stop; returns whether one was signalled
    pub async fn cancel(&self) -> bool {
        match self.active.lock().await.as_ref() {
            Some(run) if !run.handle.is_finished() => {
                tracing::info!("Cancelling normalization");
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait until no run is in progress and return the resulting status
    ///
    /// Safe to drop mid-wait; the run keeps going.
    pub async fn wait(&self) -> SessionStatus {
        let mut status = self.status.subscribe();
        loop {
            let current = status.borrow_and_update().clone();
            if !current.is_running() {
                return current;
            }
            if status.changed().await.is_err() {
                return current;
            }
        }
    }

    /// Collect the outcome of the last run, waiting for it to finish
    pub async fn join(&self) -> Option<Result<RunSummary>> {
        let run = self.active.lock().await.take()?;
        Some(match run.handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Normalization task did not complete: {}", e);
                self.status.send_replace(SessionStatus::Failed {
                    message: e.to_string(),
                });
                Err(HostError::Join(e))
            }
        })
    }
}
