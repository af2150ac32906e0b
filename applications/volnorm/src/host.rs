//! Hosting strategies
//!
//! A [`Host`] turns a [`SessionPlan`] into running sessions. Each tick runs
//! on the blocking pool because loudness capture may block on the hardware.
//! Every exit path (completion, cancellation, error, or the run future being
//! dropped) stops the session and releases the loudness source.

use crate::{devices::DeviceProvider, error::Result};
use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::broadcast,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use volnorm_control::{AdaptiveTuning, ControlEvent, LevelTable, Policy, Session};
use volnorm_core::{LoudnessSource, VolumeSink};

/// Tick interval for fixed-band levels
pub const FIXED_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Tick interval for the adaptive level
pub const ADAPTIVE_TICK_INTERVAL: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 256;

type HostedSession = Session<Box<dyn LoudnessSource>, Box<dyn VolumeSink>>;

/// How long a normalization request keeps the controller alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// One session, one tick
    OneShot,
    /// A one-shot session every `period`, `repeats` times or until cancelled
    Periodic {
        period: Duration,
        repeats: Option<u32>,
    },
    /// One session ticking until `duration` elapses or until cancelled
    LongRunning { duration: Option<Duration> },
}

/// Everything needed to run one normalization request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub level: String,
    pub kind: SessionKind,
    /// Overrides the per-policy tick interval
    pub tick_interval: Option<Duration>,
    pub tuning: AdaptiveTuning,
}

impl SessionPlan {
    pub fn new(level: impl Into<String>, kind: SessionKind) -> Self {
        Self {
            level: level.into(),
            kind,
            tick_interval: None,
            tuning: AdaptiveTuning::default(),
        }
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: AdaptiveTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Tick interval used for `policy`
    pub fn tick_interval_for(&self, policy: &Policy) -> Duration {
        self.tick_interval.unwrap_or(if policy.is_adaptive() {
            ADAPTIVE_TICK_INTERVAL
        } else {
            FIXED_TICK_INTERVAL
        })
    }
}

/// Totals for one run of a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Sessions started
    pub sessions: u32,
    /// Ticks completed across all sessions
    pub ticks: u64,
    /// Whether the run ended because it was cancelled
    pub cancelled: bool,
}

/// Runs normalization sessions against a device provider
pub struct Host {
    table: LevelTable,
    devices: Arc<dyn DeviceProvider>,
    events: broadcast::Sender<ControlEvent>,
}

impl Host {
    pub fn new(table: LevelTable, devices: Arc<dyn DeviceProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            table,
            devices,
            events,
        }
    }

    /// Level table sessions are resolved against
    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    /// Observe events from every session this host runs
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    /// Run `plan` to completion or until `cancel` fires
    ///
    /// The level is resolved before any device is opened.
    ///
    /// # Errors
    /// `UnknownLevel` for an unresolvable level; device failures end the
    /// run after the failing session has been stopped
    pub async fn run(&self, plan: &SessionPlan, cancel: &CancellationToken) -> Result<RunSummary> {
        let policy = self.table.resolve(&plan.level)?;
        let interval = plan.tick_interval_for(&policy);
        let mut summary = RunSummary::default();

        match plan.kind {
            _ if cancel.is_cancelled() => {}
            SessionKind::OneShot => {
                summary.ticks = self
                    .run_session(plan, policy, interval, Some(1), None, cancel)
                    .await?;
                summary.sessions = 1;
            }
            SessionKind::LongRunning { duration } => {
                let deadline = duration.map(|d| Instant::now() + d);
                summary.ticks = self
                    .run_session(plan, policy, interval, None, deadline, cancel)
                    .await?;
                summary.sessions = 1;
            }
            SessionKind::Periodic { period, repeats } => loop {
                if cancel.is_cancelled() || repeats.is_some_and(|r| summary.sessions >= r) {
                    break;
                }

                summary.ticks += self
                    .run_session(plan, policy, interval, Some(1), None, cancel)
                    .await?;
                summary.sessions += 1;

                if repeats.is_some_and(|r| summary.sessions >= r) {
                    break;
                }
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(period) => {}
                }
            },
        }

        summary.cancelled = cancel.is_cancelled();
        tracing::info!(
            level = %plan.level,
            sessions = summary.sessions,
            ticks = summary.ticks,
            cancelled = summary.cancelled,
            "Normalization run finished"
        );
        Ok(summary)
    }

    /// One session: open devices, tick until done, always stop
    async fn run_session(
        &self,
        plan: &SessionPlan,
        policy: Policy,
        interval: Duration,
        max_ticks: Option<u64>,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let source = self.devices.open_source()?;
        let sink = self.devices.open_sink()?;
        let mut session = Session::with_policy(&plan.level, policy, source, sink, plan.tuning)?;

        let events = self.events.clone();
        session.set_listener(move |event| {
            // No subscribers is fine
            let _ = events.send(event.clone());
        });

        // Shared with the blocking pool; dropping the last handle stops the session
        let session = Arc::new(Mutex::new(session));

        let expiry = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expiry);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome: Result<()> = loop {
            if max_ticks.is_some_and(|max| lock(&session).ticks() >= max) {
                break Ok(());
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break Ok(()),
                () = &mut expiry => break Ok(()),
                _ = ticker.tick() => {}
            }

            let shared = Arc::clone(&session);
            match tokio::task::spawn_blocking(move || lock(&shared).tick()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => break Err(e.into()),
                Err(e) => break Err(e.into()),
            }
        };

        let ticks = {
            let mut session = lock(&session);
            session.stop();
            session.ticks()
        };

        if let Err(e) = &outcome {
            tracing::error!(level = %plan.level, ticks, "Normalization session failed: {}", e);
        }
        outcome.map(|()| ticks)
    }
}

fn lock(session: &Mutex<HostedSession>) -> MutexGuard<'_, HostedSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
