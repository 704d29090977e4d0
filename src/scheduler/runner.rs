//! Engine background loop.
//!
//! Spawns two tokio tasks:
//!
//! - a single-writer worker that owns the [`RecoveryCoordinator`] and
//!   executes [`EngineCommand`]s one at a time, so scheduling and
//!   cancellation passes never interleave;
//! - a heartbeat ticker that, on a fixed interval, enqueues a tick for the
//!   worker without waiting for it.
//!
//! Shutdown cancels both through a [`CancellationToken`]. A command already
//! running on the worker finishes first.

use crate::config::EngineConfig;
use crate::error::{Result, SchedulingFault};
use crate::heartbeat::HeartbeatStatus;
use crate::platform::Platform;
use crate::scheduler::manager::{CancelReport, ScheduleReport};
use crate::scheduler::recovery::{RecoveryCoordinator, RecoveryOutcome, RecoveryTrigger};
use chrono::NaiveDate;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Depth of the worker's command queue.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Shortest heartbeat period the ticker accepts.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Work items for the engine worker.
#[derive(Debug)]
pub enum EngineCommand {
    Recover {
        trigger: RecoveryTrigger,
        reply: oneshot::Sender<Result<RecoveryOutcome>>,
    },
    /// Calendar data changed; reschedule the full horizon.
    DataRefreshed {
        reply: oneshot::Sender<Result<ScheduleReport>>,
    },
    CancelRange {
        from: NaiveDate,
        to: NaiveDate,
        reply: oneshot::Sender<Result<CancelReport>>,
    },
    /// Redisplay the heartbeat now.
    Heartbeat {
        reply: oneshot::Sender<HeartbeatStatus>,
    },
    /// Periodic tick: refresh the heartbeat, then renew if due.
    Tick,
}

/// Cloneable front end to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    cancel: CancellationToken,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| SchedulingFault::EngineStopped)?;
        rx.await.map_err(|_| SchedulingFault::EngineStopped)
    }

    /// Run recovery for `trigger` and wait for the outcome.
    pub async fn recover(&self, trigger: RecoveryTrigger) -> Result<RecoveryOutcome> {
        self.request(|reply| EngineCommand::Recover { trigger, reply })
            .await?
    }

    /// Reschedule the horizon from fresh calendar data.
    pub async fn data_refreshed(&self) -> Result<ScheduleReport> {
        self.request(|reply| EngineCommand::DataRefreshed { reply })
            .await?
    }

    pub async fn cancel_range(&self, from: NaiveDate, to: NaiveDate) -> Result<CancelReport> {
        self.request(|reply| EngineCommand::CancelRange { from, to, reply })
            .await?
    }

    pub async fn heartbeat(&self) -> Result<HeartbeatStatus> {
        self.request(|reply| EngineCommand::Heartbeat { reply }).await
    }

    /// Queue a tick without waiting. Returns `false` if the queue is full or
    /// the engine has stopped.
    pub fn renew_if_due(&self) -> bool {
        match self.tx.try_send(EngineCommand::Tick) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("engine queue full, tick dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the engine to stop. Does not wait.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }
}

/// A running engine and its background tasks.
pub struct Engine {
    handle: EngineHandle,
    worker: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl Engine {
    /// Validate `config`, build the coordinator and start the engine.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingFault::Config`] if `config` does not validate.
    pub fn start(platform: &Platform, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let coordinator = RecoveryCoordinator::new(platform, config);
        Ok(Self::spawn(
            coordinator,
            Duration::from_secs(config.heartbeat.interval_secs),
        ))
    }

    /// Start the worker and the heartbeat ticker.
    ///
    /// A zero `heartbeat_interval` is raised to [`MIN_HEARTBEAT_INTERVAL`].
    pub fn spawn(coordinator: RecoveryCoordinator, heartbeat_interval: Duration) -> Self {
        let heartbeat_interval = if heartbeat_interval.is_zero() {
            warn!("zero heartbeat interval, using {MIN_HEARTBEAT_INTERVAL:?}");
            MIN_HEARTBEAT_INTERVAL
        } else {
            heartbeat_interval
        };
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let cancel = CancellationToken::new();
        let handle = EngineHandle {
            tx,
            cancel: cancel.clone(),
        };

        let worker = tokio::spawn(run_worker(coordinator, rx, cancel.child_token()));
        let ticker = tokio::spawn(run_ticker(
            handle.clone(),
            heartbeat_interval,
            cancel.child_token(),
        ));
        info!(
            interval_secs = heartbeat_interval.as_secs_f64(),
            "alarm engine started"
        );

        Self {
            handle,
            worker,
            ticker,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stop the engine and wait for both tasks to exit.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        if let Err(e) = self.ticker.await {
            error!("heartbeat ticker panicked: {e}");
        }
        if let Err(e) = self.worker.await {
            error!("engine worker panicked: {e}");
        }
        info!("alarm engine stopped");
    }
}

async fn run_worker(
    coordinator: RecoveryCoordinator,
    mut rx: mpsc::Receiver<EngineCommand>,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("engine worker cancelled");
                break;
            }
            command = rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };
        execute(&coordinator, command).await;
    }
}

async fn execute(coordinator: &RecoveryCoordinator, command: EngineCommand) {
    match command {
        EngineCommand::Recover { trigger, reply } => {
            let result = coordinator.recover(trigger).await;
            if let Err(e) = &result {
                warn!(%trigger, "recovery failed: {e}");
            }
            let _ = reply.send(result);
        }
        EngineCommand::DataRefreshed { reply } => {
            let result = coordinator.reschedule().await;
            if let Err(e) = &result {
                warn!("reschedule after data refresh failed: {e}");
            }
            let _ = reply.send(result);
        }
        EngineCommand::CancelRange { from, to, reply } => {
            let _ = reply.send(coordinator.cancel_range(from, to).await);
        }
        EngineCommand::Heartbeat { reply } => {
            let _ = reply.send(coordinator.refresh_heartbeat().await);
        }
        EngineCommand::Tick => {
            coordinator.refresh_heartbeat().await;
            match coordinator.renew_if_due().await {
                Ok(RecoveryOutcome::Renewed(report)) => {
                    info!(scheduled = report.scheduled, "horizon renewed on tick");
                }
                Ok(_) => {}
                // Not surfaced anywhere else; the next tick retries once the
                // throttle allows it.
                Err(e) => warn!("renewal on tick failed: {e}"),
            }
        }
    }
}

async fn run_ticker(handle: EngineHandle, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("heartbeat ticker cancelled");
                break;
            }
            _ = interval.tick() => {
                if !handle.renew_if_due() && handle.tx.is_closed() {
                    warn!("engine worker gone, stopping heartbeat ticker");
                    break;
                }
            }
        }
    }
}
