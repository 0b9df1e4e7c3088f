// Cron-driven scheduler for the aggregate fetch.
// Owns the trigger loop, the Idle/Running/Stopped state, and the overlap guard.

pub mod handlers;
pub mod job;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::prs::{FetchAllResult, RetryPolicy};

pub use handlers::{ErrorLogEntry, RunSnapshot, RunSummary, ScheduledRunHandler};
pub use job::{RunHandler, ScheduledJob};

/// Default trigger: daily at 09:00 UTC.
pub const DEFAULT_SCHEDULE: &str = "0 0 9 * * *";

/// Immutable scheduler settings, built once at startup.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub owner: String,
    pub repos: Vec<String>,
    pub cron: String,
    pub retry: RetryPolicy,
    pub output_file: Option<PathBuf>,
    pub error_log_file: Option<PathBuf>,
    pub warm_cache: bool,
    pub run_on_start: bool,
}

/// Lifecycle state of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// Parse a cron expression. Five-field expressions get a leading seconds field.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    let expr = expr.trim();
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr)
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| AppError::InvalidSchedule(format!("{expr}: {e}")))
}

struct Shared {
    job: ScheduledJob,
    schedule: Schedule,
    state: Mutex<SchedulerState>,
    running: AtomicBool,
    epoch_tx: watch::Sender<u64>,
}

impl Shared {
    fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: SchedulerState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Leave Stopped alone; a stop requested mid-run wins.
    fn settle(&self, next: SchedulerState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != SchedulerState::Stopped {
            *state = next;
        }
    }

    /// Run the job unless a run is already in progress.
    async fn fire(&self) -> Option<FetchAllResult> {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("previous scheduled run still in progress, skipping");
            return None;
        }

        self.settle(SchedulerState::Running);
        info!(
            owner = self.job.owner(),
            repos = self.job.repos().len(),
            "scheduled run starting"
        );
        let result = self.job.run().await;
        self.running.store(false, Ordering::SeqCst);
        self.settle(SchedulerState::Idle);
        result
    }
}

async fn trigger_loop(shared: Arc<Shared>, mut epoch_rx: watch::Receiver<u64>) {
    // A stop bumps the epoch; this loop belongs to the one it started in.
    let epoch = *epoch_rx.borrow_and_update();
    loop {
        let Some(next) = shared.schedule.upcoming(Utc).next() else {
            warn!("cron schedule has no upcoming firings, stopping");
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        let due = tokio::select! {
            _ = tokio::time::sleep(wait) => true,
            changed = epoch_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                false
            }
        };

        if *epoch_rx.borrow() != epoch {
            break;
        }
        if due {
            shared.fire().await;
        }
    }
}

/// Handle to a running scheduler. Dropping it does not stop the trigger loop.
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// Deregister the trigger. An in-flight run finishes first.
    pub fn stop(&self) {
        self.shared.epoch_tx.send_modify(|epoch| *epoch += 1);
        self.shared.set_state(SchedulerState::Stopped);
        info!("scheduler stopped");
    }

    /// Re-register the trigger after [`stop`](Self::stop). No-op while active.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if self.shared.state() != SchedulerState::Stopped {
            return;
        }

        self.shared.set_state(SchedulerState::Idle);
        let rx = self.shared.epoch_tx.subscribe();
        *task = Some(tokio::spawn(trigger_loop(Arc::clone(&self.shared), rx)));
        info!("scheduler restarted");
    }

    /// Fire the job now, outside the cron trigger. Skipped if a run is in progress.
    pub async fn run_now(&self) -> Option<FetchAllResult> {
        self.shared.fire().await
    }
}

/// Register the cron trigger for `job` and return its handle.
pub fn start_scheduler(config: &SchedulerConfig, job: ScheduledJob) -> Result<SchedulerHandle> {
    let schedule = parse_schedule(&config.cron)?;
    let (epoch_tx, epoch_rx) = watch::channel(0);
    let shared = Arc::new(Shared {
        job,
        schedule,
        state: Mutex::new(SchedulerState::Idle),
        running: AtomicBool::new(false),
        epoch_tx,
    });

    if config.run_on_start {
        let first = Arc::clone(&shared);
        tokio::spawn(async move {
            first.fire().await;
        });
    }

    let task = tokio::spawn(trigger_loop(Arc::clone(&shared), epoch_rx));
    info!(cron = %config.cron, "scheduler started");

    Ok(SchedulerHandle {
        shared,
        task: Mutex::new(Some(task)),
    })
}

/// Stop the scheduler and wait for its trigger loop to exit.
pub async fn stop_scheduler(handle: SchedulerHandle) {
    handle.stop();
    let task = handle
        .task
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    if let Some(task) = task {
        if let Err(e) = task.await {
            warn!(error = %e, "scheduler loop ended abnormally");
        }
    }
}
