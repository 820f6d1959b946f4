//! Fixed-interval trigger for ingestion passes.
//!
//! At most one pass runs at a time. A tick that lands while a pass is still
//! running is dropped and logged; it is not queued. A pass that panics is
//! caught here, so the guard is released and the next tick still fires.

use crate::models::RunStats;
use crate::pipeline::Ingestor;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument, warn};

/// Anything the scheduler can run on a timer.
#[async_trait]
pub trait IngestionPass: Send + Sync {
    async fn run_ingestion_pass(&self) -> RunStats;
}

#[async_trait]
impl IngestionPass for Ingestor {
    async fn run_ingestion_pass(&self) -> RunStats {
        Ingestor::run_ingestion_pass(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// Single-slot mutual exclusion between passes.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

/// Held for the duration of a pass; dropping it returns the guard to idle.
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
}

impl RunGuard {
    pub fn try_acquire(self: &Arc<Self>) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                guard: Arc::clone(self),
            })
    }

    pub fn state(&self) -> RunState {
        if self.running.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub struct Scheduler {
    pass: Arc<dyn IngestionPass>,
    guard: Arc<RunGuard>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pass: Arc<dyn IngestionPass>, interval: Duration) -> Self {
        Self {
            pass,
            guard: Arc::new(RunGuard::default()),
            interval,
        }
    }

    pub fn state(&self) -> RunState {
        self.guard.state()
    }

    /// Run one pass unless one is already in flight.
    ///
    /// Returns `None` when the trigger was ignored or the pass panicked.
    #[instrument(level = "info", skip_all)]
    pub async fn trigger(&self) -> Option<RunStats> {
        let Some(_permit) = self.guard.try_acquire() else {
            warn!("Previous ingestion pass still running; trigger ignored");
            return None;
        };

        let t0 = Instant::now();
        match AssertUnwindSafe(self.pass.run_ingestion_pass())
            .catch_unwind()
            .await
        {
            Ok(stats) => {
                info!(
                    saved = stats.saved,
                    skipped = stats.skipped,
                    errored = stats.errored,
                    extraction_misses = stats.extraction_misses,
                    sources_failed = stats.sources_failed,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Pass complete"
                );
                Some(stats)
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Ingestion pass panicked");
                None
            }
        }
    }

    /// Tick forever. Each tick spawns a trigger so a slow pass never delays the clock.
    pub async fn run_forever(self: Arc<Self>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs_f64(), "Scheduler started");
        loop {
            ticker.tick().await;
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.trigger().await;
            });
        }
    }
}
