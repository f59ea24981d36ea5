//! Background flush task for buffered details
//!
//! One scheduler runs per open event. It wakes on a short fixed tick and
//! flushes whenever the configured interval has elapsed since the previous
//! flush. Stopping cancels the task and waits for it, so a flush that is
//! already in flight always completes before [`FlushScheduler::stop`] returns.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Wake-up granularity of the flush loop; bounds stop latency.
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            _ => SchedulerState::Stopped,
        }
    }
}

#[derive(Debug)]
pub struct FlushScheduler {
    interval: Duration,
    tick: Duration,
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    pub fn new(interval: Duration) -> Self {
        Self::with_tick(interval, DEFAULT_TICK)
    }

    pub fn with_tick(interval: Duration, tick: Duration) -> Self {
        Self {
            interval,
            tick: if tick.is_zero() { DEFAULT_TICK } else { tick },
            state: Arc::new(AtomicU8::new(SchedulerState::Idle as u8)),
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the flush loop. Returns `false` (and stays idle) when the
    /// interval is zero or the scheduler was already started.
    ///
    /// `flush` failures are logged and never end the loop. `label` names the
    /// owner in log lines.
    pub fn start<F, Fut>(&mut self, label: String, flush: F) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.interval.is_zero() || self.state() != SchedulerState::Idle {
            return false;
        }
        self.state
            .store(SchedulerState::Running as u8, Ordering::Release);

        let interval = self.interval;
        let tick = self.tick;
        let cancel = self.cancel.clone();
        let state = self.state.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_flush = Instant::now();

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if last_flush.elapsed() >= interval {
                            if let Err(e) = flush().await {
                                tracing::warn!("{}: background flush failed: {}", label, e);
                            }
                            last_flush = Instant::now();
                        }
                    }
                }
            }
            state.store(SchedulerState::Stopped as u8, Ordering::Release);
            tracing::debug!("{}: flush scheduler stopped", label);
        });
        self.handle = Some(handle);
        true
    }

    /// Request a stop without waiting for the loop to exit.
    pub fn request_stop(&self) {
        if self.state() == SchedulerState::Running {
            self.state
                .store(SchedulerState::Stopping as u8, Ordering::Release);
        }
        self.cancel.cancel();
    }

    /// Stop the loop and wait until it has exited, including any flush
    /// already in progress.
    pub async fn stop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("flush scheduler task ended abnormally: {}", e);
            }
        }
        self.state
            .store(SchedulerState::Stopped as u8, Ordering::Release);
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
