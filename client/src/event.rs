//! Open events and the detail commit path
//!
//! An [`OpenEvent`] owns a [`DetailBuffer`] and, when buffering is enabled,
//! a lazily started [`FlushScheduler`]. Detail writes go through
//! [`DetailHandle`]s; each write is queued and then either committed right
//! away (no buffer interval) or left for the scheduler. Closing stops the
//! scheduler, waits for it and commits whatever is still queued.

use auditor_shared::{DetailKind, DetailMode, EventId, EventRecord, EventUpdate};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::buffer::{DetailBuffer, PendingDetail};
use crate::error::{Error, Result};
use crate::handle::{DetailHandle, DetailNamespace};
use crate::metrics;
use crate::payload::build_payload;
use crate::scheduler::{FlushScheduler, DEFAULT_TICK};
use crate::transport::EventApi;
use crate::LOG_TARGET;

/// State shared between an [`OpenEvent`], its handles and its flush task.
pub(crate) struct EventCore {
    api: Arc<dyn EventApi>,
    id: EventId,
    buffer: DetailBuffer,
    buffer_interval: Option<Duration>,
    tick: Duration,
    scheduler: Mutex<Option<FlushScheduler>>,
    closing: AtomicBool,
    closed: AtomicBool,
}

impl EventCore {
    pub(crate) fn id(&self) -> &EventId {
        &self.id
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::EventClosed(self.id.clone()));
        }
        Ok(())
    }

    /// Queue one detail update, then commit it immediately when unbuffered.
    ///
    /// The open check and the enqueue happen under the scheduler lock, which
    /// [`EventCore::seal`] also takes, so a write either lands before the
    /// final drain or fails with [`Error::EventClosed`].
    pub(crate) async fn add_detail(
        self: &Arc<Self>,
        kind: DetailKind,
        name: &str,
        value: String,
        mode: DetailMode,
    ) -> Result<()> {
        {
            let mut slot = self.lock_scheduler();
            self.ensure_open()?;
            if self.buffer.enqueue(kind, name, value, mode) {
                metrics::PENDING_DETAILS.inc();
            }
            if let Some(interval) = self.buffer_interval {
                self.start_scheduler(&mut slot, interval);
                return Ok(());
            }
        }
        self.commit().await
    }

    fn lock_scheduler(&self) -> MutexGuard<'_, Option<FlushScheduler>> {
        self.scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_scheduler(self: &Arc<Self>, slot: &mut Option<FlushScheduler>, interval: Duration) {
        // Once closing, the final commit in close() picks up the write.
        if slot.is_some() || self.closing.load(Ordering::Acquire) {
            return;
        }

        let mut scheduler = FlushScheduler::with_tick(interval, self.tick);
        let weak: Weak<EventCore> = Arc::downgrade(self);
        scheduler.start(format!("event {}", self.id), move || {
            let core = weak.upgrade();
            async move {
                match core {
                    Some(core) => core.commit().await,
                    None => Ok(()),
                }
            }
        });
        debug!(
            target: LOG_TARGET,
            event_id = %self.id,
            interval_ms = interval.as_millis() as u64,
            "flush scheduler started"
        );
        *slot = Some(scheduler);
    }

    fn take_scheduler(&self) -> Option<FlushScheduler> {
        self.lock_scheduler().take()
    }

    /// Mark the event closed and take everything still queued. Writes that
    /// arrive afterwards are rejected.
    fn seal(&self) -> Vec<PendingDetail> {
        let _slot = self.lock_scheduler();
        self.closed.store(true, Ordering::Release);
        let entries = self.buffer.drain();
        if !entries.is_empty() {
            metrics::PENDING_DETAILS.sub(entries.len() as f64);
        }
        entries
    }

    /// Drain the buffer and send its content in one request.
    ///
    /// An empty buffer sends nothing. The drained batch is not re-queued if
    /// the request fails.
    pub(crate) async fn commit(&self) -> Result<()> {
        let entries = self.buffer.drain();
        if !entries.is_empty() {
            metrics::PENDING_DETAILS.sub(entries.len() as f64);
        }
        self.send(entries).await
    }

    async fn send(&self, entries: Vec<PendingDetail>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let payload = build_payload(entries);
        let count = payload.len();
        let start = Instant::now();
        match self.api.append_details(&self.id, &payload).await {
            Ok(()) => {
                metrics::COMMITS_TOTAL.with_label_values(&["ok"]).inc();
                metrics::DETAIL_RECORDS_TOTAL.inc_by(count as f64);
                metrics::COMMIT_DURATION.observe(start.elapsed().as_secs_f64());
                debug!(
                    target: LOG_TARGET,
                    event_id = %self.id,
                    records = count,
                    "committed details"
                );
                Ok(())
            }
            Err(e) => {
                metrics::COMMITS_TOTAL.with_label_values(&["error"]).inc();
                metrics::DROPPED_RECORDS_TOTAL.inc_by(count as f64);
                warn!(
                    target: LOG_TARGET,
                    event_id = %self.id,
                    dropped = count,
                    "detail commit failed: {}",
                    e
                );
                Err(e)
            }
        }
    }
}

/// An event that has been created on the service and still accepts details.
pub struct OpenEvent {
    core: Arc<EventCore>,
    record: EventRecord,
    attrs: DetailNamespace,
    streams: DetailNamespace,
}

impl std::fmt::Debug for OpenEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenEvent")
            .field("id", &self.core.id)
            .field("summary", &self.record.summary)
            .field("buffer_interval", &self.core.buffer_interval)
            .field("pending", &self.core.buffer.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl OpenEvent {
    pub(crate) fn new(
        api: Arc<dyn EventApi>,
        record: EventRecord,
        buffer_interval: Option<Duration>,
    ) -> Self {
        Self::with_tick(api, record, buffer_interval, DEFAULT_TICK)
    }

    pub(crate) fn with_tick(
        api: Arc<dyn EventApi>,
        record: EventRecord,
        buffer_interval: Option<Duration>,
        tick: Duration,
    ) -> Self {
        let core = Arc::new(EventCore {
            api,
            id: record.id.clone(),
            buffer: DetailBuffer::new(),
            buffer_interval: buffer_interval.filter(|d| !d.is_zero()),
            tick,
            scheduler: Mutex::new(None),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        Self {
            attrs: DetailNamespace::new(core.clone(), DetailKind::Attribute),
            streams: DetailNamespace::new(core.clone(), DetailKind::Stream),
            core,
            record,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.core.id
    }

    pub fn summary(&self) -> &str {
        &self.record.summary
    }

    pub fn user(&self) -> &str {
        &self.record.user
    }

    pub fn tags(&self) -> &[String] {
        &self.record.tags
    }

    pub fn start(&self) -> Option<&DateTime<Utc>> {
        self.record.start.as_ref()
    }

    /// End timestamp; set once the event has been closed
    pub fn end(&self) -> Option<&DateTime<Utc>> {
        self.record.end.as_ref()
    }

    /// Latest copy of the event as known by the service
    pub fn record(&self) -> &EventRecord {
        &self.record
    }

    pub fn buffer_interval(&self) -> Option<Duration> {
        self.core.buffer_interval
    }

    pub fn is_closing(&self) -> bool {
        self.core.closing.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::Acquire)
    }

    /// Number of `(kind, name)` entries waiting for the next commit
    pub fn pending(&self) -> usize {
        self.core.buffer.len()
    }

    /// Attribute handles of this event
    pub fn attrs(&self) -> &DetailNamespace {
        &self.attrs
    }

    /// Stream handles of this event
    pub fn streams(&self) -> &DetailNamespace {
        &self.streams
    }

    pub fn attribute(&self, name: &str) -> DetailHandle {
        self.attrs.get_or_create(name)
    }

    pub fn stream(&self, name: &str) -> DetailHandle {
        self.streams.get_or_create(name)
    }

    /// Send everything queued so far. A no-op when nothing is queued.
    pub async fn commit(&self) -> Result<()> {
        self.core.ensure_open()?;
        self.core.commit().await
    }

    /// Finish the event.
    ///
    /// Records the end time on the service, stops the flush scheduler (waiting
    /// for a flush in progress) and commits whatever is still queued. The
    /// scheduler is stopped and the final commit attempted even when the end
    /// time update fails; the first error is returned.
    pub async fn close(&mut self) -> Result<()> {
        self.core.ensure_open()?;
        self.core.closing.store(true, Ordering::Release);

        let update = EventUpdate {
            end: auditor_shared::utils::time::now_utc(),
        };
        let updated = self.core.api.update_event(&self.core.id, &update).await;

        if let Some(mut scheduler) = self.core.take_scheduler() {
            scheduler.stop().await;
        }
        let remaining = self.core.seal();
        let committed = self.core.send(remaining).await;

        let record = updated?;
        self.record = EventRecord {
            // Keep our id even if the service echoes it differently
            id: self.core.id.clone(),
            end: record.end.or(Some(update.end)),
            ..record
        };
        committed?;

        info!(
            target: LOG_TARGET,
            event_id = %self.core.id,
            "event closed"
        );
        Ok(())
    }
}

impl Drop for OpenEvent {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Some(scheduler) = self.core.take_scheduler() {
            scheduler.request_stop();
        }
        let pending = self.core.seal().len();
        if pending > 0 {
            warn!(
                target: LOG_TARGET,
                event_id = %self.core.id,
                pending,
                "open event dropped without close; pending details discarded"
            );
        }
    }
}
