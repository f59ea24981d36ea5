//! Auditor client library
//!
//! Submits audit events to an Auditor service and attaches details to events
//! while they are still open. Details written through an [`OpenEvent`] are
//! buffered per event and flushed in the background every
//! `buffer_interval`, or committed immediately when no interval is
//! configured. Closing an event always flushes what is left.
//!
//! ```no_run
//! # async fn demo() -> auditor_client::Result<()> {
//! use auditor_client::{Auditor, ClientConfig, LogRequest};
//! use std::time::Duration;
//!
//! let auditor = Auditor::new(
//!     ClientConfig::new("localhost", 8000).with_buffer_interval(Duration::from_secs(2)),
//! )?;
//! let mut event = auditor.open(&LogRequest::new("deploy web").tags(["deploy"])).await?;
//! event.attribute("hosts").append("web1").await?;
//! event.stream("output").append("starting\n").await?;
//! event.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod events;
pub mod handle;
pub mod metrics;
pub mod payload;
pub mod scheduler;
pub mod subscribe;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use event::OpenEvent;
pub use events::EventCursor;
pub use handle::{DetailHandle, DetailNamespace};
pub use transport::{EventApi, HttpTransport};

use auditor_shared::{EventPage, EventRecord, NewEvent};
use std::sync::Arc;
use tracing::info;

/// Tracing target for event lifecycle records
pub const LOG_TARGET: &str = "auditor::client";

/// Level recorded when the caller does not pick one
pub const DEFAULT_LEVEL: i32 = 1;

/// Summary and metadata of an event to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub summary: String,
    pub tags: Vec<String>,
    pub user: Option<String>,
    pub level: i32,
}

impl LogRequest {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            tags: Vec::new(),
            user: None,
            level: DEFAULT_LEVEL,
        }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }
}

/// Entry point: creates events and lists existing ones.
#[derive(Clone)]
pub struct Auditor {
    config: ClientConfig,
    api: Arc<dyn EventApi>,
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor").field("config", &self.config).finish()
    }
}

impl Auditor {
    /// Client talking HTTP to the service described by `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let api = Arc::new(HttpTransport::new(&config)?);
        Ok(Self { config, api })
    }

    /// Client over any [`EventApi`] implementation.
    pub fn with_api(config: ClientConfig, api: Arc<dyn EventApi>) -> Self {
        Self { config, api }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn new_event(&self, request: &LogRequest) -> Result<NewEvent> {
        let explicit = request.user.as_deref().or(self.config.user.as_deref());
        let user = config::resolve_user_from_env(explicit)?;
        Ok(NewEvent::new(request.summary.clone(), user, request.level).with_tags(&request.tags))
    }

    /// Log a one-line event that is closed on creation (`start == end`).
    pub async fn log(&self, request: &LogRequest) -> Result<EventRecord> {
        let event = self.new_event(request)?.closed();
        let record = self.api.create_event(&event).await?;
        info!(
            target: LOG_TARGET,
            event_id = %record.id,
            "logged event"
        );
        Ok(record)
    }

    /// Create an event that stays open for details until closed.
    pub async fn open(&self, request: &LogRequest) -> Result<OpenEvent> {
        let event = self.new_event(request)?;
        let record = self.api.create_event(&event).await?;
        info!(
            target: LOG_TARGET,
            event_id = %record.id,
            buffered = self.config.effective_buffer_interval().is_some(),
            "opened event"
        );
        Ok(OpenEvent::new(
            self.api.clone(),
            record,
            self.config.effective_buffer_interval(),
        ))
    }

    /// Attach to an event created elsewhere (e.g. found through the listing)
    /// to add details to it and close it.
    pub fn attach(&self, record: EventRecord) -> Result<OpenEvent> {
        if record.is_closed() {
            return Err(Error::EventClosed(record.id));
        }
        Ok(OpenEvent::new(
            self.api.clone(),
            record,
            self.config.effective_buffer_interval(),
        ))
    }

    /// Fetch one page of the event listing.
    pub async fn page(&self, offset: u64, limit: u32) -> Result<EventPage> {
        self.api.list_events(offset, limit).await
    }

    /// Iterate the listing one page (of `page_size` events) at a time.
    pub fn events(&self) -> EventCursor {
        self.events_from(0)
    }

    pub fn events_from(&self, offset: u64) -> EventCursor {
        EventCursor::new(self.api.clone(), offset, self.config.page_size)
    }
}
