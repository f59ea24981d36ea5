//! In-memory [`EventApi`] used by unit tests.

use async_trait::async_trait;
use auditor_shared::utils::split_tags;
use auditor_shared::{DetailRecord, EventId, EventPage, EventRecord, EventUpdate, NewEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::EventApi;

#[derive(Default)]
pub struct RecordingApi {
    next_id: AtomicU64,
    listing: Vec<EventRecord>,
    created: Mutex<Vec<NewEvent>>,
    updated: Mutex<Vec<EventId>>,
    details: Mutex<Vec<Vec<DetailRecord>>>,
    list_calls: Mutex<Vec<(u64, u32)>>,
    fail_details: AtomicBool,
    detail_delay: Option<Duration>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(n: u64) -> Self {
        Self {
            listing: (0..n)
                .map(|i| EventRecord {
                    id: EventId::new(i.to_string()),
                    summary: format!("event {}", i),
                    user: "tester".to_string(),
                    level: Some(1),
                    tags: Vec::new(),
                    start: None,
                    end: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Every details request sleeps this long before answering.
    pub fn with_detail_delay(delay: Duration) -> Self {
        Self {
            detail_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_details(&self, fail: bool) {
        self.fail_details.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<NewEvent> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<EventId> {
        self.updated.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<Vec<DetailRecord>> {
        self.details.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<(u64, u32)> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventApi for RecordingApi {
    async fn create_event(&self, event: &NewEvent) -> Result<EventRecord> {
        self.created.lock().unwrap().push(event.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(EventRecord {
            id: EventId::new(id.to_string()),
            summary: event.summary.clone(),
            user: event.user.clone(),
            level: Some(event.level),
            tags: event.tags.as_deref().map(split_tags).unwrap_or_default(),
            start: Some(event.start),
            end: event.end,
        })
    }

    async fn update_event(&self, id: &EventId, update: &EventUpdate) -> Result<EventRecord> {
        self.updated.lock().unwrap().push(id.clone());
        Ok(EventRecord {
            id: id.clone(),
            summary: "updated".to_string(),
            user: "tester".to_string(),
            level: Some(1),
            tags: Vec::new(),
            start: None,
            end: Some(update.end),
        })
    }

    async fn append_details(&self, _id: &EventId, details: &[DetailRecord]) -> Result<()> {
        if let Some(delay) = self.detail_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_details.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection refused".to_string()));
        }
        self.details.lock().unwrap().push(details.to_vec());
        Ok(())
    }

    async fn list_events(&self, offset: u64, limit: u32) -> Result<EventPage> {
        self.list_calls.lock().unwrap().push((offset, limit));
        let events = self
            .listing
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(EventPage {
            total: self.listing.len() as u64,
            events,
        })
    }
}
