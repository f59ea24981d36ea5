//! Page-at-a-time iteration over the event listing

use auditor_shared::EventRecord;
use std::sync::Arc;

use crate::error::Result;
use crate::transport::EventApi;

/// Cursor over `GET /event/`, fetching one page per call.
pub struct EventCursor {
    api: Arc<dyn EventApi>,
    offset: u64,
    page_size: u32,
    total: Option<u64>,
    done: bool,
}

impl EventCursor {
    pub(crate) fn new(api: Arc<dyn EventApi>, offset: u64, page_size: u32) -> Self {
        Self {
            api,
            offset,
            page_size: page_size.max(1),
            total: None,
            done: false,
        }
    }

    /// Offset of the next page to fetch
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total reported by the service, once the first page has been fetched
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Fetch the next page; `Ok(None)` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<EventRecord>>> {
        if self.done {
            return Ok(None);
        }

        let page = self.api.list_events(self.offset, self.page_size).await?;
        self.total = Some(page.total);
        if page.events.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.offset += page.events.len() as u64;
        if self.offset >= page.total {
            self.done = true;
        }
        Ok(Some(page.events))
    }
}
