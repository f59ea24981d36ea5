//! In-memory buffer of detail updates for one open event

use auditor_shared::{DetailKind, DetailMode};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Queued updates for one `(kind, name)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDetail {
    pub kind: DetailKind,
    pub name: String,
    pub values: Vec<String>,
    pub mode: DetailMode,
}

impl PendingDetail {
    fn new(kind: DetailKind, name: String) -> Self {
        Self {
            kind,
            name,
            values: Vec::new(),
            mode: DetailMode::Append,
        }
    }

    /// Fold one more call into this entry.
    ///
    /// `set` discards everything queued so far; `append` keeps whatever mode
    /// the entry already has.
    fn apply(&mut self, value: String, mode: DetailMode) {
        match mode {
            DetailMode::Set => {
                self.mode = DetailMode::Set;
                self.values.clear();
                self.values.push(value);
            }
            DetailMode::Append => self.values.push(value),
        }
    }
}

#[derive(Debug, Default)]
struct BufferState {
    index: HashMap<(DetailKind, String), usize>,
    entries: Vec<PendingDetail>,
}

/// Thread-safe accumulator of pending details. Holds at most one
/// [`PendingDetail`] per `(kind, name)`; the lock is never held across I/O.
#[derive(Debug, Default)]
pub struct DetailBuffer {
    state: Mutex<BufferState>,
}

impl DetailBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue one update, coalescing it into the existing entry for the same
    /// `(kind, name)`. Returns `true` when a new entry was created.
    pub fn enqueue(
        &self,
        kind: DetailKind,
        name: &str,
        value: impl Into<String>,
        mode: DetailMode,
    ) -> bool {
        let value = value.into();
        let mut state = self.lock();
        let key = (kind, name.to_string());

        let (idx, created) = match state.index.get(&key) {
            Some(&idx) => (idx, false),
            None => {
                let idx = state.entries.len();
                state.entries.push(PendingDetail::new(kind, name.to_string()));
                state.index.insert(key, idx);
                (idx, true)
            }
        };
        state.entries[idx].apply(value, mode);
        created
    }

    /// Take every pending entry, in first-enqueued order, leaving the buffer empty.
    pub fn drain(&self) -> Vec<PendingDetail> {
        let mut state = self.lock();
        state.index.clear();
        std::mem::take(&mut state.entries)
    }

    /// Number of pending `(kind, name)` entries
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the pending entry for `(kind, name)`, if any.
    pub fn pending(&self, kind: DetailKind, name: &str) -> Option<PendingDetail> {
        let state = self.lock();
        state
            .index
            .get(&(kind, name.to_string()))
            .map(|&idx| state.entries[idx].clone())
    }
}
