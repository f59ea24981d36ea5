//! Per-name handles for attributes and streams

use auditor_shared::{DetailKind, DetailMode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::event::EventCore;

/// Write access to one named attribute or stream of an open event.
///
/// Handles are cheap to clone; clones share the local echo of the value.
#[derive(Clone)]
pub struct DetailHandle {
    core: Arc<EventCore>,
    kind: DetailKind,
    name: Arc<str>,
    echo: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for DetailHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailHandle")
            .field("event", self.core.id())
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

impl DetailHandle {
    fn new(core: Arc<EventCore>, kind: DetailKind, name: &str) -> Self {
        Self {
            core,
            kind,
            name: Arc::from(name),
            echo: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn kind(&self) -> DetailKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn echo(&self) -> MutexGuard<'_, Vec<String>> {
        self.echo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Values written through this handle since the last `set`.
    pub fn value(&self) -> Vec<String> {
        self.echo().clone()
    }

    /// Replace the value.
    pub async fn set(&self, value: impl ToString) -> Result<()> {
        self.core.ensure_open()?;
        let value = value.to_string();
        *self.echo() = vec![value.clone()];
        self.core
            .add_detail(self.kind, &self.name, value, DetailMode::Set)
            .await
    }

    /// Add a value (attributes) or append text (streams).
    pub async fn append(&self, value: impl ToString) -> Result<()> {
        self.core.ensure_open()?;
        let value = value.to_string();
        self.echo().push(value.clone());
        self.core
            .add_detail(self.kind, &self.name, value, DetailMode::Append)
            .await
    }
}

/// Handles of one kind for an event, created on first use.
pub struct DetailNamespace {
    core: Arc<EventCore>,
    kind: DetailKind,
    handles: Mutex<HashMap<String, DetailHandle>>,
}

impl DetailNamespace {
    pub(crate) fn new(core: Arc<EventCore>, kind: DetailKind) -> Self {
        Self {
            core,
            kind,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> DetailKind {
        self.kind
    }

    /// The handle for `name`, creating it on first access.
    pub fn get_or_create(&self, name: &str) -> DetailHandle {
        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handles
            .entry(name.to_string())
            .or_insert_with(|| DetailHandle::new(self.core.clone(), self.kind, name))
            .clone()
    }

    /// Names of the handles created so far, sorted
    pub fn names(&self) -> Vec<String> {
        let handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = handles.keys().cloned().collect();
        names.sort();
        names
    }
}
