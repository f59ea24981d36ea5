//! Detail records attached to an event
//!
//! A detail is either an attribute (a key with one or more values) or a
//! stream (a named, append-only piece of text). Details are sent to the
//! service in batches of [`DetailRecord`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of detail attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    Attribute,
    Stream,
}

impl DetailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailKind::Attribute => "attribute",
            DetailKind::Stream => "stream",
        }
    }
}

impl fmt::Display for DetailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a value replaces what the service holds or is added to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailMode {
    Set,
    Append,
}

impl fmt::Display for DetailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailMode::Set => f.write_str("set"),
            DetailMode::Append => f.write_str("append"),
        }
    }
}

/// One record of a details batch, as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub kind: DetailKind,
    pub name: String,
    pub value: String,
    pub mode: DetailMode,
}

impl DetailRecord {
    pub fn new(
        kind: DetailKind,
        name: impl Into<String>,
        value: impl Into<String>,
        mode: DetailMode,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            value: value.into(),
            mode,
        }
    }
}

/// Request body of the "append details" call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsBatch {
    pub details: Vec<DetailRecord>,
}
