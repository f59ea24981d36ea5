//! Event type definitions
//!
//! These types represent audit events as created, updated and listed through
//! the Auditor REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::utils::time::now_utc;
use crate::utils::{join_tags, split_tags};

/// Identifier assigned to an event by the service.
///
/// The service may hand out numeric or string ids; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => EventId(n.to_string()),
            RawId::Text(s) => EventId(s),
        })
    }
}

/// Body of the "create event" request
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub summary: String,
    pub user: String,
    pub level: i32,
    pub start: DateTime<Utc>,

    /// Tags joined with `", "`; omitted when there are none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// Set to `start` for events that are closed on creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn new(summary: impl Into<String>, user: impl Into<String>, level: i32) -> Self {
        Self {
            summary: summary.into(),
            user: user.into(),
            level,
            start: now_utc(),
            tags: None,
            end: None,
        }
    }

    pub fn with_tags(mut self, tags: &[String]) -> Self {
        let joined = join_tags(tags);
        self.tags = if joined.is_empty() { None } else { Some(joined) };
        self
    }

    /// Mark the event as finished at the moment it started.
    pub fn closed(mut self) -> Self {
        self.end = Some(self.start);
        self
    }
}

/// Body of the "update event" request
#[derive(Debug, Clone, Serialize)]
pub struct EventUpdate {
    pub end: DateTime<Utc>,
}

/// An event as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub level: Option<i32>,

    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl EventRecord {
    /// Whether the service has recorded an end time for this event
    pub fn is_closed(&self) -> bool {
        self.end.is_some()
    }
}

/// One page of the event listing
#[derive(Debug, Clone, Deserialize)]
pub struct EventPage {
    pub total: u64,
    pub events: Vec<EventRecord>,
}

/// Tags come back either as a `", "`-joined string or as a list.
fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTags {
        Joined(String),
        List(Vec<String>),
        Null(()),
    }

    Ok(match RawTags::deserialize(deserializer)? {
        RawTags::Joined(s) => split_tags(&s),
        RawTags::List(list) => list,
        RawTags::Null(()) => Vec::new(),
    })
}
