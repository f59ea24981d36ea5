//! Subscriptions to broadcast event notifications
//!
//! The service fans out notifications over a message bus; each broadcast
//! carries string headers and a JSON payload. A subscriber supplies match
//! headers, and receives every broadcast whose headers include all of them.
//! A `tags` list in the filter is exploded into one `tag:<name>` key per tag.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::broadcast;

use crate::error::{Error, Result};

const BUS_CAPACITY: usize = 1024;

/// Header key marking a broadcast as carrying `tag`.
pub fn tag_header(tag: &str) -> String {
    format!("tag:{}", tag)
}

/// One notification delivered over the bus
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub headers: HashMap<String, String>,
    pub payload: Value,
}

impl Broadcast {
    pub fn new(payload: Value) -> Self {
        Self {
            headers: HashMap::new(),
            payload,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        for tag in tags {
            self.headers
                .insert(tag_header(tag.as_ref()), "true".to_string());
        }
        self
    }
}

/// Match headers a broadcast must carry to be delivered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFilter {
    matches: BTreeMap<String, String>,
}

impl HeaderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.matches.insert(key.into(), value.into());
        self
    }

    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        for tag in tags {
            self.matches
                .insert(tag_header(tag.as_ref()), "true".to_string());
        }
        self
    }

    /// Build a filter from a JSON object of match headers.
    ///
    /// Strings, numbers and booleans match their string form; `tags` must be
    /// a list of strings. Anything else is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidFilter("filter must be a JSON object".to_string()))?;

        let mut filter = Self::new();
        for (key, value) in object {
            if key.is_empty() {
                return Err(Error::InvalidFilter("empty header name".to_string()));
            }
            if key == "tags" {
                let tags = value.as_array().ok_or_else(|| {
                    Error::InvalidFilter("tags must be a list of strings".to_string())
                })?;
                for tag in tags {
                    let tag = tag.as_str().filter(|t| !t.is_empty()).ok_or_else(|| {
                        Error::InvalidFilter(format!("invalid tag {}", tag))
                    })?;
                    filter = filter.with_tags(&[tag]);
                }
                continue;
            }
            let matched = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(Error::InvalidFilter(format!(
                        "header {} has unsupported value {}",
                        key, other
                    )))
                }
            };
            filter = filter.with(key.clone(), matched);
        }
        Ok(filter)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.matches
    }

    /// Whether `headers` contains every match pair of this filter
    pub fn matches(&self, headers: &HashMap<String, String>) -> bool {
        self.matches
            .iter()
            .all(|(k, v)| headers.get(k).is_some_and(|h| h == v))
    }
}

/// A connection delivering broadcasts until it closes.
#[async_trait]
pub trait BroadcastSource: Send {
    /// Next broadcast, or `None` once the connection is closed.
    async fn next_broadcast(&mut self) -> Option<Broadcast>;
}

/// In-process bus built on a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelBus {
    tx: broadcast::Sender<Broadcast>,
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish to every current subscriber; returns how many received it.
    pub fn publish(&self, broadcast: Broadcast) -> usize {
        match self.tx.send(broadcast) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("broadcast dropped: no subscribers");
                0
            }
        }
    }

    /// A new connection to the bus. It closes once every `ChannelBus`
    /// clone has been dropped.
    pub fn source(&self) -> ChannelSource {
        ChannelSource {
            rx: self.tx.subscribe(),
        }
    }
}

pub struct ChannelSource {
    rx: broadcast::Receiver<Broadcast>,
}

#[async_trait]
impl BroadcastSource for ChannelSource {
    async fn next_broadcast(&mut self) -> Option<Broadcast> {
        loop {
            match self.rx.recv().await {
                Ok(broadcast) => return Some(broadcast),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("subscription lagged, dropped {} broadcasts", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Deliver every matching broadcast to `callback` until the source closes.
/// Returns the number of delivered broadcasts.
pub async fn subscribe<S, F>(source: &mut S, filter: &HeaderFilter, mut callback: F) -> usize
where
    S: BroadcastSource + ?Sized,
    F: FnMut(Broadcast) + Send,
{
    let mut delivered = 0;
    while let Some(broadcast) = source.next_broadcast().await {
        if filter.matches(&broadcast.headers) {
            delivered += 1;
            callback(broadcast);
        }
    }
    tracing::debug!("subscription closed after {} deliveries", delivered);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_explodes_tags() {
        let filter = HeaderFilter::from_json(&json!({
            "user": "alice",
            "level": 2,
            "tags": ["ops", "prod"],
        }))
        .unwrap();

        let keys: Vec<&str> = filter.headers().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["level", "tag:ops", "tag:prod", "user"]);
        assert_eq!(filter.headers()["level"], "2");
    }

    #[test]
    fn test_malformed_filters_are_rejected() {
        for bad in [
            json!("user=alice"),
            json!({ "tags": "ops" }),
            json!({ "tags": [1] }),
            json!({ "user": null }),
            json!({ "nested": { "a": 1 } }),
            json!({ "": "x" }),
        ] {
            let err = HeaderFilter::from_json(&bad).unwrap_err();
            assert!(matches!(err, Error::InvalidFilter(_)), "{} accepted", bad);
        }
    }

    #[test]
    fn test_matching_requires_every_header() {
        let filter = HeaderFilter::new().with("user", "alice").with_tags(&["ops"]);

        let hit = Broadcast::new(json!({}))
            .with_header("user", "alice")
            .with_header("level", "1")
            .with_tags(&["ops", "prod"]);
        let miss = Broadcast::new(json!({})).with_header("user", "alice");

        assert!(filter.matches(&hit.headers));
        assert!(!filter.matches(&miss.headers));
        assert!(HeaderFilter::new().matches(&miss.headers));
    }

    #[tokio::test]
    async fn test_subscribe_runs_until_bus_closes() {
        let bus = ChannelBus::new();
        let mut source = bus.source();
        let filter = HeaderFilter::new().with_tags(&["deploy"]);

        let publisher = tokio::spawn(async move {
            bus.publish(Broadcast::new(json!({"id": 1})).with_tags(&["deploy"]));
            bus.publish(Broadcast::new(json!({"id": 2})).with_tags(&["backup"]));
            bus.publish(Broadcast::new(json!({"id": 3})).with_tags(&["deploy", "prod"]));
            // Dropping the last bus handle closes the connection.
        });

        let mut received = Vec::new();
        let delivered = subscribe(&mut source, &filter, |b| received.push(b.payload["id"].clone())).await;
        publisher.await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(received, vec![json!(1), json!(3)]);
    }
}
