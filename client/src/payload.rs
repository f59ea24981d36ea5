//! Conversion of drained buffer entries into wire records

use auditor_shared::{DetailKind, DetailMode, DetailRecord};

use crate::buffer::PendingDetail;

/// Build the records for one commit.
///
/// A stream entry becomes a single record holding all queued text, joined
/// without a separator. An attribute entry with N values becomes N records;
/// only the first one of an entry queued in `set` mode keeps `set`.
pub fn build_payload(entries: Vec<PendingDetail>) -> Vec<DetailRecord> {
    let mut payload = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.kind {
            DetailKind::Stream => payload.push(DetailRecord {
                kind: DetailKind::Stream,
                value: entry.values.concat(),
                name: entry.name,
                mode: entry.mode,
            }),
            DetailKind::Attribute => {
                for (idx, value) in entry.values.into_iter().enumerate() {
                    let mode = if entry.mode == DetailMode::Set && idx == 0 {
                        DetailMode::Set
                    } else {
                        DetailMode::Append
                    };
                    payload.push(DetailRecord {
                        kind: DetailKind::Attribute,
                        name: entry.name.clone(),
                        value,
                        mode,
                    });
                }
            }
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DetailBuffer;

    fn record(kind: DetailKind, name: &str, value: &str, mode: DetailMode) -> DetailRecord {
        DetailRecord::new(kind, name, value, mode)
    }

    #[test]
    fn test_set_then_appends() {
        let buffer = DetailBuffer::new();
        buffer.enqueue(DetailKind::Attribute, "tag", "x", DetailMode::Append);
        buffer.enqueue(DetailKind::Attribute, "tag", "a", DetailMode::Set);
        buffer.enqueue(DetailKind::Attribute, "tag", "b", DetailMode::Append);
        buffer.enqueue(DetailKind::Attribute, "tag", "c", DetailMode::Append);

        assert_eq!(
            build_payload(buffer.drain()),
            vec![
                record(DetailKind::Attribute, "tag", "a", DetailMode::Set),
                record(DetailKind::Attribute, "tag", "b", DetailMode::Append),
                record(DetailKind::Attribute, "tag", "c", DetailMode::Append),
            ]
        );
    }

    #[test]
    fn test_appends_only() {
        let buffer = DetailBuffer::new();
        buffer.enqueue(DetailKind::Attribute, "host", "web1", DetailMode::Append);
        buffer.enqueue(DetailKind::Attribute, "host", "web2", DetailMode::Append);

        let payload = build_payload(buffer.drain());
        assert!(payload.iter().all(|r| r.mode == DetailMode::Append));
        assert_eq!(
            payload.iter().map(|r| r.value.as_str()).collect::<Vec<_>>(),
            vec!["web1", "web2"]
        );
    }

    #[test]
    fn test_stream_text_concatenates() {
        let buffer = DetailBuffer::new();
        for chunk in ["hello", " ", "world", "\n"] {
            buffer.enqueue(DetailKind::Stream, "log", chunk, DetailMode::Append);
        }

        assert_eq!(
            build_payload(buffer.drain()),
            vec![record(DetailKind::Stream, "log", "hello world\n", DetailMode::Append)]
        );
    }

    #[test]
    fn test_stream_set_keeps_mode() {
        let buffer = DetailBuffer::new();
        buffer.enqueue(DetailKind::Stream, "out", "old", DetailMode::Append);
        buffer.enqueue(DetailKind::Stream, "out", "new ", DetailMode::Set);
        buffer.enqueue(DetailKind::Stream, "out", "text", DetailMode::Append);

        assert_eq!(
            build_payload(buffer.drain()),
            vec![record(DetailKind::Stream, "out", "new text", DetailMode::Set)]
        );
    }

    #[test]
    fn test_empty_drain_builds_nothing() {
        assert!(build_payload(Vec::new()).is_empty());
    }
}
