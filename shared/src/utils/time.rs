//! Time-related utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Current wall-clock time in UTC
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp for display (RFC 3339, second precision)
pub fn display_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}
