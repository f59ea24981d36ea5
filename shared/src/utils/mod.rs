//! Utility functions and helpers

pub mod time;

use anyhow::Result;

/// Separator the service uses between tags.
pub const TAG_SEPARATOR: &str = ", ";

/// Parse a duration string (e.g., "250ms", "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<std::time::Duration> {
    let s = s.trim();

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str.trim().parse()?;
        Ok(std::time::Duration::from_millis(millis))
    } else if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str.trim().parse()?;
        Ok(std::time::Duration::from_secs(secs))
    } else if let Some(num_str) = s.strip_suffix('m') {
        let mins: u64 = num_str.trim().parse()?;
        scaled_secs(mins, 60)
    } else if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str.trim().parse()?;
        scaled_secs(hours, 3600)
    } else {
        // Default to seconds if no suffix
        let secs: u64 = s.parse()?;
        Ok(std::time::Duration::from_secs(secs))
    }
}

fn scaled_secs(value: u64, unit: u64) -> Result<std::time::Duration> {
    value
        .checked_mul(unit)
        .map(std::time::Duration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("duration too large: {} x {}s", value, unit))
}

/// Join tags the way the service stores them.
pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR)
}

/// Split a service tag string back into individual tags.
pub fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Flatten repeated, comma-separated tag arguments (`--tags a,b --tags c`).
pub fn explode_tags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
