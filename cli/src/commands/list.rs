//! List command implementation

use anyhow::{Context, Result};
use auditor_client::Auditor;
use auditor_shared::utils::time::display_timestamp;
use auditor_shared::EventRecord;

use crate::output;
use crate::Cli;

pub async fn run(auditor: &Auditor, cli: &Cli) -> Result<()> {
    let page = auditor
        .page(cli.offset, cli.limit)
        .await
        .context("Failed to list events")?;

    if page.events.is_empty() {
        output::info("No events.");
        return Ok(());
    }

    println!(
        "{} of {} event(s) from offset {}:",
        page.events.len(),
        page.total,
        cli.offset
    );
    for event in &page.events {
        println!("  {}", format_event(event));
    }
    Ok(())
}

pub fn format_event(event: &EventRecord) -> String {
    let mut line = format!(
        "#{} {} [{}] {}: {}",
        event.id,
        display_timestamp(event.start.as_ref()),
        event.level.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
        event.user,
        event.summary
    );
    if !event.tags.is_empty() {
        line.push_str(&format!(" ({})", event.tags.join(", ")));
    }
    if !event.is_closed() {
        line.push_str(" [open]");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_shared::EventId;

    #[test]
    fn test_format_event() {
        let event = EventRecord {
            id: EventId::new("12"),
            summary: "deployed web".to_string(),
            user: "root(alice)".to_string(),
            level: Some(2),
            tags: vec!["deploy".to_string(), "web".to_string()],
            start: Some("2024-03-01T10:00:00Z".parse().unwrap()),
            end: None,
        };
        assert_eq!(
            format_event(&event),
            "#12 2024-03-01T10:00:00Z [2] root(alice): deployed web (deploy, web) [open]"
        );
    }
}
