//! Log command implementation

use anyhow::{Context, Result};
use auditor_client::{Auditor, LogRequest};
use auditor_shared::utils::explode_tags;

use crate::output;
use crate::Cli;

/// Build the request for the words and flags given on the command line.
pub fn request(cli: &Cli) -> LogRequest {
    let mut request = LogRequest::new(cli.message.join(" ")).tags(explode_tags(&cli.tags));
    if let Some(level) = cli.level {
        request = request.level(level);
    }
    if let Some(user) = cli.user.as_deref().filter(|u| !u.is_empty()) {
        request = request.user(user);
    }
    request
}

pub async fn run(auditor: &Auditor, cli: &Cli) -> Result<()> {
    let record = auditor
        .log(&request(cli))
        .await
        .context("Failed to log event")?;
    output::success(&format!("logged event {}", record.id));
    Ok(())
}
