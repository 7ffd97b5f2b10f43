mod json;
mod table;
mod text;
mod yaml;

pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use text::TextFormatter;
pub use yaml::YamlFormatter;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::cli::OutputFormat;
use crate::release::RevisionSummary;
use crate::status::{LiveStatus, ReleaseStatus};

/// Shown instead of a status mapping
pub const NO_STATUS: &str = "No status available";

pub fn format_status(status: &ReleaseStatus, format: &OutputFormat, no_headers: bool) -> String {
    match format {
        OutputFormat::Table => TableFormatter::format(status, no_headers),
        OutputFormat::Text => TextFormatter::format(status),
        OutputFormat::Json => JsonFormatter::format(status),
        OutputFormat::Yaml => YamlFormatter::format(status),
    }
}

pub fn format_history(
    revisions: &[RevisionSummary],
    format: &OutputFormat,
    no_headers: bool,
) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Text => {
            TableFormatter::format_history(revisions, no_headers)
        }
        OutputFormat::Json => JsonFormatter::format(revisions),
        OutputFormat::Yaml => YamlFormatter::format(revisions),
    }
}

/// Compact single-line rendering of a live status
fn status_summary(status: &LiveStatus) -> String {
    match status {
        LiveStatus::Observed(map) => {
            serde_json::to_string(map).unwrap_or_else(|_| NO_STATUS.to_string())
        }
        LiveStatus::NotObserved => NO_STATUS.to_string(),
    }
}

fn format_timestamp(timestamp: Option<&DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "<unknown>".to_string())
}
