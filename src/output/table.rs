use std::borrow::Cow;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::{format_timestamp, status_summary};
use crate::release::RevisionSummary;
use crate::status::{AggregatedResource, ReleaseStatus};

/// Maximum width for free-form columns (status, last event)
const MAX_WIDE_COLUMN_WIDTH: usize = 60;

const HEADERS: &[&str] = &["kind", "name", "namespace", "status", "events", "last_event", "notes"];

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

fn row(resource: &AggregatedResource) -> Vec<String> {
    let last_event = resource
        .events
        .first()
        .map(|e| format!("{}: {}", e.reason, e.message))
        .unwrap_or_default();
    let notes = resource
        .degradations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");

    vec![
        resource.resource.kind.clone(),
        resource.resource.name.clone(),
        resource.resource.namespace.clone(),
        truncate_value(&status_summary(&resource.status), MAX_WIDE_COLUMN_WIDTH).into_owned(),
        resource.events.len().to_string(),
        truncate_value(&last_event, MAX_WIDE_COLUMN_WIDTH).into_owned(),
        notes,
    ]
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(status: &ReleaseStatus, no_headers: bool) -> String {
        let mut lines = vec![format!(
            "Release {} (namespace {}, revision {})",
            status.release, status.namespace, status.revision
        )];

        if status.resources.is_empty() {
            lines.push("No resources found.".to_string());
        } else {
            let mut table = Table::new();
            // ASCII_BORDERS_ONLY_CONDENSED is close to psql style
            table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);
            if !no_headers {
                table.set_header(HEADERS);
            }
            for resource in &status.resources {
                table.add_row(row(resource));
            }
            lines.push(table.to_string());
            lines.push(format!(
                "({} resources, {} degraded)",
                status.resources.len(),
                status.degraded_count()
            ));
        }

        lines.extend(footer(status));
        lines.join("\n")
    }

    pub fn format_history(revisions: &[RevisionSummary], no_headers: bool) -> String {
        if revisions.is_empty() {
            return "(0 revisions)".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);
        if !no_headers {
            table.set_header(vec!["REVISION", "NAMESPACE", "STATUS", "UPDATED"]);
        }
        for rev in revisions {
            table.add_row(vec![
                rev.revision.to_string(),
                rev.namespace.clone(),
                rev.status.clone(),
                format_timestamp(rev.modified.as_ref()),
            ]);
        }
        format!("{}\n({} revisions)", table, revisions.len())
    }
}

/// Report-level warnings shared by the human-readable formats
pub(super) fn footer(status: &ReleaseStatus) -> Vec<String> {
    let mut lines = Vec::new();
    for warning in &status.decode_warnings {
        lines.push(format!(
            "warning: manifest document {} skipped: {}",
            warning.index, warning.reason
        ));
    }
    if let Some(ref catalog_warning) = status.catalog_warning {
        lines.push(format!("warning: {}", catalog_warning));
    }
    if status.deadline_exceeded {
        lines.push("warning: deadline exceeded, some resources were not inspected".to_string());
    }
    lines
}
