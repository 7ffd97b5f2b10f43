use super::table::footer;
use super::{format_timestamp, status_summary};
use crate::status::ReleaseStatus;

/// Detailed listing: every resource with its status and events
pub struct TextFormatter;

impl TextFormatter {
    pub fn format(status: &ReleaseStatus) -> String {
        let mut lines = vec![format!(
            "Resources for Helm release {} (namespace {}, revision {}):",
            status.release, status.namespace, status.revision
        )];

        if status.resources.is_empty() {
            lines.push("No resources found.".to_string());
        }

        for resource in &status.resources {
            let desc = &resource.resource;
            lines.push(format!(
                "- Kind: {} | Name: {} | Namespace: {}",
                desc.kind, desc.name, desc.namespace
            ));
            lines.push(format!("  Status: {}", status_summary(&resource.status)));

            if resource.events.is_empty() {
                lines.push("  Events: No events found".to_string());
            } else {
                lines.push("  Events:".to_string());
                for event in &resource.events {
                    lines.push(format!(
                        "    - Reason: {} | Message: {} | Type: {} | Count: {} | Time: {}",
                        event.reason,
                        event.message,
                        event.event_type,
                        event.count,
                        format_timestamp(event.timestamp.as_ref())
                    ));
                }
            }

            for degradation in &resource.degradations {
                lines.push(format!("  Warning: {}", degradation));
            }
        }

        lines.extend(footer(status));
        lines.join("\n")
    }
}
