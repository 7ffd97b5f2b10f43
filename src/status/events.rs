// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Correlate cluster events with release resources

use std::cmp::Reverse;
use tracing::{trace, warn};

use super::{Degradation, EventRecord};
use crate::kubernetes::{ActivityLog, ObservedEvent};

/// Maximum events attached to one resource
pub const EVENT_LIMIT: usize = 10;

/// Most recent events naming `(name, kind)` in `namespace`
///
/// Events are listed unfiltered and matched locally. The result is ordered
/// newest first (events without a timestamp last, retrieval order among
/// equal timestamps) and holds at most [`EVENT_LIMIT`] records. A failed
/// listing yields no events plus the reason.
pub async fn correlate(
    log: &dyn ActivityLog,
    namespace: &str,
    name: &str,
    kind: &str,
) -> (Vec<EventRecord>, Option<Degradation>) {
    match log.list_events(namespace).await {
        Ok(events) => (select_recent(events, name, kind), None),
        Err(e) => {
            warn!(
                namespace = %namespace,
                name = %name,
                kind = %kind,
                error = %e,
                "Failed to fetch events"
            );
            (
                Vec::new(),
                Some(Degradation::EventsUnavailable {
                    reason: e.to_string(),
                }),
            )
        }
    }
}

fn select_recent(events: Vec<ObservedEvent>, name: &str, kind: &str) -> Vec<EventRecord> {
    let total = events.len();
    let mut matching: Vec<EventRecord> = events
        .into_iter()
        .filter(|e| e.subject_name == name && e.subject_kind == kind)
        .map(|e| e.record)
        .collect();

    trace!(name = %name, kind = %kind, total, matched = matching.len(), "Filtered events");

    // sort_by_key is stable; None < Some so Reverse puts untimed events last
    matching.sort_by_key(|record| Reverse(record.timestamp));
    matching.truncate(EVENT_LIMIT);
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::testing::{FakeCluster, event};
    use chrono::{Duration, TimeZone, Utc};

    fn at(minute: i64) -> Option<chrono::DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minute))
    }

    #[tokio::test]
    async fn test_correlate_filters_by_name_and_kind() {
        let cluster = FakeCluster::new().with_events(
            "prod",
            vec![
                event("web", "Deployment", "ScalingReplicaSet", at(1)),
                event("web", "Service", "Other", at(2)),
                event("api", "Deployment", "Other", at(3)),
                event("web", "Deployment", "Updated", at(4)),
            ],
        );

        let (events, degradation) = correlate(&cluster, "prod", "web", "Deployment").await;
        assert!(degradation.is_none());
        let reasons: Vec<_> = events.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["Updated", "ScalingReplicaSet"]);
    }

    #[tokio::test]
    async fn test_correlate_limits_and_orders() {
        let many: Vec<_> = (0..25)
            .map(|i| event("web", "Deployment", &format!("r{}", i), at((i * 7) % 25)))
            .collect();
        let cluster = FakeCluster::new().with_events("prod", many);

        let (events, _) = correlate(&cluster, "prod", "web", "Deployment").await;
        assert_eq!(events.len(), EVENT_LIMIT);
        for pair in events.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
        assert_eq!(events[0].timestamp, at(24));
    }

    #[tokio::test]
    async fn test_correlate_stable_for_equal_timestamps() {
        let cluster = FakeCluster::new().with_events(
            "prod",
            vec![
                event("web", "Pod", "first", at(5)),
                event("web", "Pod", "second", at(5)),
                event("web", "Pod", "third", at(5)),
            ],
        );

        let (events, _) = correlate(&cluster, "prod", "web", "Pod").await;
        let reasons: Vec<_> = events.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_correlate_untimed_events_last() {
        let cluster = FakeCluster::new().with_events(
            "prod",
            vec![
                event("web", "Pod", "untimed", None),
                event("web", "Pod", "old", at(1)),
                event("web", "Pod", "new", at(2)),
            ],
        );

        let (events, _) = correlate(&cluster, "prod", "web", "Pod").await;
        let reasons: Vec<_> = events.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["new", "old", "untimed"]);
    }

    #[tokio::test]
    async fn test_correlate_no_matches() {
        let cluster = FakeCluster::new()
            .with_events("prod", vec![event("api", "Deployment", "Updated", at(1))]);
        let (events, degradation) = correlate(&cluster, "prod", "web", "Deployment").await;
        assert!(events.is_empty());
        assert!(degradation.is_none());
    }

    #[tokio::test]
    async fn test_correlate_listing_failure() {
        let cluster = FakeCluster::new().with_failing_events();
        let (events, degradation) = correlate(&cluster, "prod", "web", "Deployment").await;
        assert!(events.is_empty());
        assert!(matches!(
            degradation,
            Some(Degradation::EventsUnavailable { .. })
        ));
    }
}
