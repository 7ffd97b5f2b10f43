// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Live status aggregation for release resources
//!
//! Every decoded resource is enriched with the live `status` reported by the
//! cluster and its most recent events. Failures while enriching one resource
//! never affect the others; they are recorded as [`Degradation`]s instead.

mod aggregate;
mod events;
mod live;
#[cfg(test)]
mod testing;

pub use aggregate::{AggregateError, AggregateOptions, Aggregator};
use events::correlate;
use live::fetch_live_status;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::release::{DecodeWarning, ResourceDescriptor};

/// Last observed state of an object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiveStatus {
    /// The object's `status` mapping
    Observed(serde_json::Map<String, serde_json::Value>),
    /// Lookup failed or the object has no status (serialized as `null`)
    NotObserved,
}

impl LiveStatus {
    /// Extract the `status` mapping from a full object
    pub fn from_object(object: &serde_json::Value) -> Self {
        match object.get("status") {
            Some(serde_json::Value::Object(status)) => LiveStatus::Observed(status.clone()),
            _ => LiveStatus::NotObserved,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, LiveStatus::Observed(_))
    }
}

/// One event about a resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub reason: String,
    pub message: String,
    /// Event category ("Normal", "Warning")
    #[serde(rename = "type")]
    pub event_type: String,
    pub count: i32,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Why a point read failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("object not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0}")]
    Transport(String),
}

/// Why a resource's status or events are incomplete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Kind is not served by the cluster; status lookup skipped
    UnresolvedKind,
    /// Point read reported the object as missing
    ObjectNotFound,
    /// Point read failed for another reason
    FetchFailed { reason: String },
    /// Event listing failed
    EventsUnavailable { reason: String },
    /// Aggregation deadline expired before this resource was enriched
    DeadlineExceeded,
}

impl From<FetchError> for Degradation {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound => Degradation::ObjectNotFound,
            other => Degradation::FetchFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::UnresolvedKind => write!(f, "kind not served by cluster"),
            Degradation::ObjectNotFound => write!(f, "not found in cluster"),
            Degradation::FetchFailed { reason } => write!(f, "status unavailable: {}", reason),
            Degradation::EventsUnavailable { reason } => {
                write!(f, "events unavailable: {}", reason)
            }
            Degradation::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// A release resource with its live status and recent events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResource {
    #[serde(flatten)]
    pub resource: ResourceDescriptor,
    pub status: LiveStatus,
    /// At most [`events::EVENT_LIMIT`] records, most recent first
    pub events: Vec<EventRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl AggregatedResource {
    /// Placeholder for a resource whose enrichment did not finish
    pub fn unfinished(resource: ResourceDescriptor) -> Self {
        Self {
            resource,
            status: LiveStatus::NotObserved,
            events: Vec::new(),
            degradations: vec![Degradation::DeadlineExceeded],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Result of one aggregation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseStatus {
    pub release: String,
    pub namespace: String,
    pub revision: u32,
    /// One entry per decoded manifest document, in document order
    pub resources: Vec<AggregatedResource>,
    #[serde(rename = "warnings", skip_serializing_if = "Vec::is_empty")]
    pub decode_warnings: Vec<DecodeWarning>,
    /// Set when discovery failed and no kind could be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_warning: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deadline_exceeded: bool,
}

impl ReleaseStatus {
    pub fn degraded_count(&self) -> usize {
        self.resources.iter().filter(|r| r.is_degraded()).count()
    }
}
