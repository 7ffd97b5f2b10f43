// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Seams between the status aggregator and the outside world
//!
//! The aggregator only ever talks to these traits. `KubeBackend` and
//! `HelmSecretStore` implement them against a live cluster; tests use
//! in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;

use super::discovery::CatalogEntry;
use crate::release::ReleaseRecord;
use crate::status::{EventRecord, FetchError};

/// Where deployed releases are recorded
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Latest revision of a release, or `None` when no such release exists
    async fn get_release(&self, release: &str) -> Result<Option<ReleaseRecord>>;
}

/// The control plane's list of served kinds
#[async_trait]
pub trait DiscoveryCatalog: Send + Sync {
    async fn list_resource_kinds(&self) -> Result<Vec<CatalogEntry>>;
}

/// Point reads of live objects
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Read one object. Cluster-scoped kinds ignore `namespace`.
    async fn get_object(
        &self,
        entry: &CatalogEntry,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<serde_json::Value, FetchError>;
}

/// Event as listed from the cluster, with the object it names
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedEvent {
    pub subject_name: String,
    pub subject_kind: String,
    pub record: EventRecord,
}

/// Cluster activity log
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Every event visible in the namespace, in retrieval order
    async fn list_events(&self, namespace: &str) -> Result<Vec<ObservedEvent>>;
}
