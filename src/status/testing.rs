// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory cluster used by the status tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{EventRecord, FetchError};
use crate::kubernetes::{
    ActivityLog, CatalogEntry, ControlPlane, DiscoveryCatalog, ObservedEvent, ReleaseStore,
    ResourceCoordinate,
};
use crate::release::ReleaseRecord;

pub fn event(
    name: &str,
    kind: &str,
    reason: &str,
    timestamp: Option<DateTime<Utc>>,
) -> ObservedEvent {
    ObservedEvent {
        subject_name: name.to_string(),
        subject_kind: kind.to_string(),
        record: EventRecord {
            reason: reason.to_string(),
            message: format!("{} happened", reason),
            event_type: "Normal".to_string(),
            count: 1,
            timestamp,
        },
    }
}

pub fn standard_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new("ConfigMap", ResourceCoordinate::new("", "v1", "configmaps"), true),
        CatalogEntry::new("Service", ResourceCoordinate::new("", "v1", "services"), true),
        CatalogEntry::new(
            "ClusterRole",
            ResourceCoordinate::new("rbac.authorization.k8s.io", "v1", "clusterroles"),
            false,
        ),
        CatalogEntry::new("Deployment", ResourceCoordinate::new("apps", "v1", "deployments"), true),
    ]
}

#[derive(Default)]
pub struct FakeCluster {
    release: Option<ReleaseRecord>,
    store_fails: bool,
    catalog: Vec<CatalogEntry>,
    catalog_fails: bool,
    /// (plural, namespace, name) -> object
    objects: HashMap<(String, String, String), serde_json::Value>,
    fetch_errors: HashMap<String, FetchError>,
    events: HashMap<String, Vec<ObservedEvent>>,
    events_fail: bool,
    slow: HashSet<String>,
    slow_store: bool,
    slow_discovery: bool,
    pub discovery_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            catalog: standard_catalog(),
            ..Default::default()
        }
    }

    pub fn with_release(mut self, name: &str, namespace: &str, manifest: &str) -> Self {
        self.release = Some(ReleaseRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            manifest: manifest.to_string(),
        });
        self
    }

    pub fn with_failing_store(mut self) -> Self {
        self.store_fails = true;
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<CatalogEntry>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_failing_discovery(mut self) -> Self {
        self.catalog_fails = true;
        self
    }

    pub fn with_object(
        mut self,
        plural: &str,
        namespace: &str,
        name: &str,
        object: serde_json::Value,
    ) -> Self {
        self.objects.insert(
            (plural.to_string(), namespace.to_string(), name.to_string()),
            object,
        );
        self
    }

    pub fn with_fetch_error(mut self, name: &str, error: FetchError) -> Self {
        self.fetch_errors.insert(name.to_string(), error);
        self
    }

    pub fn with_events(mut self, namespace: &str, events: Vec<ObservedEvent>) -> Self {
        self.events.insert(namespace.to_string(), events);
        self
    }

    pub fn with_failing_events(mut self) -> Self {
        self.events_fail = true;
        self
    }

    /// Release lookups never finish within a test deadline
    pub fn with_slow_store(mut self) -> Self {
        self.slow_store = true;
        self
    }

    /// Discovery never finishes within a test deadline
    pub fn with_slow_discovery(mut self) -> Self {
        self.slow_discovery = true;
        self
    }

    /// Point reads of `name` never finish within a test deadline
    pub fn with_slow_object(mut self, name: &str) -> Self {
        self.slow.insert(name.to_string());
        self
    }
}

#[async_trait]
impl ReleaseStore for FakeCluster {
    async fn get_release(&self, release: &str) -> Result<Option<ReleaseRecord>> {
        if self.slow_store {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.store_fails {
            return Err(anyhow!("secrets is forbidden"));
        }
        Ok(self.release.clone().filter(|r| r.name == release))
    }
}

#[async_trait]
impl DiscoveryCatalog for FakeCluster {
    async fn list_resource_kinds(&self) -> Result<Vec<CatalogEntry>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_discovery {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.catalog_fails {
            return Err(anyhow!("discovery unavailable"));
        }
        Ok(self.catalog.clone())
    }
}

#[async_trait]
impl ControlPlane for FakeCluster {
    async fn get_object(
        &self,
        entry: &CatalogEntry,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<serde_json::Value, FetchError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow.contains(name) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(err) = self.fetch_errors.get(name) {
            return Err(err.clone());
        }
        let namespace = if entry.namespaced { namespace } else { "" };
        self.objects
            .get(&(
                entry.coordinate.plural.clone(),
                namespace.to_string(),
                name.to_string(),
            ))
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}

#[async_trait]
impl ActivityLog for FakeCluster {
    async fn list_events(&self, namespace: &str) -> Result<Vec<ObservedEvent>> {
        if self.events_fail {
            return Err(anyhow!("events is forbidden"));
        }
        Ok(self.events.get(namespace).cloned().unwrap_or_default())
    }
}
