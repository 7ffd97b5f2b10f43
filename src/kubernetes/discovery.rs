// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource discovery for Kubernetes clusters.
//!
//! Maps a manifest `kind` to the API coordinate the control plane expects.
//! The catalog is queried from the discovery API at run time (so CRDs
//! installed after the release are picked up) and rebuilt for every
//! aggregation call; nothing here is cached across calls.

use anyhow::Result;
use kube::Client;
use kube::discovery::{Discovery, Scope};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Addressable API identity of a kind: `(group, version, plural)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceCoordinate {
    /// API group (empty string for core v1)
    pub group: String,
    pub version: String,
    /// Plural resource name used in API paths (e.g. "configmaps")
    pub plural: String,
}

impl ResourceCoordinate {
    pub fn new(group: &str, version: &str, plural: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            plural: plural.to_string(),
        }
    }
}

/// One row of the discovery catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: String,
    pub coordinate: ResourceCoordinate,
    /// Whether objects of this kind live inside a namespace
    pub namespaced: bool,
}

impl CatalogEntry {
    pub fn new(kind: &str, coordinate: ResourceCoordinate, namespaced: bool) -> Self {
        Self {
            kind: kind.to_string(),
            coordinate,
            namespaced,
        }
    }
}

/// Split an apiVersion into (group, version). Core resources have an empty group.
pub fn split_api_version(api_version: &str) -> Option<(&str, &str)> {
    if api_version.is_empty() {
        return None;
    }
    match api_version.split_once('/') {
        Some((group, version)) => Some((group, version)),
        None => Some(("", api_version)),
    }
}

/// Kind → coordinate lookup table for one discovery snapshot
///
/// Entries keep catalog order. When a kind is registered under several
/// groups, the first entry in catalog order is the default answer.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    entries: Vec<CatalogEntry>,
    /// Kind name to indices into `entries`, in catalog order
    by_kind: HashMap<String, Vec<usize>>,
}

impl ResourceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut by_kind: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_kind.entry(entry.kind.clone()).or_default().push(idx);
        }
        Self { entries, by_kind }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn candidates(&self, kind: &str) -> impl Iterator<Item = &CatalogEntry> {
        self.by_kind
            .get(kind)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    /// Resolve a kind (exact, case-sensitive) to its catalog entry. First match wins.
    ///
    /// The entry carries the kind's coordinate and whether it is namespaced.
    pub fn resolve(&self, kind: &str) -> Option<&CatalogEntry> {
        self.candidates(kind).next()
    }

    /// Resolve a kind as declared in a manifest
    ///
    /// Prefers the entry serving the declared apiVersion, then any entry in the
    /// declared group, then [`resolve`](Self::resolve).
    pub fn resolve_for(&self, kind: &str, api_version: &str) -> Option<&CatalogEntry> {
        if let Some((group, version)) = split_api_version(api_version) {
            if let Some(exact) = self
                .candidates(kind)
                .find(|e| e.coordinate.group == group && e.coordinate.version == version)
            {
                return Some(exact);
            }
            if let Some(same_group) = self.candidates(kind).find(|e| e.coordinate.group == group) {
                return Some(same_group);
            }
        }
        self.resolve(kind)
    }
}

/// Query the discovery API for every served kind
///
/// Groups are walked alphabetically (the core group sorts first) using each
/// group's preferred version, so the result order is stable for a given
/// cluster state.
pub async fn discover_catalog(client: &Client) -> Result<Vec<CatalogEntry>> {
    let discovery = Discovery::new(client.clone()).run().await?;

    let mut entries = Vec::new();
    for group in discovery.groups_alphabetical() {
        for (ar, caps) in group.recommended_resources() {
            // Skip subresources (e.g., pods/log, deployments/scale)
            if ar.plural.contains('/') {
                continue;
            }
            entries.push(CatalogEntry {
                kind: ar.kind.clone(),
                coordinate: ResourceCoordinate::new(&ar.group, &ar.version, &ar.plural),
                namespaced: caps.scope == Scope::Namespaced,
            });
        }
    }

    debug!(kinds = entries.len(), "Discovery complete");
    Ok(entries)
}
