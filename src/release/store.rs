// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Helm release storage (Secrets driver)
//!
//! Helm 3 records every revision of a release in a Secret of type
//! `helm.sh/release.v1`, labelled `owner=helm,name=<release>,version=<rev>`.
//! The `release` field holds base64(gzip(JSON)) of the release object.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ListParams;
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{debug, warn};

use crate::kubernetes::ReleaseStore;

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// The parts of a stored release the status aggregator needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub manifest: String,
}

/// One stored revision, as listed by `--history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionSummary {
    pub revision: u32,
    pub namespace: String,
    pub status: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Release object as serialized by Helm (only the fields we read)
#[derive(Debug, Deserialize)]
struct StoredRelease {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    manifest: String,
}

/// Decode the `release` field of a Helm storage Secret
pub fn decode_release_payload(raw: &[u8]) -> Result<ReleaseRecord> {
    let decoded = STANDARD
        .decode(raw.trim_ascii())
        .context("Release payload is not valid base64")?;

    let json = if decoded.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(decoded.as_slice())
            .read_to_end(&mut out)
            .context("Failed to decompress release payload")?;
        out
    } else {
        decoded
    };

    let release: StoredRelease =
        serde_json::from_slice(&json).context("Release payload is not valid JSON")?;

    Ok(ReleaseRecord {
        name: release.name,
        namespace: release.namespace,
        revision: release.version,
        manifest: release.manifest,
    })
}

fn label<'a>(secret: &'a Secret, key: &str) -> Option<&'a str> {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(key))
        .map(String::as_str)
}

fn revision_of(secret: &Secret) -> u32 {
    label(secret, "version")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn namespace_of(secret: &Secret) -> &str {
    secret.metadata.namespace.as_deref().unwrap_or_default()
}

/// Highest revision; ties (same release name in several namespaces) go to
/// the alphabetically first namespace
fn latest_revision(secrets: &[Secret]) -> Option<&Secret> {
    secrets.iter().max_by(|a, b| {
        revision_of(a)
            .cmp(&revision_of(b))
            .then_with(|| namespace_of(b).cmp(namespace_of(a)))
    })
}

fn summarize(secret: &Secret) -> RevisionSummary {
    RevisionSummary {
        revision: revision_of(secret),
        namespace: namespace_of(secret).to_string(),
        status: label(secret, "status").unwrap_or("unknown").to_string(),
        modified: label(secret, "modifiedAt")
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
    }
}

/// Reads releases from Helm's Secret storage
pub struct HelmSecretStore {
    client: Client,
    /// Namespace to search, or every namespace when `None`
    namespace: Option<String>,
}

impl HelmSecretStore {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn api(&self) -> Api<Secret> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn release_secrets(&self, release: &str) -> Result<Vec<Secret>> {
        let params = ListParams::default().labels(&format!("owner=helm,name={}", release));
        let secrets = self
            .api()
            .list(&params)
            .await
            .with_context(|| format!("Failed to list storage secrets for release '{}'", release))?;

        debug!(
            release = %release,
            namespace = ?self.namespace,
            revisions = secrets.items.len(),
            "Listed release secrets"
        );
        Ok(secrets.items)
    }

    /// All stored revisions of a release, oldest first
    pub async fn list_revisions(&self, release: &str) -> Result<Vec<RevisionSummary>> {
        let secrets = self.release_secrets(release).await?;
        let mut revisions: Vec<_> = secrets.iter().map(summarize).collect();
        revisions.sort_by(|a, b| {
            a.revision
                .cmp(&b.revision)
                .then_with(|| a.namespace.cmp(&b.namespace))
        });
        Ok(revisions)
    }
}

#[async_trait]
impl ReleaseStore for HelmSecretStore {
    async fn get_release(&self, release: &str) -> Result<Option<ReleaseRecord>> {
        let secrets = self.release_secrets(release).await?;
        let Some(latest) = latest_revision(&secrets) else {
            return Ok(None);
        };

        let mut namespaces: Vec<_> = secrets.iter().map(namespace_of).collect();
        namespaces.sort_unstable();
        namespaces.dedup();
        if namespaces.len() > 1 {
            warn!(
                release = %release,
                namespaces = ?namespaces,
                chosen = %namespace_of(latest),
                "Release name exists in several namespaces"
            );
        }

        let payload = latest
            .data
            .as_ref()
            .and_then(|data| data.get("release"))
            .ok_or_else(|| {
                anyhow!(
                    "Storage secret {} has no release data",
                    latest.metadata.name.as_deref().unwrap_or_default()
                )
            })?;

        let mut record = decode_release_payload(&payload.0)?;
        if record.namespace.is_empty() {
            record.namespace = namespace_of(latest).to_string();
        }
        if record.revision == 0 {
            record.revision = revision_of(latest);
        }
        Ok(Some(record))
    }
}
