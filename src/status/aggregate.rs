// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Release status aggregation
//!
//! Loads a release, decodes its manifest, then enriches every resource with
//! its live status and recent events. Resources are enriched concurrently
//! (bounded), each result lands in its own slot so document order survives.
//!
//! The whole call runs against a deadline. When it expires, resources that
//! finished keep their data and unfinished ones are returned as placeholders
//! marked [`Degradation::DeadlineExceeded`]; the list is never shortened.

use futures::StreamExt;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    AggregatedResource, Degradation, LiveStatus, ReleaseStatus, correlate, fetch_live_status,
};
use crate::kubernetes::{ActivityLog, ControlPlane, DiscoveryCatalog, ReleaseStore, ResourceCatalog};
use crate::progress::ProgressHandle;
use crate::release::{ResourceDescriptor, decode_manifest};

/// Default number of resources enriched at the same time
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default deadline for one aggregation call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Conditions that leave nothing to report
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("release '{0}' not found")]
    ReleaseNotFound(String),
    #[error("release '{0}' has an empty manifest")]
    EmptyManifest(String),
    #[error("deadline exceeded while loading release '{0}'")]
    DeadlineExceeded(String),
    #[error("failed to read release store: {0:#}")]
    Store(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Maximum resources enriched concurrently (at least 1)
    pub concurrency: usize,
    /// Deadline for the whole call
    pub timeout: Duration,
    /// Attach events to each resource
    pub include_events: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            include_events: true,
        }
    }
}

pub struct Aggregator {
    store: Arc<dyn ReleaseStore>,
    discovery: Arc<dyn DiscoveryCatalog>,
    plane: Arc<dyn ControlPlane>,
    events: Arc<dyn ActivityLog>,
    options: AggregateOptions,
    progress: Option<ProgressHandle>,
}

impl Aggregator {
    pub fn new<C>(store: Arc<dyn ReleaseStore>, cluster: Arc<C>) -> Self
    where
        C: DiscoveryCatalog + ControlPlane + ActivityLog + 'static,
    {
        Self {
            store,
            discovery: cluster.clone(),
            plane: cluster.clone(),
            events: cluster,
            options: AggregateOptions::default(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the status snapshot of one release
    pub async fn aggregate(&self, release_id: &str) -> Result<ReleaseStatus, AggregateError> {
        let deadline = Instant::now() + self.options.timeout;

        if let Some(progress) = &self.progress {
            progress.loading_release(release_id);
        }
        let release = tokio::time::timeout_at(deadline, self.store.get_release(release_id))
            .await
            .map_err(|_| AggregateError::DeadlineExceeded(release_id.to_string()))?
            .map_err(AggregateError::Store)?
            .ok_or_else(|| AggregateError::ReleaseNotFound(release_id.to_string()))?;

        if release.manifest.trim().is_empty() {
            return Err(AggregateError::EmptyManifest(release_id.to_string()));
        }

        let decoded = decode_manifest(&release.manifest, &release.namespace);
        info!(
            release = %release_id,
            namespace = %release.namespace,
            revision = release.revision,
            resources = decoded.resources.len(),
            skipped = decoded.warnings.len(),
            "Decoded release manifest"
        );

        let (catalog, catalog_warning) = self.load_catalog(deadline).await;

        let descriptors = decoded.resources;
        let (slots, deadline_exceeded) = self.enrich_all(&catalog, &descriptors, deadline).await;

        let resources: Vec<AggregatedResource> = slots
            .into_iter()
            .zip(descriptors)
            .map(|(slot, descriptor)| {
                slot.unwrap_or_else(|| AggregatedResource::unfinished(descriptor))
            })
            .collect();

        Ok(ReleaseStatus {
            release: release.name,
            namespace: release.namespace,
            revision: release.revision,
            resources,
            decode_warnings: decoded.warnings,
            catalog_warning,
            deadline_exceeded,
        })
    }

    /// Fetch the discovery catalog once for this call
    ///
    /// A failure is not fatal: every resource then ends up unresolved.
    async fn load_catalog(&self, deadline: Instant) -> (ResourceCatalog, Option<String>) {
        if let Some(progress) = &self.progress {
            progress.discovering();
        }
        let result = tokio::time::timeout_at(deadline, self.discovery.list_resource_kinds()).await;
        let error = match result {
            Ok(Ok(entries)) => {
                let catalog = ResourceCatalog::new(entries);
                debug!(kinds = catalog.len(), "Loaded discovery catalog");
                return (catalog, None);
            }
            Ok(Err(e)) => format!("discovery failed: {:#}", e),
            Err(_) => "discovery did not finish before the deadline".to_string(),
        };
        warn!(error = %error, "Resolving kinds without a discovery catalog");
        (ResourceCatalog::default(), Some(error))
    }

    /// Enrich every descriptor, returning one slot per descriptor
    async fn enrich_all(
        &self,
        catalog: &ResourceCatalog,
        descriptors: &[ResourceDescriptor],
        deadline: Instant,
    ) -> (Vec<Option<AggregatedResource>>, bool) {
        let total = descriptors.len();
        let mut slots: Vec<Option<AggregatedResource>> = vec![None; total];
        if total == 0 {
            return (slots, false);
        }
        if let Some(progress) = &self.progress {
            progress.enriching(total);
        }

        let mut pending = pin!(
            futures::stream::iter(descriptors.iter().enumerate())
                .map(|(idx, descriptor)| async move {
                    (idx, self.enrich(catalog, descriptor.clone()).await)
                })
                .buffer_unordered(self.options.concurrency.max(1))
        );
        let mut expired = pin!(tokio::time::sleep_until(deadline));

        // An expired deadline always wins, so a late start yields placeholders only
        let mut done = 0;
        loop {
            tokio::select! {
                biased;
                () = &mut expired => {
                    warn!(
                        completed = done,
                        total,
                        "Deadline exceeded, returning unfinished resources as placeholders"
                    );
                    return (slots, true);
                }
                next = pending.next() => match next {
                    Some((idx, resource)) => {
                        done += 1;
                        if let Some(progress) = &self.progress {
                            progress.resource_complete(&resource.resource.kind, &resource.resource.name, done, total);
                        }
                        slots[idx] = Some(resource);
                    }
                    None => return (slots, false),
                },
            }
        }
    }

    /// Resolve, read and correlate one resource
    async fn enrich(
        &self,
        catalog: &ResourceCatalog,
        resource: ResourceDescriptor,
    ) -> AggregatedResource {
        let status = async {
            match catalog.resolve_for(&resource.kind, &resource.api_version) {
                Some(entry) => {
                    fetch_live_status(
                        self.plane.as_ref(),
                        entry,
                        &resource.namespace,
                        &resource.name,
                    )
                    .await
                }
                None => {
                    warn!(
                        kind = %resource.kind,
                        namespace = %resource.namespace,
                        name = %resource.name,
                        "Skipping status lookup, kind not found in discovery catalog"
                    );
                    (LiveStatus::NotObserved, Some(Degradation::UnresolvedKind))
                }
            }
        };

        let events = async {
            if self.options.include_events {
                correlate(
                    self.events.as_ref(),
                    &resource.namespace,
                    &resource.name,
                    &resource.kind,
                )
                .await
            } else {
                (Vec::new(), None)
            }
        };

        let ((status, status_issue), (events, events_issue)) = tokio::join!(status, events);
        let degradations = status_issue.into_iter().chain(events_issue).collect();

        AggregatedResource {
            resource,
            status,
            events,
            degradations,
        }
    }
}
