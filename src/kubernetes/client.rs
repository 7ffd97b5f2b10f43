// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Event;
use kube::api::{DynamicObject, ListParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::time::Duration;
use tracing::{debug, info, trace};

use super::backend::{ActivityLog, ControlPlane, DiscoveryCatalog, ObservedEvent};
use super::discovery::{self, CatalogEntry};
use crate::status::{EventRecord, FetchError};

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for paginated list requests
/// Smaller pages reduce memory pressure on namespaces with many events
const PAGE_SIZE: u32 = 500;

/// Build a client configuration
///
/// Uses kubeconfig (optionally a specific context). Without a kubeconfig,
/// falls back to the in-cluster service account.
async fn load_config(context: Option<&str>) -> Result<Config> {
    match Kubeconfig::read() {
        Ok(kubeconfig) => {
            if let Some(ctx) = context
                && !kubeconfig.contexts.iter().any(|c| c.name == ctx)
            {
                return Err(anyhow!("Context '{}' not found in kubeconfig", ctx));
            }
            Config::from_custom_kubeconfig(
                kubeconfig,
                &KubeConfigOptions {
                    context: context.map(String::from),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to load kubeconfig for context '{}'",
                    context.unwrap_or("current")
                )
            })
        }
        Err(e) => {
            if let Some(ctx) = context {
                return Err(anyhow!(
                    "Context '{}' requested but no kubeconfig could be read: {}",
                    ctx,
                    e
                ));
            }
            debug!(error = %e, "No kubeconfig, trying in-cluster configuration");
            let config = Config::incluster().context("No kubeconfig and not running in a cluster")?;
            info!("Using in-cluster Kubernetes config");
            Ok(config)
        }
    }
}

/// Classify a kube error for display
fn classify_error(err: kube::Error) -> FetchError {
    match err {
        kube::Error::Api(api_err) => match api_err.code {
            404 => FetchError::NotFound,
            401 | 403 => FetchError::Forbidden(api_err.message),
            code => FetchError::Transport(format!("API error {}: {}", code, api_err.message)),
        },
        other => FetchError::Transport(other.to_string()),
    }
}

/// Convert a core/v1 Event into an observed event
///
/// The timestamp is the last time the event was seen, falling back to the
/// series, event time, first occurrence and finally object creation, since
/// events emitted through events.k8s.io often leave `lastTimestamp` unset.
fn observed_event(event: Event) -> ObservedEvent {
    let series = event.series.as_ref();
    let timestamp = event
        .last_timestamp
        .map(|t| t.0)
        .or_else(|| series.and_then(|s| s.last_observed_time.as_ref()).map(|t| t.0))
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| event.first_timestamp.as_ref().map(|t| t.0))
        .or_else(|| event.metadata.creation_timestamp.as_ref().map(|t| t.0));
    let count = event
        .count
        .or_else(|| series.and_then(|s| s.count))
        .unwrap_or(1);

    ObservedEvent {
        subject_name: event.involved_object.name.unwrap_or_default(),
        subject_kind: event.involved_object.kind.unwrap_or_default(),
        record: EventRecord {
            reason: event.reason.unwrap_or_default(),
            message: event.message.unwrap_or_default(),
            event_type: event.type_.unwrap_or_default(),
            count,
            timestamp,
        },
    }
}

/// Cluster access through kube-rs
#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
    default_namespace: String,
}

impl KubeBackend {
    /// Connect using the given kubeconfig context (or the current one)
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let mut config = load_config(context).await?;

        // Set timeouts for reliability
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        debug!(
            context = ?context,
            namespace = %default_namespace,
            "Created Kubernetes client"
        );
        Ok(Self {
            client,
            default_namespace,
        })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Namespace of the kubeconfig context ("default" when unset)
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn dynamic_api(&self, entry: &CatalogEntry, namespace: &str) -> Api<DynamicObject> {
        let coord = &entry.coordinate;
        let gvk = GroupVersionKind::gvk(&coord.group, &coord.version, &entry.kind);
        let ar = ApiResource::from_gvk_with_plural(&gvk, &coord.plural);
        if entry.namespaced {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        } else {
            Api::all_with(self.client.clone(), &ar)
        }
    }
}

#[async_trait]
impl DiscoveryCatalog for KubeBackend {
    async fn list_resource_kinds(&self) -> Result<Vec<CatalogEntry>> {
        discovery::discover_catalog(&self.client)
            .await
            .context("Failed to list API resources")
    }
}

#[async_trait]
impl ControlPlane for KubeBackend {
    async fn get_object(
        &self,
        entry: &CatalogEntry,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<serde_json::Value, FetchError> {
        debug!(
            kind = %entry.kind,
            group = %entry.coordinate.group,
            version = %entry.coordinate.version,
            namespace = %namespace,
            name = %name,
            "Fetching live resource"
        );
        let object = self
            .dynamic_api(entry, namespace)
            .get(name)
            .await
            .map_err(classify_error)?;
        serde_json::to_value(object).map_err(|e| FetchError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ActivityLog for KubeBackend {
    /// List events with pagination, using continue tokens to fetch all pages
    async fn list_events(&self, namespace: &str) -> Result<Vec<ObservedEvent>> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let mut events = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = ListParams::default().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list = api
                .list(&params)
                .await
                .with_context(|| format!("Failed to list events in namespace '{}'", namespace))?;
            page_count += 1;
            events.extend(list.items.into_iter().map(observed_event));

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        trace!(
            namespace = %namespace,
            pages = page_count,
            events = events.len(),
            "Listed events"
        );
        Ok(events)
    }
}
