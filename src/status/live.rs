// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use tracing::{debug, warn};

use super::{Degradation, LiveStatus};
use crate::kubernetes::{CatalogEntry, ControlPlane};

/// Read the live status of one object
///
/// Never fails: a failed read yields [`LiveStatus::NotObserved`] plus the
/// reason, an object without a `status` mapping yields the placeholder alone.
pub async fn fetch_live_status(
    plane: &dyn ControlPlane,
    entry: &CatalogEntry,
    namespace: &str,
    name: &str,
) -> (LiveStatus, Option<Degradation>) {
    match plane.get_object(entry, namespace, name).await {
        Ok(object) => {
            let status = LiveStatus::from_object(&object);
            if !status.is_observed() {
                debug!(kind = %entry.kind, namespace = %namespace, name = %name, "Object reports no status");
            }
            (status, None)
        }
        Err(e) => {
            warn!(
                kind = %entry.kind,
                namespace = %namespace,
                name = %name,
                error = %e,
                "Failed to get live resource"
            );
            (LiveStatus::NotObserved, Some(e.into()))
        }
    }
}
