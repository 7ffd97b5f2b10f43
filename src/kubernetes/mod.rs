mod backend;
mod client;
pub mod discovery;

pub use backend::{ActivityLog, ControlPlane, DiscoveryCatalog, ObservedEvent, ReleaseStore};
pub use client::KubeBackend;
pub use discovery::{CatalogEntry, ResourceCatalog, ResourceCoordinate};
