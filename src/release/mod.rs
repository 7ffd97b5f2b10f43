mod manifest;
mod store;

pub use manifest::{DecodeWarning, ResourceDescriptor, decode_manifest};
pub use store::{HelmSecretStore, ReleaseRecord, RevisionSummary};
