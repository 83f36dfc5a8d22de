//! Pure domain types and functions.
//!
//! This layer is intentionally free of I/O, async, and imports from
//! `crate::infra`, `crate::commands`, or `crate::output`. All functions take
//! data in and return data out.

pub mod artifacts;
pub mod error;
pub mod record;
pub mod spec;
pub mod templates;

pub use error::ProvisionError;
pub use record::{ArtifactKind, CredentialMaterial, CredentialOrigin, DeploymentRecord};
pub use spec::DeploymentSpec;
