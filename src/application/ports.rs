//! Port trait definitions for the application layer.
//!
//! Ports are the contracts infrastructure must fulfill. This file imports
//! only from `crate::domain` — never from `crate::infra`, `crate::commands`,
//! or `crate::output`. Production implementations live in `crate::infra`;
//! tests inject hand-rolled fakes.

use std::any::Any;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::record::{ArtifactKind, DeploymentRecord};

// ── Value types ───────────────────────────────────────────────────────────────

/// Transport protocol for a firewall rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Where a CA issuance run left the certificate and key on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedPaths {
    pub certificate: PathBuf,
    pub key: PathBuf,
}

// ── Host capability ports ─────────────────────────────────────────────────────

/// Idempotent "ensure these packages are present" over the host package
/// manager.
#[allow(async_fn_in_trait)]
pub trait PackageInstaller {
    async fn ensure_installed(&self, packages: &[&str]) -> Result<()>;
}

/// Ensures the proxy daemon binary itself is installed, and removes it on
/// teardown.
#[allow(async_fn_in_trait)]
pub trait DaemonInstaller {
    async fn ensure_daemon(&self) -> Result<()>;
    /// Remove the daemon binary. Tolerates absence.
    async fn remove_daemon(&self) -> Result<()>;
}

/// Host firewall rule management. The orchestrator treats every failure here
/// as a warning, never as fatal.
#[allow(async_fn_in_trait)]
pub trait FirewallManager {
    async fn open_port(&self, port: u16, protocol: Protocol) -> Result<()>;
    async fn enable(&self) -> Result<()>;
}

/// Black-box CA issuance: given a domain, produce a certificate/key pair or
/// fail.
#[allow(async_fn_in_trait)]
pub trait CertificateIssuer {
    async fn issue(&self, domain: &str) -> Result<IssuedPaths>;
}

/// Local self-signed certificate generation for an IP identity.
#[allow(async_fn_in_trait)]
pub trait SelfSignedGenerator {
    /// Generate a 2048-bit key and an X.509 certificate with subject
    /// CN = `common_name`, valid for 365 days, written to the given paths.
    async fn generate(&self, common_name: &str, cert_path: &Path, key_path: &Path) -> Result<()>;
}

/// Supervised service lifecycle for the daemon's unit.
///
/// `remove_unit`, `stop`, and `disable` tolerate an already-absent target so
/// uninstall can always reach a clean state.
#[allow(async_fn_in_trait)]
pub trait ServiceSupervisor {
    async fn install_unit(&self, contents: &str) -> Result<()>;
    async fn remove_unit(&self) -> Result<()>;
    async fn daemon_reload(&self) -> Result<()>;
    async fn enable_and_restart(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn disable(&self) -> Result<()>;
    async fn is_active(&self) -> Result<bool>;
}

/// Reverse-proxy site management with validate-before-promote semantics.
///
/// The orchestrator sequences write → validate → promote → reload so the
/// live configuration is never replaced by a candidate that failed
/// validation.
#[allow(async_fn_in_trait)]
pub trait ReverseProxyController {
    /// Write the candidate site definition somewhere outside the live
    /// configuration and return its path.
    async fn write_candidate(&self, contents: &str) -> Result<PathBuf>;
    /// Syntax-check the candidate without touching the live configuration.
    async fn validate_candidate(&self, candidate: &Path) -> Result<()>;
    /// Move the validated candidate into place as the live site.
    async fn promote_candidate(&self, candidate: &Path) -> Result<()>;
    /// Remove the site, restoring a bare default. Tolerates absence.
    async fn remove_site(&self) -> Result<()>;
    async fn reload(&self) -> Result<()>;
}

/// Loopback probe for the validation gate: is anything listening on the
/// port already?
#[allow(async_fn_in_trait)]
pub trait PortProbe {
    async fn is_free(&self, port: u16) -> Result<bool>;
}

/// Discovers the host's public address, for pre-filling the spec.
#[allow(async_fn_in_trait)]
pub trait PublicIpDiscovery {
    async fn discover(&self) -> Result<String>;
}

// ── Deployment state store port ───────────────────────────────────────────────

/// The single writer of the deployment's file tree and the persisted record.
#[allow(async_fn_in_trait)]
pub trait DeploymentStateStore {
    async fn load(&self) -> Result<Option<DeploymentRecord>>;
    async fn save(&self, record: &DeploymentRecord) -> Result<()>;
    /// Remove the whole deployment tree. Tolerates absence.
    async fn clear(&self) -> Result<()>;
    /// Whether any deployment state exists on disk.
    fn deployment_exists(&self) -> bool;
    fn certificate_path(&self) -> PathBuf;
    fn key_path(&self) -> PathBuf;
    /// Take the exclusive provisioning lock for the duration of an
    /// install/uninstall. The returned guard releases the lock on drop.
    ///
    /// # Errors
    ///
    /// Fails with `ProvisionError::AlreadyRunning` when another operation
    /// holds the lock.
    fn acquire_lock(&self) -> Result<Box<dyn Any + Send>>;
    async fn write_daemon_config(&self, contents: &str) -> Result<()>;
    /// Copy issued certificate/key files into the deployment's fixed paths.
    async fn install_credential_files(&self, certificate: &Path, key: &Path) -> Result<()>;
    /// Apply the hard permission split: cert 0644, key 0600.
    async fn set_credential_permissions(&self) -> Result<()>;
    /// Write one subscription artifact and return its path.
    async fn write_artifact(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<PathBuf>;
}

// ── Progress reporting port ───────────────────────────────────────────────────

/// Lets services emit progress without depending on the presentation layer.
/// Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
