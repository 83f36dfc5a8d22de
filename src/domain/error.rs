//! Typed provisioning error taxonomy.
//!
//! All variants implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. The orchestrator attaches the failing step name with
//! `.context()`, so the variant carries only the underlying cause.

use thiserror::Error;

/// Errors raised while provisioning or tearing down a deployment.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("port {0} is already in use")]
    PortInUse(u16),

    #[error("package installation failed: {0}")]
    PackageInstallFailed(String),

    #[error("certificate issuance failed: {0}")]
    CredentialIssuanceFailed(String),

    #[error("self-signed certificate generation failed: {0}")]
    CredentialGenerationFailed(String),

    #[error("service registration failed: {0}")]
    ServiceRegistrationFailed(String),

    #[error("service failed to start: {0}")]
    ServiceStartFailed(String),

    #[error("reverse-proxy configuration rejected by validation: {0}")]
    ReverseProxyConfigInvalid(String),

    #[error("reverse-proxy reload failed: {0}")]
    ReverseProxyReloadFailed(String),

    #[error("filesystem operation failed: {0}")]
    Filesystem(String),

    #[error("another provisioning operation is already running on this host")]
    AlreadyRunning,

    #[error("this command must be run as root")]
    NotRoot,

    #[error("invalid deployment spec: {0}")]
    InvalidSpec(String),
}
