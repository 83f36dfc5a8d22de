//! The persisted deployment record and the host file layout it describes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::spec::DeploymentSpec;

/// Deployment directory on the host. Every generated file except the systemd
/// unit and the nginx site lives under it.
pub const DEPLOY_DIR: &str = "/etc/hysteria";
/// Daemon configuration file name inside the deployment directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";
/// Certificate file name (mode 0644).
pub const CERT_FILE_NAME: &str = "cert.crt";
/// Private key file name (mode 0600).
pub const KEY_FILE_NAME: &str = "private.key";
/// Persisted deployment record file name.
pub const RECORD_FILE_NAME: &str = "record.json";
/// Advisory lock file guarding install/uninstall.
pub const LOCK_FILE_NAME: &str = ".lock";
/// Directory holding generated subscription artifacts.
pub const SUBSCRIBE_DIR_NAME: &str = "subscribe";

/// Path of the daemon binary the service unit points at.
pub const DAEMON_BINARY: &str = "/usr/local/bin/hysteria";
/// Systemd unit name.
pub const SERVICE_UNIT: &str = "hysteria-server";
/// Systemd unit file path.
pub const SERVICE_UNIT_FILE: &str = "/etc/systemd/system/hysteria-server.service";
/// Nginx site name for the subscription front.
pub const NGINX_SITE: &str = "hysteria-sub";
/// Nginx sites-available directory.
pub const NGINX_SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
/// Nginx sites-enabled directory.
pub const NGINX_SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// How the TLS material was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialOrigin {
    /// Issued by a CA for a domain.
    Issued,
    /// Generated locally, bound to an IP identity.
    SelfSigned,
}

/// The TLS certificate/key pair serving the endpoint.
///
/// Owned by the deployment state store; other components hold only the
/// paths, never the file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialMaterial {
    pub certificate_path: PathBuf,
    pub key_path: PathBuf,
    /// Domain or IP used as the certificate subject (CN/SNI).
    pub subject_identity: String,
    pub origin: CredentialOrigin,
}

/// Kinds of client-facing subscription artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    ClashConfig,
    UriLink,
    InfoText,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::ClashConfig,
        ArtifactKind::UriLink,
        ArtifactKind::InfoText,
    ];

    /// File name under the `subscribe/` directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::ClashConfig => "clash.yaml",
            ArtifactKind::UriLink => "sub.txt",
            ArtifactKind::InfoText => "info.txt",
        }
    }
}

/// The persisted ground truth of what is currently deployed on the host.
///
/// Created when an install run starts, updated after every mutating step so
/// a failed install leaves a cleanable partial record, and deleted whole by
/// uninstall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub spec: DeploymentSpec,
    /// `None` until the ProvisionCredential step has run.
    pub credential: Option<CredentialMaterial>,
    /// True iff the unit file exists and the service has been enabled.
    pub service_unit_registered: bool,
    pub reverse_proxy_site_registered: bool,
    /// 128-bit hex token gating the subscription route. Generated once per
    /// install from the OS CSPRNG; stable across re-renders.
    pub subscription_token: String,
    /// Paths of the generated artifacts, keyed by kind.
    pub subscription_artifacts: BTreeMap<ArtifactKind, PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// A fresh record for an install run that has not mutated the host yet.
    #[must_use]
    pub fn new(spec: DeploymentSpec, subscription_token: String) -> Self {
        Self {
            spec,
            credential: None,
            service_unit_registered: false,
            reverse_proxy_site_registered: false,
            subscription_token,
            subscription_artifacts: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}
