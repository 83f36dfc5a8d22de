//! Rendered host configuration: daemon config, systemd unit, nginx site.
//!
//! Everything here is a pure function of its inputs; callers decide where
//! the bytes land on disk.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::record::{
    CONFIG_FILE_NAME, CredentialMaterial, DAEMON_BINARY, DEPLOY_DIR, SUBSCRIBE_DIR_NAME,
};
use crate::domain::spec::DeploymentSpec;

#[derive(Serialize)]
struct DaemonConfig<'a> {
    listen: String,
    auth: AuthSection<'a>,
    tls: TlsSection<'a>,
}

#[derive(Serialize)]
struct AuthSection<'a> {
    r#type: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct TlsSection<'a> {
    cert: String,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sni: Option<&'a str>,
}

/// Render the daemon's YAML configuration. Deterministic given its inputs;
/// overwrites any prior file when written.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn daemon_config(spec: &DeploymentSpec, credential: &CredentialMaterial) -> Result<String> {
    let config = DaemonConfig {
        listen: format!(":{}", spec.listen_port),
        auth: AuthSection {
            r#type: "password",
            password: &spec.auth_secret,
        },
        tls: TlsSection {
            cert: credential.certificate_path.display().to_string(),
            key: credential.key_path.display().to_string(),
            sni: spec.domain_name.as_deref(),
        },
    };
    serde_yaml::to_string(&config).context("serializing daemon config")
}

/// The systemd unit registering the daemon as a supervised service.
#[must_use]
pub fn systemd_unit() -> String {
    format!(
        "\
[Unit]
Description=Hysteria 2 Server
After=network.target

[Service]
Type=simple
User=root
ExecStart={DAEMON_BINARY} server --config {DEPLOY_DIR}/{CONFIG_FILE_NAME}
WorkingDirectory={DEPLOY_DIR}
Restart=on-failure
RestartSec=10
LimitNOFILE=infinity

[Install]
WantedBy=multi-user.target
"
    )
}

/// The nginx site serving the clash subscription under the unguessable token
/// segment. Everything else in scope gets a fixed 404, and responses carry
/// no-cache headers so a rotated token cannot be served stale.
#[must_use]
pub fn nginx_site(subscription_token: &str) -> String {
    format!(
        "\
server {{
    listen 80;
    server_name _;

    location /{subscription_token}/clash {{
        default_type text/yaml;
        alias {DEPLOY_DIR}/{SUBSCRIBE_DIR_NAME}/clash.yaml;
        add_header Cache-Control \"no-store, no-cache, must-revalidate\" always;
        add_header Pragma \"no-cache\" always;
    }}

    location / {{
        return 404;
    }}
}}
"
    )
}
