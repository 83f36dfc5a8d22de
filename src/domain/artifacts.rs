//! Subscription artifact generation — pure functions of the deployment record.
//!
//! `render` must be deterministic: structurally equal records yield
//! byte-identical artifact maps, so the outputs can be cached, served, and
//! compared in tests. The subscription token is consumed here as data only;
//! generating it is the orchestrator's job, at record-creation time.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::domain::record::{ArtifactKind, CredentialOrigin, DeploymentRecord};

/// Render all client-facing artifacts for the deployment.
///
/// # Errors
///
/// Returns an error if the record has no credential material yet (the
/// ProvisionCredential step has not run).
pub fn render(record: &DeploymentRecord) -> Result<BTreeMap<ArtifactKind, Vec<u8>>> {
    let credential = record
        .credential
        .as_ref()
        .context("credential material has not been provisioned")?;
    let skip_verify = credential.origin == CredentialOrigin::SelfSigned;
    let url = subscription_url(record);
    let link = sub_link(&url);

    let mut artifacts = BTreeMap::new();
    artifacts.insert(
        ArtifactKind::ClashConfig,
        clash_config(
            record.spec.host_identity(),
            record.spec.listen_port,
            &record.spec.auth_secret,
            skip_verify,
        )
        .into_bytes(),
    );
    artifacts.insert(ArtifactKind::UriLink, link.clone().into_bytes());
    artifacts.insert(ArtifactKind::InfoText, info_text(&url, &link).into_bytes());
    Ok(artifacts)
}

/// URL the clash config is served at. The token segment is the only access
/// control on the route.
#[must_use]
pub fn subscription_url(record: &DeploymentRecord) -> String {
    let scheme = if record.spec.domain_name.is_some() {
        "https"
    } else {
        "http"
    };
    format!(
        "{scheme}://{}/{}/clash",
        record.spec.host_identity(),
        record.subscription_token
    )
}

/// Rule-mode clash configuration with a single hysteria2 proxy entry.
fn clash_config(host: &str, port: u16, secret: &str, skip_verify: bool) -> String {
    format!(
        "\
mixed-port: 7890
allow-lan: true
mode: rule
proxies:
  - name: \"Hysteria2-{host}\"
    type: hysteria2
    server: {host}
    port: {port}
    password: \"{secret}\"
    sni: {host}
    skip-cert-verify: {skip_verify}

proxy-groups:
  - name: PROXY
    type: select
    proxies:
      - \"Hysteria2-{host}\"
      - DIRECT

rules:
  - MATCH,PROXY
"
    )
}

/// Shareable `sub://` link: the subscription URL, base64-encoded.
fn sub_link(url: &str) -> String {
    format!("sub://{}", BASE64.encode(url))
}

fn info_text(url: &str, link: &str) -> String {
    format!("Clash subscription: {url}\nShadowrocket subscription: {link}\n")
}
