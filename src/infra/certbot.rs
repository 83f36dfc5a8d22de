//! CA certificate issuance through certbot.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::application::ports::{CertificateIssuer, IssuedPaths};
use crate::command_runner::{CommandRunner, SLOW_CMD_TIMEOUT};

const LETSENCRYPT_LIVE: &str = "/etc/letsencrypt/live";

/// `CertificateIssuer` backed by certbot's nginx plugin. Re-issuance for a
/// domain that already holds a valid certificate is a fast no-op on
/// certbot's side.
pub struct CertbotIssuer<R> {
    runner: R,
}

impl<R: CommandRunner> CertbotIssuer<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> CertificateIssuer for CertbotIssuer<R> {
    async fn issue(&self, domain: &str) -> Result<IssuedPaths> {
        let email = format!("admin@{domain}");
        let output = self
            .runner
            .run_with_timeout(
                "certbot",
                &[
                    "certonly",
                    "--nginx",
                    "-d",
                    domain,
                    "--non-interactive",
                    "--agree-tos",
                    "--email",
                    &email,
                    "--expand",
                ],
                SLOW_CMD_TIMEOUT,
            )
            .await
            .context("running certbot")?;
        if !output.status.success() {
            bail!(
                "certbot failed for {domain}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let live = Path::new(LETSENCRYPT_LIVE).join(domain);
        Ok(IssuedPaths {
            certificate: live.join("fullchain.pem"),
            key: live.join("privkey.pem"),
        })
    }
}
