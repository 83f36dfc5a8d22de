//! Self-signed certificate generation through the openssl CLI.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::application::ports::SelfSignedGenerator;
use crate::command_runner::CommandRunner;

/// `SelfSignedGenerator` shelling out to `openssl req`. Produces a 2048-bit
/// RSA key and a 365-day certificate with the subject CN bound to the host
/// identity.
pub struct OpensslGenerator<R> {
    runner: R,
}

impl<R: CommandRunner> OpensslGenerator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> SelfSignedGenerator for OpensslGenerator<R> {
    async fn generate(&self, common_name: &str, cert_path: &Path, key_path: &Path) -> Result<()> {
        if let Some(parent) = cert_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let subject = format!("/CN={common_name}");
        let cert = cert_path.display().to_string();
        let key = key_path.display().to_string();
        let output = self
            .runner
            .run(
                "openssl",
                &[
                    "req", "-x509", "-nodes", "-newkey", "rsa:2048", "-days", "365", "-keyout",
                    &key, "-out", &cert, "-subj", &subject,
                ],
            )
            .await
            .context("running openssl req")?;
        if !output.status.success() {
            bail!(
                "openssl req failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
