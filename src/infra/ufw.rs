//! Firewall rule management through ufw.

use anyhow::{Context, Result, bail};

use crate::application::ports::{FirewallManager, Protocol};
use crate::command_runner::CommandRunner;

/// `FirewallManager` backed by ufw. `ufw allow` on an existing rule reports
/// "Skipping adding existing rule" and exits zero, so repeated opens are
/// harmless.
pub struct UfwFirewall<R> {
    runner: R,
}

impl<R: CommandRunner> UfwFirewall<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> FirewallManager for UfwFirewall<R> {
    async fn open_port(&self, port: u16, protocol: Protocol) -> Result<()> {
        let rule = format!("{port}/{}", protocol.as_str());
        let output = self
            .runner
            .run("ufw", &["allow", &rule])
            .await
            .with_context(|| format!("opening firewall port {rule}"))?;
        if !output.status.success() {
            bail!(
                "ufw allow {rule} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn enable(&self) -> Result<()> {
        // --force skips the "may disrupt ssh" confirmation prompt.
        let output = self
            .runner
            .run("ufw", &["--force", "enable"])
            .await
            .context("enabling firewall")?;
        if !output.status.success() {
            bail!(
                "ufw enable failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
