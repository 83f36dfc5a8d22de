//! Service lifecycle management through systemctl.

use anyhow::{Context, Result, bail};

use crate::application::ports::ServiceSupervisor;
use crate::command_runner::CommandRunner;
use crate::domain::record::{SERVICE_UNIT, SERVICE_UNIT_FILE};

/// `ServiceSupervisor` backed by systemd.
///
/// Writing the unit file overwrites any previous version in place, and
/// `stop`/`disable`/`remove_unit` tolerate an absent unit so teardown always
/// converges.
pub struct SystemdSupervisor<R> {
    runner: R,
}

impl<R: CommandRunner> SystemdSupervisor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<std::process::Output> {
        self.runner
            .run("systemctl", args)
            .await
            .with_context(|| format!("running systemctl {}", args.join(" ")))
    }
}

impl<R: CommandRunner> ServiceSupervisor for SystemdSupervisor<R> {
    async fn install_unit(&self, contents: &str) -> Result<()> {
        std::fs::write(SERVICE_UNIT_FILE, contents)
            .with_context(|| format!("writing unit file {SERVICE_UNIT_FILE}"))
    }

    async fn remove_unit(&self) -> Result<()> {
        if std::path::Path::new(SERVICE_UNIT_FILE).exists() {
            std::fs::remove_file(SERVICE_UNIT_FILE)
                .with_context(|| format!("removing unit file {SERVICE_UNIT_FILE}"))?;
        }
        Ok(())
    }

    async fn daemon_reload(&self) -> Result<()> {
        let output = self.systemctl(&["daemon-reload"]).await?;
        if !output.status.success() {
            bail!(
                "systemctl daemon-reload failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn enable_and_restart(&self) -> Result<()> {
        let enable = self.systemctl(&["enable", SERVICE_UNIT]).await?;
        if !enable.status.success() {
            bail!(
                "systemctl enable failed: {}",
                String::from_utf8_lossy(&enable.stderr).trim()
            );
        }
        // restart rather than start so a reinstall picks up the new config.
        let restart = self.systemctl(&["restart", SERVICE_UNIT]).await?;
        if !restart.status.success() {
            bail!(
                "systemctl restart failed: {}",
                String::from_utf8_lossy(&restart.stderr).trim()
            );
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        // Non-zero just means the unit was never loaded; nothing to stop.
        let _ = self.systemctl(&["stop", SERVICE_UNIT]).await?;
        Ok(())
    }

    async fn disable(&self) -> Result<()> {
        let _ = self.systemctl(&["disable", SERVICE_UNIT]).await?;
        Ok(())
    }

    async fn is_active(&self) -> Result<bool> {
        let output = self.systemctl(&["is-active", "--quiet", SERVICE_UNIT]).await?;
        Ok(output.status.success())
    }
}
