//! Package and daemon installation over apt and the upstream install script.

use anyhow::{Context, Result, bail};

use crate::application::ports::{DaemonInstaller, PackageInstaller};
use crate::command_runner::{CommandRunner, SLOW_CMD_TIMEOUT};
use crate::domain::record::DAEMON_BINARY;

/// `PackageInstaller` backed by apt-get. Re-running against already-present
/// packages is a no-op for apt, which gives the step its idempotency.
pub struct AptInstaller<R> {
    runner: R,
}

impl<R: CommandRunner> AptInstaller<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> PackageInstaller for AptInstaller<R> {
    async fn ensure_installed(&self, packages: &[&str]) -> Result<()> {
        let update = self
            .runner
            .run_with_timeout("apt-get", &["update", "-qq"], SLOW_CMD_TIMEOUT)
            .await
            .context("running apt-get update")?;
        if !update.status.success() {
            bail!(
                "apt-get update failed: {}",
                String::from_utf8_lossy(&update.stderr).trim()
            );
        }

        let mut args = vec!["install", "-y", "-qq"];
        args.extend_from_slice(packages);
        let install = self
            .runner
            .run_with_timeout("apt-get", &args, SLOW_CMD_TIMEOUT)
            .await
            .context("running apt-get install")?;
        if !install.status.success() {
            bail!(
                "apt-get install failed: {}",
                String::from_utf8_lossy(&install.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Installs the proxy daemon binary through the upstream install script.
/// Skipped entirely when the binary is already on disk.
pub struct ScriptDaemonInstaller<R> {
    runner: R,
}

impl<R: CommandRunner> ScriptDaemonInstaller<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> DaemonInstaller for ScriptDaemonInstaller<R> {
    async fn ensure_daemon(&self) -> Result<()> {
        if std::path::Path::new(DAEMON_BINARY).exists() {
            return Ok(());
        }
        let output = self
            .runner
            .run_with_timeout(
                "bash",
                &["-c", "curl -fsSL https://get.hy2.sh/ | bash"],
                SLOW_CMD_TIMEOUT,
            )
            .await
            .context("running daemon install script")?;
        if !output.status.success() {
            bail!(
                "daemon install script failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn remove_daemon(&self) -> Result<()> {
        if std::path::Path::new(DAEMON_BINARY).exists() {
            std::fs::remove_file(DAEMON_BINARY)
                .with_context(|| format!("removing daemon binary {DAEMON_BINARY}"))?;
        }
        Ok(())
    }
}
