//! Teardown use-case — install's recovery path.
//!
//! Every action tolerates an already-absent target, so uninstall converges
//! a fully installed, partially installed, or already-clean host to the
//! same end state.

use anyhow::{Context, Result};

use crate::application::ports::{
    DaemonInstaller, DeploymentStateStore, ProgressReporter, ReverseProxyController,
    ServiceSupervisor,
};

/// Tear down the deployment: stop and unregister the service, remove the
/// subscription front, delete the daemon binary, and delete the deployment
/// tree.
///
/// A host with no deployment state at all is a no-op success. Reload
/// failures after site removal are warnings; the teardown still completes.
///
/// # Errors
///
/// Fails when the provisioning lock is held by another run, or when the
/// host refuses an operation that would leave live state behind.
pub async fn uninstall(
    supervisor: &impl ServiceSupervisor,
    daemon: &impl DaemonInstaller,
    reverse_proxy: &impl ReverseProxyController,
    store: &impl DeploymentStateStore,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let record = store.load().await.context("loading deployment record")?;
    if record.is_none() && !store.deployment_exists() {
        reporter.success("nothing to remove");
        return Ok(());
    }
    let _lock = store.acquire_lock()?;

    reporter.step("stopping service...");
    supervisor.stop().await.context("stopping service")?;
    supervisor.disable().await.context("disabling service")?;

    reporter.step("removing service unit...");
    supervisor.remove_unit().await.context("removing unit")?;
    if let Err(e) = supervisor.daemon_reload().await {
        reporter.warn(&format!("service manager reload: {e:#}"));
    }

    reporter.step("removing subscription front...");
    reverse_proxy
        .remove_site()
        .await
        .context("removing reverse proxy site")?;
    if let Err(e) = reverse_proxy.reload().await {
        reporter.warn(&format!("reverse proxy reload: {e:#}"));
    }

    reporter.step("removing deployment files...");
    daemon
        .remove_daemon()
        .await
        .context("removing daemon binary")?;
    store.clear().await.context("clearing deployment state")?;

    reporter.success("deployment removed");
    Ok(())
}
