//! `hy2ctl uninstall` — tear the proxy endpoint down.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::uninstall;
use crate::command_runner::TokioCommandRunner;
use crate::infra;
use crate::infra::apt::ScriptDaemonInstaller;
use crate::infra::nginx::NginxController;
use crate::infra::systemd::SystemdSupervisor;

/// Run `hy2ctl uninstall`.
///
/// # Errors
///
/// Returns an error when not running as root or when teardown cannot
/// complete.
pub async fn run(app: &AppContext) -> Result<()> {
    infra::ensure_root()?;

    if !app.confirm("Remove the deployment and all its files?", true)? {
        app.output.info("cancelled");
        return Ok(());
    }

    let supervisor = SystemdSupervisor::new(TokioCommandRunner::default_timeout());
    let daemon = ScriptDaemonInstaller::new(TokioCommandRunner::default_timeout());
    let reverse_proxy = NginxController::new(TokioCommandRunner::default_timeout());
    uninstall::uninstall(
        &supervisor,
        &daemon,
        &reverse_proxy,
        &app.store,
        &app.reporter(),
    )
    .await
}
