//! `hy2ctl status` — show the current deployment.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::{DeploymentStateStore, ServiceSupervisor};
use crate::command_runner::TokioCommandRunner;
use crate::domain::artifacts;
use crate::domain::record::CredentialOrigin;
use crate::infra;
use crate::infra::systemd::SystemdSupervisor;

/// Run `hy2ctl status`.
///
/// # Errors
///
/// Returns an error when not running as root (the record is root-only) or
/// if the deployment record cannot be read.
pub async fn run(app: &AppContext) -> Result<()> {
    infra::ensure_root()?;

    let Some(record) = app.store.load().await? else {
        app.output.info("no deployment installed");
        return Ok(());
    };

    let supervisor = SystemdSupervisor::new(TokioCommandRunner::default_timeout());
    let service = match supervisor.is_active().await {
        Ok(true) => "active",
        Ok(false) => "inactive",
        Err(_) => "unknown",
    };

    let out = &app.output;
    out.header("Deployment");
    out.kv(
        "endpoint   ",
        &format!("{}:{}", record.spec.host_identity(), record.spec.listen_port),
    );
    out.kv(
        "credential ",
        match record.credential.as_ref().map(|c| c.origin) {
            Some(CredentialOrigin::Issued) => "CA-issued",
            Some(CredentialOrigin::SelfSigned) => "self-signed",
            None => "not provisioned",
        },
    );
    out.kv("service    ", service);
    out.kv("subscribe  ", &artifacts::subscription_url(&record));
    out.kv(
        "created    ",
        &record.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    Ok(())
}
