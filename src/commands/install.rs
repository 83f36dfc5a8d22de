//! `hy2ctl install` — provision the proxy endpoint.

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::PublicIpDiscovery;
use crate::application::services::install::{self, HostCapabilities};
use crate::command_runner::TokioCommandRunner;
use crate::domain::artifacts;
use crate::domain::record::{ArtifactKind, DeploymentRecord};
use crate::domain::spec::{DeploymentSpec, generate_auth_secret};
use crate::infra;
use crate::infra::apt::{AptInstaller, ScriptDaemonInstaller};
use crate::infra::certbot::CertbotIssuer;
use crate::infra::network::{IpifyDiscovery, LoopbackPortProbe};
use crate::infra::nginx::NginxController;
use crate::infra::openssl::OpensslGenerator;
use crate::infra::systemd::SystemdSupervisor;
use crate::infra::ufw::UfwFirewall;

/// Run `hy2ctl install`.
///
/// # Errors
///
/// Returns an error when not running as root, when the target port is
/// occupied, or when a fatal provisioning step fails.
pub async fn run(app: &AppContext) -> Result<()> {
    infra::ensure_root()?;

    let spec = collect_spec(app).await?;

    let packages = AptInstaller::new(TokioCommandRunner::default_timeout());
    let daemon = ScriptDaemonInstaller::new(TokioCommandRunner::default_timeout());
    let firewall = UfwFirewall::new(TokioCommandRunner::default_timeout());
    let issuer = CertbotIssuer::new(TokioCommandRunner::default_timeout());
    let self_signed = OpensslGenerator::new(TokioCommandRunner::default_timeout());
    let supervisor = SystemdSupervisor::new(TokioCommandRunner::default_timeout());
    let reverse_proxy = NginxController::new(TokioCommandRunner::default_timeout());
    let port_probe = LoopbackPortProbe;

    let caps = HostCapabilities {
        packages: &packages,
        daemon: &daemon,
        firewall: &firewall,
        issuer: &issuer,
        self_signed: &self_signed,
        supervisor: &supervisor,
        reverse_proxy: &reverse_proxy,
        port_probe: &port_probe,
    };

    let record = install::install(spec, &caps, &app.store, &app.reporter()).await?;
    print_summary(app, &record);
    Ok(())
}

/// Build the deployment spec from prompts, with discovery and generation
/// filling the gaps in non-interactive mode.
async fn collect_spec(app: &AppContext) -> Result<DeploymentSpec> {
    let public_address = match IpifyDiscovery.discover().await {
        Ok(addr) => addr,
        Err(e) if app.non_interactive => {
            return Err(e.context("public address discovery failed; rerun interactively"));
        }
        Err(_) => dialoguer::Input::new()
            .with_prompt("Public IP address of this host")
            .interact_text()
            .context("reading public address")?,
    };

    let domain_name = if app.non_interactive {
        None
    } else if app.confirm("Use a domain with a CA-issued certificate?", false)? {
        let domain: String = dialoguer::Input::new()
            .with_prompt("Domain (must already resolve to this host)")
            .interact_text()
            .context("reading domain")?;
        Some(domain)
    } else {
        None
    };

    let listen_port: u16 = if app.non_interactive {
        443
    } else {
        dialoguer::Input::new()
            .with_prompt("Listen port")
            .default("443".to_owned())
            .validate_with(|input: &String| match input.parse::<u16>() {
                Ok(p) if p > 0 => Ok(()),
                _ => Err("port must be 1-65535"),
            })
            .interact_text()
            .context("reading listen port")?
            .parse()
            .context("parsing listen port")?
    };

    let auth_secret = if app.non_interactive {
        generate_auth_secret()
    } else {
        let entered: String = dialoguer::Input::new()
            .with_prompt("Auth password (empty to generate)")
            .allow_empty(true)
            .interact_text()
            .context("reading auth password")?;
        if entered.is_empty() {
            generate_auth_secret()
        } else {
            entered
        }
    };

    Ok(DeploymentSpec {
        listen_port,
        auth_secret,
        domain_name,
        public_address,
    })
}

fn print_summary(app: &AppContext, record: &DeploymentRecord) {
    let out = &app.output;
    out.header("Deployment");
    out.kv(
        "endpoint   ",
        &format!("{}:{}", record.spec.host_identity(), record.spec.listen_port),
    );
    out.kv("password   ", &record.spec.auth_secret);
    out.kv("subscribe  ", &artifacts::subscription_url(record));
    if let Some(info) = record.subscription_artifacts.get(&ArtifactKind::InfoText) {
        out.kv("details    ", &info.display().to_string());
    }
}
