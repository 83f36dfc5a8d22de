//! Provisioning orchestrator — the install use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`; all
//! I/O is routed through injected port traits.
//!
//! The install is an explicit ordered step list. Each step is applied
//! at-most-once per run and must be individually idempotent against partial
//! prior host state, even though the sequence as a whole is not resumable
//! mid-failure. On a fatal step failure the already-applied steps are NOT
//! rolled back: the partial record stays persisted so `uninstall` can clean
//! up whatever was created.

use anyhow::{Context, Result};

use crate::application::ports::{
    CertificateIssuer, DaemonInstaller, DeploymentStateStore, FirewallManager, PackageInstaller,
    PortProbe, ProgressReporter, Protocol, ReverseProxyController, SelfSignedGenerator,
    ServiceSupervisor,
};
use crate::application::services::credential;
use crate::domain::ProvisionError;
use crate::domain::record::DeploymentRecord;
use crate::domain::spec::{DeploymentSpec, generate_subscription_token};
use crate::domain::{artifacts, templates};

/// Packages the deployment needs present on the host.
pub const REQUIRED_PACKAGES: [&str; 4] = ["curl", "openssl", "nginx", "certbot"];

/// One schedulable unit of the install sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnsurePackages,
    OpenFirewallPorts,
    ProvisionCredential,
    WriteDaemonConfig,
    RegisterService,
    StartService,
    ConfigureReverseProxy,
    WriteSubscriptionArtifacts,
}

/// What a step failure does to the rest of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the remaining steps and surface the error.
    Fatal,
    /// Report a warning and continue.
    BestEffort,
}

impl Step {
    /// The install order. Credential material must exist before the config
    /// that embeds its paths; the config before the unit that points at it;
    /// the unit before the service start; and the subscription front only
    /// after the service is live.
    pub const SEQUENCE: [Step; 8] = [
        Step::EnsurePackages,
        Step::OpenFirewallPorts,
        Step::ProvisionCredential,
        Step::WriteDaemonConfig,
        Step::RegisterService,
        Step::StartService,
        Step::ConfigureReverseProxy,
        Step::WriteSubscriptionArtifacts,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Step::EnsurePackages => "EnsurePackages",
            Step::OpenFirewallPorts => "OpenFirewallPorts",
            Step::ProvisionCredential => "ProvisionCredential",
            Step::WriteDaemonConfig => "WriteDaemonConfig",
            Step::RegisterService => "RegisterService",
            Step::StartService => "StartService",
            Step::ConfigureReverseProxy => "ConfigureReverseProxy",
            Step::WriteSubscriptionArtifacts => "WriteSubscriptionArtifacts",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Step::EnsurePackages => "installing required packages...",
            Step::OpenFirewallPorts => "opening firewall ports...",
            Step::ProvisionCredential => "provisioning TLS credential...",
            Step::WriteDaemonConfig => "writing daemon configuration...",
            Step::RegisterService => "registering service unit...",
            Step::StartService => "starting service...",
            Step::ConfigureReverseProxy => "configuring subscription front...",
            Step::WriteSubscriptionArtifacts => "writing subscription artifacts...",
        }
    }

    /// Firewall tooling may be absent or already configured differently;
    /// proxy functionality must not be blocked by that. Everything else is
    /// fatal.
    #[must_use]
    pub fn policy(self) -> FailurePolicy {
        match self {
            Step::OpenFirewallPorts => FailurePolicy::BestEffort,
            _ => FailurePolicy::Fatal,
        }
    }
}

/// The capability adapters an install run drives, injected so tests can
/// substitute fakes.
pub struct HostCapabilities<'a, P, D, F, I, G, S, X, B> {
    pub packages: &'a P,
    pub daemon: &'a D,
    pub firewall: &'a F,
    pub issuer: &'a I,
    pub self_signed: &'a G,
    pub supervisor: &'a S,
    pub reverse_proxy: &'a X,
    pub port_probe: &'a B,
}

/// Run a full install and return the persisted deployment record.
///
/// The validation gate runs before any mutation: an occupied listen port
/// fails with `PortInUse` and leaves the host untouched.
///
/// # Errors
///
/// Returns the failing step's name via the context chain, wrapping the
/// typed `ProvisionError` cause.
pub async fn install<P, D, F, I, G, S, X, B>(
    spec: DeploymentSpec,
    caps: &HostCapabilities<'_, P, D, F, I, G, S, X, B>,
    store: &impl DeploymentStateStore,
    reporter: &impl ProgressReporter,
) -> Result<DeploymentRecord>
where
    P: PackageInstaller,
    D: DaemonInstaller,
    F: FirewallManager,
    I: CertificateIssuer,
    G: SelfSignedGenerator,
    S: ServiceSupervisor,
    X: ReverseProxyController,
    B: PortProbe,
{
    spec.validate()?;
    if !caps
        .port_probe
        .is_free(spec.listen_port)
        .await
        .context("probing listen port")?
    {
        return Err(ProvisionError::PortInUse(spec.listen_port).into());
    }

    let _lock = store.acquire_lock()?;
    let mut record = DeploymentRecord::new(spec, generate_subscription_token());

    for step in Step::SEQUENCE {
        reporter.step(step.description());
        match apply(step, caps, store, &mut record).await {
            Ok(()) => {}
            Err(e) if step.policy() == FailurePolicy::BestEffort => {
                reporter.warn(&format!("{}: {e:#}", step.name()));
            }
            Err(e) => {
                // Keep the partial record so uninstall can clean up.
                let _ = store.save(&record).await;
                return Err(e.context(format!("install step '{}' failed", step.name())));
            }
        }
        store
            .save(&record)
            .await
            .context("persisting deployment record")?;
    }

    reporter.success("deployment installed");
    Ok(record)
}

async fn apply<P, D, F, I, G, S, X, B>(
    step: Step,
    caps: &HostCapabilities<'_, P, D, F, I, G, S, X, B>,
    store: &impl DeploymentStateStore,
    record: &mut DeploymentRecord,
) -> Result<()>
where
    P: PackageInstaller,
    D: DaemonInstaller,
    F: FirewallManager,
    I: CertificateIssuer,
    G: SelfSignedGenerator,
    S: ServiceSupervisor,
    X: ReverseProxyController,
    B: PortProbe,
{
    match step {
        Step::EnsurePackages => {
            caps.packages
                .ensure_installed(&REQUIRED_PACKAGES)
                .await
                .map_err(|e| ProvisionError::PackageInstallFailed(format!("{e:#}")))?;
            caps.daemon
                .ensure_daemon()
                .await
                .map_err(|e| ProvisionError::PackageInstallFailed(format!("{e:#}")))?;
        }
        Step::OpenFirewallPorts => {
            let port = record.spec.listen_port;
            caps.firewall.open_port(port, Protocol::Tcp).await?;
            caps.firewall.open_port(port, Protocol::Udp).await?;
            // 80 for the CA HTTP challenge and the subscription front,
            // 443 for the HTTPS front when a domain is used.
            caps.firewall.open_port(80, Protocol::Tcp).await?;
            caps.firewall.open_port(443, Protocol::Tcp).await?;
            caps.firewall.enable().await?;
        }
        Step::ProvisionCredential => {
            let material =
                credential::provision(&record.spec, caps.issuer, caps.self_signed, store).await?;
            record.credential = Some(material);
        }
        Step::WriteDaemonConfig => {
            let material = record
                .credential
                .as_ref()
                .context("credential missing before config write")?;
            let config = templates::daemon_config(&record.spec, material)?;
            store
                .write_daemon_config(&config)
                .await
                .map_err(|e| ProvisionError::Filesystem(format!("{e:#}")))?;
        }
        Step::RegisterService => {
            caps.supervisor
                .install_unit(&templates::systemd_unit())
                .await
                .map_err(|e| ProvisionError::ServiceRegistrationFailed(format!("{e:#}")))?;
            caps.supervisor
                .daemon_reload()
                .await
                .map_err(|e| ProvisionError::ServiceRegistrationFailed(format!("{e:#}")))?;
        }
        Step::StartService => {
            caps.supervisor
                .enable_and_restart()
                .await
                .map_err(|e| ProvisionError::ServiceStartFailed(format!("{e:#}")))?;
            // The flag means installed AND enabled, so it flips only here.
            record.service_unit_registered = true;
        }
        Step::ConfigureReverseProxy => {
            let site = templates::nginx_site(&record.subscription_token);
            let candidate = caps.reverse_proxy.write_candidate(&site).await?;
            // The live config is only replaced once the candidate passes
            // validation; a rejected candidate leaves it untouched.
            caps.reverse_proxy
                .validate_candidate(&candidate)
                .await
                .map_err(|e| ProvisionError::ReverseProxyConfigInvalid(format!("{e:#}")))?;
            caps.reverse_proxy.promote_candidate(&candidate).await?;
            caps.reverse_proxy
                .reload()
                .await
                .map_err(|e| ProvisionError::ReverseProxyReloadFailed(format!("{e:#}")))?;
            record.reverse_proxy_site_registered = true;
        }
        Step::WriteSubscriptionArtifacts => {
            let rendered = artifacts::render(record)?;
            for (kind, bytes) in &rendered {
                let path = store
                    .write_artifact(*kind, bytes)
                    .await
                    .map_err(|e| ProvisionError::Filesystem(format!("{e:#}")))?;
                record.subscription_artifacts.insert(*kind, path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{
        CollectingReporter, FakeHost, FakeStore, NullReporter, ip_spec,
    };
    use crate::domain::record::{ArtifactKind, CredentialOrigin};
    use crate::domain::spec::generate_auth_secret;

    fn caps(host: &FakeHost) -> HostCapabilities<'_, FakeHost, FakeHost, FakeHost, FakeHost, FakeHost, FakeHost, FakeHost, FakeHost>
    {
        HostCapabilities {
            packages: host,
            daemon: host,
            firewall: host,
            issuer: host,
            self_signed: host,
            supervisor: host,
            reverse_proxy: host,
            port_probe: host,
        }
    }

    fn domain_spec() -> DeploymentSpec {
        DeploymentSpec {
            domain_name: Some("proxy.example.com".into()),
            ..ip_spec()
        }
    }

    #[tokio::test]
    async fn install_runs_every_step_in_order() {
        let host = FakeHost::new();
        let store = FakeStore::default();
        let record = install(ip_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect("install");

        assert!(record.service_unit_registered);
        assert!(record.reverse_proxy_site_registered);
        assert_eq!(record.subscription_artifacts.len(), 3);
        assert_eq!(record.subscription_token.len(), 32);
        assert_eq!(
            record.credential.as_ref().map(|c| c.origin),
            Some(CredentialOrigin::SelfSigned)
        );

        let calls = host.calls();
        let order = [
            "probe:443",
            "packages:curl,openssl,nginx,certbot",
            "daemon",
            "firewall:enable",
            "selfsigned:203.0.113.5",
            "unit:install",
            "unit:daemon-reload",
            "unit:start",
            "proxy:candidate",
            "proxy:validate",
            "proxy:promote",
            "proxy:reload",
        ];
        let mut last = 0;
        for call in order {
            let pos = calls
                .iter()
                .position(|c| c == call)
                .unwrap_or_else(|| panic!("missing call {call}: {calls:?}"));
            assert!(pos >= last, "call {call} out of order: {calls:?}");
            last = pos;
        }

        // Final persisted record matches the returned one.
        assert_eq!(store.saved().last(), Some(&record));
    }

    #[tokio::test]
    async fn occupied_port_fails_fast_with_zero_mutations() {
        let host = FakeHost::new();
        host.set_port_free(false);
        let store = FakeStore::default();
        let err = install(ip_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect_err("must fail");

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::PortInUse(443))
        ));
        assert_eq!(host.calls(), vec!["probe:443".to_owned()]);
        assert!(store.saved().is_empty());
        assert!(!store.deployment_exists());
    }

    #[tokio::test]
    async fn firewall_failure_is_downgraded_to_warning() {
        let host = FakeHost::new();
        host.fail_on("firewall");
        let store = FakeStore::default();
        let reporter = CollectingReporter::default();
        let record = install(ip_spec(), &caps(&host), &store, &reporter)
            .await
            .expect("install succeeds despite firewall failure");

        assert!(record.service_unit_registered);
        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("OpenFirewallPorts"));
    }

    #[tokio::test]
    async fn issuance_failure_aborts_and_keeps_partial_record() {
        let host = FakeHost::new();
        host.fail_on("issue");
        let store = FakeStore::default();
        let err = install(domain_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect_err("must fail");

        assert!(err.to_string().contains("ProvisionCredential"));
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::CredentialIssuanceFailed(_))
        ));
        // Earlier steps ran; later ones never did.
        assert!(host.calls().iter().any(|c| c.starts_with("packages:")));
        assert!(!host.calls().iter().any(|c| c == "unit:install"));
        // The partial record survives for a later uninstall.
        let saved = store.saved();
        let last = saved.last().expect("partial record persisted");
        assert!(last.credential.is_none());
        assert!(!last.service_unit_registered);
    }

    #[tokio::test]
    async fn start_failure_surfaces_supervisor_reason() {
        let host = FakeHost::new();
        host.fail_on("start");
        let store = FakeStore::default();
        let err = install(ip_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect_err("must fail");

        assert!(err.to_string().contains("StartService"));
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::ServiceStartFailed(_))
        ));
        // The subscription front is never touched after a failed start.
        assert!(!host.calls().iter().any(|c| c.starts_with("proxy:")));
        // The unit was written but never enabled, so the persisted record
        // must not claim otherwise.
        let saved = store.saved();
        let last = saved.last().expect("partial record persisted");
        assert!(!last.service_unit_registered);
    }

    #[tokio::test]
    async fn rejected_reverse_proxy_candidate_leaves_live_config_alone() {
        let host = FakeHost::new();
        host.fail_on("validate");
        let store = FakeStore::default();
        let err = install(ip_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect_err("must fail");

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::ReverseProxyConfigInvalid(_))
        ));
        let calls = host.calls();
        assert!(calls.iter().any(|c| c == "proxy:candidate"));
        assert!(calls.iter().any(|c| c == "proxy:validate"));
        assert!(!calls.iter().any(|c| c == "proxy:promote"));
        assert!(!calls.iter().any(|c| c == "proxy:reload"));
        let saved = store.saved();
        let last = saved.last().expect("partial record persisted");
        assert!(last.service_unit_registered);
        assert!(!last.reverse_proxy_site_registered);
    }

    #[tokio::test]
    async fn reinstall_with_same_spec_succeeds_without_duplicates() {
        let host = FakeHost::new();
        let store = FakeStore::default();
        let first = install(ip_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect("first install");
        let second = install(ip_spec(), &caps(&host), &store, &NullReporter)
            .await
            .expect("reinstall");

        // One unit registration per run — the adapter overwrites in place,
        // so the host ends up with exactly one unit and one site.
        assert_eq!(host.count("unit:install"), 2);
        assert_eq!(host.count("proxy:promote"), 2);
        // A reinstall mints a fresh token.
        assert_ne!(first.subscription_token, second.subscription_token);
    }

    #[tokio::test]
    async fn example_scenario_self_signed_on_443() {
        let host = FakeHost::new();
        let store = FakeStore::default();
        let secret = generate_auth_secret();
        assert_eq!(secret.len(), 16);
        let spec = DeploymentSpec {
            listen_port: 443,
            auth_secret: secret.clone(),
            domain_name: None,
            public_address: "203.0.113.5".into(),
        };
        let record = install(spec, &caps(&host), &store, &NullReporter)
            .await
            .expect("install");

        assert!(host.calls().contains(&"selfsigned:203.0.113.5".to_owned()));
        let rendered = artifacts::render(&record).expect("render");
        let clash =
            String::from_utf8(rendered[&ArtifactKind::ClashConfig].clone()).expect("utf8");
        assert!(clash.contains("server: 203.0.113.5"));
        assert!(clash.contains("port: 443"));
        assert!(clash.contains("skip-cert-verify: true"));
        assert!(clash.contains(&secret));
    }
}
