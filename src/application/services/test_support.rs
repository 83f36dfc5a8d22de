//! Hand-rolled fakes shared by the service tests.

use std::any::Any;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, bail};

use crate::application::ports::{
    CertificateIssuer, DaemonInstaller, DeploymentStateStore, FirewallManager, IssuedPaths,
    PackageInstaller, PortProbe, ProgressReporter, Protocol, ReverseProxyController,
    SelfSignedGenerator, ServiceSupervisor,
};
use crate::domain::record::{ArtifactKind, DeploymentRecord};
use crate::domain::spec::DeploymentSpec;

/// One fake implementing every host capability port, recording calls in
/// order and failing on demand.
pub struct FakeHost {
    calls: Mutex<Vec<String>>,
    fail: Mutex<HashSet<&'static str>>,
    port_free: Mutex<bool>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: Mutex::new(HashSet::new()),
            port_free: Mutex::new(true),
        }
    }

    /// Make every call recorded under `label` fail from now on.
    pub fn fail_on(&self, label: &'static str) {
        self.fail.lock().unwrap().insert(label);
    }

    pub fn set_port_free(&self, free: bool) {
        *self.port_free.lock().unwrap() = free;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, label: &'static str) -> Result<()> {
        if self.fail.lock().unwrap().contains(label) {
            bail!("fake failure: {label}");
        }
        Ok(())
    }
}

impl PackageInstaller for FakeHost {
    async fn ensure_installed(&self, packages: &[&str]) -> Result<()> {
        self.record(format!("packages:{}", packages.join(",")));
        self.check("packages")
    }
}

impl DaemonInstaller for FakeHost {
    async fn ensure_daemon(&self) -> Result<()> {
        self.record("daemon".into());
        self.check("daemon")
    }

    async fn remove_daemon(&self) -> Result<()> {
        self.record("daemon:remove".into());
        self.check("daemon-remove")
    }
}

impl FirewallManager for FakeHost {
    async fn open_port(&self, port: u16, protocol: Protocol) -> Result<()> {
        self.record(format!("firewall:{port}/{}", protocol.as_str()));
        self.check("firewall")
    }

    async fn enable(&self) -> Result<()> {
        self.record("firewall:enable".into());
        self.check("firewall")
    }
}

impl CertificateIssuer for FakeHost {
    async fn issue(&self, domain: &str) -> Result<IssuedPaths> {
        self.record(format!("issue:{domain}"));
        self.check("issue")?;
        Ok(IssuedPaths {
            certificate: PathBuf::from("/tmp/fake/fullchain.pem"),
            key: PathBuf::from("/tmp/fake/privkey.pem"),
        })
    }
}

impl SelfSignedGenerator for FakeHost {
    async fn generate(&self, common_name: &str, _cert: &Path, _key: &Path) -> Result<()> {
        self.record(format!("selfsigned:{common_name}"));
        self.check("selfsigned")
    }
}

impl ServiceSupervisor for FakeHost {
    async fn install_unit(&self, _contents: &str) -> Result<()> {
        self.record("unit:install".into());
        self.check("unit")
    }

    async fn remove_unit(&self) -> Result<()> {
        self.record("unit:remove".into());
        self.check("unit")
    }

    async fn daemon_reload(&self) -> Result<()> {
        self.record("unit:daemon-reload".into());
        self.check("unit")
    }

    async fn enable_and_restart(&self) -> Result<()> {
        self.record("unit:start".into());
        self.check("start")
    }

    async fn stop(&self) -> Result<()> {
        self.record("unit:stop".into());
        self.check("stop")
    }

    async fn disable(&self) -> Result<()> {
        self.record("unit:disable".into());
        self.check("disable")
    }

    async fn is_active(&self) -> Result<bool> {
        Ok(false)
    }
}

impl ReverseProxyController for FakeHost {
    async fn write_candidate(&self, _contents: &str) -> Result<PathBuf> {
        self.record("proxy:candidate".into());
        self.check("candidate")?;
        Ok(PathBuf::from("/tmp/fake/candidate.conf"))
    }

    async fn validate_candidate(&self, _candidate: &Path) -> Result<()> {
        self.record("proxy:validate".into());
        self.check("validate")
    }

    async fn promote_candidate(&self, _candidate: &Path) -> Result<()> {
        self.record("proxy:promote".into());
        self.check("promote")
    }

    async fn remove_site(&self) -> Result<()> {
        self.record("proxy:remove".into());
        self.check("remove-site")
    }

    async fn reload(&self) -> Result<()> {
        self.record("proxy:reload".into());
        self.check("reload")
    }
}

impl PortProbe for FakeHost {
    async fn is_free(&self, port: u16) -> Result<bool> {
        self.record(format!("probe:{port}"));
        self.check("probe")?;
        Ok(*self.port_free.lock().unwrap())
    }
}

/// In-memory deployment state store.
#[derive(Default)]
pub struct FakeStore {
    saved: Mutex<Vec<DeploymentRecord>>,
    files: Mutex<Vec<String>>,
    cleared: Mutex<bool>,
    exists: Mutex<bool>,
}

impl FakeStore {
    pub fn saved(&self) -> Vec<DeploymentRecord> {
        self.saved.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<String> {
        self.files.lock().unwrap().clone()
    }

    pub fn was_cleared(&self) -> bool {
        *self.cleared.lock().unwrap()
    }

    pub fn seed(&self, record: DeploymentRecord) {
        self.saved.lock().unwrap().push(record);
        *self.exists.lock().unwrap() = true;
    }
}

impl DeploymentStateStore for FakeStore {
    async fn load(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.saved.lock().unwrap().last().cloned())
    }

    async fn save(&self, record: &DeploymentRecord) -> Result<()> {
        self.saved.lock().unwrap().push(record.clone());
        *self.exists.lock().unwrap() = true;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.cleared.lock().unwrap() = true;
        *self.exists.lock().unwrap() = false;
        self.saved.lock().unwrap().clear();
        Ok(())
    }

    fn deployment_exists(&self) -> bool {
        *self.exists.lock().unwrap()
    }

    fn certificate_path(&self) -> PathBuf {
        PathBuf::from("/tmp/fake/cert.crt")
    }

    fn key_path(&self) -> PathBuf {
        PathBuf::from("/tmp/fake/private.key")
    }

    fn acquire_lock(&self) -> Result<Box<dyn Any + Send>> {
        *self.exists.lock().unwrap() = true;
        Ok(Box::new(()))
    }

    async fn write_daemon_config(&self, _contents: &str) -> Result<()> {
        self.files.lock().unwrap().push("config".into());
        Ok(())
    }

    async fn install_credential_files(&self, certificate: &Path, _key: &Path) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .push(format!("copy:{}", certificate.display()));
        Ok(())
    }

    async fn set_credential_permissions(&self) -> Result<()> {
        self.files.lock().unwrap().push("perms".into());
        Ok(())
    }

    async fn write_artifact(&self, kind: ArtifactKind, _bytes: &[u8]) -> Result<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .push(format!("artifact:{}", kind.file_name()));
        Ok(PathBuf::from("/tmp/fake/subscribe").join(kind.file_name()))
    }
}

/// Reporter that drops everything.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

/// Reporter that keeps warnings for assertions.
#[derive(Default)]
pub struct CollectingReporter {
    warnings: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl ProgressReporter for CollectingReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_owned());
    }
}

/// Spec for an IP-only deployment, used across the service tests.
pub fn ip_spec() -> DeploymentSpec {
    DeploymentSpec {
        listen_port: 443,
        auth_secret: "s3cretpassword00".into(),
        domain_name: None,
        public_address: "203.0.113.5".into(),
    }
}
