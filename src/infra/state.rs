//! Filesystem implementation of the `DeploymentStateStore` port.
//!
//! `DeploymentStore` owns the deployment tree under `/etc/hysteria` and
//! provides async load/save using `tokio::task::spawn_blocking` with atomic
//! record writes (temp file + rename) to prevent state corruption.

use std::any::Any;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::application::ports::DeploymentStateStore;
use crate::domain::ProvisionError;
use crate::domain::record::{
    ArtifactKind, CERT_FILE_NAME, CONFIG_FILE_NAME, DEPLOY_DIR, DeploymentRecord, KEY_FILE_NAME,
    LOCK_FILE_NAME, RECORD_FILE_NAME, SUBSCRIBE_DIR_NAME,
};

/// Deployment tree manager — implements `DeploymentStateStore` for the
/// infra layer.
pub struct DeploymentStore {
    root: PathBuf,
}

/// Holds the exclusive provisioning lock; dropping the file releases it.
struct LockGuard {
    _file: std::fs::File,
}

impl DeploymentStore {
    /// Store rooted at the system deployment directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(PathBuf::from(DEPLOY_DIR))
    }

    /// Store with an explicit root (used in tests).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_FILE_NAME)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    fn subscribe_dir(&self) -> PathBuf {
        self.root.join(SUBSCRIBE_DIR_NAME)
    }

    fn load_sync(&self) -> Result<Option<DeploymentRecord>> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading record file {}", path.display()))?;
        let record: DeploymentRecord = serde_json::from_str(&content)
            .with_context(|| format!("parsing record file {}", path.display()))?;
        Ok(Some(record))
    }

    fn save_sync(&self, record: &DeploymentRecord) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating directory {}", self.root.display()))?;
        let content = serde_json::to_string_pretty(record).context("serializing record")?;

        // Atomic write via temp file then rename.
        let path = self.record_path();
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("finalizing record file {}", path.display()))?;
        Ok(())
    }

    fn clear_sync(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)
                .with_context(|| format!("removing deployment tree {}", self.root.display()))?;
        }
        Ok(())
    }
}

impl Default for DeploymentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeploymentStateStore for DeploymentStore {
    async fn load(&self) -> Result<Option<DeploymentRecord>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || DeploymentStore::with_root(root).load_sync())
            .await
            .context("record load task panicked")?
    }

    async fn save(&self, record: &DeploymentRecord) -> Result<()> {
        let root = self.root.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || DeploymentStore::with_root(root).save_sync(&record))
            .await
            .context("record save task panicked")?
    }

    async fn clear(&self) -> Result<()> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || DeploymentStore::with_root(root).clear_sync())
            .await
            .context("record clear task panicked")?
    }

    fn deployment_exists(&self) -> bool {
        self.root.exists()
    }

    fn certificate_path(&self) -> PathBuf {
        self.root.join(CERT_FILE_NAME)
    }

    fn key_path(&self) -> PathBuf {
        self.root.join(KEY_FILE_NAME)
    }

    fn acquire_lock(&self) -> Result<Box<dyn Any + Send>> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating directory {}", self.root.display()))?;
        let path = self.root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("opening lock file {}", path.display()))?;
        file.try_lock_exclusive()
            .map_err(|_| ProvisionError::AlreadyRunning)?;
        Ok(Box::new(LockGuard { _file: file }))
    }

    async fn write_daemon_config(&self, contents: &str) -> Result<()> {
        let path = self.config_path();
        let contents = contents.to_owned();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            std::fs::write(&path, contents)
                .with_context(|| format!("writing daemon config {}", path.display()))
        })
        .await
        .context("config write task panicked")?
    }

    async fn install_credential_files(&self, certificate: &Path, key: &Path) -> Result<()> {
        let cert_src = certificate.to_owned();
        let key_src = key.to_owned();
        let cert_dst = self.certificate_path();
        let key_dst = self.key_path();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = cert_dst.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            std::fs::copy(&cert_src, &cert_dst)
                .with_context(|| format!("copying certificate to {}", cert_dst.display()))?;
            std::fs::copy(&key_src, &key_dst)
                .with_context(|| format!("copying key to {}", key_dst.display()))?;
            Ok(())
        })
        .await
        .context("credential install task panicked")?
    }

    async fn set_credential_permissions(&self) -> Result<()> {
        let cert = self.certificate_path();
        let key = self.key_path();
        tokio::task::spawn_blocking(move || {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&cert, std::fs::Permissions::from_mode(0o644))
                    .with_context(|| format!("setting permissions on {}", cert.display()))?;
                std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o600))
                    .with_context(|| format!("setting permissions on {}", key.display()))?;
            }
            Ok(())
        })
        .await
        .context("permission task panicked")?
    }

    async fn write_artifact(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.subscribe_dir();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
            let path = dir.join(kind.file_name());
            std::fs::write(&path, bytes)
                .with_context(|| format!("writing artifact {}", path.display()))?;
            Ok(path)
        })
        .await
        .context("artifact write task panicked")?
    }
}
