//! Reverse proxy site management through nginx.
//!
//! The live site is only ever replaced by a candidate that already passed
//! `nginx -t`; validation runs against a throwaway wrapper config so it
//! never touches the live tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::application::ports::ReverseProxyController;
use crate::command_runner::CommandRunner;
use crate::domain::record::{NGINX_SITE, NGINX_SITES_AVAILABLE, NGINX_SITES_ENABLED};

pub struct NginxController<R> {
    runner: R,
}

impl<R: CommandRunner> NginxController<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn site_available() -> PathBuf {
        Path::new(NGINX_SITES_AVAILABLE).join(NGINX_SITE)
    }

    fn site_enabled() -> PathBuf {
        Path::new(NGINX_SITES_ENABLED).join(NGINX_SITE)
    }
}

impl<R: CommandRunner> ReverseProxyController for NginxController<R> {
    async fn write_candidate(&self, contents: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("hysteria-sub-")
            .suffix(".conf")
            .tempfile()
            .context("creating candidate site file")?;
        std::fs::write(file.path(), contents).context("writing candidate site file")?;
        // The candidate outlives this call; promotion disposes of it.
        let (_, path) = file.keep().context("persisting candidate site file")?;
        Ok(path)
    }

    async fn validate_candidate(&self, candidate: &Path) -> Result<()> {
        // `nginx -t` only accepts a full config, so wrap the server block in
        // a minimal one.
        let wrapper = tempfile::Builder::new()
            .prefix("hysteria-sub-check-")
            .suffix(".conf")
            .tempfile()
            .context("creating validation wrapper")?;
        let wrapper_body = format!(
            "events {{}}\nhttp {{ include {}; }}\n",
            candidate.display()
        );
        std::fs::write(wrapper.path(), wrapper_body).context("writing validation wrapper")?;

        let wrapper_path = wrapper.path().display().to_string();
        let output = self
            .runner
            .run("nginx", &["-t", "-c", &wrapper_path])
            .await
            .context("running nginx -t")?;
        if !output.status.success() {
            bail!(
                "candidate site rejected: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn promote_candidate(&self, candidate: &Path) -> Result<()> {
        let available = Self::site_available();
        let enabled = Self::site_enabled();
        if let Some(parent) = available.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        if let Some(parent) = enabled.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        // copy + remove instead of rename: the candidate lives in /tmp,
        // usually a different filesystem than /etc.
        std::fs::copy(candidate, &available)
            .with_context(|| format!("installing site {}", available.display()))?;
        let _ = std::fs::remove_file(candidate);

        if enabled.symlink_metadata().is_ok() {
            std::fs::remove_file(&enabled)
                .with_context(|| format!("replacing symlink {}", enabled.display()))?;
        }
        std::os::unix::fs::symlink(&available, &enabled)
            .with_context(|| format!("enabling site {}", enabled.display()))?;
        Ok(())
    }

    async fn remove_site(&self) -> Result<()> {
        let enabled = Self::site_enabled();
        if enabled.symlink_metadata().is_ok() {
            std::fs::remove_file(&enabled)
                .with_context(|| format!("removing symlink {}", enabled.display()))?;
        }
        let available = Self::site_available();
        if available.exists() {
            std::fs::remove_file(&available)
                .with_context(|| format!("removing site {}", available.display()))?;
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        // reload-or-restart also covers the case where nginx was installed
        // by EnsurePackages but never started.
        let output = self
            .runner
            .run("systemctl", &["reload-or-restart", "nginx"])
            .await
            .context("reloading nginx")?;
        if !output.status.success() {
            bail!(
                "nginx reload failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
