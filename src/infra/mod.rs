//! Infrastructure adapters — the production implementations of the
//! application ports, each driving one host tool through `CommandRunner`
//! or the filesystem.

pub mod apt;
pub mod certbot;
pub mod network;
pub mod nginx;
pub mod openssl;
pub mod state;
pub mod systemd;
pub mod ufw;

use anyhow::Result;

/// Provisioning rewrites /etc and drives system services; refuse early with
/// a clear error instead of failing mid-sequence on the first write.
pub fn ensure_root() -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::fs::MetadataExt;
        let meta = std::fs::metadata("/proc/self")?;
        if meta.uid() != 0 {
            return Err(crate::domain::ProvisionError::NotRoot.into());
        }
    }
    Ok(())
}
