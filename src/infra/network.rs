//! Network adapters — the local port probe and public address discovery.

use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{PortProbe, PublicIpDiscovery};

/// Probes the loopback interface: a successful connect means something is
/// already listening on the port.
pub struct LoopbackPortProbe;

impl PortProbe for LoopbackPortProbe {
    async fn is_free(&self, port: u16) -> Result<bool> {
        let occupied = tokio::task::spawn_blocking(move || {
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
            TcpStream::connect_timeout(&addr, Duration::from_secs(1)).is_ok()
        })
        .await
        .context("port probe task panicked")?;
        Ok(!occupied)
    }
}

/// Discovers the host's public IPv4 address via api.ipify.org.
pub struct IpifyDiscovery;

impl PublicIpDiscovery for IpifyDiscovery {
    async fn discover(&self) -> Result<String> {
        let body = tokio::task::spawn_blocking(|| {
            ureq::get("https://api.ipify.org")
                .timeout(Duration::from_secs(10))
                .call()
                .context("querying public address")?
                .into_string()
                .context("reading public address response")
        })
        .await
        .context("discovery task panicked")??;
        Ok(body.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[tokio::test]
    async fn occupied_port_is_reported_busy() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
        let port = listener.local_addr().expect("addr").port();
        assert!(!LoopbackPortProbe.is_free(port).await.expect("probe"));
    }

    #[tokio::test]
    async fn unbound_port_is_reported_free() {
        // Bind then drop to get a port that was just proven free.
        let port = {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
            listener.local_addr().expect("addr").port()
        };
        assert!(LoopbackPortProbe.is_free(port).await.expect("probe"));
    }
}
