//! Deployment spec — the desired configuration for one install run.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::domain::error::ProvisionError;

/// Length of a generated auth secret.
pub const AUTH_SECRET_LEN: usize = 16;

/// Desired configuration for one install run.
///
/// Exactly one TLS strategy applies: a `domain_name` means CA issuance for
/// that domain; no `domain_name` means a self-signed certificate bound to
/// `public_address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Port the daemon listens on (1–65535).
    pub listen_port: u16,
    /// Client authentication secret. Non-empty; generated when the operator
    /// supplies none.
    pub auth_secret: String,
    /// Domain for CA-issued TLS, or `None` for a self-signed certificate.
    pub domain_name: Option<String>,
    /// IP literal or resolvable hostname clients reach the host at.
    pub public_address: String,
}

impl DeploymentSpec {
    /// The identity clients connect to: the domain when one is configured,
    /// otherwise the public address.
    #[must_use]
    pub fn host_identity(&self) -> &str {
        self.domain_name.as_deref().unwrap_or(&self.public_address)
    }

    /// Validate shape invariants. Port availability is probed separately,
    /// against the live host, before any mutation.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::InvalidSpec` naming the violated field.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.listen_port == 0 {
            return Err(ProvisionError::InvalidSpec(
                "listen_port must be between 1 and 65535".into(),
            ));
        }
        if self.auth_secret.is_empty() {
            return Err(ProvisionError::InvalidSpec(
                "auth_secret must not be empty".into(),
            ));
        }
        if self.public_address.trim().is_empty() {
            return Err(ProvisionError::InvalidSpec(
                "public_address must not be empty".into(),
            ));
        }
        if let Some(domain) = &self.domain_name {
            if domain.trim().is_empty() {
                return Err(ProvisionError::InvalidSpec(
                    "domain_name must not be empty when present".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Generate a 16-character alphanumeric auth secret from the OS CSPRNG.
#[must_use]
pub fn generate_auth_secret() -> String {
    OsRng
        .sample_iter(Alphanumeric)
        .take(AUTH_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Generate the 128-bit hex subscription token.
///
/// The token is the only access control on the unauthenticated subscription
/// route, so it must come from the OS CSPRNG — never from a timestamp or any
/// other public value.
#[must_use]
pub fn generate_subscription_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

/// Encode bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> DeploymentSpec {
        DeploymentSpec {
            listen_port: 443,
            auth_secret: "s3cretpassword00".into(),
            domain_name: None,
            public_address: "203.0.113.5".into(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_spec() {
        assert!(base_spec().validate().is_ok());
    }

    #[test]
    fn validate_rejects_port_zero() {
        let spec = DeploymentSpec {
            listen_port: 0,
            ..base_spec()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_secret() {
        let spec = DeploymentSpec {
            auth_secret: String::new(),
            ..base_spec()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_address() {
        let spec = DeploymentSpec {
            public_address: "  ".into(),
            ..base_spec()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_domain() {
        let spec = DeploymentSpec {
            domain_name: Some(String::new()),
            ..base_spec()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn host_identity_prefers_domain() {
        let mut spec = base_spec();
        assert_eq!(spec.host_identity(), "203.0.113.5");
        spec.domain_name = Some("proxy.example.com".into());
        assert_eq!(spec.host_identity(), "proxy.example.com");
    }

    #[test]
    fn generated_secret_is_16_alphanumeric_chars() {
        let secret = generate_auth_secret();
        assert_eq!(secret.len(), AUTH_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_token_is_32_hex_chars() {
        let token = generate_subscription_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(generate_subscription_token(), generate_subscription_token());
    }

    #[test]
    fn hex_encode_known_bytes() {
        assert_eq!(hex_encode(&[]), "");
        assert_eq!(hex_encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }
}
