//! Credential material provisioner.
//!
//! Branches on the spec's TLS strategy and converges both branches on the
//! same output shape: the deployment's fixed cert/key paths with the
//! 0644/0600 permission split applied, so downstream steps never need to
//! know the origin.

use anyhow::Result;

use crate::application::ports::{CertificateIssuer, DeploymentStateStore, SelfSignedGenerator};
use crate::domain::ProvisionError;
use crate::domain::record::{CredentialMaterial, CredentialOrigin};
use crate::domain::spec::DeploymentSpec;

/// Obtain TLS material for the deployment.
///
/// With a `domain_name`, delegates to the CA issuer and copies the result
/// into the deployment's fixed paths; issuance failure is fatal — serving a
/// stated domain without a trusted certificate is not an acceptable silent
/// fallback. Without one, generates a self-signed certificate bound to the
/// public address.
///
/// # Errors
///
/// Returns `CredentialIssuanceFailed` or `CredentialGenerationFailed`
/// wrapping the collaborator's reported cause.
pub async fn provision(
    spec: &DeploymentSpec,
    issuer: &impl CertificateIssuer,
    generator: &impl SelfSignedGenerator,
    store: &impl DeploymentStateStore,
) -> Result<CredentialMaterial> {
    let certificate_path = store.certificate_path();
    let key_path = store.key_path();

    let material = match &spec.domain_name {
        Some(domain) => {
            let issued = issuer
                .issue(domain)
                .await
                .map_err(|e| ProvisionError::CredentialIssuanceFailed(format!("{e:#}")))?;
            store
                .install_credential_files(&issued.certificate, &issued.key)
                .await
                .map_err(|e| ProvisionError::Filesystem(format!("{e:#}")))?;
            CredentialMaterial {
                certificate_path,
                key_path,
                subject_identity: domain.clone(),
                origin: CredentialOrigin::Issued,
            }
        }
        None => {
            generator
                .generate(&spec.public_address, &certificate_path, &key_path)
                .await
                .map_err(|e| ProvisionError::CredentialGenerationFailed(format!("{e:#}")))?;
            CredentialMaterial {
                certificate_path,
                key_path,
                subject_identity: spec.public_address.clone(),
                origin: CredentialOrigin::SelfSigned,
            }
        }
    };

    store
        .set_credential_permissions()
        .await
        .map_err(|e| ProvisionError::Filesystem(format!("{e:#}")))?;
    Ok(material)
}
