//! Client TLS configuration for mutual authentication.
//!
//! Loads the PEM certificate chain and private key named in
//! [`ClientAuth`] and builds a `rustls` client config trusting the
//! bundled web-PKI roots plus any extra CA file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fhir_alarm_core::ClientAuth;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to read PEM file {path}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: rustls::pki_types::pem::Error,
    },

    #[error("No certificate found in {0}")]
    NoCertificate(PathBuf),

    #[error("TLS configuration rejected: {0}")]
    Tls(#[from] rustls::Error),
}

/// Build the client TLS config presenting the configured certificate.
pub fn client_config(
    auth: &ClientAuth,
    ca_location: Option<&Path>,
) -> Result<Arc<ClientConfig>, CredentialError> {
    let certs = load_certs(&auth.cert_location)?;
    let key = PrivateKeyDer::from_pem_file(&auth.key_location).map_err(|source| {
        CredentialError::Pem {
            path: auth.key_location.clone(),
            source,
        }
    })?;

    let mut roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    if let Some(ca) = ca_location {
        for cert in load_certs(ca)? {
            roots.add(cert)?;
        }
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)?;

    tracing::debug!(cert = %auth.cert_location.display(), "Loaded client certificate");
    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, CredentialError> {
    let pem_err = |source| CredentialError::Pem {
        path: path.to_path_buf(),
        source,
    };

    let certs = CertificateDer::pem_file_iter(path)
        .map_err(pem_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_err)?;

    if certs.is_empty() {
        return Err(CredentialError::NoCertificate(path.to_path_buf()));
    }
    Ok(certs)
}
