//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no PEM certificate found in {0:?}")]
    NoCertificate(PathBuf),

    #[error("no PEM private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("invalid PEM data in {path:?}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS configuration rejected: {0}")]
    Config(#[source] std::io::Error),
}

/// Load TLS configuration from certificate and key files.
///
/// The PEM files are checked up front so a missing or empty file is reported
/// by name instead of as a generic rustls error.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    let cert_pem = read(cert_path).await?;
    let key_pem = read(key_path).await?;

    check_certificates(cert_path, &cert_pem)?;
    check_private_key(key_path, &key_pem)?;

    let config = RustlsConfig::from_pem(cert_pem, key_pem)
        .await
        .map_err(TlsError::Config)?;

    tracing::info!(cert = ?cert_path, key = ?key_path, "TLS certificate loaded");
    Ok(config)
}

async fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    tokio::fs::read(path).await.map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn check_certificates(path: &Path, pem: &[u8]) -> Result<(), TlsError> {
    let mut reader = pem;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificate(path.to_path_buf()));
    }
    Ok(())
}

fn check_private_key(path: &Path, pem: &[u8]) -> Result<(), TlsError> {
    let mut reader = pem;
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(TlsError::NoPrivateKey(path.to_path_buf())),
        Err(source) => Err(TlsError::Pem {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_certificate_named() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");

        let err = load_tls_config(&cert, &key).await.unwrap_err();
        match err {
            TlsError::Read { path, .. } => assert_eq!(path, cert),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_without_pem_blocks() {
        let path = Path::new("cert.pem");
        let err = check_certificates(path, b"not a certificate\n").unwrap_err();
        assert!(matches!(err, TlsError::NoCertificate(_)));

        let err = check_private_key(Path::new("key.pem"), b"").unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey(_)));
    }

    #[test]
    fn test_certificate_is_not_a_key() {
        let pem = b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(check_certificates(Path::new("cert.pem"), pem).is_ok());
        assert!(matches!(
            check_private_key(Path::new("cert.pem"), pem),
            Err(TlsError::NoPrivateKey(_))
        ));
    }
}
