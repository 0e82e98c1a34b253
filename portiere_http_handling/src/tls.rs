// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Builds the rustls server configuration from a key store.

use std::{
    fmt,
    path::Path,
    sync::Arc,
};

use rustls::{
    pki_types::{
        CertificateDer,
        PrivateKeyDer,
        PrivatePkcs8KeyDer,
    },
    ServerConfig,
};
use tokio_rustls::TlsAcceptor;
use tracing::debug;

/// The ALPN protocol identifiers that are offered.
///
/// # References
/// * [IANA TLS ALPN Protocol IDs](https://www.iana.org/assignments/tls-extensiontype-values/tls-extensiontype-values.xhtml#alpn-protocol-ids)
const ALPN_PROTOCOLS: &[&str] = &["http/1.1"];

/// The TLS configuration couldn't be built. The message describes the cause,
/// but callers aren't expected to act on it other than reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfigError(String);

impl TlsConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TlsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid TLS configuration: {}", self.0)
    }
}

impl std::error::Error for TlsConfigError {}

impl From<rustls::Error> for TlsConfigError {
    fn from(error: rustls::Error) -> Self {
        Self(error.to_string())
    }
}

/// The shared TLS configuration of the server.
#[derive(Clone)]
pub struct TlsContext {
    config: Arc<ServerConfig>,
}

impl TlsContext {
    /// Builds the context from the contents of a key store. PEM bundles are
    /// recognized by their `-----BEGIN` prefix, everything else is read as a
    /// PKCS#12 archive protected with `password`.
    pub fn build(key_store: &[u8], password: &str) -> Result<Self, TlsConfigError> {
        let (certs, key) = if key_store.starts_with(b"-----BEGIN") {
            load_pem(key_store)?
        } else {
            load_pkcs12(key_store, password)?
        };

        Self::from_parts(certs, key)
    }

    pub async fn from_key_store_file(path: impl AsRef<Path>, password: &str) -> Result<Self, TlsConfigError> {
        let path = path.as_ref();
        let key_store = tokio::fs::read(path).await
            .map_err(|e| TlsConfigError::new(format!("failed to read {}: {e}", path.display())))?;
        Self::build(&key_store, password)
    }

    pub fn from_parts(certs: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Result<Self, TlsConfigError> {
        if certs.is_empty() {
            return Err(TlsConfigError::new("the key store contains no certificate"));
        }

        let mut config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|protocol| protocol.as_bytes().to_vec()).collect();

        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn server_config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(Arc::clone(&self.config))
    }
}

fn load_pem(bundle: &[u8]) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsConfigError> {
    let certs = rustls_pemfile::certs(&mut &bundle[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsConfigError::new(format!("malformed PEM certificate: {e}")))?;

    let key = rustls_pemfile::private_key(&mut &bundle[..])
        .map_err(|e| TlsConfigError::new(format!("malformed PEM private key: {e}")))?
        .ok_or_else(|| TlsConfigError::new("the key store contains no private key"))?;

    debug!(certificates = certs.len(), "loaded PEM key store");
    Ok((certs, key))
}

fn load_pkcs12(archive: &[u8], password: &str) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsConfigError> {
    let pfx = p12::PFX::parse(archive)
        .map_err(|e| TlsConfigError::new(format!("malformed PKCS#12 archive: {e:?}")))?;

    // Only HMAC-SHA1 can be verified.
    if pfx.mac_data.as_ref().is_some_and(|mac_data| mac_data.mac.digest_algorithm != p12::AlgorithmIdentifier::Sha1) {
        return Err(TlsConfigError::new("unsupported PKCS#12 MAC algorithm"));
    }

    if !pfx.verify_mac(password) {
        return Err(TlsConfigError::new("incorrect password or corrupted PKCS#12 archive"));
    }

    let key = pfx.key_bags(password)
        .map_err(|e| TlsConfigError::new(format!("failed to decrypt the private key: {e:?}")))?
        .into_iter()
        .next()
        .ok_or_else(|| TlsConfigError::new("the key store contains no private key"))?;

    let certs = pfx.cert_x509_bags(password)
        .map_err(|e| TlsConfigError::new(format!("failed to decrypt the certificates: {e:?}")))?
        .into_iter()
        .map(CertificateDer::from)
        .collect::<Vec<_>>();

    debug!(certificates = certs.len(), "loaded PKCS#12 key store");
    Ok((certs, PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn self_signed() -> rcgen::CertifiedKey {
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap()
    }

    #[test]
    fn test_build_pem() {
        let certified = self_signed();
        let bundle = format!("{}{}", certified.cert.pem(), certified.key_pair.serialize_pem());

        let context = TlsContext::build(bundle.as_bytes(), "").unwrap();
        assert_eq!(context.server_config().alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn test_build_pem_ignores_password() {
        let certified = self_signed();
        let bundle = format!("{}{}", certified.key_pair.serialize_pem(), certified.cert.pem());
        assert!(TlsContext::build(bundle.as_bytes(), "unused").is_ok());
    }

    #[test]
    fn test_build_pem_without_key() {
        let certified = self_signed();
        let error = TlsContext::build(certified.cert.pem().as_bytes(), "").err().unwrap();
        assert!(error.message().contains("private key"), "{error}");
    }

    #[test]
    fn test_build_pem_without_certificate() {
        let certified = self_signed();
        let error = TlsContext::build(certified.key_pair.serialize_pem().as_bytes(), "").err().unwrap();
        assert!(error.message().contains("certificate"), "{error}");
    }

    #[test]
    fn test_build_pkcs12() {
        let certified = self_signed();
        let pfx = p12::PFX::new(&certified.cert.der().to_vec(), &certified.key_pair.serialize_der(), None, "hunter2", "localhost")
            .unwrap();
        let archive = pfx.to_der();

        assert!(TlsContext::build(&archive, "hunter2").is_ok());
        assert!(TlsContext::build(&archive, "wrong").is_err());
    }

    #[test]
    fn test_build_pkcs12_unsupported_mac() {
        let certified = self_signed();
        let mut pfx = p12::PFX::new(&certified.cert.der().to_vec(), &certified.key_pair.serialize_der(), None, "hunter2", "localhost")
            .unwrap();
        pfx.mac_data.as_mut().unwrap().mac.digest_algorithm = p12::AlgorithmIdentifier::PbeWithSHAAnd3KeyTripleDESCBC(p12::Pkcs12PbeParams {
            salt: vec![0; 8],
            iterations: 1,
        });

        let error = TlsContext::build(&pfx.to_der(), "hunter2").err().unwrap();
        assert!(error.message().contains("MAC"), "{error}");
    }

    #[rstest]
    #[case(&b""[..])]
    #[case(&b"garbage"[..])]
    #[case(&b"-----BEGIN GARBAGE-----\nAAAA\n-----END GARBAGE-----\n"[..])]
    #[case(&[0x30, 0x82, 0x00, 0x10, 0x02, 0x01][..])]
    fn test_build_garbage(#[case] input: &[u8]) {
        assert!(TlsContext::build(input, "password").is_err());
    }

    #[tokio::test]
    async fn test_from_key_store_file() {
        let certified = self_signed();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), format!("{}{}", certified.cert.pem(), certified.key_pair.serialize_pem())).unwrap();

        assert!(TlsContext::from_key_store_file(file.path(), "").await.is_ok());
        assert!(TlsContext::from_key_store_file(file.path().with_extension("missing"), "").await.is_err());
    }
}
