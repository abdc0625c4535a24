//! TLS transport for the session: server verification against the system
//! trust store, optional client identity for mTLS, and the explicit
//! trust-anything escape hatch for self-signed server setups.

use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{info, warn};

use super::{SessionConfig, SessionError};

/// Wraps an established TCP stream in TLS per the session configuration.
///
/// # Errors
///
/// Returns [`SessionError::Tls`] for configuration problems (bad PEM, no
/// usable roots, invalid server name) and [`SessionError::Transport`] for
/// handshake I/O failures.
pub(crate) async fn connect(
    tcp: TcpStream,
    config: &SessionConfig,
) -> Result<TlsStream<TcpStream>, SessionError> {
    let builder = rustls::ClientConfig::builder();

    let builder = if config.tls_trust {
        warn!(
            "tls_trust is set: peer certificate verification is DISABLED; \
             anyone on the path can impersonate the server"
        );
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert::new()))
    } else {
        builder.with_root_certificates(system_roots()?)
    };

    let client_config = if config.mtls {
        let (certs, key) = load_identity(config)?;
        info!(pem = %config.pem_path.display(), "presenting client certificate");
        builder
            .with_client_auth_cert(certs, key)
            .map_err(|e| SessionError::Tls(format!("client identity rejected: {e}")))?
    } else {
        builder.with_no_client_auth()
    };

    let server_name = ServerName::try_from(config.server.clone())
        .map_err(|e| SessionError::Tls(format!("invalid server name: {e}")))?;

    let connector = TlsConnector::from(Arc::new(client_config));
    connector
        .connect(server_name, tcp)
        .await
        .map_err(SessionError::Transport)
}

/// Loads the system trust store.
fn system_roots() -> Result<RootCertStore, SessionError> {
    let mut roots = RootCertStore::empty();
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        warn!("trust store entry skipped: {err}");
    }
    for cert in loaded.certs {
        let _ = roots.add(cert);
    }
    if roots.is_empty() {
        return Err(SessionError::Tls(
            "no usable certificates in the system trust store".into(),
        ));
    }
    Ok(roots)
}

/// Reads the certificate chain and private key from the single PEM file
/// the configuration points at (key and chain concatenated, the layout the
/// companion tooling writes).
fn load_identity(
    config: &SessionConfig,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), SessionError> {
    let file = std::fs::File::open(&config.pem_path).map_err(|e| {
        SessionError::Tls(format!(
            "cannot read client PEM {}: {e}",
            config.pem_path.display()
        ))
    })?;
    let mut reader = std::io::BufReader::new(file);

    let mut certs = Vec::new();
    let mut key: Option<PrivateKeyDer<'static>> = None;
    for item in rustls_pemfile::read_all(&mut reader) {
        match item.map_err(|e| SessionError::Tls(format!("malformed PEM: {e}")))? {
            rustls_pemfile::Item::X509Certificate(cert) => certs.push(cert),
            rustls_pemfile::Item::Pkcs8Key(k) => key = Some(PrivateKeyDer::Pkcs8(k)),
            rustls_pemfile::Item::Pkcs1Key(k) => key = Some(PrivateKeyDer::Pkcs1(k)),
            rustls_pemfile::Item::Sec1Key(k) => key = Some(PrivateKeyDer::Sec1(k)),
            _ => {}
        }
    }

    let key = key.ok_or_else(|| {
        SessionError::Tls(format!(
            "no private key found in {}",
            config.pem_path.display()
        ))
    })?;
    if certs.is_empty() {
        return Err(SessionError::Tls(format!(
            "no certificate found in {}",
            config.pem_path.display()
        )));
    }
    Ok((certs, key))
}

/// Certificate verifier that accepts any server certificate.
///
/// Signature checks still run through the crypto provider so the handshake
/// stays well-formed; only the chain/path validation is skipped.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: CryptoProvider,
}

impl AcceptAnyServerCert {
    fn new() -> Self {
        Self {
            provider: rustls::crypto::aws_lc_rs::default_provider(),
        }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
