use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::error::{Result, TransportError};

/// How the transport secures the receiver stream.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// TLS without certificate validation.
    ///
    /// Receivers present self-signed certificates that chain to no public root,
    /// so this is the working default. Signatures are still checked.
    #[default]
    AcceptAnyCertificate,
    /// TLS validated against the given roots.
    Verified(Arc<RootCertStore>),
    /// No TLS. Only useful against local proxies and test servers.
    Plaintext,
}

impl TlsMode {
    /// Build a connector for this mode. Returns `None` for [`TlsMode::Plaintext`].
    pub fn connector(&self) -> Result<Option<TlsConnector>> {
        if matches!(self, TlsMode::Plaintext) {
            return Ok(None);
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        let config = match self {
            TlsMode::Plaintext | TlsMode::AcceptAnyCertificate => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
                .with_no_client_auth(),
            TlsMode::Verified(roots) => builder
                .with_root_certificates(Arc::clone(roots))
                .with_no_client_auth(),
        };

        Ok(Some(TlsConnector::from(Arc::new(config))))
    }
}

/// Parse a host (name or IP literal) into a TLS server name.
pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_owned())
        .map_err(|e| TransportError::InvalidServerName(format!("{host}: {e}")))
}

#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
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
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
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
