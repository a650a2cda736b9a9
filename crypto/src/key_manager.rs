//! Loading certificates and private keys from DER (§6.3 `KeyManager`).
//!
//! Certificate/key *parsing* is the one piece of the stack this spec
//! explicitly delegates away from the secure channel core (§1); this
//! module is that delegate, kept separate from `CryptoProvider` so the
//! provider itself stays a stateless vocabulary over already-parsed
//! handles (§4.1 closing note).

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use opcua_types::{Error, EncodingResult, StatusCode};

use crate::pkey::PrivateKey;
use crate::x509::X509;

/// Parses certificates and asymmetric keys on behalf of the secure channel
/// layer.
#[derive(Default)]
pub struct KeyManager;

impl KeyManager {
    /// A key manager instance. Stateless today; kept as a type (rather
    /// than free functions) so a future implementation can own a key
    /// cache without breaking callers.
    pub fn new() -> KeyManager {
        KeyManager
    }

    /// Parse a DER-encoded X.509 certificate (§6.3 `cert_from_der`).
    pub fn cert_from_der(&self, der: &[u8]) -> EncodingResult<X509> {
        X509::from_der(der)
    }

    /// Parse a DER-encoded RSA private key, PKCS#1 or PKCS#8, optionally
    /// passphrase-protected (§6.3 `key_from_der`).
    pub fn key_from_der(&self, der: &[u8], passphrase: Option<&str>) -> EncodingResult<PrivateKey> {
        if let Some(passphrase) = passphrase {
            let key = RsaPrivateKey::from_pkcs8_encrypted_der(der, passphrase.as_bytes()).map_err(|e| {
                Error::new(StatusCode::BadCertificateInvalid, format!("cannot decrypt private key: {e}"))
            })?;
            return Ok(PrivateKey::new(key));
        }

        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(PrivateKey::new(key));
        }
        let key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| Error::new(StatusCode::BadCertificateInvalid, format!("cannot parse private key: {e}")))?;
        Ok(PrivateKey::new(key))
    }

    /// SHA-1 thumbprint of a certificate, written into `out` (§6.3
    /// `cert_thumbprint`).
    pub fn cert_thumbprint(&self, cert: &X509, out: &mut [u8]) -> EncodingResult<()> {
        let thumbprint = cert.thumbprint();
        if out.len() != thumbprint.len() {
            return Err(Error::new(
                StatusCode::BadInvalidArgument,
                format!("thumbprint buffer is {} bytes, expected {}", out.len(), thumbprint.len()),
            ));
        }
        out.copy_from_slice(&thumbprint);
        Ok(())
    }

    /// Extract a certificate's RSA public key (§6.3 `cert_public_key`).
    pub fn cert_public_key(&self, cert: &X509) -> EncodingResult<crate::pkey::PublicKey> {
        cert.public_key()
    }

    /// Copy a certificate's DER bytes out (§6.3 `cert_copy_der`).
    pub fn cert_copy_der(&self, cert: &X509) -> Vec<u8> {
        cert.to_der().to_vec()
    }
}
