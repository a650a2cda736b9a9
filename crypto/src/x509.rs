//! X.509 certificate handling: DER parsing, thumbprints and public-key
//! extraction (§6.3 `KeyManager`).

use der::{Decode, Encode};
use sha1::{Digest, Sha1};
use x509_cert::Certificate;

use opcua_types::{ByteString, DateTime, Error, EncodingResult, StatusCode};

use crate::pkey::PublicKey;

/// SHA-1 certificate thumbprint length (§6.4).
pub struct Thumbprint;

impl Thumbprint {
    /// Fixed length of a certificate thumbprint under Basic256Sha256.
    pub const THUMBPRINT_SIZE: usize = 20;
}

/// A parsed X.509 certificate plus its original DER bytes (preserved
/// verbatim so `as_byte_string`/thumbprinting operate on exactly what the
/// peer sent, §6.1 `senderCertificate`).
#[derive(Clone)]
pub struct X509 {
    der: Vec<u8>,
    cert: Certificate,
}

impl X509 {
    /// Parse a DER-encoded certificate (§6.3 `cert_from_der`).
    pub fn from_der(der: &[u8]) -> EncodingResult<X509> {
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::new(StatusCode::BadCertificateInvalid, format!("invalid certificate DER: {e}")))?;
        Ok(X509 { der: der.to_vec(), cert })
    }

    /// The certificate's original DER encoding (§6.3 `cert_copy_der`).
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// The certificate as a `ByteString`, for embedding in an
    /// `AsymmetricSecurityHeader.senderCertificate`.
    pub fn as_byte_string(&self) -> ByteString {
        ByteString::from(self.der.clone())
    }

    /// SHA-1 thumbprint of the DER encoding (§6.4; §6.3 `cert_thumbprint`).
    pub fn thumbprint(&self) -> [u8; Thumbprint::THUMBPRINT_SIZE] {
        let digest = Sha1::digest(&self.der);
        digest.into()
    }

    /// Extract the RSA public key (§6.3 `cert_public_key`).
    pub fn public_key(&self) -> EncodingResult<PublicKey> {
        let spki = &self.cert.tbs_certificate.subject_public_key_info;
        let spki_der = spki
            .to_der()
            .map_err(|e| Error::new(StatusCode::BadCertificateInvalid, format!("cannot re-encode SPKI: {e}")))?;
        let public_key = rsa::RsaPublicKey::try_from(
            rsa::pkcs8::SubjectPublicKeyInfoRef::try_from(spki_der.as_slice())
                .map_err(|e| Error::new(StatusCode::BadCertificateInvalid, format!("malformed SPKI: {e}")))?,
        )
        .map_err(|e| Error::new(StatusCode::BadCertificateInvalid, format!("certificate key is not RSA: {e}")))?;
        Ok(PublicKey::new(public_key))
    }

    /// `notBefore`/`notAfter` validity check against `now` (§4.5/§4.7
    /// `BadCertificateTimeInvalid`).
    pub fn is_time_valid(&self, now: DateTime) -> bool {
        let validity = &self.cert.tbs_certificate.validity;
        let now_secs = now.as_chrono().timestamp();
        let not_before_secs = validity.not_before.to_date_time().unix_duration().as_secs() as i64;
        let not_after_secs = validity.not_after.to_date_time().unix_duration().as_secs() as i64;
        now_secs >= not_before_secs && now_secs <= not_after_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_der() {
        assert!(X509::from_der(b"not a certificate").is_err());
    }
}
