//! The crypto profile registry (§4.1, §2): a security-policy URI maps to an
//! immutable bundle of algorithm choices and fixed lengths. Implemented as
//! enum dispatch rather than a table of function pointers — the idiomatic
//! Rust shape for a small closed set of policies (see SPEC_FULL.md).

use std::fmt;

use crate::algorithms;

/// A named algorithm bundle governing all crypto on a channel (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityPolicy {
    /// No security: signing and encryption disabled, but nonce generation
    /// still works (§4.1 `new`).
    None,
    /// AES-256-CBC / HMAC-SHA256 / RSA-OAEP-SHA1 / RSASSA-PKCS1v1.5-SHA256
    /// (§6.4). The only symmetric+asymmetric bundle this crate implements.
    Basic256Sha256,
    /// A security policy URI this crate does not recognise.
    Unknown,
}

impl SecurityPolicy {
    /// Resolve a security policy URI to a known policy, or `Unknown`.
    pub fn from_uri(uri: &str) -> SecurityPolicy {
        if uri.is_empty() || uri == algorithms::SECURITY_POLICY_NONE_URI {
            SecurityPolicy::None
        } else if uri == algorithms::SECURITY_POLICY_BASIC256SHA256_URI {
            SecurityPolicy::Basic256Sha256
        } else {
            SecurityPolicy::Unknown
        }
    }

    /// The URI identifying this policy.
    pub fn to_uri(&self) -> &'static str {
        match self {
            SecurityPolicy::None => algorithms::SECURITY_POLICY_NONE_URI,
            SecurityPolicy::Basic256Sha256 => algorithms::SECURITY_POLICY_BASIC256SHA256_URI,
            SecurityPolicy::Unknown => "",
        }
    }

    /// Symmetric key length in bytes (also the required `Nonce` length,
    /// §3.1).
    pub fn symmetric_key_size(&self) -> usize {
        match self {
            SecurityPolicy::Basic256Sha256 => 32,
            _ => 0,
        }
    }

    /// HMAC tag length in bytes.
    pub fn symmetric_signature_size(&self) -> usize {
        match self {
            SecurityPolicy::Basic256Sha256 => 32,
            _ => 0,
        }
    }

    /// AES block size (plaintext block size before encryption), in bytes.
    pub fn plain_block_size(&self) -> usize {
        match self {
            SecurityPolicy::Basic256Sha256 => 16,
            _ => 1,
        }
    }

    /// Cipher-text block size in bytes. Equal to the plaintext block size
    /// for CBC mode with no expansion.
    pub fn cipher_block_size(&self) -> usize {
        self.plain_block_size()
    }

    /// SHA-1 digest length used by OAEP padding (§6.4).
    pub fn oaep_hash_len(&self) -> usize {
        20
    }

    /// SHA-256 digest length, relevant only if a future policy adopts
    /// RSASSA-PSS (§9 Open Question 1 notes the PSS alternative is not the
    /// deployed choice for Basic256Sha256).
    pub fn pss_hash_len(&self) -> usize {
        32
    }

    /// Certificate thumbprint length (§6.4).
    pub fn cert_thumbprint_len(&self) -> usize {
        20
    }

    /// `(sign_key_len, encrypt_key_len, iv_len)` for this policy's key
    /// derivation (§4.1 `derive_lens`).
    pub fn derive_lens(&self) -> (usize, usize, usize) {
        match self {
            SecurityPolicy::Basic256Sha256 => (32, 32, 16),
            _ => (0, 0, 0),
        }
    }

    /// `true` if this policy has a concrete symmetric/asymmetric
    /// implementation (as opposed to `None` or `Unknown`).
    pub fn is_supported(&self) -> bool {
        matches!(self, SecurityPolicy::Basic256Sha256)
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityPolicy::None => write!(f, "None"),
            SecurityPolicy::Basic256Sha256 => write!(f, "Basic256Sha256"),
            SecurityPolicy::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Security mode governing which protections apply to symmetric messages
/// (§3.1 `currentSecurityMode`, glossary "Security Mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSecurityMode {
    /// No protection at all.
    None,
    /// Messages are signed but not encrypted.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
    /// An invalid/unspecified value received off the wire.
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trips() {
        assert_eq!(
            SecurityPolicy::from_uri(algorithms::SECURITY_POLICY_BASIC256SHA256_URI),
            SecurityPolicy::Basic256Sha256
        );
        assert_eq!(SecurityPolicy::from_uri(""), SecurityPolicy::None);
        assert_eq!(SecurityPolicy::from_uri("bogus"), SecurityPolicy::Unknown);
    }
}
