//! RSA asymmetric primitives: OAEP-SHA1 encryption and PKCS1-v1_5-SHA256
//! signatures (§6.4). §9 Open Question 1: the implemented profile uses
//! RSASSA-PKCS1-v1_5 even though `rsa::Pkcs1v15Sign`'s sibling
//! `rsa::pss::Pss` (RSASSA-PSS) is the modern recommendation; this follows
//! the deployed Basic256Sha256 behaviour, not a PSS variant.

use rand::rngs::OsRng;
use rsa::sha2::{Digest, Sha256};
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use opcua_types::{Error, EncodingResult, StatusCode};

/// Padding scheme selector, mirroring the legacy encryption-algorithm URIs
/// the user-identity-token path (out of scope here) also switches on in
/// the wider OPC UA stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    /// RSAES-PKCS1-v1_5.
    Pkcs1,
    /// RSAES-OAEP with SHA-1 (the Basic256Sha256 choice, §6.4).
    OaepSha1,
    /// RSAES-OAEP with SHA-256.
    OaepSha256,
}

/// An RSA private key (2048-4096 bits, §6.4).
pub struct PrivateKey(RsaPrivateKey);

/// An RSA public key, as extracted from a peer certificate.
#[derive(Clone)]
pub struct PublicKey(RsaPublicKey);

impl PrivateKey {
    /// Wrap a parsed `rsa` crate private key.
    pub fn new(key: RsaPrivateKey) -> PrivateKey {
        PrivateKey(key)
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    /// Key size in bits (§6.4: 2048-4096).
    pub fn bit_length(&self) -> usize {
        use rsa::traits::PublicKeyParts;
        self.0.size() * 8
    }

    /// RSA modulus size in bytes — the asymmetric cipher-text block size
    /// and the PKCS1-v1_5 signature length.
    pub fn byte_length(&self) -> usize {
        use rsa::traits::PublicKeyParts;
        self.0.size()
    }

    /// Decrypt one ciphertext block with the given padding.
    pub fn decrypt(&self, padding: RsaPadding, ciphertext: &[u8]) -> EncodingResult<Vec<u8>> {
        let result = match padding {
            RsaPadding::Pkcs1 => self.0.decrypt(Pkcs1v15Encrypt, ciphertext),
            RsaPadding::OaepSha1 => self.0.decrypt(Oaep::new::<sha1::Sha1>(), ciphertext),
            RsaPadding::OaepSha256 => self.0.decrypt(Oaep::new::<Sha256>(), ciphertext),
        };
        result.map_err(|e| Error::new(StatusCode::BadSecurityChecksFailed, format!("RSA decrypt failed: {e}")))
    }

    /// RSASSA-PKCS1-v1_5 with SHA-256 over `data` (§6.4; `asym_sign`
    /// hashes with SHA-256 first).
    pub fn sign_sha256(&self, data: &[u8]) -> EncodingResult<Vec<u8>> {
        let digest = Sha256::digest(data);
        self.0
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| Error::new(StatusCode::BadSecurityChecksFailed, format!("RSA sign failed: {e}")))
    }
}

impl PublicKey {
    /// Wrap a parsed `rsa` crate public key.
    pub fn new(key: RsaPublicKey) -> PublicKey {
        PublicKey(key)
    }

    /// RSA modulus size in bytes.
    pub fn byte_length(&self) -> usize {
        use rsa::traits::PublicKeyParts;
        self.0.size()
    }

    /// Key size in bits.
    pub fn bit_length(&self) -> usize {
        self.byte_length() * 8
    }

    /// Encrypt one plaintext block with the given padding.
    pub fn encrypt(&self, padding: RsaPadding, plaintext: &[u8]) -> EncodingResult<Vec<u8>> {
        let mut rng = OsRng;
        let result = match padding {
            RsaPadding::Pkcs1 => self.0.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
            RsaPadding::OaepSha1 => self.0.encrypt(&mut rng, Oaep::new::<sha1::Sha1>(), plaintext),
            RsaPadding::OaepSha256 => self.0.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext),
        };
        result.map_err(|e| Error::new(StatusCode::BadSecurityChecksFailed, format!("RSA encrypt failed: {e}")))
    }

    /// Verify an RSASSA-PKCS1-v1_5-SHA256 signature over `data`.
    pub fn verify_sha256(&self, data: &[u8], signature: &[u8]) -> bool {
        let digest = Sha256::digest(data);
        self.0
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
            .is_ok()
    }

    /// Maximum plaintext block size for RSA-OAEP-SHA1 over a key of this
    /// size: `modulus_bytes - 2*hLen - 2` with `hLen = 20`.
    pub fn oaep_sha1_plain_block(&self) -> usize {
        self.byte_length().saturating_sub(2 * 20 + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    #[test]
    fn rsa_oaep_round_trip() {
        let mut rng = rand::thread_rng();
        let private = PrivateKey::new(RsaPrivateKey::new(&mut rng, 2048).unwrap());
        let public = private.public_key();

        let plain_block = public.oaep_sha1_plain_block();
        assert!(plain_block >= 214); // 2048 bits => 256 bytes - 42 = 214

        let plaintext = vec![0x5Au8; plain_block];
        let ciphertext = public.encrypt(RsaPadding::OaepSha1, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), public.byte_length());

        let decrypted = private.decrypt(RsaPadding::OaepSha1, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn rsa_sha256_signature_round_trip() {
        let mut rng = rand::thread_rng();
        let private = PrivateKey::new(RsaPrivateKey::new(&mut rng, 2048).unwrap());
        let public = private.public_key();

        let message = b"OpenSecureChannel handshake bytes";
        let signature = private.sign_sha256(message).unwrap();
        assert!(public.verify_sha256(message, &signature));
        assert!(!public.verify_sha256(b"tampered", &signature));
    }
}
