//! The Crypto Provider (§4.1): a stateless vocabulary over a security
//! policy and an entropy/DRBG handle. Owns no connection state — the
//! secure channel layer (`opcua-core`) holds the keysets and tokens this
//! provider is used to derive and apply.

use opcua_types::{Error, EncodingResult, StatusCode};

use crate::aes_key;
use crate::hash;
use crate::keyset::{self, SecurityKeySet};
use crate::pkey::{PrivateKey, PublicKey, RsaPadding};
use crate::pki::PkiValidator;
use crate::random::Rng;
use crate::secret::{Nonce, SecretBuffer};
use crate::security_policy::SecurityPolicy;
use crate::x509::X509;

/// A crypto provider bound to one security policy (§4.1 `new`).
pub struct CryptoProvider {
    policy: SecurityPolicy,
    rng: Rng,
}

impl CryptoProvider {
    /// Look up the profile for `policy_uri`. `SecurityPolicy::None` (the
    /// empty/`#None` URI) is always accepted and disables sign/encrypt
    /// while still supporting nonce generation.
    pub fn new(policy_uri: &str) -> EncodingResult<CryptoProvider> {
        let policy = SecurityPolicy::from_uri(policy_uri);
        if policy == SecurityPolicy::Unknown {
            return Err(Error::new(
                StatusCode::BadSecurityPolicyRejected,
                format!("unrecognised security policy uri {policy_uri:?}"),
            ));
        }
        Ok(CryptoProvider {
            policy,
            rng: Rng::new(),
        })
    }

    /// Build directly from an already-resolved policy (used internally by
    /// `opcua-core`, which holds `SecurityPolicy` rather than URI strings).
    pub fn from_policy(policy: SecurityPolicy) -> CryptoProvider {
        CryptoProvider { policy, rng: Rng::new() }
    }

    /// The security policy this provider implements.
    pub fn security_policy(&self) -> SecurityPolicy {
        self.policy
    }

    // --- length queries -------------------------------------------------

    /// Symmetric key length in bytes.
    pub fn sym_key_len(&self) -> usize {
        self.policy.symmetric_key_size()
    }

    /// HMAC tag length in bytes.
    pub fn sym_sig_len(&self) -> usize {
        self.policy.symmetric_signature_size()
    }

    /// AES block length in bytes.
    pub fn sym_block_len(&self) -> usize {
        self.policy.plain_block_size()
    }

    /// RSA key size in bits.
    pub fn asym_key_bits(&self, key: &PublicKey) -> usize {
        key.bit_length()
    }

    /// Maximum plaintext bytes per asymmetric encryption block.
    pub fn asym_plain_block(&self, key: &PublicKey) -> usize {
        key.oaep_sha1_plain_block()
    }

    /// Ciphertext bytes per asymmetric encryption block (the RSA modulus
    /// size).
    pub fn asym_cipher_block(&self, key: &PublicKey) -> usize {
        key.byte_length()
    }

    /// Length of an asymmetric signature (the RSA modulus size).
    pub fn asym_sig_len(&self, key: &PublicKey) -> usize {
        key.byte_length()
    }

    /// OAEP hash length (SHA-1, §6.4).
    pub fn oaep_hash_len(&self) -> usize {
        self.policy.oaep_hash_len()
    }

    /// PSS hash length, for a future PSS-capable policy (§9 Open Question 1).
    pub fn pss_hash_len(&self) -> usize {
        self.policy.pss_hash_len()
    }

    /// Certificate thumbprint length.
    pub fn cert_thumbprint_len(&self) -> usize {
        self.policy.cert_thumbprint_len()
    }

    /// `(encrypt_key_len, sign_key_len, iv_len)` for key derivation.
    pub fn derive_lens(&self) -> (usize, usize, usize) {
        let (sign, encrypt, iv) = self.policy.derive_lens();
        (encrypt, sign, iv)
    }

    // --- symmetric primitives --------------------------------------------

    /// AES-256-CBC encryption. `plaintext.len()` must be a multiple of the
    /// block size; `key`/`iv` must match the policy's fixed lengths.
    pub fn sym_encrypt(&self, plaintext: &[u8], key: &[u8], iv: &[u8]) -> EncodingResult<Vec<u8>> {
        self.require_supported()?;
        let mut out = vec![0u8; plaintext.len()];
        aes_key::encrypt(plaintext, key, iv, &mut out)?;
        Ok(out)
    }

    /// AES-256-CBC decryption, the inverse of [`Self::sym_encrypt`].
    pub fn sym_decrypt(&self, ciphertext: &[u8], key: &[u8], iv: &[u8]) -> EncodingResult<Vec<u8>> {
        self.require_supported()?;
        let mut out = vec![0u8; ciphertext.len()];
        aes_key::decrypt(ciphertext, key, iv, &mut out)?;
        Ok(out)
    }

    /// HMAC-SHA256 over `data`, producing an `sym_sig_len`-byte tag.
    pub fn sym_sign(&self, data: &[u8], key: &[u8]) -> EncodingResult<Vec<u8>> {
        self.require_supported()?;
        let mut tag = vec![0u8; self.sym_sig_len()];
        hash::hmac_sha256(key, data, &mut tag)?;
        Ok(tag)
    }

    /// Verify an HMAC-SHA256 tag produced by [`Self::sym_sign`].
    pub fn sym_verify(&self, data: &[u8], key: &[u8], tag: &[u8]) -> EncodingResult<()> {
        self.require_supported()?;
        if hash::verify_hmac_sha256(key, data, tag) {
            Ok(())
        } else {
            Err(Error::new(StatusCode::BadApplicationSignatureInvalid, "HMAC-SHA256 signature mismatch"))
        }
    }

    /// Draw a fresh symmetric key from this provider's DRBG.
    pub fn sym_generate_key(&self) -> SecretBuffer {
        let mut bytes = vec![0u8; self.sym_key_len()];
        self.rng.fill_bytes(&mut bytes);
        SecretBuffer::new(bytes)
    }

    /// Generate a fresh nonce the size of the symmetric key (§3.1, §4.1
    /// `create_random_nonce`), or the policy's one-byte null nonce when
    /// signing and encryption are both disabled.
    pub fn generate_nonce(&self) -> Nonce {
        if self.sym_key_len() == 0 {
            Nonce::null()
        } else {
            let mut bytes = vec![0u8; self.sym_key_len()];
            self.rng.fill_bytes(&mut bytes);
            Nonce::from_bytes(bytes)
        }
    }

    /// P_SHA-256 (RFC 5246 §5, §4.1 `derive_pseudo_random`).
    pub fn derive_pseudo_random(&self, secret: &[u8], seed: &[u8], out_len: usize) -> EncodingResult<Vec<u8>> {
        hash::p_sha256(secret, seed, out_len)
    }

    /// Derive both directions' key sets from a nonce pair in one pass
    /// (§4.1 `derive_key_sets`, §4.2). Returns `(client_keys, server_keys)`;
    /// the caller assigns sender/receiver by role (§4.2).
    pub fn derive_key_sets(
        &self,
        client_nonce: &[u8],
        server_nonce: &[u8],
    ) -> EncodingResult<(SecurityKeySet, SecurityKeySet)> {
        let (sign_len, encrypt_len, iv_len) = self.policy.derive_lens();
        keyset::derive_key_sets(client_nonce, server_nonce, sign_len, encrypt_len, iv_len)
    }

    // --- asymmetric primitives -------------------------------------------

    /// Output size of encrypting `input_len` plaintext bytes to `key`:
    /// rounds up to a whole number of `asym_plain_block(key)`-sized blocks
    /// and multiplies by `asym_cipher_block(key)` (§9 "Variable-length
    /// output buffers").
    pub fn asym_encryption_length(&self, key: &PublicKey, input_len: usize) -> usize {
        let plain_block = self.asym_plain_block(key).max(1);
        let blocks = input_len.div_ceil(plain_block);
        blocks * self.asym_cipher_block(key)
    }

    /// RSA-OAEP-SHA1 encryption, chunked into `asym_plain_block`-sized
    /// blocks (§4.1 `asym_encrypt`).
    pub fn asym_encrypt(&self, plaintext: &[u8], key: &PublicKey) -> EncodingResult<Vec<u8>> {
        let plain_block = self.asym_plain_block(key);
        if plain_block == 0 {
            return Err(Error::new(StatusCode::BadInvalidArgument, "asymmetric key too small for OAEP-SHA1"));
        }
        let mut out = Vec::with_capacity(self.asym_encryption_length(key, plaintext.len()));
        for chunk in plaintext.chunks(plain_block) {
            out.extend(key.encrypt(RsaPadding::OaepSha1, chunk)?);
        }
        Ok(out)
    }

    /// RSA-OAEP-SHA1 decryption, the inverse of [`Self::asym_encrypt`].
    pub fn asym_decrypt(&self, ciphertext: &[u8], key: &PrivateKey) -> EncodingResult<Vec<u8>> {
        let cipher_block = key.byte_length();
        if cipher_block == 0 || ciphertext.len() % cipher_block != 0 {
            return Err(Error::new(
                StatusCode::BadInvalidArgument,
                "ciphertext length is not a multiple of the RSA modulus size",
            ));
        }
        let mut out = Vec::new();
        for chunk in ciphertext.chunks(cipher_block) {
            out.extend(key.decrypt(RsaPadding::OaepSha1, chunk)?);
        }
        Ok(out)
    }

    /// RSASSA-PKCS1-v1_5-SHA256 signature (§4.1 `asym_sign`; §9 Open
    /// Question 1 on PKCS1-v1_5 vs. PSS).
    pub fn asym_sign(&self, data: &[u8], key: &PrivateKey) -> EncodingResult<Vec<u8>> {
        key.sign_sha256(data)
    }

    /// Verify an RSASSA-PKCS1-v1_5-SHA256 signature.
    pub fn asym_verify(&self, data: &[u8], key: &PublicKey, signature: &[u8]) -> EncodingResult<()> {
        if key.verify_sha256(data, signature) {
            Ok(())
        } else {
            Err(Error::new(StatusCode::BadApplicationSignatureInvalid, "RSA signature mismatch"))
        }
    }

    /// Validate a peer certificate (§4.1 `cert_validate`): first a
    /// profile-specific sanity check (RSA 2048-4096, §6.4), then delegates
    /// to the PKI.
    pub fn cert_validate(&self, pki: &dyn PkiValidator, cert: &X509) -> EncodingResult<()> {
        let public_key = cert.public_key()?;
        let bits = public_key.bit_length();
        if !(2048..=4096).contains(&bits) {
            return Err(Error::new(
                StatusCode::BadCertificateInvalid,
                format!("certificate RSA key is {bits} bits, expected 2048-4096"),
            ));
        }
        pki.validate(cert)
    }

    fn require_supported(&self) -> EncodingResult<()> {
        if self.policy.is_supported() {
            Ok(())
        } else {
            Err(Error::new(
                StatusCode::BadSecurityPolicyRejected,
                format!("security policy {} has no symmetric/asymmetric implementation", self.policy),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::SECURITY_POLICY_BASIC256SHA256_URI;

    #[test]
    fn sym_encrypt_decrypt_round_trip() {
        let provider = CryptoProvider::new(SECURITY_POLICY_BASIC256SHA256_URI).unwrap();
        let key = provider.sym_generate_key();
        let mut iv = vec![0u8; provider.sym_block_len()];
        provider.rng.fill_bytes(&mut iv);

        let plaintext = vec![0x42u8; 64];
        let ciphertext = provider.sym_encrypt(&plaintext, key.expose(), &iv).unwrap();
        let decrypted = provider.sym_decrypt(&ciphertext, key.expose(), &iv).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn sym_sign_verify_round_trip() {
        let provider = CryptoProvider::new(SECURITY_POLICY_BASIC256SHA256_URI).unwrap();
        let key = provider.sym_generate_key();
        let data = b"chunk payload bytes";
        let tag = provider.sym_sign(data, key.expose()).unwrap();
        assert!(provider.sym_verify(data, key.expose(), &tag).is_ok());

        let mut tampered = tag.clone();
        tampered[0] ^= 0xFF;
        assert!(provider.sym_verify(data, key.expose(), &tampered).is_err());
    }

    #[test]
    fn none_policy_disables_sym_crypto_but_allows_nonces() {
        let provider = CryptoProvider::new("").unwrap();
        assert_eq!(provider.security_policy(), SecurityPolicy::None);
        assert!(provider.sym_encrypt(&[], &[], &[]).is_err());
        let nonce = provider.generate_nonce();
        assert_eq!(nonce.len(), 1);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(CryptoProvider::new("http://example.com/bogus").is_err());
    }
}
