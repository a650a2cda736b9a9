//! Derived symmetric key sets (§3.1 `SecurityKeySet`, §4.2 key derivation).

use opcua_types::EncodingResult;

use crate::hash::p_sha256;
use crate::secret::SecretBuffer;

/// One direction's derived key material: `[signKey, encryptKey, initVector]`
/// as a single KDF output, split apart (§4.1 `derive_key_sets`).
pub struct SecurityKeySet {
    /// HMAC signing key.
    pub sign_key: SecretBuffer,
    /// AES encryption key.
    pub encrypt_key: SecretBuffer,
    /// AES initialisation vector.
    pub iv: SecretBuffer,
}

impl std::fmt::Debug for SecurityKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityKeySet")
            .field("sign_key", &self.sign_key)
            .field("encrypt_key", &self.encrypt_key)
            .field("iv", &self.iv)
            .finish()
    }
}

/// Run P_SHA-256 once, producing `sign_key_len + encrypt_key_len + iv_len`
/// bytes and splitting them into a `SecurityKeySet` (Table 33, §4.2).
pub fn make_key_set(
    secret: &[u8],
    seed: &[u8],
    sign_key_len: usize,
    encrypt_key_len: usize,
    iv_len: usize,
) -> EncodingResult<SecurityKeySet> {
    let total = sign_key_len + encrypt_key_len + iv_len;
    let mut bytes = p_sha256(secret, seed, total)?;

    let iv = bytes.split_off(sign_key_len + encrypt_key_len);
    let encrypt_key = bytes.split_off(sign_key_len);
    let sign_key = bytes;

    Ok(SecurityKeySet {
        sign_key: SecretBuffer::new(sign_key),
        encrypt_key: SecretBuffer::new(encrypt_key),
        iv: SecretBuffer::new(iv),
    })
}

/// Derive both directions' key sets from a nonce pair in one pass (§4.1
/// `derive_key_sets`, §4.2): the client's set uses
/// `secret=client_nonce, seed=server_nonce`; the server's uses the
/// opposite pairing.
pub fn derive_key_sets(
    client_nonce: &[u8],
    server_nonce: &[u8],
    sign_key_len: usize,
    encrypt_key_len: usize,
    iv_len: usize,
) -> EncodingResult<(SecurityKeySet, SecurityKeySet)> {
    let client_keys = make_key_set(client_nonce, server_nonce, sign_key_len, encrypt_key_len, iv_len)?;
    let server_keys = make_key_set(server_nonce, client_nonce, sign_key_len, encrypt_key_len, iv_len)?;
    Ok((client_keys, server_keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_and_server_keysets_differ_but_are_deterministic() {
        let client_nonce = vec![0x11u8; 32];
        let server_nonce = vec![0x22u8; 32];

        let (client_a, server_a) = derive_key_sets(&client_nonce, &server_nonce, 32, 32, 16).unwrap();
        let (client_b, _server_b) = derive_key_sets(&client_nonce, &server_nonce, 32, 32, 16).unwrap();

        assert_eq!(client_a.sign_key.expose(), client_b.sign_key.expose());
        assert_ne!(client_a.sign_key.expose(), server_a.sign_key.expose());
        assert_eq!(client_a.sign_key.len(), 32);
        assert_eq!(client_a.encrypt_key.len(), 32);
        assert_eq!(client_a.iv.len(), 16);
    }
}
