//! HMAC signing/verification and the P_SHA-256 pseudo-random function
//! (§4.1, §4.2, RFC 5246 §5) used for key derivation.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use opcua_types::{Error, EncodingResult, StatusCode};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA1, writing the (20-byte) tag into `signature`.
pub fn hmac_sha1(key: &[u8], data: &[u8], signature: &mut [u8]) -> EncodingResult<()> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| Error::new(StatusCode::BadInvalidArgument, e.to_string()))?;
    mac.update(data);
    let tag = mac.finalize().into_bytes();
    if signature.len() != tag.len() {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            format!("signature buffer is {} bytes, expected {}", signature.len(), tag.len()),
        ));
    }
    signature.copy_from_slice(&tag);
    Ok(())
}

/// Verify an HMAC-SHA1 tag in constant time (the `Mac::verify_slice` call
/// below uses the crate's constant-time comparison).
pub fn verify_hmac_sha1(key: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha1::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(signature).is_ok()
}

/// HMAC-SHA256, writing the (32-byte) tag into `signature`.
pub fn hmac_sha256(key: &[u8], data: &[u8], signature: &mut [u8]) -> EncodingResult<()> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::new(StatusCode::BadInvalidArgument, e.to_string()))?;
    mac.update(data);
    let tag = mac.finalize().into_bytes();
    if signature.len() != tag.len() {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            format!("signature buffer is {} bytes, expected {}", signature.len(), tag.len()),
        ));
    }
    signature.copy_from_slice(&tag);
    Ok(())
}

/// Verify an HMAC-SHA256 tag in constant time.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(signature).is_ok()
}

/// `P_hash` from RFC 5246 §5, generalised over the HMAC used (here always
/// HMAC-SHA256, i.e. `P_SHA-256`):
///
/// ```text
/// P_hash(secret, seed) = HMAC(secret, A(1) + seed) + HMAC(secret, A(2) + seed) + ...
/// A(0) = seed
/// A(i) = HMAC(secret, A(i-1))
/// ```
///
/// Returns exactly `out_len` bytes.
pub fn p_sha256(secret: &[u8], seed: &[u8], out_len: usize) -> EncodingResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::new(StatusCode::BadInvalidArgument, e.to_string()))?;
    let mut a = seed.to_vec();
    let mut out = Vec::with_capacity(out_len + 32);

    while out.len() < out_len {
        // A(i) = HMAC(secret, A(i-1))
        let mut a_mac = mac.clone();
        a_mac.update(&a);
        a = a_mac.finalize().into_bytes().to_vec();

        // HMAC(secret, A(i) + seed)
        let mut chunk_mac = mac.clone();
        chunk_mac.update(&a);
        chunk_mac.update(seed);
        out.extend_from_slice(&chunk_mac.finalize().into_bytes());
    }

    out.truncate(out_len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_known_answer() {
        use sha2::Digest;
        let key = Sha256::digest(b"INGOPCS");
        let mut msg = Vec::new();
        msg.extend_from_slice(&Sha256::digest(b"InGoPcS"));
        msg.extend_from_slice(&Sha256::digest(b"iNgOpCs"));
        assert_eq!(msg.len(), 64);

        let mut tag = [0u8; 32];
        hmac_sha256(&key, &msg, &mut tag).unwrap();
        assert_eq!(
            opcua_types::hexlify(&tag),
            "e4185b6d49f06e8b94a552ad950983852ef20b58ee75f2c448fea587728d94db"
        );
        assert!(verify_hmac_sha256(&key, &msg, &tag));

        let mut flipped = msg.clone();
        flipped[1] ^= 0b0010_0000;
        assert!(!verify_hmac_sha256(&key, &flipped, &tag));
    }

    #[test]
    fn p_sha256_is_deterministic_and_sized() {
        let secret = b"client-nonce-bytes-would-go-here";
        let seed = b"server-nonce-bytes-would-go-here";
        let a = p_sha256(secret, seed, 80).unwrap();
        let b = p_sha256(secret, seed, 80).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 80);

        // Swapping secret/seed (client vs. server role) changes the output.
        let c = p_sha256(seed, secret, 80).unwrap();
        assert_ne!(a, c);
    }
}
