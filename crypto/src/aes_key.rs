//! AES-256-CBC symmetric encryption (§6.4). The secure channel always hands
//! us block-aligned, already-padded plaintext (§4.3 step 6), so encryption
//! and decryption here never add or strip padding themselves.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use opcua_types::{Error, EncodingResult, StatusCode};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Block size of AES, in bytes (also the IV length for CBC mode, §6.4).
pub const BLOCK_SIZE: usize = 16;
/// Symmetric key length for Basic256Sha256 (§6.4).
pub const KEY_SIZE: usize = 32;

fn check_lengths(data: &[u8], key: &[u8], iv: &[u8]) -> EncodingResult<()> {
    if key.len() != KEY_SIZE {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            format!("AES-256 key must be {KEY_SIZE} bytes, got {}", key.len()),
        ));
    }
    if iv.len() != BLOCK_SIZE {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            format!("AES IV must be {BLOCK_SIZE} bytes, got {}", iv.len()),
        ));
    }
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            format!(
                "AES-CBC input length {} is not a multiple of the block size {BLOCK_SIZE}",
                data.len()
            ),
        ));
    }
    Ok(())
}

/// Encrypt `plaintext` (whose length must already be a multiple of the
/// block size, §4.3 step 6) into `out`, which must be the same length.
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8], out: &mut [u8]) -> EncodingResult<()> {
    check_lengths(plaintext, key, iv)?;
    if out.len() != plaintext.len() {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            "output buffer length must match input length",
        ));
    }
    out.copy_from_slice(plaintext);
    let encryptor = Aes256CbcEnc::new(key.into(), iv.into());
    encryptor
        .encrypt_padded_mut::<NoPadding>(out, plaintext.len())
        .map_err(|e| Error::new(StatusCode::BadEncodingError, format!("AES encrypt failed: {e}")))?;
    Ok(())
}

/// Decrypt `ciphertext` (length must be a multiple of the block size) into
/// `out`, which must be the same length.
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8], out: &mut [u8]) -> EncodingResult<()> {
    check_lengths(ciphertext, key, iv)?;
    if out.len() != ciphertext.len() {
        return Err(Error::new(
            StatusCode::BadInvalidArgument,
            "output buffer length must match input length",
        ));
    }
    out.copy_from_slice(ciphertext);
    let decryptor = Aes256CbcDec::new(key.into(), iv.into());
    decryptor
        .decrypt_padded_mut::<NoPadding>(out)
        .map_err(|e| Error::new(StatusCode::BadDecodingError, format!("AES decrypt failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_256_cbc_known_answer() {
        let key = [0u8; 32];
        let iv = [0u8; 16];
        let pt = [0u8; 16];
        let mut ct = [0u8; 16];
        encrypt(&pt, &key, &iv, &mut ct).unwrap();
        assert_eq!(opcua_types::hexlify(&ct), "dc95c078a2408989ad48a21492842087");

        let mut decrypted = [0u8; 16];
        decrypt(&ct, &key, &iv, &mut decrypted).unwrap();
        assert_eq!(decrypted, pt);
    }

    #[test]
    fn rejects_non_block_aligned_input() {
        let key = [0u8; 32];
        let iv = [0u8; 16];
        let pt = [0u8; 15];
        let mut out = [0u8; 15];
        assert!(encrypt(&pt, &key, &iv, &mut out).is_err());
    }
}
