// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `SecureChannel` (§3.1, §3.2, §4.1, §4.2): holds the connection's security
//! mode/policy, the current and (during a Renew overlap) previous tokens and
//! derived key sets, and the signing/encryption operations chunks are put
//! through on the way to and from the wire.

use log::{debug, error};

use opcua_types::{ByteString, DateTime, Error, EncodingResult, StatusCode};

use opcua_crypto::{CryptoProvider, MessageSecurityMode, Nonce, PrivateKey, SecurityKeySet, SecurityPolicy, X509};

use super::message_chunk::MessageChunkType;
use super::security_header::{AsymmetricSecurityHeader, SecurityHeader, SymmetricSecurityHeader};

/// A token issued by OpenSecureChannel/Renew (§3.1 `SecurityToken`).
/// Immutable once accepted; selects which key set decrypts an inbound
/// symmetric chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityToken {
    /// Secure channel id this token belongs to.
    pub channel_id: u32,
    /// Token id, carried in every symmetric security header.
    pub token_id: u32,
    /// When the token was created, epoch milliseconds (§3.1 — distinct from
    /// the wire `DateTime`, which counts 100ns ticks since 1601).
    pub created_at: i64,
    /// Server-revised lifetime, milliseconds (§4.5 "Token lifetime").
    pub revised_lifetime: u32,
}

impl SecurityToken {
    /// A zeroed token, used before the first Open completes.
    pub fn none() -> SecurityToken {
        SecurityToken {
            channel_id: 0,
            token_id: 0,
            created_at: 0,
            revised_lifetime: 0,
        }
    }

    /// `true` once `revised_lifetime` milliseconds have elapsed since
    /// `created_at` (§4.5 "MUST refuse outgoing messages once the token has
    /// expired").
    pub fn has_expired(&self, now: i64) -> bool {
        now >= self.created_at + self.revised_lifetime as i64
    }

    /// `true` at 75% of the token's lifetime — the point at which a Renew
    /// must be initiated (§4.5).
    pub fn should_renew(&self, now: i64) -> bool {
        let renew_at = self.created_at + (self.revised_lifetime as i64 * 3) / 4;
        now >= renew_at
    }

    /// `true` once the Renew overlap grace period has elapsed and this
    /// token (when held as `previous`) must be dropped (§3.2 invariant,
    /// Open Question 2: bounded by `revisedLifetime * 1.25`).
    pub fn grace_period_elapsed(&self, now: i64) -> bool {
        let grace = (self.revised_lifetime as i64 * 5) / 4;
        now >= self.created_at + grace
    }
}

/// Holds all security state for one secure channel connection: the
/// negotiated mode/policy, the crypto provider, the current (and possibly
/// still-live previous) tokens and key sets, and the local/peer nonces and
/// certificate (§3.1, §3.2).
pub struct SecureChannel {
    /// None / Sign / SignAndEncrypt (§3.1 `currentSecurityMode`).
    pub security_mode: MessageSecurityMode,
    /// The negotiated security policy.
    pub security_policy: SecurityPolicy,
    /// Secure channel id assigned by the server on Open.
    pub secure_channel_id: u32,

    crypto_provider: CryptoProvider,

    current_token: SecurityToken,
    current_keys: Option<(SecurityKeySet, SecurityKeySet)>,

    previous_token: Option<SecurityToken>,
    previous_keys: Option<(SecurityKeySet, SecurityKeySet)>,

    /// Our nonce, generated at each Open/Renew (§3.1 `Nonce`).
    pub nonce: Nonce,
    /// The peer's nonce, received during Open/Renew.
    pub their_nonce: Nonce,

    /// This application's own certificate, sent to the peer in the
    /// asymmetric security header (§3.1 `runningAppCertificate`).
    pub running_app_certificate: Option<X509>,
    /// This application's own private key, used to sign outgoing `OPN`
    /// chunks and decrypt incoming ones (§3.1 `runningAppPrivateKey`).
    pub running_app_private_key: Option<PrivateKey>,
    /// The peer's certificate, captured during the handshake (§3.1
    /// `otherAppCertificate`).
    pub their_cert: Option<X509>,
}

impl SecureChannel {
    /// A fresh, unestablished channel (§3.1 defaults).
    pub fn new() -> SecureChannel {
        SecureChannel {
            security_mode: MessageSecurityMode::None,
            security_policy: SecurityPolicy::None,
            secure_channel_id: 0,
            crypto_provider: CryptoProvider::from_policy(SecurityPolicy::None),
            current_token: SecurityToken::none(),
            current_keys: None,
            previous_token: None,
            previous_keys: None,
            nonce: Nonce::null(),
            their_nonce: Nonce::null(),
            running_app_certificate: None,
            running_app_private_key: None,
            their_cert: None,
        }
    }

    /// Asymmetrically encrypt and sign `plaintext` with the peer's public
    /// key and our own private key, for an outgoing `OPN` chunk (§4.3 step
    /// 3, §4.1 `asym_encrypt`/`asym_sign`). The signed payload is padded to
    /// the peer's OAEP plaintext block size before encryption (§4.3 step 6
    /// applies here too, not just to the symmetric path).
    pub fn asymmetric_encrypt_and_sign(&self, plaintext: &[u8]) -> EncodingResult<Vec<u8>> {
        let their_cert = self
            .their_cert
            .as_ref()
            .ok_or_else(|| Error::new(StatusCode::BadInvalidState, "no peer certificate to encrypt to"))?;
        let our_key = self
            .running_app_private_key
            .as_ref()
            .ok_or_else(|| Error::new(StatusCode::BadInvalidState, "no local private key to sign with"))?;

        let their_public_key = their_cert.public_key()?;
        let signature = self.crypto_provider.asym_sign(plaintext, our_key)?;

        let mut signed = Vec::with_capacity(plaintext.len() + signature.len());
        signed.extend_from_slice(plaintext);
        signed.extend_from_slice(&signature);

        let plain_block = self.crypto_provider.asym_plain_block(&their_public_key);
        let key_byte_len = self.crypto_provider.asym_cipher_block(&their_public_key);
        let (padding, extra_byte) = Self::calc_asym_padding(signed.len(), plain_block, key_byte_len);

        signed.reserve(padding + if extra_byte { 2 } else { 1 });
        for _ in 0..padding {
            signed.push(padding as u8);
        }
        signed.push(padding as u8);
        if extra_byte {
            signed.push((padding >> 8) as u8);
        }

        self.crypto_provider.asym_encrypt(&signed, &their_public_key)
    }

    /// Inverse of [`Self::asymmetric_encrypt_and_sign`]: decrypt an
    /// incoming `OPN` chunk with our private key, strip the padding the
    /// sender appended, then verify the signature against the peer's
    /// public key (§4.4 step 1 "asymmetric path", §4.4 step 2 "Remove
    /// padding").
    pub fn asymmetric_decrypt_and_verify(&self, ciphertext: &[u8]) -> EncodingResult<Vec<u8>> {
        let their_cert = self
            .their_cert
            .as_ref()
            .ok_or_else(|| Error::new(StatusCode::BadInvalidState, "no peer certificate to verify with"))?;
        let our_key = self
            .running_app_private_key
            .as_ref()
            .ok_or_else(|| Error::new(StatusCode::BadInvalidState, "no local private key to decrypt with"))?;

        let mut plaintext_and_signature = self.crypto_provider.asym_decrypt(ciphertext, our_key)?;
        let extra_byte = our_key.byte_length() > 256;
        Self::strip_asym_padding(&mut plaintext_and_signature, extra_byte)?;

        let their_public_key = their_cert.public_key()?;
        let signature_len = their_public_key.byte_length();
        if plaintext_and_signature.len() < signature_len {
            return Err(Error::new(StatusCode::BadSecurityChecksFailed, "decrypted OPN chunk is shorter than one signature"));
        }

        let (plaintext, signature) = plaintext_and_signature.split_at(plaintext_and_signature.len() - signature_len);
        self.crypto_provider.asym_verify(plaintext, &their_public_key, signature)?;
        Ok(plaintext.to_vec())
    }

    /// Compute the asymmetric padding (§4.3 step 6): the padding-length
    /// field is one byte normally, two when the peer's RSA modulus exceeds
    /// 256 bytes (>2048-bit keys) since the padding count can then overflow
    /// a single byte. Returns `(padding, uses_two_length_bytes)`.
    fn calc_asym_padding(data_len: usize, plain_block: usize, key_byte_len: usize) -> (usize, bool) {
        let extra_byte = key_byte_len > 256;
        if plain_block == 0 {
            return (0, extra_byte);
        }
        let length_bytes = if extra_byte { 2 } else { 1 };
        let remainder = (data_len + length_bytes) % plain_block;
        let padding = if remainder == 0 { 0 } else { plain_block - remainder };
        (padding, extra_byte)
    }

    /// Strip the trailing padding `calc_asym_padding` appended, reading the
    /// padding-length byte(s) from the end of `data` (§4.4 step 2).
    fn strip_asym_padding(data: &mut Vec<u8>, extra_byte: bool) -> EncodingResult<()> {
        let length_bytes = if extra_byte { 2 } else { 1 };
        if data.len() < length_bytes {
            return Err(Error::new(StatusCode::BadSecurityChecksFailed, "decrypted OPN chunk is shorter than its padding length field"));
        }

        let padding = if extra_byte {
            let low = data[data.len() - 2] as usize;
            let high = data[data.len() - 1] as usize;
            low | (high << 8)
        } else {
            data[data.len() - 1] as usize
        };

        let strip = padding + length_bytes;
        if strip > data.len() {
            return Err(Error::new(StatusCode::BadSecurityChecksFailed, "decrypted OPN chunk padding length exceeds its size"));
        }
        data.truncate(data.len() - strip);
        Ok(())
    }

    /// Build the security header appropriate to `message_type` (§6.1):
    /// `OPN` always carries an asymmetric header (without certificate
    /// material — the caller fills that in separately when needed), every
    /// other message type carries the current token id.
    pub fn make_security_header(&self, message_type: MessageChunkType) -> SecurityHeader {
        match message_type {
            MessageChunkType::OpenSecureChannel => SecurityHeader::Asymmetric(AsymmetricSecurityHeader::none()),
            _ => SecurityHeader::Symmetric(SymmetricSecurityHeader {
                token_id: self.current_token.token_id,
            }),
        }
    }

    /// Generate a fresh local nonce, sized to the symmetric key (or the
    /// one-byte null nonce when the policy has no symmetric crypto) (§3.1
    /// `Nonce`).
    pub fn create_random_nonce(&mut self) {
        self.nonce = self.crypto_provider.generate_nonce();
    }

    /// Record the peer's nonce, validating its length against the policy's
    /// symmetric key size when signing or encryption is enabled.
    pub fn set_their_nonce(&mut self, their_nonce: &ByteString) -> EncodingResult<()> {
        let bytes = their_nonce
            .value
            .as_ref()
            .ok_or_else(|| Error::new(StatusCode::BadNonceInvalid, "nonce is null"))?;

        if (self.signing_enabled() || self.encryption_enabled())
            && bytes.len() != self.security_policy.symmetric_key_size()
        {
            return Err(Error::new(
                StatusCode::BadNonceInvalid,
                format!(
                    "peer nonce is {} bytes, expected {}",
                    bytes.len(),
                    self.security_policy.symmetric_key_size()
                ),
            ));
        }

        self.their_nonce = Nonce::from_bytes(bytes.clone());
        Ok(())
    }

    /// Replace the security policy, rebuilding the crypto provider to
    /// match. Called once per Open/Renew, before keys are derived.
    pub fn set_security_policy(&mut self, security_policy: SecurityPolicy) {
        self.security_policy = security_policy;
        self.crypto_provider = CryptoProvider::from_policy(security_policy);
    }

    /// Install a new current token, moving the previous current token (and
    /// its key sets) to `previous` for the Renew overlap period (§4.5
    /// "Move current→previous; install new token & keysets", §3.2
    /// invariant).
    pub fn set_security_token(&mut self, token: SecurityToken) {
        let old_token = std::mem::replace(&mut self.current_token, token);
        let old_keys = self.current_keys.take();
        if old_token.token_id != 0 {
            self.previous_token = Some(old_token);
            self.previous_keys = old_keys;
        }
    }

    /// Derive this channel's (client, server) key sets from the two nonces
    /// (§4.1 `derive_key_sets`, §4.2 Table 33) and install them as
    /// `current_keys`. `we_are_client` selects which of the pair is "ours"
    /// (for signing/encrypting) vs. "theirs" (for verifying/decrypting).
    pub fn derive_keys(&mut self, we_are_client: bool) -> EncodingResult<()> {
        let (client_nonce, server_nonce) = if we_are_client {
            (self.nonce.as_bytes(), self.their_nonce.as_bytes())
        } else {
            (self.their_nonce.as_bytes(), self.nonce.as_bytes())
        };

        let (client_keys, server_keys) = self.crypto_provider.derive_key_sets(client_nonce, server_nonce)?;
        let (our_keys, their_keys) = if we_are_client {
            (client_keys, server_keys)
        } else {
            (server_keys, client_keys)
        };

        debug!("derived new key sets for secure channel {}", self.secure_channel_id);
        self.current_keys = Some((our_keys, their_keys));
        Ok(())
    }

    /// The token id currently used to sign/encrypt outgoing chunks.
    pub fn token_id(&self) -> u32 {
        self.current_token.token_id
    }

    /// The current token in full.
    pub fn security_token(&self) -> SecurityToken {
        self.current_token
    }

    /// `true` if `token_id` names the previous (not current) token — the
    /// receiver must then decrypt with `previous_keys` (§4.2
    /// `is_previous_crypto_data`).
    pub fn is_previous_crypto_data(&self, token_id: u32) -> bool {
        self.previous_token.map(|t| t.token_id) == Some(token_id) && token_id != self.current_token.token_id
    }

    /// Drop the previous token/keys (zeroised via `Drop`), called once the
    /// overlap period has elapsed or a chunk bound to a newer token than
    /// `current` arrives (§3.2, §4.2).
    pub fn clear_previous_tokens(&mut self) {
        self.previous_token = None;
        self.previous_keys = None;
    }

    /// `true` if `now` (epoch ms) is past the previous token's grace
    /// period and it should be cleared.
    pub fn previous_token_expired(&self, now: i64) -> bool {
        self.previous_token.map(|t| t.grace_period_elapsed(now)).unwrap_or(false)
    }

    /// `true` once the current token has expired and outgoing messages
    /// must be refused (§4.5).
    pub fn token_has_expired(&self) -> bool {
        self.current_token.has_expired(DateTime::now().as_unix_millis())
    }

    /// `true` once the current token has crossed the 75% renew threshold.
    pub fn should_renew_token(&self) -> bool {
        self.current_token.token_id != 0 && self.current_token.should_renew(DateTime::now().as_unix_millis())
    }

    /// HMAC tag length for the current policy, or 0 under `None`.
    pub fn signature_size(&self) -> usize {
        if self.security_policy != SecurityPolicy::None {
            self.crypto_provider.sym_sig_len()
        } else {
            0
        }
    }

    /// AES plaintext block size for the current policy, or 1 under `None`
    /// (matching the provider's "no alignment" convention).
    pub fn plain_block_size(&self) -> usize {
        self.security_policy.plain_block_size()
    }

    /// Compute how much padding to append to a body so that body + padding
    /// length byte + signature aligns to the cipher block size (§4.3 step
    /// 6). Mirrors the `sendingMaxBodySize` cap by returning 0 (no padding
    /// needed / caller must split the message) when `bytes_to_write`
    /// already exceeds the computed maximum body size for this chunk size.
    pub fn calc_chunk_padding(
        &self,
        bytes_to_write: usize,
        security_header: &SecurityHeader,
        message_chunk_size: usize,
    ) -> usize {
        use super::message_chunk::MESSAGE_CHUNK_HEADER_SIZE;
        use super::security_header::SEQUENCE_HEADER_SIZE;
        use opcua_types::SimpleBinaryEncodable;

        if !self.encryption_enabled() {
            return 0;
        }

        let signature_size = self.crypto_provider.sym_sig_len();
        let plain_text_block_size = self.security_policy.plain_block_size();

        let max_body_size = if message_chunk_size != 0 {
            let cipher_text_block_size = self.security_policy.cipher_block_size();
            let header_size = MESSAGE_CHUNK_HEADER_SIZE + security_header.byte_len();
            let sequence_header_size = SEQUENCE_HEADER_SIZE;

            let f1 = (message_chunk_size - header_size - signature_size - 1) as f64;
            let f2 = cipher_text_block_size as f64;
            plain_text_block_size * ((f1 / f2).floor() as usize) - sequence_header_size
        } else {
            0
        };

        if max_body_size > 0 && bytes_to_write > max_body_size {
            0
        } else {
            plain_text_block_size - ((bytes_to_write + signature_size + 1) % plain_text_block_size)
        }
    }

    fn our_keys(&self) -> EncodingResult<&SecurityKeySet> {
        self.current_keys
            .as_ref()
            .map(|(ours, _)| ours)
            .ok_or_else(|| Error::new(StatusCode::BadInvalidState, "no key sets derived for this channel yet"))
    }

    fn their_key_set(&self, token_id: u32) -> EncodingResult<&SecurityKeySet> {
        if self.is_previous_crypto_data(token_id) {
            self.previous_keys
                .as_ref()
                .map(|(_, theirs)| theirs)
                .ok_or_else(|| Error::new(StatusCode::BadSecureChannelTokenUnknown, "previous token has no key set"))
        } else {
            self.current_keys
                .as_ref()
                .map(|(_, theirs)| theirs)
                .ok_or_else(|| Error::new(StatusCode::BadInvalidState, "no key sets derived for this channel yet"))
        }
    }

    fn sign(&self, src: &[u8], signature: &mut [u8]) -> EncodingResult<()> {
        let keys = self.our_keys()?;
        let tag = self.crypto_provider.sym_sign(src, keys.sign_key.expose())?;
        signature.copy_from_slice(&tag);
        Ok(())
    }

    fn verify(&self, token_id: u32, src: &[u8], signature: &[u8]) -> EncodingResult<()> {
        let keys = self.their_key_set(token_id)?;
        self.crypto_provider.sym_verify(src, keys.sign_key.expose(), signature).map_err(|e| {
            error!("signature verification failed for secure channel {}", self.secure_channel_id);
            e
        })
    }

    fn encrypt(&self, src: &[u8], dst: &mut [u8]) -> EncodingResult<()> {
        let keys = self.our_keys()?;
        let ciphertext = self.crypto_provider.sym_encrypt(src, keys.encrypt_key.expose(), keys.iv.expose())?;
        dst.copy_from_slice(&ciphertext);
        Ok(())
    }

    fn decrypt(&self, token_id: u32, src: &[u8], dst: &mut [u8]) -> EncodingResult<()> {
        let keys = self.their_key_set(token_id)?;
        let plaintext = self.crypto_provider.sym_decrypt(src, keys.encrypt_key.expose(), keys.iv.expose())?;
        dst.copy_from_slice(&plaintext);
        Ok(())
    }

    /// `true` if chunks sent on this channel must carry a signature.
    pub fn signing_enabled(&self) -> bool {
        self.security_policy != SecurityPolicy::None
            && matches!(self.security_mode, MessageSecurityMode::Sign | MessageSecurityMode::SignAndEncrypt)
    }

    /// `true` if chunks sent on this channel must be encrypted.
    pub fn encryption_enabled(&self) -> bool {
        self.security_policy != SecurityPolicy::None && self.security_mode == MessageSecurityMode::SignAndEncrypt
    }

    /// Sign and, if the mode requires it, encrypt a fully-assembled chunk
    /// (§4.3 steps 6-8). `sign_info`/`encrypt_info` are `(from, to)` byte
    /// ranges within `src`/`dst` — everything from the start of the
    /// message up to `sign_info.1` is covered by the signature; the
    /// `encrypt_info` range (sequence header onward) is what gets
    /// encrypted. `dst` must be the same length as `src` plus room for the
    /// trailing signature.
    pub fn encrypt_and_sign(
        &self,
        src: &[u8],
        sign_info: (usize, usize),
        encrypt_info: (usize, usize),
        dst: &mut [u8],
    ) -> EncodingResult<()> {
        let (s_from, s_to) = sign_info;
        let (e_from, e_to) = encrypt_info;
        match self.security_mode {
            MessageSecurityMode::None => {
                dst.copy_from_slice(src);
                Ok(())
            }
            MessageSecurityMode::Sign => {
                let signature_len = src.len() - s_to;
                let mut signature = vec![0u8; signature_len];
                self.sign(&src[s_from..s_to], &mut signature)?;
                dst[..s_to].copy_from_slice(&src[..s_to]);
                dst[s_to..].copy_from_slice(&signature);
                Ok(())
            }
            MessageSecurityMode::SignAndEncrypt => {
                if (e_to - e_from) % self.plain_block_size() != 0 {
                    return Err(Error::new(
                        StatusCode::BadEncodingError,
                        format!("plaintext block of {} bytes is not aligned", e_to - e_from),
                    ));
                }

                let signature_len = src.len() - s_to;
                let mut signed = vec![0u8; src.len() + signature_len];
                let mut signature = vec![0u8; signature_len];
                self.sign(&src[s_from..s_to], &mut signature)?;
                signed[..s_to].copy_from_slice(&src[..s_to]);
                signed[s_to..].copy_from_slice(&signature);

                self.encrypt(&signed[e_from..e_to], &mut dst[e_from..e_to])?;
                dst[..e_from].copy_from_slice(&signed[..e_from]);
                Ok(())
            }
            MessageSecurityMode::Invalid => Err(Error::new(StatusCode::BadSecurityModeRejected, "message security mode is invalid")),
        }
    }

    /// Decrypt and verify a chunk received off the wire, the inverse of
    /// [`Self::encrypt_and_sign`] (§4.4 steps 2-3). `token_id` is the token
    /// id read from the chunk's symmetric security header, used to select
    /// `current` vs. `previous` key sets.
    pub fn decrypt_and_verify(
        &self,
        token_id: u32,
        src: &[u8],
        sign_info: (usize, usize),
        encrypt_info: (usize, usize),
        dst: &mut [u8],
    ) -> EncodingResult<()> {
        let (s_from, s_to) = sign_info;
        let (e_from, e_to) = encrypt_info;
        match self.security_mode {
            MessageSecurityMode::None => {
                dst[..src.len()].copy_from_slice(src);
                Ok(())
            }
            MessageSecurityMode::Sign => {
                dst[..src.len()].copy_from_slice(src);
                self.verify(token_id, &dst[s_from..s_to], &dst[s_to..])
            }
            MessageSecurityMode::SignAndEncrypt => {
                if (e_to - e_from) % self.plain_block_size() != 0 {
                    return Err(Error::new(
                        StatusCode::BadEncodingError,
                        format!("ciphertext block of {} bytes is not aligned", e_to - e_from),
                    ));
                }

                dst[..e_from].copy_from_slice(&src[..e_from]);
                self.decrypt(token_id, &src[e_from..e_to], &mut dst[e_from..e_to])?;
                self.verify(token_id, &dst[s_from..s_to], &dst[s_to..])
            }
            MessageSecurityMode::Invalid => Err(Error::new(StatusCode::BadSecurityModeRejected, "message security mode is invalid")),
        }
    }
}

impl Default for SecureChannel {
    fn default() -> Self {
        SecureChannel::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn established_pair() -> (SecureChannel, SecureChannel) {
        let mut client = SecureChannel::new();
        let mut server = SecureChannel::new();

        for ch in [&mut client, &mut server] {
            ch.security_mode = MessageSecurityMode::SignAndEncrypt;
            ch.set_security_policy(SecurityPolicy::Basic256Sha256);
            ch.secure_channel_id = 7;
        }

        client.create_random_nonce();
        server.create_random_nonce();

        let client_nonce = ByteString {
            value: Some(client.nonce.as_bytes().to_vec()),
        };
        let server_nonce = ByteString {
            value: Some(server.nonce.as_bytes().to_vec()),
        };
        server.set_their_nonce(&client_nonce).unwrap();
        client.set_their_nonce(&server_nonce).unwrap();

        client.derive_keys(true).unwrap();
        server.derive_keys(false).unwrap();

        let token = SecurityToken {
            channel_id: 7,
            token_id: 1,
            created_at: 0,
            revised_lifetime: 60_000,
        };
        client.set_security_token(token);
        server.set_security_token(token);

        (client, server)
    }

    #[test]
    fn sign_and_encrypt_round_trips_between_two_channels() {
        let (client, server) = established_pair();

        let plaintext = b"0123456789abcdef0123456789abcdef".to_vec(); // 2 AES blocks
        let signature_size = client.signature_size();
        let mut dst = vec![0u8; plaintext.len() + signature_size];

        let sign_info = (0, plaintext.len());
        let encrypt_info = (0, plaintext.len());
        client.encrypt_and_sign(&plaintext, sign_info, encrypt_info, &mut dst).unwrap();

        let mut decoded = vec![0u8; dst.len()];
        server
            .decrypt_and_verify(1, &dst, sign_info, encrypt_info, &mut decoded)
            .unwrap();
        assert_eq!(&decoded[..plaintext.len()], &plaintext[..]);
    }

    #[test]
    fn renew_moves_current_to_previous_and_old_token_still_decrypts() {
        let (mut client, mut server) = established_pair();

        let plaintext = b"0123456789abcdef".to_vec();
        let sign_info = (0, plaintext.len());
        let encrypt_info = (0, plaintext.len());
        let mut dst = vec![0u8; plaintext.len() + client.signature_size()];
        client.encrypt_and_sign(&plaintext, sign_info, encrypt_info, &mut dst).unwrap();

        client.create_random_nonce();
        server.their_nonce = client.nonce.clone();
        server.create_random_nonce();
        client.their_nonce = server.nonce.clone();

        client.derive_keys(true).unwrap();
        server.derive_keys(false).unwrap();
        let new_token = SecurityToken {
            channel_id: 7,
            token_id: 2,
            created_at: 1_000,
            revised_lifetime: 60_000,
        };
        client.set_security_token(new_token);
        server.set_security_token(new_token);

        assert!(server.is_previous_crypto_data(1));
        assert!(!server.is_previous_crypto_data(2));

        let mut decoded = vec![0u8; dst.len()];
        server.decrypt_and_verify(1, &dst, sign_info, encrypt_info, &mut decoded).unwrap();
        assert_eq!(&decoded[..plaintext.len()], &plaintext[..]);
    }

    #[test]
    fn asym_padding_rounds_up_to_a_whole_plain_block() {
        let (padding, extra_byte) = SecureChannel::calc_asym_padding(190, 214, 256);
        assert!(!extra_byte);
        assert_eq!(190 + padding + 1, 214);

        // data plus its length byte already fills exactly one block: no padding needed
        let (padding, extra_byte) = SecureChannel::calc_asym_padding(213, 214, 256);
        assert!(!extra_byte);
        assert_eq!(padding, 0);
        assert_eq!(213 + padding + 1, 214);
    }

    #[test]
    fn asym_padding_uses_two_length_bytes_past_2048_bit_keys() {
        // 384-byte modulus => 3072-bit key, over the 256-byte (2048-bit) threshold
        let (padding, extra_byte) = SecureChannel::calc_asym_padding(300, 342, 384);
        assert!(extra_byte);
        assert_eq!(300 + padding + 2, 342);
    }

    #[test]
    fn asym_padding_round_trips_through_strip() {
        let mut data = b"OpenSecureChannel asymmetric payload".to_vec();
        let original = data.clone();
        let (padding, extra_byte) = SecureChannel::calc_asym_padding(data.len(), 64, 256);
        assert!(!extra_byte);

        for _ in 0..padding {
            data.push(padding as u8);
        }
        data.push(padding as u8);

        SecureChannel::strip_asym_padding(&mut data, extra_byte).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn asym_padding_round_trips_through_strip_with_two_length_bytes() {
        let mut data = vec![0x42u8; 300];
        let original = data.clone();
        let (padding, extra_byte) = SecureChannel::calc_asym_padding(data.len(), 342, 384);
        assert!(extra_byte);

        for _ in 0..padding {
            data.push(padding as u8);
        }
        data.push(padding as u8);
        data.push((padding >> 8) as u8);

        SecureChannel::strip_asym_padding(&mut data, extra_byte).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn strip_asym_padding_rejects_an_out_of_range_length() {
        let mut data = vec![0u8, 1, 2, 250];
        assert!(SecureChannel::strip_asym_padding(&mut data, false).is_err());
    }

    #[test]
    fn token_expiry_and_renew_threshold() {
        let token = SecurityToken {
            channel_id: 1,
            token_id: 1,
            created_at: 0,
            revised_lifetime: 1000,
        };
        assert!(!token.has_expired(500));
        assert!(token.has_expired(1000));
        assert!(!token.should_renew(700));
        assert!(token.should_renew(750));
        assert!(!token.grace_period_elapsed(1200));
        assert!(token.grace_period_elapsed(1250));
    }
}
