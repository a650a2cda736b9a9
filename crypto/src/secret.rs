//! Secret-holding buffers that zeroise themselves on drop (§3.2, §9
//! "Secret zeroisation").
//!
//! Exposing the secret bytes is a borrow rather than an explicit
//! expose/unexpose pair: the window onto the bytes is the lifetime of the
//! `&[u8]` that `expose` returns, and the borrow checker enforces that
//! nothing retains it past that point.

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret byte buffer (a symmetric key, an IV, a signing key) that
/// overwrites its storage with zero before the allocation is released.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecretBuffer(Vec<u8>);

impl SecretBuffer {
    /// Wrap an existing byte vector as a secret.
    pub fn new(bytes: Vec<u8>) -> SecretBuffer {
        SecretBuffer(bytes)
    }

    /// `len` zero bytes, ready to be filled in place.
    pub fn zeroed(len: usize) -> SecretBuffer {
        SecretBuffer(vec![0u8; len])
    }

    /// Borrow the secret bytes. The borrow's lifetime is the `unexpose`
    /// boundary: once the returned slice goes out of scope the caller has
    /// no further access.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Mutably borrow the secret bytes, e.g. to fill them from a DRBG.
    pub fn expose_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Number of secret bytes held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if this secret holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBuffer({} bytes, redacted)", self.0.len())
    }
}

/// A per-handshake random nonce (§3.1 `Nonce`): generated afresh at each
/// Open/Renew, retained until the peer's nonce arrives and key derivation
/// completes, then dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Nonce(Vec<u8>);

impl Nonce {
    /// Draw a fresh nonce of `len` bytes from `rng`.
    pub fn generate(rng: &mut dyn RngCore, len: usize) -> Nonce {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        Nonce(bytes)
    }

    /// Wrap externally supplied bytes (e.g. the peer's nonce, received off
    /// the wire) as a `Nonce`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Nonce {
        Nonce(bytes.into())
    }

    /// The policy's null nonce, used when signing/encryption are both
    /// disabled (`SecurityMode::None`) and no real nonce is required.
    pub fn null() -> Nonce {
        Nonce(vec![0u8; 1])
    }

    /// Borrow the nonce bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the nonce.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if the nonce holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({} bytes, redacted)", self.0.len())
    }
}
