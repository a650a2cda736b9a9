//! The entropy/DRBG handle backing nonce and symmetric-key generation
//! (§4.1 closing note, §5 "Shared-resource policy").
//!
//! A connection normally owns its own `Rng`; when a DRBG is shared between
//! connections it must sit behind a serialising interface, here
//! `parking_lot::Mutex` in preference to `std::sync::Mutex`.

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

/// A source of cryptographically secure random bytes.
pub struct Rng(Mutex<OsRng>);

impl Rng {
    /// A new RNG drawing from the operating system's CSPRNG.
    pub fn new() -> Rng {
        Rng(Mutex::new(OsRng))
    }

    /// Fill `buf` with random bytes.
    pub fn fill_bytes(&self, buf: &mut [u8]) {
        self.0.lock().fill_bytes(buf);
    }
}

impl Default for Rng {
    fn default() -> Self {
        Rng::new()
    }
}
