// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! Cryptographic provider, key derivation, key manager and PKI validator
//! for the OPC UA secure channel layer (§4.1, §4.2, §6.3 of the secure
//! channel spec).

pub mod aes_key;
pub mod algorithms;
pub mod hash;
pub mod key_manager;
pub mod keyset;
pub mod pkey;
pub mod pki;
pub mod provider;
pub mod random;
pub mod secret;
pub mod security_policy;
pub mod x509;

pub use key_manager::KeyManager;
pub use keyset::{derive_key_sets, SecurityKeySet};
pub use pkey::{PrivateKey, PublicKey, RsaPadding};
pub use pki::{AcceptAllPki, Crl, PkiValidator, TrustedCaPki};
pub use provider::CryptoProvider;
pub use random::Rng;
pub use secret::{Nonce, SecretBuffer};
pub use security_policy::{MessageSecurityMode, SecurityPolicy};
pub use x509::{Thumbprint, X509};
