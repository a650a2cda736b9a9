// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! Thin aggregator for the secure channel layer: re-exports `opcua-types`,
//! `opcua-crypto` and `opcua-core`, and (behind the `console-logging`
//! feature) a console logger for use by binaries that embed this crate.

#[cfg(feature = "console-logging")]
pub mod console_logging;

pub use opcua_core as core;
pub use opcua_crypto as crypto;
pub use opcua_types as types;
