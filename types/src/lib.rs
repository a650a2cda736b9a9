// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! Wire primitives for the OPC UA secure channel layer: status codes,
//! length-prefixed strings, the binary encode/decode traits, date-time and
//! node-id encodings, and the `EncodeableType` registry descriptor.
//!
//! The data model proper (the full OPC UA type system and service message
//! catalogue) is out of scope here — see §1 of the secure channel spec.

pub mod constants;
pub mod date_time;
pub mod encodeable;
pub mod encoding;
pub mod error;
pub mod node_id;
pub mod status_code;
pub mod string;

pub use date_time::DateTime;
pub use encodeable::{DecodeFn, Encodable, EncodeableType};
pub use encoding::{
    hexlify, process_decode_io_result, process_encode_io_result, read_u32, read_u8,
    unhexlify, write_u32, write_u8, DecodingOptions, SimpleBinaryDecodable, SimpleBinaryEncodable,
};
pub use error::{Error, EncodingResult};
pub use node_id::{ExpandedNodeId, NodeId};
pub use status_code::StatusCode;
pub use string::{ByteString, UAString};
