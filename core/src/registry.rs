// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `EncodeableRegistry` (§3.1, §6.3): a flat table of `EncodeableType`
//! descriptors, looked up by the `binaryEncodingId` carried in front of a
//! message body (§4.4 step 5).

use std::collections::HashMap;

use log::warn;

use opcua_types::{DecodingOptions, Encodable, EncodeableType, Error, EncodingResult, NodeId, StatusCode};

/// Looks up and decodes OPC UA message bodies by their binary encoding id.
/// The core never constructs entries itself — the service-message
/// catalogue (out of scope here, §1) registers every type it wants the
/// secure channel to be able to decode.
#[derive(Default)]
pub struct EncodeableRegistry {
    types: HashMap<NodeId, EncodeableType>,
}

impl EncodeableRegistry {
    pub fn new() -> EncodeableRegistry {
        EncodeableRegistry { types: HashMap::new() }
    }

    /// Register one type, keyed by its `binary_encoding_id`. A second
    /// registration under the same id replaces the first.
    pub fn register(&mut self, entry: EncodeableType) {
        self.types.insert(entry.binary_encoding_id, entry);
    }

    pub fn register_all<I: IntoIterator<Item = EncodeableType>>(&mut self, entries: I) {
        for entry in entries {
            self.register(entry);
        }
    }

    /// `EncodeableRegistry::lookup(binaryEncodingId) -> &EncodeableType`.
    pub fn lookup(&self, binary_encoding_id: &NodeId) -> Option<&EncodeableType> {
        self.types.get(binary_encoding_id)
    }

    /// Decode one message body: read `binaryEncodingId`, look it up, and
    /// run its `decode` function (§4.4 step 5). An unrecognised id is
    /// `BadDataTypeIdUnknown` (§4.7 "Unknown binaryEncodingId on receive
    /// rejects the chunk but the connection remains open").
    pub fn decode_body(
        &self,
        binary_encoding_id: NodeId,
        stream: &mut dyn std::io::Read,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn Encodable>> {
        let entry = self.lookup(&binary_encoding_id).ok_or_else(|| {
            warn!("no EncodeableType registered for binary encoding id {binary_encoding_id:?}");
            Error::new(
                StatusCode::BadDataTypeIdUnknown,
                format!("no registered type for binary encoding id {binary_encoding_id:?}"),
            )
        })?;
        (entry.decode)(stream, decoding_options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_types::SimpleBinaryEncodable;
    use std::any::Any;
    use std::io::Write;

    #[derive(Debug)]
    struct Ping;

    impl Encodable for Ping {
        fn binary_encoding_id(&self) -> NodeId {
            NodeId::new(1)
        }
        fn byte_len(&self) -> usize {
            0
        }
        fn encode(&self, _stream: &mut dyn Write) -> EncodingResult<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn decode_ping(_stream: &mut dyn std::io::Read, _opts: &DecodingOptions) -> EncodingResult<Box<dyn Encodable>> {
        Ok(Box::new(Ping))
    }

    #[test]
    fn looks_up_and_decodes_a_registered_type() {
        let mut registry = EncodeableRegistry::new();
        let id = NodeId::new(1);
        registry.register(EncodeableType {
            binary_encoding_id: id,
            name: "Ping",
            decode: decode_ping,
        });

        assert!(registry.lookup(&id).is_some());

        let mut empty = std::io::Cursor::new(Vec::<u8>::new());
        let decoded = registry.decode_body(id, &mut empty, &DecodingOptions::default()).unwrap();
        assert!(decoded.as_any().downcast_ref::<Ping>().is_some());
        let _ = Ping.byte_len();
        let _ = Ping.encode(&mut Vec::new());
    }

    #[test]
    fn unregistered_id_is_bad_unknown_response() {
        let registry = EncodeableRegistry::new();
        let mut empty = std::io::Cursor::new(Vec::<u8>::new());
        let err = registry
            .decode_body(NodeId::new(999), &mut empty, &DecodingOptions::default())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BadDataTypeIdUnknown);
    }
}
