//! A deliberately small `NodeId`/`ExpandedNodeId`. The data model proper
//! (full identifier variants, namespace URIs, server indices) belongs to
//! the service layer this spec treats as out of scope; the secure channel
//! only needs enough of an identifier to look a message body's binary
//! encoding id up in the `EncodeableRegistry` (§3.1, §4.4 step 5).

use std::io::{Read, Write};

use crate::encoding::{DecodingOptions, SimpleBinaryDecodable, SimpleBinaryEncodable};
use crate::error::EncodingResult;

/// Numeric node identifier within namespace 0 — the only form the binary
/// message catalogue uses for its `binaryEncodingId`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    /// Namespace index.
    pub namespace: u16,
    /// Numeric identifier within the namespace.
    pub numeric: u32,
}

impl NodeId {
    /// A node id in namespace 0, as the message catalogue uses exclusively.
    pub fn new(numeric: u32) -> NodeId {
        NodeId {
            namespace: 0,
            numeric,
        }
    }
}

const ENCODING_TWO_BYTE: u8 = 0x00;
const ENCODING_FOUR_BYTE: u8 = 0x01;
const ENCODING_NUMERIC: u8 = 0x02;

impl SimpleBinaryEncodable for NodeId {
    fn byte_len(&self) -> usize {
        if self.namespace == 0 && self.numeric <= 255 {
            2
        } else if self.namespace <= 255 && self.numeric <= 65535 {
            4
        } else {
            7
        }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        if self.namespace == 0 && self.numeric <= 255 {
            ENCODING_TWO_BYTE.encode(stream)?;
            (self.numeric as u8).encode(stream)
        } else if self.namespace <= 255 && self.numeric <= 65535 {
            ENCODING_FOUR_BYTE.encode(stream)?;
            (self.namespace as u8).encode(stream)?;
            (self.numeric as u16).encode(stream)
        } else {
            ENCODING_NUMERIC.encode(stream)?;
            self.namespace.encode(stream)?;
            self.numeric.encode(stream)
        }
    }
}

impl SimpleBinaryDecodable for NodeId {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let encoding = u8::decode(stream, decoding_options)?;
        match encoding {
            ENCODING_TWO_BYTE => {
                let numeric = u8::decode(stream, decoding_options)?;
                Ok(NodeId::new(numeric as u32))
            }
            ENCODING_FOUR_BYTE => {
                let namespace = u8::decode(stream, decoding_options)?;
                let numeric = u16::decode(stream, decoding_options)?;
                Ok(NodeId {
                    namespace: namespace as u16,
                    numeric: numeric as u32,
                })
            }
            ENCODING_NUMERIC => {
                let namespace = u16::decode(stream, decoding_options)?;
                let numeric = u32::decode(stream, decoding_options)?;
                Ok(NodeId { namespace, numeric })
            }
            other => Err(crate::error::Error::decoding(format!(
                "unsupported node id encoding byte {other:#x} (only numeric forms are modelled)"
            ))),
        }
    }
}

/// An `ExpandedNodeId` as it prefixes every message body (§4.4 step 5,
/// §6.1). The secure channel only ever sees the numeric-namespace form, so
/// the namespace-uri/server-index flags are always absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpandedNodeId {
    /// The inner node id.
    pub node_id: NodeId,
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        ExpandedNodeId { node_id }
    }
}

impl SimpleBinaryEncodable for ExpandedNodeId {
    fn byte_len(&self) -> usize {
        self.node_id.byte_len()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        // No namespace-uri/server-index flags are set, so the encoding is
        // byte-identical to the inner NodeId's.
        self.node_id.encode(stream)
    }
}

impl SimpleBinaryDecodable for ExpandedNodeId {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let node_id = NodeId::decode(stream, decoding_options)?;
        Ok(ExpandedNodeId { node_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(id: NodeId) -> NodeId {
        let mut buf = Vec::new();
        id.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), id.byte_len());
        NodeId::decode(&mut std::io::Cursor::new(buf), &DecodingOptions::default()).unwrap()
    }

    #[test]
    fn two_byte_form_round_trips() {
        let id = NodeId::new(200);
        assert_eq!(id.byte_len(), 2);
        assert_eq!(round_trip(id), id);
    }

    #[test]
    fn four_byte_form_round_trips() {
        let id = NodeId { namespace: 12, numeric: 4000 };
        assert_eq!(id.byte_len(), 4);
        assert_eq!(round_trip(id), id);
    }

    #[test]
    fn numeric_form_round_trips() {
        let id = NodeId { namespace: 3000, numeric: 100_000 };
        assert_eq!(id.byte_len(), 7);
        assert_eq!(round_trip(id), id);
    }

    #[test]
    fn unsupported_encoding_byte_is_rejected() {
        let bytes = [0x03u8, 0, 0, 0, 0];
        let err = NodeId::decode(&mut std::io::Cursor::new(bytes), &DecodingOptions::default()).unwrap_err();
        assert!(!err.status().is_good());
    }

    #[test]
    fn expanded_node_id_encodes_identically_to_its_inner_node_id() {
        let id = NodeId::new(42);
        let expanded: ExpandedNodeId = id.into();
        let mut a = Vec::new();
        let mut b = Vec::new();
        id.encode(&mut a).unwrap();
        expanded.encode(&mut b).unwrap();
        assert_eq!(a, b);
    }
}
