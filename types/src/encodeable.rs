//! The `EncodeableType`/`Encodable` contract (§3.1, §6.3): the secure
//! channel treats every OPC UA service message as an opaque object it can
//! initialise, clear, size, encode and decode, looked up by the numeric
//! `binaryEncodingId` carried in front of the body (§4.4 step 5).

use std::any::Any;
use std::fmt::Debug;
use std::io::{Read, Write};

use crate::encoding::DecodingOptions;
use crate::error::EncodingResult;
use crate::node_id::NodeId;

/// An OPC UA message body the secure channel can move without understanding
/// its contents.
///
/// Implemented by the service-message catalogue, which this spec treats as
/// an external collaborator (§1); the secure channel only calls through
/// this trait.
pub trait Encodable: Debug + Any {
    /// The `NodeId` identifying this message's binary encoding, written
    /// immediately before the body (§6.1).
    fn binary_encoding_id(&self) -> NodeId;

    /// Exact encoded size of the body, excluding the encoding id prefix.
    fn byte_len(&self) -> usize;

    /// Write the body (not including the encoding id prefix) to `stream`.
    fn encode(&self, stream: &mut dyn Write) -> EncodingResult<()>;

    /// Upcast for downstream callers that need the concrete type back.
    fn as_any(&self) -> &dyn Any;
}

/// A function able to decode one specific message type from a stream,
/// returning it boxed as the opaque `Encodable` trait object.
pub type DecodeFn =
    fn(&mut dyn Read, &DecodingOptions) -> EncodingResult<Box<dyn Encodable>>;

/// Descriptor for one entry of the `EncodeableRegistry` (§3.1): enough to
/// decode a message body once its `binaryEncodingId` has been looked up.
#[derive(Clone, Copy)]
pub struct EncodeableType {
    /// The `NodeId` this entry is keyed by.
    pub binary_encoding_id: NodeId,
    /// Human-readable type name, used in logs and error messages.
    pub name: &'static str,
    /// Decode function for this type.
    pub decode: DecodeFn,
}
