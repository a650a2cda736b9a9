// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `ChunkInfo` (§4.4): parses a raw chunk's headers far enough to locate the
//! sign/encrypt byte ranges and hand back the sequence header, without
//! touching the (possibly still encrypted) body.

use std::io::Cursor;

use opcua_types::{DecodingOptions, Error, EncodingResult, SimpleBinaryDecodable, StatusCode};

use super::message_chunk::{MessageChunk, MessageChunkHeader};
use super::secure_channel::SecureChannel;
use super::security_header::{SecurityHeader, SequenceHeader};

/// The result of parsing a chunk's headers against a particular secure
/// channel: where the body starts/ends, and the sequence header (§4.4
/// steps 1-3).
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    /// The decoded message header.
    pub message_header: MessageChunkHeader,
    /// The decoded security header (asymmetric for `OPN`, symmetric
    /// otherwise).
    pub security_header: SecurityHeader,
    /// The decoded sequence header.
    pub sequence_header: SequenceHeader,
    /// Byte offset of the body (sequence header end) within the chunk.
    pub body_offset: usize,
    /// Byte length of the body, excluding any trailing padding/signature
    /// (only meaningful once the caller has decrypted and stripped
    /// padding; before that it is the remainder of the chunk).
    pub body_length: usize,
}

impl ChunkInfo {
    /// Parse `chunk`'s message header, security header and sequence header,
    /// checking the chunk's `secureChannelId` against `secure_channel` once
    /// a channel id has actually been assigned (it is `0` before the first
    /// Open completes).
    pub fn new(chunk: &MessageChunk, secure_channel: &SecureChannel) -> EncodingResult<ChunkInfo> {
        let decoding_options = DecodingOptions::default();
        let mut stream = Cursor::new(&chunk.data);

        let message_header = MessageChunkHeader::decode(&mut stream, &decoding_options)?;

        if secure_channel.secure_channel_id != 0
            && message_header.secure_channel_id != secure_channel.secure_channel_id
        {
            return Err(Error::new(
                StatusCode::BadTcpSecureChannelUnknown,
                format!(
                    "chunk carries secure channel id {}, expected {}",
                    message_header.secure_channel_id, secure_channel.secure_channel_id
                ),
            ));
        }

        let is_open_secure_channel = message_header.message_type.is_open_secure_channel();
        let security_header =
            SecurityHeader::decode_from_stream(&mut stream, is_open_secure_channel, &decoding_options)?;

        let sequence_header = SequenceHeader::decode(&mut stream, &decoding_options)?;

        let body_offset = stream.position() as usize;
        let body_length = chunk.data.len().saturating_sub(body_offset);

        Ok(ChunkInfo {
            message_header,
            security_header,
            sequence_header,
            body_offset,
            body_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::message_chunk::{MessageChunkType, MessageIsFinalType};
    use opcua_crypto::{MessageSecurityMode, SecurityPolicy};

    #[test]
    fn parses_headers_of_an_unsecured_chunk() {
        let mut secure_channel = SecureChannel::new();
        secure_channel.security_mode = MessageSecurityMode::None;
        secure_channel.set_security_policy(SecurityPolicy::None);
        secure_channel.secure_channel_id = 42;

        let body = b"hello world".to_vec();
        let chunk = MessageChunk::new(
            1,
            1000,
            MessageChunkType::Message,
            MessageIsFinalType::Final,
            &secure_channel,
            &body,
        )
        .unwrap();

        let info = chunk.chunk_info(&secure_channel).unwrap();
        assert_eq!(info.sequence_header.sequence_number, 1);
        assert_eq!(info.sequence_header.request_id, 1000);
        assert_eq!(&chunk.data[info.body_offset..], &body[..]);
    }

    #[test]
    fn rejects_mismatched_secure_channel_id() {
        let mut secure_channel = SecureChannel::new();
        secure_channel.set_security_policy(SecurityPolicy::None);
        secure_channel.secure_channel_id = 42;

        let chunk = MessageChunk::new(
            1,
            1,
            MessageChunkType::Message,
            MessageIsFinalType::Final,
            &secure_channel,
            b"x",
        )
        .unwrap();

        let mut other = SecureChannel::new();
        other.set_security_policy(SecurityPolicy::None);
        other.secure_channel_id = 99;

        assert!(chunk.chunk_info(&other).is_err());
    }
}
