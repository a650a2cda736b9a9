// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! A message chunk is a message, or a portion of one, optionally signed
//! and encrypted, framed for transmission (§6.1, §4.3, §4.4).

use std::io::{Cursor, Read, Write};

use log::{error, trace};
use opcua_types::{
    read_u32, read_u8, write_u32, write_u8, DecodingOptions, Error, EncodingResult,
    SimpleBinaryDecodable, SimpleBinaryEncodable, StatusCode,
};

use super::message_chunk_info::ChunkInfo;
use super::secure_channel::SecureChannel;
use super::security_header::{SecurityHeader, SequenceHeader};
use super::tcp_types::{
    CHUNK_FINAL, CHUNK_FINAL_ERROR, CHUNK_INTERMEDIATE, CHUNK_MESSAGE,
    CLOSE_SECURE_CHANNEL_MESSAGE, MIN_CHUNK_SIZE, OPEN_SECURE_CHANNEL_MESSAGE,
};

/// Byte length of the message header common to every chunk (§6.1):
/// `msgType[3] + isFinal[1] + length:u32 + secureChannelId:u32`.
pub const MESSAGE_CHUNK_HEADER_SIZE: usize = 3 + 1 + 4 + 4;
/// Byte offset of the `length` field within the message header, used when
/// patching it in after the chunk body is known (§4.3 step "Patch the
/// length field").
pub const MESSAGE_SIZE_OFFSET: usize = 3 + 1;

/// Which kind of message a chunk belongs to (§6.1 `msgType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageChunkType {
    /// An ordinary service message (`MSG`).
    Message,
    /// An OpenSecureChannel request/response (`OPN`).
    OpenSecureChannel,
    /// A CloseSecureChannel request/response (`CLO`).
    CloseSecureChannel,
}

impl MessageChunkType {
    /// `true` if this is `OpenSecureChannel`.
    pub fn is_open_secure_channel(&self) -> bool {
        *self == MessageChunkType::OpenSecureChannel
    }
}

/// Which marker a chunk carries (§3.2, §6.1 `isFinal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageIsFinalType {
    /// `'C'` — more chunks follow.
    Intermediate,
    /// `'F'` — the last chunk of the message.
    Final,
    /// `'A'` — the message is being aborted; this is the terminal chunk.
    FinalError,
}

/// The message header present on every chunk (§6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunkHeader {
    /// Kind of message (`MSG`/`OPN`/`CLO`).
    pub message_type: MessageChunkType,
    /// Chunk marker (`C`/`F`/`A`).
    pub is_final: MessageIsFinalType,
    /// Total size of the chunk, including this header.
    pub message_size: u32,
    /// Secure channel id this chunk belongs to.
    pub secure_channel_id: u32,
}

impl SimpleBinaryEncodable for MessageChunkHeader {
    fn byte_len(&self) -> usize {
        MESSAGE_CHUNK_HEADER_SIZE
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        let message_type: &[u8] = match self.message_type {
            MessageChunkType::Message => CHUNK_MESSAGE,
            MessageChunkType::OpenSecureChannel => OPEN_SECURE_CHANNEL_MESSAGE,
            MessageChunkType::CloseSecureChannel => CLOSE_SECURE_CHANNEL_MESSAGE,
        };
        let is_final = match self.is_final {
            MessageIsFinalType::Intermediate => CHUNK_INTERMEDIATE,
            MessageIsFinalType::Final => CHUNK_FINAL,
            MessageIsFinalType::FinalError => CHUNK_FINAL_ERROR,
        };

        stream.write_all(message_type)?;
        write_u8(stream, is_final)?;
        write_u32(stream, self.message_size)?;
        write_u32(stream, self.secure_channel_id)
    }
}

impl SimpleBinaryDecodable for MessageChunkHeader {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        let mut message_type_code = [0u8; 3];
        stream.read_exact(&mut message_type_code)?;
        let message_type = match &message_type_code as &[u8] {
            CHUNK_MESSAGE => MessageChunkType::Message,
            OPEN_SECURE_CHANNEL_MESSAGE => MessageChunkType::OpenSecureChannel,
            CLOSE_SECURE_CHANNEL_MESSAGE => MessageChunkType::CloseSecureChannel,
            r => {
                return Err(Error::decoding(format!("invalid message chunk type: {r:?}")));
            }
        };

        let chunk_type_code = read_u8(stream)?;
        let is_final = match chunk_type_code {
            CHUNK_FINAL => MessageIsFinalType::Final,
            CHUNK_INTERMEDIATE => MessageIsFinalType::Intermediate,
            CHUNK_FINAL_ERROR => MessageIsFinalType::FinalError,
            r => {
                return Err(Error::decoding(format!("invalid message final type: {r}")));
            }
        };

        let message_size = read_u32(stream)?;
        let secure_channel_id = read_u32(stream)?;

        Ok(MessageChunkHeader {
            message_type,
            is_final,
            message_size,
            secure_channel_id,
        })
    }
}

/// A raw wire chunk: header, security header, sequence header, body,
/// padding and signature — already signed/encrypted if that applies
/// (§6.1).
#[derive(Debug, Clone)]
pub struct MessageChunk {
    /// The full chunk bytes, including every header.
    pub data: Vec<u8>,
}

/// Returned when a configured chunk size is too small to fit even the
/// fixed overhead (§4.3 `set_max_body_size`).
#[derive(Debug)]
pub struct MessageChunkTooSmall;

impl SimpleBinaryEncodable for MessageChunk {
    fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        stream
            .write_all(&self.data)
            .map_err(|e| Error::encoding(format!("error writing message chunk to stream: {e}")))
    }
}

impl SimpleBinaryDecodable for MessageChunk {
    fn decode<S: Read + ?Sized>(
        in_stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let chunk_header = MessageChunkHeader::decode(in_stream, decoding_options).map_err(|err| {
            Error::new(StatusCode::BadCommunicationError, format!("cannot decode chunk header: {err}"))
        })?;

        let message_size = chunk_header.message_size as usize;
        if decoding_options.max_message_size > 0 && message_size > decoding_options.max_message_size {
            return Err(Error::new(
                StatusCode::BadTcpMessageTooLarge,
                format!(
                    "message size {message_size} exceeds the maximum of {}",
                    decoding_options.max_message_size
                ),
            ));
        }
        if message_size < MESSAGE_CHUNK_HEADER_SIZE {
            return Err(Error::decoding(format!(
                "message size {message_size} is smaller than the header it must contain"
            )));
        }

        let mut data = vec![0u8; message_size];
        {
            let mut stream = Cursor::new(&mut data[..]);
            chunk_header.encode(&mut stream)?;
        }
        in_stream.read_exact(&mut data[MESSAGE_CHUNK_HEADER_SIZE..])?;

        Ok(MessageChunk { data })
    }
}

impl MessageChunk {
    /// Assemble a chunk's bytes: message header, security header, sequence
    /// header, then the raw (not yet padded/signed/encrypted) body bytes
    /// (§4.3 steps 2-5).
    pub fn new(
        sequence_number: u32,
        request_id: u32,
        message_type: MessageChunkType,
        is_final: MessageIsFinalType,
        secure_channel: &SecureChannel,
        data: &[u8],
    ) -> EncodingResult<MessageChunk> {
        let security_header = secure_channel.make_security_header(message_type);
        let sequence_header = SequenceHeader {
            sequence_number,
            request_id,
        };

        let mut message_size = MESSAGE_CHUNK_HEADER_SIZE;
        message_size += security_header.byte_len();
        message_size += sequence_header.byte_len();
        message_size += data.len();

        trace!("creating a chunk of size {message_size} (excluding padding & signature)");

        let chunk_header = MessageChunkHeader {
            message_type,
            is_final,
            message_size: message_size as u32,
            secure_channel_id: secure_channel.secure_channel_id,
        };

        let mut buf = vec![0u8; message_size];
        {
            let mut stream = Cursor::new(&mut buf[..]);
            chunk_header.encode(&mut stream)?;
            security_header.encode(&mut stream)?;
            sequence_header.encode(&mut stream)?;
            stream.write_all(data)?;
        }

        Ok(MessageChunk { data: buf })
    }

    /// The largest body size that fits inside a chunk of `max_chunk_size`
    /// bytes once headers, signature and minimum padding are accounted
    /// for (§4.3 `set_max_body_size` / `sendingMaxBodySize`).
    pub fn body_size_from_message_size(
        message_type: MessageChunkType,
        secure_channel: &SecureChannel,
        max_chunk_size: usize,
    ) -> Result<usize, MessageChunkTooSmall> {
        if max_chunk_size < MIN_CHUNK_SIZE {
            error!("chunk size {max_chunk_size} is below the protocol minimum of {MIN_CHUNK_SIZE}");
            return Err(MessageChunkTooSmall);
        }

        let security_header = secure_channel.make_security_header(message_type);
        let mut header_size = MESSAGE_CHUNK_HEADER_SIZE;
        header_size += security_header.byte_len();
        header_size += SequenceHeader {
            sequence_number: 0,
            request_id: 0,
        }
        .byte_len();

        let signature_size = secure_channel.signature_size();
        let plain_text_block_size = secure_channel.plain_block_size();

        let aligned_max_chunk_size = if plain_text_block_size > 0 {
            max_chunk_size - (max_chunk_size % plain_text_block_size)
        } else {
            max_chunk_size
        };

        // One byte of padding length is always reserved even when no
        // padding ends up being needed (§4.3 step 6).
        let minimum_padding = if secure_channel.encryption_enabled() { 1 } else { 0 };

        Ok(aligned_max_chunk_size - header_size - signature_size - minimum_padding)
    }

    /// Decode just the message header.
    pub fn message_header(&self, decoding_options: &DecodingOptions) -> EncodingResult<MessageChunkHeader> {
        let mut stream = Cursor::new(&self.data);
        MessageChunkHeader::decode(&mut stream, decoding_options)
    }

    /// `true` if this chunk is part of an OpenSecureChannel exchange.
    pub fn is_open_secure_channel(&self, decoding_options: &DecodingOptions) -> bool {
        self.message_header(decoding_options)
            .map(|h| h.message_type.is_open_secure_channel())
            .unwrap_or(false)
    }

    /// Decode the chunk's header/security-header/sequence-header and
    /// locate the signed/encrypted payload range (§4.4).
    pub fn chunk_info(&self, secure_channel: &SecureChannel) -> EncodingResult<ChunkInfo> {
        ChunkInfo::new(self, secure_channel)
    }

    pub(crate) fn encrypted_data_offset(&self, decoding_options: &DecodingOptions) -> EncodingResult<usize> {
        let (_, _, offset) = self.header_and_security(decoding_options)?;
        Ok(offset)
    }

    /// Decode the message header and security header only, without
    /// touching the sequence header that follows them. For a symmetric
    /// `SignAndEncrypt` chunk the sequence header is itself part of the
    /// encrypted range (§4.3 step 5), so callers that need to decrypt
    /// first must stop here rather than going through [`Self::chunk_info`].
    pub(crate) fn header_and_security(
        &self,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<(MessageChunkHeader, SecurityHeader, usize)> {
        let mut stream = Cursor::new(&self.data);
        let message_header = MessageChunkHeader::decode(&mut stream, decoding_options)?;
        let security_header = SecurityHeader::decode_from_stream(
            &mut stream,
            message_header.message_type.is_open_secure_channel(),
            decoding_options,
        )?;
        Ok((message_header, security_header, stream.position() as usize))
    }
}
