// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! Chunk codec (§4.3 sender path, §4.4 receiver path): turns a message body
//! into one or more signed/encrypted chunks, and the inverse.

use log::{debug, error};

use opcua_types::{Error, EncodingResult, SimpleBinaryDecodable, SimpleBinaryEncodable, StatusCode, UAString};

use super::events::SecureChannelEvent;
use super::message_buffer::{MsgBuffer, MsgBuffers};
use super::message_chunk::{MessageChunk, MessageChunkHeader, MessageChunkType, MessageIsFinalType};
use super::secure_channel::SecureChannel;

/// Wraps `lastSeqNumSent`/`lastSeqNumReceived`/`lastRequestIdSent` (§3.1):
/// the per-connection monotonic counters governing chunk ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceNumbers {
    last_sent: u32,
    last_received: u32,
    last_request_id_sent: u32,
}

/// Sequence numbers wrap back to at most this value (§4.4 step 3, §6.5
/// "Sequence numbers observed ... strictly increasing modulo the defined
/// wrap at 2^32 − 1024").
pub const SEQUENCE_NUMBER_WRAP_THRESHOLD: u32 = u32::MAX - 1024;

impl SequenceNumbers {
    /// Allocate the next outgoing sequence number, wrapping to 1 once the
    /// threshold is passed.
    pub fn next_sequence_number(&mut self) -> u32 {
        self.last_sent = if self.last_sent >= SEQUENCE_NUMBER_WRAP_THRESHOLD {
            1
        } else {
            self.last_sent + 1
        };
        self.last_sent
    }

    /// Allocate the next outgoing request id (these do not wrap per the
    /// same §4.4 rule — only sequence numbers are specified to).
    pub fn next_request_id(&mut self) -> u32 {
        self.last_request_id_sent = self.last_request_id_sent.wrapping_add(1);
        self.last_request_id_sent
    }

    /// Validate an inbound sequence number against `lastReceived` (§4.4
    /// step 3 `check_seq_num_received`): must be `lastReceived + 1`, except
    /// that once `lastReceived > 2^32 − 1024` a wrap to `<= 1024` is
    /// accepted and the counter resets accordingly.
    pub fn check_seq_num_received(&mut self, sequence_number: u32) -> EncodingResult<()> {
        let expected = self.last_received.wrapping_add(1);
        let wrap_permitted = self.last_received > SEQUENCE_NUMBER_WRAP_THRESHOLD && sequence_number <= 1024;

        if sequence_number == expected || wrap_permitted {
            self.last_received = sequence_number;
            Ok(())
        } else {
            error!(
                "sequence number {sequence_number} is not the expected {expected} (last received was {})",
                self.last_received
            );
            Err(Error::new(
                StatusCode::BadSequenceNumberInvalid,
                format!("expected sequence number {expected}, got {sequence_number}"),
            ))
        }
    }
}

/// Encode `body` into one or more `MSG`/`CLO` chunks, each at most
/// `chunk_size` bytes once padding/signature is accounted for, signing and
/// (if the mode requires) encrypting every chunk with the current symmetric
/// key set (§4.3). `OpenSecureChannel` chunks use the asymmetric handshake
/// path instead — see [`encode_open_secure_channel_chunk`].
pub fn encode_chunks(
    secure_channel: &SecureChannel,
    sequence_numbers: &mut SequenceNumbers,
    request_id: u32,
    message_type: MessageChunkType,
    body: &[u8],
    chunk_size: usize,
) -> EncodingResult<Vec<MessageChunk>> {
    let max_body_size = MessageChunk::body_size_from_message_size(message_type, secure_channel, chunk_size)
        .map_err(|_| Error::new(StatusCode::BadTcpMessageTooLarge, "configured chunk size is too small"))?;

    if max_body_size == 0 {
        return Err(Error::new(StatusCode::BadTcpMessageTooLarge, "no room for a message body in this chunk size"));
    }

    let body_chunks: Vec<&[u8]> = if body.is_empty() {
        vec![&body[0..0]]
    } else {
        body.chunks(max_body_size).collect()
    };

    let last_index = body_chunks.len() - 1;
    let mut chunks = Vec::with_capacity(body_chunks.len());

    for (i, body_chunk) in body_chunks.into_iter().enumerate() {
        let is_final = if i == last_index {
            MessageIsFinalType::Final
        } else {
            MessageIsFinalType::Intermediate
        };
        let sequence_number = sequence_numbers.next_sequence_number();

        let security_header = secure_channel.make_security_header(message_type);
        let padding = secure_channel.calc_chunk_padding(body_chunk.len(), &security_header, chunk_size);

        let mut padded_body = Vec::with_capacity(body_chunk.len() + padding + 1);
        padded_body.extend_from_slice(body_chunk);
        if secure_channel.encryption_enabled() {
            for _ in 0..padding {
                padded_body.push(padding as u8);
            }
            padded_body.push(padding as u8);
        }

        let unsigned = MessageChunk::new(sequence_number, request_id, message_type, is_final, secure_channel, &padded_body)?;

        let signature_size = secure_channel.signature_size();
        let mut signed = vec![0u8; unsigned.data.len() + signature_size];
        let encrypted_data_offset = unsigned.encrypted_data_offset(&opcua_types::DecodingOptions::default())?;

        let sign_info = (0, unsigned.data.len());
        let encrypt_info = (encrypted_data_offset, signed.len());
        secure_channel.encrypt_and_sign(&unsigned.data, sign_info, encrypt_info, &mut signed)?;

        let final_len = signed.len() as u32;
        signed[super::message_chunk::MESSAGE_SIZE_OFFSET..super::message_chunk::MESSAGE_SIZE_OFFSET + 4]
            .copy_from_slice(&final_len.to_le_bytes());

        debug!("encoded chunk {i} of {} bytes for request {request_id}", signed.len());
        chunks.push(MessageChunk { data: signed });
    }

    Ok(chunks)
}

/// Outcome of decoding one inbound chunk: the orphaned request id, if this
/// chunk started a new message while a previous one was still in-flight
/// (§4.4 `check_prec_chunk`), plus the user-visible event the reassembly
/// reached (§7).
#[derive(Debug)]
pub struct DecodedChunk {
    /// The request id of a message that was silently abandoned because this
    /// chunk belongs to a different, newer one.
    pub orphaned_request_id: Option<u32>,
    /// The event to deliver for this chunk.
    pub event: SecureChannelEvent,
}

/// Decode, decrypt and verify one inbound `MSG`/`CLO` chunk with the
/// symmetric key set named by its token id, validate its sequence number
/// and request id against `sequence_numbers`/`buffers`, and append it to
/// `buffers` (§4.4 steps 1-4). An `Abort` chunk (§4.4 step 4) is handled
/// specially: its body is decoded as the abort reason rather than message
/// content, the in-progress buffer is discarded, and `SecureMessageAbort`
/// is delivered instead of being pushed as a completed message.
pub fn decode_chunk(
    secure_channel: &SecureChannel,
    sequence_numbers: &mut SequenceNumbers,
    buffers: &mut MsgBuffers,
    chunk: MessageChunk,
) -> EncodingResult<DecodedChunk> {
    // The sequence header is part of the encrypted range for
    // SignAndEncrypt (§4.3 step 5), so it cannot be trusted straight off
    // the wire the way `ChunkInfo` reads it — decrypt first, then decode
    // the real sequence header out of the plaintext.
    let decoding_options = opcua_types::DecodingOptions::default();
    let (message_header, security_header, header_end) = chunk.header_and_security(&decoding_options)?;

    if secure_channel.secure_channel_id != 0 && message_header.secure_channel_id != secure_channel.secure_channel_id {
        return Err(Error::new(
            StatusCode::BadTcpSecureChannelUnknown,
            format!(
                "chunk carries secure channel id {}, expected {}",
                message_header.secure_channel_id, secure_channel.secure_channel_id
            ),
        ));
    }

    let token_id = match &security_header {
        super::security_header::SecurityHeader::Symmetric(h) => h.token_id,
        super::security_header::SecurityHeader::Asymmetric(_) => {
            return Err(Error::new(
                StatusCode::BadTcpMessageTypeInvalid,
                "OpenSecureChannel chunks must be decoded with decode_open_secure_channel_chunk",
            ));
        }
    };

    let signature_size = secure_channel.signature_size();
    let sign_info = (0, chunk.data.len() - signature_size);
    let encrypt_info = (header_end, chunk.data.len());

    let mut decoded = vec![0u8; chunk.data.len()];
    secure_channel.decrypt_and_verify(token_id, &chunk.data, sign_info, encrypt_info, &mut decoded)?;

    let sequence_header =
        super::security_header::SequenceHeader::decode(&mut std::io::Cursor::new(&decoded[header_end..]), &decoding_options)?;
    let body_offset = header_end + super::security_header::SEQUENCE_HEADER_SIZE;

    sequence_numbers.check_seq_num_received(sequence_header.sequence_number)?;

    let orphaned_request_id = buffers.check_prec_chunk(sequence_header.request_id);

    let body_end = strip_padding(&decoded, body_offset, sign_info.1, secure_channel);

    if message_header.is_final == MessageIsFinalType::FinalError {
        let (status, reason) = decode_abort_reason(&decoded[body_offset..body_end])?;
        buffers.clear();
        return Ok(DecodedChunk {
            orphaned_request_id,
            event: SecureChannelEvent::SecureMessageAbort {
                request_id: sequence_header.request_id,
                status,
                reason,
            },
        });
    }

    let request_id = sequence_header.request_id;
    let is_final = message_header.is_final;
    let msg_buffer = MsgBuffer {
        chunk: MessageChunk { data: decoded },
        body_range: (body_offset, body_end),
        sequence_number: sequence_header.sequence_number,
        request_id,
        is_final,
    };
    buffers.push(msg_buffer)?;

    let event = if is_final == MessageIsFinalType::Final {
        SecureChannelEvent::SecureMessageComplete { request_id }
    } else {
        SecureChannelEvent::SecureMessageChunk { request_id }
    };

    Ok(DecodedChunk { orphaned_request_id, event })
}

/// Decode an `Abort` chunk's body: `StatusCode` followed by a `String`
/// reason (§4.4 step 4).
fn decode_abort_reason(body: &[u8]) -> EncodingResult<(StatusCode, String)> {
    let decoding_options = opcua_types::DecodingOptions::default();
    let mut cursor = std::io::Cursor::new(body);
    let status = StatusCode::decode(&mut cursor, &decoding_options)?;
    let reason = UAString::decode(&mut cursor, &decoding_options)?;
    Ok((status, reason.as_ref().to_string()))
}

/// Build the single `Abort` chunk for a message that has already had one or
/// more chunks sent (§4.6 "emits an Abort chunk carrying the error reason").
/// Signed/encrypted exactly like an ordinary `MSG` chunk, but marked
/// `FinalError` and carrying `(StatusCode, String)` as its body instead of
/// the message that was being sent.
pub fn encode_abort_chunk(
    secure_channel: &SecureChannel,
    sequence_numbers: &mut SequenceNumbers,
    request_id: u32,
    reason: StatusCode,
    message: &str,
) -> EncodingResult<MessageChunk> {
    let mut body = Vec::new();
    reason.encode(&mut body)?;
    UAString::from(message).encode(&mut body)?;

    let sequence_number = sequence_numbers.next_sequence_number();
    let security_header = secure_channel.make_security_header(MessageChunkType::Message);
    let padding = secure_channel.calc_chunk_padding(body.len(), &security_header, 0);

    let mut padded_body = Vec::with_capacity(body.len() + padding + 1);
    padded_body.extend_from_slice(&body);
    if secure_channel.encryption_enabled() {
        for _ in 0..padding {
            padded_body.push(padding as u8);
        }
        padded_body.push(padding as u8);
    }

    let unsigned = MessageChunk::new(
        sequence_number,
        request_id,
        MessageChunkType::Message,
        MessageIsFinalType::FinalError,
        secure_channel,
        &padded_body,
    )?;

    let signature_size = secure_channel.signature_size();
    let mut signed = vec![0u8; unsigned.data.len() + signature_size];
    let encrypted_data_offset = unsigned.encrypted_data_offset(&opcua_types::DecodingOptions::default())?;

    let sign_info = (0, unsigned.data.len());
    let encrypt_info = (encrypted_data_offset, signed.len());
    secure_channel.encrypt_and_sign(&unsigned.data, sign_info, encrypt_info, &mut signed)?;

    let final_len = signed.len() as u32;
    signed[super::message_chunk::MESSAGE_SIZE_OFFSET..super::message_chunk::MESSAGE_SIZE_OFFSET + 4]
        .copy_from_slice(&final_len.to_le_bytes());

    debug!("encoded Abort chunk ({reason}) for request {request_id}");
    Ok(MessageChunk { data: signed })
}

/// Strip the trailing padding byte(s) that `encode_chunks` appended before
/// encryption, when encryption is enabled (§4.3 step 6, §4.4 step 2).
fn strip_padding(decoded: &[u8], body_start: usize, body_and_padding_end: usize, secure_channel: &SecureChannel) -> usize {
    if !secure_channel.encryption_enabled() || body_and_padding_end <= body_start {
        return body_and_padding_end;
    }
    let padding_size = decoded[body_and_padding_end - 1] as usize;
    if padding_size < body_and_padding_end - body_start {
        body_and_padding_end - 1 - padding_size
    } else {
        body_and_padding_end
    }
}

/// Build the single chunk of an `OpenSecureChannel` request/response
/// (§4.3 step 3, §4.4 step 1 "asymmetric path"). Unlike the symmetric
/// path, OPN bodies are never split across chunks — they carry only the
/// handshake message itself, and the security header carries the sender's
/// own certificate rather than just a token id.
pub fn encode_open_secure_channel_chunk(
    secure_channel: &SecureChannel,
    sender_certificate: &super::security_header::AsymmetricSecurityHeader,
    sequence_numbers: &mut SequenceNumbers,
    request_id: u32,
    body: &[u8],
) -> EncodingResult<MessageChunk> {
    use super::message_chunk::MESSAGE_CHUNK_HEADER_SIZE;
    use super::security_header::SecurityHeader;

    let ciphertext = secure_channel.asymmetric_encrypt_and_sign(body)?;
    let sequence_number = sequence_numbers.next_sequence_number();

    let security_header = SecurityHeader::Asymmetric(sender_certificate.clone());
    let message_size = MESSAGE_CHUNK_HEADER_SIZE + security_header.byte_len() + 8 + ciphertext.len();

    let mut data = vec![0u8; message_size];
    {
        let mut stream = std::io::Cursor::new(&mut data[..]);
        MessageChunkHeader {
            message_type: MessageChunkType::OpenSecureChannel,
            is_final: MessageIsFinalType::Final,
            message_size: message_size as u32,
            secure_channel_id: secure_channel.secure_channel_id,
        }
        .encode(&mut stream)?;
        security_header.encode(&mut stream)?;
        sequence_number.encode(&mut stream)?;
        request_id.encode(&mut stream)?;
        std::io::Write::write_all(&mut stream, &ciphertext)?;
    }

    Ok(MessageChunk { data })
}

/// Decode and decrypt an inbound `OpenSecureChannel` chunk, returning its
/// `(requestId, body)` (§4.4 step 1 "asymmetric path").
pub fn decode_open_secure_channel_chunk(
    secure_channel: &SecureChannel,
    chunk: &MessageChunk,
) -> EncodingResult<(u32, Vec<u8>)> {
    let info = chunk.chunk_info(secure_channel)?;
    if !matches!(info.security_header, super::security_header::SecurityHeader::Asymmetric(_)) {
        return Err(Error::new(StatusCode::BadTcpMessageTypeInvalid, "expected an asymmetric security header"));
    }

    let ciphertext = &chunk.data[info.body_offset..];
    let plaintext = secure_channel.asymmetric_decrypt_and_verify(ciphertext)?;
    Ok((info.sequence_header.request_id, plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_crypto::{MessageSecurityMode, SecurityPolicy};
    use opcua_types::ByteString;

    fn paired_channels() -> (SecureChannel, SecureChannel) {
        let mut client = SecureChannel::new();
        let mut server = SecureChannel::new();
        for ch in [&mut client, &mut server] {
            ch.security_mode = MessageSecurityMode::SignAndEncrypt;
            ch.set_security_policy(SecurityPolicy::Basic256Sha256);
            ch.secure_channel_id = 5;
        }
        client.create_random_nonce();
        server.create_random_nonce();
        let cn = ByteString { value: Some(client.nonce.as_bytes().to_vec()) };
        let sn = ByteString { value: Some(server.nonce.as_bytes().to_vec()) };
        server.set_their_nonce(&cn).unwrap();
        client.set_their_nonce(&sn).unwrap();
        client.derive_keys(true).unwrap();
        server.derive_keys(false).unwrap();
        let token = super::super::secure_channel::SecurityToken {
            channel_id: 5,
            token_id: 9,
            created_at: 0,
            revised_lifetime: 60_000,
        };
        client.set_security_token(token);
        server.set_security_token(token);
        (client, server)
    }

    #[test]
    fn single_chunk_round_trip() {
        let (client, server) = paired_channels();
        let mut seq = SequenceNumbers::default();

        let body = b"a short message body".to_vec();
        let chunks = encode_chunks(&client, &mut seq, 42, MessageChunkType::Message, &body, 8192).unwrap();
        assert_eq!(chunks.len(), 1);

        let mut recv_seq = SequenceNumbers::default();
        let mut buffers = MsgBuffers::new(16);
        let decoded = decode_chunk(&server, &mut recv_seq, &mut buffers, chunks.into_iter().next().unwrap()).unwrap();

        assert!(matches!(decoded.event, SecureChannelEvent::SecureMessageComplete { request_id: 42 }));
        assert!(buffers.is_complete());
        assert_eq!(buffers.concatenated_body(), body);
    }

    #[test]
    fn multi_chunk_message_reassembles_in_order() {
        let (client, server) = paired_channels();
        let mut seq = SequenceNumbers::default();

        let body = vec![0xABu8; 20_000];
        let chunks = encode_chunks(&client, &mut seq, 7, MessageChunkType::Message, &body, 8192).unwrap();
        assert!(chunks.len() > 1);
        let last_index = chunks.len() - 1;

        let mut recv_seq = SequenceNumbers::default();
        let mut buffers = MsgBuffers::new(16);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let decoded = decode_chunk(&server, &mut recv_seq, &mut buffers, chunk).unwrap();
            if i == last_index {
                assert!(matches!(decoded.event, SecureChannelEvent::SecureMessageComplete { request_id: 7 }));
            } else {
                assert!(matches!(decoded.event, SecureChannelEvent::SecureMessageChunk { request_id: 7 }));
            }
        }

        assert!(buffers.is_complete());
        assert_eq!(buffers.concatenated_body(), body);
    }

    #[test]
    fn abort_chunk_discards_the_buffer_and_surfaces_the_reason() {
        let (client, server) = paired_channels();

        // Encode a multi-chunk message, but only the first chunk is ever
        // actually put on the wire before the sender aborts.
        let body = vec![0xCDu8; 20_000];
        let mut encode_seq = SequenceNumbers::default();
        let chunks = encode_chunks(&client, &mut encode_seq, 11, MessageChunkType::Message, &body, 8192).unwrap();
        assert!(chunks.len() > 1, "need at least one intermediate chunk before the abort");
        let first_chunk = chunks.into_iter().next().unwrap();

        let mut abort_seq = SequenceNumbers { last_sent: 1, ..SequenceNumbers::default() };
        let abort = encode_abort_chunk(&client, &mut abort_seq, 11, StatusCode::BadCommunicationError, "peer hung up").unwrap();

        let mut recv_seq = SequenceNumbers::default();
        let mut buffers = MsgBuffers::new(16);

        let first = decode_chunk(&server, &mut recv_seq, &mut buffers, first_chunk).unwrap();
        assert!(matches!(first.event, SecureChannelEvent::SecureMessageChunk { request_id: 11 }));
        assert_eq!(buffers.len(), 1);

        let aborted = decode_chunk(&server, &mut recv_seq, &mut buffers, abort).unwrap();
        assert!(buffers.is_empty(), "the in-progress buffer must be discarded on Abort");
        match aborted.event {
            SecureChannelEvent::SecureMessageAbort { request_id, status, reason } => {
                assert_eq!(request_id, 11);
                assert_eq!(status, StatusCode::BadCommunicationError);
                assert_eq!(reason, "peer hung up");
            }
            other => panic!("expected SecureMessageAbort, got {other:?}"),
        }
    }

    #[test]
    fn out_of_order_sequence_number_is_rejected() {
        let mut seq = SequenceNumbers::default();
        seq.check_seq_num_received(1).unwrap();
        assert!(seq.check_seq_num_received(3).is_err());
    }

    #[test]
    fn sequence_number_wraps_near_the_top_of_the_range() {
        let mut seq = SequenceNumbers {
            last_sent: 0,
            last_received: SEQUENCE_NUMBER_WRAP_THRESHOLD + 1,
            last_request_id_sent: 0,
        };
        assert!(seq.check_seq_num_received(1).is_ok());
    }
}
