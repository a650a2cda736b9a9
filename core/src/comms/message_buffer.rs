// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `MsgBuffer` / `MsgBuffers` (§3.1, §4.3, §4.4): the chunk-aware byte
//! slabs a logical message (outbound or inbound) is assembled into.

use opcua_types::{Error, EncodingResult, StatusCode};

use super::message_chunk::{MessageChunk, MessageIsFinalType};

/// One chunk belonging to a logical message: its raw wire bytes, the
/// decoded/decrypted payload range within them, the sequence number it
/// carried, and whether it was the final chunk (§3.1).
#[derive(Debug, Clone)]
pub struct MsgBuffer {
    /// The chunk's full wire bytes (header through signature).
    pub chunk: MessageChunk,
    /// Byte range within `chunk.data` holding the decoded body (after
    /// decrypt and signature verification, padding stripped).
    pub body_range: (usize, usize),
    /// This chunk's sequence number.
    pub sequence_number: u32,
    /// Request id correlating this chunk to its logical message.
    pub request_id: u32,
    /// Whether this was the message's final/aborting chunk.
    pub is_final: MessageIsFinalType,
}

impl MsgBuffer {
    /// The decoded body bytes.
    pub fn body(&self) -> &[u8] {
        let (from, to) = self.body_range;
        &self.chunk.data[from..to]
    }
}

/// The chunks accumulated so far for one logical message, bounded to a
/// configured maximum chunk count (§3.1 "holds a configured maximum number
/// of chunks for one logical message", §7 `TooManyChunks`).
#[derive(Debug, Clone, Default)]
pub struct MsgBuffers {
    chunks: Vec<MsgBuffer>,
    max_chunk_count: usize,
}

impl MsgBuffers {
    /// An empty buffer set, accepting at most `max_chunk_count` chunks
    /// before further appends are rejected (`0` means unbounded).
    pub fn new(max_chunk_count: usize) -> MsgBuffers {
        MsgBuffers {
            chunks: Vec::new(),
            max_chunk_count,
        }
    }

    /// Number of chunks accumulated so far.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// `true` if no chunks have been appended yet.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The request id of the in-progress message, or `None` if empty.
    pub fn request_id(&self) -> Option<u32> {
        self.chunks.first().map(|c| c.request_id)
    }

    /// Append a chunk, enforcing the configured chunk-count limit (§7
    /// `BadTooManyOperations`).
    pub fn push(&mut self, msg: MsgBuffer) -> EncodingResult<()> {
        if self.max_chunk_count != 0 && self.chunks.len() >= self.max_chunk_count {
            return Err(Error::new(
                StatusCode::BadTooManyOperations,
                format!("message exceeds the configured maximum of {} chunks", self.max_chunk_count),
            ));
        }
        self.chunks.push(msg);
        Ok(())
    }

    /// `true` once the last appended chunk was the message's final chunk.
    /// An `Abort` chunk never reaches this buffer — `chunker::decode_chunk`
    /// decodes its reason and discards the buffer instead of pushing it
    /// (§4.4 step 4).
    pub fn is_complete(&self) -> bool {
        self.chunks.last().map(|c| c.is_final == MessageIsFinalType::Final).unwrap_or(false)
    }

    /// Concatenate every chunk's body, in arrival order, into one logical
    /// message body (§4.4 "on the final chunk, body decoded to an
    /// EncodeableObject").
    pub fn concatenated_body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.chunks.iter().map(|c| c.body().len()).sum());
        for c in &self.chunks {
            out.extend_from_slice(c.body());
        }
        out
    }

    /// Discard all accumulated chunks, e.g. after the message has been
    /// fully decoded, or after a `check_prec_chunk` mismatch resets
    /// reassembly (§4.4 `check_prec_chunk`).
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Verify that `request_id` matches the in-progress assembly's request
    /// id. A mismatch means the previous message was silently aborted;
    /// returns the orphaned request id and resets the buffer so the caller
    /// can start reassembling the new message (§4.4 `check_prec_chunk`).
    pub fn check_prec_chunk(&mut self, request_id: u32) -> Option<u32> {
        match self.request_id() {
            Some(existing) if existing != request_id => {
                self.clear();
                Some(existing)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::message_chunk::MessageChunk;

    fn msg(request_id: u32, sequence_number: u32, is_final: MessageIsFinalType) -> MsgBuffer {
        MsgBuffer {
            chunk: MessageChunk { data: vec![0xAB, 0xCD] },
            body_range: (0, 2),
            sequence_number,
            request_id,
            is_final,
        }
    }

    #[test]
    fn push_rejects_once_the_chunk_limit_is_reached() {
        let mut buffers = MsgBuffers::new(2);
        buffers.push(msg(1, 1, MessageIsFinalType::Intermediate)).unwrap();
        buffers.push(msg(1, 2, MessageIsFinalType::Intermediate)).unwrap();
        let err = buffers.push(msg(1, 3, MessageIsFinalType::Final)).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadTooManyOperations);
    }

    #[test]
    fn zero_limit_is_unbounded() {
        let mut buffers = MsgBuffers::new(0);
        for i in 0..50 {
            buffers.push(msg(1, i + 1, MessageIsFinalType::Intermediate)).unwrap();
        }
        assert_eq!(buffers.len(), 50);
    }

    #[test]
    fn mismatched_request_id_resets_and_returns_the_orphan() {
        let mut buffers = MsgBuffers::new(16);
        buffers.push(msg(1, 1, MessageIsFinalType::Intermediate)).unwrap();

        let orphaned = buffers.check_prec_chunk(2);
        assert_eq!(orphaned, Some(1));
        assert!(buffers.is_empty());
    }

    #[test]
    fn matching_request_id_does_not_reset() {
        let mut buffers = MsgBuffers::new(16);
        buffers.push(msg(1, 1, MessageIsFinalType::Intermediate)).unwrap();
        assert_eq!(buffers.check_prec_chunk(1), None);
        assert_eq!(buffers.len(), 1);
    }

    #[test]
    fn concatenated_body_preserves_arrival_order() {
        let mut buffers = MsgBuffers::new(16);
        let mut first = msg(1, 1, MessageIsFinalType::Intermediate);
        first.chunk.data = vec![1, 2];
        first.body_range = (0, 2);
        let mut second = msg(1, 2, MessageIsFinalType::Final);
        second.chunk.data = vec![3, 4];
        second.body_range = (0, 2);

        buffers.push(first).unwrap();
        buffers.push(second).unwrap();
        assert!(buffers.is_complete());
        assert_eq!(buffers.concatenated_body(), vec![1, 2, 3, 4]);
    }
}
