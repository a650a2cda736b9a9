// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `SecureChannelEvent` (§7): the seven user-visible events a secure
//! channel delivers as it connects, carries messages and tears down.
//! `SecureChannelState` (handshake/teardown transitions) and `chunker`
//! (message reassembly) are the only two producers.

use opcua_types::{Error, StatusCode};

/// One user-visible occurrence on a secure channel (§7).
#[derive(Debug, Clone)]
pub enum SecureChannelEvent {
    /// The handshake completed; the channel is open for traffic.
    Connected,
    /// The transport has finished closing.
    Disconnected,
    /// An intermediate chunk of a logical message was reassembled; more
    /// chunks are expected before the message is complete.
    SecureMessageChunk {
        /// Request id the chunk belongs to.
        request_id: u32,
    },
    /// The final chunk of a logical message was reassembled; the body is
    /// ready to be decoded.
    SecureMessageComplete {
        /// Request id the completed message belongs to.
        request_id: u32,
    },
    /// The peer aborted a logical message mid-flight (§4.4 step 4).
    SecureMessageAbort {
        /// Request id of the aborted message.
        request_id: u32,
        /// The abort reason's status code.
        status: StatusCode,
        /// The abort reason's free-text description.
        reason: String,
    },
    /// An internal or unexpected error not tied to a specific request.
    UnexpectedError(Error),
    /// The channel failed to establish, or was rejected.
    ConnectionFailed(Error),
}
