// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! TCP-UA framing, chunk codec, secure channel state and the send queue
//! (§4, §6.1, §6.2).

pub mod chunker;
pub mod events;
pub mod message_buffer;
pub mod message_chunk;
pub mod message_chunk_info;
pub mod secure_channel;
pub mod secure_channel_state;
pub mod security_header;
pub mod send_queue;
pub mod tcp_types;
pub mod transport;

pub use chunker::{DecodedChunk, SequenceNumbers};
pub use events::SecureChannelEvent;
pub use message_buffer::{MsgBuffer, MsgBuffers};
pub use message_chunk::{MessageChunk, MessageChunkHeader, MessageChunkType, MessageIsFinalType, MESSAGE_CHUNK_HEADER_SIZE};
pub use message_chunk_info::ChunkInfo;
pub use secure_channel::{SecureChannel, SecurityToken};
pub use secure_channel_state::{ChannelState, SecureChannelState};
pub use security_header::{AsymmetricSecurityHeader, SecurityHeader, SequenceHeader, SymmetricSecurityHeader, SEQUENCE_HEADER_SIZE};
pub use send_queue::{SendAction, SendActionQueue};
pub use transport::{SendOutcome, TransportConnection, TransportEvents};
