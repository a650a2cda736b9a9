// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `opcua-core`: the secure channel's chunk codec, key rollover, state
//! machine and send queue (§4, §6.1, §6.2), plus the `EncodeableRegistry`
//! (§3.1) message bodies are looked up through.

pub mod comms;
pub mod registry;

pub use comms::{
    ChannelState, ChunkInfo, DecodedChunk, MessageChunk, MessageChunkHeader, MessageChunkType, MessageIsFinalType, MsgBuffer,
    MsgBuffers, SecureChannel, SecureChannelEvent, SecureChannelState, SecurityToken, SendAction, SendActionQueue, SendOutcome,
    SequenceNumbers, TransportConnection, TransportEvents,
};
pub use registry::EncodeableRegistry;
