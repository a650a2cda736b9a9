// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `SendActionQueue` (§4.6): a per-connection FIFO of pending sends,
//! gated by the `sendToken` invariant — exactly one logical message may be
//! mid-flight on a connection at any time, enforced without a mutex since
//! the token is only ever touched by the serial action executor (§5).

use log::debug;

use opcua_types::{Encodable, EncodingResult, StatusCode};

use super::chunker::{self, SequenceNumbers};
use super::secure_channel::SecureChannel;
use super::transport::TransportConnection;

/// One queued send: the object to encode plus the request id it is
/// correlated with (§3.1 `SendAction { encType, object, requestId }`).
pub struct SendAction {
    pub object: Box<dyn Encodable>,
    pub request_id: u32,
}

/// The FIFO plus its `sendToken` gate. `dequeue_ready` only ever returns
/// an action while the token is held; `release` re-arms the queue once the
/// transport has confirmed the last chunk of the in-flight message.
#[derive(Default)]
pub struct SendActionQueue {
    queue: std::collections::VecDeque<SendAction>,
    send_token: bool,
}

impl SendActionQueue {
    /// A new queue with the token available (nothing in flight yet).
    pub fn new() -> SendActionQueue {
        SendActionQueue {
            queue: std::collections::VecDeque::new(),
            send_token: true,
        }
    }

    /// `true` iff no message is currently being chunked/flushed (§3.1
    /// "sendToken: bool (the available flag)").
    pub fn send_token_available(&self) -> bool {
        self.send_token
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Append an action to the back of the queue. Does not itself start
    /// sending — call `dequeue_ready` to pull the next action once the
    /// token is available.
    pub fn enqueue(&mut self, action: SendAction) {
        self.queue.push_back(action);
    }

    /// Dequeue the next action and consume the token, or `None` if the
    /// token is held by an in-flight send or the queue is empty (§4.6
    /// "Dequeues one action when sendToken = true; sets sendToken =
    /// false").
    pub fn dequeue_ready(&mut self) -> Option<SendAction> {
        if !self.send_token {
            return None;
        }
        let action = self.queue.pop_front()?;
        self.send_token = false;
        Some(action)
    }

    /// The transport's completion callback for the *last* chunk of the
    /// in-flight message fires this: release the token and let the next
    /// queued action be dequeued (§4.6).
    pub fn release(&mut self) {
        debug!("send token released, {} action(s) still queued", self.queue.len());
        self.send_token = true;
    }

    /// Mid-message transport failure after at least one chunk was already
    /// sent (§4.6 "emits an Abort chunk carrying the error reason, then
    /// releases the token"): build the Abort chunk, hand it to the
    /// transport, and re-arm the queue regardless of whether the send
    /// itself succeeds — the message is being abandoned either way.
    pub fn abort_in_flight(
        &mut self,
        secure_channel: &SecureChannel,
        sequence_numbers: &mut SequenceNumbers,
        transport: &mut dyn TransportConnection,
        request_id: u32,
        reason: StatusCode,
        message: &str,
    ) -> EncodingResult<()> {
        debug!("aborting in-flight send: {reason}");
        let result = chunker::encode_abort_chunk(secure_channel, sequence_numbers, request_id, reason, message)
            .map(|chunk| transport.send(&chunk.data, &mut |_| {}));
        self.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::transport::SendOutcome;
    use std::any::Any;
    use std::io::Write;

    #[derive(Debug)]
    struct Dummy;

    struct LoopbackTransport {
        sent: Vec<Vec<u8>>,
    }

    impl TransportConnection for LoopbackTransport {
        fn send(&mut self, bytes: &[u8], on_complete: &mut dyn FnMut(SendOutcome)) {
            self.sent.push(bytes.to_vec());
            on_complete(SendOutcome::Sent);
        }

        fn close(&mut self) {}

        fn is_open(&self) -> bool {
            true
        }
    }

    impl Encodable for Dummy {
        fn binary_encoding_id(&self) -> opcua_types::NodeId {
            opcua_types::NodeId::new(1)
        }
        fn byte_len(&self) -> usize {
            0
        }
        fn encode(&self, _stream: &mut dyn Write) -> opcua_types::EncodingResult<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn only_one_action_is_in_flight_at_a_time() {
        let mut q = SendActionQueue::new();
        assert!(q.send_token_available());

        q.enqueue(SendAction {
            object: Box::new(Dummy),
            request_id: 1,
        });
        q.enqueue(SendAction {
            object: Box::new(Dummy),
            request_id: 2,
        });

        let first = q.dequeue_ready().unwrap();
        assert_eq!(first.request_id, 1);
        assert!(!q.send_token_available());

        // a second dequeue while the first is still in flight yields nothing
        assert!(q.dequeue_ready().is_none());

        q.release();
        assert!(q.send_token_available());

        let second = q.dequeue_ready().unwrap();
        assert_eq!(second.request_id, 2);
    }

    #[test]
    fn abort_in_flight_sends_an_abort_chunk_and_re_arms_the_token() {
        let mut q = SendActionQueue::new();
        q.enqueue(SendAction {
            object: Box::new(Dummy),
            request_id: 1,
        });
        q.dequeue_ready().unwrap();
        assert!(!q.send_token_available());

        let secure_channel = SecureChannel::new();
        let mut sequence_numbers = SequenceNumbers::default();
        let mut transport = LoopbackTransport { sent: Vec::new() };

        q.abort_in_flight(
            &secure_channel,
            &mut sequence_numbers,
            &mut transport,
            1,
            StatusCode::BadCommunicationError,
            "transport failed mid-message",
        )
        .unwrap();

        assert!(q.send_token_available());
        assert_eq!(transport.sent.len(), 1);
    }
}
