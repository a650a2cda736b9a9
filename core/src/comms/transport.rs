// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `TransportConnection` (§6.2): the byte-transport boundary the secure
//! channel is built against. The core only ever needs a reliable ordered
//! bidirectional byte stream with asynchronous send-completion
//! notification — this crate never opens a socket itself.

use opcua_types::{Error, StatusCode};

/// Outcome of one `send` call, delivered to its completion callback
/// exactly once (§6.2 "on_complete fires exactly once per send").
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Sent,
    Failed(Error),
}

/// Events a `TransportConnection` delivers to its owner: received bytes
/// (already chunk-framed at the `length` field, per §6.2), and the close
/// notification.
pub trait TransportEvents {
    /// One inbound buffer, a complete TCP-UA message chunk.
    fn on_receive(&mut self, bytes: &[u8]);

    /// The transport has closed, locally or remotely.
    fn on_closed(&mut self, reason: Option<StatusCode>);
}

/// The byte-transport contract the secure channel is driven over (§6.2).
/// A concrete implementation owns the socket and is free to run its I/O
/// on whatever executor it likes; this crate only calls `send`/`close`
/// and expects `TransportEvents` callbacks in return.
pub trait TransportConnection {
    /// Write `bytes` (one already-encoded chunk) to the wire. `on_complete`
    /// fires exactly once, reporting whether the write succeeded.
    fn send(&mut self, bytes: &[u8], on_complete: &mut dyn FnMut(SendOutcome));

    /// Close the connection. Idempotent — closing an already-closed
    /// transport is not an error.
    fn close(&mut self);

    /// `true` if the transport is still open for sends.
    fn is_open(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LoopbackTransport {
        open: bool,
        sent: Vec<Vec<u8>>,
    }

    impl TransportConnection for LoopbackTransport {
        fn send(&mut self, bytes: &[u8], on_complete: &mut dyn FnMut(SendOutcome)) {
            if !self.open {
                on_complete(SendOutcome::Failed(Error::new(StatusCode::BadCommunicationError, "closed")));
                return;
            }
            self.sent.push(bytes.to_vec());
            on_complete(SendOutcome::Sent);
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    #[test]
    fn send_completion_fires_exactly_once() {
        let mut transport = LoopbackTransport { open: true, sent: Vec::new() };
        let mut completions = 0;
        transport.send(b"hello", &mut |outcome| {
            completions += 1;
            assert!(matches!(outcome, SendOutcome::Sent));
        });
        assert_eq!(completions, 1);
        assert_eq!(transport.sent, vec![b"hello".to_vec()]);
    }

    #[test]
    fn send_after_close_fails() {
        let mut transport = LoopbackTransport { open: true, sent: Vec::new() };
        transport.close();
        assert!(!transport.is_open());
        transport.send(b"x", &mut |outcome| {
            assert!(matches!(outcome, SendOutcome::Failed(_)));
        });
    }
}
