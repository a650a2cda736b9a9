// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `ChannelState` / `SecureChannelState` (§4.5): the per-connection state
//! machine governing the handshake, the Renew overlap, and teardown. This
//! module tracks the state only — the transport and crypto side effects a
//! transition implies (send an OPN request, derive keys, zeroise tokens)
//! are performed by the caller before or after driving the transition.

use log::{debug, error};

use opcua_types::{Error, EncodingResult, StatusCode};

use super::events::SecureChannelEvent;

/// The states of §4.5's table. `Disconnected` and `Error` are terminal:
/// once entered, the channel accepts no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    ConnectingTransport,
    ConnectingSecure,
    Connected,
    Disconnecting,
    Disconnected,
    Error,
}

impl ChannelState {
    /// `true` for the two terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelState::Disconnected | ChannelState::Error)
    }
}

/// Drives `ChannelState` through the transitions of §4.5, rejecting any
/// event that doesn't apply to the current state rather than silently
/// ignoring it.
#[derive(Debug)]
pub struct SecureChannelState {
    state: ChannelState,
}

impl SecureChannelState {
    /// A fresh state machine, starting in `ConnectingTransport` (§4.5
    /// "initial: Connecting-Transport").
    pub fn new() -> SecureChannelState {
        SecureChannelState {
            state: ChannelState::ConnectingTransport,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    fn transition(&mut self, to: ChannelState) {
        debug!("secure channel state {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    fn expect(&self, want: ChannelState) -> EncodingResult<()> {
        if self.state == want {
            Ok(())
        } else {
            Err(Error::new(
                StatusCode::BadInvalidState,
                format!("event is not valid in state {:?} (expected {:?})", self.state, want),
            ))
        }
    }

    /// `TransportConnected` (§4.5): the caller should now send the
    /// asymmetric `OpenSecureChannel` request.
    pub fn on_transport_connected(&mut self) -> EncodingResult<()> {
        self.expect(ChannelState::ConnectingTransport)?;
        self.transition(ChannelState::ConnectingSecure);
        Ok(())
    }

    /// `TransportError` / handshake `Timeout` while still connecting
    /// (§4.5 "Fail pending requests with ConnectionFailed"). Delivers
    /// `ConnectionFailed` (§7).
    pub fn on_transport_error(&mut self) -> EncodingResult<SecureChannelEvent> {
        self.expect(ChannelState::ConnectingTransport)?;
        self.transition(ChannelState::Error);
        Ok(SecureChannelEvent::ConnectionFailed(Error::new(
            StatusCode::BadConnectionClosed,
            "transport failed while connecting",
        )))
    }

    /// `OpenResponse valid`: certificate, signature and nonce all checked
    /// out. The caller derives key sets and installs the token before or
    /// after calling this. Delivers `Connected` (§7).
    pub fn on_open_response_valid(&mut self) -> EncodingResult<SecureChannelEvent> {
        self.expect(ChannelState::ConnectingSecure)?;
        self.transition(ChannelState::Connected);
        Ok(SecureChannelEvent::Connected)
    }

    /// `OpenResponse invalid`. Delivers `ConnectionFailed` (§7).
    pub fn on_open_response_invalid(&mut self, reason: &str) -> EncodingResult<SecureChannelEvent> {
        self.expect(ChannelState::ConnectingSecure)?;
        error!("OpenSecureChannel response rejected: {reason}");
        self.transition(ChannelState::Error);
        Ok(SecureChannelEvent::ConnectionFailed(Error::new(StatusCode::BadSecurityChecksFailed, reason)))
    }

    /// `RenewRequest`/`RenewResponse` signed by the current key set. The
    /// channel stays `Connected`; the caller is expected to have already
    /// called `SecureChannel::set_security_token` to move current→previous
    /// and install the new token.
    pub fn on_renewed(&mut self) -> EncodingResult<()> {
        self.expect(ChannelState::Connected)
    }

    /// `CloseSecureChannel`, initiated locally or accepted from the peer.
    pub fn on_close(&mut self) -> EncodingResult<()> {
        self.expect(ChannelState::Connected)?;
        self.transition(ChannelState::Disconnecting);
        Ok(())
    }

    /// The transport's close has completed. Delivers `Disconnected` (§7).
    pub fn on_transport_closed(&mut self) -> EncodingResult<SecureChannelEvent> {
        self.expect(ChannelState::Disconnecting)?;
        self.transition(ChannelState::Disconnected);
        Ok(SecureChannelEvent::Disconnected)
    }

    /// `FatalCryptoError` (signature, replay or padding failure): valid
    /// from any non-terminal state (§4.5 "any"). Idempotent once the
    /// channel has already reached a terminal state — returns `None` rather
    /// than re-delivering `UnexpectedError` (§7) for a state that's already
    /// been reported.
    pub fn on_fatal_crypto_error(&mut self, reason: &str) -> Option<SecureChannelEvent> {
        if self.state.is_terminal() {
            return None;
        }
        error!("fatal crypto error on secure channel, aborting: {reason}");
        self.transition(ChannelState::Error);
        Some(SecureChannelEvent::UnexpectedError(Error::new(StatusCode::BadSecurityChecksFailed, reason)))
    }

    /// `true` once connected and no longer accepting new sends/receives.
    pub fn is_open_for_traffic(&self) -> bool {
        self.state == ChannelState::Connected
    }
}

impl Default for SecureChannelState {
    fn default() -> Self {
        SecureChannelState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_handshake_and_teardown() {
        let mut s = SecureChannelState::new();
        assert_eq!(s.state(), ChannelState::ConnectingTransport);

        s.on_transport_connected().unwrap();
        assert_eq!(s.state(), ChannelState::ConnectingSecure);

        assert!(matches!(s.on_open_response_valid().unwrap(), SecureChannelEvent::Connected));
        assert_eq!(s.state(), ChannelState::Connected);
        assert!(s.is_open_for_traffic());

        s.on_renewed().unwrap();
        assert_eq!(s.state(), ChannelState::Connected);

        s.on_close().unwrap();
        assert_eq!(s.state(), ChannelState::Disconnecting);

        assert!(matches!(s.on_transport_closed().unwrap(), SecureChannelEvent::Disconnected));
        assert_eq!(s.state(), ChannelState::Disconnected);
    }

    #[test]
    fn invalid_open_response_goes_to_error() {
        let mut s = SecureChannelState::new();
        s.on_transport_connected().unwrap();
        let event = s.on_open_response_invalid("bad signature").unwrap();
        assert_eq!(s.state(), ChannelState::Error);
        match event {
            SecureChannelEvent::ConnectionFailed(e) => assert!(e.message().contains("bad signature")),
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }

    #[test]
    fn fatal_crypto_error_is_reachable_from_any_state_and_idempotent() {
        let mut s = SecureChannelState::new();
        assert!(matches!(
            s.on_fatal_crypto_error("replay detected"),
            Some(SecureChannelEvent::UnexpectedError(_))
        ));
        assert_eq!(s.state(), ChannelState::Error);
        // already terminal - a second call must not panic, re-transition, or re-deliver the event
        assert!(s.on_fatal_crypto_error("replay detected again").is_none());
        assert_eq!(s.state(), ChannelState::Error);
    }

    #[test]
    fn renew_is_rejected_outside_connected() {
        let mut s = SecureChannelState::new();
        assert!(s.on_renewed().is_err());
    }

    #[test]
    fn close_requires_connected_state() {
        let mut s = SecureChannelState::new();
        assert!(s.on_close().is_err());
    }
}
