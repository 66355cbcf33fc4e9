//! Drives the client side of one connection from KeyExchange into Session,
//! then hands the caller a live [`ClientSession`] to issue individual
//! file-operation commands against (the CLI drives those interactively,
//! one user command at a time, rather than in a fixed loop).

use std::io::{Read, Write};
use std::sync::Arc;

use safecloud_crypto::{RsaSigningKey, TrustStore};
use safecloud_handshake::ClientHandshake;
use safecloud_session::ClientSession;

use crate::error::ConnectionError;
use crate::state::ConnectionState;

pub struct ClientConnection {
    handshake: ClientHandshake,
    state: ConnectionState,
}

impl ClientConnection {
    pub fn new(username: &str, signing_key: Arc<RsaSigningKey>, trust_store: Arc<TrustStore>) -> Result<Self, ConnectionError> {
        let handshake = ClientHandshake::new(username, signing_key, trust_store)?;
        Ok(Self { handshake, state: ConnectionState::KeyExchange })
    }

    /// Runs the handshake to completion and returns a session ready to
    /// issue commands. Consumes `self`: once Session begins there is no way
    /// back to KeyExchange on this connection.
    pub fn establish<S: Read + Write>(mut self, stream: &mut S) -> Result<ClientSession, ConnectionError> {
        let outcome = self.handshake.run(stream)?;
        self.state = self.state.advance(ConnectionState::Session);
        Ok(ClientSession::new(outcome.session_key, outcome.nonce_counter))
    }
}
