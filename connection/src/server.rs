//! Drives one accepted socket from KeyExchange through Session to Closing
//! (§4.5). Owns the state transition; `safecloud-handshake` and
//! `safecloud-session` stay pure state machines that only ever see the
//! stream they're handed.

use std::io::{Read, Write};
use std::sync::Arc;

use safecloud_crypto::{log_severity, Severity};
use safecloud_handshake::{ServerHandshake, UserRegistry};
use safecloud_session::ServerSession;

use crate::error::ConnectionError;
use crate::guest::GuestNames;
use crate::pool_factory::StoragePoolFactory;
use crate::state::ConnectionState;

pub struct ServerConnection {
    handshake: ServerHandshake,
    pool_factory: Arc<dyn StoragePoolFactory>,
    state: ConnectionState,
}

/// The outcome of one connection's lifetime, for the accept loop's log
/// line and exit bookkeeping.
pub struct ServerConnectionOutcome {
    pub client_name: String,
    pub closed_cleanly: bool,
}

impl ServerConnection {
    pub fn new(
        signing_key: Arc<safecloud_crypto::RsaSigningKey>,
        cert_pem: Arc<Vec<u8>>,
        registry: Arc<dyn UserRegistry>,
        pool_factory: Arc<dyn StoragePoolFactory>,
    ) -> Self {
        Self {
            handshake: ServerHandshake::new(signing_key, cert_pem, registry),
            pool_factory,
            state: ConnectionState::KeyExchange,
        }
    }

    /// Runs the whole connection lifetime to completion. `guest_names`
    /// supplies the pre-authentication display name used only in log
    /// lines emitted before the handshake names the peer.
    pub fn run<S: Read + Write>(
        mut self,
        stream: &mut S,
        guest_names: &GuestNames,
    ) -> Result<ServerConnectionOutcome, ConnectionError> {
        let guest_name = guest_names.next_name();
        log_severity!(Severity::Info, "{} connecting", guest_name);

        let outcome = match self.handshake.run(stream) {
            Ok(o) => o,
            Err(e) => {
                self.state = self.state.advance(ConnectionState::Closing);
                log_severity!(Severity::Error, "{} handshake failed: {}", guest_name, e);
                return Err(e.into());
            }
        };
        self.state = self.state.advance(ConnectionState::Session);
        log_severity!(Severity::Info, "\"{}\" authenticated", outcome.client_name);

        let pool = self.pool_factory.pool_for(&outcome.client_name).map_err(|e| {
            ConnectionError::StoragePoolUnavailable(outcome.client_name.clone(), e.to_string())
        })?;

        let mut session = ServerSession::new(
            safecloud_session::SessionCipher::new(outcome.session_key, outcome.nonce_counter),
            pool,
            outcome.client_name.clone(),
        );
        let result = session.serve(stream);
        self.state = self.state.advance(ConnectionState::Closing);

        match result {
            Ok(()) => {
                log_severity!(Severity::Info, "\"{}\" disconnected cleanly", outcome.client_name);
                Ok(ServerConnectionOutcome { client_name: outcome.client_name, closed_cleanly: true })
            }
            Err(e) => {
                log_severity!(Severity::Error, "\"{}\" session closed: {}", outcome.client_name, e);
                Err(e.into())
            }
        }
    }
}
