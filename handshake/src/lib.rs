//! STSM Handshake Manager (§4.2): the four-message authenticated DH
//! key exchange that establishes a shared session key K and initial nonce
//! before any session frame may be exchanged.
//!
//! `safecloud-session`/`safecloud-connection` drive [`ClientHandshake::run`]
//! or [`ServerHandshake::run`] to completion, then hand the returned
//! [`HandshakeOutcome`]/[`ServerHandshakeOutcome`] to the session layer.

mod client;
mod error;
mod identity;
mod registry;
mod server;
mod wire;

pub use client::ClientHandshake;
pub use error::HandshakeError;
pub use identity::sanitize_client_name;
pub use registry::UserRegistry;
pub use server::ServerHandshake;
pub use wire::{err_type, msg_type, MAX_HANDSHAKE_FRAME_LEN};

use safecloud_crypto::{NonceCounter, SessionKey};

/// What the client side of the handshake hands to the session layer.
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub session_key: SessionKey,
    pub nonce_counter: NonceCounter,
}

/// What the server side hands to the session layer; it additionally learns
/// the client's sanitized identity, which becomes the connection's display
/// name and storage-pool selector.
#[derive(Debug)]
pub struct ServerHandshakeOutcome {
    pub session_key: SessionKey,
    pub nonce_counter: NonceCounter,
    pub client_name: String,
}
