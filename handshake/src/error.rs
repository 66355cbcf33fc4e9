use thiserror::Error;

use safecloud_crypto::CryptoError;
use safecloud_framing::FramingError;

use crate::wire::err_type;

/// The closed vocabulary of §4.2 plus the internal variants that never have
/// a wire form (a crypto-library failure or a transport failure means the
/// connection is already unusable, so nothing is sent for those).
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("peer supplied an invalid ephemeral public key")]
    InvalidPubkey,
    #[error("server certificate rejected: {0}")]
    ServerCertRejected(String),
    #[error("server authentication proof failed verification")]
    ServerAuthFailed,
    #[error("client authentication proof failed verification")]
    ClientAuthFailed,
    #[error("client login failed")]
    ClientLoginFailed,
    #[error("unexpected message for the current handshake state")]
    UnexpectedMessage,
    #[error("malformed handshake message")]
    MalformedMessage,
    #[error("unknown handshake message type {0}")]
    UnknownMsgType(u8),
    #[error("peer reported handshake error type {0}")]
    PeerReported(u8),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Framing(#[from] FramingError),
}

impl HandshakeError {
    /// The one-byte error type a sender transmits as a courtesy before
    /// closing. `None` for variants with no wire representation.
    pub fn wire_code(&self) -> Option<u8> {
        match self {
            HandshakeError::InvalidPubkey => Some(err_type::INVALID_PUBKEY),
            HandshakeError::ServerCertRejected(_) => Some(err_type::SRV_CERT_REJECTED),
            HandshakeError::ServerAuthFailed => Some(err_type::SRV_AUTH_FAILED),
            HandshakeError::ClientAuthFailed => Some(err_type::CLI_AUTH_FAILED),
            HandshakeError::ClientLoginFailed => Some(err_type::CLIENT_LOGIN_FAILED),
            HandshakeError::UnexpectedMessage => Some(err_type::UNEXPECTED_MESSAGE),
            HandshakeError::MalformedMessage => Some(err_type::MALFORMED_MESSAGE),
            HandshakeError::UnknownMsgType(_) => Some(err_type::UNKNOWN_MSG_TYPE),
            HandshakeError::PeerReported(_) | HandshakeError::Crypto(_) | HandshakeError::Framing(_) => None,
        }
    }
}
