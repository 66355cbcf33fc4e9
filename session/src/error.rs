use thiserror::Error;

use safecloud_crypto::CryptoError;
use safecloud_framing::FramingError;

use crate::wire::err_type;

/// Session-phase failures (§7). `is_fatal` decides whether the caller
/// resets the current operation to Idle and keeps the connection, or
/// closes it outright.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unexpected session message for the current operation")]
    UnexpectedMessage,
    #[error("malformed session message")]
    MalformedMessage,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("unknown session message type {0}")]
    UnknownMsgType(u8),
    #[error("peer reported session error type {0}")]
    PeerReported(u8),
    #[error("AEAD tag verification failed")]
    TagVerificationFailed,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn wire_code(&self) -> Option<u8> {
        match self {
            SessionError::UnexpectedMessage => Some(err_type::ERR_UNEXPECTED_SESS_MESSAGE),
            SessionError::MalformedMessage => Some(err_type::ERR_MALFORMED_SESS_MESSAGE),
            SessionError::Internal(_) => Some(err_type::ERR_INTERNAL_ERROR),
            SessionError::UnknownMsgType(_) => Some(err_type::ERR_UNKNOWN_SESSMSG_TYPE),
            SessionError::PeerReported(_)
            | SessionError::TagVerificationFailed
            | SessionError::Crypto(_)
            | SessionError::Framing(_)
            | SessionError::Io(_) => None,
        }
    }

    /// Fatal errors close the connection (§7); everything else resets the
    /// current operation to Idle after the courtesy error frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::UnknownMsgType(_)
                | SessionError::PeerReported(_)
                | SessionError::TagVerificationFailed
                | SessionError::Crypto(_)
                | SessionError::Framing(_)
                | SessionError::Io(_)
        )
    }
}

/// Maps an external-collaborator failure (storage pool I/O) into the
/// uniform "internal" bucket: logged locally, reported to the peer as the
/// generic internal-error frame, per §7's anti-information-leak policy.
pub fn storage_err(e: Box<dyn std::error::Error + Send + Sync>) -> SessionError {
    SessionError::Internal(e.to_string())
}
