use thiserror::Error;

use safecloud_handshake::HandshakeError;
use safecloud_session::SessionError;

/// A connection-lifetime failure, from either phase. The connection layer
/// itself adds only the storage-pool lookup that happens between them.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("storage pool unavailable for \"{0}\": {1}")]
    StoragePoolUnavailable(String, String),
}
