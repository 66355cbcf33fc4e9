//! Session phase of the SafeCloud secure channel core: the AEAD frame
//! wrapper, the five file-management operations, and the external-storage
//! collaborator trait `safecloud-cli` implements against the real
//! filesystem.

mod client;
mod error;
mod frame;
mod raw;
mod server;
mod storage;
mod validate;
mod wire;

pub use client::{ClientSession, Outcome};
pub use error::SessionError;
pub use frame::{SessionCipher, MAX_SESSION_FRAME_LEN};
pub use server::ServerSession;
pub use storage::{BoxError, StoragePool, UploadSink};
pub use validate::validate_filename;
pub use wire::{err_type, msg_type, FileMetadata, RenameRequest};
