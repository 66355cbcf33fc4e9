//! The narrow external-collaborator interface for "on-disk storage-pool
//! management" (§1 out-of-scope list). `safecloud-cli` supplies the
//! filesystem-backed implementation; this crate never touches a real path.

use std::error::Error;
use std::io::{Read, Write};

use crate::wire::FileMetadata;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// A single user's storage pool (§3 "Storage pool"): stat/list/delete/
/// rename of already-stored files, plus the two streaming entry points for
/// raw-mode transfer.
pub trait StoragePool: Send + Sync {
    fn stat(&self, name: &str) -> Result<Option<FileMetadata>, BoxError>;
    fn list(&self) -> Result<Vec<FileMetadata>, BoxError>;
    fn delete(&self, name: &str) -> Result<(), BoxError>;
    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), BoxError>;

    /// Opens a temp-file sink for an in-flight upload. The sink is
    /// committed (atomic rename + mtime stamp) only after the raw stream's
    /// GCM tag verifies; on any failure it is discarded (§4.3 Upload).
    fn begin_upload(&self, name: &str) -> Result<Box<dyn UploadSink>, BoxError>;

    /// Opens an existing file in the pool for a download's raw-mode send.
    fn open_for_read(&self, name: &str) -> Result<Box<dyn Read + Send>, BoxError>;
}

pub trait UploadSink: Write + Send {
    /// Renames the temp file into the pool and stamps `mtime`, consuming
    /// the sink.
    fn commit(self: Box<Self>, mtime: u64) -> Result<(), BoxError>;

    /// Deletes the temp file without touching the pool, consuming the sink.
    fn discard(self: Box<Self>);
}
