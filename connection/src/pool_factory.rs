//! Binds an authenticated client name to that client's storage pool. The
//! handshake only knows a sanitized name; the pool itself (directory
//! layout, temp-upload area) is an out-of-scope external collaborator
//! (§1), so `safecloud-cli` supplies this factory.

use std::error::Error;
use std::sync::Arc;

use safecloud_session::StoragePool;

pub trait StoragePoolFactory: Send + Sync {
    fn pool_for(&self, client_name: &str) -> Result<Arc<dyn StoragePool>, Box<dyn Error + Send + Sync>>;
}
