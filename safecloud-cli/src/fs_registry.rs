//! Filesystem-backed `UserRegistry` (§6 "Persisted state": "per-user
//! public-key file `<pubkeys>/<name>.pem`").

use std::error::Error;
use std::path::PathBuf;

use log::log;

use safecloud_crypto::RsaVerifyingKey;
use safecloud_handshake::UserRegistry;

pub struct FsUserRegistry {
    pubkeys_dir: PathBuf,
}

impl FsUserRegistry {
    pub fn new(pubkeys_dir: PathBuf) -> Self {
        Self { pubkeys_dir }
    }
}

impl UserRegistry for FsUserRegistry {
    /// `name` has already passed `sanitize_client_name`, so joining it onto
    /// `pubkeys_dir` cannot escape the directory.
    fn lookup_public_key(&self, sanitized_name: &str) -> Result<Option<RsaVerifyingKey>, Box<dyn Error + Send + Sync>> {
        let path = self.pubkeys_dir.join(format!("{sanitized_name}.pem"));
        match std::fs::read(&path) {
            Ok(pem) => Ok(Some(RsaVerifyingKey::from_pem(&pem)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                log!(log::Level::Error, "reading public-key file {}: {}", path.display(), e);
                Err(Box::new(e))
            }
        }
    }
}
