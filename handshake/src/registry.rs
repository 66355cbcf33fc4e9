//! The narrow external-collaborator interface for "user registry file
//! loading" (§1 out-of-scope list, §4.2 client identity handling).
//! `safecloud-cli` supplies the filesystem-backed implementation; the
//! handshake crate never reads a file itself.

use std::error::Error;

use safecloud_crypto::RsaVerifyingKey;

pub trait UserRegistry: Send + Sync {
    /// Looks up the long-term RSA public key for an already-sanitized
    /// client name. `Ok(None)` means no such user; any other failure
    /// (unreadable/corrupt key file) is `Err` and the server logs it at
    /// critical severity, but both cases are reported to the peer the same
    /// way (`CLIENT_LOGIN_FAILED`), per §4.2's anti-enumeration rule.
    fn lookup_public_key(&self, sanitized_name: &str) -> Result<Option<RsaVerifyingKey>, Box<dyn Error + Send + Sync>>;
}
