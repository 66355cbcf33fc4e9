//! Thin zeroizing newtypes for the values §9 calls out by name: the
//! session key K and the current IV/nonce. Both are wiped on drop.

use std::fmt;
use std::ops::Deref;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::kdf::SESSION_KEY_LEN;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

// Redacted: the key bytes must never show up in a debug print or log.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionKey").field(&"<redacted>").finish()
    }
}

impl SessionKey {
    pub fn new(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl Deref for SessionKey {
    type Target = [u8; SESSION_KEY_LEN];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Wipes a transient plaintext buffer (e.g. a decrypted STSM authentication
/// value) before it goes out of scope.
pub fn zeroize_buffer(buf: &mut [u8]) {
    buf.zeroize();
}
