//! The 16-byte IV seed the client generates in `CLIENT_HELLO` (§4.2, §9
//! open question: a single random value, viewed two ways, as the one-shot
//! CBC IV for the handshake proofs and, via its first 12 bytes, as the
//! initial GCM nonce for the session phase).

use rand::RngCore;

use crate::cbc::CBC_IV_LEN;
use crate::gcm::GCM_NONCE_LEN;

pub struct IvSeed([u8; CBC_IV_LEN]);

impl IvSeed {
    pub fn generate() -> Self {
        let mut bytes = [0u8; CBC_IV_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; CBC_IV_LEN]) -> Self {
        Self(bytes)
    }

    pub fn cbc_iv(&self) -> [u8; CBC_IV_LEN] {
        self.0
    }

    pub fn gcm_nonce_prefix(&self) -> [u8; GCM_NONCE_LEN] {
        let mut nonce = [0u8; GCM_NONCE_LEN];
        nonce.copy_from_slice(&self.0[..GCM_NONCE_LEN]);
        nonce
    }

    pub fn as_bytes(&self) -> &[u8; CBC_IV_LEN] {
        &self.0
    }
}
