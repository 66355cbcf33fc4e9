//! The single 96-bit nonce counter shared by both peers for the whole
//! session (§4.4). Advanced by exactly one after every session frame,
//! control or raw; wraparound is a fatal condition, not UB, since it would
//! mean reusing a GCM nonce under a fixed key.

use crate::error::CryptoError;
use crate::gcm::GCM_NONCE_LEN;

#[derive(Clone, Debug)]
pub struct NonceCounter {
    value: u128, // only the low 96 bits are ever meaningful
}

const MAX_96_BIT: u128 = (1u128 << 96) - 1;

impl NonceCounter {
    pub fn from_initial(initial: [u8; GCM_NONCE_LEN]) -> Self {
        let mut buf = [0u8; 16];
        buf[4..].copy_from_slice(&initial);
        Self { value: u128::from_be_bytes(buf) }
    }

    /// The current nonce value, to be used for the next frame.
    pub fn current(&self) -> [u8; GCM_NONCE_LEN] {
        let bytes = self.value.to_be_bytes();
        let mut nonce = [0u8; GCM_NONCE_LEN];
        nonce.copy_from_slice(&bytes[4..]);
        nonce
    }

    /// Advances the counter by one after a frame has been sent or received.
    /// Per invariant 4 of §3, both peers do this identically and in lockstep.
    pub fn advance(&mut self) -> Result<(), CryptoError> {
        if self.value >= MAX_96_BIT {
            return Err(CryptoError::NonceExhausted);
        }
        self.value += 1;
        Ok(())
    }
}
