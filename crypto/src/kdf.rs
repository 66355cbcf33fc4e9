//! K derivation: K = first 16 bytes of SHA-256(DH_shared) (§4.2).

use openssl::hash::{hash, MessageDigest};
use zeroize::Zeroizing;

use crate::error::CryptoError;

pub const SESSION_KEY_LEN: usize = 16;

pub fn derive_session_key(dh_shared: &[u8]) -> Result<Zeroizing<[u8; SESSION_KEY_LEN]>, CryptoError> {
    let digest = hash(MessageDigest::sha256(), dh_shared)?;
    let mut key = [0u8; SESSION_KEY_LEN];
    key.copy_from_slice(&digest[..SESSION_KEY_LEN]);
    Ok(Zeroizing::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let shared = b"some raw dh shared secret bytes";
        let k1 = derive_session_key(shared).unwrap();
        let k2 = derive_session_key(shared).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn different_inputs_differ() {
        let k1 = derive_session_key(b"aaaa").unwrap();
        let k2 = derive_session_key(b"bbbb").unwrap();
        assert_ne!(*k1, *k2);
    }
}
