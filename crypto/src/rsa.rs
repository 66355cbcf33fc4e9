//! Long-term RSA-2048 signing keys, used to produce and verify the STSM
//! authentication proofs (RSA-PKCS1 over SHA-256).

use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::sign::{Signer, Verifier};

use crate::error::CryptoError;

/// RSA-2048 signatures produced by [`RsaSigningKey::sign`] are always this
/// many bytes; the STSM authentication proof's fixed 272-byte size depends
/// on it (256-byte signature, padded to 272 by one AES block under CBC).
pub const RSA_SIGNATURE_LEN: usize = 256;

pub struct RsaSigningKey {
    pkey: PKey<Private>,
}

pub struct RsaVerifyingKey {
    pkey: PKey<Public>,
}

impl RsaSigningKey {
    pub fn from_pem(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            pkey: PKey::private_key_from_pem(bytes)?,
        })
    }

    /// Signs `data` with RSA-PKCS1 SHA-256, producing the STSM authentication
    /// proof's pre-encryption signature.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.pkey)?;
        signer.update(data)?;
        let sig = signer.sign_to_vec()?;
        debug_assert_eq!(sig.len(), RSA_SIGNATURE_LEN);
        Ok(sig)
    }
}

impl RsaVerifyingKey {
    pub fn from_pem(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            pkey: PKey::public_key_from_pem(bytes)?,
        })
    }

    pub fn from_pkey(pkey: PKey<Public>) -> Self {
        Self { pkey }
    }

    /// Verifies an RSA-PKCS1 SHA-256 signature, returning
    /// [`CryptoError::SignatureInvalid`] on any mismatch (never leaking
    /// *why* the signature failed, per the uniform-failure-reporting
    /// requirement for authentication).
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let mut verifier = Verifier::new(MessageDigest::sha256(), &self.pkey)?;
        verifier.update(data)?;
        if verifier.verify(signature)? {
            Ok(())
        } else {
            Err(CryptoError::SignatureInvalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::rsa::Rsa;

    fn keypair_pems() -> (Vec<u8>, Vec<u8>) {
        let rsa = Rsa::generate(2048).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();
        (
            pkey.private_key_to_pem_pkcs8().unwrap(),
            pkey.public_key_to_pem().unwrap(),
        )
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let (priv_pem, pub_pem) = keypair_pems();
        let signer = RsaSigningKey::from_pem(&priv_pem).unwrap();
        let verifier = RsaVerifyingKey::from_pem(&pub_pem).unwrap();

        let msg = b"Yc||Ys authentication value";
        let sig = signer.sign(msg).unwrap();
        assert_eq!(sig.len(), RSA_SIGNATURE_LEN);
        verifier.verify(msg, &sig).unwrap();
    }

    #[test]
    fn tampered_message_fails_verification() {
        let (priv_pem, pub_pem) = keypair_pems();
        let signer = RsaSigningKey::from_pem(&priv_pem).unwrap();
        let verifier = RsaVerifyingKey::from_pem(&pub_pem).unwrap();

        let sig = signer.sign(b"original").unwrap();
        assert!(verifier.verify(b"tampered", &sig).is_err());
    }
}
