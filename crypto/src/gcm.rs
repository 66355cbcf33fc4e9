//! AES-128-GCM framing for the session phase (§4.3) and the streaming raw-mode
//! AEAD context used for bulk file transfer (§4.3 "raw mode invariants").
//!
//! A streaming context is created once per raw-mode transfer, fed plaintext
//! or ciphertext in buffer-sized chunks via repeated `update` calls, and
//! finalized exactly once to emit (encrypt) or verify (decrypt) the single
//! trailing 16-byte GCM tag, mirroring invariant (b)/(c)/(d) of §4.3.

use openssl::symm::{Cipher, Crypter, Mode};

use crate::error::CryptoError;

pub const GCM_NONCE_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;

fn gcm_cipher() -> Cipher {
    Cipher::aes_128_gcm()
}

/// A single-tag streaming AES-128-GCM encryption context.
pub struct GcmStreamEncryptor {
    crypter: Crypter,
}

impl GcmStreamEncryptor {
    pub fn new(key: &[u8; 16], nonce: &[u8; GCM_NONCE_LEN], aad: &[u8]) -> Result<Self, CryptoError> {
        let mut crypter = Crypter::new(gcm_cipher(), Mode::Encrypt, key, Some(nonce))?;
        crypter.aad_update(aad)?;
        Ok(Self { crypter })
    }

    /// Encrypts one chunk of plaintext, appending ciphertext to `out`.
    pub fn update(&mut self, plaintext: &[u8], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let mut buf = vec![0u8; plaintext.len() + gcm_cipher().block_size()];
        let n = self.crypter.update(plaintext, &mut buf)?;
        buf.truncate(n);
        out.extend_from_slice(&buf);
        Ok(())
    }

    /// Finalizes the stream, returning the 16-byte GCM tag. Consumes `self`:
    /// a streaming context is destroyed once its single tag is produced, per
    /// §4.3's raw-mode invariant (b).
    pub fn finish(mut self, out: &mut Vec<u8>) -> Result<[u8; GCM_TAG_LEN], CryptoError> {
        let mut buf = [0u8; 16];
        let n = self.crypter.finalize(&mut buf)?;
        out.extend_from_slice(&buf[..n]);
        let mut tag = [0u8; GCM_TAG_LEN];
        self.crypter.get_tag(&mut tag)?;
        Ok(tag)
    }
}

/// A single-tag streaming AES-128-GCM decryption context.
pub struct GcmStreamDecryptor {
    crypter: Crypter,
}

impl GcmStreamDecryptor {
    pub fn new(key: &[u8; 16], nonce: &[u8; GCM_NONCE_LEN], aad: &[u8]) -> Result<Self, CryptoError> {
        let mut crypter = Crypter::new(gcm_cipher(), Mode::Decrypt, key, Some(nonce))?;
        crypter.aad_update(aad)?;
        Ok(Self { crypter })
    }

    pub fn update(&mut self, ciphertext: &[u8], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let mut buf = vec![0u8; ciphertext.len() + gcm_cipher().block_size()];
        let n = self.crypter.update(ciphertext, &mut buf)?;
        buf.truncate(n);
        out.extend_from_slice(&buf);
        Ok(())
    }

    /// Sets the expected tag and finalizes. Returns
    /// [`CryptoError::TagVerificationFailed`] if the ciphertext (or any
    /// prior chunk) was tampered with, the only recoverable-looking outcome
    /// that the session layer must still treat as fatal (§4.4).
    pub fn finish(mut self, tag: &[u8; GCM_TAG_LEN], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        self.crypter.set_tag(tag)?;
        let mut buf = [0u8; 16];
        match self.crypter.finalize(&mut buf) {
            Ok(n) => {
                out.extend_from_slice(&buf[..n]);
                Ok(())
            }
            Err(_) => Err(CryptoError::TagVerificationFailed),
        }
    }
}

/// One-shot encryption of a single session control frame's plaintext body.
pub fn encrypt_frame(key: &[u8; 16], nonce: &[u8; GCM_NONCE_LEN], aad: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; GCM_TAG_LEN]), CryptoError> {
    let mut enc = GcmStreamEncryptor::new(key, nonce, aad)?;
    let mut ciphertext = Vec::with_capacity(plaintext.len());
    enc.update(plaintext, &mut ciphertext)?;
    let tag = enc.finish(&mut ciphertext)?;
    Ok((ciphertext, tag))
}

/// One-shot decryption of a single session control frame.
pub fn decrypt_frame(key: &[u8; 16], nonce: &[u8; GCM_NONCE_LEN], aad: &[u8], ciphertext: &[u8], tag: &[u8; GCM_TAG_LEN]) -> Result<Vec<u8>, CryptoError> {
    let mut dec = GcmStreamDecryptor::new(key, nonce, aad)?;
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    dec.update(ciphertext, &mut plaintext)?;
    dec.finish(tag, &mut plaintext)?;
    Ok(plaintext)
}
