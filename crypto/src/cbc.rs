//! The one-shot AES-128-CBC encryption used to protect the STSM
//! authentication proofs during the handshake (§4.2).

use openssl::symm::{Cipher, Crypter, Mode};

use crate::error::CryptoError;

pub const CBC_IV_LEN: usize = 16;
pub const AES128_KEY_LEN: usize = 16;

/// Encrypts `plaintext` under AES-128-CBC with PKCS#7 padding. A 256-byte
/// RSA signature encrypts to exactly 272 bytes (padding adds one full
/// 16-byte block since 256 is already block-aligned).
pub fn cbc_encrypt(key: &[u8; AES128_KEY_LEN], iv: &[u8; CBC_IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut crypter = Crypter::new(Cipher::aes_128_cbc(), Mode::Encrypt, key, Some(iv))?;
    let mut out = vec![0u8; plaintext.len() + Cipher::aes_128_cbc().block_size()];
    let mut count = crypter.update(plaintext, &mut out)?;
    count += crypter.finalize(&mut out[count..])?;
    out.truncate(count);
    Ok(out)
}

pub fn cbc_decrypt(key: &[u8; AES128_KEY_LEN], iv: &[u8; CBC_IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut crypter = Crypter::new(Cipher::aes_128_cbc(), Mode::Decrypt, key, Some(iv))?;
    let mut out = vec![0u8; ciphertext.len() + Cipher::aes_128_cbc().block_size()];
    let mut count = crypter.update(ciphertext, &mut out)?;
    count += crypter.finalize(&mut out[count..])?;
    out.truncate(count);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_272_byte_proof() {
        let key = [7u8; AES128_KEY_LEN];
        let iv = [9u8; CBC_IV_LEN];
        let signature = vec![0x42u8; 256];

        let ciphertext = cbc_encrypt(&key, &iv, &signature).unwrap();
        assert_eq!(ciphertext.len(), 272);

        let recovered = cbc_decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(recovered, signature);
    }
}
