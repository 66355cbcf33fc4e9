//! Raw-mode bulk transfer (§4.3 "raw mode invariants"): a single streaming
//! AEAD context carries exactly `size` plaintext bytes, chunked to bound
//! memory use, with one trailing 16-byte tag.

use std::io::{Read, Write};

use safecloud_crypto::{GcmStreamDecryptor, GcmStreamEncryptor, SessionKey, GCM_NONCE_LEN, GCM_TAG_LEN};

use crate::error::SessionError;

pub const RAW_CHUNK_SIZE: usize = 64 * 1024;

/// Encrypts exactly `size` bytes read from `source`, writing ciphertext
/// chunks and the trailing tag to `sink`. The AAD is empty: the session
/// message type that set raw mode up is itself part of the GCM plaintext
/// of the control frame that preceded this call, not of the raw stream.
pub fn send_raw<R, W>(source: &mut R, sink: &mut W, key: &SessionKey, nonce: [u8; GCM_NONCE_LEN], size: u64) -> Result<(), SessionError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut encryptor = GcmStreamEncryptor::new(key, &nonce, &[])?;
    let mut remaining = size;
    let mut buf = vec![0u8; RAW_CHUNK_SIZE];

    while remaining > 0 {
        let take = (buf.len() as u64).min(remaining) as usize;
        source.read_exact(&mut buf[..take])?;
        let mut ciphertext = Vec::with_capacity(take);
        encryptor.update(&buf[..take], &mut ciphertext)?;
        sink.write_all(&ciphertext)?;
        remaining -= take as u64;
    }

    let mut tail = Vec::new();
    let tag = encryptor.finish(&mut tail)?;
    sink.write_all(&tail)?;
    sink.write_all(&tag)?;
    Ok(())
}

/// Dual of [`send_raw`]: reads exactly `size` ciphertext bytes plus the
/// trailing tag from `source`, decrypting into `sink`. On tag-verification
/// failure the caller discards whatever partial data `sink` received
/// (§4.3's "temp file is deleted" path); this function does not
/// know whether `sink` is a temp file, so it only reports the failure.
pub fn recv_raw<R, W>(source: &mut R, sink: &mut W, key: &SessionKey, nonce: [u8; GCM_NONCE_LEN], size: u64) -> Result<(), SessionError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut decryptor = GcmStreamDecryptor::new(key, &nonce, &[])?;
    let mut remaining = size;
    let mut buf = vec![0u8; RAW_CHUNK_SIZE];

    while remaining > 0 {
        let take = (buf.len() as u64).min(remaining) as usize;
        source.read_exact(&mut buf[..take])?;
        let mut plaintext = Vec::with_capacity(take);
        decryptor.update(&buf[..take], &mut plaintext)?;
        sink.write_all(&plaintext)?;
        remaining -= take as u64;
    }

    let mut tag = [0u8; GCM_TAG_LEN];
    source.read_exact(&mut tag)?;
    let mut tail = Vec::new();
    decryptor
        .finish(&tag, &mut tail)
        .map_err(|_| SessionError::TagVerificationFailed)?;
    sink.write_all(&tail)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_across_multiple_chunks() {
        let key = SessionKey::new([9u8; 16]);
        let nonce = [1u8; GCM_NONCE_LEN];
        let plaintext = vec![0x5au8; RAW_CHUNK_SIZE * 2 + 37];

        let mut wire = Vec::new();
        send_raw(&mut Cursor::new(plaintext.clone()), &mut wire, &key, nonce, plaintext.len() as u64).unwrap();

        let mut recovered = Vec::new();
        recv_raw(&mut Cursor::new(wire), &mut recovered, &key, nonce, plaintext.len() as u64).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let key = SessionKey::new([9u8; 16]);
        let nonce = [1u8; GCM_NONCE_LEN];
        let plaintext = vec![0x11u8; 1000];

        let mut wire = Vec::new();
        send_raw(&mut Cursor::new(plaintext.clone()), &mut wire, &key, nonce, plaintext.len() as u64).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xff;

        let mut recovered = Vec::new();
        let err = recv_raw(&mut Cursor::new(wire), &mut recovered, &key, nonce, plaintext.len() as u64).unwrap_err();
        assert!(matches!(err, SessionError::TagVerificationFailed));
    }
}
