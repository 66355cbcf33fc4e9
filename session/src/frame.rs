//! The AEAD session frame wrapper (§4.3) plus the nonce bookkeeping that
//! ties every sent/received frame, control or raw-mode stream, to the
//! single counter both peers advance in lockstep (§4.4).

use std::io::{Read, Write};

use safecloud_crypto::{decrypt_frame, encrypt_frame, NonceCounter, SessionKey};
use safecloud_framing::{read_session_frame, write_session_frame};

use crate::error::SessionError;
use crate::raw::{recv_raw, send_raw};

pub const MAX_SESSION_FRAME_LEN: usize = 8 * 1024 * 1024;

pub struct SessionCipher {
    key: SessionKey,
    nonce: NonceCounter,
}

impl SessionCipher {
    pub fn new(key: SessionKey, nonce: NonceCounter) -> Self {
        Self { key, nonce }
    }

    /// Encrypts and sends one control message. `msg_type` is the first byte
    /// of the GCM plaintext, not a separate AAD-covered field (§6's literal
    /// wire layout: `{ session_msg_type, type-specific fields }` is exactly
    /// what gets encrypted).
    pub fn send_message<W: Write>(&mut self, writer: &mut W, msg_type: u8, body: &[u8]) -> Result<(), SessionError> {
        let mut plaintext = Vec::with_capacity(1 + body.len());
        plaintext.push(msg_type);
        plaintext.extend_from_slice(body);

        let nonce = self.nonce.current();
        let (ciphertext, tag) = encrypt_frame(&self.key, &nonce, &[], &plaintext)?;
        write_session_frame(writer, &ciphertext, &tag)?;
        self.nonce.advance()?;
        Ok(())
    }

    /// Receives and decrypts one control message, returning its type byte
    /// and remaining fields.
    pub fn recv_message<R: Read>(&mut self, reader: &mut R) -> Result<(u8, Vec<u8>), SessionError> {
        let wire = read_session_frame(reader, MAX_SESSION_FRAME_LEN)?;
        let nonce = self.nonce.current();
        let plaintext = decrypt_frame(&self.key, &nonce, &[], &wire.ciphertext, &wire.tag)
            .map_err(|_| SessionError::TagVerificationFailed)?;
        self.nonce.advance()?;

        if plaintext.is_empty() {
            return Err(SessionError::MalformedMessage);
        }
        Ok((plaintext[0], plaintext[1..].to_vec()))
    }

    /// Drives one raw-mode transfer out, consuming exactly one nonce value
    /// for the whole stream (its single tag counts as one frame, §4.4).
    pub fn send_raw_stream<W, R>(&mut self, sink: &mut W, source: &mut R, size: u64) -> Result<(), SessionError>
    where
        W: Write + ?Sized,
        R: Read + ?Sized,
    {
        let nonce = self.nonce.current();
        send_raw(source, sink, &self.key, nonce, size)?;
        self.nonce.advance()?;
        Ok(())
    }

    pub fn recv_raw_stream<R, W>(&mut self, source: &mut R, sink: &mut W, size: u64) -> Result<(), SessionError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let nonce = self.nonce.current();
        recv_raw(source, sink, &self.key, nonce, size)?;
        self.nonce.advance()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safecloud_crypto::GCM_NONCE_LEN;
    use std::io::Cursor;

    fn cipher_pair() -> (SessionCipher, SessionCipher) {
        let key = SessionKey::new([4u8; 16]);
        let nonce = NonceCounter::from_initial([0u8; GCM_NONCE_LEN]);
        (SessionCipher::new(key.clone(), nonce.clone()), SessionCipher::new(key, nonce))
    }

    #[test]
    fn control_message_round_trip_and_nonce_advances() {
        let (mut sender, mut receiver) = cipher_pair();
        let mut wire = Vec::new();
        sender.send_message(&mut wire, 7, b"payload").unwrap();

        let (msg_type, body) = receiver.recv_message(&mut Cursor::new(wire)).unwrap();
        assert_eq!(msg_type, 7);
        assert_eq!(body, b"payload");
        assert_eq!(sender.nonce.current(), receiver.nonce.current());
    }

    #[test]
    fn raw_stream_round_trip_consumes_one_nonce_step() {
        let (mut sender, mut receiver) = cipher_pair();
        let before = sender.nonce.current();

        let plaintext = vec![0x77u8; 200_000];
        let mut wire = Vec::new();
        sender.send_raw_stream(&mut wire, &mut Cursor::new(plaintext.clone()), plaintext.len() as u64).unwrap();

        let mut recovered = Vec::new();
        receiver.recv_raw_stream(&mut Cursor::new(wire), &mut recovered, plaintext.len() as u64).unwrap();

        assert_eq!(recovered, plaintext);
        assert_eq!(sender.nonce.current(), receiver.nonce.current());
        assert_ne!(before, sender.nonce.current());
    }
}
