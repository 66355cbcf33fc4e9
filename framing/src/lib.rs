//! Message Framer (§4.1): turns a byte stream into discrete frames and
//! back. The framer has no knowledge of cipher state, it does not
//! distinguish a handshake frame from a session frame, it only knows two
//! wire shapes:
//!
//! * a handshake frame: `{ len: u16, type: u8, payload }`, `len` counting the
//!   three header bytes plus `payload`.
//! * a session frame: `{ len: u32, ciphertext, tag: [u8; 16] }`, `len`
//!   counting `ciphertext` plus the trailing GCM tag.
//!
//! Raw-mode bulk transfer (§4.3/§4.5) bypasses this module entirely:
//! once a connection is in `ReceiveRaw` it reads arbitrary byte counts
//! straight off the socket, so there is no frame shape to parse.

use std::io::{self, Read, Write};

use safecloud_crypto::GCM_TAG_LEN;
use thiserror::Error;

pub const HANDSHAKE_HEADER_LEN: usize = 3;
pub const SESSION_HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("declared frame length {0} is invalid")]
    InvalidLength(u32),
    #[error("peer disconnected mid-frame")]
    PeerDisconnected,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A decoded handshake-phase frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeFrame {
    pub msg_type: u8,
    pub payload: Vec<u8>,
}

/// A decoded session-phase frame: the caller still owns GCM decryption, the
/// framer only strips the outer length prefix and the trailing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFrameWire {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; GCM_TAG_LEN],
}

fn read_exact_or_disconnected<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FramingError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::PeerDisconnected),
        Err(e) => Err(FramingError::Io(e)),
    }
}

/// Reads one handshake frame. `max_len` bounds the declared length against
/// the caller's buffer capacity (the `ERR_MSG_LENGTH_INVALID` error).
pub fn read_handshake_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<HandshakeFrame, FramingError> {
    let mut header = [0u8; HANDSHAKE_HEADER_LEN];
    read_exact_or_disconnected(reader, &mut header)?;

    let declared_len = u16::from_le_bytes([header[0], header[1]]) as usize;
    let msg_type = header[2];

    if declared_len < HANDSHAKE_HEADER_LEN || declared_len > max_len {
        return Err(FramingError::InvalidLength(declared_len as u32));
    }

    let mut payload = vec![0u8; declared_len - HANDSHAKE_HEADER_LEN];
    read_exact_or_disconnected(reader, &mut payload)?;
    Ok(HandshakeFrame { msg_type, payload })
}

pub fn write_handshake_frame<W: Write>(writer: &mut W, msg_type: u8, payload: &[u8]) -> Result<(), FramingError> {
    let declared_len = HANDSHAKE_HEADER_LEN + payload.len();
    let len_u16 = u16::try_from(declared_len).map_err(|_| FramingError::InvalidLength(declared_len as u32))?;

    let mut header = [0u8; HANDSHAKE_HEADER_LEN];
    header[0..2].copy_from_slice(&len_u16.to_le_bytes());
    header[2] = msg_type;

    writer.write_all(&header)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads one session frame. The outer `len` prefix is treated as additional
/// authenticated data by the session layer (it is never itself encrypted),
/// so the framer hands the caller the raw ciphertext and tag and lets
/// `safecloud-session` drive GCM verification.
pub fn read_session_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<SessionFrameWire, FramingError> {
    let mut len_buf = [0u8; SESSION_HEADER_LEN];
    read_exact_or_disconnected(reader, &mut len_buf)?;
    let declared_len = u32::from_le_bytes(len_buf) as usize;

    if declared_len < GCM_TAG_LEN || declared_len > max_len {
        return Err(FramingError::InvalidLength(declared_len as u32));
    }

    let mut body = vec![0u8; declared_len];
    read_exact_or_disconnected(reader, &mut body)?;

    let tag_start = declared_len - GCM_TAG_LEN;
    let mut tag = [0u8; GCM_TAG_LEN];
    tag.copy_from_slice(&body[tag_start..]);
    body.truncate(tag_start);

    Ok(SessionFrameWire { ciphertext: body, tag })
}

pub fn write_session_frame<W: Write>(writer: &mut W, ciphertext: &[u8], tag: &[u8; GCM_TAG_LEN]) -> Result<(), FramingError> {
    let declared_len = ciphertext.len() + GCM_TAG_LEN;
    let len_u32 = u32::try_from(declared_len).map_err(|_| FramingError::InvalidLength(declared_len as u32))?;

    writer.write_all(&len_u32.to_le_bytes())?;
    writer.write_all(ciphertext)?;
    writer.write_all(tag)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn handshake_frame_round_trip() {
        let mut buf = Vec::new();
        write_handshake_frame(&mut buf, 0x01, b"hello").unwrap();

        let mut cursor = Cursor::new(buf);
        let frame = read_handshake_frame(&mut cursor, 4096).unwrap();
        assert_eq!(frame.msg_type, 0x01);
        assert_eq!(frame.payload, b"hello");
    }

    #[test]
    fn handshake_frame_rejects_oversized_declared_length() {
        let mut buf = Vec::new();
        write_handshake_frame(&mut buf, 0x01, b"hello").unwrap();

        let mut cursor = Cursor::new(buf);
        let err = read_handshake_frame(&mut cursor, 4).unwrap_err();
        assert!(matches!(err, FramingError::InvalidLength(_)));
    }

    #[test]
    fn handshake_frame_detects_truncated_stream() {
        let mut buf = Vec::new();
        write_handshake_frame(&mut buf, 0x01, b"hello").unwrap();
        buf.truncate(buf.len() - 2);

        let mut cursor = Cursor::new(buf);
        let err = read_handshake_frame(&mut cursor, 4096).unwrap_err();
        assert!(matches!(err, FramingError::PeerDisconnected));
    }

    #[test]
    fn session_frame_round_trip() {
        let ciphertext = b"some-ciphertext-bytes".to_vec();
        let tag = [7u8; GCM_TAG_LEN];

        let mut buf = Vec::new();
        write_session_frame(&mut buf, &ciphertext, &tag).unwrap();

        let mut cursor = Cursor::new(buf);
        let frame = read_session_frame(&mut cursor, 4096).unwrap();
        assert_eq!(frame.ciphertext, ciphertext);
        assert_eq!(frame.tag, tag);
    }

    #[test]
    fn session_frame_rejects_length_shorter_than_tag() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(4u32).to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);

        let mut cursor = Cursor::new(buf);
        let err = read_session_frame(&mut cursor, 4096).unwrap_err();
        assert!(matches!(err, FramingError::InvalidLength(_)));
    }
}
