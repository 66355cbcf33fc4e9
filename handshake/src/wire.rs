//! STSM wire messages (§4.2, §6). All multi-byte integers little-endian.
//! PEM blobs (the DH public key, the server certificate) are length-prefixed
//! with a `u16` rather than treated as a fixed-size array: the exact PEM
//! length is a function of the ASN.1/base64 encoder, not a protocol
//! invariant, so a literal `[u8; L_DH]` would be brittle across OpenSSL
//! versions.

use crate::error::HandshakeError;

pub const PROOF_LEN: usize = 272;
pub const CLI_AUTH_NAME_CAPACITY: usize = 31; // 30 chars + NUL
pub const MAX_HANDSHAKE_FRAME_LEN: usize = 16 * 1024;

pub mod msg_type {
    pub const CLIENT_HELLO: u8 = 1;
    pub const SRV_AUTH: u8 = 2;
    pub const CLI_AUTH: u8 = 3;
    pub const SRV_OK: u8 = 4;
}

/// The closed vocabulary of one-byte handshake error types (§4.2).
pub mod err_type {
    pub const INVALID_PUBKEY: u8 = 10;
    pub const SRV_CERT_REJECTED: u8 = 11;
    pub const SRV_AUTH_FAILED: u8 = 12;
    pub const CLI_AUTH_FAILED: u8 = 13;
    pub const CLIENT_LOGIN_FAILED: u8 = 14;
    pub const UNEXPECTED_MESSAGE: u8 = 15;
    pub const MALFORMED_MESSAGE: u8 = 16;
    pub const UNKNOWN_MSG_TYPE: u8 = 17;
}

pub fn is_error_type(t: u8) -> bool {
    matches!(t, err_type::INVALID_PUBKEY..=err_type::UNKNOWN_MSG_TYPE)
}

pub fn is_known_msg_type(t: u8) -> bool {
    matches!(t, msg_type::CLIENT_HELLO | msg_type::SRV_AUTH | msg_type::CLI_AUTH | msg_type::SRV_OK)
}

/// Classifies a frame whose type didn't match what the state machine was
/// waiting for: a peer-reported error (already closing, no courtesy reply
/// needed), an out-of-order message of a known type, or a type the
/// vocabulary doesn't define at all.
pub fn classify_unexpected(got: u8) -> HandshakeError {
    if is_error_type(got) {
        HandshakeError::PeerReported(got)
    } else if is_known_msg_type(got) {
        HandshakeError::UnexpectedMessage
    } else {
        HandshakeError::UnknownMsgType(got)
    }
}

fn read_len_prefixed(buf: &[u8], offset: &mut usize) -> Result<Vec<u8>, HandshakeError> {
    if buf.len() < *offset + 2 {
        return Err(HandshakeError::MalformedMessage);
    }
    let len = u16::from_le_bytes([buf[*offset], buf[*offset + 1]]) as usize;
    *offset += 2;
    if buf.len() < *offset + len {
        return Err(HandshakeError::MalformedMessage);
    }
    let out = buf[*offset..*offset + len].to_vec();
    *offset += len;
    Ok(out)
}

fn write_len_prefixed(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), HandshakeError> {
    let len = u16::try_from(data.len()).map_err(|_| HandshakeError::MalformedMessage)?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(data);
    Ok(())
}

pub struct ClientHello {
    pub yc_pem: Vec<u8>,
    pub iv_seed: [u8; 16],
}

pub fn encode_client_hello(yc_pem: &[u8], iv_seed: &[u8; 16]) -> Result<Vec<u8>, HandshakeError> {
    let mut buf = Vec::with_capacity(2 + yc_pem.len() + 16);
    write_len_prefixed(&mut buf, yc_pem)?;
    buf.extend_from_slice(iv_seed);
    Ok(buf)
}

pub fn decode_client_hello(payload: &[u8]) -> Result<ClientHello, HandshakeError> {
    let mut offset = 0;
    let yc_pem = read_len_prefixed(payload, &mut offset)?;
    if payload.len() != offset + 16 {
        return Err(HandshakeError::MalformedMessage);
    }
    let mut iv_seed = [0u8; 16];
    iv_seed.copy_from_slice(&payload[offset..offset + 16]);
    Ok(ClientHello { yc_pem, iv_seed })
}

pub struct SrvAuth {
    pub ys_pem: Vec<u8>,
    pub srv_proof: [u8; PROOF_LEN],
    pub cert_pem: Vec<u8>,
}

pub fn encode_srv_auth(ys_pem: &[u8], srv_proof: &[u8; PROOF_LEN], cert_pem: &[u8]) -> Result<Vec<u8>, HandshakeError> {
    let mut buf = Vec::with_capacity(2 + ys_pem.len() + PROOF_LEN + 2 + cert_pem.len());
    write_len_prefixed(&mut buf, ys_pem)?;
    buf.extend_from_slice(srv_proof);
    write_len_prefixed(&mut buf, cert_pem)?;
    Ok(buf)
}

pub fn decode_srv_auth(payload: &[u8]) -> Result<SrvAuth, HandshakeError> {
    let mut offset = 0;
    let ys_pem = read_len_prefixed(payload, &mut offset)?;
    if payload.len() < offset + PROOF_LEN {
        return Err(HandshakeError::MalformedMessage);
    }
    let mut srv_proof = [0u8; PROOF_LEN];
    srv_proof.copy_from_slice(&payload[offset..offset + PROOF_LEN]);
    offset += PROOF_LEN;
    let cert_pem = read_len_prefixed(payload, &mut offset)?;
    if offset != payload.len() {
        return Err(HandshakeError::MalformedMessage);
    }
    Ok(SrvAuth { ys_pem, srv_proof, cert_pem })
}

pub struct CliAuth {
    pub name: String,
    pub proof: [u8; PROOF_LEN],
}

pub fn encode_cli_auth(name: &str, proof: &[u8; PROOF_LEN]) -> Result<Vec<u8>, HandshakeError> {
    if name.is_empty() || name.len() > CLI_AUTH_NAME_CAPACITY - 1 || !name.is_ascii() {
        return Err(HandshakeError::MalformedMessage);
    }
    let mut buf = Vec::with_capacity(CLI_AUTH_NAME_CAPACITY + PROOF_LEN);
    let mut name_field = [0u8; CLI_AUTH_NAME_CAPACITY];
    name_field[..name.len()].copy_from_slice(name.as_bytes());
    buf.extend_from_slice(&name_field);
    buf.extend_from_slice(proof);
    Ok(buf)
}

pub fn decode_cli_auth(payload: &[u8]) -> Result<CliAuth, HandshakeError> {
    if payload.len() != CLI_AUTH_NAME_CAPACITY + PROOF_LEN {
        return Err(HandshakeError::MalformedMessage);
    }
    let name_field = &payload[..CLI_AUTH_NAME_CAPACITY];
    let nul_at = name_field.iter().position(|&b| b == 0).unwrap_or(CLI_AUTH_NAME_CAPACITY);
    let name = std::str::from_utf8(&name_field[..nul_at])
        .map_err(|_| HandshakeError::MalformedMessage)?
        .to_string();

    let mut proof = [0u8; PROOF_LEN];
    proof.copy_from_slice(&payload[CLI_AUTH_NAME_CAPACITY..]);
    Ok(CliAuth { name, proof })
}

pub fn decode_srv_ok(payload: &[u8]) -> Result<(), HandshakeError> {
    if !payload.is_empty() {
        return Err(HandshakeError::MalformedMessage);
    }
    Ok(())
}
