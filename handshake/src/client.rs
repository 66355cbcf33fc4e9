//! Client side of the STSM handshake: `Init -> AwaitServerAuth ->
//! AwaitServerOk -> Done` (§3, §4.2).

use std::io::{Read, Write};
use std::sync::Arc;

use safecloud_crypto::{
    cbc_decrypt, cbc_encrypt, derive_session_key, log_severity, zeroize_buffer, EphemeralDhKey, IvSeed, NonceCounter,
    PeerDhPublicKey, RsaSigningKey, SessionKey, Severity, TrustStore,
};

use crate::error::HandshakeError;
use crate::identity::sanitize_client_name;
use crate::wire::{
    self, decode_srv_auth, decode_srv_ok, encode_cli_auth, encode_client_hello, msg_type, MAX_HANDSHAKE_FRAME_LEN,
};
use crate::HandshakeOutcome;
use safecloud_framing::{read_handshake_frame, write_handshake_frame};

/// Writes a courtesy error frame (if the error has a wire form) and returns
/// the error, matching §4.2/§7's "send typed error frame, then terminate".
fn abort<S: Write, T>(stream: &mut S, err: HandshakeError) -> Result<T, HandshakeError> {
    if let Some(code) = err.wire_code() {
        let _ = write_handshake_frame(stream, code, &[]);
    }
    Err(err)
}

pub struct ClientHandshake {
    username: String,
    signing_key: Arc<RsaSigningKey>,
    trust_store: Arc<TrustStore>,
}

impl ClientHandshake {
    pub fn new(username: &str, signing_key: Arc<RsaSigningKey>, trust_store: Arc<TrustStore>) -> Result<Self, HandshakeError> {
        let username = sanitize_client_name(username)?;
        Ok(Self { username, signing_key, trust_store })
    }

    /// Drives the full handshake to completion over `stream`, which may be
    /// any synchronous duplex byte stream (a `TcpStream` in production, an
    /// in-memory pipe in tests).
    pub fn run<S: Read + Write>(&self, stream: &mut S) -> Result<HandshakeOutcome, HandshakeError> {
        let ephemeral = EphemeralDhKey::generate()?;
        let yc_pem = ephemeral.public_key_pem()?;
        let iv_seed = IvSeed::generate();

        write_handshake_frame(stream, msg_type::CLIENT_HELLO, &encode_client_hello(&yc_pem, iv_seed.as_bytes())?)?;
        log_severity!(Severity::Debug, "sent CLIENT_HELLO for user \"{}\"", self.username);

        let frame = read_handshake_frame(stream, MAX_HANDSHAKE_FRAME_LEN)?;
        if frame.msg_type != msg_type::SRV_AUTH {
            return abort(stream, wire::classify_unexpected(frame.msg_type));
        }
        let srv_auth = match decode_srv_auth(&frame.payload) {
            Ok(m) => m,
            Err(e) => return abort(stream, e),
        };

        let verifying_key = match self.trust_store.verify_and_extract_rsa_key(&srv_auth.cert_pem) {
            Ok(k) => k,
            Err(e) => return abort(stream, HandshakeError::ServerCertRejected(e.to_string())),
        };

        let peer_dh = match PeerDhPublicKey::from_pem(&srv_auth.ys_pem) {
            Ok(k) => k,
            Err(_) => return abort(stream, HandshakeError::InvalidPubkey),
        };
        let shared = ephemeral.shared_secret(&peer_dh)?;
        let k = derive_session_key(&shared)?;
        let session_key = SessionKey::new(*k);

        let mut server_auth_value = Vec::with_capacity(yc_pem.len() + srv_auth.ys_pem.len());
        server_auth_value.extend_from_slice(&yc_pem);
        server_auth_value.extend_from_slice(&srv_auth.ys_pem);

        let mut proof_plain = match cbc_decrypt(&session_key, &iv_seed.cbc_iv(), &srv_auth.srv_proof) {
            Ok(p) => p,
            Err(_) => return abort(stream, HandshakeError::ServerAuthFailed),
        };
        let verified = verifying_key.verify(&server_auth_value, &proof_plain);
        zeroize_buffer(&mut proof_plain);
        if verified.is_err() {
            return abort(stream, HandshakeError::ServerAuthFailed);
        }

        let mut client_auth_value = Vec::with_capacity(self.username.len() + yc_pem.len() + srv_auth.ys_pem.len());
        client_auth_value.extend_from_slice(self.username.as_bytes());
        client_auth_value.extend_from_slice(&yc_pem);
        client_auth_value.extend_from_slice(&srv_auth.ys_pem);

        let mut signature = self.signing_key.sign(&client_auth_value)?;
        let cli_proof_vec = cbc_encrypt(&session_key, &iv_seed.cbc_iv(), &signature)?;
        zeroize_buffer(&mut signature);
        let cli_proof: [u8; wire::PROOF_LEN] = cli_proof_vec
            .try_into()
            .map_err(|_| HandshakeError::MalformedMessage)?;

        write_handshake_frame(stream, msg_type::CLI_AUTH, &encode_cli_auth(&self.username, &cli_proof)?)?;
        log_severity!(Severity::Debug, "sent CLI_AUTH, awaiting SRV_OK");

        let frame = read_handshake_frame(stream, MAX_HANDSHAKE_FRAME_LEN)?;
        if frame.msg_type != msg_type::SRV_OK {
            return Err(wire::classify_unexpected(frame.msg_type));
        }
        decode_srv_ok(&frame.payload)?;

        let nonce_counter = NonceCounter::from_initial(iv_seed.gcm_nonce_prefix());
        Ok(HandshakeOutcome { session_key, nonce_counter })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_username_with_path_separator() {
        // Arc::new of a dummy signing key/trust store would require a real
        // RSA key; the sanitation failure happens before either is touched.
        let err = sanitize_client_name("../mallory").unwrap_err();
        assert!(matches!(err, HandshakeError::MalformedMessage));
    }
}
