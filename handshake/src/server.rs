//! Server side of the STSM handshake: `AwaitClientHello -> AwaitClientAuth
//! -> Done` (§3, §4.2).

use std::io::{Read, Write};
use std::sync::Arc;

use safecloud_crypto::{
    cbc_decrypt, cbc_encrypt, derive_session_key, log_severity, zeroize_buffer, EphemeralDhKey, IvSeed, NonceCounter,
    PeerDhPublicKey, RsaSigningKey, SessionKey, Severity,
};
use safecloud_framing::{read_handshake_frame, write_handshake_frame};

use crate::error::HandshakeError;
use crate::identity::sanitize_client_name;
use crate::registry::UserRegistry;
use crate::wire::{self, decode_client_hello, decode_cli_auth, encode_srv_auth, msg_type, MAX_HANDSHAKE_FRAME_LEN};
use crate::ServerHandshakeOutcome;

fn abort<S: Write, T>(stream: &mut S, err: HandshakeError) -> Result<T, HandshakeError> {
    if let Some(code) = err.wire_code() {
        let _ = write_handshake_frame(stream, code, &[]);
    }
    Err(err)
}

pub struct ServerHandshake {
    signing_key: Arc<RsaSigningKey>,
    cert_pem: Arc<Vec<u8>>,
    registry: Arc<dyn UserRegistry>,
}

impl ServerHandshake {
    pub fn new(signing_key: Arc<RsaSigningKey>, cert_pem: Arc<Vec<u8>>, registry: Arc<dyn UserRegistry>) -> Self {
        Self { signing_key, cert_pem, registry }
    }

    pub fn run<S: Read + Write>(&self, stream: &mut S) -> Result<ServerHandshakeOutcome, HandshakeError> {
        let frame = read_handshake_frame(stream, MAX_HANDSHAKE_FRAME_LEN)?;
        if frame.msg_type != msg_type::CLIENT_HELLO {
            return abort(stream, wire::classify_unexpected(frame.msg_type));
        }
        let hello = match decode_client_hello(&frame.payload) {
            Ok(m) => m,
            Err(e) => return abort(stream, e),
        };

        let ephemeral = EphemeralDhKey::generate()?;
        let ys_pem = ephemeral.public_key_pem()?;

        let peer_dh = match PeerDhPublicKey::from_pem(&hello.yc_pem) {
            Ok(k) => k,
            Err(_) => return abort(stream, HandshakeError::InvalidPubkey),
        };
        let shared = ephemeral.shared_secret(&peer_dh)?;
        let k = derive_session_key(&shared)?;
        let session_key = SessionKey::new(*k);

        let mut server_auth_value = Vec::with_capacity(hello.yc_pem.len() + ys_pem.len());
        server_auth_value.extend_from_slice(&hello.yc_pem);
        server_auth_value.extend_from_slice(&ys_pem);

        let mut signature = self.signing_key.sign(&server_auth_value)?;
        let srv_proof_vec = cbc_encrypt(&session_key, &hello.iv_seed, &signature)?;
        zeroize_buffer(&mut signature);
        let srv_proof: [u8; wire::PROOF_LEN] = srv_proof_vec
            .try_into()
            .map_err(|_| HandshakeError::MalformedMessage)?;

        write_handshake_frame(
            stream,
            msg_type::SRV_AUTH,
            &encode_srv_auth(&ys_pem, &srv_proof, &self.cert_pem)?,
        )?;
        log_severity!(Severity::Debug, "sent SRV_AUTH, awaiting CLI_AUTH");

        let frame = read_handshake_frame(stream, MAX_HANDSHAKE_FRAME_LEN)?;
        if frame.msg_type != msg_type::CLI_AUTH {
            return abort(stream, wire::classify_unexpected(frame.msg_type));
        }
        let cli_auth = match decode_cli_auth(&frame.payload) {
            Ok(m) => m,
            Err(e) => return abort(stream, e),
        };
        let client_name = match sanitize_client_name(&cli_auth.name) {
            Ok(n) => n,
            Err(_) => return abort(stream, HandshakeError::MalformedMessage),
        };

        let verifying_key = match self.registry.lookup_public_key(&client_name) {
            Ok(Some(key)) => key,
            Ok(None) => return abort(stream, HandshakeError::ClientLoginFailed),
            Err(e) => {
                log_severity!(Severity::Critical, "user registry lookup failed for \"{}\": {}", client_name, e);
                return abort(stream, HandshakeError::ClientLoginFailed);
            }
        };

        let mut client_auth_value = Vec::with_capacity(client_name.len() + hello.yc_pem.len() + ys_pem.len());
        client_auth_value.extend_from_slice(client_name.as_bytes());
        client_auth_value.extend_from_slice(&hello.yc_pem);
        client_auth_value.extend_from_slice(&ys_pem);

        let mut proof_plain = match cbc_decrypt(&session_key, &hello.iv_seed, &cli_auth.proof) {
            Ok(p) => p,
            Err(_) => return abort(stream, HandshakeError::ClientAuthFailed),
        };
        let verified = verifying_key.verify(&client_auth_value, &proof_plain);
        zeroize_buffer(&mut proof_plain);
        if verified.is_err() {
            return abort(stream, HandshakeError::ClientAuthFailed);
        }

        write_handshake_frame(stream, msg_type::SRV_OK, &[])?;
        log_severity!(Severity::Info, "handshake complete for \"{}\"", client_name);

        let nonce_counter = NonceCounter::from_initial(IvSeed::from_bytes(hello.iv_seed).gcm_nonce_prefix());
        Ok(ServerHandshakeOutcome { session_key, nonce_counter, client_name })
    }
}
