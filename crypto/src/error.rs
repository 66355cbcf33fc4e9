use thiserror::Error;

/// Failures surfaced by every primitive in this crate. Callers in
/// `safecloud-handshake` and `safecloud-session` match on these to decide
/// whether a failure is a protocol-level rejection (send a typed error frame)
/// or an internal error (log and reset/close).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("openssl error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("peer supplied an invalid ephemeral public key")]
    InvalidPublicKey,

    #[error("certificate chain verification failed: {0}")]
    CertificateRejected(String),

    #[error("RSA signature verification failed")]
    SignatureInvalid,

    #[error("AEAD tag verification failed")]
    TagVerificationFailed,

    #[error("session nonce counter exhausted")]
    NonceExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
