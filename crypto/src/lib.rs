//! Cryptographic leaf layer for the SafeCloud secure channel core: ephemeral
//! DH, long-term RSA signing, AES-128-CBC (handshake proofs), AES-128-GCM
//! (session frames and raw-mode streaming), certificate-chain verification,
//! the K-derivation KDF, and zeroizing wrappers for sensitive material.
//!
//! Nothing in this crate knows about wire framing or protocol state; it is
//! the set of primitives `safecloud-handshake` and `safecloud-session` build
//! their state machines on top of.

mod cbc;
mod cert;
mod dh;
mod error;
mod gcm;
mod ivseed;
mod kdf;
mod nonce;
mod rsa;
mod secret;
mod severity;

pub use cbc::{cbc_decrypt, cbc_encrypt, AES128_KEY_LEN, CBC_IV_LEN};
pub use cert::TrustStore;
pub use dh::{EphemeralDhKey, PeerDhPublicKey};
pub use error::CryptoError;
pub use gcm::{decrypt_frame, encrypt_frame, GcmStreamDecryptor, GcmStreamEncryptor, GCM_NONCE_LEN, GCM_TAG_LEN};
pub use ivseed::IvSeed;
pub use kdf::{derive_session_key, SESSION_KEY_LEN};
pub use nonce::NonceCounter;
pub use rsa::{RsaSigningKey, RsaVerifyingKey, RSA_SIGNATURE_LEN};
pub use secret::{zeroize_buffer, SessionKey};
pub use severity::Severity;
