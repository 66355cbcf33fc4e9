//! Ephemeral Diffie-Hellman key exchange over the RFC-5114-style 2048-bit
//! `dhx` group (OpenSSL's `DH_get_2048_256` parameters), matching the group
//! the original implementation hard-codes in `dh.cpp`.

use openssl::derive::Deriver;
use openssl::dh::Dh;
use openssl::pkey::{PKey, Private, Public};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// An actor's ephemeral DH keypair. Lifetime is scoped to a single
/// handshake; the caller drops it as soon as the session key is derived
/// (invariant 5 of the data model).
pub struct EphemeralDhKey {
    pkey: PKey<Private>,
}

/// The peer's ephemeral DH public key, parsed from the PEM blob carried on
/// the wire.
pub struct PeerDhPublicKey {
    pkey: PKey<Public>,
}

impl EphemeralDhKey {
    pub fn generate() -> Result<Self, CryptoError> {
        let params = Dh::get_2048_256()?;
        let dh = params.generate_key()?;
        let pkey = PKey::from_dh(dh)?;
        Ok(Self { pkey })
    }

    /// PEM-encoded `SubjectPublicKeyInfo` for this keypair's public half, as
    /// sent in `CLIENT_HELLO`/`SRV_AUTH`. Length-prefixed on the wire rather
    /// than treated as a fixed-size blob, since the exact PEM length is a
    /// function of the ASN.1/base64 encoder and not a protocol invariant.
    pub fn public_key_pem(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(self.pkey.public_key_to_pem()?)
    }

    /// Performs the DH computation against the peer's ephemeral public key,
    /// returning the raw shared secret. The caller feeds this into
    /// [`crate::kdf::derive_session_key`] and drops the returned buffer.
    pub fn shared_secret(&self, peer: &PeerDhPublicKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mut deriver = Deriver::new(&self.pkey)?;
        deriver.set_peer(&peer.pkey)?;
        Ok(Zeroizing::new(deriver.derive_to_vec()?))
    }
}

impl PeerDhPublicKey {
    pub fn from_pem(bytes: &[u8]) -> Result<Self, CryptoError> {
        let pkey = PKey::public_key_from_pem(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        if pkey.id() != openssl::pkey::Id::DH {
            return Err(CryptoError::InvalidPublicKey);
        }
        Ok(Self { pkey })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dh_agreement_matches() {
        let client = EphemeralDhKey::generate().unwrap();
        let server = EphemeralDhKey::generate().unwrap();

        let client_pub = PeerDhPublicKey::from_pem(&client.public_key_pem().unwrap()).unwrap();
        let server_pub = PeerDhPublicKey::from_pem(&server.public_key_pem().unwrap()).unwrap();

        let shared_client = client.shared_secret(&server_pub).unwrap();
        let shared_server = server.shared_secret(&client_pub).unwrap();
        assert_eq!(&*shared_client, &*shared_server);
    }

    #[test]
    fn rejects_non_dh_pem() {
        // An RSA public key PEM should not parse as a DH public key.
        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();
        let pem = pkey.public_key_to_pem().unwrap();
        assert!(PeerDhPublicKey::from_pem(&pem).is_err());
    }
}
