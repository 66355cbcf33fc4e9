//! X.509 trust-store loading and server-certificate path validation, used by
//! the client side of the handshake (§4.2 "Server certificate handling").

use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509StoreContext, X509};

use crate::error::CryptoError;
use crate::rsa::RsaVerifyingKey;

/// A client's local trust store (root CA certificates).
pub struct TrustStore {
    store: X509Store,
}

impl TrustStore {
    /// Builds a trust store from a PEM bundle that may contain one or more
    /// concatenated root certificates.
    pub fn from_pem_bundle(pem: &[u8]) -> Result<Self, CryptoError> {
        let roots = X509::stack_from_pem(pem)?;
        let mut builder = X509StoreBuilder::new()?;
        for root in roots {
            builder.add_cert(root)?;
        }
        Ok(Self { store: builder.build() })
    }

    /// Parses and verifies `cert_pem` against this trust store, building a
    /// path to a trusted root. On success, returns the certified RSA public
    /// key to be used for STSM signature verification. Any path-building,
    /// expiry, or signature failure is reported uniformly, and the handshake
    /// layer maps this into `SRV_CERT_REJECTED`.
    pub fn verify_and_extract_rsa_key(&self, cert_pem: &[u8]) -> Result<RsaVerifyingKey, CryptoError> {
        let cert = X509::from_pem(cert_pem).map_err(|e| CryptoError::CertificateRejected(e.to_string()))?;
        let empty_chain = Stack::new()?;

        let mut ctx = X509StoreContext::new()?;
        let verified = ctx
            .init(&self.store, &cert, &empty_chain, |c| c.verify_cert())
            .map_err(|e| CryptoError::CertificateRejected(e.to_string()))?;

        if !verified {
            let reason = ctx
                .error()
                .error_string()
                .to_string();
            return Err(CryptoError::CertificateRejected(reason));
        }

        let pkey = cert.public_key().map_err(|e| CryptoError::CertificateRejected(e.to_string()))?;
        Ok(RsaVerifyingKey::from_pkey(pkey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::hash::MessageDigest;
    use openssl::pkey::PKey;
    use openssl::rsa::Rsa;
    use openssl::x509::extension::BasicConstraints;
    use openssl::x509::X509NameBuilder;

    fn self_signed_ca() -> (X509, PKey<openssl::pkey::Private>) {
        let rsa = Rsa::generate(2048).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "Test Root CA").unwrap();
        let name = name.build();

        let mut builder = openssl::x509::X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder
            .append_extension(BasicConstraints::new().ca().build().unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();
        (builder.build(), pkey)
    }

    #[test]
    fn trusted_self_signed_cert_is_accepted() {
        let (cert, key) = self_signed_ca();
        let cert_pem = cert.to_pem().unwrap();

        let store = TrustStore::from_pem_bundle(&cert_pem).unwrap();
        let verifying_key = store.verify_and_extract_rsa_key(&cert_pem).unwrap();

        let signer = crate::rsa::RsaSigningKey::from_pem(&key.private_key_to_pem_pkcs8().unwrap()).unwrap();
        let sig = signer.sign(b"hello").unwrap();
        verifying_key.verify(b"hello", &sig).unwrap();
    }

    #[test]
    fn empty_trust_store_rejects_cert() {
        let (cert, _key) = self_signed_ca();
        let cert_pem = cert.to_pem().unwrap();

        let (other_ca, _) = self_signed_ca();
        let store = TrustStore::from_pem_bundle(&other_ca.to_pem().unwrap()).unwrap();
        assert!(store.verify_and_extract_rsa_key(&cert_pem).is_err());
    }
}
