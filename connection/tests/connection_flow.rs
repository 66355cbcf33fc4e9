//! Drives a full connection end to end: handshake, then one file-upload
//! operation over the resulting session, exercising the Connection
//! Manager's KeyExchange -> Session transition.

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Name, X509NameBuilder, X509};

use safecloud_connection::{ClientConnection, GuestNames, ServerConnection, StoragePoolFactory};
use safecloud_crypto::{RsaSigningKey, RsaVerifyingKey, TrustStore};
use safecloud_handshake::UserRegistry;
use safecloud_session::{BoxError, FileMetadata, Outcome, StoragePool, UploadSink};

fn rsa_keypair() -> (Vec<u8>, Vec<u8>) {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey = PKey::from_rsa(rsa).unwrap();
    (pkey.private_key_to_pem_pkcs8().unwrap(), pkey.public_key_to_pem().unwrap())
}

fn build_name(cn: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder.append_entry_by_text("CN", cn).unwrap();
    builder.build()
}

fn self_signed_ca() -> (X509, PKey<Private>) {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey = PKey::from_rsa(rsa).unwrap();
    let name = build_name("Test Root CA");

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.append_extension(BasicConstraints::new().ca().build().unwrap()).unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    (builder.build(), pkey)
}

fn issue_leaf_cert(ca_cert: &X509, ca_key: &PKey<Private>, server_pubkey_pem: &[u8]) -> Vec<u8> {
    let server_pkey = PKey::public_key_from_pem(server_pubkey_pem).unwrap();
    let name = build_name("safecloud-server");

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(ca_cert.subject_name()).unwrap();
    builder.set_pubkey(&server_pkey).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.sign(ca_key, MessageDigest::sha256()).unwrap();
    builder.build().to_pem().unwrap()
}

struct StaticRegistry {
    name: String,
    key_pem: Vec<u8>,
}

impl UserRegistry for StaticRegistry {
    fn lookup_public_key(&self, sanitized_name: &str) -> Result<Option<RsaVerifyingKey>, Box<dyn Error + Send + Sync>> {
        if sanitized_name == self.name {
            Ok(Some(RsaVerifyingKey::from_pem(&self.key_pem)?))
        } else {
            Ok(None)
        }
    }
}

struct TestPool {
    dir: tempfile::TempDir,
    mtimes: Arc<Mutex<HashMap<String, u64>>>,
}

impl TestPool {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap(), mtimes: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl StoragePool for TestPool {
    fn stat(&self, name: &str) -> Result<Option<FileMetadata>, BoxError> {
        match fs::metadata(self.path(name)) {
            Ok(m) => {
                let mtime = *self.mtimes.lock().unwrap().get(name).unwrap_or(&0);
                Ok(Some(FileMetadata { name: name.to_string(), size: m.len(), mtime, ctime: mtime }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn list(&self) -> Result<Vec<FileMetadata>, BoxError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.dir.path())? {
            let entry = entry?;
            let name = entry.file_name().into_string().unwrap();
            if name.ends_with(".tmp") {
                continue;
            }
            if let Some(meta) = self.stat(&name)? {
                entries.push(meta);
            }
        }
        Ok(entries)
    }

    fn delete(&self, name: &str) -> Result<(), BoxError> {
        fs::remove_file(self.path(name))?;
        Ok(())
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), BoxError> {
        fs::rename(self.path(old_name), self.path(new_name))?;
        Ok(())
    }

    fn begin_upload(&self, name: &str) -> Result<Box<dyn UploadSink>, BoxError> {
        let tmp_path = self.dir.path().join(format!("{name}.tmp"));
        let file = fs::File::create(&tmp_path)?;
        Ok(Box::new(TestSink { tmp_path, final_path: self.path(name), name: name.to_string(), file, mtimes: self.mtimes.clone() }))
    }

    fn open_for_read(&self, name: &str) -> Result<Box<dyn Read + Send>, BoxError> {
        Ok(Box::new(fs::File::open(self.path(name))?))
    }
}

struct TestSink {
    tmp_path: PathBuf,
    final_path: PathBuf,
    name: String,
    file: fs::File,
    mtimes: Arc<Mutex<HashMap<String, u64>>>,
}

impl Write for TestSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl UploadSink for TestSink {
    fn commit(self: Box<Self>, mtime: u64) -> Result<(), BoxError> {
        fs::rename(&self.tmp_path, &self.final_path)?;
        self.mtimes.lock().unwrap().insert(self.name, mtime);
        Ok(())
    }

    fn discard(self: Box<Self>) {
        let _ = fs::remove_file(&self.tmp_path);
    }
}

struct SinglePoolFactory {
    pool: Arc<dyn StoragePool>,
}

impl StoragePoolFactory for SinglePoolFactory {
    fn pool_for(&self, _client_name: &str) -> Result<Arc<dyn StoragePool>, BoxError> {
        Ok(self.pool.clone())
    }
}

#[test]
fn handshake_then_upload_reaches_session_and_stores_the_file() {
    let (ca_cert, ca_key) = self_signed_ca();
    let (server_priv_pem, server_pub_pem) = rsa_keypair();
    let server_cert_pem = issue_leaf_cert(&ca_cert, &ca_key, &server_pub_pem);
    let (client_priv_pem, client_pub_pem) = rsa_keypair();

    let trust_store = Arc::new(TrustStore::from_pem_bundle(&ca_cert.to_pem().unwrap()).unwrap());
    let registry = Arc::new(StaticRegistry { name: "alice".to_string(), key_pem: client_pub_pem });
    let pool = Arc::new(TestPool::new());
    let pool_factory = Arc::new(SinglePoolFactory { pool: pool.clone() as Arc<dyn StoragePool> });

    let (mut client_sock, mut server_sock) = UnixStream::pair().unwrap();

    let server_signing_key = Arc::new(RsaSigningKey::from_pem(&server_priv_pem).unwrap());
    let server_cert_pem = Arc::new(server_cert_pem);
    let server_thread = thread::spawn(move || {
        let conn = ServerConnection::new(server_signing_key, server_cert_pem, registry, pool_factory);
        conn.run(&mut server_sock, &GuestNames::new())
    });

    let client_signing_key = Arc::new(RsaSigningKey::from_pem(&client_priv_pem).unwrap());
    let client_conn = ClientConnection::new("alice", client_signing_key, trust_store).unwrap();
    let mut client_session = client_conn.establish(&mut client_sock).unwrap();

    let src_dir = tempfile::tempdir().unwrap();
    let src_path = src_dir.path().join("upload.bin");
    fs::write(&src_path, b"connection layer smoke test").unwrap();

    let outcome = client_session.upload(&mut client_sock, &src_path, "upload.bin", true).unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(fs::read(pool.path("upload.bin")).unwrap(), b"connection layer smoke test");

    client_session.send_bye(&mut client_sock).unwrap();
    let server_outcome = server_thread.join().unwrap().unwrap();
    assert_eq!(server_outcome.client_name, "alice");
    assert!(server_outcome.closed_cleanly);
}
