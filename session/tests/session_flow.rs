//! End-to-end session exchanges over a real duplex pipe, driving
//! `ClientSession` against `ServerSession` with an in-memory-backed
//! `StoragePool` rooted in a temp directory.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use safecloud_crypto::{NonceCounter, SessionKey, GCM_NONCE_LEN};
use safecloud_session::{BoxError, ClientSession, FileMetadata, Outcome, ServerSession, StoragePool, UploadSink};

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
        self.mtimes.lock().unwrap().remove(name);
        Ok(())
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), BoxError> {
        fs::rename(self.path(old_name), self.path(new_name))?;
        let moved = self.mtimes.lock().unwrap().remove(old_name);
        if let Some(mtime) = moved {
            self.mtimes.lock().unwrap().insert(new_name.to_string(), mtime);
        }
        Ok(())
    }

    fn begin_upload(&self, name: &str) -> Result<Box<dyn UploadSink>, BoxError> {
        let tmp_path = self.dir.path().join(format!("{name}.tmp"));
        let file = fs::File::create(&tmp_path)?;
        Ok(Box::new(TestSink {
            tmp_path,
            final_path: self.path(name),
            name: name.to_string(),
            file,
            mtimes: self.mtimes.clone(),
        }))
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

fn session_pair() -> (ClientSession, ServerSession, Arc<TestPool>) {
    let key = SessionKey::new([42u8; 16]);
    let nonce = NonceCounter::from_initial([0u8; GCM_NONCE_LEN]);
    let pool = Arc::new(TestPool::new());
    let client = ClientSession::new(key.clone(), nonce.clone());
    let server = ServerSession::new(
        safecloud_session::SessionCipher::new(key, nonce),
        pool.clone() as Arc<dyn StoragePool>,
        "alice".to_string(),
    );
    (client, server, pool)
}

#[test]
fn upload_then_download_round_trips_bytes() {
    let (mut client, mut server, pool) = session_pair();
    let src_dir = tempfile::tempdir().unwrap();
    let src_path = src_dir.path().join("source.bin");
    fs::write(&src_path, b"hello safecloud").unwrap();

    let (mut client_sock, mut server_sock) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || server.serve(&mut server_sock));

    let outcome = client.upload(&mut client_sock, &src_path, "greeting.txt", true).unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert!(pool.path("greeting.txt").exists());

    let dest_path = src_dir.path().join("downloaded.bin");
    let outcome = client.download(&mut client_sock, "greeting.txt", &dest_path).unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(fs::read(&dest_path).unwrap(), b"hello safecloud");

    client.send_bye(&mut client_sock).unwrap();
    server_thread.join().unwrap().unwrap();
}

#[test]
fn upload_overwrite_declined_leaves_existing_file_untouched() {
    let (mut client, mut server, pool) = session_pair();
    fs::write(pool.path("notes.txt"), b"original").unwrap();

    let src_dir = tempfile::tempdir().unwrap();
    let src_path = src_dir.path().join("new.txt");
    fs::write(&src_path, b"replacement").unwrap();

    let (mut client_sock, mut server_sock) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || server.serve(&mut server_sock));

    let outcome = client.upload(&mut client_sock, &src_path, "notes.txt", false).unwrap();
    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(fs::read(pool.path("notes.txt")).unwrap(), b"original");

    client.send_bye(&mut client_sock).unwrap();
    server_thread.join().unwrap().unwrap();
}

#[test]
fn download_of_missing_file_is_cancelled_without_closing_connection() {
    let (mut client, mut server, _pool) = session_pair();
    let (mut client_sock, mut server_sock) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || server.serve(&mut server_sock));

    let dest = tempfile::NamedTempFile::new().unwrap();
    let outcome = client.download(&mut client_sock, "absent.txt", dest.path()).unwrap();
    assert_eq!(outcome, Outcome::Cancelled);

    let entries = client.list(&mut client_sock).unwrap();
    assert!(entries.is_empty());

    client.send_bye(&mut client_sock).unwrap();
    server_thread.join().unwrap().unwrap();
}

#[test]
fn rename_then_list_reflects_the_new_name() {
    let (mut client, mut server, pool) = session_pair();
    fs::write(pool.path("a.txt"), b"data").unwrap();

    let (mut client_sock, mut server_sock) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || server.serve(&mut server_sock));

    let outcome = client.rename(&mut client_sock, "a.txt", "b.txt").unwrap();
    assert_eq!(outcome, Outcome::Completed);

    let entries = client.list(&mut client_sock).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "b.txt");

    client.send_bye(&mut client_sock).unwrap();
    server_thread.join().unwrap().unwrap();
}

#[test]
fn mismatched_keys_fail_the_first_frame_and_close_the_connection() {
    let server_key = SessionKey::new([1u8; 16]);
    let client_key = SessionKey::new([2u8; 16]);
    let nonce = NonceCounter::from_initial([0u8; GCM_NONCE_LEN]);
    let pool = Arc::new(TestPool::new());

    let mut client = ClientSession::new(client_key, nonce.clone());
    let mut server = ServerSession::new(
        safecloud_session::SessionCipher::new(server_key, nonce),
        pool as Arc<dyn StoragePool>,
        "mallory".to_string(),
    );

    let (mut client_sock, mut server_sock) = UnixStream::pair().unwrap();
    let server_thread = thread::spawn(move || server.serve(&mut server_sock));

    let _ = client.send_bye(&mut client_sock);
    let result = server_thread.join().unwrap();
    assert!(result.is_err());
}
