//! Filesystem-backed `StoragePool` (§1's "on-disk storage-pool
//! management... out of scope"; §6 "Persisted state": per-user directories
//! under a pool root, with a temp directory for uploads-in-progress).

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use safecloud_connection::StoragePoolFactory;
use safecloud_session::{BoxError, FileMetadata, StoragePool, UploadSink};

const TMP_DIR_NAME: &str = ".safecloud-tmp";

pub struct FsStoragePoolFactory {
    pool_root: PathBuf,
}

impl FsStoragePoolFactory {
    pub fn new(pool_root: PathBuf) -> Self {
        Self { pool_root }
    }
}

impl StoragePoolFactory for FsStoragePoolFactory {
    fn pool_for(&self, client_name: &str) -> Result<Arc<dyn StoragePool>, BoxError> {
        let user_dir = self.pool_root.join(client_name);
        fs::create_dir_all(&user_dir)?;
        fs::create_dir_all(user_dir.join(TMP_DIR_NAME))?;
        Ok(Arc::new(FsStoragePool { user_dir, declared_mtimes: Arc::new(Mutex::new(HashMap::new())) }))
    }
}

/// One user's directory within the pool root. `declared_mtimes` remembers
/// the mtime each upload declared, since no mtime-setting crate is in the
/// pack's dependency corpus; a fresh process falls back to the real
/// filesystem mtime for any entry it hasn't stamped itself this run.
pub struct FsStoragePool {
    user_dir: PathBuf,
    declared_mtimes: Arc<Mutex<HashMap<String, u64>>>,
}

impl FsStoragePool {
    fn entry_path(&self, name: &str) -> PathBuf {
        self.user_dir.join(name)
    }

    fn fs_mtime(metadata: &fs::Metadata) -> u64 {
        metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl StoragePool for FsStoragePool {
    fn stat(&self, name: &str) -> Result<Option<FileMetadata>, BoxError> {
        match fs::metadata(self.entry_path(name)) {
            Ok(m) => {
                let mtime = self.declared_mtimes.lock().unwrap().get(name).copied().unwrap_or_else(|| Self::fs_mtime(&m));
                Ok(Some(FileMetadata { name: name.to_string(), size: m.len(), mtime, ctime: mtime }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn list(&self) -> Result<Vec<FileMetadata>, BoxError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.user_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(meta) = self.stat(&name)? {
                entries.push(meta);
            }
        }
        Ok(entries)
    }

    fn delete(&self, name: &str) -> Result<(), BoxError> {
        fs::remove_file(self.entry_path(name))?;
        self.declared_mtimes.lock().unwrap().remove(name);
        Ok(())
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), BoxError> {
        fs::rename(self.entry_path(old_name), self.entry_path(new_name))?;
        let moved = self.declared_mtimes.lock().unwrap().remove(old_name);
        if let Some(mtime) = moved {
            self.declared_mtimes.lock().unwrap().insert(new_name.to_string(), mtime);
        }
        Ok(())
    }

    fn begin_upload(&self, name: &str) -> Result<Box<dyn UploadSink>, BoxError> {
        let tmp_path = self.user_dir.join(TMP_DIR_NAME).join(format!("{name}.part"));
        let file = fs::File::create(&tmp_path)?;
        Ok(Box::new(FsUploadSink {
            tmp_path,
            final_path: self.entry_path(name),
            name: name.to_string(),
            file,
            declared_mtimes: self.declared_mtimes.clone(),
        }))
    }

    fn open_for_read(&self, name: &str) -> Result<Box<dyn Read + Send>, BoxError> {
        Ok(Box::new(fs::File::open(self.entry_path(name))?))
    }
}

struct FsUploadSink {
    tmp_path: PathBuf,
    final_path: PathBuf,
    name: String,
    file: fs::File,
    declared_mtimes: Arc<Mutex<HashMap<String, u64>>>,
}

impl Write for FsUploadSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl UploadSink for FsUploadSink {
    fn commit(self: Box<Self>, mtime: u64) -> Result<(), BoxError> {
        self.file.sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        self.declared_mtimes.lock().unwrap().insert(self.name, mtime);
        Ok(())
    }

    fn discard(self: Box<Self>) {
        let _ = fs::remove_file(&self.tmp_path);
    }
}

/// Deletes any leftover `.part` files in every user's temp directory,
/// covering §5's "Socket-level disconnection mid-operation is
/// always fatal and triggers resource cleanup: ... deletion of any partial
/// upload temp file" for uploads that were still in flight when the
/// process last exited uncleanly.
pub fn sweep_stale_temp_files(pool_root: &Path) -> std::io::Result<()> {
    if !pool_root.exists() {
        return Ok(());
    }
    for user_entry in fs::read_dir(pool_root)? {
        let user_dir = user_entry?.path();
        let tmp_dir = user_dir.join(TMP_DIR_NAME);
        if !tmp_dir.is_dir() {
            continue;
        }
        for tmp_entry in fs::read_dir(&tmp_dir)? {
            let _ = fs::remove_file(tmp_entry?.path());
        }
    }
    Ok(())
}
