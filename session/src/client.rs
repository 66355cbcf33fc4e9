//! Client side of the session manager: one method per operation, issued
//! from the Idle state and returning to it whether the operation
//! completed or was cancelled (§4.3).

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use safecloud_crypto::{NonceCounter, SessionKey};

use crate::error::SessionError;
use crate::frame::SessionCipher;
use crate::wire::{
    self, decode_file_metadata, decode_list_size, encode_file_metadata, encode_name_only, encode_rename_request,
    msg_type, FileMetadata, RenameRequest,
};

/// Outcome of a client-driven operation that may be declined by the server
/// without closing the connection (e.g. the file being downloaded does not
/// exist).
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

pub struct ClientSession {
    cipher: SessionCipher,
}

impl ClientSession {
    pub fn new(key: SessionKey, nonce: NonceCounter) -> Self {
        Self { cipher: SessionCipher::new(key, nonce) }
    }

    pub fn send_bye<S: Write>(&mut self, stream: &mut S) -> Result<(), SessionError> {
        self.cipher.send_message(stream, msg_type::BYE, &[])
    }

    /// Uploads the local file at `local_path` under `remote_name`. If the
    /// server reports an existing file of the same name, `overwrite`
    /// decides whether to confirm or cancel the transfer.
    pub fn upload<S: Read + Write>(
        &mut self,
        stream: &mut S,
        local_path: &Path,
        remote_name: &str,
        overwrite: bool,
    ) -> Result<Outcome, SessionError> {
        let metadata = fs::metadata(local_path).map_err(SessionError::Io)?;
        let size = metadata.len();
        let mtime = modified_unix(&metadata);

        let req = FileMetadata { name: remote_name.to_string(), size, mtime, ctime: mtime };
        self.cipher.send_message(stream, msg_type::FILE_UPLOAD_REQ, &encode_file_metadata(&req)?)?;

        let (t, payload) = self.cipher.recv_message(stream)?;
        if t == msg_type::FILE_METADATA {
            let _existing = decode_file_metadata(&payload)?;
            if overwrite {
                self.cipher.send_message(stream, msg_type::CONFIRM, &[])?;
            } else {
                self.cipher.send_message(stream, msg_type::CANCEL, &[])?;
                return Ok(Outcome::Cancelled);
            }
        } else if t != msg_type::CONFIRM && !(size == 0 && t == msg_type::COMPLETED) {
            return Err(wire::classify_unexpected(t));
        }

        if size == 0 {
            if t != msg_type::COMPLETED {
                let (t2, _) = self.cipher.recv_message(stream)?;
                if t2 != msg_type::COMPLETED {
                    return Err(wire::classify_unexpected(t2));
                }
            }
            return Ok(Outcome::Completed);
        }

        let mut file = fs::File::open(local_path).map_err(SessionError::Io)?;
        self.cipher.send_raw_stream(stream, &mut file, size)?;

        let (t, _) = self.cipher.recv_message(stream)?;
        if t != msg_type::COMPLETED {
            return Err(wire::classify_unexpected(t));
        }
        Ok(Outcome::Completed)
    }

    /// Downloads `remote_name` into the local file at `local_path`.
    pub fn download<S: Read + Write>(
        &mut self,
        stream: &mut S,
        remote_name: &str,
        local_path: &Path,
    ) -> Result<Outcome, SessionError> {
        self.cipher.send_message(stream, msg_type::FILE_DOWNLOAD_REQ, &encode_name_only(remote_name)?)?;

        let (t, payload) = self.cipher.recv_message(stream)?;
        let meta = match t {
            msg_type::CANCEL => return Ok(Outcome::Cancelled),
            msg_type::FILE_METADATA => decode_file_metadata(&payload)?,
            other => return Err(wire::classify_unexpected(other)),
        };

        let mut file = fs::File::create(local_path).map_err(SessionError::Io)?;
        if meta.size == 0 {
            let (t, _) = self.cipher.recv_message(stream)?;
            if t != msg_type::COMPLETED {
                return Err(wire::classify_unexpected(t));
            }
            return Ok(Outcome::Completed);
        }

        self.cipher.recv_raw_stream(stream, &mut file, meta.size)?;
        self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;
        Ok(Outcome::Completed)
    }

    pub fn delete<S: Read + Write>(&mut self, stream: &mut S, remote_name: &str, confirm: bool) -> Result<Outcome, SessionError> {
        self.cipher.send_message(stream, msg_type::FILE_DELETE_REQ, &encode_name_only(remote_name)?)?;

        let (t, _) = self.cipher.recv_message(stream)?;
        match t {
            msg_type::CANCEL => return Ok(Outcome::Cancelled),
            msg_type::FILE_METADATA => {}
            other => return Err(wire::classify_unexpected(other)),
        }

        if confirm {
            self.cipher.send_message(stream, msg_type::CONFIRM, &[])?;
        } else {
            self.cipher.send_message(stream, msg_type::CANCEL, &[])?;
            return Ok(Outcome::Cancelled);
        }

        let (t, _) = self.cipher.recv_message(stream)?;
        if t != msg_type::COMPLETED {
            return Err(wire::classify_unexpected(t));
        }
        Ok(Outcome::Completed)
    }

    pub fn rename<S: Read + Write>(&mut self, stream: &mut S, old_name: &str, new_name: &str) -> Result<Outcome, SessionError> {
        let req = RenameRequest { old_name: old_name.to_string(), new_name: new_name.to_string() };
        self.cipher.send_message(stream, msg_type::FILE_RENAME_REQ, &encode_rename_request(&req)?)?;

        let (t, _) = self.cipher.recv_message(stream)?;
        match t {
            msg_type::CANCEL => Ok(Outcome::Cancelled),
            msg_type::COMPLETED => Ok(Outcome::Completed),
            other => Err(wire::classify_unexpected(other)),
        }
    }

    /// Lists the server's storage pool, returning the decoded entries.
    pub fn list<S: Read + Write>(&mut self, stream: &mut S) -> Result<Vec<FileMetadata>, SessionError> {
        self.cipher.send_message(stream, msg_type::FILE_LIST_REQ, &[])?;

        let (t, payload) = self.cipher.recv_message(stream)?;
        if t != msg_type::LIST_SIZE {
            return Err(wire::classify_unexpected(t));
        }
        let total = decode_list_size(&payload)?;

        let mut buf = Vec::new();
        self.cipher.recv_raw_stream(stream, &mut buf, total)?;
        self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;

        decode_listing(&buf)
    }
}

fn decode_listing(buf: &[u8]) -> Result<Vec<FileMetadata>, SessionError> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let meta = decode_file_metadata_at(buf, &mut offset)?;
        entries.push(meta);
    }
    Ok(entries)
}

/// Decodes one [`FileMetadata`] record starting at `*offset`, advancing it
/// past the record. Mirrors `wire::decode_file_metadata`, which assumes its
/// input is exactly one record; the listing stream concatenates many.
fn decode_file_metadata_at(buf: &[u8], offset: &mut usize) -> Result<FileMetadata, SessionError> {
    if buf.len() < *offset + 2 {
        return Err(SessionError::MalformedMessage);
    }
    let name_len = u16::from_le_bytes([buf[*offset], buf[*offset + 1]]) as usize;
    let record_len = 2 + name_len + 24;
    if buf.len() < *offset + record_len {
        return Err(SessionError::MalformedMessage);
    }
    let meta = decode_file_metadata(&buf[*offset..*offset + record_len])?;
    *offset += record_len;
    Ok(meta)
}

fn modified_unix(metadata: &fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_listing_handles_multiple_records() {
        let a = FileMetadata { name: "a.txt".into(), size: 1, mtime: 2, ctime: 3 };
        let b = FileMetadata { name: "b.txt".into(), size: 4, mtime: 5, ctime: 6 };
        let mut buf = Vec::new();
        buf.extend_from_slice(&encode_file_metadata(&a).unwrap());
        buf.extend_from_slice(&encode_file_metadata(&b).unwrap());

        let entries = decode_listing(&buf).unwrap();
        assert_eq!(entries, vec![a, b]);
    }
}
