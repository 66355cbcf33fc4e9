//! Server side of the session manager: the Idle dispatch loop plus one
//! handler per operation (§4.3's table). Each handler runs its whole
//! sub-state sequence synchronously and funnels every failure through
//! [`ServerSession::recover`], which applies the uniform
//! reset-vs-close policy of §7.

use std::io::{Read, Write};
use std::sync::Arc;

use safecloud_crypto::{log_severity, Severity};

use crate::error::{storage_err, SessionError};
use crate::frame::SessionCipher;
use crate::storage::StoragePool;
use crate::wire::{
    self, decode_file_metadata, decode_name_only, decode_rename_request, encode_file_metadata, encode_list_size,
    msg_type, FileMetadata,
};

pub struct ServerSession {
    cipher: SessionCipher,
    storage: Arc<dyn StoragePool>,
    client_name: String,
}

impl ServerSession {
    pub fn new(cipher: SessionCipher, storage: Arc<dyn StoragePool>, client_name: String) -> Self {
        Self { cipher, storage, client_name }
    }

    /// Runs the Idle dispatch loop until `BYE` or a fatal error. Returns
    /// `Ok(())` on a graceful `BYE`.
    pub fn serve<S: Read + Write>(&mut self, stream: &mut S) -> Result<(), SessionError> {
        loop {
            let (msg_type, payload) = self.cipher.recv_message(stream)?;
            match msg_type {
                wire::msg_type::FILE_UPLOAD_REQ => self.handle_upload(stream, &payload)?,
                wire::msg_type::FILE_DOWNLOAD_REQ => self.handle_download(stream, &payload)?,
                wire::msg_type::FILE_DELETE_REQ => self.handle_delete(stream, &payload)?,
                wire::msg_type::FILE_RENAME_REQ => self.handle_rename(stream, &payload)?,
                wire::msg_type::FILE_LIST_REQ => self.handle_list(stream, &payload)?,
                wire::msg_type::BYE => {
                    log_severity!(Severity::Info, "\"{}\" said BYE", self.client_name);
                    return Ok(());
                }
                wire::msg_type::CANCEL => continue, // no operation in progress at Idle
                t if wire::is_error_type(t) => return Err(SessionError::PeerReported(t)),
                t => {
                    let _ = self.cipher.send_message(stream, crate::wire::err_type::ERR_UNKNOWN_SESSMSG_TYPE, &[]);
                    return Err(SessionError::UnknownMsgType(t));
                }
            }
        }
    }

    /// Sends the courtesy error frame (if any) and decides whether the
    /// caller should reset to Idle (`Ok`) or close the connection (`Err`).
    fn recover<S: Write>(&mut self, stream: &mut S, err: SessionError) -> Result<(), SessionError> {
        if let Some(code) = err.wire_code() {
            let _ = self.cipher.send_message(stream, code, &[]);
        }
        if err.is_fatal() {
            Err(err)
        } else {
            log_severity!(Severity::Warning, "operation aborted for \"{}\": {}", self.client_name, err);
            Ok(())
        }
    }

    fn handle_upload<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        match self.run_upload(stream, payload) {
            Ok(()) => Ok(()),
            Err(e) => self.recover(stream, e),
        }
    }

    fn run_upload<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        let req = decode_file_metadata(payload)?;
        let name = crate::validate::validate_filename(&req.name)?.to_string();
        let existing = self.storage.stat(&name).map_err(storage_err)?;

        if let Some(meta) = &existing {
            self.cipher.send_message(stream, msg_type::FILE_METADATA, &encode_file_metadata(meta)?)?;
            let (t, _) = self.cipher.recv_message(stream)?;
            match t {
                msg_type::CONFIRM => {}
                msg_type::CANCEL => return Ok(()),
                other => return Err(wire::classify_unexpected(other)),
            }
        }

        if req.size == 0 {
            let sink = self.storage.begin_upload(&name).map_err(storage_err)?;
            sink.commit(req.mtime).map_err(storage_err)?;
            self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;
            return Ok(());
        }

        if existing.is_none() {
            self.cipher.send_message(stream, msg_type::CONFIRM, &[])?;
        }

        let mut sink = self.storage.begin_upload(&name).map_err(storage_err)?;
        match self.cipher.recv_raw_stream(stream, sink.as_mut(), req.size) {
            Ok(()) => {
                sink.commit(req.mtime).map_err(storage_err)?;
                self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;
                Ok(())
            }
            Err(e) => {
                sink.discard();
                Err(e)
            }
        }
    }

    fn handle_download<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        match self.run_download(stream, payload) {
            Ok(()) => Ok(()),
            Err(e) => self.recover(stream, e),
        }
    }

    fn run_download<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        let requested = decode_name_only(payload)?;
        let name = crate::validate::validate_filename(&requested)?.to_string();
        let meta = self.storage.stat(&name).map_err(storage_err)?;

        let meta = match meta {
            Some(m) => m,
            None => {
                self.cipher.send_message(stream, msg_type::CANCEL, &[])?;
                return Ok(());
            }
        };

        self.cipher.send_message(stream, msg_type::FILE_METADATA, &encode_file_metadata(&meta)?)?;
        if meta.size == 0 {
            self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;
            return Ok(());
        }

        let mut reader = self.storage.open_for_read(&name).map_err(storage_err)?;
        self.cipher.send_raw_stream(stream, reader.as_mut(), meta.size)?;

        let (t, _) = self.cipher.recv_message(stream)?;
        if t != msg_type::COMPLETED {
            return Err(wire::classify_unexpected(t));
        }
        Ok(())
    }

    fn handle_delete<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        match self.run_delete(stream, payload) {
            Ok(()) => Ok(()),
            Err(e) => self.recover(stream, e),
        }
    }

    fn run_delete<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        let requested = decode_name_only(payload)?;
        let name = crate::validate::validate_filename(&requested)?.to_string();
        let meta = self.storage.stat(&name).map_err(storage_err)?;

        let meta = match meta {
            Some(m) => m,
            None => {
                self.cipher.send_message(stream, msg_type::CANCEL, &[])?;
                return Ok(());
            }
        };

        self.cipher.send_message(stream, msg_type::FILE_METADATA, &encode_file_metadata(&meta)?)?;
        let (t, _) = self.cipher.recv_message(stream)?;
        match t {
            msg_type::CONFIRM => {}
            msg_type::CANCEL => return Ok(()),
            other => return Err(wire::classify_unexpected(other)),
        }

        self.storage.delete(&name).map_err(storage_err)?;
        self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;
        Ok(())
    }

    fn handle_rename<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        match self.run_rename(stream, payload) {
            Ok(()) => Ok(()),
            Err(e) => self.recover(stream, e),
        }
    }

    fn run_rename<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        let req = decode_rename_request(payload)?;
        let old_name = crate::validate::validate_filename(&req.old_name)?.to_string();
        let new_name = crate::validate::validate_filename(&req.new_name)?.to_string();

        if self.storage.stat(&old_name).map_err(storage_err)?.is_none() {
            self.cipher.send_message(stream, msg_type::CANCEL, &[])?;
            return Ok(());
        }
        if self.storage.stat(&new_name).map_err(storage_err)?.is_some() {
            self.cipher.send_message(stream, msg_type::CANCEL, &[])?;
            return Ok(());
        }

        self.storage.rename(&old_name, &new_name).map_err(storage_err)?;
        self.cipher.send_message(stream, msg_type::COMPLETED, &[])?;
        Ok(())
    }

    fn handle_list<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        match self.run_list(stream, payload) {
            Ok(()) => Ok(()),
            Err(e) => self.recover(stream, e),
        }
    }

    fn run_list<S: Read + Write>(&mut self, stream: &mut S, payload: &[u8]) -> Result<(), SessionError> {
        if !payload.is_empty() {
            return Err(SessionError::MalformedMessage);
        }
        let entries = self.storage.list().map_err(storage_err)?;
        let serialized = serialize_listing(&entries)?;
        let total = serialized.len() as u64;

        self.cipher.send_message(stream, msg_type::LIST_SIZE, &encode_list_size(total))?;
        self.cipher.send_raw_stream(stream, &mut std::io::Cursor::new(serialized), total)?;

        let (t, _) = self.cipher.recv_message(stream)?;
        if t != msg_type::COMPLETED {
            return Err(wire::classify_unexpected(t));
        }
        Ok(())
    }
}

/// Serializes a directory listing as a flat sequence of length-prefixed
/// [`FileMetadata`] records, streamed to the client under a single raw-mode
/// AEAD context (§4.3 List).
fn serialize_listing(entries: &[FileMetadata]) -> Result<Vec<u8>, SessionError> {
    let mut buf = Vec::new();
    for entry in entries {
        buf.extend_from_slice(&encode_file_metadata(entry)?);
    }
    Ok(buf)
}
