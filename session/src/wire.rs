//! Session message vocabulary (§4.3, §6). Every message is `{ type: u8,
//! type-specific fields }`; the type byte is part of the GCM plaintext
//! (`safecloud_session::frame::SessionCipher` drives the AEAD wrapper
//! around it), not separate framing.

use crate::error::SessionError;

pub mod msg_type {
    pub const FILE_UPLOAD_REQ: u8 = 1;
    pub const FILE_DOWNLOAD_REQ: u8 = 2;
    pub const FILE_DELETE_REQ: u8 = 3;
    pub const FILE_RENAME_REQ: u8 = 4;
    pub const FILE_LIST_REQ: u8 = 5;
    pub const CONFIRM: u8 = 6;
    pub const CANCEL: u8 = 7;
    pub const COMPLETED: u8 = 8;
    pub const BYE: u8 = 9;
    /// Carries a [`crate::wire::FileMetadata`]: the server's "existing file"
    /// notice on upload-overwrite, and its download/delete metadata
    /// announcements. Not named individually in the closed message
    /// vocabulary, which only says operations "send ... metadata"; this
    /// is the one concrete message type that carries it.
    pub const FILE_METADATA: u8 = 10;
    /// Announces the total byte size of the upcoming raw-mode stream for a
    /// directory listing (§4.3 List: "sends the total serialized size as a
    /// metadata message").
    pub const LIST_SIZE: u8 = 11;
}

pub mod err_type {
    pub const ERR_INTERNAL_ERROR: u8 = 20;
    pub const ERR_UNEXPECTED_SESS_MESSAGE: u8 = 21;
    pub const ERR_MALFORMED_SESS_MESSAGE: u8 = 22;
    pub const ERR_UNKNOWN_SESSMSG_TYPE: u8 = 23;
}

pub fn is_error_type(t: u8) -> bool {
    matches!(t, err_type::ERR_INTERNAL_ERROR..=err_type::ERR_UNKNOWN_SESSMSG_TYPE)
}

pub fn is_known_msg_type(t: u8) -> bool {
    matches!(
        t,
        msg_type::FILE_UPLOAD_REQ
            ..=msg_type::LIST_SIZE
    )
}

pub fn classify_unexpected(got: u8) -> SessionError {
    if is_error_type(got) {
        SessionError::PeerReported(got)
    } else if is_known_msg_type(got) {
        SessionError::UnexpectedMessage
    } else {
        SessionError::UnknownMsgType(got)
    }
}

/// File metadata per §6: `{ name_len: u16, name_bytes, size: u64, mtime:
/// u64, ctime: u64 }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub mtime: u64,
    pub ctime: u64,
}

fn write_name(buf: &mut Vec<u8>, name: &str) -> Result<(), SessionError> {
    let len = u16::try_from(name.len()).map_err(|_| SessionError::MalformedMessage)?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    Ok(())
}

fn read_name(buf: &[u8], offset: &mut usize) -> Result<String, SessionError> {
    if buf.len() < *offset + 2 {
        return Err(SessionError::MalformedMessage);
    }
    let len = u16::from_le_bytes([buf[*offset], buf[*offset + 1]]) as usize;
    *offset += 2;
    if buf.len() < *offset + len {
        return Err(SessionError::MalformedMessage);
    }
    let name = std::str::from_utf8(&buf[*offset..*offset + len])
        .map_err(|_| SessionError::MalformedMessage)?
        .to_string();
    *offset += len;
    Ok(name)
}

pub fn encode_file_metadata(meta: &FileMetadata) -> Result<Vec<u8>, SessionError> {
    let mut buf = Vec::with_capacity(2 + meta.name.len() + 24);
    write_name(&mut buf, &meta.name)?;
    buf.extend_from_slice(&meta.size.to_le_bytes());
    buf.extend_from_slice(&meta.mtime.to_le_bytes());
    buf.extend_from_slice(&meta.ctime.to_le_bytes());
    Ok(buf)
}

pub fn decode_file_metadata(payload: &[u8]) -> Result<FileMetadata, SessionError> {
    let mut offset = 0;
    let name = read_name(payload, &mut offset)?;
    if payload.len() != offset + 24 {
        return Err(SessionError::MalformedMessage);
    }
    let size = u64::from_le_bytes(payload[offset..offset + 8].try_into().unwrap());
    let mtime = u64::from_le_bytes(payload[offset + 8..offset + 16].try_into().unwrap());
    let ctime = u64::from_le_bytes(payload[offset + 16..offset + 24].try_into().unwrap());
    Ok(FileMetadata { name, size, mtime, ctime })
}

pub fn encode_list_size(total: u64) -> Vec<u8> {
    total.to_le_bytes().to_vec()
}

pub fn decode_list_size(payload: &[u8]) -> Result<u64, SessionError> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| SessionError::MalformedMessage)?;
    Ok(u64::from_le_bytes(bytes))
}

pub fn encode_name_only(name: &str) -> Result<Vec<u8>, SessionError> {
    let mut buf = Vec::with_capacity(2 + name.len());
    write_name(&mut buf, name)?;
    Ok(buf)
}

pub fn decode_name_only(payload: &[u8]) -> Result<String, SessionError> {
    let mut offset = 0;
    let name = read_name(payload, &mut offset)?;
    if offset != payload.len() {
        return Err(SessionError::MalformedMessage);
    }
    Ok(name)
}

pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
}

pub fn encode_rename_request(req: &RenameRequest) -> Result<Vec<u8>, SessionError> {
    let mut buf = Vec::new();
    write_name(&mut buf, &req.old_name)?;
    write_name(&mut buf, &req.new_name)?;
    Ok(buf)
}

pub fn decode_rename_request(payload: &[u8]) -> Result<RenameRequest, SessionError> {
    let mut offset = 0;
    let old_name = read_name(payload, &mut offset)?;
    let new_name = read_name(payload, &mut offset)?;
    if offset != payload.len() {
        return Err(SessionError::MalformedMessage);
    }
    Ok(RenameRequest { old_name, new_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_metadata_round_trip() {
        let meta = FileMetadata { name: "notes.txt".into(), size: 200, mtime: 111, ctime: 222 };
        let encoded = encode_file_metadata(&meta).unwrap();
        assert_eq!(decode_file_metadata(&encoded).unwrap(), meta);
    }

    #[test]
    fn rename_request_round_trip() {
        let req = RenameRequest { old_name: "a.txt".into(), new_name: "b.txt".into() };
        let encoded = encode_rename_request(&req).unwrap();
        let decoded = decode_rename_request(&encoded).unwrap();
        assert_eq!(decoded.old_name, "a.txt");
        assert_eq!(decoded.new_name, "b.txt");
    }

    #[test]
    fn list_size_round_trip() {
        let encoded = encode_list_size(123456);
        assert_eq!(decode_list_size(&encoded).unwrap(), 123456);
    }
}
