//! Client identity sanitization (§4.2 "Client identity handling"): the
//! server never trusts the raw bytes off the wire as a filesystem path
//! component.

use crate::error::HandshakeError;

const MAX_NAME_LEN: usize = 30;

/// Accepts `raw` only if it is 1..=30 ASCII alphanumeric/`-`/`_` characters.
/// Excluding `.` entirely rules out `.` and `..` without a special case, and
/// rules out hidden-file tricks on the storage pool as a side effect.
pub fn sanitize_client_name(raw: &str) -> Result<String, HandshakeError> {
    let trimmed = raw.trim_end_matches('\0');
    if trimmed.is_empty() || trimmed.len() > MAX_NAME_LEN {
        return Err(HandshakeError::MalformedMessage);
    }
    let safe = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !safe {
        return Err(HandshakeError::MalformedMessage);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_name() {
        assert_eq!(sanitize_client_name("alice").unwrap(), "alice");
    }

    #[test]
    fn strips_trailing_nul_padding() {
        assert_eq!(sanitize_client_name("alice\0\0\0").unwrap(), "alice");
    }

    #[test]
    fn rejects_empty_name() {
        assert!(sanitize_client_name("").is_err());
        assert!(sanitize_client_name("\0\0\0").is_err());
    }

    #[test]
    fn rejects_path_separators() {
        assert!(sanitize_client_name("../etc/passwd").is_err());
        assert!(sanitize_client_name("a/b").is_err());
    }

    #[test]
    fn rejects_over_length_name() {
        let long = "a".repeat(31);
        assert!(sanitize_client_name(&long).is_err());
    }
}
