//! Key validation
//!
//! Keys are checked before any request leaves the client. The text protocol
//! splits commands on whitespace, so keys may not contain whitespace or
//! control bytes.

use crate::error::{CacheError, Result};

/// Check one key against the length limit and, when `verify_content` is set,
/// the character rules.
pub fn check_key(key: &[u8], max_length: usize, verify_content: bool) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > max_length {
        return Err(CacheError::InvalidKey(format!(
            "key is too long: {} bytes (max {})",
            key.len(),
            max_length
        )));
    }
    if verify_content {
        if let Some(pos) = key.iter().position(|&b| is_forbidden(b)) {
            return Err(CacheError::InvalidKey(format!(
                "key contains byte 0x{:02x} at offset {}",
                key[pos], pos
            )));
        }
    }
    Ok(())
}

fn is_forbidden(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte.is_ascii_control()
}
