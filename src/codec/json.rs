//! JSON codec for frame payloads.
//!
//! Decoding runs in two steps so the error says which one failed: the
//! payload bytes must be UTF-8 (no BOM), then the text must parse as JSON.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{EventStreamError, Result};

/// Maximum number of payload characters quoted in a decode error.
const PREVIEW_CHARS: usize = 64;

/// JSON codec for payload bytes.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode payload bytes to a typed value.
    ///
    /// `offset` is the absolute position of `bytes` inside the frame and is
    /// reported in errors.
    ///
    /// # Errors
    ///
    /// Returns `PayloadDecode` if the bytes are not UTF-8 or not valid JSON
    /// for `T`.
    pub fn decode<T: DeserializeOwned>(bytes: &[u8], offset: usize) -> Result<T> {
        let text = std::str::from_utf8(bytes).map_err(|e| EventStreamError::PayloadDecode {
            offset: offset + e.valid_up_to(),
            reason: format!("payload is not valid UTF-8: {}", e),
        })?;

        serde_json::from_str(text).map_err(|e| EventStreamError::PayloadDecode {
            offset,
            reason: format!("payload is not valid JSON: {} (payload: {:?})", e, preview(text)),
        })
    }

    /// Decode payload bytes to an untyped JSON value.
    #[inline]
    pub fn decode_value(bytes: &[u8], offset: usize) -> Result<Value> {
        Self::decode(bytes, offset)
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
