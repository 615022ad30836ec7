//! Header record parsing and encoding.
//!
//! Every record carries a 2-byte value length regardless of its type tag,
//! so records of any type can be walked without interpreting them. Only
//! string-typed values are decoded as text.

use bytes::Bytes;

use super::cursor::{Cursor, OutOfBounds, ReadStrError};
use super::wire_format::{HeaderValueType, HEADER_RECORD_OVERHEAD, STRING_VALUE_TYPE};
use crate::error::{EventStreamError, Result};

/// Header value as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// String-typed value (tag 7), validated UTF-8.
    String(String),
    /// Any other tag. Bytes are kept as-is.
    Raw { value_type: u8, bytes: Bytes },
}

impl HeaderValue {
    /// Wire type tag.
    pub fn value_type(&self) -> u8 {
        match self {
            HeaderValue::String(_) => STRING_VALUE_TYPE,
            HeaderValue::Raw { value_type, .. } => *value_type,
        }
    }

    /// Value bytes as they appear on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            HeaderValue::String(s) => s.as_bytes(),
            HeaderValue::Raw { bytes, .. } => bytes,
        }
    }

    /// The string value, if this is a string-typed header.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            HeaderValue::Raw { .. } => None,
        }
    }
}

/// One decoded header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub name: String,
    pub value: HeaderValue,
}

impl HeaderRecord {
    /// Create a string-typed header.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: HeaderValue::String(value.into()),
        }
    }

    /// Create a header with an arbitrary type tag and raw value bytes.
    ///
    /// Tag 7 still produces a raw value here; use [`HeaderRecord::string`]
    /// for text headers.
    pub fn raw(name: impl Into<String>, value_type: u8, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: HeaderValue::Raw {
                value_type,
                bytes: bytes.into(),
            },
        }
    }

    /// Wire type tag.
    #[inline]
    pub fn value_type(&self) -> u8 {
        self.value.value_type()
    }

    /// Known type for the tag, if any.
    pub fn known_type(&self) -> Option<HeaderValueType> {
        HeaderValueType::from_u8(self.value_type())
    }

    /// Bytes this record occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_RECORD_OVERHEAD + self.name.len() + self.value.as_bytes().len()
    }

    /// Append the wire encoding of this record to `buf`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedHeader` if the name is longer than 255 bytes or the
    /// value longer than 65535 bytes. The offset is where the record would
    /// have started in `buf`; nothing is written.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<()> {
        let name = self.name.as_bytes();
        let value = self.value.as_bytes();
        let name_len = u8::try_from(name.len()).map_err(|_| EventStreamError::MalformedHeader {
            offset: buf.len(),
            reason: format!("name is {} bytes, at most {} fit", name.len(), u8::MAX),
        })?;
        let value_len =
            u16::try_from(value.len()).map_err(|_| EventStreamError::MalformedHeader {
                offset: buf.len(),
                reason: format!("value is {} bytes, at most {} fit", value.len(), u16::MAX),
            })?;

        buf.reserve(self.encoded_len());
        buf.push(name_len);
        buf.extend_from_slice(name);
        buf.push(self.value_type());
        buf.extend_from_slice(&value_len.to_be_bytes());
        buf.extend_from_slice(value);
        Ok(())
    }

    /// Decode one record starting at `offset`, reading no further than `end`.
    ///
    /// `end` is the end of the header region. Returns the record and the
    /// number of bytes it consumed, which is always
    /// `4 + name_length + value_length`.
    pub fn decode(buf: &[u8], offset: usize, end: usize) -> Result<(Self, usize)> {
        let mut cur = Cursor::new(buf, offset, end);

        let name_len = cur
            .read_u8()
            .map_err(|e| malformed(offset, "name length", e))?;
        let name = cur
            .read_utf8(name_len as usize)
            .map_err(|e| malformed_str(offset, "name", e))?
            .to_string();

        let value_type = cur
            .read_u8()
            .map_err(|e| malformed(offset, "value type", e))?;
        let value_len = cur
            .read_u16_be()
            .map_err(|e| malformed(offset, "value length", e))?;

        let value = if value_type == STRING_VALUE_TYPE {
            let s = cur
                .read_utf8(value_len as usize)
                .map_err(|e| malformed_str(offset, "value", e))?;
            HeaderValue::String(s.to_string())
        } else {
            let bytes = cur
                .read_bytes(value_len as usize)
                .map_err(|e| malformed(offset, "value", e))?;
            HeaderValue::Raw {
                value_type,
                bytes: Bytes::copy_from_slice(bytes),
            }
        };

        let consumed = cur.position() - offset;
        debug_assert_eq!(
            consumed,
            HEADER_RECORD_OVERHEAD + name_len as usize + value_len as usize
        );

        Ok((Self { name, value }, consumed))
    }
}

fn malformed(offset: usize, field: &str, e: OutOfBounds) -> EventStreamError {
    EventStreamError::MalformedHeader {
        offset,
        reason: format!(
            "{} needs {} bytes at offset {}, only {} left",
            field, e.needed, e.at, e.remaining
        ),
    }
}

fn malformed_str(offset: usize, field: &str, e: ReadStrError) -> EventStreamError {
    match e {
        ReadStrError::Bounds(oob) => malformed(offset, field, oob),
        ReadStrError::Utf8 { at, source } => EventStreamError::MalformedHeader {
            offset,
            reason: format!("{} at offset {} is not valid UTF-8: {}", field, at, source),
        },
    }
}

/// Decode all header records in `buf[start..end]`.
///
/// Records are read back to back until the region is consumed exactly.
pub fn decode_headers(buf: &[u8], start: usize, end: usize) -> Result<Vec<HeaderRecord>> {
    let mut headers = Vec::new();
    let mut offset = start;

    while offset < end {
        let (record, consumed) = HeaderRecord::decode(buf, offset, end)?;
        offset += consumed;
        headers.push(record);
    }

    Ok(headers)
}

/// Encode a sequence of header records back to back.
///
/// # Errors
///
/// Fails on the first record whose name or value does not fit its length
/// field. See [`HeaderRecord::encode_into`].
pub fn encode_headers(headers: &[HeaderRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(headers.iter().map(HeaderRecord::encoded_len).sum());
    for header in headers {
        header.encode_into(&mut buf)?;
    }
    Ok(buf)
}
