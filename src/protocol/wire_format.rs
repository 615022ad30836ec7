//! Wire format constants and prelude encoding/decoding.
//!
//! A frame is laid out as:
//! ```text
//! ┌──────────────┬───────────────┬─────────────┬─────────┬─────────┬─────────────┐
//! │ Total length │ Headers length│ Prelude CRC │ Headers │ Payload │ Message CRC │
//! │ 4 bytes      │ 4 bytes       │ 4 bytes     │ N bytes │ M bytes │ 4 bytes     │
//! │ uint32 BE    │ uint32 BE     │ uint32 BE   │         │ JSON    │ uint32 BE   │
//! └──────────────┴───────────────┴─────────────┴─────────┴─────────┴─────────────┘
//! ```
//!
//! Each header record is:
//! ```text
//! ┌──────────┬──────────┬────────────┬──────────────┬──────────┐
//! │ Name len │ Name     │ Value type │ Value length │ Value    │
//! │ 1 byte   │ UTF-8    │ 1 byte     │ uint16 BE    │ bytes    │
//! └──────────┴──────────┴────────────┴──────────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use super::cursor::Cursor;
use crate::error::{EventStreamError, Result};

/// Prelude size in bytes (total length + headers length + prelude CRC).
pub const PRELUDE_SIZE: usize = 12;

/// Trailing message checksum size in bytes.
pub const MESSAGE_CRC_SIZE: usize = 4;

/// Smallest possible frame: prelude + message CRC, no headers, empty payload.
pub const MIN_FRAME_SIZE: usize = PRELUDE_SIZE + MESSAGE_CRC_SIZE;

/// Default maximum frame size accepted by streaming readers (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Fixed bytes in every header record besides name and value
/// (name length + value type + value length).
pub const HEADER_RECORD_OVERHEAD: usize = 4;

/// Well-known header names.
pub mod headers {
    /// Event name, e.g. `chunk` or `trace`.
    pub const EVENT_TYPE: &str = ":event-type";
    /// `event`, `exception` or `error`.
    pub const MESSAGE_TYPE: &str = ":message-type";
    /// MIME type of the payload.
    pub const CONTENT_TYPE: &str = ":content-type";
    /// Exception name when `:message-type` is `exception`.
    pub const EXCEPTION_TYPE: &str = ":exception-type";
    /// Error code when `:message-type` is `error`.
    pub const ERROR_CODE: &str = ":error-code";
    /// Error message when `:message-type` is `error`.
    pub const ERROR_MESSAGE: &str = ":error-message";
}

/// Header value type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderValueType {
    BoolTrue,
    BoolFalse,
    Byte,
    Short,
    Integer,
    Long,
    ByteArray,
    String,
    Timestamp,
    Uuid,
}

impl HeaderValueType {
    /// Map a wire tag onto a known type. Unknown tags return `None`.
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => HeaderValueType::BoolTrue,
            1 => HeaderValueType::BoolFalse,
            2 => HeaderValueType::Byte,
            3 => HeaderValueType::Short,
            4 => HeaderValueType::Integer,
            5 => HeaderValueType::Long,
            6 => HeaderValueType::ByteArray,
            7 => HeaderValueType::String,
            8 => HeaderValueType::Timestamp,
            9 => HeaderValueType::Uuid,
            _ => return None,
        })
    }

    /// Wire tag for this type.
    pub fn as_u8(self) -> u8 {
        match self {
            HeaderValueType::BoolTrue => 0,
            HeaderValueType::BoolFalse => 1,
            HeaderValueType::Byte => 2,
            HeaderValueType::Short => 3,
            HeaderValueType::Integer => 4,
            HeaderValueType::Long => 5,
            HeaderValueType::ByteArray => 6,
            HeaderValueType::String => 7,
            HeaderValueType::Timestamp => 8,
            HeaderValueType::Uuid => 9,
        }
    }
}

/// Wire tag of string-valued headers.
pub const STRING_VALUE_TYPE: u8 = 7;

/// Decoded prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prelude {
    /// Total frame length including prelude and trailing CRC.
    pub total_length: u32,
    /// Length of the concatenated header records.
    pub headers_length: u32,
    /// CRC of the first 8 bytes. Stored, checked only in strict mode.
    pub prelude_crc: u32,
}

impl Prelude {
    /// Create a new prelude.
    pub fn new(total_length: u32, headers_length: u32, prelude_crc: u32) -> Self {
        Self {
            total_length,
            headers_length,
            prelude_crc,
        }
    }

    /// Encode prelude to bytes (Big Endian).
    pub fn encode(&self) -> [u8; PRELUDE_SIZE] {
        let mut buf = [0u8; PRELUDE_SIZE];
        buf[0..4].copy_from_slice(&self.total_length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.headers_length.to_be_bytes());
        buf[8..12].copy_from_slice(&self.prelude_crc.to_be_bytes());
        buf
    }

    /// Decode the prelude from the start of `buf`.
    ///
    /// Only checks that 12 bytes are present; see [`Prelude::validate`] for
    /// the length checks against the buffer.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(buf, 0, buf.len());
        let too_short = |_| EventStreamError::BufferTooShort {
            needed: PRELUDE_SIZE,
            available: buf.len(),
        };
        Ok(Self {
            total_length: cur.read_u32_be().map_err(too_short)?,
            headers_length: cur.read_u32_be().map_err(too_short)?,
            prelude_crc: cur.read_u32_be().map_err(too_short)?,
        })
    }

    /// Check the declared lengths against each other and against `available` bytes.
    ///
    /// - `total_length` must cover prelude + message CRC and fit in `available`
    /// - the header region must end before the message CRC
    pub fn validate(&self, available: usize) -> Result<()> {
        let total = self.total_length as usize;

        if total < MIN_FRAME_SIZE {
            return Err(EventStreamError::BufferTooShort {
                needed: MIN_FRAME_SIZE,
                available: total,
            });
        }

        if total > available {
            return Err(EventStreamError::BufferTooShort {
                needed: total,
                available,
            });
        }

        if self.headers_end() > self.payload_end() {
            return Err(EventStreamError::MalformedHeaders {
                offset: PRELUDE_SIZE,
                reason: format!(
                    "headers length {} does not fit in frame of {} bytes",
                    self.headers_length, self.total_length
                ),
            });
        }

        Ok(())
    }

    /// Offset one past the last header byte.
    #[inline]
    pub fn headers_end(&self) -> usize {
        PRELUDE_SIZE + self.headers_length as usize
    }

    /// Offset of the trailing message CRC.
    #[inline]
    pub fn payload_end(&self) -> usize {
        (self.total_length as usize).saturating_sub(MESSAGE_CRC_SIZE)
    }

    /// Payload length implied by the prelude.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_end().saturating_sub(self.headers_end())
    }
}
