//! CRC-32 checksums carried by a frame.
//!
//! The prelude CRC covers bytes `0..8` (both length fields). The message CRC
//! covers every byte before the trailing 4, prelude CRC included.
//!
//! Decoding never checks these unless strict verification is requested.

use super::wire_format::{Prelude, MESSAGE_CRC_SIZE};
use crate::error::{ChecksumKind, EventStreamError, Result};

/// Bytes covered by the prelude CRC.
pub const PRELUDE_CRC_COVERAGE: usize = 8;

/// CRC-32 of the two length fields.
///
/// # Panics
///
/// Panics if `buf` is shorter than 8 bytes.
#[inline]
pub fn prelude_crc(buf: &[u8]) -> u32 {
    crc32fast::hash(&buf[..PRELUDE_CRC_COVERAGE])
}

/// CRC-32 of `buf[..total_length - 4]`.
///
/// # Panics
///
/// Panics if `total_length` is less than 4 or greater than `buf.len()`.
/// [`Prelude::validate`] rules out both.
#[inline]
pub fn message_crc(buf: &[u8], total_length: usize) -> u32 {
    crc32fast::hash(&buf[..total_length - MESSAGE_CRC_SIZE])
}

/// Compare both stored checksums with freshly computed ones.
///
/// `buf` must already have passed [`Prelude::validate`].
pub fn verify(buf: &[u8], prelude: &Prelude, stored_message_crc: u32) -> Result<()> {
    let computed = prelude_crc(buf);
    if computed != prelude.prelude_crc {
        return Err(EventStreamError::ChecksumMismatch {
            kind: ChecksumKind::Prelude,
            offset: PRELUDE_CRC_COVERAGE,
            stored: prelude.prelude_crc,
            computed,
        });
    }

    let total = prelude.total_length as usize;
    let computed = message_crc(buf, total);
    if computed != stored_message_crc {
        return Err(EventStreamError::ChecksumMismatch {
            kind: ChecksumKind::Message,
            offset: total - MESSAGE_CRC_SIZE,
            stored: stored_message_crc,
            computed,
        });
    }

    Ok(())
}
