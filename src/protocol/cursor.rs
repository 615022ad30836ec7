//! Bounds-checked read cursor over a byte slice.
//!
//! Every read either returns the value and advances, or fails with
//! [`OutOfBounds`] and leaves the position untouched. Callers map the
//! failure onto the error kind of their own decode stage.
//!
//! All multi-byte integers are Big Endian.

use std::str::Utf8Error;

/// A read would pass the end of the cursor's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutOfBounds {
    /// Absolute offset where the read started.
    pub at: usize,
    /// Bytes the read needed.
    pub needed: usize,
    /// Bytes left in the window.
    pub remaining: usize,
}

/// Failure of [`Cursor::read_utf8`].
#[derive(Debug)]
pub(crate) enum ReadStrError {
    Bounds(OutOfBounds),
    Utf8 { at: usize, source: Utf8Error },
}

/// Forward-only reader over `buf[..end]`.
///
/// Positions are absolute offsets into `buf`, so error messages can point
/// at the exact byte inside the original frame.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor over `buf[start..end]`. `end` is clamped to `buf.len()`.
    pub fn new(buf: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(buf.len());
        Self {
            buf,
            pos: start.min(end),
            end,
        }
    }

    /// Current absolute offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the window end.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Take the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], OutOfBounds> {
        if len > self.remaining() {
            return Err(OutOfBounds {
                at: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, OutOfBounds> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, OutOfBounds> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read `len` bytes and validate them as UTF-8.
    ///
    /// On a UTF-8 failure the cursor is rewound to where the read began.
    pub fn read_utf8(&mut self, len: usize) -> Result<&'a str, ReadStrError> {
        let at = self.pos;
        let bytes = self.read_bytes(len).map_err(ReadStrError::Bounds)?;
        std::str::from_utf8(bytes).map_err(|source| {
            self.pos = at;
            ReadStrError::Utf8 { at, source }
        })
    }
}
