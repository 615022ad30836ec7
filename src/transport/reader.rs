//! Async frame reader.
//!
//! Reads back-to-back frames from any `AsyncRead` source, such as the body
//! of a streaming agent invocation response.
//!
//! # Example
//!
//! ```ignore
//! use eventstream_answer::transport::FrameReader;
//!
//! let mut reader = FrameReader::new(body);
//! while let Some(frame) = reader.next_frame().await? {
//!     if let Ok(answer) = frame.answer() {
//!         println!("{}", answer);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{EventStreamError, Result};
use crate::protocol::{DecodeOptions, Frame, FrameBuffer, MIN_FRAME_SIZE};

/// Read buffer size.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Decodes frames from an async byte source.
pub struct FrameReader<R> {
    reader: R,
    frame_buffer: FrameBuffer,
    ready: VecDeque<Frame>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a reader with default decode options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    /// Create a reader with custom decode options.
    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Self {
            reader,
            frame_buffer: FrameBuffer::with_options(options),
            ready: VecDeque::new(),
            buf: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the source ends on a frame boundary.
    ///
    /// # Errors
    ///
    /// - `Io` if the source fails
    /// - `BufferTooShort` if the source ends in the middle of a frame. `needed`
    ///   is the frame's declared total length, or the minimum frame size if
    ///   the length field itself was cut off.
    /// - any frame decode error
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }

            let n = self.reader.read(&mut self.buf).await?;

            if n == 0 {
                if self.frame_buffer.is_empty() {
                    return Ok(None);
                }
                let available = self.frame_buffer.len();
                let needed = self
                    .frame_buffer
                    .pending_frame_len()
                    .unwrap_or(MIN_FRAME_SIZE);
                tracing::debug!(
                    "Stream ended with {} of {} frame bytes",
                    available,
                    needed
                );
                self.frame_buffer.clear();
                return Err(EventStreamError::BufferTooShort { needed, available });
            }

            let frames = self.frame_buffer.push(&self.buf[..n])?;
            self.ready.extend(frames);
        }
    }

    /// Read every remaining frame.
    pub async fn collect_frames(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame().await? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Read to the end and return the last tagged answer seen in any frame.
    ///
    /// Frames without an answer are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AnswerNotFound` if no frame carried an answer.
    pub async fn last_answer(&mut self) -> Result<String> {
        let mut last = None;
        while let Some(frame) = self.next_frame().await? {
            if let Ok(answer) = frame.answer() {
                last = Some(answer);
            }
        }
        last.ok_or_else(|| {
            EventStreamError::answer_not_found("no frame in the stream carried an <answer> segment")
        })
    }

    /// Consume the reader and return the underlying source.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
