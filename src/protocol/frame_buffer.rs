//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for buffer management. Implements a state machine
//! for splitting a byte stream of back-to-back frames:
//! - `WaitingForLength`: Need the 4-byte total length
//! - `WaitingForFrame`: Length known, need N more bytes
//!
//! # Example
//!
//! ```
//! use eventstream_answer::protocol::{build_frame, FrameBuffer, HeaderRecord};
//! use serde_json::json;
//!
//! let bytes = build_frame(&[HeaderRecord::string(":event-type", "chunk")], &json!({})).unwrap();
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&bytes[..10]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[10..]).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

use bytes::BytesMut;

use super::frame::{DecodeOptions, Frame};
use super::wire_format::MIN_FRAME_SIZE;
use crate::error::{EventStreamError, Result};

/// Size of the total-length field at the start of every frame.
const LENGTH_FIELD_SIZE: usize = 4;

/// State machine for frame splitting.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the 4-byte total length.
    WaitingForLength,
    /// Total length known, waiting for the rest of the frame.
    WaitingForFrame { total_length: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Frames are decoded with [`Frame::decode_with`] as soon as all of their
/// bytes have arrived.
pub struct FrameBuffer {
    /// Accumulated bytes.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Decode options applied to every frame.
    options: DecodeOptions,
}

impl FrameBuffer {
    /// Create a new frame buffer with default options.
    ///
    /// Default capacity: 64KB.
    pub fn new() -> Self {
        Self::with_options(DecodeOptions::default())
    }

    /// Create a new frame buffer with custom decode options.
    pub fn with_options(options: DecodeOptions) -> Self {
        Self::with_capacity_and_options(64 * 1024, options)
    }

    /// Create a new frame buffer with custom capacity and decode options.
    pub fn with_capacity_and_options(capacity: usize, options: DecodeOptions) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForLength,
            options,
        }
    }

    /// Push data into the buffer and decode all complete frames.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns error if a declared length is invalid or a complete frame
    /// fails to decode. The buffer is cleared; frames decoded earlier in
    /// the same call are dropped.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();

        loop {
            match self.try_extract_one() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            }
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was decoded
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on an invalid length or a frame decode failure
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForLength => {
                if self.buffer.len() < LENGTH_FIELD_SIZE {
                    return Ok(None);
                }

                let total_length =
                    u32::from_be_bytes([self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]]);

                if (total_length as usize) < MIN_FRAME_SIZE {
                    return Err(EventStreamError::BufferTooShort {
                        needed: MIN_FRAME_SIZE,
                        available: total_length as usize,
                    });
                }

                if let Err(e) = self.options.check_frame_size(total_length) {
                    tracing::debug!("Rejecting frame of {} bytes", total_length);
                    return Err(e);
                }

                self.state = State::WaitingForFrame {
                    total_length: total_length as usize,
                };

                self.try_extract_one()
            }

            State::WaitingForFrame { total_length } => {
                if self.buffer.len() < total_length {
                    return Ok(None);
                }

                let bytes = self.buffer.split_to(total_length).freeze();
                self.state = State::WaitingForLength;

                let frame = Frame::decode_with(&bytes, &self.options)?;
                tracing::trace!(
                    "Decoded frame: {} bytes, {} headers, event type {:?}",
                    frame.total_length,
                    frame.headers.len(),
                    frame.event_type()
                );

                Ok(Some(frame))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Declared total length of the frame currently being assembled.
    ///
    /// `None` until the 4-byte length field of the next frame has arrived.
    pub fn pending_frame_len(&self) -> Option<usize> {
        match self.state {
            State::WaitingForLength => None,
            State::WaitingForFrame { total_length } => Some(total_length),
        }
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForFrame { .. } => "WaitingForFrame",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, build_frame_raw, HeaderRecord};
    use serde_json::json;

    /// Helper to create a valid frame as bytes.
    fn make_frame_bytes(event_type: &str, payload: serde_json::Value) -> Vec<u8> {
        build_frame(&[HeaderRecord::string(":event-type", event_type)], &payload).unwrap()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes("chunk", json!({"n": 1}));

        let frames = buffer.push(&frame_bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type(), Some("chunk"));
        assert_eq!(frames[0].payload, json!({"n": 1}));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = Vec::new();
        for i in 1..=3 {
            combined.extend(make_frame_bytes("chunk", json!({ "n": i })));
        }

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload["n"], 1);
        assert_eq!(frames[1].payload["n"], 2);
        assert_eq!(frames[2].payload["n"], 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_length() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes("chunk", json!({}));

        let frames = buffer.push(&frame_bytes[..3]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForLength");

        let frames = buffer.push(&frame_bytes[3..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_body() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes("trace", json!({"text": "a longer payload that arrives in pieces"}));

        let frames = buffer.push(&frame_bytes[..20]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForFrame");

        let frames = buffer.push(&frame_bytes[20..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type(), Some("trace"));
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes("chunk", json!("hi"));

        let mut all_frames = Vec::new();
        for byte in &frame_bytes {
            all_frames.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload, json!("hi"));
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut buffer = FrameBuffer::new();

        let frame1 = make_frame_bytes("first", json!(1));
        let frame2 = make_frame_bytes("second", json!(2));

        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..5]);

        let frames = buffer.push(&data).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type(), Some("first"));
        assert_eq!(buffer.state_name(), "WaitingForFrame");

        let frames = buffer.push(&frame2[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type(), Some("second"));
    }

    #[test]
    fn test_max_frame_size_validation() {
        let mut buffer = FrameBuffer::with_options(DecodeOptions::new().max_frame_size(100));

        let result = buffer.push(&1000u32.to_be_bytes());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_length_below_minimum() {
        let mut buffer = FrameBuffer::new();
        let result = buffer.push(&8u32.to_be_bytes());
        assert!(matches!(result, Err(EventStreamError::BufferTooShort { .. })));
    }

    #[test]
    fn test_bad_frame_clears_buffer() {
        let mut buffer = FrameBuffer::new();
        let mut data = build_frame_raw(&[], b"{invalid").unwrap();
        data.extend(make_frame_bytes("chunk", json!({})));

        let result = buffer.push(&data);
        assert!(matches!(result, Err(EventStreamError::PayloadDecode { .. })));
        assert!(buffer.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForLength");
    }

    #[test]
    fn test_strict_options_applied() {
        let mut bytes = make_frame_bytes("chunk", json!({}));
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        assert_eq!(FrameBuffer::new().push(&bytes).unwrap().len(), 1);

        let mut strict = FrameBuffer::with_options(DecodeOptions::strict());
        assert!(matches!(
            strict.push(&bytes),
            Err(EventStreamError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes("chunk", json!({}));
        buffer.push(&frame_bytes[..8]).unwrap();

        assert_eq!(buffer.state_name(), "WaitingForFrame");
        assert_eq!(buffer.len(), 8);

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForLength");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_pending_frame_len() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes("chunk", json!({}));
        assert_eq!(buffer.pending_frame_len(), None);

        buffer.push(&frame_bytes[..3]).unwrap();
        assert_eq!(buffer.pending_frame_len(), None);

        buffer.push(&frame_bytes[3..10]).unwrap();
        assert_eq!(buffer.pending_frame_len(), Some(frame_bytes.len()));

        buffer.push(&frame_bytes[10..]).unwrap();
        assert_eq!(buffer.pending_frame_len(), None);
    }
}
