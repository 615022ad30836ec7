//! Frame decoding and encoding.
//!
//! A [`Frame`] is one complete event-stream message: prelude, header records,
//! JSON payload and trailing message CRC. Decoding is a pure function of the
//! input bytes and either yields the whole frame or fails without partial
//! results.
//!
//! # Example
//!
//! ```
//! use eventstream_answer::protocol::{build_frame, Frame, HeaderRecord};
//! use serde_json::json;
//!
//! let headers = vec![HeaderRecord::string(":event-type", "trace")];
//! let bytes = build_frame(&headers, &json!({"ok": true})).unwrap();
//!
//! let frame = Frame::decode(&bytes).unwrap();
//! assert_eq!(frame.event_type(), Some("trace"));
//! assert_eq!(frame.payload["ok"], true);
//! ```

use serde_json::Value;

use super::checksum;
use super::cursor::Cursor;
use super::header::{decode_headers, encode_headers, HeaderRecord};
use super::wire_format::{
    headers, Prelude, DEFAULT_MAX_FRAME_SIZE, MESSAGE_CRC_SIZE, MIN_FRAME_SIZE, PRELUDE_SIZE,
};
use crate::answer::{self, AnswerMatch};
use crate::codec::JsonCodec;
use crate::error::{EventStreamError, Result};

/// Options controlling frame decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Recompute and compare both CRCs. Off by default.
    pub verify_checksums: bool,
    /// Largest `total_length` accepted.
    pub max_frame_size: u32,
}

impl DecodeOptions {
    /// Default options: checksums stored but not verified, 16 MiB limit.
    pub fn new() -> Self {
        Self {
            verify_checksums: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Default options with checksum verification turned on.
    pub fn strict() -> Self {
        Self::new().verify_checksums(true)
    }

    /// Enable or disable checksum verification.
    pub fn verify_checksums(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }

    /// Set the maximum accepted frame size.
    pub fn max_frame_size(mut self, max: u32) -> Self {
        self.max_frame_size = max;
        self
    }

    pub(crate) fn check_frame_size(&self, total_length: u32) -> Result<()> {
        if total_length > self.max_frame_size {
            return Err(EventStreamError::FrameTooLarge {
                total_length,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded event-stream frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Total frame length in bytes.
    pub total_length: u32,
    /// Length of the header section in bytes.
    pub headers_length: u32,
    /// Prelude CRC as stored on the wire.
    pub prelude_crc: u32,
    /// Header records in wire order.
    pub headers: Vec<HeaderRecord>,
    /// Decoded JSON payload.
    pub payload: Value,
    /// Message CRC as stored on the wire.
    pub message_crc: u32,
}

impl Frame {
    /// Decode a frame from the start of `buf` with default options.
    ///
    /// Bytes after `total_length` are ignored.
    ///
    /// # Errors
    ///
    /// - `BufferTooShort` if `buf` is under 12 bytes or shorter than `total_length`
    /// - `MalformedHeaders` if the header section does not fit in the frame
    /// - `MalformedHeader` if a record runs past the header section
    /// - `PayloadDecode` if the payload is not UTF-8 JSON
    pub fn decode(buf: &[u8]) -> Result<Self> {
        Self::decode_with(buf, &DecodeOptions::new())
    }

    /// Decode a frame from the start of `buf`.
    pub fn decode_with(buf: &[u8], options: &DecodeOptions) -> Result<Self> {
        let prelude = Prelude::decode(buf)?;
        options.check_frame_size(prelude.total_length)?;
        prelude.validate(buf.len())?;

        let headers = decode_headers(buf, PRELUDE_SIZE, prelude.headers_end())?;

        let payload_start = prelude.headers_end();
        let payload_end = prelude.payload_end();
        let payload = JsonCodec::decode_value(&buf[payload_start..payload_end], payload_start)?;

        let message_crc = Cursor::new(buf, payload_end, payload_end + MESSAGE_CRC_SIZE)
            .read_u32_be()
            .map_err(|_| EventStreamError::BufferTooShort {
                needed: payload_end + MESSAGE_CRC_SIZE,
                available: buf.len(),
            })?;

        if options.verify_checksums {
            checksum::verify(buf, &prelude, message_crc)?;
        }

        Ok(Self {
            total_length: prelude.total_length,
            headers_length: prelude.headers_length,
            prelude_crc: prelude.prelude_crc,
            headers,
            payload,
            message_crc,
        })
    }

    /// Check the stored CRCs of this frame against the bytes it was decoded from.
    pub fn verify_checksums(&self, buf: &[u8]) -> Result<()> {
        let prelude = self.prelude();
        prelude.validate(buf.len())?;
        checksum::verify(buf, &prelude, self.message_crc)
    }

    /// The prelude this frame was decoded from.
    pub fn prelude(&self) -> Prelude {
        Prelude::new(self.total_length, self.headers_length, self.prelude_crc)
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.prelude().payload_len()
    }

    /// First header with the given name.
    pub fn header(&self, name: &str) -> Option<&HeaderRecord> {
        self.headers.iter().find(|h| h.name == name)
    }

    /// Value of the first string header with the given name.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(|h| h.value.as_str())
    }

    /// `:event-type` header.
    #[inline]
    pub fn event_type(&self) -> Option<&str> {
        self.header_str(headers::EVENT_TYPE)
    }

    /// `:message-type` header.
    #[inline]
    pub fn message_type(&self) -> Option<&str> {
        self.header_str(headers::MESSAGE_TYPE)
    }

    /// `:content-type` header.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(headers::CONTENT_TYPE)
    }

    /// Check if this frame carries a modelled exception.
    #[inline]
    pub fn is_exception(&self) -> bool {
        self.message_type() == Some("exception")
    }

    /// Check if this frame carries a service error.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.message_type() == Some("error")
    }

    /// Last tagged answer in the payload's assistant messages.
    pub fn answer(&self) -> Result<String> {
        answer::extract_answer(&self.payload)
    }

    /// All tagged answers in the payload's assistant messages, in order.
    pub fn answers(&self) -> Result<Vec<String>> {
        answer::extract_all_answers(&self.payload)
    }

    /// Run `f` over every answer match without copying them out.
    pub fn with_answers<R>(&self, f: impl FnOnce(&[AnswerMatch<'_>]) -> R) -> Result<R> {
        let transcript = answer::assistant_transcript(&self.payload)?;
        let matches = answer::find_answers(&transcript);
        Ok(f(&matches))
    }
}

/// Build a complete frame as a single byte vector.
///
/// Writes the prelude, header records, JSON payload and both CRCs.
///
/// # Errors
///
/// Returns `Json` if the payload cannot be serialized, `MalformedHeader` if
/// a header name or value is too long for its length field, or
/// `FrameTooLarge` if the frame would not fit a 32-bit length.
pub fn build_frame<T: serde::Serialize>(headers: &[HeaderRecord], payload: &T) -> Result<Vec<u8>> {
    let payload = JsonCodec::encode(payload)?;
    build_frame_raw(headers, &payload)
}

/// Build a frame around an already-serialized payload.
///
/// The payload is copied verbatim, so this can also produce frames whose
/// payload is not valid JSON. Fails like [`build_frame`] otherwise.
pub fn build_frame_raw(headers: &[HeaderRecord], payload: &[u8]) -> Result<Vec<u8>> {
    let header_bytes = encode_headers(headers)?;
    let total = MIN_FRAME_SIZE + header_bytes.len() + payload.len();

    let total_length = u32::try_from(total).map_err(|_| EventStreamError::FrameTooLarge {
        total_length: u32::MAX,
        max: u32::MAX,
    })?;
    // header_bytes.len() < total, so this cannot truncate.
    let headers_length = header_bytes.len() as u32;

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&total_length.to_be_bytes());
    buf.extend_from_slice(&headers_length.to_be_bytes());
    let prelude_crc = checksum::prelude_crc(&buf);
    buf.extend_from_slice(&prelude_crc.to_be_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(payload);
    let message_crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&message_crc.to_be_bytes());

    debug_assert_eq!(buf.len(), total);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::HeaderValueType;
    use serde_json::json;

    fn sample_headers() -> Vec<HeaderRecord> {
        vec![
            HeaderRecord::string(":event-type", "trace"),
            HeaderRecord::string(":content-type", "application/json"),
            HeaderRecord::string(":message-type", "event"),
        ]
    }

    #[test]
    fn test_decode_built_frame() {
        let payload = json!({"trace": {"step": 1}, "agentId": "A1"});
        let bytes = build_frame(&sample_headers(), &payload).unwrap();

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.total_length as usize, bytes.len());
        assert_eq!(frame.headers, sample_headers());
        assert_eq!(frame.payload, payload);
        assert_eq!(frame.event_type(), Some("trace"));
        assert_eq!(frame.content_type(), Some("application/json"));
        assert_eq!(frame.message_type(), Some("event"));
        assert!(!frame.is_exception());
        assert!(!frame.is_error());
    }

    #[test]
    fn test_length_invariant_holds() {
        let bytes = build_frame(&sample_headers(), &json!([1, 2, 3])).unwrap();
        let frame = Frame::decode(&bytes).unwrap();

        assert_eq!(
            PRELUDE_SIZE + frame.headers_length as usize + frame.payload_len() + MESSAGE_CRC_SIZE,
            frame.total_length as usize
        );
        assert_eq!(frame.payload_len(), b"[1,2,3]".len());
    }

    #[test]
    fn test_no_headers() {
        let bytes = build_frame(&[], &json!({})).unwrap();
        let frame = Frame::decode(&bytes).unwrap();

        assert!(frame.headers.is_empty());
        assert_eq!(frame.headers_length, 0);
        assert_eq!(frame.event_type(), None);
    }

    #[test]
    fn test_checksums_recorded_not_verified_by_default() {
        let mut bytes = build_frame(&sample_headers(), &json!({"a": 1})).unwrap();
        let len = bytes.len();
        bytes[len - 1] ^= 0xFF;
        bytes[11] ^= 0xFF;

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(
            frame.message_crc,
            u32::from_be_bytes(bytes[len - 4..].try_into().unwrap())
        );
        assert_eq!(
            frame.prelude_crc,
            u32::from_be_bytes(bytes[8..12].try_into().unwrap())
        );
        assert!(frame.verify_checksums(&bytes).is_err());
    }

    #[test]
    fn test_strict_mode_rejects_corruption() {
        let bytes = build_frame(&sample_headers(), &json!({"a": 1})).unwrap();
        assert!(Frame::decode_with(&bytes, &DecodeOptions::strict()).is_ok());

        // Flip a payload byte inside a string so the JSON stays valid.
        let mut corrupted = bytes.clone();
        // payload is `{"a":1}`; the key sits 5 bytes before the CRC
        let pos = corrupted.len() - 4 - 5;
        assert_eq!(corrupted[pos], b'a');
        corrupted[pos] = b'b';

        assert!(Frame::decode(&corrupted).is_ok());
        let err = Frame::decode_with(&corrupted, &DecodeOptions::strict()).unwrap_err();
        assert!(matches!(
            err,
            EventStreamError::ChecksumMismatch {
                kind: crate::error::ChecksumKind::Message,
                ..
            }
        ));
    }

    #[test]
    fn test_buffer_under_prelude() {
        for len in 0..PRELUDE_SIZE {
            let buf = vec![0u8; len];
            assert!(matches!(
                Frame::decode(&buf),
                Err(EventStreamError::BufferTooShort { .. })
            ));
        }
    }

    #[test]
    fn test_declared_total_exceeds_buffer() {
        let bytes = build_frame(&sample_headers(), &json!({"a": 1})).unwrap();
        let truncated = &bytes[..bytes.len() - 1];

        let err = Frame::decode(truncated).unwrap_err();
        assert!(matches!(err, EventStreamError::BufferTooShort { .. }));
        assert_eq!(err.stage(), crate::error::DecodeStage::Prelude);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = build_frame(&sample_headers(), &json!({"a": 1})).unwrap();
        bytes.extend_from_slice(b"garbage after frame");

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.payload, json!({"a": 1}));
    }

    #[test]
    fn test_max_frame_size() {
        let bytes = build_frame(&sample_headers(), &json!({"a": 1})).unwrap();
        let opts = DecodeOptions::new().max_frame_size(16);

        let err = Frame::decode_with(&bytes, &opts).unwrap_err();
        assert!(matches!(err, EventStreamError::FrameTooLarge { max: 16, .. }));
    }

    #[test]
    fn test_header_overshoots_headers_length() {
        let mut bytes = build_frame(&sample_headers(), &json!({"a": 1})).unwrap();
        // Shrink declared header length by one byte: the last record now
        // runs past the header section.
        let hl = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) - 1;
        bytes[4..8].copy_from_slice(&hl.to_be_bytes());

        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, EventStreamError::MalformedHeader { .. }));
        assert_eq!(err.stage(), crate::error::DecodeStage::Headers);
    }

    #[test]
    fn test_headers_length_beyond_frame() {
        let mut bytes = build_frame(&[], &json!({})).unwrap();
        bytes[4..8].copy_from_slice(&1000u32.to_be_bytes());

        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, EventStreamError::MalformedHeaders { offset: 12, .. }));
    }

    #[test]
    fn test_oversized_header_fields_rejected_when_building() {
        let long_name = vec![HeaderRecord::string("x".repeat(256), "v")];
        let err = build_frame(&long_name, &json!({})).unwrap_err();
        assert!(matches!(err, EventStreamError::MalformedHeader { offset: 0, .. }));
        assert_eq!(err.stage(), crate::error::DecodeStage::Headers);

        let long_value = vec![
            HeaderRecord::string(":event-type", "chunk"),
            HeaderRecord::string("body", "v".repeat(65536)),
        ];
        let err = build_frame_raw(&long_value, b"{}").unwrap_err();
        match err {
            EventStreamError::MalformedHeader { offset, reason } => {
                assert_eq!(offset, 4 + 11 + 5);
                assert!(reason.contains("65536"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_payload() {
        let bytes = build_frame_raw(&sample_headers(), b"{invalid").unwrap();

        let err = Frame::decode(&bytes).unwrap_err();
        let header_len = encode_headers(&sample_headers()).unwrap().len();
        match err {
            EventStreamError::PayloadDecode { offset, reason } => {
                assert_eq!(offset, PRELUDE_SIZE + header_len);
                assert!(reason.contains("{invalid"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_payload() {
        let bytes = build_frame_raw(&[], b"\"\xC3\x28\"").unwrap();
        assert!(matches!(
            Frame::decode(&bytes),
            Err(EventStreamError::PayloadDecode { .. })
        ));
    }

    #[test]
    fn test_non_string_header_in_frame() {
        let headers = vec![
            HeaderRecord::raw("seq", HeaderValueType::Long.as_u8(), 7u64.to_be_bytes().to_vec()),
            HeaderRecord::string(":event-type", "chunk"),
        ];
        let bytes = build_frame(&headers, &json!(null)).unwrap();

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.headers, headers);
        assert_eq!(frame.header("seq").unwrap().value.as_bytes(), &7u64.to_be_bytes());
        assert_eq!(frame.header_str("seq"), None);
        assert_eq!(frame.event_type(), Some("chunk"));
    }

    #[test]
    fn test_exception_frame() {
        let headers = vec![
            HeaderRecord::string(":message-type", "exception"),
            HeaderRecord::string(":exception-type", "throttlingException"),
        ];
        let bytes = build_frame(&headers, &json!({"message": "slow down"})).unwrap();

        let frame = Frame::decode(&bytes).unwrap();
        assert!(frame.is_exception());
        assert_eq!(frame.header_str(headers::EXCEPTION_TYPE), Some("throttlingException"));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let bytes = build_frame(&sample_headers(), &json!({"x": [1, {"y": "z"}]})).unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap(), Frame::decode(&bytes).unwrap());
    }

    #[test]
    fn test_frame_answer_accessors() {
        let text = json!({"messages": [
            {"role": "assistant", "content": "<answer>A</answer>"},
            {"role": "assistant", "content": "<answer>B</answer>"},
        ]})
        .to_string();
        let payload = json!({"trace": {"orchestrationTrace": {"modelInvocationInput": {"text": text}}}});
        let bytes = build_frame(&sample_headers(), &payload).unwrap();

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.answer().unwrap(), "<answer>B</answer>");
        assert_eq!(
            frame.answers().unwrap(),
            vec!["<answer>A</answer>", "<answer>B</answer>"]
        );
        let inner = frame
            .with_answers(|m| m.iter().map(|a| a.inner.to_string()).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(inner, vec!["A", "B"]);
    }
}
