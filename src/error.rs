//! Error types for eventstream-answer.

use std::fmt;

use thiserror::Error;

/// Decode stage at which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// 12-byte prelude (lengths + prelude CRC).
    Prelude,
    /// Header record section.
    Headers,
    /// JSON payload.
    Payload,
    /// Prelude or message checksum.
    Checksum,
    /// Answer extraction from the decoded payload.
    Answer,
    /// Reading bytes from an async source.
    Transport,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeStage::Prelude => "prelude",
            DecodeStage::Headers => "headers",
            DecodeStage::Payload => "payload",
            DecodeStage::Checksum => "checksum",
            DecodeStage::Answer => "answer",
            DecodeStage::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// Which of the two frame checksums disagreed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// CRC over the 8 length bytes.
    Prelude,
    /// CRC over everything before the trailing 4 bytes.
    Message,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumKind::Prelude => f.write_str("prelude"),
            ChecksumKind::Message => f.write_str("message"),
        }
    }
}

/// Main error type for all decode operations.
#[derive(Debug, Error)]
pub enum EventStreamError {
    /// Buffer is smaller than the prelude, or smaller than the declared total length.
    #[error("Buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// A single header record runs past the header region or the buffer.
    #[error("Malformed header at offset {offset}: {reason}")]
    MalformedHeader { offset: usize, reason: String },

    /// The header section as a whole does not fit the frame.
    #[error("Malformed headers at offset {offset}: {reason}")]
    MalformedHeaders { offset: usize, reason: String },

    /// Payload span is not UTF-8 or not JSON.
    #[error("Payload decode error at offset {offset}: {reason}")]
    PayloadDecode { offset: usize, reason: String },

    /// No assistant answer could be extracted.
    #[error("Answer not found: {reason}")]
    AnswerNotFound { reason: String },

    /// Stored checksum disagrees with the computed one (strict mode only).
    #[error("{kind} checksum mismatch at offset {offset}: stored {stored:#010X}, computed {computed:#010X}")]
    ChecksumMismatch {
        kind: ChecksumKind,
        offset: usize,
        stored: u32,
        computed: u32,
    },

    /// Declared frame length exceeds the configured maximum.
    #[error("Frame size {total_length} exceeds maximum {max}")]
    FrameTooLarge { total_length: u32, max: u32 },

    /// JSON serialization error while building a payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading from a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EventStreamError {
    /// Stage of the decode pipeline that produced this error.
    pub fn stage(&self) -> DecodeStage {
        match self {
            EventStreamError::BufferTooShort { .. } | EventStreamError::FrameTooLarge { .. } => {
                DecodeStage::Prelude
            }
            EventStreamError::MalformedHeader { .. }
            | EventStreamError::MalformedHeaders { .. } => DecodeStage::Headers,
            EventStreamError::PayloadDecode { .. } | EventStreamError::Json(_) => {
                DecodeStage::Payload
            }
            EventStreamError::AnswerNotFound { .. } => DecodeStage::Answer,
            EventStreamError::ChecksumMismatch { .. } => DecodeStage::Checksum,
            EventStreamError::Io(_) => DecodeStage::Transport,
        }
    }

    /// Byte offset involved in the failure, where one applies.
    pub fn offset(&self) -> Option<usize> {
        match self {
            EventStreamError::MalformedHeader { offset, .. }
            | EventStreamError::MalformedHeaders { offset, .. }
            | EventStreamError::PayloadDecode { offset, .. }
            | EventStreamError::ChecksumMismatch { offset, .. } => Some(*offset),
            EventStreamError::BufferTooShort { available, .. } => Some(*available),
            _ => None,
        }
    }

    pub(crate) fn answer_not_found(reason: impl Into<String>) -> Self {
        EventStreamError::AnswerNotFound {
            reason: reason.into(),
        }
    }
}

/// Result type alias using EventStreamError.
pub type Result<T> = std::result::Result<T, EventStreamError>;
