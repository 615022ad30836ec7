//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the event-stream binary envelope:
//! - 12-byte prelude encoding/decoding
//! - Header record parsing
//! - Frame decoding with optional CRC verification
//! - Frame buffer for accumulating partial reads

pub mod checksum;
mod cursor;
mod frame;
mod frame_buffer;
mod header;
mod wire_format;

pub use frame::{build_frame, build_frame_raw, DecodeOptions, Frame};
pub use frame_buffer::FrameBuffer;
pub use header::{decode_headers, encode_headers, HeaderRecord, HeaderValue};
pub use wire_format::{
    headers, HeaderValueType, Prelude, DEFAULT_MAX_FRAME_SIZE, HEADER_RECORD_OVERHEAD,
    MESSAGE_CRC_SIZE, MIN_FRAME_SIZE, PRELUDE_SIZE, STRING_VALUE_TYPE,
};
