//! # eventstream-answer
//!
//! Decoder for event-stream framed agent responses.
//!
//! Each response message is a length-prefixed binary frame carrying typed
//! header records and a JSON payload. Orchestration trace payloads embed the
//! model's own conversation as a JSON-encoded string, from which the last
//! `<answer>...</answer>` segment written by the assistant can be extracted.
//!
//! ## Layers
//!
//! - **protocol**: prelude, header records, frames, CRCs, incremental splitting
//! - **codec**: payload bytes to JSON
//! - **answer**: trace navigation and `<answer>` scanning
//! - **transport**: async reader over a byte stream of frames
//!
//! Decoding is pure and synchronous; nothing is logged on the decode path.
//! Errors carry the stage and byte offset at which decoding stopped.
//!
//! ## Example
//!
//! ```
//! use eventstream_answer::protocol::{build_frame, Frame, HeaderRecord};
//! use serde_json::json;
//!
//! let text = json!({"messages": [{"role": "assistant", "content": "<answer>42</answer>"}]});
//! let payload = json!({
//!     "trace": {"orchestrationTrace": {"modelInvocationInput": {"text": text.to_string()}}}
//! });
//! let bytes = build_frame(&[HeaderRecord::string(":event-type", "trace")], &payload).unwrap();
//!
//! let frame = Frame::decode(&bytes).unwrap();
//! assert_eq!(frame.answer().unwrap(), "<answer>42</answer>");
//! ```

pub mod answer;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

pub use answer::{extract_all_answers, extract_answer, find_answers, AnswerMatch};
pub use error::{DecodeStage, EventStreamError, Result};
pub use protocol::{DecodeOptions, Frame, FrameBuffer, HeaderRecord};
pub use transport::FrameReader;
