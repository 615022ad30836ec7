//! Codec module - decoding of frame payloads.
//!
//! Frame payloads are UTF-8 JSON documents. [`JsonCodec`] turns the
//! payload span of a frame into a [`serde_json::Value`] (or any
//! `Deserialize` type) and back.
//!
//! # Example
//!
//! ```
//! use eventstream_answer::codec::JsonCodec;
//! use serde_json::json;
//!
//! let encoded = JsonCodec::encode(&json!({"bytes": "aGk="})).unwrap();
//! let decoded = JsonCodec::decode_value(&encoded, 0).unwrap();
//! assert_eq!(decoded["bytes"], "aGk=");
//! ```

mod json;

pub use json::JsonCodec;
