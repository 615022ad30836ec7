//! Transport module - reading frames from async byte sources.

mod reader;

pub use reader::FrameReader;
