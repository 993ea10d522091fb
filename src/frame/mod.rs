//! Length-prefixed framing of MessagePack values over async byte streams.
//!
//! Each frame is a 4-byte big-endian payload length followed by the payload,
//! which holds exactly one encoded value.

pub mod reader;
pub mod writer;

pub use reader::FrameReader;
pub use writer::FrameWriter;

/// Size of the big-endian length prefix.
pub const HEADER_LEN: usize = 4;
