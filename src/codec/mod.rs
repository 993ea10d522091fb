//! MessagePack value encoding and decoding.
//!
//! MessagePack uses big-endian byte ordering exclusively. Encoders always
//! pick the narrowest format; decoders accept every valid one.

pub mod decode;
pub mod encode;

pub use decode::decode_value;
pub use encode::encode_value;
