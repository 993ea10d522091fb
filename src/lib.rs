//! Packwire — a pure-Rust MessagePack codec with transactional reads.
//!
//! Values are written with [`MsgpackWriter`] and read back with
//! [`MsgpackReader`]. Every read runs inside a [`Transaction`]: a failed read
//! leaves the cursor where it started and sets a sticky fail flag, so callers
//! can recover and try another decode path at the same position.
//!
//! # Architecture
//!
//! - **`format`** — Lead-byte table and size-class selection
//! - **`codec`** — Free encode/decode functions for every format
//! - **`stream`** — Reader, writer and transaction facades
//! - **`types`** — Dynamic [`Value`] and the [`Pack`]/[`Unpack`] mappings
//! - **`ext`** — Extension types, the registry and the timestamp extension
//! - **`frame`** — Length-prefixed framing over async streams (feature `framing`)
//!
//! ```
//! use packwire::{MsgpackReader, MsgpackWriter};
//!
//! let mut writer = MsgpackWriter::new();
//! writer.write_map_header(1).write_int(1).write_bool(true);
//! assert_eq!(writer.as_bytes(), &[0x81, 0x01, 0xC3]);
//!
//! let bytes = writer.into_bytes();
//! let mut reader = MsgpackReader::new(&bytes);
//! assert_eq!(reader.read_map_len().unwrap(), 1);
//! assert_eq!(reader.read_int().unwrap(), 1);
//! assert!(reader.read_bool().unwrap());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod ext;
pub mod format;
pub mod stream;
pub mod types;

#[cfg(feature = "framing")]
pub mod frame;

use bytes::Bytes;

#[cfg(feature = "framing")]
pub use config::FrameConfig;
pub use config::ReaderConfig;
pub use error::PackError;
pub use ext::{Ext, ExtValue, Extension, ExtensionDescriptor, ExtensionRegistry, Timestamp};
pub use format::Format;
pub use stream::{MsgpackReader, MsgpackWriter, Transaction};
pub use types::{Pack, Unpack, Value};

/// Encodes `value` into a fresh buffer.
pub fn to_bytes<T: Pack + ?Sized>(value: &T) -> Bytes {
    let mut writer = MsgpackWriter::new();
    writer.write(value);
    writer.into_bytes()
}

/// Decodes exactly one `T` from `data`, rejecting trailing bytes.
pub fn from_slice<T: Unpack>(data: &[u8]) -> Result<T, PackError> {
    let mut reader = MsgpackReader::new(data);
    let value = reader.read()?;
    if !reader.is_eof() {
        return Err(PackError::TrailingBytes(reader.remaining()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn small_positive_int() {
        assert_eq!(to_bytes(&5i64).as_ref(), &[0x05]);
        assert_eq!(from_slice::<i64>(&[0x05]).unwrap(), 5);
    }

    #[test]
    fn negative_fixint() {
        assert_eq!(to_bytes(&-1i64).as_ref(), &[0xFF]);
        assert_eq!(from_slice::<i64>(&[0xFF]).unwrap(), -1);
        assert_eq!(to_bytes(&-32i64).as_ref(), &[0xE0]);
        assert_eq!(to_bytes(&0i64).as_ref(), &[0x00]);
    }

    #[test]
    fn int_array() {
        let bytes = to_bytes(&vec![1i64, 2, 3]);
        assert_eq!(bytes.as_ref(), &[0x93, 0x01, 0x02, 0x03]);
        assert_eq!(from_slice::<Vec<i64>>(&bytes).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn short_string() {
        let bytes = to_bytes("hi");
        assert_eq!(bytes.as_ref(), &[0xA2, 0x68, 0x69]);
        assert_eq!(from_slice::<String>(&bytes).unwrap(), "hi");
    }

    #[test]
    fn single_pair_map() {
        let map = BTreeMap::from([(1i64, true)]);
        let bytes = to_bytes(&map);
        assert_eq!(bytes.as_ref(), &[0x81, 0x01, 0xC3]);

        let value: Value = from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![(Value::Integer(1), Value::Boolean(true))])
        );
    }

    #[test]
    fn int_from_nil_leaves_cursor() {
        let data = [0xC0];
        let mut reader = MsgpackReader::new(&data);
        let before = reader.position();
        assert!(reader.read_int().is_err());
        assert!(reader.has_failed());
        assert_eq!(reader.position(), before);
    }

    #[test]
    fn wider_size_classes_still_decode() {
        // int32 encoding of 5.
        assert_eq!(from_slice::<i64>(&[0xD2, 0, 0, 0, 5]).unwrap(), 5);
        // str16 encoding of "hi".
        assert_eq!(from_slice::<String>(&[0xDA, 0, 2, b'h', b'i']).unwrap(), "hi");
        // array32 with one element.
        assert_eq!(from_slice::<Vec<u8>>(&[0xDD, 0, 0, 0, 1, 0x07]).unwrap(), vec![7]);
    }

    #[test]
    fn failed_element_aborts_whole_array() {
        // [1, 2, "x", 4]
        let data = [0x94, 0x01, 0x02, 0xA1, b'x', 0x04];
        let mut reader = MsgpackReader::new(&data);
        let mut out: Vec<i64> = Vec::new();
        assert!(reader.read_into(&mut out).is_err());
        assert!(out.is_empty());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn value_round_trip_is_bit_exact() {
        let value = Value::Array(vec![
            Value::Integer(i64::MIN),
            Value::Integer(i64::MAX),
            Value::UInteger(u64::MAX),
            Value::Float(f32::NAN),
            Value::Double(-0.0),
            Value::Binary(Bytes::from_static(&[0, 255])),
            Value::Extension(ExtValue::new(42, vec![1, 2, 3])),
        ]);
        let decoded: Value = from_slice(&to_bytes(&value)).unwrap();
        assert!(decoded.bit_eq(&value));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let err = from_slice::<i64>(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, PackError::TrailingBytes(1)));
        assert!(!err.is_recoverable());
    }
}
