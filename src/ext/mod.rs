//! Extension types: caller-defined values carried as a type id plus an
//! opaque payload.
//!
//! A type becomes an extension by implementing [`Extension`]. The writer
//! asks it for its payload size up front so the header can pick the length
//! class (fixext 1/2/4/8/16, otherwise ext 8/16/32) before the payload is
//! appended. The reader hands the decoder a reader bounded to exactly the
//! declared payload and rejects decoders that leave bytes unread.

mod registry;
mod timestamp;

pub use registry::{ExtensionDescriptor, ExtensionRegistry};
pub use timestamp::Timestamp;

use bytes::Bytes;

use crate::codec::{decode, encode};
use crate::error::PackError;
use crate::stream::{MsgpackReader, MsgpackWriter};

/// A Rust type with a MessagePack extension encoding.
///
/// ```
/// use packwire::{Extension, MsgpackReader, MsgpackWriter, PackError};
///
/// #[derive(Debug, PartialEq)]
/// struct Rgb(u8, u8, u8);
///
/// impl Extension for Rgb {
///     const TYPE_ID: i8 = 10;
///
///     fn payload_len(&self) -> usize {
///         3
///     }
///
///     fn write_payload(&self, writer: &mut MsgpackWriter) {
///         writer.write_raw(&[self.0, self.1, self.2]);
///     }
///
///     fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
///         let [r, g, b] = payload.read_fixed::<3>()?;
///         Ok(Rgb(r, g, b))
///     }
/// }
///
/// let mut writer = MsgpackWriter::new();
/// writer.write_ext(&Rgb(1, 2, 3));
/// assert_eq!(writer.as_bytes(), &[0xC7, 0x03, 10, 1, 2, 3]);
///
/// let bytes = writer.into_bytes();
/// let mut reader = MsgpackReader::new(&bytes);
/// assert_eq!(reader.read_ext::<Rgb>().unwrap(), Rgb(1, 2, 3));
/// ```
pub trait Extension: Sized + 'static {
    /// Type id written after the header. Negative ids are reserved by
    /// MessagePack for predefined types.
    const TYPE_ID: i8;

    /// Exact number of bytes `write_payload` will append.
    fn payload_len(&self) -> usize;

    /// Appends the payload. Raw bytes and nested MessagePack are both fine.
    fn write_payload(&self, writer: &mut MsgpackWriter);

    /// Decodes the payload from a reader bounded to exactly the payload bytes.
    fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError>;
}

/// An extension of any type, with its payload kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtValue {
    pub type_id: i8,
    pub data: Bytes,
}

impl ExtValue {
    pub fn new(type_id: i8, data: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            data: data.into(),
        }
    }

    /// Encodes a typed extension into its raw form.
    pub fn from_ext<T: Extension>(value: &T) -> Self {
        let len = value.payload_len();
        let mut writer = MsgpackWriter::with_capacity(len);
        value.write_payload(&mut writer);
        check_written::<T>(writer.len(), len);
        Self::new(T::TYPE_ID, writer.into_bytes())
    }

    /// Decodes the payload as `T`, failing if the type id does not match.
    pub fn decode<T: Extension>(&self) -> Result<T, PackError> {
        if self.type_id != T::TYPE_ID {
            return Err(PackError::ExtensionMismatch {
                expected: T::TYPE_ID,
                found: self.type_id,
            });
        }
        read_payload::<T>(MsgpackReader::new(&self.data))
    }
}

/// Wraps an [`Extension`] so it can be packed and unpacked like any other
/// value, including inside collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ext<T>(pub T);

impl<T> Ext<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Writes header, type id and payload for a typed extension.
pub(crate) fn encode_ext<T: Extension>(writer: &mut MsgpackWriter, value: &T) {
    let len = value.payload_len();
    encode::encode_ext_header(writer.buf_mut(), T::TYPE_ID, len);
    let start = writer.len();
    value.write_payload(writer);
    check_written::<T>(writer.len() - start, len);
}

/// Reads a typed extension frame.
///
/// The frame must carry `T::TYPE_ID`; with a registry attached to the reader,
/// that id must also be registered to `T`.
pub(crate) fn decode_ext<T: Extension>(reader: &mut MsgpackReader<'_>) -> Result<T, PackError> {
    let (type_id, len) = decode::decode_ext_header(reader)?;
    if type_id != T::TYPE_ID {
        return Err(PackError::ExtensionMismatch {
            expected: T::TYPE_ID,
            found: type_id,
        });
    }
    if let Some(registry) = reader.registry() {
        registry.check::<T>()?;
    }
    reader.enter()?;
    let payload = reader.take_raw(len)?;
    let value = read_payload::<T>(reader.payload_reader(payload))?;
    reader.leave();
    Ok(value)
}

/// Runs `T`'s decoder over a payload reader and checks it consumed everything.
pub(crate) fn read_payload<T: Extension>(mut payload: MsgpackReader<'_>) -> Result<T, PackError> {
    let len = payload.remaining();
    let value = T::read_payload(&mut payload)?;
    if !payload.is_eof() {
        return Err(PackError::ExtensionLength {
            type_id: T::TYPE_ID,
            len,
            unread: payload.remaining(),
        });
    }
    Ok(value)
}

fn check_written<T: Extension>(written: usize, declared: usize) {
    assert_eq!(
        written,
        declared,
        "extension {} ({}) wrote {written} payload bytes but declared {declared}",
        T::TYPE_ID,
        std::any::type_name::<T>(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::marker;

    /// Point encoded as a nested msgpack array of two ints.
    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Point {
        fn encoded(&self) -> MsgpackWriter {
            let mut w = MsgpackWriter::new();
            w.write_array_header(2).write_int(self.x).write_int(self.y);
            w
        }
    }

    impl Extension for Point {
        const TYPE_ID: i8 = 5;

        fn payload_len(&self) -> usize {
            self.encoded().len()
        }

        fn write_payload(&self, writer: &mut MsgpackWriter) {
            writer.write_array_header(2).write_int(self.x).write_int(self.y);
        }

        fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
            let [x, y]: [i64; 2] = match payload.read::<Vec<i64>>()?.try_into() {
                Ok(xy) => xy,
                Err(v) => {
                    return Err(PackError::ExtensionPayload {
                        type_id: Self::TYPE_ID,
                        reason: format!("expected 2 coordinates, got {}", v.len()),
                    });
                }
            };
            Ok(Point { x, y })
        }
    }

    /// Declares one byte more than it reads.
    #[derive(Debug)]
    struct Sloppy;

    impl Extension for Sloppy {
        const TYPE_ID: i8 = 6;

        fn payload_len(&self) -> usize {
            2
        }

        fn write_payload(&self, writer: &mut MsgpackWriter) {
            writer.write_raw(&[0, 0]);
        }

        fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
            payload.read_raw(1)?;
            Ok(Sloppy)
        }
    }

    /// Declares two bytes but writes one.
    struct Liar;

    impl Extension for Liar {
        const TYPE_ID: i8 = 7;

        fn payload_len(&self) -> usize {
            2
        }

        fn write_payload(&self, writer: &mut MsgpackWriter) {
            writer.write_raw(&[0]);
        }

        fn read_payload(_payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
            Ok(Liar)
        }
    }

    #[test]
    fn nested_msgpack_payload_round_trip() {
        let p = Point { x: 1, y: -300 };
        let mut writer = MsgpackWriter::new();
        writer.write_ext(&p);
        // [0x92, 0x01, 0xD1, 0xFE, 0xD4] is 5 bytes: ext8 with explicit size.
        assert_eq!(&writer.as_bytes()[..3], &[marker::EXT_8, 0x05, 0x05]);

        let bytes = writer.into_bytes();
        let mut reader = MsgpackReader::new(&bytes);
        assert_eq!(reader.read_ext::<Point>().unwrap(), p);
        assert!(reader.is_eof());
    }

    #[test]
    fn wrong_type_id_rolls_back() {
        let mut writer = MsgpackWriter::new();
        writer.write_ext(&Point { x: 0, y: 0 });
        let bytes = writer.into_bytes();

        let mut reader = MsgpackReader::new(&bytes);
        let mut out: Option<Sloppy> = None;
        let err = reader.read::<Ext<Sloppy>>().map(|e| out = Some(e.0)).unwrap_err();
        assert!(matches!(
            err,
            PackError::ExtensionMismatch { expected: 6, found: 5 }
        ));
        assert!(out.is_none());
        assert!(reader.has_failed());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn decoder_must_consume_whole_payload() {
        let mut writer = MsgpackWriter::new();
        writer.write_ext(&Sloppy);
        let bytes = writer.into_bytes();

        let mut reader = MsgpackReader::new(&bytes);
        assert!(matches!(
            reader.read_ext::<Sloppy>(),
            Err(PackError::ExtensionLength { type_id: 6, len: 2, unread: 1 })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn decoder_cannot_read_past_payload() {
        // Point payload claims 2 items but the ext frame holds only the header byte.
        let data = [marker::FIXEXT_1, 0x05, 0x92, 0x01, 0x02];
        let mut reader = MsgpackReader::new(&data);
        assert!(matches!(
            reader.read_ext::<Point>(),
            Err(PackError::Truncated { .. })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    #[should_panic(expected = "wrote 1 payload bytes but declared 2")]
    fn encoder_size_mismatch_panics() {
        MsgpackWriter::new().write_ext(&Liar);
    }

    #[test]
    fn ext_value_conversions() {
        let p = Point { x: 3, y: 4 };
        let raw = ExtValue::from_ext(&p);
        assert_eq!(raw.type_id, 5);
        assert_eq!(raw.data.as_ref(), &[0x92, 0x03, 0x04]);
        assert_eq!(raw.decode::<Point>().unwrap(), p);
        assert!(matches!(
            raw.decode::<Sloppy>(),
            Err(PackError::ExtensionMismatch { .. })
        ));
    }

    #[test]
    fn array_of_extensions() {
        let points = vec![Ext(Point { x: 1, y: 2 }), Ext(Point { x: 3, y: 4 })];
        let mut writer = MsgpackWriter::new();
        writer.write(&points);
        let bytes = writer.into_bytes();

        let mut reader = MsgpackReader::new(&bytes);
        assert_eq!(reader.read::<Vec<Ext<Point>>>().unwrap(), points);
    }
}
