//! Append-only MessagePack writer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::encode;
use crate::ext::{self, Extension};
use crate::types::{Pack, Value};

/// Writes MessagePack values into a growable buffer.
///
/// Writes cannot fail: every method appends and returns `&mut Self` so calls
/// chain. Collection headers are written separately from their contents when
/// the caller streams items one by one.
///
/// ```
/// use packwire::MsgpackWriter;
///
/// let mut writer = MsgpackWriter::new();
/// writer.write(&5i64).write(&-1i64).write("hi");
/// assert_eq!(writer.as_bytes(), &[0x05, 0xFF, 0xA2, 0x68, 0x69]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MsgpackWriter {
    buf: BytesMut,
}

impl MsgpackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Continues writing after the existing contents of `buf`.
    pub fn from_buf(buf: BytesMut) -> Self {
        Self { buf }
    }

    /// Writes any packable value.
    pub fn write<T: Pack + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.pack(self);
        self
    }

    pub fn write_value(&mut self, value: &Value) -> &mut Self {
        encode::encode_value(&mut self.buf, value);
        self
    }

    pub fn write_nil(&mut self) -> &mut Self {
        encode::encode_nil(&mut self.buf);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        encode::encode_bool(&mut self.buf, value);
        self
    }

    pub fn write_int(&mut self, value: i64) -> &mut Self {
        encode::encode_int(&mut self.buf, value);
        self
    }

    pub fn write_uint(&mut self, value: u64) -> &mut Self {
        encode::encode_uint(&mut self.buf, value);
        self
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        encode::encode_f32(&mut self.buf, value);
        self
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        encode::encode_f64(&mut self.buf, value);
        self
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        encode::encode_str(&mut self.buf, value);
        self
    }

    pub fn write_bin(&mut self, value: &[u8]) -> &mut Self {
        encode::encode_bin(&mut self.buf, value);
        self
    }

    /// Writes an array header; exactly `len` values must follow.
    pub fn write_array_header(&mut self, len: usize) -> &mut Self {
        encode::encode_array_header(&mut self.buf, len);
        self
    }

    /// Writes a map header; exactly `len` key/value pairs must follow.
    pub fn write_map_header(&mut self, len: usize) -> &mut Self {
        encode::encode_map_header(&mut self.buf, len);
        self
    }

    /// Writes an extension header; exactly `len` payload bytes must follow.
    pub fn write_ext_header(&mut self, type_id: i8, len: usize) -> &mut Self {
        encode::encode_ext_header(&mut self.buf, type_id, len);
        self
    }

    /// Writes a typed extension value.
    ///
    /// # Panics
    ///
    /// Panics if the payload writer produces a different number of bytes than
    /// `payload_len` declared.
    pub fn write_ext<T: Extension>(&mut self, value: &T) -> &mut Self {
        ext::encode_ext(self, value);
        self
    }

    /// Appends bytes verbatim.
    pub fn write_raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_slice(data);
        self
    }

    // -- Output --

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Releases the underlying buffer.
    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    /// Releases the written bytes as an immutable, cheaply clonable buffer.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MsgpackReader;

    #[test]
    fn encodes_canonical_forms() {
        let mut writer = MsgpackWriter::new();
        writer.write(&5i64);
        assert_eq!(writer.as_bytes(), &[0x05]);

        writer.clear();
        writer.write(&-1i64);
        assert_eq!(writer.as_bytes(), &[0xFF]);

        writer.clear();
        writer.write(&vec![1i64, 2, 3]);
        assert_eq!(writer.as_bytes(), &[0x93, 0x01, 0x02, 0x03]);

        writer.clear();
        writer.write("hi");
        assert_eq!(writer.as_bytes(), &[0xA2, 0x68, 0x69]);

        writer.clear();
        writer.write_map_header(1).write_int(1).write_bool(true);
        assert_eq!(writer.as_bytes(), &[0x81, 0x01, 0xC3]);
    }

    #[test]
    fn streamed_array_matches_value_array() {
        let mut streamed = MsgpackWriter::new();
        streamed.write_array_header(3).write_nil().write_f32(1.0).write_bin(&[1, 2]);

        let mut whole = MsgpackWriter::new();
        whole.write_value(&Value::Array(vec![
            Value::Nil,
            Value::Float(1.0),
            Value::Binary(Bytes::from_static(&[1, 2])),
        ]));

        assert_eq!(streamed.as_bytes(), whole.as_bytes());
    }

    #[test]
    fn manual_ext_header_and_raw_payload() {
        let mut writer = MsgpackWriter::new();
        writer.write_ext_header(3, 2).write_raw(&[0xAB, 0xCD]);
        assert_eq!(writer.as_bytes(), &[0xD5, 0x03, 0xAB, 0xCD]);

        let bytes = writer.into_bytes();
        let mut reader = MsgpackReader::new(&bytes);
        assert_eq!(reader.read_ext_header().unwrap(), (3, 2));
        assert_eq!(reader.read_raw(2).unwrap(), &[0xAB, 0xCD]);
    }

    #[test]
    fn from_buf_appends() {
        let mut buf = BytesMut::new();
        buf.put_u8(0xC0);
        let mut writer = MsgpackWriter::from_buf(buf);
        writer.write_uint(u64::MAX);
        assert_eq!(writer.len(), 10);
        assert_eq!(writer.into_inner()[0], 0xC0);
    }
}
