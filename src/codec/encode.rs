//! MessagePack encoding: values → bytes.

use bytes::{BufMut, BytesMut};

use crate::ext::ExtValue;
use crate::format::{self, Format};
use crate::types::Value;

/// Encodes a `Value` into the buffer.
pub fn encode_value(buf: &mut BytesMut, value: &Value) {
    match value {
        Value::Nil => encode_nil(buf),
        Value::Boolean(b) => encode_bool(buf, *b),
        Value::Integer(i) => encode_int(buf, *i),
        Value::UInteger(u) => encode_uint(buf, *u),
        Value::Float(f) => encode_f32(buf, *f),
        Value::Double(f) => encode_f64(buf, *f),
        Value::String(s) => encode_str(buf, s),
        Value::Binary(b) => encode_bin(buf, b),
        Value::Array(items) => encode_array(buf, items),
        Value::Map(pairs) => encode_map(buf, pairs),
        Value::Extension(ext) => encode_ext_value(buf, ext),
    }
}

pub fn encode_nil(buf: &mut BytesMut) {
    buf.put_u8(Format::Nil.to_byte());
}

pub fn encode_bool(buf: &mut BytesMut, value: bool) {
    let format = if value { Format::True } else { Format::False };
    buf.put_u8(format.to_byte());
}

/// Encodes an integer using the smallest possible representation.
pub fn encode_int(buf: &mut BytesMut, value: i64) {
    let format = format::int_format(value);
    buf.put_u8(format.to_byte());
    match format {
        Format::Int8 => buf.put_i8(value as i8),
        Format::Int16 => buf.put_i16(value as i16),
        Format::Int32 => buf.put_i32(value as i32),
        Format::Int64 => buf.put_i64(value),
        // Fixint payload is already in the lead byte.
        _ => {}
    }
}

/// Encodes an unsigned integer; only values above `i64::MAX` use `uint64`.
pub fn encode_uint(buf: &mut BytesMut, value: u64) {
    match i64::try_from(value) {
        Ok(v) => encode_int(buf, v),
        Err(_) => {
            buf.put_u8(Format::Uint64.to_byte());
            buf.put_u64(value);
        }
    }
}

/// Encodes a float32; the wire carries the exact bit pattern.
pub fn encode_f32(buf: &mut BytesMut, value: f32) {
    buf.put_u8(Format::Float32.to_byte());
    buf.put_u32(value.to_bits());
}

pub fn encode_f64(buf: &mut BytesMut, value: f64) {
    buf.put_u8(Format::Float64.to_byte());
    buf.put_u64(value.to_bits());
}

/// Encodes a string (size = byte length, not char count).
pub fn encode_str(buf: &mut BytesMut, value: &str) {
    encode_str_header(buf, value.len());
    buf.put_slice(value.as_bytes());
}

pub fn encode_str_header(buf: &mut BytesMut, len: usize) {
    let format = format::str_format(len);
    buf.put_u8(format.to_byte());
    put_len(buf, format, len);
}

pub fn encode_bin(buf: &mut BytesMut, value: &[u8]) {
    encode_bin_header(buf, value.len());
    buf.put_slice(value);
}

pub fn encode_bin_header(buf: &mut BytesMut, len: usize) {
    let format = format::bin_format(len);
    buf.put_u8(format.to_byte());
    put_len(buf, format, len);
}

pub fn encode_array(buf: &mut BytesMut, items: &[Value]) {
    encode_array_header(buf, items.len());
    for item in items {
        encode_value(buf, item);
    }
}

pub fn encode_array_header(buf: &mut BytesMut, len: usize) {
    let format = format::array_format(len);
    buf.put_u8(format.to_byte());
    put_len(buf, format, len);
}

pub fn encode_map(buf: &mut BytesMut, pairs: &[(Value, Value)]) {
    encode_map_header(buf, pairs.len());
    for (key, value) in pairs {
        encode_value(buf, key);
        encode_value(buf, value);
    }
}

pub fn encode_map_header(buf: &mut BytesMut, len: usize) {
    let format = format::map_format(len);
    buf.put_u8(format.to_byte());
    put_len(buf, format, len);
}

/// Encodes an extension header: lead byte, explicit size when the payload
/// length has no fixext form, then the type id.
pub fn encode_ext_header(buf: &mut BytesMut, type_id: i8, len: usize) {
    let format = format::ext_format(len);
    buf.put_u8(format.to_byte());
    put_len(buf, format, len);
    buf.put_i8(type_id);
}

pub fn encode_ext_value(buf: &mut BytesMut, ext: &ExtValue) {
    encode_ext_header(buf, ext.type_id, ext.data.len());
    buf.put_slice(&ext.data);
}

/// Writes the explicit length field of a wide header. Packed and fixext
/// formats carry no length field.
fn put_len(buf: &mut BytesMut, format: Format, len: usize) {
    match format {
        Format::Str8 | Format::Bin8 | Format::Ext8 => buf.put_u8(len as u8),
        Format::Str16 | Format::Bin16 | Format::Ext16 | Format::Array16 | Format::Map16 => {
            buf.put_u16(len as u16)
        }
        Format::Str32 | Format::Bin32 | Format::Ext32 | Format::Array32 | Format::Map32 => {
            buf.put_u32(len as u32)
        }
        _ => {}
    }
}
