//! MessagePack decoding: bytes → values.
//!
//! These functions consume from a [`MsgpackReader`] without opening
//! transactions of their own; the reader's typed entry points wrap them.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher, RandomState};

use bytes::Bytes;

use crate::error::PackError;
use crate::ext::ExtValue;
use crate::format::Format;
use crate::stream::MsgpackReader;
use crate::types::Value;

/// Decodes a single `Value` of any type.
pub fn decode_value(reader: &mut MsgpackReader<'_>) -> Result<Value, PackError> {
    let byte = reader.take_u8()?;
    let format = Format::from_byte(byte);

    match format {
        Format::Nil => Ok(Value::Nil),
        Format::False => Ok(Value::Boolean(false)),
        Format::True => Ok(Value::Boolean(true)),
        Format::Float32 => Ok(Value::Float(f32::from_bits(reader.take_u32()?))),
        Format::Float64 => Ok(Value::Double(f64::from_bits(reader.take_u64()?))),
        Format::FixStr(_) | Format::Str8 | Format::Str16 | Format::Str32 => {
            let len = str_len(reader, format, byte)?;
            Ok(Value::String(str_data(reader, len)?.to_owned()))
        }
        Format::Bin8 | Format::Bin16 | Format::Bin32 => {
            let len = bin_len(reader, format, byte)?;
            Ok(Value::Binary(Bytes::copy_from_slice(reader.take_raw(len)?)))
        }
        Format::FixArray(_) | Format::Array16 | Format::Array32 => {
            let len = array_len(reader, format, byte)?;
            decode_array_items(reader, len)
        }
        Format::FixMap(_) | Format::Map16 | Format::Map32 => {
            let len = map_len(reader, format, byte)?;
            decode_map_pairs(reader, len)
        }
        Format::FixExt1
        | Format::FixExt2
        | Format::FixExt4
        | Format::FixExt8
        | Format::FixExt16
        | Format::Ext8
        | Format::Ext16
        | Format::Ext32 => {
            let len = ext_len(reader, format, byte)?;
            let ext = ext_data(reader, len)?;
            Ok(Value::Extension(ext))
        }
        Format::NeverUsed => Err(PackError::ReservedByte(byte)),
        _ => {
            let value = integer_body(reader, format, byte)?;
            Ok(match i64::try_from(value) {
                Ok(i) => Value::Integer(i),
                // integer_body never yields more than u64::MAX.
                Err(_) => Value::UInteger(value as u64),
            })
        }
    }
}

pub fn decode_nil(reader: &mut MsgpackReader<'_>) -> Result<(), PackError> {
    let byte = reader.take_u8()?;
    match Format::from_byte(byte) {
        Format::Nil => Ok(()),
        _ => Err(PackError::unexpected("nil", byte)),
    }
}

pub fn decode_bool(reader: &mut MsgpackReader<'_>) -> Result<bool, PackError> {
    let byte = reader.take_u8()?;
    match Format::from_byte(byte) {
        Format::False => Ok(false),
        Format::True => Ok(true),
        _ => Err(PackError::unexpected("bool", byte)),
    }
}

/// Decodes any integer format, widened so that every `int64` and `uint64`
/// value is representable.
pub fn decode_integer(reader: &mut MsgpackReader<'_>) -> Result<i128, PackError> {
    let byte = reader.take_u8()?;
    integer_body(reader, Format::from_byte(byte), byte)
}

/// Decodes a float32, preserving its exact bit pattern.
pub fn decode_f32(reader: &mut MsgpackReader<'_>) -> Result<f32, PackError> {
    let byte = reader.take_u8()?;
    match Format::from_byte(byte) {
        Format::Float32 => Ok(f32::from_bits(reader.take_u32()?)),
        _ => Err(PackError::unexpected("float32", byte)),
    }
}

/// Decodes a float64; float32 input is widened.
pub fn decode_f64(reader: &mut MsgpackReader<'_>) -> Result<f64, PackError> {
    let byte = reader.take_u8()?;
    match Format::from_byte(byte) {
        Format::Float64 => Ok(f64::from_bits(reader.take_u64()?)),
        Format::Float32 => Ok(f64::from(f32::from_bits(reader.take_u32()?))),
        _ => Err(PackError::unexpected("float", byte)),
    }
}

pub fn decode_str_ref<'a>(reader: &mut MsgpackReader<'a>) -> Result<&'a str, PackError> {
    let byte = reader.take_u8()?;
    let len = str_len(reader, Format::from_byte(byte), byte)?;
    str_data(reader, len)
}

pub fn decode_bin_ref<'a>(reader: &mut MsgpackReader<'a>) -> Result<&'a [u8], PackError> {
    let byte = reader.take_u8()?;
    let len = bin_len(reader, Format::from_byte(byte), byte)?;
    reader.take_raw(len)
}

pub fn decode_array_len(reader: &mut MsgpackReader<'_>) -> Result<usize, PackError> {
    let byte = reader.take_u8()?;
    array_len(reader, Format::from_byte(byte), byte)
}

pub fn decode_map_len(reader: &mut MsgpackReader<'_>) -> Result<usize, PackError> {
    let byte = reader.take_u8()?;
    map_len(reader, Format::from_byte(byte), byte)
}

/// Decodes an extension header, returning `(type_id, payload_len)`.
///
/// The payload length is checked against the remaining input, so the caller
/// can take exactly that many bytes next.
pub fn decode_ext_header(reader: &mut MsgpackReader<'_>) -> Result<(i8, usize), PackError> {
    let byte = reader.take_u8()?;
    let len = ext_len(reader, Format::from_byte(byte), byte)?;
    let type_id = reader.take_i8()?;
    ensure_remaining(reader, len)?;
    Ok((type_id, len))
}

/// Decodes an extension of any type, keeping the payload as raw bytes.
pub fn decode_ext_value(reader: &mut MsgpackReader<'_>) -> Result<ExtValue, PackError> {
    let byte = reader.take_u8()?;
    let len = ext_len(reader, Format::from_byte(byte), byte)?;
    ext_data(reader, len)
}

/// Skips one complete value without materializing it.
pub fn skip_value(reader: &mut MsgpackReader<'_>) -> Result<(), PackError> {
    let byte = reader.take_u8()?;
    let format = Format::from_byte(byte);

    match format {
        Format::Nil | Format::False | Format::True => Ok(()),
        Format::Float32 => reader.take_raw(4).map(drop),
        Format::Float64 => reader.take_raw(8).map(drop),
        Format::FixStr(_) | Format::Str8 | Format::Str16 | Format::Str32 => {
            let len = str_len(reader, format, byte)?;
            reader.take_raw(len).map(drop)
        }
        Format::Bin8 | Format::Bin16 | Format::Bin32 => {
            let len = bin_len(reader, format, byte)?;
            reader.take_raw(len).map(drop)
        }
        Format::FixArray(_) | Format::Array16 | Format::Array32 => {
            let len = array_len(reader, format, byte)?;
            reader.enter()?;
            for _ in 0..len {
                skip_value(reader)?;
            }
            reader.leave();
            Ok(())
        }
        Format::FixMap(_) | Format::Map16 | Format::Map32 => {
            let len = map_len(reader, format, byte)?;
            reader.enter()?;
            for _ in 0..len {
                skip_value(reader)?;
                skip_value(reader)?;
            }
            reader.leave();
            Ok(())
        }
        Format::FixExt1
        | Format::FixExt2
        | Format::FixExt4
        | Format::FixExt8
        | Format::FixExt16
        | Format::Ext8
        | Format::Ext16
        | Format::Ext32 => {
            let len = ext_len(reader, format, byte)?;
            reader.take_i8()?;
            reader.take_raw(len).map(drop)
        }
        Format::NeverUsed => Err(PackError::ReservedByte(byte)),
        _ => integer_body(reader, format, byte).map(drop),
    }
}

// -- Format bodies: the lead byte has been consumed --

fn integer_body(
    reader: &mut MsgpackReader<'_>,
    format: Format,
    byte: u8,
) -> Result<i128, PackError> {
    let value = match format {
        Format::PositiveFixInt(v) => i128::from(v),
        Format::NegativeFixInt(v) => i128::from(v),
        Format::Uint8 => i128::from(reader.take_u8()?),
        Format::Uint16 => i128::from(reader.take_u16()?),
        Format::Uint32 => i128::from(reader.take_u32()?),
        Format::Uint64 => i128::from(reader.take_u64()?),
        Format::Int8 => i128::from(reader.take_i8()?),
        Format::Int16 => i128::from(reader.take_i16()?),
        Format::Int32 => i128::from(reader.take_i32()?),
        Format::Int64 => i128::from(reader.take_i64()?),
        _ => return Err(PackError::unexpected("integer", byte)),
    };
    Ok(value)
}

fn str_len(reader: &mut MsgpackReader<'_>, format: Format, byte: u8) -> Result<usize, PackError> {
    let len = match format {
        Format::FixStr(n) => usize::from(n),
        Format::Str8 => usize::from(reader.take_u8()?),
        Format::Str16 => usize::from(reader.take_u16()?),
        Format::Str32 => reader.take_u32()? as usize,
        _ => return Err(PackError::unexpected("string", byte)),
    };
    check_bytes_len(reader, "string", len)?;
    Ok(len)
}

fn bin_len(reader: &mut MsgpackReader<'_>, format: Format, byte: u8) -> Result<usize, PackError> {
    let len = match format {
        Format::Bin8 => usize::from(reader.take_u8()?),
        Format::Bin16 => usize::from(reader.take_u16()?),
        Format::Bin32 => reader.take_u32()? as usize,
        _ => return Err(PackError::unexpected("binary", byte)),
    };
    check_bytes_len(reader, "binary", len)?;
    Ok(len)
}

fn array_len(reader: &mut MsgpackReader<'_>, format: Format, byte: u8) -> Result<usize, PackError> {
    let len = match format {
        Format::FixArray(n) => usize::from(n),
        Format::Array16 => usize::from(reader.take_u16()?),
        Format::Array32 => reader.take_u32()? as usize,
        _ => return Err(PackError::unexpected("array", byte)),
    };
    // Every item takes at least one byte.
    check_collection_len(reader, "array", len, len)?;
    Ok(len)
}

fn map_len(reader: &mut MsgpackReader<'_>, format: Format, byte: u8) -> Result<usize, PackError> {
    let len = match format {
        Format::FixMap(n) => usize::from(n),
        Format::Map16 => usize::from(reader.take_u16()?),
        Format::Map32 => reader.take_u32()? as usize,
        _ => return Err(PackError::unexpected("map", byte)),
    };
    // Every pair takes at least two bytes.
    check_collection_len(reader, "map", len, len.saturating_mul(2))?;
    Ok(len)
}

fn ext_len(reader: &mut MsgpackReader<'_>, format: Format, byte: u8) -> Result<usize, PackError> {
    let len = match format {
        Format::Ext8 => usize::from(reader.take_u8()?),
        Format::Ext16 => usize::from(reader.take_u16()?),
        Format::Ext32 => reader.take_u32()? as usize,
        _ => match format.fixext_len() {
            Some(len) => len,
            None => return Err(PackError::unexpected("extension", byte)),
        },
    };
    check_bytes_len(reader, "extension", len)?;
    Ok(len)
}

// -- Payloads --

fn str_data<'a>(reader: &mut MsgpackReader<'a>, len: usize) -> Result<&'a str, PackError> {
    let data = reader.take_raw(len)?;
    Ok(std::str::from_utf8(data)?)
}

fn ext_data(reader: &mut MsgpackReader<'_>, len: usize) -> Result<ExtValue, PackError> {
    let type_id = reader.take_i8()?;
    let data = reader.take_raw(len)?;
    if let Some(registry) = reader.registry() {
        reader.enter()?;
        registry.validate_within(reader, type_id, data)?;
        reader.leave();
    }
    Ok(ExtValue::new(type_id, Bytes::copy_from_slice(data)))
}

fn decode_array_items(reader: &mut MsgpackReader<'_>, len: usize) -> Result<Value, PackError> {
    reader.enter()?;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(decode_value(reader)?);
    }
    reader.leave();
    Ok(Value::Array(items))
}

fn decode_map_pairs(reader: &mut MsgpackReader<'_>, len: usize) -> Result<Value, PackError> {
    reader.enter()?;
    let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(len);
    // Key hash -> indices of the pairs whose keys share it.
    let hasher = RandomState::new();
    let mut seen: HashMap<u64, Vec<usize>> = HashMap::with_capacity(len);
    for index in 0..len {
        let key = decode_value(reader)?;
        let mut state = hasher.build_hasher();
        key.hash_bits(&mut state);
        let slots = seen.entry(state.finish()).or_default();
        if slots.iter().any(|&i| pairs[i].0.bit_eq(&key)) {
            return Err(PackError::DuplicateKey(index));
        }
        slots.push(index);
        let value = decode_value(reader)?;
        pairs.push((key, value));
    }
    reader.leave();
    Ok(Value::Map(pairs))
}

// -- Limits --

fn ensure_remaining(reader: &MsgpackReader<'_>, needed: usize) -> Result<(), PackError> {
    if reader.remaining() < needed {
        Err(PackError::Truncated {
            needed,
            remaining: reader.remaining(),
        })
    } else {
        Ok(())
    }
}

fn check_bytes_len(reader: &MsgpackReader<'_>, what: &'static str, len: usize) -> Result<(), PackError> {
    let limit = reader.config().bytes_len_limit();
    if len > limit {
        return Err(PackError::LimitExceeded { what, len, limit });
    }
    Ok(())
}

/// Checks a declared item count before anything is reserved for it.
pub(crate) fn check_collection_len(
    reader: &MsgpackReader<'_>,
    what: &'static str,
    len: usize,
    min_bytes: usize,
) -> Result<(), PackError> {
    let limit = reader.config().collection_len_limit();
    if len > limit {
        return Err(PackError::LimitExceeded { what, len, limit });
    }
    ensure_remaining(reader, min_bytes)
}
