//! Conversions between Rust types and MessagePack.
//!
//! [`Pack`] appends a value to a [`MsgpackWriter`] and never fails.
//! [`Unpack`] consumes one value from a [`MsgpackReader`]; implementations
//! read straight from the cursor and leave rollback to the transaction the
//! reader opens around every top-level read.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use bytes::Bytes;

use super::Value;
use crate::codec::{decode, encode};
use crate::error::PackError;
use crate::ext::{self, Ext, ExtValue, Extension};
use crate::format::Format;
use crate::stream::{MsgpackReader, MsgpackWriter};

/// A type that can be written as MessagePack.
pub trait Pack {
    fn pack(&self, writer: &mut MsgpackWriter);
}

/// A type that can be read back from MessagePack.
pub trait Unpack: Sized {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError>;

    /// Reads into an existing value.
    ///
    /// Scalars leave `out` untouched on failure. Collections override this to
    /// reuse their allocation and are left empty on failure.
    fn unpack_into(reader: &mut MsgpackReader<'_>, out: &mut Self) -> Result<(), PackError> {
        *out = Self::unpack(reader)?;
        Ok(())
    }

    /// Puts `out` in its failed-read state. Collections empty themselves;
    /// scalars keep their value.
    fn reset(_out: &mut Self) {}
}

impl<T: Pack + ?Sized> Pack for &T {
    fn pack(&self, writer: &mut MsgpackWriter) {
        (**self).pack(writer);
    }
}

// -- Scalars --

impl Pack for () {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_nil();
    }
}

impl Unpack for () {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_nil(reader)
    }
}

impl Pack for bool {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_bool(*self);
    }
}

impl Unpack for bool {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_bool(reader)
    }
}

macro_rules! integer_impls {
    ($write:ident as $wide:ty => $($t:ty),+) => {$(
        impl Pack for $t {
            fn pack(&self, writer: &mut MsgpackWriter) {
                writer.$write(*self as $wide);
            }
        }

        impl Unpack for $t {
            fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
                let value = decode::decode_integer(reader)?;
                <$t>::try_from(value).map_err(|_| PackError::OutOfRange {
                    value,
                    target: stringify!($t),
                })
            }
        }
    )+};
}

integer_impls!(write_int as i64 => i8, i16, i32, i64, isize);
integer_impls!(write_uint as u64 => u8, u16, u32, u64, usize);

impl Pack for f32 {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_f32(*self);
    }
}

impl Unpack for f32 {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_f32(reader)
    }
}

impl Pack for f64 {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_f64(*self);
    }
}

impl Unpack for f64 {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_f64(reader)
    }
}

// -- Strings and binary --

impl Pack for str {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_str(self);
    }
}

impl Pack for String {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_str(self);
    }
}

impl Unpack for String {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_str_ref(reader).map(str::to_owned)
    }
}

/// `Bytes` maps to the bin family; `Vec<u8>` is an array of integers.
impl Pack for Bytes {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_bin(self);
    }
}

impl Unpack for Bytes {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_bin_ref(reader).map(Bytes::copy_from_slice)
    }
}

// -- Option --

impl<T: Pack> Pack for Option<T> {
    fn pack(&self, writer: &mut MsgpackWriter) {
        match self {
            Some(value) => value.pack(writer),
            None => {
                writer.write_nil();
            }
        }
    }
}

impl<T: Unpack> Unpack for Option<T> {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        if reader.peek_format()? == Format::Nil {
            decode::decode_nil(reader)?;
            Ok(None)
        } else {
            T::unpack(reader).map(Some)
        }
    }
}

// -- Arrays --

impl<T: Pack> Pack for [T] {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_array_header(self.len());
        for item in self {
            item.pack(writer);
        }
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, writer: &mut MsgpackWriter) {
        self.as_slice().pack(writer);
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        let mut out = Vec::new();
        Self::unpack_into(reader, &mut out)?;
        Ok(out)
    }

    fn unpack_into(reader: &mut MsgpackReader<'_>, out: &mut Self) -> Result<(), PackError> {
        out.clear();
        let result = fill_array(reader, out);
        if result.is_err() {
            out.clear();
        }
        result
    }

    fn reset(out: &mut Self) {
        out.clear();
    }
}

fn fill_array<T: Unpack>(reader: &mut MsgpackReader<'_>, out: &mut Vec<T>) -> Result<(), PackError> {
    let len = decode::decode_array_len(reader)?;
    reader.enter()?;
    out.reserve(len);
    for _ in 0..len {
        out.push(T::unpack(reader)?);
    }
    reader.leave();
    Ok(())
}

// -- Maps --

fn pack_pairs<'v, K, V>(
    writer: &mut MsgpackWriter,
    len: usize,
    pairs: impl Iterator<Item = (&'v K, &'v V)>,
) where
    K: Pack + 'v,
    V: Pack + 'v,
{
    writer.write_map_header(len);
    for (key, value) in pairs {
        key.pack(writer);
        value.pack(writer);
    }
}

/// Reads a map header and feeds each pair to `insert`, which reports whether
/// the key was new.
fn fill_map<K: Unpack, V: Unpack>(
    reader: &mut MsgpackReader<'_>,
    mut insert: impl FnMut(K, V) -> bool,
) -> Result<(), PackError> {
    let len = decode::decode_map_len(reader)?;
    reader.enter()?;
    for index in 0..len {
        let key = K::unpack(reader)?;
        let value = V::unpack(reader)?;
        if !insert(key, value) {
            return Err(PackError::DuplicateKey(index));
        }
    }
    reader.leave();
    Ok(())
}

impl<K: Pack, V: Pack, S> Pack for HashMap<K, V, S> {
    fn pack(&self, writer: &mut MsgpackWriter) {
        pack_pairs(writer, self.len(), self.iter());
    }
}

impl<K, V, S> Unpack for HashMap<K, V, S>
where
    K: Unpack + Eq + Hash,
    V: Unpack,
    S: BuildHasher + Default,
{
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        let mut out = HashMap::default();
        Self::unpack_into(reader, &mut out)?;
        Ok(out)
    }

    fn unpack_into(reader: &mut MsgpackReader<'_>, out: &mut Self) -> Result<(), PackError> {
        out.clear();
        let result = fill_map(reader, |k, v| out.insert(k, v).is_none());
        if result.is_err() {
            out.clear();
        }
        result
    }

    fn reset(out: &mut Self) {
        out.clear();
    }
}

impl<K: Pack, V: Pack> Pack for BTreeMap<K, V> {
    fn pack(&self, writer: &mut MsgpackWriter) {
        pack_pairs(writer, self.len(), self.iter());
    }
}

impl<K: Unpack + Ord, V: Unpack> Unpack for BTreeMap<K, V> {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        let mut out = BTreeMap::new();
        Self::unpack_into(reader, &mut out)?;
        Ok(out)
    }

    fn unpack_into(reader: &mut MsgpackReader<'_>, out: &mut Self) -> Result<(), PackError> {
        out.clear();
        let result = fill_map(reader, |k, v| out.insert(k, v).is_none());
        if result.is_err() {
            out.clear();
        }
        result
    }

    fn reset(out: &mut Self) {
        out.clear();
    }
}

// -- Dynamic values and extensions --

impl Pack for Value {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_value(self);
    }
}

impl Unpack for Value {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_value(reader)
    }
}

impl Pack for ExtValue {
    fn pack(&self, writer: &mut MsgpackWriter) {
        encode::encode_ext_value(writer.buf_mut(), self);
    }
}

impl Unpack for ExtValue {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        decode::decode_ext_value(reader)
    }
}

impl<T: Extension> Pack for Ext<T> {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_ext(&self.0);
    }
}

impl<T: Extension> Unpack for Ext<T> {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        ext::decode_ext::<T>(reader).map(Ext)
    }
}
