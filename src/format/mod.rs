//! The MessagePack format table.
//!
//! Every lead byte maps to exactly one [`Format`]. Packed formats (fixint,
//! fixmap, fixarray, fixstr) carry their payload in the low bits of the same
//! byte. The size-class functions pick the narrowest format able to hold a
//! value or length; decoders accept any valid class.

pub mod marker;

use std::fmt;

/// One MessagePack wire format, as identified by its lead byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    PositiveFixInt(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    NeverUsed,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegativeFixInt(i8),
}

impl Format {
    /// Classifies a lead byte.
    ///
    /// The packed families are tested first and in this order; their masks
    /// overlap in byte space, so the order is part of the format definition.
    pub fn from_byte(byte: u8) -> Self {
        if byte & marker::POSITIVE_FIXINT_MASK == marker::POSITIVE_FIXINT_TAG {
            return Self::PositiveFixInt(byte);
        }
        if byte & marker::FIXMAP_MASK == marker::FIXMAP_TAG {
            return Self::FixMap(byte & 0x0F);
        }
        if byte & marker::FIXARRAY_MASK == marker::FIXARRAY_TAG {
            return Self::FixArray(byte & 0x0F);
        }
        if byte & marker::FIXSTR_MASK == marker::FIXSTR_TAG {
            return Self::FixStr(byte & 0x1F);
        }
        if byte & marker::NEGATIVE_FIXINT_MASK == marker::NEGATIVE_FIXINT_TAG {
            return Self::NegativeFixInt(byte as i8);
        }

        match byte {
            marker::NIL => Self::Nil,
            marker::FALSE => Self::False,
            marker::TRUE => Self::True,
            marker::BIN_8 => Self::Bin8,
            marker::BIN_16 => Self::Bin16,
            marker::BIN_32 => Self::Bin32,
            marker::EXT_8 => Self::Ext8,
            marker::EXT_16 => Self::Ext16,
            marker::EXT_32 => Self::Ext32,
            marker::FLOAT_32 => Self::Float32,
            marker::FLOAT_64 => Self::Float64,
            marker::UINT_8 => Self::Uint8,
            marker::UINT_16 => Self::Uint16,
            marker::UINT_32 => Self::Uint32,
            marker::UINT_64 => Self::Uint64,
            marker::INT_8 => Self::Int8,
            marker::INT_16 => Self::Int16,
            marker::INT_32 => Self::Int32,
            marker::INT_64 => Self::Int64,
            marker::FIXEXT_1 => Self::FixExt1,
            marker::FIXEXT_2 => Self::FixExt2,
            marker::FIXEXT_4 => Self::FixExt4,
            marker::FIXEXT_8 => Self::FixExt8,
            marker::FIXEXT_16 => Self::FixExt16,
            marker::STR_8 => Self::Str8,
            marker::STR_16 => Self::Str16,
            marker::STR_32 => Self::Str32,
            marker::ARRAY_16 => Self::Array16,
            marker::ARRAY_32 => Self::Array32,
            marker::MAP_16 => Self::Map16,
            marker::MAP_32 => Self::Map32,
            // 0xC1 is the only byte left over after the partition above.
            _ => Self::NeverUsed,
        }
    }

    /// Returns the lead byte for this format, payload bits included.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::PositiveFixInt(v) => marker::POSITIVE_FIXINT_TAG | (v & 0x7F),
            Self::FixMap(n) => marker::FIXMAP_TAG | (n & 0x0F),
            Self::FixArray(n) => marker::FIXARRAY_TAG | (n & 0x0F),
            Self::FixStr(n) => marker::FIXSTR_TAG | (n & 0x1F),
            Self::NegativeFixInt(v) => marker::NEGATIVE_FIXINT_TAG | (v as u8),
            Self::Nil => marker::NIL,
            Self::NeverUsed => marker::NEVER_USED,
            Self::False => marker::FALSE,
            Self::True => marker::TRUE,
            Self::Bin8 => marker::BIN_8,
            Self::Bin16 => marker::BIN_16,
            Self::Bin32 => marker::BIN_32,
            Self::Ext8 => marker::EXT_8,
            Self::Ext16 => marker::EXT_16,
            Self::Ext32 => marker::EXT_32,
            Self::Float32 => marker::FLOAT_32,
            Self::Float64 => marker::FLOAT_64,
            Self::Uint8 => marker::UINT_8,
            Self::Uint16 => marker::UINT_16,
            Self::Uint32 => marker::UINT_32,
            Self::Uint64 => marker::UINT_64,
            Self::Int8 => marker::INT_8,
            Self::Int16 => marker::INT_16,
            Self::Int32 => marker::INT_32,
            Self::Int64 => marker::INT_64,
            Self::FixExt1 => marker::FIXEXT_1,
            Self::FixExt2 => marker::FIXEXT_2,
            Self::FixExt4 => marker::FIXEXT_4,
            Self::FixExt8 => marker::FIXEXT_8,
            Self::FixExt16 => marker::FIXEXT_16,
            Self::Str8 => marker::STR_8,
            Self::Str16 => marker::STR_16,
            Self::Str32 => marker::STR_32,
            Self::Array16 => marker::ARRAY_16,
            Self::Array32 => marker::ARRAY_32,
            Self::Map16 => marker::MAP_16,
            Self::Map32 => marker::MAP_32,
        }
    }

    /// Short family name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::PositiveFixInt(_) => "positive fixint",
            Self::NegativeFixInt(_) => "negative fixint",
            Self::FixMap(_) => "fixmap",
            Self::FixArray(_) => "fixarray",
            Self::FixStr(_) => "fixstr",
            Self::Nil => "nil",
            Self::NeverUsed => "never used",
            Self::False | Self::True => "bool",
            Self::Bin8 => "bin8",
            Self::Bin16 => "bin16",
            Self::Bin32 => "bin32",
            Self::Ext8 => "ext8",
            Self::Ext16 => "ext16",
            Self::Ext32 => "ext32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::FixExt1 => "fixext1",
            Self::FixExt2 => "fixext2",
            Self::FixExt4 => "fixext4",
            Self::FixExt8 => "fixext8",
            Self::FixExt16 => "fixext16",
            Self::Str8 => "str8",
            Self::Str16 => "str16",
            Self::Str32 => "str32",
            Self::Array16 => "array16",
            Self::Array32 => "array32",
            Self::Map16 => "map16",
            Self::Map32 => "map32",
        }
    }

    /// Returns `true` for every integer format, packed or wide.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::PositiveFixInt(_)
                | Self::NegativeFixInt(_)
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
        )
    }

    /// Returns the implied payload size for fixext formats.
    pub fn fixext_len(self) -> Option<usize> {
        match self {
            Self::FixExt1 => Some(1),
            Self::FixExt2 => Some(2),
            Self::FixExt4 => Some(4),
            Self::FixExt8 => Some(8),
            Self::FixExt16 => Some(16),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_len(what: &str, len: usize) {
    assert!(
        len <= marker::LEN_32_MAX,
        "{what} length {len} does not fit a 32-bit MessagePack header"
    );
}

/// Picks the narrowest format for a signed integer.
pub fn int_format(value: i64) -> Format {
    if (0..=127).contains(&value) {
        Format::PositiveFixInt(value as u8)
    } else if (-32..0).contains(&value) {
        Format::NegativeFixInt(value as i8)
    } else if i64::from(i8::MIN) <= value && value <= i64::from(i8::MAX) {
        Format::Int8
    } else if i64::from(i16::MIN) <= value && value <= i64::from(i16::MAX) {
        Format::Int16
    } else if i64::from(i32::MIN) <= value && value <= i64::from(i32::MAX) {
        Format::Int32
    } else {
        Format::Int64
    }
}

/// Picks the format for an unsigned integer.
///
/// Values that fit `i64` use the signed table; only larger ones need `uint64`.
pub fn uint_format(value: u64) -> Format {
    match i64::try_from(value) {
        Ok(v) => int_format(v),
        Err(_) => Format::Uint64,
    }
}

/// Picks the header format for a string of `len` bytes.
///
/// # Panics
///
/// Panics if `len` exceeds `u32::MAX`.
pub fn str_format(len: usize) -> Format {
    check_len("string", len);
    if len <= marker::FIXSTR_MAX {
        Format::FixStr(len as u8)
    } else if len <= 0xFF {
        Format::Str8
    } else if len <= 0xFFFF {
        Format::Str16
    } else {
        Format::Str32
    }
}

/// Picks the header format for a binary blob of `len` bytes.
///
/// There is no packed binary form.
pub fn bin_format(len: usize) -> Format {
    check_len("binary", len);
    if len <= 0xFF {
        Format::Bin8
    } else if len <= 0xFFFF {
        Format::Bin16
    } else {
        Format::Bin32
    }
}

/// Picks the header format for an array of `len` items.
pub fn array_format(len: usize) -> Format {
    check_len("array", len);
    if len <= marker::FIX_COLLECTION_MAX {
        Format::FixArray(len as u8)
    } else if len <= 0xFFFF {
        Format::Array16
    } else {
        Format::Array32
    }
}

/// Picks the header format for a map of `len` pairs.
pub fn map_format(len: usize) -> Format {
    check_len("map", len);
    if len <= marker::FIX_COLLECTION_MAX {
        Format::FixMap(len as u8)
    } else if len <= 0xFFFF {
        Format::Map16
    } else {
        Format::Map32
    }
}

/// Picks the header format for an extension payload of `len` bytes.
pub fn ext_format(len: usize) -> Format {
    check_len("extension", len);
    match len {
        1 => Format::FixExt1,
        2 => Format::FixExt2,
        4 => Format::FixExt4,
        8 => Format::FixExt8,
        16 => Format::FixExt16,
        0..=0xFF => Format::Ext8,
        0x100..=0xFFFF => Format::Ext16,
        _ => Format::Ext32,
    }
}
