//! MessagePack lead byte constants.

// Nil
pub const NIL: u8 = 0xC0;

// Reserved, never produced and rejected on read
pub const NEVER_USED: u8 = 0xC1;

// Boolean
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

// Binary
pub const BIN_8: u8 = 0xC4;
pub const BIN_16: u8 = 0xC5;
pub const BIN_32: u8 = 0xC6;

// Extension with explicit size
pub const EXT_8: u8 = 0xC7;
pub const EXT_16: u8 = 0xC8;
pub const EXT_32: u8 = 0xC9;

// Float (IEEE 754)
pub const FLOAT_32: u8 = 0xCA;
pub const FLOAT_64: u8 = 0xCB;

// Unsigned integer
pub const UINT_8: u8 = 0xCC;
pub const UINT_16: u8 = 0xCD;
pub const UINT_32: u8 = 0xCE;
pub const UINT_64: u8 = 0xCF;

// Signed integer (beyond fixint range)
pub const INT_8: u8 = 0xD0;
pub const INT_16: u8 = 0xD1;
pub const INT_32: u8 = 0xD2;
pub const INT_64: u8 = 0xD3;

// Extension with implied size
pub const FIXEXT_1: u8 = 0xD4;
pub const FIXEXT_2: u8 = 0xD5;
pub const FIXEXT_4: u8 = 0xD6;
pub const FIXEXT_8: u8 = 0xD7;
pub const FIXEXT_16: u8 = 0xD8;

// String
pub const STR_8: u8 = 0xD9;
pub const STR_16: u8 = 0xDA;
pub const STR_32: u8 = 0xDB;

// Array
pub const ARRAY_16: u8 = 0xDC;
pub const ARRAY_32: u8 = 0xDD;

// Map
pub const MAP_16: u8 = 0xDE;
pub const MAP_32: u8 = 0xDF;

// Packed families: (byte & MASK) == TAG, payload in the remaining bits.
//
// POSITIVE_FIXINT: 0x00..=0x7F (top bit 0, value 0..127)
pub const POSITIVE_FIXINT_MASK: u8 = 0x80;
pub const POSITIVE_FIXINT_TAG: u8 = 0x00;

// FIXMAP: 0x80..=0x8F (top nibble 1000, pair count 0..15)
pub const FIXMAP_MASK: u8 = 0xF0;
pub const FIXMAP_TAG: u8 = 0x80;

// FIXARRAY: 0x90..=0x9F (top nibble 1001, item count 0..15)
pub const FIXARRAY_MASK: u8 = 0xF0;
pub const FIXARRAY_TAG: u8 = 0x90;

// FIXSTR: 0xA0..=0xBF (top bits 101, byte length 0..31)
pub const FIXSTR_MASK: u8 = 0xE0;
pub const FIXSTR_TAG: u8 = 0xA0;

// NEGATIVE_FIXINT: 0xE0..=0xFF (top bits 111, the byte is the i8 value -32..-1)
pub const NEGATIVE_FIXINT_MASK: u8 = 0xE0;
pub const NEGATIVE_FIXINT_TAG: u8 = 0xE0;

/// Largest count a fixarray or fixmap header can carry.
pub const FIX_COLLECTION_MAX: usize = 15;

/// Largest byte length a fixstr header can carry.
pub const FIXSTR_MAX: usize = 31;

/// Largest length any header can carry.
pub const LEN_32_MAX: usize = u32::MAX as usize;
