//! Positional MessagePack reader with transactional extraction.

use bytes::{Buf, Bytes};

use super::transaction::Transaction;
use crate::codec::decode;
use crate::config::ReaderConfig;
use crate::error::PackError;
use crate::ext::{self, ExtValue, Extension, ExtensionRegistry};
use crate::format::Format;
use crate::types::{Unpack, Value};

/// Reads MessagePack values from a borrowed byte slice.
///
/// Every extraction runs inside a [`Transaction`]: if it fails, the cursor
/// returns to where the extraction started and the reader is marked failed.
/// While failed, every read returns [`PackError::StreamFailed`] until
/// [`recover`](Self::recover) is called.
///
/// ```
/// use packwire::MsgpackReader;
///
/// let mut reader = MsgpackReader::new(&[0x93, 0x01, 0x02, 0x03, 0xC0]);
/// assert_eq!(reader.read::<Vec<i64>>().unwrap(), vec![1, 2, 3]);
///
/// assert!(reader.read::<i64>().is_err());
/// assert!(reader.has_failed());
/// assert_eq!(reader.position(), 4);
///
/// reader.recover();
/// reader.read_nil().unwrap();
/// assert!(reader.is_eof());
/// ```
#[derive(Debug, Clone)]
pub struct MsgpackReader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    failed: bool,
    config: ReaderConfig,
    registry: Option<&'a ExtensionRegistry>,
}

impl<'a> MsgpackReader<'a> {
    /// Creates a reader over `data` with default limits and no registry.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            failed: false,
            config: ReaderConfig::default(),
            registry: None,
        }
    }

    /// Replaces the decode limits.
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches an extension registry.
    ///
    /// With a registry, typed extension reads also check that the type id is
    /// registered to the requested Rust type, and dynamic reads validate the
    /// payloads of registered type ids.
    pub fn with_registry(mut self, registry: &'a ExtensionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reader over an extension payload, inheriting limits, registry and depth.
    pub(crate) fn payload_reader(&self, payload: &'a [u8]) -> Self {
        Self {
            data: payload,
            pos: 0,
            depth: self.depth,
            failed: false,
            config: self.config,
            registry: self.registry,
        }
    }

    // -- Stream state --

    /// Current read position, in bytes from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Returns `true` after a failed extraction until `recover()` is called.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Clears the failed flag. The cursor stays at the rolled-back position.
    pub fn recover(&mut self) {
        self.failed = false;
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn registry(&self) -> Option<&'a ExtensionRegistry> {
        self.registry
    }

    /// Returns the unread bytes without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        let data = self.data;
        &data[self.pos..]
    }

    /// Opens a transaction at the current position.
    pub fn transaction(&mut self) -> Transaction<'_, 'a> {
        Transaction::begin(self)
    }

    // -- Typed extraction --

    /// Reads one value of type `T`.
    pub fn read<T: Unpack>(&mut self) -> Result<T, PackError> {
        self.attempt(T::unpack)
    }

    /// Reads one value into `out`.
    ///
    /// On failure, including on a reader that has already failed, scalars
    /// keep their previous value and collections are left empty.
    pub fn read_into<T: Unpack>(&mut self, out: &mut T) -> Result<(), PackError> {
        if self.failed {
            T::reset(out);
            return Err(PackError::StreamFailed);
        }
        self.attempt(|r| T::unpack_into(r, out))
    }

    /// Reads a whole `Value` of any type.
    pub fn read_value(&mut self) -> Result<Value, PackError> {
        self.attempt(decode::decode_value)
    }

    pub fn read_nil(&mut self) -> Result<(), PackError> {
        self.attempt(decode::decode_nil)
    }

    pub fn read_bool(&mut self) -> Result<bool, PackError> {
        self.read()
    }

    pub fn read_int(&mut self) -> Result<i64, PackError> {
        self.read()
    }

    pub fn read_uint(&mut self) -> Result<u64, PackError> {
        self.read()
    }

    pub fn read_f32(&mut self) -> Result<f32, PackError> {
        self.read()
    }

    pub fn read_f64(&mut self) -> Result<f64, PackError> {
        self.read()
    }

    pub fn read_str(&mut self) -> Result<String, PackError> {
        self.read()
    }

    /// Reads a string without copying it out of the input.
    pub fn read_str_ref(&mut self) -> Result<&'a str, PackError> {
        self.attempt(decode::decode_str_ref)
    }

    pub fn read_bin(&mut self) -> Result<Bytes, PackError> {
        self.read()
    }

    /// Reads a binary blob without copying it out of the input.
    pub fn read_bin_ref(&mut self) -> Result<&'a [u8], PackError> {
        self.attempt(decode::decode_bin_ref)
    }

    /// Reads an array header and returns the item count.
    ///
    /// The items follow and must be read by the caller; wrap the whole array
    /// in a [`transaction`](Self::transaction) to keep it atomic.
    pub fn read_array_len(&mut self) -> Result<usize, PackError> {
        self.attempt(decode::decode_array_len)
    }

    /// Reads a map header and returns the pair count.
    pub fn read_map_len(&mut self) -> Result<usize, PackError> {
        self.attempt(decode::decode_map_len)
    }

    /// Reads an extension header, returning `(type_id, payload_len)`.
    pub fn read_ext_header(&mut self) -> Result<(i8, usize), PackError> {
        self.attempt(decode::decode_ext_header)
    }

    /// Reads an extension of type `T`, checking its type id.
    pub fn read_ext<T: Extension>(&mut self) -> Result<T, PackError> {
        self.attempt(ext::decode_ext::<T>)
    }

    /// Reads an extension of any type as raw bytes.
    pub fn read_ext_value(&mut self) -> Result<ExtValue, PackError> {
        self.read()
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], PackError> {
        self.attempt(|r| r.take_raw(len))
    }

    /// Reads exactly `N` raw bytes into an array.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], PackError> {
        self.attempt(|r| r.take_fixed::<N>())
    }

    /// Skips one complete value of any type.
    pub fn skip_value(&mut self) -> Result<(), PackError> {
        self.attempt(decode::skip_value)
    }

    /// Returns the format of the next value without consuming it.
    pub fn peek_format(&self) -> Result<Format, PackError> {
        self.ensure(1)?;
        Ok(Format::from_byte(self.data[self.pos]))
    }

    /// Runs `f` in a transaction, committing on success.
    fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut MsgpackReader<'a>) -> Result<T, PackError>,
    ) -> Result<T, PackError> {
        if self.failed {
            return Err(PackError::StreamFailed);
        }
        let mut tx = self.transaction();
        let value = f(&mut *tx)?;
        tx.commit()?;
        Ok(value)
    }

    // -- Raw access for the codec --

    fn ensure(&self, needed: usize) -> Result<(), PackError> {
        if self.failed {
            return Err(PackError::StreamFailed);
        }
        if self.remaining() < needed {
            Err(PackError::Truncated {
                needed,
                remaining: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    fn take<T>(&mut self, len: usize, get: impl FnOnce(&mut &'a [u8]) -> T) -> Result<T, PackError> {
        self.ensure(len)?;
        let data = self.data;
        let mut window = &data[self.pos..self.pos + len];
        let value = get(&mut window);
        self.pos += len;
        Ok(value)
    }

    pub(crate) fn take_raw(&mut self, len: usize) -> Result<&'a [u8], PackError> {
        self.take(len, |window| *window)
    }

    pub(crate) fn take_fixed<const N: usize>(&mut self) -> Result<[u8; N], PackError> {
        self.take(N, |window| {
            let mut out = [0u8; N];
            window.copy_to_slice(&mut out);
            out
        })
    }

    pub(crate) fn take_u8(&mut self) -> Result<u8, PackError> {
        self.take(1, |b| b.get_u8())
    }

    pub(crate) fn take_i8(&mut self) -> Result<i8, PackError> {
        self.take(1, |b| b.get_i8())
    }

    pub(crate) fn take_u16(&mut self) -> Result<u16, PackError> {
        self.take(2, |b| b.get_u16())
    }

    pub(crate) fn take_i16(&mut self) -> Result<i16, PackError> {
        self.take(2, |b| b.get_i16())
    }

    pub(crate) fn take_u32(&mut self) -> Result<u32, PackError> {
        self.take(4, |b| b.get_u32())
    }

    pub(crate) fn take_i32(&mut self) -> Result<i32, PackError> {
        self.take(4, |b| b.get_i32())
    }

    pub(crate) fn take_u64(&mut self) -> Result<u64, PackError> {
        self.take(8, |b| b.get_u64())
    }

    pub(crate) fn take_i64(&mut self) -> Result<i64, PackError> {
        self.take(8, |b| b.get_i64())
    }

    // -- Nesting --

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter(&mut self) -> Result<(), PackError> {
        if self.depth >= self.config.max_depth {
            return Err(PackError::DepthExceeded(self.config.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn rewind(&mut self, pos: usize, depth: usize) {
        self.pos = pos;
        self.depth = depth;
        self.failed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;

    #[test]
    fn int_from_nil_fails_without_moving() {
        let data = [0xC0];
        let mut reader = MsgpackReader::new(&data);
        let err = reader.read_int().unwrap_err();
        assert!(matches!(
            err,
            PackError::Format {
                found: Format::Nil,
                ..
            }
        ));
        assert!(reader.has_failed());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn failed_reader_refuses_reads_until_recovered() {
        let data = [0xC0, 0x01];
        let mut reader = MsgpackReader::new(&data);
        assert!(reader.read_bool().is_err());
        assert!(matches!(reader.read_nil(), Err(PackError::StreamFailed)));
        assert!(matches!(reader.peek_format(), Err(PackError::StreamFailed)));
        reader.recover();
        reader.read_nil().unwrap();
        assert_eq!(reader.read_int().unwrap(), 1);
        assert!(reader.is_eof());
    }

    #[test]
    fn truncated_payload() {
        let data = [0xD2, 0x00, 0x01];
        let mut reader = MsgpackReader::new(&data);
        let err = reader.read_int().unwrap_err();
        assert!(matches!(
            err,
            PackError::Truncated {
                needed: 4,
                remaining: 2
            }
        ));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn empty_input() {
        let mut reader = MsgpackReader::new(&[]);
        assert!(reader.is_eof());
        assert!(matches!(
            reader.read_value(),
            Err(PackError::Truncated { needed: 1, .. })
        ));
    }

    #[test]
    fn zero_copy_reads_borrow_from_input() {
        let data = [0xA2, b'h', b'i', 0xC4, 0x01, 0xFF];
        let mut reader = MsgpackReader::new(&data);
        let s = reader.read_str_ref().unwrap();
        let b = reader.read_bin_ref().unwrap();
        assert_eq!(s, "hi");
        assert_eq!(b, &[0xFF]);
        assert_eq!(s.as_ptr(), data[1..].as_ptr());
    }

    #[test]
    fn raw_reads() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = MsgpackReader::new(&data);
        assert_eq!(reader.read_fixed::<2>().unwrap(), [0x01, 0x02]);
        assert_eq!(reader.rest(), &[0x03]);
        assert!(reader.read_raw(2).is_err());
        reader.recover();
        assert_eq!(reader.read_raw(1).unwrap(), &[0x03]);
    }

    #[test]
    fn manual_array_reading_inside_a_transaction() {
        let data = [0x92, 0x01, 0xC0];
        let mut reader = MsgpackReader::new(&data);
        let mut tx = reader.transaction();
        let len = tx.read_array_len().unwrap();
        assert_eq!(len, 2);
        assert_eq!(tx.read_int().unwrap(), 1);
        assert!(tx.read_int().is_err());
        drop(tx);
        assert_eq!(reader.position(), 0);
        assert!(reader.has_failed());
    }

    #[test]
    fn depth_limit() {
        // [[[1]]]
        let data = [0x91, 0x91, 0x91, 0x01];
        let mut reader = MsgpackReader::new(&data).with_config(ReaderConfig::new().max_depth(2));
        assert!(matches!(
            reader.read_value(),
            Err(PackError::DepthExceeded(2))
        ));
        assert_eq!(reader.position(), 0);

        let mut reader = MsgpackReader::new(&data).with_config(ReaderConfig::new().max_depth(3));
        assert!(reader.read_value().is_ok());
    }

    #[test]
    fn peek_does_not_consume() {
        let data = [0x93, 0x01, 0x02, 0x03];
        let reader = MsgpackReader::new(&data);
        assert_eq!(reader.peek_format().unwrap(), Format::FixArray(3));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn skip_value_moves_past_nested_data() {
        let data = [0x82, 0xA1, b'a', 0x92, 0x01, 0x02, 0xA1, b'b', 0xC3, 0x2A];
        let mut reader = MsgpackReader::new(&data);
        reader.skip_value().unwrap();
        assert_eq!(reader.read_int().unwrap(), 42);
    }
}
