//! Rollback guard for compound reads.

use std::ops::{Deref, DerefMut};

use super::reader::MsgpackReader;
use crate::error::PackError;

/// A scoped read attempt on a [`MsgpackReader`].
///
/// The guard records the cursor when it is opened. Reads go through it via
/// `Deref`. Calling [`commit`](Self::commit) keeps whatever was consumed;
/// dropping it uncommitted (including through `?`) rewinds the cursor and
/// marks the reader failed.
///
/// Transactions nest. Rolling back an inner one leaves the outer one open,
/// so the outer code can [`recover`](MsgpackReader::recover) and try another
/// decode at the same position:
///
/// ```
/// use packwire::{MsgpackReader, MsgpackWriter};
///
/// let mut writer = MsgpackWriter::new();
/// writer.write("not a number");
/// let bytes = writer.into_bytes();
///
/// let mut reader = MsgpackReader::new(&bytes);
/// let mut tx = reader.transaction();
/// assert!(tx.read::<i64>().is_err());
/// tx.recover();
/// assert_eq!(tx.read::<String>().unwrap(), "not a number");
/// tx.commit().unwrap();
/// assert!(reader.is_eof());
/// ```
pub struct Transaction<'r, 'a> {
    reader: &'r mut MsgpackReader<'a>,
    start: usize,
    depth: usize,
    committed: bool,
}

impl<'r, 'a> Transaction<'r, 'a> {
    pub(crate) fn begin(reader: &'r mut MsgpackReader<'a>) -> Self {
        let start = reader.position();
        let depth = reader.depth();
        Self {
            reader,
            start,
            depth,
            committed: false,
        }
    }

    /// Cursor position recorded when the transaction opened.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Keeps the bytes consumed so far.
    ///
    /// Fails, and rolls back, if a read inside the transaction left the reader
    /// failed without a `recover()`.
    pub fn commit(mut self) -> Result<(), PackError> {
        if self.reader.has_failed() {
            return Err(PackError::StreamFailed);
        }
        self.committed = true;
        Ok(())
    }

    /// Rewinds to the recorded position and marks the reader failed.
    pub fn rollback(self) {}
}

impl<'a> Deref for Transaction<'_, 'a> {
    type Target = MsgpackReader<'a>;

    fn deref(&self) -> &Self::Target {
        self.reader
    }
}

impl<'a> DerefMut for Transaction<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
    }
}

impl Drop for Transaction<'_, '_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::trace!(
                from = self.reader.position(),
                to = self.start,
                "rolling back msgpack read"
            );
            self.reader.rewind(self.start, self.depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PackError;
    use crate::stream::MsgpackReader;

    #[test]
    fn commit_keeps_position() {
        let data = [0x01, 0x02];
        let mut reader = MsgpackReader::new(&data);
        let mut tx = reader.transaction();
        assert_eq!(tx.read::<i64>().unwrap(), 1);
        tx.commit().unwrap();
        assert_eq!(reader.position(), 1);
        assert!(!reader.has_failed());
    }

    #[test]
    fn drop_without_commit_rolls_back() {
        let data = [0x01, 0x02];
        let mut reader = MsgpackReader::new(&data);
        {
            let mut tx = reader.transaction();
            tx.read::<i64>().unwrap();
            tx.read::<i64>().unwrap();
            assert_eq!(tx.start(), 0);
        }
        assert_eq!(reader.position(), 0);
        assert!(reader.has_failed());
    }

    #[test]
    fn explicit_rollback() {
        let data = [0x01];
        let mut reader = MsgpackReader::new(&data);
        let mut tx = reader.transaction();
        tx.read::<i64>().unwrap();
        tx.rollback();
        assert_eq!(reader.position(), 0);
        assert!(reader.has_failed());
        assert!(matches!(reader.read::<i64>(), Err(PackError::StreamFailed)));
        reader.recover();
        assert_eq!(reader.read::<i64>().unwrap(), 1);
    }

    #[test]
    fn commit_after_unrecovered_inner_failure_rolls_back() {
        let data = [0x01, 0xC0];
        let mut reader = MsgpackReader::new(&data);
        let mut tx = reader.transaction();
        tx.read::<i64>().unwrap();
        assert!(tx.read::<i64>().is_err());
        assert!(matches!(tx.commit(), Err(PackError::StreamFailed)));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn inner_rollback_leaves_outer_open() {
        let data = [0x01, 0xC3];
        let mut reader = MsgpackReader::new(&data);
        let mut outer = reader.transaction();
        assert_eq!(outer.read::<i64>().unwrap(), 1);
        {
            let mut inner = outer.transaction();
            assert!(inner.read::<i64>().is_err());
        }
        assert_eq!(outer.position(), 1);
        outer.recover();
        assert!(outer.read::<bool>().unwrap());
        outer.commit().unwrap();
        assert!(reader.is_eof());
    }
}
