//! Reader and writer facades over a byte sequence.

pub mod reader;
pub mod transaction;
pub mod writer;

pub use reader::MsgpackReader;
pub use transaction::Transaction;
pub use writer::MsgpackWriter;
