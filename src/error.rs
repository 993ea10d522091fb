//! Error types for MessagePack encoding and decoding.

use crate::format::Format;

/// Errors that can occur while reading MessagePack data.
///
/// Most variants describe malformed or unexpected input and are recoverable:
/// the reader rolls back to the start of the failed read and can be
/// [`recover`](crate::MsgpackReader::recover)ed to try another decode path.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("expected {expected}, found {found} (0x{byte:02X})")]
    Format {
        expected: &'static str,
        found: Format,
        byte: u8,
    },

    #[error("reserved lead byte 0x{0:02X}")]
    ReservedByte(u8),

    #[error("need {needed} bytes but only {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("integer {value} out of range for {target}")]
    OutOfRange { value: i128, target: &'static str },

    #[error("invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("duplicate map key at entry {0}")]
    DuplicateKey(usize),

    #[error("extension type mismatch: expected {expected}, found {found}")]
    ExtensionMismatch { expected: i8, found: i8 },

    #[error("extension type {type_id} is registered as {registered}, not {requested}")]
    ExtensionType {
        type_id: i8,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("no extension registered for type {0}")]
    UnknownExtension(i8),

    #[error("extension {type_id} left {unread} of {len} payload bytes unread")]
    ExtensionLength {
        type_id: i8,
        len: usize,
        unread: usize,
    },

    #[error("invalid extension {type_id} payload: {reason}")]
    ExtensionPayload { type_id: i8, reason: String },

    #[error("{what} length {len} exceeds limit {limit}")]
    LimitExceeded {
        what: &'static str,
        len: usize,
        limit: usize,
    },

    #[error("nesting depth exceeds limit {0}")]
    DepthExceeded(usize),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("reader is in a failed state")]
    StreamFailed,

    #[error("extension type {type_id} already registered by {existing}")]
    DuplicateExtension {
        type_id: i8,
        existing: &'static str,
    },

    #[error("frame error: {0}")]
    Frame(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    /// Builds a format error for a lead byte that is not valid at this site.
    pub fn unexpected(expected: &'static str, byte: u8) -> Self {
        match Format::from_byte(byte) {
            Format::NeverUsed => Self::ReservedByte(byte),
            found => Self::Format {
                expected,
                found,
                byte,
            },
        }
    }

    /// Returns `true` for errors caused by the input bytes, which leave the
    /// reader rolled back and able to retry after `recover()`.
    ///
    /// `TrailingBytes` is reported after a value was read successfully, by
    /// callers that own the reader, so there is nothing to roll back.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::DuplicateExtension { .. }
                | Self::TrailingBytes(_)
                | Self::Frame(_)
                | Self::Io(_)
        )
    }
}
