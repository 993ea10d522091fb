//! The predefined MessagePack timestamp extension (type -1).
//!
//! Three payload layouts, chosen by range:
//! - 4 bytes: `u32` seconds, zero nanoseconds, seconds in `0..2^32`
//! - 8 bytes: 30-bit nanoseconds and 34-bit seconds packed in a `u64`
//! - 12 bytes: `u32` nanoseconds then `i64` seconds

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::Extension;
use crate::error::PackError;
use crate::stream::{MsgpackReader, MsgpackWriter};
use crate::types::{Pack, Unpack};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A point in time as seconds and nanoseconds relative to the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    seconds: i64,
    nanoseconds: u32,
}

impl Timestamp {
    /// Returns `None` if `nanoseconds` is a full second or more.
    pub fn new(seconds: i64, nanoseconds: u32) -> Option<Self> {
        (nanoseconds < NANOS_PER_SEC).then_some(Self {
            seconds,
            nanoseconds,
        })
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds: 0,
        }
    }

    pub fn now() -> Self {
        SystemTime::now().into()
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    fn invalid(reason: impl Into<String>) -> PackError {
        PackError::ExtensionPayload {
            type_id: Self::TYPE_ID,
            reason: reason.into(),
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self {
                seconds: i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
                nanoseconds: after.subsec_nanos(),
            },
            Err(err) => {
                // Before the epoch: borrow a second when there is a fraction.
                let before = err.duration();
                let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                match before.subsec_nanos() {
                    0 => Self {
                        seconds: -secs,
                        nanoseconds: 0,
                    },
                    nanos => Self {
                        seconds: -secs - 1,
                        nanoseconds: NANOS_PER_SEC - nanos,
                    },
                }
            }
        }
    }
}

impl TryFrom<Timestamp> for SystemTime {
    type Error = PackError;

    fn try_from(ts: Timestamp) -> Result<Self, Self::Error> {
        let out_of_range = || Timestamp::invalid("timestamp out of SystemTime range");
        let time = if ts.seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::new(ts.seconds as u64, ts.nanoseconds))
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(ts.seconds.unsigned_abs()))
                .and_then(|t| t.checked_add(Duration::from_nanos(u64::from(ts.nanoseconds))))
        };
        time.ok_or_else(out_of_range)
    }
}

impl Extension for Timestamp {
    const TYPE_ID: i8 = -1;

    fn payload_len(&self) -> usize {
        if self.seconds >> 34 == 0 {
            if self.nanoseconds == 0 && self.seconds <= i64::from(u32::MAX) {
                4
            } else {
                8
            }
        } else {
            12
        }
    }

    fn write_payload(&self, writer: &mut MsgpackWriter) {
        match self.payload_len() {
            4 => writer.write_raw(&(self.seconds as u32).to_be_bytes()),
            8 => {
                let packed = (u64::from(self.nanoseconds) << 34) | self.seconds as u64;
                writer.write_raw(&packed.to_be_bytes())
            }
            _ => writer
                .write_raw(&self.nanoseconds.to_be_bytes())
                .write_raw(&self.seconds.to_be_bytes()),
        };
    }

    fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        let (seconds, nanoseconds) = match payload.remaining() {
            4 => (i64::from(u32::from_be_bytes(payload.read_fixed()?)), 0),
            8 => {
                let packed = u64::from_be_bytes(payload.read_fixed()?);
                ((packed & 0x3_FFFF_FFFF) as i64, (packed >> 34) as u32)
            }
            12 => {
                let nanos = u32::from_be_bytes(payload.read_fixed()?);
                let secs = i64::from_be_bytes(payload.read_fixed()?);
                (secs, nanos)
            }
            n => return Err(Self::invalid(format!("payload of {n} bytes"))),
        };
        Self::new(seconds, nanoseconds)
            .ok_or_else(|| Self::invalid(format!("nanoseconds {nanoseconds} out of range")))
    }
}

impl Pack for Timestamp {
    fn pack(&self, writer: &mut MsgpackWriter) {
        writer.write_ext(self);
    }
}

impl Unpack for Timestamp {
    fn unpack(reader: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
        super::decode_ext::<Self>(reader)
    }
}
