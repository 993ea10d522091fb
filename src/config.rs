//! Decode limits and framing configuration.

use crate::format::marker::LEN_32_MAX;

/// Default nesting limit for arrays, maps and extension payloads.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default maximum frame size for the framing layer (16 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Limits applied by a [`MsgpackReader`](crate::MsgpackReader).
///
/// Limits are checked against declared lengths before anything is allocated,
/// so hostile headers fail fast.
///
/// ```
/// use packwire::ReaderConfig;
///
/// let config = ReaderConfig::new().max_depth(16).max_collection_len(1024);
/// assert_eq!(config.depth_limit(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    pub(crate) max_depth: usize,
    pub(crate) max_collection_len: usize,
    pub(crate) max_bytes_len: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_collection_len: LEN_32_MAX,
            max_bytes_len: LEN_32_MAX,
        }
    }
}

impl ReaderConfig {
    /// Creates a config with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum item count of one array or pair count of one map.
    pub fn max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    /// Sets the maximum byte length of one string, binary or extension payload.
    pub fn max_bytes_len(mut self, len: usize) -> Self {
        self.max_bytes_len = len;
        self
    }

    pub fn depth_limit(&self) -> usize {
        self.max_depth
    }

    pub fn collection_len_limit(&self) -> usize {
        self.max_collection_len
    }

    pub fn bytes_len_limit(&self) -> usize {
        self.max_bytes_len
    }
}

/// Configuration for the length-prefixed framing layer.
#[cfg(feature = "framing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    pub(crate) max_frame_len: usize,
    pub(crate) reader: ReaderConfig,
}

#[cfg(feature = "framing")]
impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            reader: ReaderConfig::default(),
        }
    }
}

#[cfg(feature = "framing")]
impl FrameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest frame payload accepted or produced.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len.min(LEN_32_MAX);
        self
    }

    /// Sets the limits used when decoding frame payloads.
    pub fn reader(mut self, config: ReaderConfig) -> Self {
        self.reader = config;
        self
    }

    pub fn frame_len_limit(&self) -> usize {
        self.max_frame_len
    }
}
