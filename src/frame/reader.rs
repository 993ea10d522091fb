//! Reads framed values from an async byte stream.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::HEADER_LEN;
use crate::config::FrameConfig;
use crate::error::PackError;
use crate::ext::ExtensionRegistry;
use crate::stream::MsgpackReader;
use crate::types::Unpack;

/// Reads length-prefixed frames from an `AsyncRead` stream.
pub struct FrameReader<R> {
    reader: R,
    config: FrameConfig,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, FrameConfig::default())
    }

    pub fn with_config(reader: R, config: FrameConfig) -> Self {
        Self { reader, config }
    }

    /// Reads one frame payload.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames. A stream
    /// that ends inside a frame is an error.
    pub async fn read_frame(&mut self) -> Result<Option<BytesMut>, PackError> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.reader.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(PackError::Frame(format!(
                    "stream closed after {filled} of {HEADER_LEN} header bytes"
                )));
            }
            filled += n;
        }

        let len = u32::from_be_bytes(header) as usize;
        let limit = self.config.frame_len_limit();
        if len > limit {
            tracing::warn!(len, limit, "rejecting oversized frame");
            return Err(PackError::Frame(format!(
                "frame of {len} bytes exceeds limit of {limit}"
            )));
        }

        let mut payload = BytesMut::zeroed(len);
        self.reader.read_exact(&mut payload).await?;
        tracing::debug!(len, "read frame");
        Ok(Some(payload))
    }

    /// Reads one frame and decodes it as a single `T`.
    pub async fn read_value<T: Unpack>(&mut self) -> Result<Option<T>, PackError> {
        self.read_value_inner(None).await
    }

    /// Like [`read_value`](Self::read_value), enforcing `registry` on
    /// extension payloads.
    pub async fn read_value_with<T: Unpack>(
        &mut self,
        registry: &ExtensionRegistry,
    ) -> Result<Option<T>, PackError> {
        self.read_value_inner(Some(registry)).await
    }

    async fn read_value_inner<T: Unpack>(
        &mut self,
        registry: Option<&ExtensionRegistry>,
    ) -> Result<Option<T>, PackError> {
        let Some(frame) = self.read_frame().await? else {
            return Ok(None);
        };
        let mut reader = MsgpackReader::new(&frame).with_config(self.config.reader);
        if let Some(registry) = registry {
            reader = reader.with_registry(registry);
        }
        let value = reader.read::<T>()?;
        if !reader.is_eof() {
            tracing::debug!(unread = reader.remaining(), "frame has trailing bytes");
            return Err(PackError::TrailingBytes(reader.remaining()));
        }
        Ok(Some(value))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
