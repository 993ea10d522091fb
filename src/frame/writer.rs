//! Writes framed values to an async byte stream.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::HEADER_LEN;
use crate::config::FrameConfig;
use crate::error::PackError;
use crate::stream::MsgpackWriter;
use crate::types::Pack;

/// Writes length-prefixed frames to an `AsyncWrite` stream.
pub struct FrameWriter<W> {
    writer: W,
    config: FrameConfig,
    scratch: MsgpackWriter,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, FrameConfig::default())
    }

    pub fn with_config(writer: W, config: FrameConfig) -> Self {
        Self {
            writer,
            config,
            scratch: MsgpackWriter::new(),
        }
    }

    /// Writes `data` as one frame.
    pub async fn write_frame(&mut self, data: &[u8]) -> Result<(), PackError> {
        write_frame(&mut self.writer, &self.config, data).await
    }

    /// Encodes `value` and writes it as one frame.
    pub async fn write_value<T: Pack + ?Sized>(&mut self, value: &T) -> Result<(), PackError> {
        self.scratch.clear();
        self.scratch.write(value);
        write_frame(&mut self.writer, &self.config, self.scratch.as_bytes()).await
    }

    /// Flushes the underlying writer.
    pub async fn flush(&mut self) -> Result<(), PackError> {
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    config: &FrameConfig,
    data: &[u8],
) -> Result<(), PackError> {
    let limit = config.frame_len_limit();
    if data.len() > limit {
        return Err(PackError::Frame(format!(
            "frame of {} bytes exceeds limit of {limit}",
            data.len()
        )));
    }
    // The limit is capped at u32::MAX, so the length always fits.
    let header: [u8; HEADER_LEN] = (data.len() as u32).to_be_bytes();
    writer.write_all(&header).await?;
    writer.write_all(data).await?;
    tracing::debug!(len = data.len(), "wrote frame");
    Ok(())
}
