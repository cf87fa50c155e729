//! The writing half of a framed connection.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, Serialize};

/// Writes length prefixed frames to an async writer.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Serializes `msg` into a single frame and flushes it.
    ///
    /// Bulk payloads the message hands back are written straight from their
    /// storage, after the header and without being copied into the frame buffer.
    ///
    /// # Errors
    /// `InvalidInput` if the frame would exceed `MAX_FRAME_LEN`, or any error of the writer.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self { buf, tx } = self;

        buf.clear();
        buf.extend_from_slice(&[0; LEN_TYPE_SIZE]);

        let trailer = msg.serialize(buf)?;
        let body = buf.len() - LEN_TYPE_SIZE + trailer.map_or(0, <[u8]>::len);

        if body > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {body} bytes exceeds the {MAX_FRAME_LEN} byte limit"),
            ));
        }

        buf[..LEN_TYPE_SIZE].copy_from_slice(&(body as LenType).to_be_bytes());
        tx.write_all(buf).await?;

        if let Some(trailer) = trailer {
            tx.write_all(trailer).await?;
        }

        tx.flush().await
    }

    /// Flushes and closes the write half, the peer reads end of stream afterwards.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}
