//! Trait abstractions for serial line delivery and command writes

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::framer::LineFramer;

/// Source of complete telemetry lines for one link
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, or `None` at end of stream
    async fn next_line(&mut self) -> io::Result<Option<Bytes>>;
}

/// Trait for serial port write operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Newline-framed reader over any async byte stream
pub struct FramedLineSource<R> {
    reader: R,
    framer: LineFramer,
}

impl<R> FramedLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: LineFramer::new(),
        }
    }
}

#[async_trait]
impl<R> LineSource for FramedLineSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(line) = self.framer.next_line() {
                return Ok(Some(line));
            }
            let read = self.reader.read_buf(self.framer.buffer_mut()).await?;
            if read == 0 {
                return Ok(self.framer.finish());
            }
        }
    }
}

/// Wrapper around the write half of a serial stream that implements SerialPortIO
pub struct TokioSerialPort<W> {
    port: W,
}

impl<W> TokioSerialPort<W> {
    pub fn new(port: W) -> Self {
        Self { port }
    }
}

#[async_trait]
impl<W> SerialPortIO for TokioSerialPort<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }
}
