//! # Line Framer
//!
//! Splits a serial byte stream into newline-terminated lines.

use bytes::{Bytes, BytesMut};
use tracing::warn;

/// Longest line kept while waiting for its terminator
pub const MAX_LINE_LEN: usize = 4096;

/// Accumulates bytes and yields complete lines without their `\n` / `\r\n`
///
/// A partial line that grows past [`MAX_LINE_LEN`] is dropped, along with the
/// rest of that line up to its terminator.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Receive buffer, for reading directly into it
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Next complete line, if one is buffered
    pub fn next_line(&mut self) -> Option<Bytes> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                if self.buf.len() > MAX_LINE_LEN {
                    warn!(
                        "Discarding {} bytes without line terminator",
                        self.buf.len()
                    );
                    self.buf.clear();
                    self.discarding = true;
                }
                return None;
            };

            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > MAX_LINE_LEN {
                warn!("Discarding {} byte line over the length limit", line.len());
                continue;
            }
            return Some(line.freeze());
        }
    }

    /// Takes the unterminated tail at end of stream
    pub fn finish(&mut self) -> Option<Bytes> {
        if let Some(line) = self.next_line() {
            return Some(line);
        }
        let discarding = std::mem::take(&mut self.discarding);
        if self.buf.is_empty() || discarding {
            self.buf.clear();
            return None;
        }
        Some(self.buf.split().freeze())
    }
}
