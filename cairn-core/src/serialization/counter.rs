//! Byte-counting writer

use std::io::{self, Write};

/// A [`Write`] adapter that counts the bytes passing through it.
///
/// Wrapping [`io::sink()`] measures an encoding without keeping the payload,
/// which is how the cache computes its serialized size.
#[derive(Debug)]
pub struct ByteCounter<W> {
    inner: W,
    count: u64,
}

impl ByteCounter<io::Sink> {
    /// A counter that discards everything it is given
    pub fn sink() -> Self {
        Self::new(io::sink())
    }
}

impl<W> ByteCounter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Number of bytes written so far
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ByteCounter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
