//! I/O wrappers for tracking data transfer.
//!
//! This module provides [`ProgressReader`] and [`ProgressWriter`], which wrap any
//! implementation of [`std::io::Read`] or [`std::io::Write`].
//!
//! # Mechanics
//!
//! These wrappers act as "pass-through" middleware. Every call is forwarded unchanged and
//! every error comes back untouched; on success the associated [`ProgressBar`] advances by
//! the number of bytes the inner stream actually reported, which may be less than asked
//! for (zero at end-of-stream).
//!
//! [`ProgressReader::mark`] and [`ProgressReader::reset`] rewind a seekable stream and the
//! progress counter together, so retried reads are not counted twice. The bar will show
//! the lower value after a reset.

use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use crate::ProgressBar;

const SKIP_CHUNK: usize = 8 * 1024;

/// Stream and progress positions recorded by [`ProgressReader::mark`].
#[derive(Clone, Copy, Debug)]
struct Mark {
    stream: u64,
    progress: u64,
}

/// A wrapper around [`Read`] that advances a [`ProgressBar`] by the bytes read.
pub struct ProgressReader<R> {
    inner: R,
    bar: ProgressBar,
    mark: Option<Mark>,
}

impl<R> ProgressReader<R> {
    /// Creates a new `ProgressReader` wrapping `inner`, reporting to `bar`.
    pub const fn new(inner: R, bar: ProgressBar) -> Self {
        Self {
            inner,
            bar,
            mark: None,
        }
    }

    /// The bar this reader reports to.
    pub const fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Gets a reference to the underlying reader.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Gets a mutable reference to the underlying reader.
    ///
    /// Bytes read through this reference are not counted.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Drops the underlying reader and closes the bar.
    pub fn close(self) -> io::Result<()> {
        drop(self.inner);
        self.bar.close()?;
        Ok(())
    }
}

impl<R: Read> ProgressReader<R> {
    /// Reads a single byte; `None` at end-of-stream.
    ///
    /// Errors, `Interrupted` included, are returned as-is; retrying is up to the caller.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        if self.inner.read(&mut byte)? == 0 {
            return Ok(None);
        }
        self.bar.track(1);
        Ok(Some(byte[0]))
    }

    /// Discards up to `n` bytes and returns how many were actually skipped.
    ///
    /// Progress advances by the bytes actually skipped, not by `n`. An error stops the
    /// skip; bytes discarded before it stay counted.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut scratch = [0u8; SKIP_CHUNK];
        let mut skipped = 0;
        while skipped < n {
            let want = (n - skipped).min(SKIP_CHUNK as u64) as usize;
            let read = self.inner.read(&mut scratch[..want])?;
            if read == 0 {
                break;
            }
            self.bar.track(read as u64);
            skipped += read as u64;
        }
        Ok(skipped)
    }
}

impl<R: Seek> ProgressReader<R> {
    /// Records the current stream position and progress value.
    pub fn mark(&mut self) -> io::Result<()> {
        self.mark = Some(Mark {
            stream: self.inner.stream_position()?,
            progress: self.bar.current(),
        });
        Ok(())
    }

    /// Seeks back to the last [`mark`](Self::mark) and rolls the progress back with it.
    pub fn reset(&mut self) -> io::Result<()> {
        let mark = self
            .mark
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "reset without mark"))?;
        self.inner.seek(SeekFrom::Start(mark.stream))?;
        self.bar.track_to(mark.progress);
        Ok(())
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bar.track(n as u64);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for ProgressReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.bar.track(amt as u64);
    }
}

/// A wrapper around [`Write`] that advances a [`ProgressBar`] by the bytes written.
pub struct ProgressWriter<W> {
    inner: W,
    bar: ProgressBar,
}

impl<W> ProgressWriter<W> {
    /// Creates a new `ProgressWriter` wrapping `inner`, reporting to `bar`.
    pub const fn new(inner: W, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }

    /// The bar this writer reports to.
    pub const fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Gets a reference to the underlying writer.
    pub const fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> ProgressWriter<W> {
    /// Flushes and drops the underlying writer, then closes the bar.
    pub fn close(mut self) -> io::Result<()> {
        self.inner.flush()?;
        drop(self.inner);
        self.bar.close()?;
        Ok(())
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bar.track(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
