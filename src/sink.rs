//! Destinations for rendered frames.
//!
//! A [`Sink`] receives every frame produced by the render loop, tells the loop how wide a
//! frame may be, and is closed exactly once when the bar closes. Two sinks ship with the
//! crate:
//!
//! * [`ConsoleSink`]: redraws a single line in place on any [`Write`] (stderr by default).
//! * [`LogSink`]: forwards frames to the [`log`] facade, for non-interactive output.
//!
//! Terminal width is consumed through the [`WidthProvider`] capability so tests and
//! embedders can inject a fixed width instead of querying the terminal.

use std::io::{self, Write};

/// Width used when the provider is unavailable or reports something unusable.
pub const DEFAULT_WIDTH: usize = 80;

/// Narrowest terminal width that is taken at face value.
pub const MIN_USABLE_WIDTH: usize = 10;

/// Columns kept free at the right edge so the cursor never wraps.
pub const RIGHT_MARGIN: usize = 1;

/// Receives rendered frames.
pub trait Sink: Send {
    /// The widest frame (in chars) this sink accepts.
    fn max_width(&self) -> usize;

    /// Displays one frame, replacing the previous one.
    fn accept(&mut self, frame: &str) -> io::Result<()>;

    /// Releases the output. Must be idempotent.
    fn close(&mut self) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn max_width(&self) -> usize {
        (**self).max_width()
    }

    fn accept(&mut self, frame: &str) -> io::Result<()> {
        (**self).accept(frame)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Reports the width of the output device, if it has one.
pub trait WidthProvider: Send {
    /// Current width in columns, `None` when unknown.
    fn width(&self) -> Option<usize>;
}

/// Queries the terminal attached to stderr, falling back to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalWidth;

impl WidthProvider for TerminalWidth {
    fn width(&self) -> Option<usize> {
        terminal_size::terminal_size_of(io::stderr())
            .or_else(terminal_size::terminal_size)
            .map(|(terminal_size::Width(w), _)| usize::from(w))
    }
}

/// A provider that always reports the same width.
#[derive(Clone, Copy, Debug)]
pub struct FixedWidth(pub usize);

impl WidthProvider for FixedWidth {
    fn width(&self) -> Option<usize> {
        Some(self.0)
    }
}

/// Applies the fallback and right margin to a provider's answer.
#[must_use]
pub fn usable_width(reported: Option<usize>) -> usize {
    let width = match reported {
        Some(w) if w >= MIN_USABLE_WIDTH => w,
        _ => DEFAULT_WIDTH,
    };
    width - RIGHT_MARGIN
}

/// Redraws a single line in place on a writer.
///
/// Every frame starts with a carriage return and is padded with spaces to the width of
/// the previous frame, so shorter frames fully overwrite longer ones. Closing emits one
/// trailing newline so following output starts on a fresh line.
pub struct ConsoleSink<W: Write + Send = io::Stderr> {
    out: W,
    width: Box<dyn WidthProvider>,
    last_len: usize,
    closed: bool,
}

impl ConsoleSink {
    /// A sink on stderr sized by the attached terminal.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr(), TerminalWidth)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Creates a sink writing to `out`, sized by `width`.
    pub fn new(out: W, width: impl WidthProvider + 'static) -> Self {
        Self {
            out,
            width: Box::new(width),
            last_len: 0,
            closed: false,
        }
    }

    /// Gives back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn max_width(&self) -> usize {
        usable_width(self.width.width())
    }

    fn accept(&mut self, frame: &str) -> io::Result<()> {
        let len = frame.chars().count();
        // Never pad past the current width, or a shrunk terminal wraps the line.
        let pad = self.last_len.min(self.max_width()).saturating_sub(len);
        write!(self.out, "\r{frame}{:pad$}", "")?;
        self.out.flush()?;
        self.last_len = len;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Forwards frames to the [`log`] facade.
///
/// Useful when stderr is not a terminal: every frame becomes one log record, so the
/// render interval doubles as the log interval.
pub struct LogSink {
    level: log::Level,
    width: usize,
}

impl LogSink {
    /// Logs frames at `level` with the default width.
    #[must_use]
    pub const fn new(level: log::Level) -> Self {
        Self { level, width: 100 }
    }

    /// Overrides the frame width.
    #[must_use]
    pub const fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

impl Sink for LogSink {
    fn max_width(&self) -> usize {
        self.width
    }

    fn accept(&mut self, frame: &str) -> io::Result<()> {
        log::log!(target: "progress", self.level, "{frame}");
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use rstest::rstest;

    use super::{ConsoleSink, FixedWidth, LogSink, Sink, WidthProvider, usable_width};

    struct Unavailable;

    impl WidthProvider for Unavailable {
        fn width(&self) -> Option<usize> {
            None
        }
    }

    /// Width Fallback
    /// Unknown or tiny terminals fall back to 80 columns; the right margin always applies.
    #[rstest]
    #[case(None, 79)]
    #[case(Some(0), 79)]
    #[case(Some(9), 79)]
    #[case(Some(10), 9)]
    #[case(Some(120), 119)]
    fn test_usable_width(#[case] reported: Option<usize>, #[case] expected: usize) {
        assert_eq!(usable_width(reported), expected);
    }

    #[test]
    fn test_console_sink_width() {
        assert_eq!(ConsoleSink::new(Vec::new(), Unavailable).max_width(), 79);
        assert_eq!(ConsoleSink::new(Vec::new(), FixedWidth(40)).max_width(), 39);
    }

    /// In-place Redraw
    /// Shorter frames are padded to erase the previous one; close writes one newline.
    #[test]
    fn test_console_sink_output() -> io::Result<()> {
        let mut sink = ConsoleSink::new(Vec::new(), FixedWidth(40));

        sink.accept("abcdef")?;
        sink.accept("xy")?;
        sink.close()?;
        sink.close()?;

        assert_eq!(sink.into_inner(), b"\rabcdef\rxy    \n");
        Ok(())
    }

    /// Terminal Shrink
    /// After a resize the erase padding stops at the new width.
    #[test]
    fn test_console_sink_padding_capped() -> io::Result<()> {
        struct Shared(Arc<AtomicUsize>);

        impl WidthProvider for Shared {
            fn width(&self) -> Option<usize> {
                Some(self.0.load(Ordering::Relaxed))
            }
        }

        let columns = Arc::new(AtomicUsize::new(41));
        let mut sink = ConsoleSink::new(Vec::new(), Shared(Arc::clone(&columns)));

        let wide = "a".repeat(30);
        sink.accept(&wide)?;
        columns.store(21, Ordering::Relaxed);
        sink.accept("xy")?;

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, format!("\r{wide}\rxy{}", " ".repeat(18)));
        Ok(())
    }

    #[test]
    fn test_log_sink() -> io::Result<()> {
        let mut sink = LogSink::default().with_width(33);
        assert_eq!(sink.max_width(), 33);
        sink.accept("frame")?;
        sink.close()?;
        sink.close()
    }
}
