//! The [`ProgressBar`] facade.
//!
//! A `ProgressBar` ties one [`ProgressState`] to one [`RenderLoop`]. Handles are cheap to
//! clone (`Arc` bump) and can be stepped from any number of threads; the render thread
//! only ever reads the state.
//!
//! Closing is idempotent: the first [`close`](ProgressBar::close) stops the render loop
//! (which draws the final frame and closes the sink), every later or concurrent call is a
//! no-op. Dropping the last handle of an unclosed bar closes it as well.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use compact_str::CompactString;
use parking_lot::Mutex;

use crate::{
    builder::ProgressBarBuilder,
    error::ProgressError,
    io::{ProgressReader, ProgressWriter},
    iter::ProgressIter,
    progress::{ProgressSnapshot, ProgressState},
    render_loop::RenderLoop,
    sink::Sink,
    split::{ProgressSplitter, SplitSource},
};

/// A thread-safe, cloneable handle to a rendered progress bar.
#[derive(Clone)]
pub struct ProgressBar {
    inner: Arc<Inner>,
}

struct Inner {
    state: Arc<ProgressState>,
    closed: AtomicBool,
    misuse_reported: AtomicBool,
    render_loop: Mutex<Option<RenderLoop>>,
}

impl Inner {
    fn close(&self) -> Result<(), ProgressError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        log::debug!("closing progress bar {:?}", self.state.name());

        // Freeze elapsed time so the final frame shows the real duration.
        self.state.pause();
        let render_loop = self.render_loop.lock().take();
        render_loop.map_or(Ok(()), |mut render_loop| render_loop.stop())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("progress bar {:?} closed with {err}", self.state.name());
        }
    }
}

impl ProgressBar {
    /// Creates a bar on stderr with default settings.
    ///
    /// `max` of `None` makes an indeterminate bar.
    pub fn new(name: impl Into<CompactString>, max: Option<u64>) -> Result<Self, ProgressError> {
        ProgressBarBuilder::new(name).with_max(max).build()
    }

    /// Creates a bar that draws into `sink`.
    pub fn with_sink(
        name: impl Into<CompactString>,
        max: Option<u64>,
        sink: impl Sink + 'static,
    ) -> Result<Self, ProgressError> {
        ProgressBarBuilder::new(name)
            .with_max(max)
            .with_sink(sink)
            .build()
    }

    /// Starts configuring a bar.
    #[must_use]
    pub fn builder(name: impl Into<CompactString>) -> ProgressBarBuilder {
        ProgressBarBuilder::new(name)
    }

    pub(crate) fn from_parts(state: Arc<ProgressState>, render_loop: RenderLoop) -> Self {
        Self {
            inner: Arc::new(Inner {
                state,
                closed: AtomicBool::new(false),
                misuse_reported: AtomicBool::new(false),
                render_loop: Mutex::new(Some(render_loop)),
            }),
        }
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advances by one. Returns the new position.
    pub fn step(&self) -> Result<u64, ProgressError> {
        self.step_by(1)
    }

    /// Advances by `n`. Returns the new position.
    pub fn step_by(&self, n: u64) -> Result<u64, ProgressError> {
        self.ensure_open()?;
        Ok(self.inner.state.advance_by(n))
    }

    /// Sets the absolute position; moving backwards is allowed.
    pub fn step_to(&self, n: u64) -> Result<(), ProgressError> {
        self.ensure_open()?;
        self.inner.state.set_to(n);
        Ok(())
    }

    /// Steps on behalf of a decorator.
    ///
    /// Decorators must stay transparent, so stepping a bar that was closed through another
    /// handle does not fail the wrapped operation; the misuse is logged once per bar.
    pub(crate) fn track(&self, n: u64) {
        if let Err(err) = self.step_by(n) {
            self.report_misuse(&err);
        }
    }

    /// Like [`track`](Self::track), for absolute positions.
    pub(crate) fn track_to(&self, n: u64) {
        if let Err(err) = self.step_to(n) {
            self.report_misuse(&err);
        }
    }

    fn report_misuse(&self, err: &ProgressError) {
        if !self.inner.misuse_reported.swap(true, Ordering::Relaxed) {
            log::warn!("progress bar {:?} stepped after close: {err}", self.name());
        }
    }

    fn ensure_open(&self) -> Result<(), ProgressError> {
        if self.is_closed() {
            Err(ProgressError::Closed)
        } else {
            Ok(())
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The task label.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.state.name()
    }

    /// Gets the current position.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.inner.state.current()
    }

    /// Gets the maximum, `None` when indeterminate.
    #[must_use]
    pub fn max(&self) -> Option<u64> {
        self.inner.state.max()
    }

    /// Updates the maximum, e.g. once the real size is discovered.
    pub fn set_max(&self, max: Option<u64>) -> &Self {
        self.inner.state.set_max(max);
        self
    }

    /// Sets the text shown after the bar.
    pub fn set_extra_message(&self, message: impl Into<CompactString>) -> &Self {
        self.inner.state.set_extra_message(message);
        self
    }

    /// Time spent running, excluding pauses.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.inner.state.elapsed()
    }

    /// Stops the clock; the ETA no longer counts the paused stretch.
    pub fn pause(&self) -> &Self {
        self.inner.state.pause();
        self
    }

    /// Restarts the clock after [`pause`](Self::pause).
    pub fn resume(&self) -> &Self {
        self.inner.state.resume();
        self
    }

    /// Rewinds to zero and restarts the clock.
    pub fn reset(&self) -> &Self {
        self.inner.state.reset();
        self
    }

    /// Creates a plain-data copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.state.snapshot()
    }

    /// Returns `true` once [`close`](Self::close) ran.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Draws the final frame, stops the render thread and closes the sink.
    ///
    /// Only the first call does anything. It returns the sink error that aborted rendering,
    /// if there was one; later calls always return `Ok(())`.
    pub fn close(&self) -> Result<(), ProgressError> {
        self.inner.close()
    }

    // ========================================================================
    // Decorators
    // ========================================================================

    /// Tracks the bytes read from `reader`.
    pub fn wrap_read<R>(self, reader: R) -> ProgressReader<R> {
        ProgressReader::new(reader, self)
    }

    /// Tracks the bytes written to `writer`.
    pub fn wrap_write<W>(self, writer: W) -> ProgressWriter<W> {
        ProgressWriter::new(writer, self)
    }

    /// Tracks the items yielded by `iter`; exhausting it closes the bar.
    pub fn wrap_iter<I: IntoIterator>(self, iter: I) -> ProgressIter<I::IntoIter> {
        ProgressIter::new(iter.into_iter(), self)
    }

    /// Tracks every item of a splittable source across all of its splits.
    pub fn wrap_split<S: SplitSource>(self, source: S) -> ProgressSplitter<S> {
        ProgressSplitter::new(source, self)
    }
}
