//! The background thread that periodically draws a bar.
//!
//! One [`RenderLoop`] owns one sink for its whole life. The thread renders a frame,
//! hands it to the sink, then sleeps on a condition variable for the update interval.
//! [`RenderLoop::stop`] flips the state to `Cancelling` and wakes the thread, which draws
//! one final frame (so the last thing on screen reflects every step that happened before
//! the stop), closes the sink and reports back through its join handle.
//!
//! ```text
//! Running ──stop()──▶ Cancelling ──final frame, sink closed──▶ Stopped
//!    └──────── sink write failed / renderer panicked ──────────────┘
//! ```

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{error::ProgressError, progress::ProgressState, render::Renderer, sink::Sink};

/// Lifecycle of a [`RenderLoop`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoopState {
    /// Drawing on every interval.
    Running,
    /// A stop was requested; the final frame is pending.
    Cancelling,
    /// Terminal: the sink is closed and no more frames will be drawn.
    Stopped,
}

struct Control {
    state: Mutex<LoopState>,
    wake: Condvar,
}

/// Handle on a running render thread.
pub struct RenderLoop {
    control: Arc<Control>,
    handle: Option<JoinHandle<Result<(), ProgressError>>>,
}

impl RenderLoop {
    /// Starts drawing `state` through `renderer` into `sink` every `interval`.
    pub fn spawn(
        state: Arc<ProgressState>,
        renderer: Box<dyn Renderer>,
        sink: Box<dyn Sink>,
        interval: Duration,
    ) -> Result<Self, ProgressError> {
        let control = Arc::new(Control {
            state: Mutex::new(LoopState::Running),
            wake: Condvar::new(),
        });

        let worker = Worker {
            control: Arc::clone(&control),
            state,
            renderer,
            sink,
            interval,
        };
        let handle = thread::Builder::new()
            .name("progress-render".into())
            .spawn(move || worker.run())
            .map_err(|error| ProgressError::Spawn { error })?;

        Ok(Self {
            control,
            handle: Some(handle),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        *self.control.state.lock()
    }

    /// Requests the final frame and waits for the thread to finish.
    ///
    /// Returns the sink failure that aborted the loop, if any. Calling it again after
    /// the thread was joined returns `Ok(())`.
    pub fn stop(&mut self) -> Result<(), ProgressError> {
        {
            let mut state = self.control.state.lock();
            if *state == LoopState::Running {
                *state = LoopState::Cancelling;
            }
        }
        self.control.wake.notify_all();

        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or(Err(ProgressError::RenderLoopPanicked)),
            None => Ok(()),
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::debug!("render loop stopped with {err}");
        }
    }
}

/// Everything the render thread owns.
struct Worker {
    control: Arc<Control>,
    state: Arc<ProgressState>,
    renderer: Box<dyn Renderer>,
    sink: Box<dyn Sink>,
    interval: Duration,
}

impl Worker {
    /// Draws until cancelled. Teardown lives in `Drop`, so a panicking renderer or sink
    /// still gets the sink closed and the loop marked stopped.
    fn run(mut self) -> Result<(), ProgressError> {
        log::debug!("render loop for {:?} started", self.state.name());

        self.frames().map_err(|error| {
            log::error!("progress output failed, rendering aborted: {error}");
            ProgressError::Sink { error }
        })
    }

    fn frames(&mut self) -> io::Result<()> {
        loop {
            self.draw()?;
            if !self.sleep() {
                break;
            }
        }
        // The state lock taken in `sleep` orders this read after every step that
        // happened before the stop request.
        self.draw()
    }

    /// Waits one interval. Returns `false` once cancellation was requested.
    fn sleep(&self) -> bool {
        let deadline = Instant::now() + self.interval;
        let mut state = self.control.state.lock();
        while *state == LoopState::Running {
            if self.control.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state == LoopState::Running
    }

    fn draw(&mut self) -> io::Result<()> {
        let width = self.sink.max_width();
        let frame = self.renderer.render(&self.state.snapshot(), width);
        log::trace!("frame: {frame}");
        self.sink.accept(&frame)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("progress renderer for {:?} panicked", self.state.name());
        }
        if let Err(error) = self.sink.close() {
            log::debug!("ignoring error while closing progress sink: {error}");
        }
        *self.control.state.lock() = LoopState::Stopped;

        log::debug!("render loop for {:?} stopped", self.state.name());
    }
}
