//! Fluent interface for constructing [`ProgressBar`] instances.
//!
//! While simple bars can be created via [`ProgressBar::new`] or [`ProgressBar::with_sink`],
//! the [`ProgressBarBuilder`] exposes every knob.
//!
//! # Key Features
//!
//! * **Output:** Pick any [`Sink`] (stderr console by default) and any [`Renderer`]
//!   ([`DefaultRenderer`] by default, configured through style, unit and speed options).
//! * **Cadence:** The update interval of the background render thread.
//! * **Time Travel:** Start from a non-zero position with some elapsed time already on the
//!   clock, useful for resuming previously interrupted tasks without skewing the ETA.

use std::{sync::Arc, time::Duration};

use compact_str::CompactString;

use crate::{
    bar::ProgressBar,
    error::ProgressError,
    progress::ProgressState,
    render::{BarStyle, DefaultRenderer, RenderOptions, Renderer},
    render_loop::RenderLoop,
    sink::{ConsoleSink, Sink},
};

/// Interval between two frames unless configured otherwise.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest accepted interval; shorter values are raised to this.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(1);

/// A builder pattern for constructing [`ProgressBar`] instances.
#[must_use]
pub struct ProgressBarBuilder {
    name: CompactString,
    max: Option<u64>,
    initial: u64,
    elapsed_before_start: Duration,
    extra_message: CompactString,
    update_interval: Duration,
    options: RenderOptions,
    renderer: Option<Box<dyn Renderer>>,
    sink: Option<Box<dyn Sink>>,
}

impl ProgressBarBuilder {
    /// Starts building an indeterminate bar labelled `name`.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            max: None,
            initial: 0,
            elapsed_before_start: Duration::ZERO,
            extra_message: CompactString::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            options: RenderOptions::default(),
            renderer: None,
            sink: None,
        }
    }

    /// Sets the total, `None` for an indeterminate bar.
    pub const fn with_max(mut self, max: Option<u64>) -> Self {
        self.max = max;
        self
    }

    /// Starts at `initial` with `elapsed` already on the clock.
    pub const fn start_from(mut self, initial: u64, elapsed: Duration) -> Self {
        self.initial = initial;
        self.elapsed_before_start = elapsed;
        self
    }

    /// Sets the text shown after the bar.
    pub fn with_extra_message(mut self, message: impl Into<CompactString>) -> Self {
        self.extra_message = message.into();
        self
    }

    /// Sets the interval between two frames.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval.max(MIN_UPDATE_INTERVAL);
        self
    }

    /// Sets the track glyphs of the default renderer.
    pub fn with_style(mut self, style: BarStyle) -> Self {
        self.options.style = style;
        self
    }

    /// Displays amounts in `unit`s of `unit_size` items each, e.g. `(" MB", 1_000_000)`.
    pub fn with_unit(mut self, unit: impl Into<CompactString>, unit_size: u64) -> Self {
        self.options.unit = unit.into();
        self.options.unit_size = unit_size.max(1);
        self
    }

    /// Shows the average speed after the timing block.
    pub fn show_speed(mut self, show: bool) -> Self {
        self.options.show_speed = show;
        self
    }

    /// Replaces the default renderer. Style, unit and speed options are then ignored.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Replaces the default stderr console sink.
    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Consumes the builder, starts the render thread and returns the bar.
    pub fn build(self) -> Result<ProgressBar, ProgressError> {
        let state = Arc::new(ProgressState::new(
            self.name,
            self.initial,
            self.max,
            self.elapsed_before_start,
        ));
        if !self.extra_message.is_empty() {
            state.set_extra_message(self.extra_message);
        }

        let options = self.options;
        let renderer = self
            .renderer
            .unwrap_or_else(|| Box::new(DefaultRenderer::new(options)));
        let sink = self
            .sink
            .unwrap_or_else(|| Box::new(ConsoleSink::stderr()));

        let render_loop =
            RenderLoop::spawn(Arc::clone(&state), renderer, sink, self.update_interval)?;
        Ok(ProgressBar::from_parts(state, render_loop))
    }
}
