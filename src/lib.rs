//! # `atomic_progress_bar`
//!
//! Transparent, thread-safe progress bars for byte streams, iterators and parallel
//! divide-and-conquer traversals.
//!
//! Wrapping a resource never changes what it yields: items, bytes and errors pass through
//! untouched. The wrapper only counts successful work into a shared [`ProgressBar`], and
//! closes that bar once the resource is exhausted.
//!
//! * **Concurrent**: bars are cheap to clone ([`Arc`](std::sync::Arc)-based) and can be
//!   stepped from any thread. Stepping is a single atomic addition.
//! * **Non-blocking**: a dedicated background thread renders the bar on a fixed cadence;
//!   stepping never waits for output.
//! * **Pluggable**: frames go to any [`Sink`] (terminal line, [`log`] records, your own),
//!   rendered by any [`Renderer`].
//!
//! ## Modules
//!
//! * [`bar`]: The [`ProgressBar`] facade and its lifecycle.
//! * [`builder`]: Fluent interface for configuring a [`ProgressBar`].
//! * [`io`]: Wrappers for [`std::io::Read`] and [`std::io::Write`] that track bytes.
//! * [`iter`]: Extension traits for tracking progress on Iterators.
//! * [`split`]: Tracking for splittable sources, including rayon traversal.
//! * [`progress`]: The shared counters and their snapshots.
//! * [`render`]: Turning a snapshot into a line of text.
//! * [`render_loop`]: The background rendering thread.
//! * [`sink`]: Output destinations and terminal width discovery.
//!
//! ## Example
//!
//! ```no_run
//! use std::{fs::File, io};
//!
//! use atomic_progress_bar::ProgressBar;
//!
//! let file = File::open("archive.tar")?;
//! let len = file.metadata()?.len();
//!
//! let bar = ProgressBar::builder("Hashing")
//!     .with_max(Some(len))
//!     .with_unit(" MB", 1_000_000)
//!     .show_speed(true)
//!     .build()?;
//! let mut reader = bar.wrap_read(file);
//! io::copy(&mut reader, &mut io::sink())?;
//! reader.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bar;
pub mod builder;
pub mod error;
pub mod io;
pub mod iter;
pub mod progress;
pub mod render;
pub mod render_loop;
pub mod sink;
pub mod split;

pub use bar::ProgressBar;
pub use builder::ProgressBarBuilder;
pub use error::ProgressError;
pub use iter::{ProgressIter, ProgressIteratorExt};
pub use progress::{ProgressSnapshot, ProgressState};
pub use render::{BarStyle, DefaultRenderer, RenderOptions, Renderer};
pub use sink::{ConsoleSink, LogSink, Sink};
#[cfg(feature = "rayon")]
pub use split::ParProgressSplitter;
pub use split::{ProgressSplitter, SplitSource};
