//! Error type shared by the bar, its render loop and the decorators.

use std::io;

use thiserror::Error;

/// Errors reported by a [`ProgressBar`](crate::ProgressBar).
#[derive(Error, Debug)]
pub enum ProgressError {
    /// The bar was already closed when a step was requested.
    #[error("progress bar is already closed")]
    Closed,

    /// A rendered frame could not be delivered to the sink.
    #[error("unable to write progress frame. {error:?}")]
    Sink {
        /// The failure reported by [`Sink::accept`](crate::sink::Sink::accept).
        error: io::Error,
    },

    /// The background render thread could not be started.
    #[error("unable to spawn render thread. {error:?}")]
    Spawn {
        /// The failure reported by the OS.
        error: io::Error,
    },

    /// The background render thread panicked.
    #[error("render thread panicked")]
    RenderLoopPanicked,
}

impl From<ProgressError> for io::Error {
    fn from(error: ProgressError) -> Self {
        match error {
            ProgressError::Sink { error } | ProgressError::Spawn { error } => error,
            other => io::Error::other(other),
        }
    }
}
