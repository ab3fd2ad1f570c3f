//! Iterator adapters for automatic progress tracking.
//!
//! This module provides the [`ProgressIteratorExt`] trait, which adds helper methods to any
//! Rust [`Iterator`]. This allows you to attach a progress bar to a loop with a single
//! method call.
//!
//! Running out of items *is* the closing signal: the first `None` from the wrapped
//! iterator closes the bar, no explicit close needed. The adapter is fused, so asking
//! again after the end neither touches the inner iterator nor closes twice.
//!
//! # Heuristics
//!
//! The adapters check [`Iterator::size_hint`]: an exact bound becomes the bar's maximum,
//! anything else makes the bar indeterminate.
//!
//! # Example
//!
//! ```no_run
//! use atomic_progress_bar::ProgressIteratorExt;
//!
//! // The maximum is 3 because vec.len() is known
//! for item in vec![1, 2, 3].into_iter().progress()? {
//!     // ...
//! }
//! # Ok::<(), atomic_progress_bar::ProgressError>(())
//! ```

use std::iter::FusedIterator;

use compact_str::CompactString;

use crate::{ProgressBar, ProgressError};

/// An iterator adapter that wraps an underlying iterator and tracks progress.
///
/// Advances the bar on every item and closes it when the inner iterator is exhausted.
pub struct ProgressIter<I> {
    iter: I,
    bar: ProgressBar,
    done: bool,
}

impl<I> ProgressIter<I> {
    /// Creates a new `ProgressIter`.
    ///
    /// Note: This is usually constructed via [`ProgressIteratorExt`] methods.
    pub const fn new(iter: I, bar: ProgressBar) -> Self {
        Self {
            iter,
            bar,
            done: false,
        }
    }

    /// The bar this iterator reports to.
    pub const fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl<I: Iterator> Iterator for ProgressIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = self.iter.next();
        if item.is_some() {
            self.bar.track(1);
        } else {
            // Iterator exhausted
            self.done = true;
            if let Err(err) = self.bar.close() {
                log::error!("closing progress bar {:?} failed: {err}", self.bar.name());
            }
        }

        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            self.iter.size_hint()
        }
    }
}

impl<I: Iterator> FusedIterator for ProgressIter<I> {}

/// Extension trait to easily attach progress tracking to any Iterator.
pub trait ProgressIteratorExt: Sized {
    /// Wraps the iterator in a new stderr [`ProgressBar`].
    ///
    /// The maximum is taken from `size_hint` when it is exact.
    fn progress(self) -> Result<ProgressIter<Self>, ProgressError>;

    /// Wraps the iterator in a new stderr [`ProgressBar`] with a specific name.
    fn progress_with_name(
        self,
        name: impl Into<CompactString>,
    ) -> Result<ProgressIter<Self>, ProgressError>;

    /// Wraps the iterator using an existing [`ProgressBar`].
    fn progress_with(self, bar: ProgressBar) -> ProgressIter<Self>;

    /// The maximum implied by `size_hint`, if exact.
    fn exact_len_hint(&self) -> Option<u64>;
}

impl<I: Iterator> ProgressIteratorExt for I {
    fn progress(self) -> Result<ProgressIter<Self>, ProgressError> {
        self.progress_with_name(CompactString::default())
    }

    fn progress_with_name(
        self,
        name: impl Into<CompactString>,
    ) -> Result<ProgressIter<Self>, ProgressError> {
        let bar = ProgressBar::new(name, self.exact_len_hint())?;
        Ok(ProgressIter::new(self, bar))
    }

    fn progress_with(self, bar: ProgressBar) -> ProgressIter<Self> {
        ProgressIter::new(self, bar)
    }

    fn exact_len_hint(&self) -> Option<u64> {
        match self.size_hint() {
            (lower, Some(upper)) if upper == lower => Some(upper as u64),
            _ => None,
        }
    }
}
