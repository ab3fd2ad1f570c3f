//! Progress tracking for divide-and-conquer traversals.
//!
//! A [`SplitSource`] yields items one at a time and can hand off a disjoint part of its
//! remaining range to a new, independent source. Wrapping the root in a
//! [`ProgressSplitter`] makes every branch split off it (recursively) report into one
//! shared [`ProgressBar`].
//!
//! # Closing
//!
//! All branches of one tree share an atomic count of live branches. The root starts it at
//! one, each successful split adds one, and each branch gives its slot back exactly once:
//! when it runs dry, or when it is dropped before that (a consumer that short-circuits).
//! The release that moves the count from one to zero closes the bar. Because a split can
//! only happen on a live branch, the count never touches zero while work remains, and
//! `fetch_sub` guarantees a single thread observes the transition, however the branches
//! race.
//!
//! With the `rayon` feature, a `ProgressSplitter` is an
//! [`UnindexedProducer`](rayon::iter::plumbing::UnindexedProducer) and
//! [`ProgressSplitter::par_iter`] runs the traversal on rayon's work-stealing pool.

use std::{
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::ProgressBar;

/// A source that can advance sequentially and split off independent sub-ranges.
pub trait SplitSource: Sized {
    /// The items produced.
    type Item;

    /// Yields the next item of this branch, `None` once it is exhausted.
    fn try_advance(&mut self) -> Option<Self::Item>;

    /// Moves part of the remaining items into a new source.
    ///
    /// Returns `None` when the source declines to split (for example because too little is
    /// left). Items are never shared between the two sources.
    fn try_split(&mut self) -> Option<Self>;

    /// Number of items left in this branch, if known.
    fn estimate_size(&self) -> Option<u64>;
}

impl SplitSource for Range<u64> {
    type Item = u64;

    fn try_advance(&mut self) -> Option<u64> {
        self.next()
    }

    fn try_split(&mut self) -> Option<Self> {
        let len = self.end.saturating_sub(self.start);
        if len < 2 {
            return None;
        }
        let mid = self.start + len / 2;
        let upper = mid..self.end;
        self.end = mid;
        Some(upper)
    }

    fn estimate_size(&self) -> Option<u64> {
        Some(self.end.saturating_sub(self.start))
    }
}

impl<'a, T> SplitSource for &'a [T] {
    type Item = &'a T;

    fn try_advance(&mut self) -> Option<&'a T> {
        let (first, rest) = self.split_first()?;
        *self = rest;
        Some(first)
    }

    fn try_split(&mut self) -> Option<Self> {
        if self.len() < 2 {
            return None;
        }
        let (lower, upper) = self.split_at(self.len() / 2);
        *self = lower;
        Some(upper)
    }

    fn estimate_size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

/// A branch of a tracked split traversal.
///
/// Every item yielded advances the shared bar by one. The bar closes when the last live
/// branch of the tree is exhausted or dropped.
pub struct ProgressSplitter<S> {
    source: S,
    bar: ProgressBar,
    live: Arc<AtomicUsize>,
    released: bool,
}

impl<S> ProgressSplitter<S> {
    /// Wraps the root of a traversal.
    pub fn new(source: S, bar: ProgressBar) -> Self {
        Self {
            source,
            bar,
            live: Arc::new(AtomicUsize::new(1)),
            released: false,
        }
    }

    /// The bar shared by all branches.
    pub const fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Number of branches of this tree that are still live.
    #[must_use]
    pub fn live_branches(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Closes the bar now, whatever the other branches are doing.
    pub fn close(&self) -> Result<(), crate::ProgressError> {
        self.bar.close()
    }

    /// Gives this branch's slot back. The last branch out closes the bar.
    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if self.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            log::debug!("last branch of {:?} finished", self.bar.name());
            if let Err(err) = self.bar.close() {
                log::error!("closing progress bar {:?} failed: {err}", self.bar.name());
            }
        }
    }
}

impl<S: SplitSource> SplitSource for ProgressSplitter<S> {
    type Item = S::Item;

    fn try_advance(&mut self) -> Option<S::Item> {
        if self.released {
            return None;
        }
        match self.source.try_advance() {
            Some(item) => {
                self.bar.track(1);
                Some(item)
            }
            None => {
                self.release();
                None
            }
        }
    }

    fn try_split(&mut self) -> Option<Self> {
        if self.released {
            return None;
        }
        let child = self.source.try_split()?;
        // This branch is live, so the count cannot reach zero before the increment.
        self.live.fetch_add(1, Ordering::AcqRel);
        Some(Self {
            source: child,
            bar: self.bar.clone(),
            live: Arc::clone(&self.live),
            released: false,
        })
    }

    fn estimate_size(&self) -> Option<u64> {
        if self.released {
            Some(0)
        } else {
            self.source.estimate_size()
        }
    }
}

impl<S> Drop for ProgressSplitter<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(feature = "rayon")]
mod parallel {
    use rayon::iter::{
        ParallelIterator,
        plumbing::{Folder, UnindexedConsumer, UnindexedProducer, bridge_unindexed},
    };

    use super::{ProgressSplitter, SplitSource};

    impl<S> UnindexedProducer for ProgressSplitter<S>
    where
        S: SplitSource + Send,
        S::Item: Send,
    {
        type Item = S::Item;

        fn split(mut self) -> (Self, Option<Self>) {
            let child = self.try_split();
            (self, child)
        }

        fn fold_with<F>(mut self, mut folder: F) -> F
        where
            F: Folder<Self::Item>,
        {
            while !folder.full() {
                match self.try_advance() {
                    Some(item) => folder = folder.consume(item),
                    None => break,
                }
            }
            folder
        }
    }

    /// A [`ParallelIterator`] over a tracked split traversal.
    pub struct ParProgressSplitter<S>(ProgressSplitter<S>);

    impl<S> ProgressSplitter<S>
    where
        S: SplitSource + Send,
        S::Item: Send,
    {
        /// Runs the traversal on rayon's pool; every split becomes a branch.
        pub fn par_iter(self) -> ParProgressSplitter<S> {
            ParProgressSplitter(self)
        }
    }

    impl<S> ParallelIterator for ParProgressSplitter<S>
    where
        S: SplitSource + Send,
        S::Item: Send,
    {
        type Item = S::Item;

        fn drive_unindexed<C>(self, consumer: C) -> C::Result
        where
            C: UnindexedConsumer<Self::Item>,
        {
            bridge_unindexed(self.0, consumer)
        }
    }
}

#[cfg(feature = "rayon")]
pub use parallel::ParProgressSplitter;

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };

    use super::{ProgressSplitter, SplitSource};
    use crate::sink::recording::test_bar;

    /// Drains a branch, returning how many items it produced.
    fn drain<S: SplitSource>(branch: &mut S) -> u64 {
        let mut n = 0;
        while branch.try_advance().is_some() {
            n += 1;
        }
        n
    }

    #[test]
    fn test_range_source() {
        let mut range = 0..10u64;
        let upper = range.try_split().unwrap();
        assert_eq!(range, 0..5);
        assert_eq!(upper, 5..10);
        assert_eq!(upper.estimate_size(), Some(5));

        let mut single = 3..4u64;
        assert_eq!(single.try_split(), None);
        assert_eq!(single.try_advance(), Some(3));
        assert_eq!(single.try_advance(), None);
    }

    #[test]
    fn test_slice_source() {
        let data = [1, 2, 3, 4, 5];
        let mut lower = &data[..];
        let mut upper = lower.try_split().unwrap();
        assert_eq!(lower, [1, 2]);
        assert_eq!(upper.try_advance(), Some(&3));
        assert_eq!(upper.estimate_size(), Some(2));
    }

    /// Sequential Branches
    /// The bar stays open until the last branch runs dry, whatever the finishing order.
    #[test]
    fn test_last_branch_closes() {
        let (bar, log) = test_bar(Some(8));
        let mut root = ProgressSplitter::new(0..8u64, bar.clone());
        let mut right = root.try_split().unwrap();
        let mut right_right = right.try_split().unwrap();
        assert_eq!(root.live_branches(), 3);

        assert_eq!(drain(&mut right), 2);
        assert_eq!(drain(&mut root), 4);
        assert!(!bar.is_closed());
        assert_eq!(log.closes(), 0);

        // Asking an exhausted branch again must not release twice.
        assert_eq!(root.try_advance(), None);
        assert_eq!(root.live_branches(), 1);

        assert_eq!(drain(&mut right_right), 2);
        assert!(bar.is_closed());
        assert_eq!(log.closes(), 1);
        assert_eq!(bar.current(), 8);

        drop((root, right, right_right));
        assert_eq!(log.closes(), 1);
    }

    /// Declined Split
    /// A split the source refuses leaves the branch count alone.
    #[test]
    fn test_declined_split() {
        let (bar, log) = test_bar(Some(1));
        let mut root = ProgressSplitter::new(0..1u64, bar.clone());
        assert!(root.try_split().is_none());
        assert_eq!(root.live_branches(), 1);
        assert_eq!(drain(&mut root), 1);
        assert_eq!(log.closes(), 1);
    }

    /// Abandoned Branch
    /// Dropping an unexhausted branch gives its slot back.
    #[test]
    fn test_dropped_branch_releases() {
        let (bar, log) = test_bar(Some(10));
        let mut root = ProgressSplitter::new(0..10u64, bar.clone());
        let child = root.try_split().unwrap();

        drain(&mut root);
        assert!(!bar.is_closed());
        drop(child);
        assert!(bar.is_closed());
        assert_eq!(log.closes(), 1);
        assert_eq!(bar.current(), 5);
    }

    /// Explicit Close
    /// Closing any branch closes the bar immediately; remaining branches stay usable.
    #[test]
    fn test_explicit_close() {
        let (bar, log) = test_bar(Some(10));
        let mut root = ProgressSplitter::new(0..10u64, bar.clone());
        let mut child = root.try_split().unwrap();

        child.close().unwrap();
        assert!(bar.is_closed());
        assert_eq!(drain(&mut root), 5, "items still flow after close");
        assert_eq!(drain(&mut child), 5);
        assert_eq!(log.closes(), 1);
    }

    /// Concurrent Branches
    /// k workers finishing at arbitrary times close the sink once, after the last one.
    #[test]
    fn test_concurrent_branches_close_once() {
        const TOTAL: u64 = 10_000;
        for _ in 0..20 {
            let (bar, log) = test_bar(Some(TOTAL));
            let mut branches = vec![ProgressSplitter::new(0..TOTAL, bar.clone())];
            while branches.len() < 8 {
                let mut next = Vec::new();
                for mut branch in branches {
                    if let Some(child) = branch.try_split() {
                        next.push(child);
                    }
                    next.push(branch);
                }
                branches = next;
            }
            assert_eq!(branches.len(), 8);

            let start = Arc::new(Barrier::new(branches.len()));
            let workers: Vec<_> = branches
                .into_iter()
                .enumerate()
                .map(|(i, mut branch)| {
                    let start = Arc::clone(&start);
                    thread::spawn(move || {
                        start.wait();
                        if i % 3 == 0 {
                            thread::sleep(Duration::from_millis(1));
                        }
                        drain(&mut branch)
                    })
                })
                .collect();
            let counted: u64 = workers.into_iter().map(|w| w.join().unwrap()).sum();

            assert_eq!(counted, TOTAL);
            assert_eq!(bar.current(), TOTAL);
            assert!(bar.is_closed());
            assert_eq!(log.closes(), 1);
            assert_eq!(log.late_frames(), 0);
        }
    }

    #[cfg(feature = "rayon")]
    mod parallel {
        use rayon::iter::ParallelIterator as _;

        use crate::{split::ProgressSplitter, sink::recording::test_bar};

        /// Work Stealing
        /// A rayon traversal counts every item and closes the bar once.
        #[test]
        fn test_par_iter() {
            let (bar, log) = test_bar(Some(100_000));
            let sum: u64 = ProgressSplitter::new(0..100_000u64, bar.clone())
                .par_iter()
                .sum();

            assert_eq!(sum, (0..100_000u64).sum());
            assert_eq!(bar.current(), 100_000);
            assert!(bar.is_closed());
            assert_eq!(log.closes(), 1);
        }

        /// Short Circuit
        /// Branches abandoned by `find_any` still release, so the bar closes.
        #[test]
        fn test_par_short_circuit() {
            let (bar, log) = test_bar(Some(100_000));
            let found = ProgressSplitter::new(0..100_000u64, bar.clone())
                .par_iter()
                .find_any(|&x| x == 1_234);

            assert_eq!(found, Some(1_234));
            assert!(bar.is_closed());
            assert_eq!(log.closes(), 1);
        }

        #[test]
        fn test_par_slice() {
            let (bar, _log) = test_bar(None);
            let data: Vec<u32> = (0..1_000).collect();
            let evens = bar
                .clone()
                .wrap_split(&data[..])
                .par_iter()
                .filter(|&&x| x % 2 == 0)
                .count();

            assert_eq!(evens, 500);
            assert_eq!(bar.current(), 1_000);
            assert!(bar.is_closed());
        }
    }
}
