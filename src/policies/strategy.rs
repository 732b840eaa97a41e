//! # Restart strategies.
//!
//! [`RestartStrategy`] decides which siblings are taken down together with a failed child.
//!
//! ```text
//! children: [A, B, C, D]        B fails
//!
//! OneForOne   →  restart B                 (A, C, D untouched)
//! OneForAll   →  stop A,B,C,D → start A,B,C,D
//! RestForOne  →  stop B,C,D   → start B,C,D  (A untouched)
//! ```
//!
//! The declared child order is significant: it drives both the stop/start order
//! and the partition used by [`RestartStrategy::RestForOne`].

use std::ops::Range;

/// Recovery topology applied when a child terminates abnormally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RestartStrategy {
    /// Restart only the failed child (default).
    #[default]
    OneForOne,
    /// Restart every child.
    OneForAll,
    /// Restart the failed child and every child declared after it.
    RestForOne,
}

impl RestartStrategy {
    /// Returns the index range (into the declared child list) affected by a failure at `failed`.
    ///
    /// # Example
    /// ```
    /// use treevisor::RestartStrategy;
    ///
    /// assert_eq!(RestartStrategy::OneForOne.affected(1, 4), 1..2);
    /// assert_eq!(RestartStrategy::OneForAll.affected(1, 4), 0..4);
    /// assert_eq!(RestartStrategy::RestForOne.affected(1, 4), 1..4);
    /// ```
    pub fn affected(self, failed: usize, len: usize) -> Range<usize> {
        match self {
            RestartStrategy::OneForOne => failed..(failed + 1).min(len),
            RestartStrategy::OneForAll => 0..len,
            RestartStrategy::RestForOne => failed..len,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            RestartStrategy::OneForOne => "one_for_one",
            RestartStrategy::OneForAll => "one_for_all",
            RestartStrategy::RestForOne => "rest_for_one",
        }
    }
}
