//! Milestone derivation
//!
//! A category's milestone is the elapsed time of its target-th qualifying
//! entry in log order. The entry log is append-only, so recomputing from the
//! full log always returns the same value once the milestone exists; no
//! latched counters are kept.

use crate::types::{Category, Entry, MilestoneSet};

/// Derives per-category milestones from an entry log
#[derive(Debug, Clone, Copy)]
pub struct MilestoneTracker {
    target_count: usize,
}

impl MilestoneTracker {
    pub fn new(target_count: usize) -> Self {
        Self { target_count }
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Elapsed seconds of the target-th entry in `category`, or `None` if unreached
    pub fn milestone(&self, log: &[Entry], category: Category) -> Option<f64> {
        if self.target_count == 0 {
            return None;
        }
        log.iter()
            .filter(|e| e.category() == Some(category))
            .nth(self.target_count - 1)
            .map(|e| e.elapsed_seconds)
    }

    /// Milestones for every listed category
    pub fn milestones(&self, log: &[Entry], categories: &[Category]) -> MilestoneSet {
        MilestoneSet {
            times: categories
                .iter()
                .map(|&c| (c, self.milestone(log, c)))
                .collect(),
        }
    }

    /// Number of qualifying entries recorded so far
    pub fn progress(&self, log: &[Entry], category: Category) -> usize {
        log.iter()
            .filter(|e| e.category() == Some(category))
            .count()
    }
}
