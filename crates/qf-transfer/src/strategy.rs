//! Receiver policies: which name variant to probe, when to give up, and how
//! long to wait between failed lookups.
//!
//! A failed lookup is ambiguous. The chunk may not be uploaded yet, the store
//! may have hiccupped, or this index may be the final chunk stored under its
//! `_1` name. [`FailureHeuristic`] resolves that the way deployed senders
//! expect: flip to the final-chunk name on the 1st and 5th consecutive miss,
//! give up on the 10th.

use std::time::Duration;

/// Decides the name variant for the next lookup at the current index.
pub trait EndDetection: Send + Sync {
    /// `fails` is the number of consecutive failed lookups at this index.
    fn probe_is_last(&self, fails: u32) -> bool;

    /// True once `fails` consecutive misses mean the transfer is unrecoverable.
    fn exhausted(&self, fails: u32) -> bool;
}

/// Failure-count-driven end detection.
#[derive(Debug, Clone)]
pub struct FailureHeuristic {
    flip_at: Vec<u32>,
    budget: u32,
}

impl FailureHeuristic {
    pub const DEFAULT_FLIP_AT: [u32; 2] = [1, 5];
    pub const DEFAULT_BUDGET: u32 = 10;

    pub fn new(budget: u32) -> Self {
        Self {
            flip_at: Self::DEFAULT_FLIP_AT.to_vec(),
            budget,
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

impl Default for FailureHeuristic {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET)
    }
}

impl EndDetection for FailureHeuristic {
    fn probe_is_last(&self, fails: u32) -> bool {
        self.flip_at.contains(&fails)
    }

    fn exhausted(&self, fails: u32) -> bool {
        fails >= self.budget
    }
}

/// Delay before the next lookup after `fails` consecutive misses.
pub trait Backoff: Send + Sync {
    fn delay(&self, fails: u32) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, fails: u32) -> Duration {
        self(fails)
    }
}

/// `fails * interval`
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    interval: Duration,
}

impl LinearBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl Backoff for LinearBackoff {
    fn delay(&self, fails: u32) -> Duration {
        self.interval.saturating_mul(fails)
    }
}
