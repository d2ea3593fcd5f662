//! Aggregate time budgets for multi-read operations

use std::time::{Duration, Instant};

/// A time budget measured from the moment it was created
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a new budget now
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// The total budget
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time spent since the budget started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Check if the budget is used up
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.budget
    }
}
