//! Edge and delta detection over successive polls of a counter.
//!
//! The encoder reader owns one [`Debouncer`] per encoder and feeds it the
//! absolute tick count once per loop tick.

use core::ops::Sub;

/// Tracks the last two observed values of a polled counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer<T> {
    current: T,
    previous: T,
}

impl<T> Debouncer<T>
where
    T: Copy + Ord + Sub<Output = T>,
{
    pub const fn new(initial: T) -> Self {
        Self {
            current: initial,
            previous: initial,
        }
    }

    /// Record a new poll result. Exactly one update per poll.
    pub fn update(&mut self, value: T) {
        self.previous = self.current;
        self.current = value;
    }

    pub fn value(&self) -> T {
        self.current
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    pub fn rose(&self) -> bool {
        self.current > self.previous
    }

    pub fn fell(&self) -> bool {
        self.current < self.previous
    }

    /// Signed change between the last two polls.
    pub fn diff(&self) -> T {
        self.current - self.previous
    }
}
