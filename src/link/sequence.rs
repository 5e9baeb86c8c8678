//! Cyclic sequence numbers tagging every frame the secondary sends.

use crate::config::SEQUENCE_LIMIT;

/// Counter cycling through `0..limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceCounter {
    value: u8,
    limit: u8,
}

impl SequenceCounter {
    /// Start at `initial` and wrap before `limit`.
    ///
    /// A zero limit behaves like a limit of one (the counter stays at 0).
    pub const fn new(initial: u8, limit: u8) -> Self {
        let limit = if limit == 0 { 1 } else { limit };
        let value = if initial >= limit { 0 } else { initial };
        Self { value, limit }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn limit(&self) -> u8 {
        self.limit
    }

    /// Advance by one, wrapping to 0 at the limit. Returns the new value.
    pub fn increment(&mut self) -> u8 {
        let next = self.value.wrapping_add(1);
        self.value = if next >= self.limit { 0 } else { next };
        self.value
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new(0, SEQUENCE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wraps_after_full_cycle() {
        let mut counter = SequenceCounter::default();
        for _ in 0..100 {
            counter.increment();
        }
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn no_repeat_within_one_cycle() {
        let mut counter = SequenceCounter::default();
        let mut seen = [false; 100];
        seen[counter.value() as usize] = true;
        for _ in 0..99 {
            let v = counter.increment() as usize;
            assert!(!seen[v], "value {v} repeated");
            seen[v] = true;
        }
    }

    #[test]
    fn last_value_before_wrap() {
        let mut counter = SequenceCounter::new(98, 100);
        assert_eq!(counter.increment(), 99);
        assert_eq!(counter.increment(), 0);
    }

    #[test]
    fn out_of_range_initial_starts_at_zero() {
        assert_eq!(SequenceCounter::new(150, 100).value(), 0);
        assert_eq!(SequenceCounter::new(3, 0).limit(), 1);
    }

    proptest! {
        #[test]
        fn value_stays_below_limit(limit in 1u8..=255, steps in 0usize..600) {
            let mut counter = SequenceCounter::new(0, limit);
            for _ in 0..steps {
                prop_assert!(counter.increment() < limit);
            }
            prop_assert_eq!(counter.value() as usize, steps % limit as usize);
        }
    }
}
