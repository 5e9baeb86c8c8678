//! Per-half run loops.
//!
//! The role is picked once at boot from the side flag and never changes.
//! Each tick polls local input and the link without blocking; the only
//! suspension point is the delay between ticks.

pub mod primary;
pub mod secondary;

pub use primary::Primary;
pub use secondary::Secondary;

use embedded_hal_async::delay::DelayNs;

use crate::config::{
    RECONNECT_BACKOFF_INITIAL_TICKS, RECONNECT_BACKOFF_MAX_TICKS, SCAN_INTERVAL_MS,
};
use crate::input::{EncoderSource, KeyEventSource, StickSource};

/// Which role a half runs, from its static side flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoleKind {
    Primary,
    Secondary,
}

impl RoleKind {
    /// The left half faces the host.
    pub const fn from_side_flag(is_left_side: bool) -> Self {
        if is_left_side {
            RoleKind::Primary
        } else {
            RoleKind::Secondary
        }
    }
}

/// One iteration of a role's run loop.
pub trait Tick {
    fn tick(&mut self);
}

/// A half running one of the two roles.
pub enum Role<P, S> {
    Primary(P),
    Secondary(S),
}

impl<P: Tick, S: Tick> Role<P, S> {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Primary(_) => RoleKind::Primary,
            Role::Secondary(_) => RoleKind::Secondary,
        }
    }

    /// Tick every `SCAN_INTERVAL_MS` until `bound` runs out.
    pub async fn run<D: DelayNs>(&mut self, delay: &mut D, bound: Loop) {
        info!("running as {:?}", self.kind());
        for _ in bound.iterate() {
            match self {
                Role::Primary(primary) => primary.tick(),
                Role::Secondary(secondary) => secondary.tick(),
            }
            delay.delay_ms(SCAN_INTERVAL_MS).await;
        }
    }
}

/// Optional iteration bound for run loops. Unbounded on target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Loop {
    max: Option<u32>,
}

impl Loop {
    pub const fn forever() -> Self {
        Self { max: None }
    }

    pub const fn times(max: u32) -> Self {
        Self { max: Some(max) }
    }

    /// Tick indices, `0..max` or endless.
    pub fn iterate(&self) -> impl Iterator<Item = u32> {
        let max = self.max;
        let mut count = 0u32;
        core::iter::from_fn(move || {
            if max.is_some_and(|m| count >= m) {
                return None;
            }
            let i = count;
            count = count.wrapping_add(1);
            Some(i)
        })
    }
}

/// Reconnect pacing in ticks: try at once, then wait 10, 20, 40 ... up
/// to `RECONNECT_BACKOFF_MAX_TICKS` between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    wait: u32,
    next_delay: u32,
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            wait: 0,
            next_delay: RECONNECT_BACKOFF_INITIAL_TICKS,
        }
    }

    /// Count down one tick. `true` when an attempt is due.
    pub fn ready(&mut self) -> bool {
        if self.wait == 0 {
            return true;
        }
        self.wait -= 1;
        false
    }

    /// Schedule the next attempt after a failure.
    pub fn failed(&mut self) {
        self.wait = self.next_delay;
        self.next_delay = (self.next_delay * 2).min(RECONNECT_BACKOFF_MAX_TICKS);
    }

    /// Ticks until the next attempt.
    pub fn remaining(&self) -> u32 {
        self.wait
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Local input of one half.
pub struct LocalInput<KS, E, ST> {
    pub keys: KS,
    pub encoder: E,
    pub stick: ST,
}

impl<KS, E, ST> LocalInput<KS, E, ST>
where
    KS: KeyEventSource,
    E: EncoderSource,
    ST: StickSource,
{
    pub fn new(keys: KS, encoder: E, stick: ST) -> Self {
        Self {
            keys,
            encoder,
            stick,
        }
    }
}

/// Stand-in for a half without a rotary encoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEncoder;

impl EncoderSource for NoEncoder {
    fn position(&mut self) -> i32 {
        0
    }
}

/// Stand-in for a half without a thumb stick.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStick;

impl StickSource for NoStick {
    fn read(&mut self) -> (f32, f32) {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_loop_yields_max_indices() {
        let ticks: heapless::Vec<u32, 8> = Loop::times(5).iterate().collect();
        assert_eq!(ticks.as_slice(), &[0, 1, 2, 3, 4]);
        assert_eq!(Loop::times(0).iterate().count(), 0);
    }

    #[test]
    fn unbounded_loop_keeps_going() {
        assert_eq!(Loop::forever().iterate().take(1000).count(), 1000);
    }

    #[test]
    fn side_flag_selects_role() {
        assert_eq!(RoleKind::from_side_flag(true), RoleKind::Primary);
        assert_eq!(RoleKind::from_side_flag(false), RoleKind::Secondary);
    }

    #[test]
    fn backoff_attempts_immediately_then_doubles() {
        let mut backoff = Backoff::new();
        assert!(backoff.ready());
        backoff.failed();
        let waited = (0..).take_while(|_| !backoff.ready()).count();
        assert_eq!(waited, 10);
        backoff.failed();
        assert_eq!(backoff.remaining(), 20);
    }

    #[test]
    fn backoff_is_capped() {
        let mut backoff = Backoff::new();
        for _ in 0..20 {
            backoff.failed();
        }
        assert_eq!(backoff.remaining(), RECONNECT_BACKOFF_MAX_TICKS);
    }
}
