//! Local input seams: matrix events, encoders and the thumb stick.
//!
//! Hardware drivers implement the small source traits below; everything
//! above them (bitmap diffing, calibration, dead zone) is portable.

use heapless::Deque;

use crate::config::{MAX_KEY_EVENTS, THUMB_STICK_DEAD_ZONE};
use crate::matrix::{diff_bitmaps, DEFAULT_BYTE_SIZE};

/// A switch changed state. `key_number = row * col_count + col`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyMatrixEvent {
    pub key_number: u16,
    pub pressed: bool,
}

impl KeyMatrixEvent {
    pub const fn new(key_number: u16, pressed: bool) -> Self {
        Self {
            key_number,
            pressed,
        }
    }
}

/// Non-blocking source of matrix events.
pub trait KeyEventSource {
    fn poll(&mut self) -> Option<KeyMatrixEvent>;
}

/// Absolute tick count of a rotary encoder.
pub trait EncoderSource {
    fn position(&mut self) -> i32;
}

/// Raw reading of one analog axis.
pub trait AnalogAxisSource {
    fn value(&mut self) -> u16;
}

/// Maps raw axis readings to `[-1.0, 1.0]`.
pub trait Normalizer {
    fn normalize(&self, raw_x: u16, raw_y: u16) -> (f32, f32);
}

/// Reads the full matrix as one bitmask byte per row.
pub trait MatrixScanner {
    fn scan(&mut self, rows: &mut [u8]);
}

impl<T: KeyEventSource + ?Sized> KeyEventSource for &mut T {
    fn poll(&mut self) -> Option<KeyMatrixEvent> {
        (**self).poll()
    }
}

impl<T: EncoderSource + ?Sized> EncoderSource for &mut T {
    fn position(&mut self) -> i32 {
        (**self).position()
    }
}

/// Turns successive matrix snapshots into key events.
///
/// Events found in one scan are queued and handed out one per
/// [`poll`](KeyEventSource::poll). When more than `MAX_KEY_EVENTS` are
/// pending the oldest are dropped.
pub struct BitmapEvents<S, const R: usize> {
    scanner: S,
    col_count: usize,
    previous: [u8; R],
    queue: Deque<KeyMatrixEvent, MAX_KEY_EVENTS>,
}

impl<S: MatrixScanner, const R: usize> BitmapEvents<S, R> {
    /// `col_count` is clamped to the 8 columns one row byte can hold.
    pub fn new(scanner: S, col_count: usize) -> Self {
        Self {
            scanner,
            col_count: col_count.clamp(1, 8),
            previous: [0; R],
            queue: Deque::new(),
        }
    }

    pub fn with_default_columns(scanner: S) -> Self {
        Self::new(scanner, DEFAULT_BYTE_SIZE)
    }

    fn refill(&mut self) {
        let mut current = [0u8; R];
        self.scanner.scan(&mut current);
        for ((row, col), pressed) in diff_bitmaps(&self.previous, &current, self.col_count) {
            let key_number = (row * self.col_count + col) as u16;
            let event = KeyMatrixEvent::new(key_number, pressed);
            if self.queue.is_full() {
                let _ = self.queue.pop_front();
                warn!("key event queue full, dropping oldest");
            }
            let _ = self.queue.push_back(event);
        }
        self.previous = current;
    }
}

impl<S: MatrixScanner, const R: usize> KeyEventSource for BitmapEvents<S, R> {
    fn poll(&mut self) -> Option<KeyMatrixEvent> {
        if self.queue.is_empty() {
            self.refill();
        }
        self.queue.pop_front()
    }
}

/// Min/center/max readings of one axis, captured during calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisCalibration {
    pub min: u16,
    pub center: u16,
    pub max: u16,
}

impl AxisCalibration {
    pub const fn new(min: u16, center: u16, max: u16) -> Self {
        Self { min, center, max }
    }

    /// Full 16-bit range centered at midscale.
    pub const fn full_range() -> Self {
        Self::new(0, u16::MAX / 2, u16::MAX)
    }

    /// Signed deflection from center scaled to `[-1.0, 1.0]`.
    pub fn normalize(&self, raw: u16) -> f32 {
        let value = if raw >= self.center {
            let span = self.max.saturating_sub(self.center);
            if span == 0 {
                return 0.0;
            }
            (raw - self.center) as f32 / span as f32
        } else {
            let span = self.center.saturating_sub(self.min);
            if span == 0 {
                return 0.0;
            }
            -((self.center - raw) as f32 / span as f32)
        };
        value.clamp(-1.0, 1.0)
    }
}

/// Two-axis calibration with a dead zone around the center.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
    pub dead_zone: f32,
}

impl Calibration {
    pub const fn new(x: AxisCalibration, y: AxisCalibration) -> Self {
        Self {
            x,
            y,
            dead_zone: THUMB_STICK_DEAD_ZONE,
        }
    }

    pub fn with_dead_zone(mut self, dead_zone: f32) -> Self {
        self.dead_zone = dead_zone;
        self
    }

    fn apply_dead_zone(&self, value: f32) -> f32 {
        if value < self.dead_zone && value > -self.dead_zone {
            0.0
        } else {
            value
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(AxisCalibration::full_range(), AxisCalibration::full_range())
    }
}

impl Normalizer for Calibration {
    fn normalize(&self, raw_x: u16, raw_y: u16) -> (f32, f32) {
        (
            self.apply_dead_zone(self.x.normalize(raw_x)),
            self.apply_dead_zone(self.y.normalize(raw_y)),
        )
    }
}

/// Two analog axes read through a [`Normalizer`].
pub struct ThumbStick<X, Y, N> {
    x: X,
    y: Y,
    normalizer: N,
}

impl<X, Y, N> ThumbStick<X, Y, N>
where
    X: AnalogAxisSource,
    Y: AnalogAxisSource,
    N: Normalizer,
{
    pub fn new(x: X, y: Y, normalizer: N) -> Self {
        Self { x, y, normalizer }
    }

    /// Current normalized position.
    pub fn read(&mut self) -> (f32, f32) {
        let raw_x = self.x.value();
        let raw_y = self.y.value();
        self.normalizer.normalize(raw_x, raw_y)
    }
}

/// Anything that yields a normalized stick position once per tick.
pub trait StickSource {
    fn read(&mut self) -> (f32, f32);
}

impl<X, Y, N> StickSource for ThumbStick<X, Y, N>
where
    X: AnalogAxisSource,
    Y: AnalogAxisSource,
    N: Normalizer,
{
    fn read(&mut self) -> (f32, f32) {
        ThumbStick::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedScanner {
        frames: &'static [[u8; 2]],
        next: usize,
    }

    impl MatrixScanner for ScriptedScanner {
        fn scan(&mut self, rows: &mut [u8]) {
            let frame = self.frames[self.next.min(self.frames.len() - 1)];
            rows.copy_from_slice(&frame);
            self.next += 1;
        }
    }

    struct Fixed(u16);

    impl AnalogAxisSource for Fixed {
        fn value(&mut self) -> u16 {
            self.0
        }
    }

    fn calibration() -> Calibration {
        let axis = AxisCalibration::new(0, 50, 100);
        Calibration::new(axis, axis).with_dead_zone(0.1)
    }

    #[test]
    fn bitmap_events_report_press_then_release() {
        let scanner = ScriptedScanner {
            frames: &[[0b000000, 0b000010], [0b000000, 0b000000]],
            next: 0,
        };
        let mut events = BitmapEvents::<_, 2>::new(scanner, 6);
        assert_eq!(events.poll(), Some(KeyMatrixEvent::new(7, true)));
        assert_eq!(events.poll(), Some(KeyMatrixEvent::new(7, false)));
        assert_eq!(events.poll(), None);
    }

    #[test]
    fn bitmap_events_drop_oldest_on_overflow() {
        let scanner = ScriptedScanner {
            frames: &[[0b111111, 0b000001]],
            next: 0,
        };
        let mut events = BitmapEvents::<_, 2>::new(scanner, 6);
        // Seven presses in one scan, only the newest five survive.
        let first = events.poll().map(|e| e.key_number);
        assert_eq!(first, Some(2));
        let rest: heapless::Vec<u16, 8> =
            core::iter::from_fn(|| events.poll().map(|e| e.key_number)).collect();
        assert_eq!(rest.as_slice(), &[3, 4, 5, 6]);
    }

    #[test]
    fn normalized_quadrants() {
        let cal = calibration();
        let (x, y) = cal.normalize(15, 80);
        assert!(x < 0.0);
        assert!(y > 0.0);
        let (x, y) = cal.normalize(80, 15);
        assert!(x > 0.0);
        assert!(y < 0.0);
    }

    #[test]
    fn dead_zone_reads_as_center() {
        assert_eq!(calibration().normalize(51, 49), (0.0, 0.0));
    }

    #[test]
    fn extremes_are_full_scale() {
        assert_eq!(calibration().normalize(0, 100), (-1.0, 1.0));
    }

    #[test]
    fn degenerate_calibration_is_centered() {
        let flat = AxisCalibration::new(10, 10, 10);
        assert_eq!(flat.normalize(0), 0.0);
        assert_eq!(flat.normalize(20), 0.0);
    }

    #[test]
    fn thumb_stick_reads_through_normalizer() {
        let mut stick = ThumbStick::new(Fixed(100), Fixed(50), calibration());
        assert_eq!(stick.read(), (1.0, 0.0));
    }
}
