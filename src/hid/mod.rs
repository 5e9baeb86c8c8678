//! HID devices the primary half drives toward the host.
//!
//! Each device keeps its own report state and emits a complete
//! [`HidReport`] through a [`ReportSink`] whenever that state changes.

pub mod consumer;
pub mod keyboard;
pub mod mouse;

pub use consumer::{ConsumerReport, MediaDevice};
pub use keyboard::{KeyboardDevice, KeyboardReport};
pub use mouse::{Direction, MouseDevice, MouseReport};

/// One report for any of the three HID interfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
    Consumer(ConsumerReport),
}

impl HidReport {
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(k) => k.serialize(buf),
            HidReport::Mouse(m) => m.serialize(buf),
            HidReport::Consumer(c) => c.serialize(buf),
        }
    }
}

/// Destination of finished reports (a USB endpoint queue on target).
pub trait ReportSink {
    /// Queue a report. Must not block.
    fn send(&self, report: HidReport);
}

impl<T: ReportSink + ?Sized> ReportSink for &T {
    fn send(&self, report: HidReport) {
        (**self).send(report)
    }
}

/// Mouse binding: a button bitmask or a press-only movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseCode {
    Button(u8),
    Move(Direction),
}

pub trait Keyboard {
    fn press(&mut self, code: u8);
    fn release(&mut self, code: u8);
    fn release_all(&mut self);
}

pub trait Mouse {
    fn press(&mut self, code: MouseCode);
    fn release(&mut self, code: MouseCode);
    fn move_by(&mut self, x: i32, y: i32, wheel: i32);
    fn release_all(&mut self);
}

pub trait Media {
    fn press(&mut self, code: u16);
    /// Clear the active usage. The report carries one usage at a time.
    fn release(&mut self);
    fn release_all(&mut self);
}

/// The three HID devices of the primary half, built once at boot.
pub struct HidContext<K, M, D> {
    pub keyboard: K,
    pub mouse: M,
    pub media: D,
}

impl<K: Keyboard, M: Mouse, D: Media> HidContext<K, M, D> {
    pub fn new(keyboard: K, mouse: M, media: D) -> Self {
        Self {
            keyboard,
            mouse,
            media,
        }
    }

    /// Release every key, button and media usage.
    pub fn release_all(&mut self) {
        self.keyboard.release_all();
        self.mouse.release_all();
        self.media.release_all();
    }
}

impl<S: ReportSink + Copy> HidContext<KeyboardDevice<S>, MouseDevice<S>, MediaDevice<S>> {
    /// All three devices writing to the same sink.
    pub fn with_sink(sink: S) -> Self {
        Self::new(
            KeyboardDevice::new(sink),
            MouseDevice::new(sink),
            MediaDevice::new(sink),
        )
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    reports: core::cell::RefCell<std::vec::Vec<HidReport>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn reports(&self) -> std::vec::Vec<HidReport> {
        self.reports.borrow().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub(crate) fn last(&self) -> Option<HidReport> {
        self.reports.borrow().last().copied()
    }
}

#[cfg(test)]
impl ReportSink for RecordingSink {
    fn send(&self, report: HidReport) {
        self.reports.borrow_mut().push(report);
    }
}
