//! Consumer control (media keys) report state.
//!
//! Consumer Control is a separate HID usage page (0x0C). One 16-bit usage
//! is active at a time; releasing sends usage 0.

use super::{HidReport, Media, ReportSink};

/// Consumer control report size (2 bytes for usage ID).
pub const CONSUMER_REPORT_SIZE: usize = 2;

/// Consumer Control HID report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    /// Active consumer control usage (little-endian u16).
    pub usage: u16,
}

impl ConsumerReport {
    pub const fn empty() -> Self {
        Self { usage: 0 }
    }

    pub const fn new(usage: u16) -> Self {
        Self { usage }
    }

    /// Serialize to USB HID report bytes.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < CONSUMER_REPORT_SIZE {
            return 0;
        }
        buf[..CONSUMER_REPORT_SIZE].copy_from_slice(&self.usage.to_le_bytes());
        CONSUMER_REPORT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.usage == 0
    }
}

pub struct MediaDevice<S> {
    sink: S,
    active: u16,
}

impl<S: ReportSink> MediaDevice<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, active: 0 }
    }

    pub fn active(&self) -> u16 {
        self.active
    }

    fn flush(&self) {
        self.sink.send(HidReport::Consumer(ConsumerReport::new(self.active)));
    }
}

impl<S: ReportSink> Media for MediaDevice<S> {
    fn press(&mut self, code: u16) {
        self.active = code;
        self.flush();
    }

    fn release(&mut self) {
        self.active = 0;
        self.flush();
    }

    fn release_all(&mut self) {
        self.active = 0;
        self.flush();
    }
}

/// USB HID Report Descriptor for Consumer Control.
///
/// This is a minimal descriptor for a single 16-bit usage.
pub const CONSUMER_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, //   Logical Maximum (1023)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, //   Usage Maximum (1023)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];
