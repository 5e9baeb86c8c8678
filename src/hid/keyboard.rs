//! Keyboard report state (boot protocol layout).
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```

use super::{HidReport, Keyboard, ReportSink};

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

const FIRST_MODIFIER: u8 = 0xE0;
const LAST_MODIFIER: u8 = 0xE7;

/// Boot-protocol keyboard report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte (always 0x00 per HID spec).
    pub reserved: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// All keys released.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; 6],
        }
    }

    /// Add a key. Modifiers set their bit, other codes take a free slot.
    ///
    /// Returns `false` when all six slots are taken.
    pub fn add(&mut self, code: u8) -> bool {
        if let Some(bit) = modifier_bit(code) {
            self.modifier |= bit;
            return true;
        }
        if code == 0 || self.keycodes.contains(&code) {
            return true;
        }
        match self.keycodes.iter_mut().find(|slot| **slot == 0) {
            Some(slot) => {
                *slot = code;
                true
            }
            None => false,
        }
    }

    /// Remove a key if present.
    pub fn remove(&mut self, code: u8) {
        if let Some(bit) = modifier_bit(code) {
            self.modifier &= !bit;
            return;
        }
        for slot in self.keycodes.iter_mut().filter(|slot| **slot == code) {
            *slot = 0;
        }
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (always 8).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..8].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }

    /// Returns `true` if no keys are pressed.
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }
}

fn modifier_bit(code: u8) -> Option<u8> {
    (FIRST_MODIFIER..=LAST_MODIFIER)
        .contains(&code)
        .then(|| 1 << (code - FIRST_MODIFIER))
}

/// Pressed-key state that emits a fresh report on every change.
pub struct KeyboardDevice<S> {
    sink: S,
    report: KeyboardReport,
}

impl<S: ReportSink> KeyboardDevice<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            report: KeyboardReport::empty(),
        }
    }

    pub fn report(&self) -> &KeyboardReport {
        &self.report
    }

    fn flush(&self) {
        self.sink.send(HidReport::Keyboard(self.report));
    }
}

impl<S: ReportSink> Keyboard for KeyboardDevice<S> {
    fn press(&mut self, code: u8) {
        if !self.report.add(code) {
            warn!("keyboard report full, dropping keycode {}", code);
            return;
        }
        self.flush();
    }

    fn release(&mut self, code: u8) {
        self.report.remove(code);
        self.flush();
    }

    fn release_all(&mut self) {
        self.report = KeyboardReport::empty();
        self.flush();
    }
}

// USB HID report descriptor for a boot-protocol keyboard

/// USB HID Report Descriptor for a standard keyboard.
///
/// This descriptor tells the USB host that we are a keyboard with:
///   - 8 modifier key bits (input)
///   - 1 reserved byte
///   - 5 LED indicators (output)
///   - 6 key code bytes (input)
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant) - reserved
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant) - padding
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::RecordingSink;

    #[test]
    fn modifier_sets_bit_not_slot() {
        let mut report = KeyboardReport::empty();
        assert!(report.add(0xE1)); // left shift
        assert_eq!(report.modifier, 0x02);
        assert_eq!(report.keycodes, [0; 6]);
        report.remove(0xE1);
        assert!(report.is_empty());
    }

    #[test]
    fn seventh_key_is_dropped() {
        let sink = RecordingSink::default();
        let mut kb = KeyboardDevice::new(&sink);
        for code in 0x04..0x0A {
            kb.press(code);
        }
        kb.press(0x0A);
        assert_eq!(kb.report().keycodes, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
        assert_eq!(sink.len(), 6);
    }

    #[test]
    fn release_frees_slot_for_next_key() {
        let sink = RecordingSink::default();
        let mut kb = KeyboardDevice::new(&sink);
        kb.press(0x04);
        kb.press(0x05);
        kb.release(0x04);
        kb.press(0x06);
        assert_eq!(kb.report().keycodes, [0x06, 0x05, 0, 0, 0, 0]);
    }

    #[test]
    fn repeated_press_keeps_single_slot() {
        let mut report = KeyboardReport::empty();
        report.add(0x04);
        report.add(0x04);
        assert_eq!(report.keycodes, [0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn release_all_emits_empty_report() {
        let sink = RecordingSink::default();
        let mut kb = KeyboardDevice::new(&sink);
        kb.press(0xE0);
        kb.press(0x04);
        kb.release_all();
        assert_eq!(
            sink.last(),
            Some(HidReport::Keyboard(KeyboardReport::empty()))
        );
    }

    #[test]
    fn serialize_layout() {
        let mut report = KeyboardReport::empty();
        report.add(0xE2);
        report.add(0x04);
        let mut buf = [0u8; 8];
        assert_eq!(report.serialize(&mut buf), 8);
        assert_eq!(buf, [0x04, 0x00, 0x04, 0, 0, 0, 0, 0]);
        assert_eq!(report.serialize(&mut [0u8; 4]), 0);
    }
}
