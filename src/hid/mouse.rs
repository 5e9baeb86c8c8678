//! Mouse report state (boot protocol layout plus wheel).
//!
//! Layout (4 bytes):
//! ```text
//! Byte 0: Button bitfield
//!         Bit 0 = Left, Bit 1 = Right, Bit 2 = Middle,
//!         Bit 3 = Back, Bit 4 = Forward
//! Byte 1: X displacement (signed, -127..127)
//! Byte 2: Y displacement (signed, -127..127)
//! Byte 3: Scroll wheel  (signed, -127..127)
//! ```

use super::{HidReport, Mouse, MouseCode, ReportSink};
use crate::config::{MOUSE_MOVEMENT, MOUSE_SCROLL};

/// Mouse report size in bytes.
pub const MOUSE_REPORT_SIZE: usize = 4;

const MAX_STEP: i32 = 127;

/// Boot-protocol mouse report with a wheel byte.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    /// Button bitfield.
    pub buttons: u8,
    /// Relative X movement (signed).
    pub x: i8,
    /// Relative Y movement (signed).
    pub y: i8,
    /// Scroll wheel delta (signed).
    pub wheel: i8,
}

impl MouseReport {
    pub const fn empty() -> Self {
        Self {
            buttons: 0,
            x: 0,
            y: 0,
            wheel: 0,
        }
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (always 4).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < MOUSE_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.buttons;
        buf[1] = self.x as u8;
        buf[2] = self.y as u8;
        buf[3] = self.wheel as u8;
        MOUSE_REPORT_SIZE
    }

    /// Returns `true` when no buttons are pressed and there is no movement.
    pub fn is_idle(&self) -> bool {
        self.buttons == 0 && self.x == 0 && self.y == 0 && self.wheel == 0
    }
}

/// Direction of a press-only mouse key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    ScrollUp,
    ScrollDown,
}

impl Direction {
    /// Relative `(x, y, wheel)` movement of one press.
    pub const fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::Up => (0, -MOUSE_MOVEMENT, 0),
            Direction::Down => (0, MOUSE_MOVEMENT, 0),
            Direction::Left => (-MOUSE_MOVEMENT, 0, 0),
            Direction::Right => (MOUSE_MOVEMENT, 0, 0),
            Direction::ScrollUp => (0, 0, MOUSE_SCROLL),
            Direction::ScrollDown => (0, 0, -MOUSE_SCROLL),
        }
    }
}

/// Button state plus relative movement emitter.
pub struct MouseDevice<S> {
    sink: S,
    buttons: u8,
}

impl<S: ReportSink> MouseDevice<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, buttons: 0 }
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    fn send(&self, x: i8, y: i8, wheel: i8) {
        self.sink.send(HidReport::Mouse(MouseReport {
            buttons: self.buttons,
            x,
            y,
            wheel,
        }));
    }
}

fn step(remaining: &mut i32) -> i8 {
    let part = (*remaining).clamp(-MAX_STEP, MAX_STEP);
    *remaining -= part;
    part as i8
}

impl<S: ReportSink> Mouse for MouseDevice<S> {
    fn press(&mut self, code: MouseCode) {
        match code {
            MouseCode::Button(bits) => {
                self.buttons |= bits;
                self.send(0, 0, 0);
            }
            MouseCode::Move(direction) => {
                let (x, y, wheel) = direction.delta();
                self.move_by(x, y, wheel);
            }
        }
    }

    fn release(&mut self, code: MouseCode) {
        // Directional keys only act on press.
        if let MouseCode::Button(bits) = code {
            self.buttons &= !bits;
            self.send(0, 0, 0);
        }
    }

    /// Moves larger than one report allows are split into several reports.
    fn move_by(&mut self, x: i32, y: i32, wheel: i32) {
        let (mut x, mut y, mut wheel) = (x, y, wheel);
        while x != 0 || y != 0 || wheel != 0 {
            let (dx, dy, dw) = (step(&mut x), step(&mut y), step(&mut wheel));
            self.send(dx, dy, dw);
        }
    }

    fn release_all(&mut self) {
        self.buttons = 0;
        self.send(0, 0, 0);
    }
}

/// USB HID Report Descriptor for a 5-button mouse with scroll wheel.
pub const MOUSE_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x05, 0x09, //     Usage Page (Buttons)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x05, //     Usage Maximum (Button 5)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x05, //     Report Count (5)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x03, //     Report Size (3)
    0x81, 0x01, //     Input (Constant) - padding
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    0xC0, //   End Collection (Physical)
    0xC0, // End Collection (Application)
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::RecordingSink;

    fn mouse(sink: &RecordingSink) -> MouseDevice<&RecordingSink> {
        MouseDevice::new(sink)
    }

    #[test]
    fn button_press_and_release() {
        let sink = RecordingSink::default();
        let mut m = mouse(&sink);
        m.press(MouseCode::Button(1));
        assert_eq!(m.buttons(), 1);
        m.release(MouseCode::Button(1));
        assert_eq!(m.buttons(), 0);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn directional_press_moves_once() {
        let sink = RecordingSink::default();
        let mut m = mouse(&sink);
        m.press(MouseCode::Move(Direction::Up));
        assert_eq!(
            sink.last(),
            Some(HidReport::Mouse(MouseReport {
                buttons: 0,
                x: 0,
                y: -20,
                wheel: 0
            }))
        );
        m.release(MouseCode::Move(Direction::Up));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn scroll_uses_wheel_step() {
        let sink = RecordingSink::default();
        let mut m = mouse(&sink);
        m.press(MouseCode::Move(Direction::ScrollDown));
        assert_eq!(
            sink.last(),
            Some(HidReport::Mouse(MouseReport {
                buttons: 0,
                x: 0,
                y: 0,
                wheel: -2
            }))
        );
    }

    #[test]
    fn large_move_is_chunked() {
        let sink = RecordingSink::default();
        let mut m = mouse(&sink);
        m.move_by(300, -10, 0);
        let xs: heapless::Vec<i8, 4> = sink
            .reports()
            .iter()
            .filter_map(|r| match r {
                HidReport::Mouse(m) => Some(m.x),
                _ => None,
            })
            .collect();
        assert_eq!(xs.as_slice(), &[127, 127, 46]);
    }

    #[test]
    fn zero_move_sends_nothing() {
        let sink = RecordingSink::default();
        mouse(&sink).move_by(0, 0, 0);
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn buttons_held_during_move() {
        let sink = RecordingSink::default();
        let mut m = mouse(&sink);
        m.press(MouseCode::Button(2));
        m.move_by(5, 5, 0);
        assert_eq!(
            sink.last(),
            Some(HidReport::Mouse(MouseReport {
                buttons: 2,
                x: 5,
                y: 5,
                wheel: 0
            }))
        );
    }
}
