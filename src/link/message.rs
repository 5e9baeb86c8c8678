//! The 4-byte frame exchanged between the halves.
//!
//! ```text
//! Byte 0: sequence number (0..SEQUENCE_LIMIT)
//! Byte 1: kind (1 = key, 2 = encoder, 3 = thumb stick)
//! Byte 2: payload 1
//! Byte 3: payload 2
//! ```
//!
//! | Kind        | payload 1              | payload 2              |
//! |-------------|------------------------|------------------------|
//! | Key         | key number             | 1 = pressed, 0 = up    |
//! | Encoder     | clockwise bumps        | counter-clockwise bumps|
//! | ThumbStick  | `encode_float(x)`      | `encode_float(y)`      |

use crate::codec::{decode_float, encode_float};
use crate::config::LINK_MESSAGE_SIZE;
use crate::error::{Error, Result};

/// Closed set of frame kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageKind {
    Key = 1,
    Encoder = 2,
    ThumbStick = 3,
}

impl TryFrom<u8> for MessageKind {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(MessageKind::Key),
            2 => Ok(MessageKind::Encoder),
            3 => Ok(MessageKind::ThumbStick),
            _ => Err(Error::Decode),
        }
    }
}

/// One decoded link frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkMessage {
    pub sequence: u8,
    pub kind: MessageKind,
    pub payload_1: u8,
    pub payload_2: u8,
}

impl LinkMessage {
    pub const fn new(sequence: u8, kind: MessageKind, payload_1: u8, payload_2: u8) -> Self {
        Self {
            sequence,
            kind,
            payload_1,
            payload_2,
        }
    }

    pub const fn key(sequence: u8, key_number: u8, pressed: bool) -> Self {
        Self::new(sequence, MessageKind::Key, key_number, pressed as u8)
    }

    pub const fn encoder(sequence: u8, clockwise: u8, counter_clockwise: u8) -> Self {
        Self::new(sequence, MessageKind::Encoder, clockwise, counter_clockwise)
    }

    pub fn thumb_stick(sequence: u8, x: f32, y: f32) -> Self {
        Self::new(
            sequence,
            MessageKind::ThumbStick,
            encode_float(x),
            encode_float(y),
        )
    }

    /// The "stick returned to center" frame.
    pub const fn thumb_stick_centered(sequence: u8) -> Self {
        Self::new(sequence, MessageKind::ThumbStick, 0, 0)
    }

    pub fn encode(&self) -> [u8; LINK_MESSAGE_SIZE] {
        [self.sequence, self.kind as u8, self.payload_1, self.payload_2]
    }

    /// Decode a frame. Unknown kind bytes are rejected.
    pub fn decode(frame: &[u8; LINK_MESSAGE_SIZE]) -> Result<Self> {
        let kind = MessageKind::try_from(frame[1])?;
        Ok(Self::new(frame[0], kind, frame[2], frame[3]))
    }

    /// Key payload: `(key_number, pressed)`.
    pub fn key_event(&self) -> (u8, bool) {
        (self.payload_1, self.payload_2 != 0)
    }

    /// Thumb stick payload decoded to normalized floats.
    pub fn stick_position(&self) -> (f32, f32) {
        (decode_float(self.payload_1), decode_float(self.payload_2))
    }
}

/// Remembers the last sequence number seen on a connection so a frame
/// read twice is only acted on once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceTracker {
    last: Option<u8>,
}

impl SequenceTracker {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Tracker that has already seen `sequence`.
    pub const fn starting_at(sequence: u8) -> Self {
        Self {
            last: Some(sequence),
        }
    }

    /// Returns `true` and records `sequence` when it differs from the last one.
    pub fn accept(&mut self, sequence: u8) -> bool {
        if self.last == Some(sequence) {
            return false;
        }
        self.last = Some(sequence);
        true
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    /// Forget the last sequence; called when a new connection is made.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_frame_layout() {
        let msg = LinkMessage::key(5, 7, true);
        assert_eq!(msg.encode(), [5, 1, 7, 1]);
        assert_eq!(msg.key_event(), (7, true));
    }

    #[test]
    fn encoder_frame_layout() {
        assert_eq!(LinkMessage::encoder(1, 1, 0).encode(), [1, 2, 1, 0]);
    }

    #[test]
    fn thumb_stick_full_deflection() {
        let msg = LinkMessage::thumb_stick(9, 1.0, 1.0);
        assert_eq!(msg.encode(), [9, 3, 127, 127]);
        assert_eq!(msg.stick_position(), (1.0, 1.0));
    }

    #[test]
    fn centered_frame_is_all_zero_payload() {
        assert_eq!(LinkMessage::thumb_stick_centered(2).encode(), [2, 3, 0, 0]);
        assert_eq!(LinkMessage::thumb_stick(2, 0.0, 0.0).encode(), [2, 3, 0, 0]);
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        assert_eq!(LinkMessage::decode(&[0, 0, 0, 0]), Err(Error::Decode));
        assert_eq!(LinkMessage::decode(&[0, 4, 1, 1]), Err(Error::Decode));
    }

    #[test]
    fn decode_inverts_encode() {
        let msg = LinkMessage::key(42, 29, false);
        assert_eq!(LinkMessage::decode(&msg.encode()), Ok(msg));
    }

    #[test]
    fn tracker_ignores_repeated_sequence() {
        let mut tracker = SequenceTracker::starting_at(4);
        assert!(tracker.accept(5));
        assert!(!tracker.accept(5));
        assert!(tracker.accept(6));
    }

    #[test]
    fn fresh_tracker_accepts_anything() {
        let mut tracker = SequenceTracker::new();
        assert!(tracker.accept(0));
        tracker.reset();
        assert!(tracker.accept(0));
        assert_eq!(tracker.last(), Some(0));
    }
}
