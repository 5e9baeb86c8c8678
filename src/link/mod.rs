//! Split link: wire protocol and the transport seams each role drives.
//!
//! Transports are fire-and-forget. Every call here is non-blocking so a
//! role loop can poll the link once per tick without stalling local input.

pub mod adv;
pub mod message;
pub mod sequence;

pub use message::{LinkMessage, MessageKind, SequenceTracker};
pub use sequence::SequenceCounter;

use crate::config::LINK_MESSAGE_SIZE;
use crate::error::LinkError;

/// One link frame on the wire.
pub type Frame = [u8; LINK_MESSAGE_SIZE];

/// Secondary side: advertises the Roki service and pushes frames to the
/// connected primary.
pub trait PeerLink {
    fn is_connected(&self) -> bool;
    fn start_advertising(&mut self);
    fn stop_advertising(&mut self);
    /// Publish one frame. Failure is equivalent to the frame being lost.
    fn send(&mut self, frame: &Frame) -> Result<(), LinkError>;
}

/// Primary side toward the host computer.
pub trait HostLink {
    fn is_connected(&self) -> bool;
    fn start_advertising(&mut self);
    fn stop_advertising(&mut self);
}

/// Primary side toward the secondary half.
pub trait CentralLink {
    /// A discovered advertiser carrying the Roki service.
    type Peer;
    type Connection: PeerConnection;

    /// Poll for a peer advertising the Roki service. Returns `None` when
    /// none has been seen yet.
    fn scan_for_peer(&mut self) -> Option<Self::Peer>;

    /// Connect to `peer`, requesting the given connection interval.
    fn connect(
        &mut self,
        peer: Self::Peer,
        interval_ms: f32,
    ) -> Result<Self::Connection, LinkError>;
}

/// An established connection to the secondary half.
pub trait PeerConnection {
    fn is_connected(&self) -> bool;

    /// Copy the latest frame into `buf`. Returns the number of bytes read;
    /// zero means nothing is available.
    fn try_receive_into(&mut self, buf: &mut Frame) -> usize;
}

/// Convert a connection interval in ms to the 1.25 ms units used by the
/// radio, rounded to nearest and clamped to the legal 6..=3200 range.
pub fn connection_interval_units(interval_ms: f32) -> u16 {
    let units = interval_ms / 1.25 + 0.5;
    if units.is_nan() || units < 6.0 {
        6
    } else if units > 3200.0 {
        3200
    } else {
        units as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PEER_CONNECTION_INTERVAL_MS;

    #[test]
    fn peer_interval_is_six_units() {
        assert_eq!(connection_interval_units(PEER_CONNECTION_INTERVAL_MS), 6);
        assert_eq!(connection_interval_units(15.0), 12);
    }

    #[test]
    fn interval_is_clamped() {
        assert_eq!(connection_interval_units(1.0), 6);
        assert_eq!(connection_interval_units(10_000.0), 3200);
    }
}
