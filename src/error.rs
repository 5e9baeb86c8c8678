//! Unified error type for roki.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Configuration errors stop the firmware before the run loop starts;
//! link errors never leave the role loop.

use thiserror::Error;

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Configuration
    /// Color is neither `#RRGGBB`/`RRGGBB` nor an RGB triple.
    #[error("invalid color")]
    InvalidColor,

    /// A key token matched no keyboard, mouse, media or layer table.
    #[error("unknown key token")]
    UnknownToken,

    /// `layer_...` token with an unsupported shape or mode.
    #[error("unknown layer command")]
    UnknownLayerCommand,

    /// A layer command targets a layer that does not exist.
    #[error("layer {index} out of range ({count} layers)")]
    LayerOutOfRange { index: u32, count: usize },

    /// Keymap grid dimensions differ from the physical matrix.
    #[error("grid is {rows}x{cols}, matrix is {expected_rows}x{expected_cols}")]
    GridMismatch {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    /// More layers than `MAX_LAYERS`.
    #[error("too many layers")]
    TooManyLayers,

    /// A key resolves to more bindings than `MAX_BINDINGS_PER_KEY`.
    #[error("too many bindings on one key")]
    TooManyBindings,

    /// The keymap holds no layer at all.
    #[error("keymap has no layers")]
    NoLayers,

    // Link
    /// Transient failure on the split link.
    #[error("link error: {0}")]
    Link(LinkError),

    /// A frame could not be decoded.
    #[error("malformed link frame")]
    Decode,

    // Storage
    /// Flash read/write failed or a stored record is corrupt.
    #[error("storage error")]
    Storage,
}

/// Transient split-link failures. Always recovered by returning to
/// advertising or scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Scan could not start or found no peer.
    #[error("scan failed")]
    ScanFailed,
    /// Connection attempt failed.
    #[error("connect failed")]
    ConnectFailed,
    /// Operation needs a live connection.
    #[error("not connected")]
    NotConnected,
    /// Notification could not be queued.
    #[error("send failed")]
    SendFailed,
}

// Convenience conversions

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Link(e)
    }
}

impl From<postcard::Error> for Error {
    fn from(_: postcard::Error) -> Self {
        Error::Storage
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
