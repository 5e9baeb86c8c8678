//! Firmware-wide constants and compile-time configuration.
//!
//! Matrix geometry, timing parameters, protocol constants and the
//! BLE/USB identities live here so they can be tuned in one place.

// Matrix

/// Rows in each half's switch matrix.
pub const ROWS: usize = 5;

/// Columns in each half's switch matrix. Also the column count used to
/// turn a key number back into `(row, col)`.
pub const COLS: usize = 6;

/// Key events buffered between two polls of the matrix. The oldest event
/// is dropped when the queue is full.
pub const MAX_KEY_EVENTS: usize = 5;

/// Period of one run-loop tick (ms). Matrix, encoder and thumb stick are
/// polled once per tick.
pub const SCAN_INTERVAL_MS: u32 = 10;

// Keymap

/// Maximum number of layers a keymap may hold.
pub const MAX_LAYERS: usize = 8;

/// Maximum number of tokens bound to a single key.
pub const MAX_TOKENS_PER_KEY: usize = 4;

/// Maximum resolved bindings per key (one token can match several
/// capabilities).
pub const MAX_BINDINGS_PER_KEY: usize = 4;

/// Longest accepted key token, e.g. `"BRIGHTNESS_INCREMENT"`.
pub const MAX_TOKEN_LEN: usize = 24;

/// Longest accepted layer name.
pub const MAX_LAYER_NAME_LEN: usize = 16;

// Split link

/// Size of one link frame on the wire.
pub const LINK_MESSAGE_SIZE: usize = 4;

/// Sequence numbers cycle through `0..SEQUENCE_LIMIT`.
pub const SEQUENCE_LIMIT: u8 = 100;

/// Desired connection interval toward the secondary half (ms).
pub const PEER_CONNECTION_INTERVAL_MS: f32 = 7.5;

/// First delay between two reconnect attempts, in run-loop ticks.
pub const RECONNECT_BACKOFF_INITIAL_TICKS: u32 = 10;

/// Upper bound for the reconnect delay, in run-loop ticks (5 s at 10 ms).
pub const RECONNECT_BACKOFF_MAX_TICKS: u32 = 500;

/// 128-bit UUID of the Roki split service, advertised by the secondary
/// half and used by the primary to filter scan results.
pub const ROKI_SERVICE_UUID: &str = "d0a37544-a8d9-462c-950a-43f103748eb4";

/// Characteristic carrying the 4-byte link frame.
pub const ROKI_PACKET_CHARACTERISTIC_UUID: &str = "2c305b04-3ef7-4771-aa1a-3130d352f895";

// Pointer

/// Relative movement of one directional mouse key press.
pub const MOUSE_MOVEMENT: i32 = 20;

/// Wheel movement of one scroll key press.
pub const MOUSE_SCROLL: i32 = 2;

/// Scale applied to a normalized thumb stick axis before it becomes a
/// relative mouse movement.
pub const THUMB_STICK_SPEED: f32 = 10.0;

/// Normalized deflection under which an axis reads as centered.
pub const THUMB_STICK_DEAD_ZONE: f32 = 0.05;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "roki";
pub const USB_PRODUCT: &str = "Roki Split Keyboard";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms). 1 ms = 1000 Hz for lowest latency.
pub const USB_HID_POLL_MS: u8 = 1;

// BLE

/// Advertised GAP name of both halves.
pub const BLE_DEVICE_NAME: &str = "Roki";

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// Keymap storage

/// Flash page index where keymap storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 232;

/// Number of flash pages reserved for keymap storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 8;

/// Side flag written with the built-in keymap on a blank board.
pub const DEFAULT_IS_LEFT_SIDE: bool = true;
