//! Built-in keymap used when nothing is stored in flash.
//!
//! Two layers: a base layer with letters, digits and modifiers, and a
//! function layer held from either thumb cluster. Rows are written as
//! seen from above, so matrix column 0 is the last token of each row
//! ([`ColumnOrder::Mirrored`]).

use super::layer::ColumnOrder;
use super::record::{token_grid, ColorSpec, EncoderRecord, KeymapRecord, LayerRecord};
use crate::config::{COLS, ROWS};
use crate::error::{Error, Result};

type TokenTable = [[&'static [&'static str]; COLS]; ROWS];

struct LayerDefaults {
    name: &'static str,
    color: &'static str,
    primary: TokenTable,
    secondary: TokenTable,
    primary_encoder: (&'static str, &'static str),
    secondary_encoder: (&'static str, &'static str),
}

const N: &[&str] = &["NOOP"];

static LAYERS: [LayerDefaults; 2] = [
    LayerDefaults {
        name: "base",
        color: "#2040ff",
        primary: [
            [&["ESCAPE"], &["ONE"], &["TWO"], &["THREE"], &["FOUR"], &["FIVE"]],
            [&["TAB"], &["Q"], &["W"], &["E"], &["R"], &["T"]],
            [&["LEFT_SHIFT"], &["A"], &["S"], &["D"], &["F"], &["G"]],
            [&["LEFT_CONTROL"], &["Z"], &["X"], &["C"], &["V"], &["B"]],
            [N, N, &["LEFT_GUI"], &["LEFT_ALT"], &["LAYER_1_HOLD"], &["SPACE"]],
        ],
        secondary: [
            [&["SIX"], &["SEVEN"], &["EIGHT"], &["NINE"], &["ZERO"], &["BACKSPACE"]],
            [&["Y"], &["U"], &["I"], &["O"], &["P"], &["MINUS"]],
            [&["H"], &["J"], &["K"], &["L"], &["SEMICOLON"], &["QUOTE"]],
            [&["N"], &["M"], &["COMMA"], &["PERIOD"], &["FORWARD_SLASH"], &["RIGHT_SHIFT"]],
            [&["ENTER"], &["LAYER_1_HOLD"], &["RIGHT_ALT"], &["RIGHT_GUI"], N, N],
        ],
        primary_encoder: ("VOLUME_INCREMENT", "VOLUME_DECREMENT"),
        secondary_encoder: ("MOUSE_SCROLL_DOWN", "MOUSE_SCROLL_UP"),
    },
    LayerDefaults {
        name: "function",
        color: "#ff8000",
        primary: [
            [&["GRAVE_ACCENT"], &["F1"], &["F2"], &["F3"], &["F4"], &["F5"]],
            [N, &["LEFT_BUTTON"], &["MOUSE_MOVE_UP"], &["RIGHT_BUTTON"], N, N],
            [&["LEFT_SHIFT"], &["MOUSE_MOVE_LEFT"], &["MOUSE_MOVE_DOWN"], &["MOUSE_MOVE_RIGHT"], N, N],
            [&["LEFT_CONTROL"], &["LEFT_CONTROL", "Z"], &["LEFT_CONTROL", "X"], &["LEFT_CONTROL", "C"], &["LEFT_CONTROL", "V"], N],
            [N, N, &["LEFT_GUI"], &["LEFT_ALT"], &["LAYER_1_HOLD"], &["SPACE"]],
        ],
        secondary: [
            [&["F6"], &["F7"], &["F8"], &["F9"], &["F10"], &["DELETE"]],
            [&["HOME"], &["PAGE_DOWN"], &["PAGE_UP"], &["END"], &["F11"], &["EQUALS"]],
            [&["LEFT_ARROW"], &["DOWN_ARROW"], &["UP_ARROW"], &["RIGHT_ARROW"], &["F12"], &["BACKSLASH"]],
            [&["PLAY_PAUSE"], &["SCAN_PREVIOUS_TRACK"], &["SCAN_NEXT_TRACK"], &["MUTE"], &["LEFT_BRACKET"], &["RIGHT_BRACKET"]],
            [&["ENTER"], &["LAYER_1_HOLD"], &["RIGHT_ALT"], &["RIGHT_GUI"], N, N],
        ],
        primary_encoder: ("BRIGHTNESS_INCREMENT", "BRIGHTNESS_DECREMENT"),
        secondary_encoder: ("MOUSE_MOVE_RIGHT", "MOUSE_MOVE_LEFT"),
    },
];

/// Header of the built-in keymap.
pub fn default_header(is_left_side: bool) -> KeymapRecord {
    KeymapRecord {
        is_left_side,
        layer_count: LAYERS.len() as u8,
        column_order: ColumnOrder::Mirrored,
    }
}

/// Record of built-in layer `index`.
pub fn default_layer(index: usize) -> Result<LayerRecord> {
    let defaults = LAYERS.get(index).ok_or(Error::LayerOutOfRange {
        index: index as u32,
        count: LAYERS.len(),
    })?;
    let mut record = LayerRecord::default();
    record.name.clear();
    for c in defaults.name.chars() {
        if record.name.push(c).is_err() {
            break;
        }
    }
    let mut color = heapless::String::new();
    color
        .push_str(defaults.color)
        .map_err(|_| Error::InvalidColor)?;
    record.color = ColorSpec::Hex(color);
    record.primary_keys = token_grid(&defaults.primary[..])?;
    record.secondary_keys = token_grid(&defaults.secondary[..])?;
    record.primary_encoder = EncoderRecord::new(defaults.primary_encoder.0, defaults.primary_encoder.1)?;
    record.secondary_encoder =
        EncoderRecord::new(defaults.secondary_encoder.0, defaults.secondary_encoder.1)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::{Direction, MouseCode};
    use crate::keymap::{Binding, Keymap, LayerCommand, LayerMode};

    fn default_keymap() -> Keymap {
        let header = default_header(true);
        let records: std::vec::Vec<LayerRecord> = (0..header.layer_count as usize)
            .map(|i| default_layer(i).unwrap())
            .collect();
        Keymap::from_records(&header, records.iter()).unwrap()
    }

    #[test]
    fn default_keymap_resolves() {
        let keymap = default_keymap();
        assert_eq!(keymap.layer_count(), 2);
        assert_eq!(keymap.layer(0).unwrap().name(), "base");
        assert_eq!(keymap.layer(1).unwrap().color(), (255, 128, 0));
    }

    #[test]
    fn rows_are_mirrored() {
        let keymap = default_keymap();
        let base = keymap.layer(0).unwrap();
        assert_eq!(
            base.lookup_secondary(0, 0).unwrap().bindings(),
            &[Binding::Keyboard(0x2A)]
        );
        assert_eq!(
            base.lookup_primary(0, 5).unwrap().bindings(),
            &[Binding::Keyboard(0x29)]
        );
    }

    #[test]
    fn thumb_keys_hold_function_layer() {
        let keymap = default_keymap();
        let thumb = keymap.layer(0).unwrap().lookup_primary(4, 1).unwrap();
        assert_eq!(
            thumb.bindings(),
            &[Binding::Layer(LayerCommand::new(1, LayerMode::Hold))]
        );
    }

    #[test]
    fn function_layer_moves_the_pointer() {
        let keymap = default_keymap();
        let up = keymap.layer(1).unwrap().lookup_primary(1, 3).unwrap();
        assert_eq!(up.bindings(), &[Binding::Mouse(MouseCode::Move(Direction::Up))]);
    }

    #[test]
    fn missing_layer_is_out_of_range() {
        assert_eq!(
            default_layer(2).unwrap_err(),
            Error::LayerOutOfRange { index: 2, count: 2 }
        );
    }
}
