//! Layered keymap: which action a physical position triggers.

pub mod action;
pub mod defaults;
pub mod layer;
pub mod record;

pub use action::{Binding, LayerCommand, LayerMode, LogicalAction};
pub use defaults::{default_header, default_layer};
pub use layer::{parse_color, ColumnOrder, EncoderActions, Layer, Rgb};
pub use record::{KeymapRecord, LayerRecord};

use heapless::Vec;

use crate::config::MAX_LAYERS;
use crate::error::{Error, Result};

/// The device's layers plus the index of the active one.
///
/// `active_layer_index` always addresses an existing layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keymap {
    layers: Vec<Layer, MAX_LAYERS>,
    active_layer_index: usize,
}

impl Keymap {
    /// Build a keymap, checking every layer command targets an existing layer.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let mut stored = Vec::new();
        for layer in layers {
            stored.push(layer).map_err(|_| Error::TooManyLayers)?;
        }
        if stored.is_empty() {
            return Err(Error::NoLayers);
        }
        let count = stored.len();
        for action in stored.iter().flat_map(Layer::actions) {
            for command in action.layer_commands() {
                let relative = matches!(command.mode, LayerMode::Increment | LayerMode::Decrement);
                if !relative && command.target_index as usize >= count {
                    error!("layer command targets layer {} of {}", command.target_index, count);
                    return Err(Error::LayerOutOfRange {
                        index: command.target_index as u32,
                        count,
                    });
                }
            }
        }
        Ok(Self {
            layers: stored,
            active_layer_index: 0,
        })
    }

    /// Resolve stored records into a keymap.
    pub fn from_records<'a, I>(header: &KeymapRecord, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a LayerRecord>,
    {
        let mut layers: Vec<Layer, MAX_LAYERS> = Vec::new();
        for record in records.into_iter().take(header.layer_count as usize) {
            let layer = record.build(header.column_order)?;
            layers.push(layer).map_err(|_| Error::TooManyLayers)?;
        }
        Self::new(layers)
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active_layer_index]
    }

    pub fn active_layer_index(&self) -> usize {
        self.active_layer_index
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Clamped into range; only the layer manager switches layers.
    pub(crate) fn set_active_layer_index(&mut self, index: usize) {
        self.active_layer_index = index.min(self.layers.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{COLS, ROWS};
    use crate::keymap::layer::resolve_grid;

    fn layer_with_key(token: &'static str) -> Layer {
        let mut tokens = [[[""]; COLS]; ROWS];
        tokens[0][0] = [token];
        let grid = resolve_grid(&tokens[..], ColumnOrder::Matrix).unwrap();
        Layer::new("test", (0, 0, 0)).with_primary_keys(grid)
    }

    #[test]
    fn starts_on_first_layer() {
        let keymap = Keymap::new([layer_with_key("a"), layer_with_key("b")]).unwrap();
        assert_eq!(keymap.active_layer_index(), 0);
        assert_eq!(keymap.layer_count(), 2);
        assert_eq!(
            keymap.active_layer().lookup_primary(0, 0).unwrap().bindings(),
            &[Binding::Keyboard(0x04)]
        );
    }

    #[test]
    fn empty_keymap_is_rejected() {
        assert_eq!(Keymap::new([]), Err(Error::NoLayers));
    }

    #[test]
    fn too_many_layers() {
        let layers = (0..=MAX_LAYERS).map(|_| layer_with_key("a"));
        assert_eq!(Keymap::new(layers), Err(Error::TooManyLayers));
    }

    #[test]
    fn layer_command_out_of_range() {
        let result = Keymap::new([layer_with_key("layer_2_hold"), layer_with_key("a")]);
        assert_eq!(result, Err(Error::LayerOutOfRange { index: 2, count: 2 }));
    }

    #[test]
    fn relative_commands_need_no_target() {
        assert!(Keymap::new([layer_with_key("layer_inc")]).is_ok());
    }

    #[test]
    fn from_records_honours_layer_count() {
        let header = KeymapRecord {
            is_left_side: true,
            layer_count: 1,
            column_order: ColumnOrder::Matrix,
        };
        let records = [LayerRecord::default(), LayerRecord::default()];
        let keymap = Keymap::from_records(&header, &records).unwrap();
        assert_eq!(keymap.layer_count(), 1);
        assert_eq!(keymap.active_layer().name(), "no name");
    }

    #[test]
    fn set_active_clamps() {
        let mut keymap = Keymap::new([layer_with_key("a")]).unwrap();
        keymap.set_active_layer_index(5);
        assert_eq!(keymap.active_layer_index(), 0);
    }
}
