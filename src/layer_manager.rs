//! Switches the active layer in response to layer keys.
//!
//! `Press` and `Hold` both remember the layer they leave in a one-slot
//! register; only `Hold` goes back to it on release.

use crate::keymap::{Keymap, LayerCommand, LayerMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerManager {
    previous: usize,
}

impl LayerManager {
    pub const fn new() -> Self {
        Self { previous: 0 }
    }

    /// Layer a `Hold` release returns to.
    pub fn previous(&self) -> usize {
        self.previous
    }

    pub fn on_press(&mut self, keymap: &mut Keymap, command: LayerCommand) {
        let active = keymap.active_layer_index();
        match command.mode {
            LayerMode::Press | LayerMode::Hold => {
                let target = command.target_index as usize;
                if target != active {
                    self.previous = active;
                    keymap.set_active_layer_index(target);
                }
            }
            LayerMode::Increment => {
                keymap.set_active_layer_index((active + 1).min(keymap.layer_count() - 1));
            }
            LayerMode::Decrement => {
                keymap.set_active_layer_index(active.saturating_sub(1));
            }
        }
        if keymap.active_layer_index() != active {
            debug!("layer {} -> {}", active, keymap.active_layer_index());
        }
    }

    pub fn on_release(&mut self, keymap: &mut Keymap, command: LayerCommand) {
        if command.mode == LayerMode::Hold {
            debug!("layer {} restored", self.previous);
            keymap.set_active_layer_index(self.previous);
        }
    }
}
