//! Turns resolved actions into HID calls and layer changes.
//!
//! The sender remembers which action each held key pressed, so releasing
//! a key releases what it pressed even if the active layer changed in
//! between (a `Hold` key on a layer where that position is unbound).

use heapless::LinearMap;

use crate::hid::{HidContext, Keyboard, Media, Mouse};
use crate::keymap::{Binding, Keymap, LogicalAction};
use crate::layer_manager::LayerManager;
use crate::matrix::get_coords;

/// Held keys tracked at once; beyond this a release falls back to the
/// active layer.
const MAX_HELD_KEYS: usize = 16;

/// Which half a key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeySource {
    Primary,
    Secondary,
}

/// A physical key on either half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyId {
    pub source: KeySource,
    pub row: u8,
    pub col: u8,
}

impl KeyId {
    pub const fn new(source: KeySource, row: u8, col: u8) -> Self {
        Self { source, row, col }
    }

    /// Locate a key number on a matrix with `col_count` columns.
    pub fn from_key_number(source: KeySource, key_number: u16, col_count: usize) -> Self {
        let (row, col) = get_coords(key_number as usize, col_count);
        Self::new(source, row as u8, col as u8)
    }

    /// The action at this position on the active layer.
    pub fn lookup<'a>(&self, keymap: &'a Keymap) -> Option<&'a LogicalAction> {
        let layer = keymap.active_layer();
        let (row, col) = (self.row as usize, self.col as usize);
        match self.source {
            KeySource::Primary => layer.lookup_primary(row, col),
            KeySource::Secondary => layer.lookup_secondary(row, col),
        }
    }
}

pub struct ActionSender<K, M, D> {
    hid: HidContext<K, M, D>,
    layers: LayerManager,
    held: LinearMap<KeyId, LogicalAction, MAX_HELD_KEYS>,
}

impl<K: Keyboard, M: Mouse, D: Media> ActionSender<K, M, D> {
    pub fn new(hid: HidContext<K, M, D>) -> Self {
        Self {
            hid,
            layers: LayerManager::new(),
            held: LinearMap::new(),
        }
    }

    pub fn hid(&self) -> &HidContext<K, M, D> {
        &self.hid
    }

    pub fn hid_mut(&mut self) -> &mut HidContext<K, M, D> {
        &mut self.hid
    }

    pub fn layer_manager(&self) -> &LayerManager {
        &self.layers
    }

    /// Press every binding of `action`.
    pub fn press(&mut self, keymap: &mut Keymap, action: &LogicalAction) {
        for binding in action.bindings() {
            match *binding {
                Binding::Keyboard(code) => self.hid.keyboard.press(code),
                Binding::Mouse(code) => self.hid.mouse.press(code),
                Binding::Media(code) => self.hid.media.press(code),
                Binding::Layer(command) => self.layers.on_press(keymap, command),
            }
        }
    }

    /// Release every binding of `action`, then release everything once if
    /// any binding was a layer command.
    pub fn release(&mut self, keymap: &mut Keymap, action: &LogicalAction) {
        for binding in action.bindings() {
            match *binding {
                Binding::Keyboard(code) => self.hid.keyboard.release(code),
                Binding::Mouse(code) => self.hid.mouse.release(code),
                Binding::Media(_) => self.hid.media.release(),
                Binding::Layer(command) => self.layers.on_release(keymap, command),
            }
        }
        if action.is_layer_action() {
            self.release_all();
        }
    }

    pub fn press_and_release(&mut self, keymap: &mut Keymap, action: &LogicalAction) {
        self.press(keymap, action);
        self.release(keymap, action);
    }

    pub fn release_all(&mut self) {
        self.hid.release_all();
    }

    /// Press the action bound to `key` on the active layer.
    pub fn press_key(&mut self, keymap: &mut Keymap, key: KeyId) {
        let Some(action) = key.lookup(keymap).cloned() else {
            warn!("no key at {:?}", key);
            return;
        };
        if self.held.insert(key, action.clone()).is_err() {
            debug!("held key table full");
        }
        self.press(keymap, &action);
    }

    /// Release whatever `key` pressed.
    pub fn release_key(&mut self, keymap: &mut Keymap, key: KeyId) {
        let action = match self.held.remove(&key) {
            Some(action) => action,
            None => match key.lookup(keymap) {
                Some(action) => action.clone(),
                None => {
                    warn!("no key at {:?}", key);
                    return;
                }
            },
        };
        self.release(keymap, &action);
    }

    /// Release every key of one half that is still held, as if each had
    /// come up. `Hold` layer keys restore their layer.
    pub fn release_held(&mut self, keymap: &mut Keymap, source: KeySource) {
        let mut stale: heapless::Vec<KeyId, MAX_HELD_KEYS> = heapless::Vec::new();
        for key in self.held.keys().filter(|k| k.source == source) {
            let _ = stale.push(*key);
        }
        for key in stale {
            if let Some(action) = self.held.remove(&key) {
                self.release(keymap, &action);
            }
        }
    }
}
