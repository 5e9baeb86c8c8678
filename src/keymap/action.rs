//! Key token resolution into bindings.

use heapless::Vec;

use crate::config::MAX_BINDINGS_PER_KEY;
use crate::error::{Error, Result};
use crate::hid::MouseCode;
use crate::keycodes::{keyboard_code, media_code, mouse_code};

const LAYER_PREFIX: &str = "LAYER_";
const NOOP: &str = "NOOP";

/// How a layer key changes the active layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayerMode {
    /// Switch on press, stay there on release.
    Press,
    /// Switch on press, restore the previous layer on release.
    Hold,
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerCommand {
    /// Target layer for `Press`/`Hold`; 0 for the relative modes.
    pub target_index: u8,
    pub mode: LayerMode,
}

impl LayerCommand {
    pub const fn new(target_index: u8, mode: LayerMode) -> Self {
        Self { target_index, mode }
    }

    /// Whether `token` belongs to the layer capability at all.
    pub fn is_layer_token(token: &str) -> bool {
        token
            .get(..LAYER_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(LAYER_PREFIX))
    }

    /// Parse `layer_<index>_<press|hold>` or `layer_<inc|dec>`, ignoring case.
    pub fn parse(token: &str) -> Result<Self> {
        if !Self::is_layer_token(token) {
            return Err(Error::UnknownLayerCommand);
        }
        let mut segments = token[LAYER_PREFIX.len()..].split('_');
        let first = segments.next().ok_or(Error::UnknownLayerCommand)?;
        let second = segments.next();
        if segments.next().is_some() {
            return Err(Error::UnknownLayerCommand);
        }
        match second {
            None if first.eq_ignore_ascii_case("inc") => Ok(Self::new(0, LayerMode::Increment)),
            None if first.eq_ignore_ascii_case("dec") => Ok(Self::new(0, LayerMode::Decrement)),
            None => Err(Error::UnknownLayerCommand),
            Some(mode) => {
                let index: u8 = first.parse().map_err(|_| Error::UnknownLayerCommand)?;
                if mode.eq_ignore_ascii_case("press") {
                    Ok(Self::new(index, LayerMode::Press))
                } else if mode.eq_ignore_ascii_case("hold") {
                    Ok(Self::new(index, LayerMode::Hold))
                } else {
                    Err(Error::UnknownLayerCommand)
                }
            }
        }
    }
}

/// One downstream effect of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Binding {
    Keyboard(u8),
    Mouse(MouseCode),
    Media(u16),
    Layer(LayerCommand),
}

/// Everything a physical key (or encoder direction) does, resolved once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalAction {
    bindings: Vec<Binding, MAX_BINDINGS_PER_KEY>,
}

impl LogicalAction {
    pub const fn noop() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Resolve a token list.
    ///
    /// Capabilities are scanned in the order keyboard, mouse, media, layer;
    /// every token found in a capability's table adds a binding. `noop`
    /// and empty tokens add nothing. A token no capability knows is an error.
    pub fn resolve<I, T>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Clone,
        T: AsRef<str>,
    {
        let tokens = tokens.into_iter();
        let mut action = Self::noop();

        for token in tokens.clone() {
            let token = token.as_ref();
            if token.is_empty() || token.eq_ignore_ascii_case(NOOP) {
                continue;
            }
            let known = keyboard_code(token).is_some()
                || mouse_code(token).is_some()
                || media_code(token).is_some()
                || LayerCommand::is_layer_token(token);
            if !known {
                error!("unknown key token {}", token);
                return Err(Error::UnknownToken);
            }
        }

        for token in tokens.clone() {
            if let Some(code) = keyboard_code(token.as_ref()) {
                action.push(Binding::Keyboard(code))?;
            }
        }
        for token in tokens.clone() {
            if let Some(code) = mouse_code(token.as_ref()) {
                action.push(Binding::Mouse(code))?;
            }
        }
        for token in tokens.clone() {
            if let Some(code) = media_code(token.as_ref()) {
                action.push(Binding::Media(code))?;
            }
        }
        for token in tokens {
            let token = token.as_ref();
            if LayerCommand::is_layer_token(token) {
                action.push(Binding::Layer(LayerCommand::parse(token)?))?;
            }
        }
        Ok(action)
    }

    pub fn single(binding: Binding) -> Self {
        let mut action = Self::noop();
        // Capacity is at least one.
        let _ = action.bindings.push(binding);
        action
    }

    fn push(&mut self, binding: Binding) -> Result<()> {
        self.bindings
            .push(binding)
            .map_err(|_| Error::TooManyBindings)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn is_noop(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether any binding targets the layer manager.
    pub fn is_layer_action(&self) -> bool {
        self.bindings.iter().any(|b| matches!(b, Binding::Layer(_)))
    }

    pub(crate) fn layer_commands(&self) -> impl Iterator<Item = LayerCommand> + '_ {
        self.bindings.iter().filter_map(|b| match b {
            Binding::Layer(command) => Some(*command),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::Direction;
    use rstest::rstest;

    #[rstest]
    #[case("layer_2_hold", 2, LayerMode::Hold)]
    #[case("LAYER_0_PRESS", 0, LayerMode::Press)]
    #[case("Layer_11_Press", 11, LayerMode::Press)]
    #[case("layer_inc", 0, LayerMode::Increment)]
    #[case("LAYER_DEC", 0, LayerMode::Decrement)]
    fn parses_layer_commands(#[case] token: &str, #[case] index: u8, #[case] mode: LayerMode) {
        assert_eq!(LayerCommand::parse(token), Ok(LayerCommand::new(index, mode)));
    }

    #[rstest]
    #[case("layer_")]
    #[case("layer_1")]
    #[case("layer_x_hold")]
    #[case("layer_1_toggle")]
    #[case("layer_1_hold_extra")]
    #[case("layer_1_inc")]
    fn rejects_malformed_layer_commands(#[case] token: &str) {
        assert_eq!(LayerCommand::parse(token), Err(Error::UnknownLayerCommand));
    }

    #[test]
    fn noop_and_empty_resolve_to_nothing() {
        assert!(LogicalAction::resolve(["noop"]).unwrap().is_noop());
        assert!(LogicalAction::resolve([""]).unwrap().is_noop());
        assert!(LogicalAction::resolve::<_, &str>([]).unwrap().is_noop());
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert_eq!(LogicalAction::resolve(["NOT_A_KEY"]), Err(Error::UnknownToken));
    }

    #[test]
    fn bindings_are_capability_major() {
        let action = LogicalAction::resolve(["layer_1_hold", "mute", "left_button", "a"]).unwrap();
        assert_eq!(
            action.bindings(),
            &[
                Binding::Keyboard(0x04),
                Binding::Mouse(MouseCode::Button(1)),
                Binding::Media(0xE2),
                Binding::Layer(LayerCommand::new(1, LayerMode::Hold)),
            ]
        );
        assert!(action.is_layer_action());
    }

    #[test]
    fn directional_mouse_token() {
        let action = LogicalAction::resolve(["MOUSE_MOVE_LEFT"]).unwrap();
        assert_eq!(
            action.bindings(),
            &[Binding::Mouse(MouseCode::Move(Direction::Left))]
        );
        assert!(!action.is_layer_action());
    }

    #[test]
    fn too_many_bindings() {
        let tokens = ["a", "b", "c", "d", "e"];
        assert_eq!(LogicalAction::resolve(tokens), Err(Error::TooManyBindings));
    }
}
