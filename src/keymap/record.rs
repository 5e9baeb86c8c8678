//! Persisted keymap records.
//!
//! A stored keymap is one [`KeymapRecord`] header followed by
//! `layer_count` [`LayerRecord`]s, each encoded with postcard. Tokens stay
//! as text until [`LayerRecord::build`] resolves them, so an unknown token
//! is reported when the keymap is loaded rather than when it is written.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use super::action::LogicalAction;
use super::layer::{parse_color, parse_color_components, resolve_grid, ColumnOrder, EncoderActions, Layer, Rgb};
use crate::config::{COLS, MAX_LAYER_NAME_LEN, MAX_TOKENS_PER_KEY, MAX_TOKEN_LEN, ROWS};
use crate::error::{Error, Result};

pub type Token = String<MAX_TOKEN_LEN>;
pub type KeyTokens = Vec<Token, MAX_TOKENS_PER_KEY>;
pub type TokenRow = Vec<KeyTokens, COLS>;
pub type TokenGrid = Vec<TokenRow, ROWS>;

const DEFAULT_NAME: &str = "no name";
const DEFAULT_COLOR: &str = "#000000";

/// Header of a stored keymap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeymapRecord {
    /// Side flag: the left half runs as primary.
    pub is_left_side: bool,
    pub layer_count: u8,
    pub column_order: ColumnOrder,
}

impl KeymapRecord {
    pub fn encode_into<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8]> {
        Ok(postcard::to_slice(self, buf)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

/// One color channel as written in a keymap: a number or numeric text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorComponent {
    Int(u16),
    Text(String<4>),
}

impl TryFrom<&ColorComponent> for u8 {
    type Error = Error;

    fn try_from(component: &ColorComponent) -> Result<u8> {
        match component {
            ColorComponent::Int(v) => u8::try_from(*v).map_err(|_| Error::InvalidColor),
            ColorComponent::Text(s) => s.trim().parse().map_err(|_| Error::InvalidColor),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpec {
    /// `#RRGGBB` or `RRGGBB`.
    Hex(String<8>),
    /// Three or more components; only the first three are used.
    Components(Vec<ColorComponent, 4>),
}

impl ColorSpec {
    pub fn parse(&self) -> Result<Rgb> {
        match self {
            ColorSpec::Hex(hex) => parse_color(hex),
            ColorSpec::Components(parts) => parse_color_components(parts.iter()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderRecord {
    pub clockwise: KeyTokens,
    pub counter_clockwise: KeyTokens,
}

impl EncoderRecord {
    pub fn new(clockwise: &str, counter_clockwise: &str) -> Result<Self> {
        Ok(Self {
            clockwise: key_tokens(&[clockwise])?,
            counter_clockwise: key_tokens(&[counter_clockwise])?,
        })
    }

    fn build(&self) -> Result<EncoderActions> {
        Ok(EncoderActions::new(
            LogicalAction::resolve(self.clockwise.iter())?,
            LogicalAction::resolve(self.counter_clockwise.iter())?,
        ))
    }
}

/// One layer as stored in flash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub name: String<MAX_LAYER_NAME_LEN>,
    pub color: ColorSpec,
    pub primary_keys: TokenGrid,
    pub secondary_keys: TokenGrid,
    pub primary_encoder: EncoderRecord,
    pub secondary_encoder: EncoderRecord,
}

impl Default for LayerRecord {
    /// Named "no name", black, every key empty.
    fn default() -> Self {
        let mut name = String::new();
        let _ = name.push_str(DEFAULT_NAME);
        let mut color = String::new();
        let _ = color.push_str(DEFAULT_COLOR);
        Self {
            name,
            color: ColorSpec::Hex(color),
            primary_keys: empty_token_grid(),
            secondary_keys: empty_token_grid(),
            primary_encoder: EncoderRecord::default(),
            secondary_encoder: EncoderRecord::default(),
        }
    }
}

impl LayerRecord {
    /// Resolve every token and check the grids against the matrix.
    pub fn build(&self, order: ColumnOrder) -> Result<Layer> {
        let color = self.color.parse()?;
        Ok(Layer::new(&self.name, color)
            .with_primary_keys(resolve_grid(self.primary_keys.as_slice(), order)?)
            .with_secondary_keys(resolve_grid(self.secondary_keys.as_slice(), order)?)
            .with_primary_encoder(self.primary_encoder.build()?)
            .with_secondary_encoder(self.secondary_encoder.build()?))
    }

    pub fn encode_into<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8]> {
        Ok(postcard::to_slice(self, buf)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

/// Copy borrowed tokens into the fixed-capacity record form.
pub fn key_tokens<T: AsRef<str>>(tokens: &[T]) -> Result<KeyTokens> {
    let mut out = KeyTokens::new();
    for token in tokens {
        let mut stored = Token::new();
        stored
            .push_str(token.as_ref())
            .map_err(|_| Error::UnknownToken)?;
        out.push(stored).map_err(|_| Error::TooManyBindings)?;
    }
    Ok(out)
}

/// Copy a borrowed token grid into the record form.
pub fn token_grid<R, K, T>(rows: &[R]) -> Result<TokenGrid>
where
    R: AsRef<[K]>,
    K: AsRef<[T]>,
    T: AsRef<str>,
{
    let mismatch = || Error::GridMismatch {
        rows: rows.len(),
        cols: rows.first().map_or(0, |r| r.as_ref().len()),
        expected_rows: ROWS,
        expected_cols: COLS,
    };
    let mut grid = TokenGrid::new();
    for row in rows {
        let mut out = TokenRow::new();
        for key in row.as_ref() {
            out.push(key_tokens(key.as_ref())?).map_err(|_| mismatch())?;
        }
        grid.push(out).map_err(|_| mismatch())?;
    }
    Ok(grid)
}

fn empty_token_grid() -> TokenGrid {
    let mut grid = TokenGrid::new();
    for _ in 0..ROWS {
        let mut row = TokenRow::new();
        for _ in 0..COLS {
            let _ = row.push(KeyTokens::new());
        }
        let _ = grid.push(row);
    }
    grid
}
