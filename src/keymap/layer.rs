//! Layers: named, colored grids of resolved actions.

use heapless::String;
use serde::{Deserialize, Serialize};

use super::action::LogicalAction;
use crate::config::{COLS, MAX_LAYER_NAME_LEN, ROWS};
use crate::error::{Error, Result};

/// `(red, green, blue)`.
pub type Rgb = (u8, u8, u8);

/// One action per matrix position, `[row][col]`.
pub type Grid = [[LogicalAction; COLS]; ROWS];

/// Order in which a token row lists the matrix columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColumnOrder {
    /// Token `c` is matrix column `c`.
    #[default]
    Matrix,
    /// Token `c` is matrix column `COLS - 1 - c` (rows written as seen
    /// from above on a mirrored half).
    Mirrored,
}

/// Parse `#RRGGBB` or `RRGGBB`.
pub fn parse_color(hex: &str) -> Result<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(Error::InvalidColor);
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| Error::InvalidColor);
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

/// Build a color from the first three of `components`; extra ones are ignored.
pub fn parse_color_components<I>(components: I) -> Result<Rgb>
where
    I: IntoIterator,
    I::Item: TryInto<u8>,
{
    let mut it = components.into_iter().map(|c| c.try_into().map_err(|_| Error::InvalidColor));
    let mut next = || it.next().unwrap_or(Err(Error::InvalidColor));
    Ok((next()?, next()?, next()?))
}

/// Resolve a token grid into actions, checking it matches the matrix.
pub fn resolve_grid<R, K, T>(rows: &[R], order: ColumnOrder) -> Result<Grid>
where
    R: AsRef<[K]>,
    K: AsRef<[T]>,
    T: AsRef<str>,
{
    let mismatch = |cols: usize| Error::GridMismatch {
        rows: rows.len(),
        cols,
        expected_rows: ROWS,
        expected_cols: COLS,
    };
    if rows.len() != ROWS {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        return Err(mismatch(cols));
    }

    let mut grid = empty_grid();
    for (r, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != COLS {
            return Err(mismatch(row.len()));
        }
        for (c, key) in row.iter().enumerate() {
            let col = match order {
                ColumnOrder::Matrix => c,
                ColumnOrder::Mirrored => COLS - 1 - c,
            };
            grid[r][col] = LogicalAction::resolve(key.as_ref().iter().map(|t| t.as_ref()))?;
        }
    }
    Ok(grid)
}

pub fn empty_grid() -> Grid {
    core::array::from_fn(|_| core::array::from_fn(|_| LogicalAction::noop()))
}

/// Clockwise and counter-clockwise actions of one encoder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderActions {
    pub clockwise: LogicalAction,
    pub counter_clockwise: LogicalAction,
}

impl EncoderActions {
    pub fn new(clockwise: LogicalAction, counter_clockwise: LogicalAction) -> Self {
        Self {
            clockwise,
            counter_clockwise,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    name: String<MAX_LAYER_NAME_LEN>,
    color: Rgb,
    primary_keys: Grid,
    secondary_keys: Grid,
    primary_encoder: EncoderActions,
    secondary_encoder: EncoderActions,
}

impl Layer {
    /// A layer where every key does nothing. Names longer than
    /// `MAX_LAYER_NAME_LEN` are truncated.
    pub fn new(name: &str, color: Rgb) -> Self {
        let mut stored = String::new();
        for ch in name.chars() {
            if stored.push(ch).is_err() {
                break;
            }
        }
        Self {
            name: stored,
            color,
            primary_keys: empty_grid(),
            secondary_keys: empty_grid(),
            primary_encoder: EncoderActions::default(),
            secondary_encoder: EncoderActions::default(),
        }
    }

    pub fn with_primary_keys(mut self, grid: Grid) -> Self {
        self.primary_keys = grid;
        self
    }

    pub fn with_secondary_keys(mut self, grid: Grid) -> Self {
        self.secondary_keys = grid;
        self
    }

    pub fn with_primary_encoder(mut self, encoder: EncoderActions) -> Self {
        self.primary_encoder = encoder;
        self
    }

    pub fn with_secondary_encoder(mut self, encoder: EncoderActions) -> Self {
        self.secondary_encoder = encoder;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn lookup_primary(&self, row: usize, col: usize) -> Option<&LogicalAction> {
        self.primary_keys.get(row)?.get(col)
    }

    pub fn lookup_secondary(&self, row: usize, col: usize) -> Option<&LogicalAction> {
        self.secondary_keys.get(row)?.get(col)
    }

    pub fn primary_encoder(&self) -> &EncoderActions {
        &self.primary_encoder
    }

    pub fn secondary_encoder(&self) -> &EncoderActions {
        &self.secondary_encoder
    }

    /// Every action on this layer, keys first, then encoders.
    pub fn actions(&self) -> impl Iterator<Item = &LogicalAction> {
        self.primary_keys
            .iter()
            .chain(self.secondary_keys.iter())
            .flatten()
            .chain([
                &self.primary_encoder.clockwise,
                &self.primary_encoder.counter_clockwise,
                &self.secondary_encoder.clockwise,
                &self.secondary_encoder.counter_clockwise,
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::action::Binding;
    use rstest::rstest;

    fn token_grid(fill: &'static str) -> [[[&'static str; 1]; COLS]; ROWS] {
        [[[fill]; COLS]; ROWS]
    }

    #[rstest]
    #[case("#ffffff", (255, 255, 255))]
    #[case("ffffff", (255, 255, 255))]
    #[case("#000000", (0, 0, 0))]
    #[case("12aBcD", (0x12, 0xAB, 0xCD))]
    fn parses_hex_colors(#[case] input: &str, #[case] expected: Rgb) {
        assert_eq!(parse_color(input), Ok(expected));
    }

    #[rstest]
    #[case("ffffffffffff")]
    #[case("#fff")]
    #[case("gggggg")]
    #[case("")]
    #[case("ffé fff")]
    fn rejects_bad_hex_colors(#[case] input: &str) {
        assert_eq!(parse_color(input), Err(Error::InvalidColor));
    }

    #[rstest]
    #[case(&[255, 255, 255])]
    #[case(&[255, 255, 255, 111])]
    fn components_take_first_three(#[case] input: &[u32]) {
        assert_eq!(parse_color_components(input.iter().copied()), Ok((255, 255, 255)));
    }

    #[test]
    fn components_must_fit_a_byte() {
        assert_eq!(parse_color_components([256u32, 0, 0]), Err(Error::InvalidColor));
        assert_eq!(parse_color_components([1u32, 2]), Err(Error::InvalidColor));
    }

    #[test]
    fn grid_must_match_matrix() {
        let short: [[[&str; 1]; COLS]; 2] = [[["a"]; COLS]; 2];
        assert_eq!(
            resolve_grid(&short[..], ColumnOrder::Matrix),
            Err(Error::GridMismatch {
                rows: 2,
                cols: COLS,
                expected_rows: ROWS,
                expected_cols: COLS
            })
        );
    }

    #[test]
    fn mirrored_rows_reverse_columns() {
        let mut tokens = token_grid("noop");
        tokens[1][0] = ["a"];
        let grid = resolve_grid(&tokens[..], ColumnOrder::Mirrored).unwrap();
        let layer = Layer::new("base", (0, 0, 0)).with_primary_keys(grid);
        assert_eq!(
            layer.lookup_primary(1, COLS - 1).unwrap().bindings(),
            &[Binding::Keyboard(0x04)]
        );
        assert!(layer.lookup_primary(1, 0).unwrap().is_noop());
    }

    #[test]
    fn lookup_out_of_range_is_none() {
        let layer = Layer::new("base", (0, 0, 0));
        assert!(layer.lookup_secondary(ROWS, 0).is_none());
        assert!(layer.lookup_secondary(0, COLS).is_none());
    }

    #[test]
    fn long_names_are_truncated() {
        let layer = Layer::new("a very long layer name", (1, 2, 3));
        assert_eq!(layer.name(), "a very long laye");
        assert_eq!(layer.color(), (1, 2, 3));
    }
}
