//! Key matrix geometry helpers.
//!
//! A key number is the row-major index of a switch: `row * col_count + col`.
//! Matrix snapshots are packed one byte per row, bit `c` set when column
//! `c` is pressed.

/// Default number of columns packed into one row byte.
pub const DEFAULT_BYTE_SIZE: usize = 6;

/// Convert a row-major key number into `(row, col)`.
///
/// `col_count` must be non-zero.
pub const fn get_coords(i: usize, col_count: usize) -> (usize, usize) {
    (i / col_count, i % col_count)
}

/// Pack one row of switch states into a bitmask.
pub fn row_bitmask(row: &[bool]) -> u8 {
    row.iter()
        .take(8)
        .enumerate()
        .filter(|(_, pressed)| **pressed)
        .fold(0u8, |mask, (col, _)| mask | (1 << col))
}

/// Pack a whole matrix, one byte per row, into `out`.
///
/// Returns the number of bytes written (rows beyond `out.len()` are skipped).
pub fn to_bytes<const C: usize>(matrix: &[[bool; C]], out: &mut [u8]) -> usize {
    let mut written = 0;
    for (byte, row) in out.iter_mut().zip(matrix.iter()) {
        *byte = row_bitmask(row);
        written += 1;
    }
    written
}

/// Yield every switch whose state differs between two snapshots.
///
/// Items are `((row, col), pressed)` in row-major order with columns
/// ascending; `pressed` is the state in `current`. Only the shorter of the
/// two snapshots is compared.
pub fn diff_bitmaps<'a>(previous: &'a [u8], current: &'a [u8], byte_size: usize) -> DiffBitmaps<'a> {
    DiffBitmaps {
        previous,
        current,
        byte_size: byte_size.min(8),
        row: 0,
        col: 0,
    }
}

/// Iterator returned by [`diff_bitmaps`].
pub struct DiffBitmaps<'a> {
    previous: &'a [u8],
    current: &'a [u8],
    byte_size: usize,
    row: usize,
    col: usize,
}

impl Iterator for DiffBitmaps<'_> {
    type Item = ((usize, usize), bool);

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.previous.len().min(self.current.len());
        while self.row < rows {
            let changed = self.previous[self.row] ^ self.current[self.row];
            while self.col < self.byte_size {
                let col = self.col;
                self.col += 1;
                let bit = 1u8 << col;
                if changed & bit != 0 {
                    return Some(((self.row, col), self.current[self.row] & bit != 0));
                }
            }
            self.row += 1;
            self.col = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn coords_of_first_key_in_fourth_row() {
        assert_eq!(get_coords(18, 6), (3, 0));
        assert_eq!(get_coords(7, 6), (1, 1));
        assert_eq!(get_coords(0, 6), (0, 0));
    }

    #[test]
    fn single_press_is_reported() {
        let events: heapless::Vec<_, 8> = diff_bitmaps(&[0b000000], &[0b000001], 6).collect();
        assert_eq!(events.as_slice(), &[((0, 0), true)]);
    }

    #[test]
    fn release_and_press_across_rows_in_order() {
        let previous = [0b000100, 0b000000, 0b100000];
        let current = [0b000000, 0b010010, 0b100000];
        let events: heapless::Vec<_, 8> = diff_bitmaps(&previous, &current, 6).collect();
        assert_eq!(
            events.as_slice(),
            &[((0, 2), false), ((1, 1), true), ((1, 4), true)]
        );
    }

    #[test]
    fn bits_beyond_byte_size_are_ignored() {
        let events = diff_bitmaps(&[0b0000_0000], &[0b1100_0000], 6).count();
        assert_eq!(events, 0);
    }

    #[test]
    fn identical_snapshots_yield_nothing() {
        assert_eq!(diff_bitmaps(&[0x3F, 0x01], &[0x3F, 0x01], 6).count(), 0);
    }

    #[test]
    fn matrix_packs_one_byte_per_row() {
        let mut matrix = [[false; 6]; 3];
        matrix[0][0] = true;
        matrix[1][5] = true;
        matrix[2][1] = true;
        matrix[2][2] = true;
        let mut out = [0u8; 3];
        assert_eq!(to_bytes(&matrix, &mut out), 3);
        assert_eq!(out, [0b000001, 0b100000, 0b000110]);
    }

    proptest! {
        #[test]
        fn coords_recompose_key_number(i in 0usize..10_000, cols in 1usize..32) {
            let (row, col) = get_coords(i, cols);
            prop_assert_eq!(row * cols + col, i);
            prop_assert!(col < cols);
        }

        #[test]
        fn diff_count_matches_changed_bits(a in any::<[u8; 5]>(), b in any::<[u8; 5]>()) {
            let expected: u32 = a.iter().zip(b.iter()).map(|(x, y)| ((x ^ y) & 0x3F).count_ones()).sum();
            prop_assert_eq!(diff_bitmaps(&a, &b, 6).count() as u32, expected);
        }
    }
}
