//! Single-byte encodings for analog values carried over the split link.
//!
//! ```text
//! encode_float:  bit 7    = sign (1 = negative)
//!                bit 0-6  = round(|x| * 127)
//!
//! encode_vector: bit 4-7  = x nibble
//!                bit 0-3  = y nibble
//! ```

const MAGNITUDE_MASK: u8 = 0x7F;
const SIGN_BIT: u8 = 0x80;
const FULL_SCALE: f32 = 127.0;

/// Encode a normalized axis value in `[-1.0, 1.0]` into one byte.
///
/// Out-of-range values are clamped; `NaN` encodes as centered.
pub fn encode_float(x: f32) -> u8 {
    if x.is_nan() {
        return 0;
    }
    let negative = x < 0.0;
    let magnitude = if negative { -x } else { x };
    let magnitude = if magnitude > 1.0 { 1.0 } else { magnitude };
    // Non-negative, so adding one half before truncation rounds to nearest.
    let steps = (magnitude * FULL_SCALE + 0.5) as u8;
    if steps == 0 {
        0
    } else if negative {
        SIGN_BIT | steps
    } else {
        steps
    }
}

/// Inverse of [`encode_float`] at 1/127 resolution.
pub fn decode_float(byte: u8) -> f32 {
    let magnitude = (byte & MAGNITUDE_MASK) as f32 / FULL_SCALE;
    if byte & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Pack two nibbles (`0..=15` each) into one byte.
pub fn encode_vector(x: u8, y: u8) -> u8 {
    ((x & 0x0F) << 4) | (y & 0x0F)
}

/// Split a byte produced by [`encode_vector`] back into its nibbles.
pub fn decode_vector(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_float_endpoints() {
        assert_eq!(encode_float(-1.0), 255);
        assert_eq!(encode_float(1.0), 127);
        assert_eq!(encode_float(0.0), 0);
    }

    #[test]
    fn decode_float_endpoints() {
        assert_eq!(decode_float(0), 0.0);
        assert_eq!(decode_float(127), 1.0);
        assert_eq!(decode_float(255), -1.0);
    }

    #[test]
    fn encode_float_clamps_out_of_range() {
        assert_eq!(encode_float(3.5), 127);
        assert_eq!(encode_float(-8.0), 255);
        assert_eq!(encode_float(f32::NAN), 0);
    }

    #[test]
    fn tiny_negative_value_encodes_as_center() {
        assert_eq!(encode_float(-0.001), 0);
    }

    #[test]
    fn encode_vector_packs_nibbles() {
        assert_eq!(encode_vector(5, 7), 87);
        assert_eq!(decode_vector(87), (5, 7));
    }

    #[test]
    fn vector_roundtrip_all_nibbles() {
        for x in 0..=15u8 {
            for y in 0..=15u8 {
                assert_eq!(decode_vector(encode_vector(x, y)), (x, y));
            }
        }
    }

    proptest! {
        #[test]
        fn float_roundtrip_within_one_step(x in -1.0f32..=1.0) {
            let decoded = decode_float(encode_float(x));
            prop_assert!((decoded - x).abs() <= 1.0 / 127.0);
        }

        #[test]
        fn float_codec_is_monotonic(a in -1.0f32..=1.0, b in -1.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(decode_float(encode_float(lo)) <= decode_float(encode_float(hi)));
        }
    }
}
