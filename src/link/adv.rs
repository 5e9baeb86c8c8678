//! Advertising data helpers for finding the secondary half.
//!
//! Advertising payloads are a sequence of `[len][type][data; len - 1]`
//! structures. The secondary lists the Roki service UUID in a 128-bit
//! service list; the primary only connects to advertisers carrying it.

use heapless::String;

use crate::config::ROKI_SERVICE_UUID;

/// AD type: incomplete list of 128-bit service UUIDs.
const AD_INCOMPLETE_UUID128: u8 = 0x06;
/// AD type: complete list of 128-bit service UUIDs.
const AD_COMPLETE_UUID128: u8 = 0x07;
const AD_SHORT_NAME: u8 = 0x08;
const AD_COMPLETE_NAME: u8 = 0x09;

/// Longest advertised name kept for logging.
pub const MAX_ADV_NAME_LEN: usize = 16;

/// Parse a canonical `8-4-4-4-12` UUID string into the little-endian byte
/// order used on air.
pub const fn parse_uuid128(text: &str) -> Option<[u8; 16]> {
    let text = text.as_bytes();
    if text.len() != 36 {
        return None;
    }
    let mut bytes = [0u8; 16];
    let mut out = bytes.len();
    let mut i = 0;
    while i < text.len() {
        if text[i] == b'-' {
            if !matches!(i, 8 | 13 | 18 | 23) {
                return None;
            }
            i += 1;
            continue;
        }
        if i + 1 >= text.len() || out == 0 {
            return None;
        }
        let (Some(hi), Some(lo)) = (hex_value(text[i]), hex_value(text[i + 1])) else {
            return None;
        };
        out -= 1;
        bytes[out] = (hi << 4) | lo;
        i += 2;
    }
    if out != 0 {
        return None;
    }
    Some(bytes)
}

const fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// The Roki service UUID in on-air byte order.
pub const ROKI_SERVICE_UUID128: [u8; 16] = match parse_uuid128(ROKI_SERVICE_UUID) {
    Some(uuid) => uuid,
    None => panic!("malformed ROKI_SERVICE_UUID"),
};

/// Iterate the `(type, data)` structures of an advertising payload.
///
/// Stops at a zero length or a structure running past the buffer.
pub fn structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let body = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, body))
    })
}

/// Whether the payload lists `uuid` (little-endian) as a 128-bit service.
pub fn contains_service_uuid128(data: &[u8], uuid: &[u8; 16]) -> bool {
    structures(data)
        .filter(|(ad_type, _)| matches!(*ad_type, AD_INCOMPLETE_UUID128 | AD_COMPLETE_UUID128))
        .any(|(_, body)| body.chunks_exact(16).any(|chunk| chunk == uuid))
}

/// Complete or shortened local name, truncated to `MAX_ADV_NAME_LEN`.
pub fn device_name(data: &[u8]) -> Option<String<MAX_ADV_NAME_LEN>> {
    let (_, body) = structures(data)
        .find(|(ad_type, _)| matches!(*ad_type, AD_SHORT_NAME | AD_COMPLETE_NAME))?;
    let mut name = String::new();
    for c in core::str::from_utf8(body).ok()?.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_adv(uuid: &[u8; 16]) -> [u8; 21] {
        let mut data = [0u8; 21];
        data[..3].copy_from_slice(&[0x02, 0x01, 0x06]);
        data[3] = 17;
        data[4] = AD_COMPLETE_UUID128;
        data[5..].copy_from_slice(uuid);
        data
    }

    #[test]
    fn uuid_is_reversed_for_the_air() {
        let uuid = ROKI_SERVICE_UUID128;
        assert_eq!(uuid[15], 0xd0);
        assert_eq!(uuid[14], 0xa3);
        assert_eq!(uuid[0], 0xb4);
    }

    #[test]
    fn malformed_uuid_is_rejected() {
        assert_eq!(parse_uuid128("d0a37544"), None);
        assert_eq!(parse_uuid128("zza37544-a8d9-462c-950a-43f103748eb4"), None);
        assert_eq!(parse_uuid128("d0a37544-a8d9-462c-950a-43f103748eb4ff"), None);
        assert_eq!(parse_uuid128("d0a3754-4a8d9-462c-950a-43f103748eb4"), None);
        assert_eq!(
            parse_uuid128("D0A37544-A8D9-462C-950A-43F103748EB4"),
            Some(ROKI_SERVICE_UUID128)
        );
    }

    #[test]
    fn finds_roki_service_in_advertisement() {
        let uuid = ROKI_SERVICE_UUID128;
        assert!(contains_service_uuid128(&service_adv(&uuid), &uuid));
    }

    #[test]
    fn other_service_is_ignored() {
        let uuid = ROKI_SERVICE_UUID128;
        let mut other = uuid;
        other[0] ^= 0xFF;
        assert!(!contains_service_uuid128(&service_adv(&other), &uuid));
    }

    #[test]
    fn sixteen_bit_lists_do_not_match() {
        let uuid = ROKI_SERVICE_UUID128;
        let data = [0x03, 0x03, 0x12, 0x18];
        assert!(!contains_service_uuid128(&data, &uuid));
    }

    #[test]
    fn truncated_structure_stops_parsing() {
        assert_eq!(structures(&[0x05, 0x09, b'R']).count(), 0);
        assert_eq!(structures(&[0x00, 0x02, 0x01]).count(), 0);
        assert_eq!(structures(&[]).count(), 0);
    }

    #[test]
    fn name_is_extracted() {
        let data = [0x02, 0x01, 0x06, 0x05, AD_COMPLETE_NAME, b'R', b'o', b'k', b'i'];
        assert_eq!(device_name(&data).unwrap().as_str(), "Roki");
        assert_eq!(device_name(&[0x02, 0x01, 0x06]), None);
    }
}
