//! Encoded polyline codec (precision 1e5).
//!
//! Each coordinate is stored as the signed delta from the previous one,
//! zig-zag folded and written as little-endian 5-bit groups offset by 63.
//! Bit 0x20 of a group marks that more groups follow.

use crate::error::PolylineError;
use crate::spatial::Coordinate;

const PRECISION: f64 = 1e5;
const CHAR_OFFSET: u8 = 63;
const CONTINUATION_BIT: i64 = 0x20;
const GROUP_MASK: i64 = 0x1f;
// Values are 32-bit on the wire. The seventh group starts at bit 30 and may
// only carry bits 30 and 31.
const MAX_SHIFT: u32 = 30;
const LAST_GROUP_MASK: i64 = 0x03;

/// Decode an encoded polyline into a route.
///
/// ```
/// use dispatch_core::polyline::decode_polyline;
///
/// let route = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(route.len(), 3);
/// ```
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coords = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(PolylineError::Truncated { offset: index });
        }
        lng += decode_value(bytes, &mut index)?;
        coords.push(Coordinate {
            lat: lat as f64 / PRECISION,
            lng: lng as f64 / PRECISION,
        });
    }

    Ok(coords)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated { offset: *index });
        };
        if byte < CHAR_OFFSET || byte > 127 {
            return Err(PolylineError::InvalidCharacter {
                offset: *index,
                byte,
            });
        }
        let group = i64::from(byte - CHAR_OFFSET);
        if shift > MAX_SHIFT || (shift == MAX_SHIFT && (group & GROUP_MASK) > LAST_GROUP_MASK) {
            return Err(PolylineError::Overflow { offset: start });
        }
        *index += 1;

        result |= (group & GROUP_MASK) << shift;
        shift += 5;

        if group < CONTINUATION_BIT {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encode a route as a polyline. Inverse of [`decode_polyline`] up to the
/// 1e-5 degree precision of the format.
pub fn encode_polyline(route: &[Coordinate]) -> String {
    let mut out = String::with_capacity(route.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in route {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        let group = (CONTINUATION_BIT | (value & GROUP_MASK)) as u8 + CHAR_OFFSET;
        out.push(group as char);
        value >>= 5;
    }
    out.push((value as u8 + CHAR_OFFSET) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn assert_close(actual: Coordinate, lat: f64, lng: f64) {
        assert!(
            (actual.lat - lat).abs() < 1e-9 && (actual.lng - lng).abs() < 1e-9,
            "expected ({lat}, {lng}), got {actual:?}"
        );
    }

    #[test]
    fn decodes_reference_vector() {
        let route = decode_polyline(REFERENCE).expect("decode");
        assert_eq!(route.len(), 3);
        assert_close(route[0], 38.5, -120.2);
        assert_close(route[1], 40.7, -120.95);
        assert_close(route[2], 43.252, -126.453);
    }

    #[test]
    fn empty_input_is_empty_route() {
        assert!(decode_polyline("").expect("decode").is_empty());
    }

    #[test]
    fn encodes_reference_vector() {
        let route = [
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
            Coordinate::new(43.252, -126.453),
        ];
        assert_eq!(encode_polyline(&route), REFERENCE);
    }

    #[test]
    fn missing_longitude_is_truncated() {
        // "_p~iF" is a complete latitude with nothing after it.
        assert_eq!(
            decode_polyline("_p~iF"),
            Err(PolylineError::Truncated { offset: 5 })
        );
    }

    #[test]
    fn dangling_continuation_is_truncated() {
        // '_' carries the continuation bit, so a value is still open.
        assert_eq!(
            decode_polyline("_p~iF~ps|U_"),
            Err(PolylineError::Truncated { offset: 11 })
        );
    }

    #[test]
    fn control_characters_are_rejected() {
        assert_eq!(
            decode_polyline("_p~iF ps|U"),
            Err(PolylineError::InvalidCharacter {
                offset: 5,
                byte: b' '
            })
        );
    }

    #[test]
    fn endless_continuation_overflows() {
        assert_eq!(
            decode_polyline("~~~~~~~~~~~~"),
            Err(PolylineError::Overflow { offset: 0 })
        );
    }

    #[test]
    fn seventh_group_above_bit_31_overflows() {
        assert_eq!(
            decode_polyline("~~~~~~^?"),
            Err(PolylineError::Overflow { offset: 0 })
        );
    }

    #[test]
    fn seventh_group_within_32_bits_decodes() {
        // Low two payload bits of the seventh group are still in range.
        let route = decode_polyline("~~~~~~B?").expect("decode");
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].lng, 0.0);
    }
}
