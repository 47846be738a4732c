//! Encoded polyline codec, precision 1e-5.
//!
//! The routing provider ships route geometry in the classic encoded polyline
//! format: each coordinate is delta-encoded against the previous one, the
//! signed delta is zig-zag folded, and the magnitude is emitted
//! low-bits-first in 5-bit chunks offset by 63, with 0x20 marking "more
//! chunks follow". Decoding is the exact inverse, so
//! `encode(&decode(p)?) == p` for any validly encoded input.

use thiserror::Error;

use crate::geo::Coordinate;

const PRECISION: f64 = 1e5;

#[derive(Debug, Error, PartialEq)]
pub enum PolylineError {
    #[error("polyline input ends inside a value")]
    Truncated,
    #[error("byte {0:#04x} is not valid polyline data")]
    InvalidByte(u8),
    #[error("polyline value exceeds the representable range")]
    Overflow,
}

pub fn encode(path: &[Coordinate]) -> String {
    let mut out = String::with_capacity(path.len() * 4);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;
    for point in path {
        let lat = scale(point.lat);
        let lng = scale(point.lng);
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }
    out
}

pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let mut path = Vec::new();
    let mut bytes = encoded.bytes();
    let mut lat = 0i64;
    let mut lng = 0i64;
    while let Some(lat_delta) = decode_value(&mut bytes)? {
        let lng_delta = decode_value(&mut bytes)?.ok_or(PolylineError::Truncated)?;
        lat += lat_delta;
        lng += lng_delta;
        path.push(Coordinate {
            lat: lat as f64 / PRECISION,
            lng: lng as f64 / PRECISION,
        });
    }
    Ok(path)
}

fn scale(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}

fn encode_value(value: i64, out: &mut String) {
    // Zig-zag moves the sign bit to the low end so small magnitudes of
    // either sign stay short.
    let mut v = (value << 1) as u64;
    if value < 0 {
        v = !v;
    }
    while v >= 0x20 {
        out.push((((v & 0x1f) as u8 | 0x20) + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

/// Reads one varint value. `Ok(None)` means the input ended cleanly on a
/// value boundary.
fn decode_value(bytes: &mut std::str::Bytes<'_>) -> Result<Option<i64>, PolylineError> {
    let mut v: u64 = 0;
    let mut shift = 0u32;
    let mut first = true;
    loop {
        let Some(byte) = bytes.next() else {
            return if first {
                Ok(None)
            } else {
                Err(PolylineError::Truncated)
            };
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidByte(byte));
        }
        if shift >= 64 {
            return Err(PolylineError::Overflow);
        }
        let chunk = (byte - 63) as u64;
        v |= (chunk & 0x1f) << shift;
        shift += 5;
        first = false;
        if chunk & 0x20 == 0 {
            break;
        }
    }
    let value = if v & 1 == 1 {
        !(v >> 1) as i64
    } else {
        (v >> 1) as i64
    };
    Ok(Some(value))
}
