//! Version encoding for update/check comparisons
//!
//! Versions are encoded into an ordered integer with a byte-level packing
//! scheme kept bit-for-bit compatible with the historical descriptor format:
//! each dotted part's ASCII bytes are left-padded (or truncated) to 4 bytes
//! and reinterpreted as a big-endian i32.
//!
//! Compatibility quirk: the second dotted component ("1.X.2.3" -> X) does
//! not contribute to the encoded value. Changing that would reorder values
//! already persisted in plugin stores, so it stays as-is.

/// Encode a version string into a comparable integer.
///
/// A version without a `.` parses as a plain integer (parse failure -> 0).
pub fn ordered_value(version: &str) -> i64 {
    if !version.contains('.') {
        return version.trim().parse().unwrap_or(0);
    }

    let mut total: i64 = 0;
    for (index, part) in version.split('.').enumerate() {
        let value = pack_part(part) as i64;
        total += match index {
            0 => value,
            1 => 0, // skipped, see module docs
            2 => value * 10,
            3 => value * 100,
            _ => 0,
        };
    }

    total
}

/// `true` if `new` encodes strictly greater than `old`.
pub fn is_newer(old: &str, new: &str) -> bool {
    ordered_value(new) > ordered_value(old)
}

/// Pack one dotted part: ASCII bytes, left-padded with zeros or truncated
/// to exactly 4 bytes, reinterpreted big-endian.
fn pack_part(part: &str) -> i32 {
    let bytes = part.as_bytes();
    let mut buf = [0u8; 4];

    if bytes.len() >= 4 {
        buf.copy_from_slice(&bytes[..4]);
    } else {
        buf[4 - bytes.len()..].copy_from_slice(bytes);
    }

    i32::from_be_bytes(buf)
}
