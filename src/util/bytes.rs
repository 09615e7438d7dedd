//! Byte array to integer conversion.

/// Fold up to four bytes into an `i32`.
///
/// With `big_endian` the first byte is the most significant. With `signed`
/// the value is sign-extended from the width of `bytes`, so `[0xff]` is `-1`
/// signed and `255` unsigned. Inputs longer than four bytes keep only the
/// low 32 bits.
pub fn bytes_to_int(bytes: &[u8], big_endian: bool, signed: bool) -> i32 {
    let len = bytes.len();
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        let shift = if big_endian { (len - 1 - i) * 8 } else { i * 8 };
        if shift < 64 {
            value |= (*byte as u64) << shift;
        }
    }

    let bits = (len * 8).min(64) as u32;
    if signed && bits > 0 && bits < 64 && value >= 1u64 << (bits - 1) {
        (value as i64 - (1i64 << bits)) as i32
    } else {
        value as i32
    }
}

/// Big-endian signed read, the common case for wire integers.
pub fn to_int(bytes: &[u8]) -> i32 {
    bytes_to_int(bytes, true, true)
}

/// Big-endian unsigned read.
pub fn to_uint(bytes: &[u8]) -> i32 {
    bytes_to_int(bytes, true, false)
}
