use finitelib::prelude::*;

use crate::error::Error;


/// 512-bit unsigned integer datatype. Curve values are below `2^256`, so
/// sums and products of reduced values always fit.
pub type U512 = bigi_of_bits!(512);

/// Ring for 512-bit unsigned integers that supports +, -, *, /.
pub type R512 = bigi_ring_for_bigi!(U512);

/// Result to manage crate errors.
pub type Result<T> = std::result::Result<T, Error>;


/// Number of hex digits in a `U512`.
const U512_HEX_LEN: usize = 128;

/// Longest decimal string that always fits into a `U512`
/// (`2^512` has 155 digits).
const U512_DECIMAL_MAX_LEN: usize = 154;


/// Build `U512` from a big-endian hex string of at most 128 digits.
pub fn u512_from_hex(hex: &str) -> U512 {
    U512::from_hex(&format!("{:0>width$}", hex, width = U512_HEX_LEN))
}


/// Build `U512` from big-endian bytes (e.g. a SHA-256 digest).
pub fn u512_from_be_bytes(bytes: &[u8]) -> U512 {
    u512_from_hex(&hex::encode_upper(bytes))
}


/// Parse a decimal string. `None` if the string is empty, has non-digit
/// characters or is too long to fit.
pub fn u512_from_decimal(decimal: &str) -> Option<U512> {
    let valid = !decimal.is_empty() &&
                decimal.len() <= U512_DECIMAL_MAX_LEN &&
                decimal.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Some(U512::from_decimal(decimal))
    } else {
        None
    }
}


/// Render `U512` as a decimal string without leading zeros.
pub fn u512_to_decimal(value: &U512) -> String {
    let decimal = value.to_decimal();
    let trimmed = decimal.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}


/// Check that `value` lies in `[1, modulo - 1]`.
pub fn in_scalar_range(value: &U512, modulo: &U512) -> bool {
    (*value != U512::from(0)) && ((value % modulo) == *value)
}
