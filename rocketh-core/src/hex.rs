//! Hex quantity helpers
//!
//! JSON-RPC encodes integers as `0x`-prefixed hex strings ("quantities").

/// Parses a `0x`-prefixed hex quantity into a `u64`
///
/// Returns `None` for malformed input or values that do not fit.
pub fn parse_quantity(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Formats a `u64` as a hex quantity
pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Concatenates two hex data strings, keeping a single `0x` prefix
pub fn concat_data(head: &str, tail: &str) -> String {
    let head = head.trim_start_matches("0x");
    let tail = tail.trim_start_matches("0x");
    format!("0x{}{}", head, tail)
}
