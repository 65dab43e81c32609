//! Parser functions for CLI arguments.

use alloy_primitives::{Address, B256};
use std::{str::FromStr, time::Duration};

/// Parse a string slice into [B256].
pub fn parse_b256(s: &str) -> Result<B256, String> {
    B256::from_str(s).map_err(|_| format!("Invalid B256 value: {}", s))
}

/// Parse a string slice into an [Address].
pub fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|_| format!("Invalid address: {}", s))
}

/// Parse a string slice into a [Duration]. Accepts `ms`, `s`, `m` and `h` suffixes, plain
/// numbers are seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let (value, unit) = s.find(|c: char| !c.is_ascii_digit()).map_or((s, ""), |i| s.split_at(i));
    let value = value.parse::<u64>().map_err(|_| format!("Invalid duration: {}", s))?;
    let secs = |scale: u64| {
        value
            .checked_mul(scale)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("Duration out of range: {}", s))
    };
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => secs(1),
        "m" => secs(60),
        "h" => secs(3600),
        _ => Err(format!("Invalid duration unit: {}", s)),
    }
}
