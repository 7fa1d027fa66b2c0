//! Unit conversion for published sizes
//!
//! Sizes are published in decimal units and rounded half away from zero.

pub const BYTES_PER_GIGABYTE: u64 = 1_000_000_000;
pub const BYTES_PER_KILOBYTE: u64 = 1_000;

fn round_div(value: u64, divisor: u64) -> u64 {
    value / divisor + u64::from(value % divisor >= divisor.div_ceil(2))
}

/// Bytes to GB
pub fn as_gigabytes(bytes: u64) -> u64 {
    round_div(bytes, BYTES_PER_GIGABYTE)
}

/// Bytes to kB
pub fn as_kilobytes(bytes: u64) -> u64 {
    round_div(bytes, BYTES_PER_KILOBYTE)
}
