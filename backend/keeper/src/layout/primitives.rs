//! Byte-level primitives shared by every fixed-layout record (component A).
//!
//! Mirrors `original_source/Layout.py`'s `construct.Adapter` subclasses:
//! `DecimalAdapter` (plain little-endian unsigned integer of configurable
//! width), `FloatAdapter` (the same integer reinterpreted as a fixed-point
//! fraction, split at half the bit width), `PublicKeyAdapter` (32 raw
//! bytes), and `DatetimeAdapter` (an 8-byte unix timestamp). Rust has no
//! adapter-combinator story as terse as `construct`, so each becomes a
//! plain function pair (`read_*` / `write_*`) operating on byte slices.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arrayref::array_ref;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::errors::{BotError, BotResult};

/// Reads an unsigned little-endian integer of `width` bytes (1..=16) and
/// returns it as a `Decimal` with no fractional part — the direct analogue
/// of `DecimalAdapter`.
pub fn read_uint(bytes: &[u8], width: usize) -> BotResult<Decimal> {
    require_len(bytes, width)?;
    let value = read_u128_le(bytes);
    Ok(u128_to_decimal(value))
}

pub fn write_uint(value: u64, width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width];
    out[..8.min(width)].copy_from_slice(&value.to_le_bytes()[..8.min(width)]);
    out
}

/// Reads a fixed-point value the same way `FloatAdapter` does: interpret
/// `width` bytes as an unsigned integer, then divide by `2^(width*8/2)`.
/// For the 16-byte `Index.borrow`/`Index.deposit` fields this divides by
/// `2^64`, matching Mango's original "half the bits are the fixed point"
/// convention.
pub fn read_fixed_point(bytes: &[u8], width: usize) -> BotResult<Decimal> {
    require_len(bytes, width)?;
    let raw = read_u128_le(bytes);
    let bit_size = width * 8;
    let fixed_point = bit_size / 2;
    // Decimal can't represent 2^64 directly via integer exponentiation
    // beyond i128 precision for width > 16, but every known record uses
    // width in {8, 16}, both of which fit in u128/i128 math below.
    let divisor = pow2_as_decimal(fixed_point as u32);
    Ok(u128_to_decimal(raw) / divisor)
}

pub fn write_fixed_point(value: Decimal, width: usize) -> Vec<u8> {
    let bit_size = width * 8;
    let fixed_point = bit_size / 2;
    let divisor = pow2_as_decimal(fixed_point as u32);
    let scaled = (value * divisor).round();
    let raw: u128 = scaled.try_into().unwrap_or(0);
    let mut out = vec![0u8; width];
    let raw_bytes = raw.to_le_bytes();
    out.copy_from_slice(&raw_bytes[..width]);
    out
}

fn pow2_as_decimal(bits: u32) -> Decimal {
    // 2^bits as a Decimal, built by repeated doubling so we never overflow
    // a primitive integer type for the 64-bit fixed points we use.
    let mut acc = Decimal::ONE;
    let two = Decimal::from(2u8);
    for _ in 0..bits {
        acc *= two;
    }
    acc
}

/// 32-byte public-key adapter.
pub fn read_pubkey(bytes: &[u8]) -> BotResult<Pubkey> {
    require_len(bytes, 32)?;
    Ok(Pubkey::new_from_array(*array_ref![bytes, 0, 32]))
}

pub fn write_pubkey(key: &Pubkey) -> [u8; 32] {
    key.to_bytes()
}

/// 8-byte unix-timestamp adapter.
pub fn read_timestamp(bytes: &[u8]) -> BotResult<SystemTime> {
    require_len(bytes, 8)?;
    let secs = u64::from_le_bytes(bytes[..8].try_into().unwrap());
    Ok(UNIX_EPOCH + Duration::from_secs(secs))
}

pub fn write_timestamp(ts: SystemTime) -> [u8; 8] {
    let secs = ts
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    secs.to_le_bytes()
}

/// Bit-packed flag words with byte-swapped bit order, matching
/// `construct.BitsSwapped(construct.BitStruct(...))`: within each byte the
/// *first* named flag occupies the most significant bit. `names` lists
/// flags in declaration order (only the leading `names.len()` bits of the
/// first byte(s) are meaningful; the rest is padding).
pub fn read_flags(byte: u8, names: &[&'static str]) -> Vec<(&'static str, bool)> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let bit = 7 - i as u32;
            (*name, (byte >> bit) & 1 == 1)
        })
        .collect()
}

pub fn write_flags(flags: &[bool]) -> u8 {
    let mut byte = 0u8;
    for (i, set) in flags.iter().enumerate() {
        if *set {
            byte |= 1 << (7 - i as u32);
        }
    }
    byte
}

/// `Decimal` has no infallible `From<u128>` (its mantissa is only 96 bits),
/// but every value we ever decode through this path — raw deposit/borrow
/// units, oracle medians — fits comfortably under `Decimal::MAX`, so we
/// convert via `i128` and fall back to `Decimal::MAX` only in the
/// unreachable-in-practice overflow case rather than panicking.
fn u128_to_decimal(value: u128) -> Decimal {
    i128::try_from(value)
        .ok()
        .map(|v| Decimal::from_i128_with_scale(v, 0))
        .unwrap_or(Decimal::MAX)
}

fn read_u128_le(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf[..bytes.len().min(16)].copy_from_slice(&bytes[..bytes.len().min(16)]);
    u128::from_le_bytes(buf)
}

pub fn require_len(bytes: &[u8], expected: usize) -> BotResult<()> {
    if bytes.len() < expected {
        return Err(BotError::MalformedAccountData {
            expected_len: expected,
            actual_len: bytes.len(),
        });
    }
    Ok(())
}

/// Rejects input whose length does not exactly match `expected` — the
/// length gate every top-level record parser applies before touching its
/// fields (spec.md §4.A, §8: "parse refuses input whose length != declared
/// size").
pub fn require_exact_len(bytes: &[u8], expected: usize) -> BotResult<()> {
    if bytes.len() != expected {
        return Err(BotError::MalformedAccountData {
            expected_len: expected,
            actual_len: bytes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_round_trips() {
        let bytes = write_uint(42, 8);
        let decoded = read_uint(&bytes, 8).unwrap();
        assert_eq!(decoded, Decimal::from(42));
    }

    #[test]
    fn fixed_point_round_trips() {
        let value = Decimal::new(15, 1); // 1.5
        let bytes = write_fixed_point(value, 16);
        let decoded = read_fixed_point(&bytes, 16).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn fixed_point_zero() {
        let bytes = write_fixed_point(Decimal::ZERO, 16);
        let decoded = read_fixed_point(&bytes, 16).unwrap();
        assert_eq!(decoded, Decimal::ZERO);
    }

    #[test]
    fn pubkey_round_trips() {
        let key = Pubkey::new_unique();
        let bytes = write_pubkey(&key);
        let decoded = read_pubkey(&bytes).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn length_gate_rejects_short_input() {
        let err = read_pubkey(&[0u8; 10]).unwrap_err();
        matches!(err, BotError::MalformedAccountData { .. });
    }

    #[test]
    fn flags_use_swapped_bit_order() {
        // 0b1000_0000 => first named flag set, rest clear.
        let flags = read_flags(0b1000_0000, &["initialized", "group", "margin_account"]);
        assert_eq!(flags[0], ("initialized", true));
        assert_eq!(flags[1], ("group", false));
        assert_eq!(flags[2], ("margin_account", false));
    }

    #[test]
    fn flags_round_trip() {
        let byte = write_flags(&[true, false, true]);
        let flags = read_flags(byte, &["a", "b", "c"]);
        assert_eq!(flags, vec![("a", true), ("b", false), ("c", true)]);
    }
}
