// Binary-Coded Decimal fields: packed integers, DMR IDs and frequencies
//
// Every DMR radio family stores at least some numeric fields as BCD,
// one decimal digit per nibble. DMR IDs travel as 4-byte big-endian
// BCD (8 digits); frequencies as 8 BCD nibbles in MHz with an implicit
// decimal point after the third nibble (10 Hz resolution).

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BcdError {
    #[error("invalid BCD digit {0:#03x}")]
    InvalidDigit(u8),

    #[error("value {0} does not fit into the BCD field")]
    ValueTooLarge(u64),
}

pub type Result<T> = std::result::Result<T, BcdError>;

fn unpack_byte(byte: u8) -> Result<(u8, u8)> {
    let hi = byte >> 4;
    let lo = byte & 0x0F;
    if hi > 9 {
        return Err(BcdError::InvalidDigit(hi));
    }
    if lo > 9 {
        return Err(BcdError::InvalidDigit(lo));
    }
    Ok((hi, lo))
}

/// Decode a big-endian BCD byte array: `[0x12, 0x34]` -> `1234`.
pub fn bcd_to_int_be(bcd: &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for &byte in bcd {
        let (hi, lo) = unpack_byte(byte)?;
        value = value * 100 + (hi * 10 + lo) as u64;
    }
    Ok(value)
}

/// Decode a little-endian BCD byte array: `[0x34, 0x12]` -> `1234`.
pub fn bcd_to_int_le(bcd: &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for &byte in bcd.iter().rev() {
        let (hi, lo) = unpack_byte(byte)?;
        value = value * 100 + (hi * 10 + lo) as u64;
    }
    Ok(value)
}

/// Encode an integer as big-endian BCD in `num_bytes` bytes.
pub fn int_to_bcd_be(value: u64, num_bytes: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; num_bytes];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        let pair = (rest % 100) as u8;
        rest /= 100;
        *slot = ((pair / 10) << 4) | (pair % 10);
    }
    if rest > 0 {
        return Err(BcdError::ValueTooLarge(value));
    }
    Ok(out)
}

/// Encode an integer as little-endian BCD in `num_bytes` bytes.
pub fn int_to_bcd_le(value: u64, num_bytes: usize) -> Result<Vec<u8>> {
    let mut out = int_to_bcd_be(value, num_bytes)?;
    out.reverse();
    Ok(out)
}

/// Encode a DMR ID (at most 8 decimal digits) as 4-byte big-endian BCD.
///
/// Out-of-range IDs clamp to 99999999, matching what the radios do with
/// oversized inputs rather than rejecting the whole codeplug.
pub fn encode_dmr_id(id: u32) -> [u8; 4] {
    let mut rest = id.min(99_999_999) as u64;
    let mut out = [0u8; 4];
    for slot in out.iter_mut().rev() {
        let pair = (rest % 100) as u8;
        rest /= 100;
        *slot = ((pair / 10) << 4) | (pair % 10);
    }
    out
}

/// Decode a 4-byte big-endian BCD DMR ID.
pub fn decode_dmr_id(bcd: &[u8; 4]) -> Result<u32> {
    Ok(bcd_to_int_be(bcd)? as u32)
}

/// Encode a frequency in Hz as 8 BCD nibbles (MHz, implicit decimal
/// point after the third nibble, 10 Hz resolution).
///
/// 145.67500 MHz = 145675000 Hz -> `0x14567500`. Frequencies at or above
/// 1 GHz do not fit and clamp to the maximum representable value.
pub fn encode_frequency(hz: u64) -> u32 {
    // Units of 10 Hz, rounded; 8 decimal digits max.
    let units = ((hz + 5) / 10).min(99_999_999);
    let mut bcd: u32 = 0;
    let mut rest = units;
    for shift in (0..8).map(|i| i * 4) {
        bcd |= ((rest % 10) as u32) << shift;
        rest /= 10;
    }
    bcd
}

/// Decode an 8-nibble BCD frequency to Hz.
pub fn decode_frequency(bcd: u32) -> Result<u64> {
    let mut value: u64 = 0;
    for shift in (0..8).rev().map(|i| i * 4) {
        let digit = ((bcd >> shift) & 0x0F) as u8;
        if digit > 9 {
            return Err(BcdError::InvalidDigit(digit));
        }
        value = value * 10 + digit as u64;
    }
    Ok(value * 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_int_be() {
        assert_eq!(bcd_to_int_be(&[0x12, 0x34, 0x56]).unwrap(), 123456);
        assert_eq!(int_to_bcd_be(123456, 3).unwrap(), vec![0x12, 0x34, 0x56]);
        assert_eq!(int_to_bcd_be(42, 3).unwrap(), vec![0x00, 0x00, 0x42]);
        assert!(int_to_bcd_be(1_000_000, 3).is_err());
        assert!(bcd_to_int_be(&[0xAB]).is_err());
    }

    #[test]
    fn test_bcd_int_le() {
        assert_eq!(bcd_to_int_le(&[0x56, 0x34, 0x12]).unwrap(), 123456);
        assert_eq!(int_to_bcd_le(123456, 3).unwrap(), vec![0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_dmr_id_roundtrip() {
        for id in [0u32, 1, 2623, 16_777_215, 99_999_999] {
            let bcd = encode_dmr_id(id);
            assert_eq!(decode_dmr_id(&bcd).unwrap(), id, "id {}", id);
        }
        assert_eq!(encode_dmr_id(16_777_215), [0x16, 0x77, 0x72, 0x15]);
    }

    #[test]
    fn test_dmr_id_clamps() {
        assert_eq!(encode_dmr_id(u32::MAX), [0x99, 0x99, 0x99, 0x99]);
    }

    #[test]
    fn test_frequency_encoding() {
        // 145.67500 MHz
        assert_eq!(encode_frequency(145_675_000), 0x14567500);
        assert_eq!(decode_frequency(0x14567500).unwrap(), 145_675_000);
        // 439.9875 MHz
        assert_eq!(encode_frequency(439_987_500), 0x43998750);
    }

    #[test]
    fn test_frequency_roundtrip() {
        for hz in [
            0u64,
            136_000_000,
            145_675_000,
            146_520_000,
            439_987_500,
            999_999_990,
        ] {
            assert_eq!(decode_frequency(encode_frequency(hz)).unwrap(), hz);
        }
    }

    #[test]
    fn test_frequency_float_rounding() {
        // Encoding from a rounded floating-point MHz value must land on
        // the same representation as the exact integer Hz.
        let mhz = 145.67500_f64;
        let hz = (mhz * 1e6).round() as u64;
        assert_eq!(encode_frequency(hz), 0x14567500);
    }

    #[test]
    fn test_frequency_invalid_nibble() {
        // The error names the offending nibble, not a byte group.
        assert_eq!(
            decode_frequency(0x14A67500),
            Err(BcdError::InvalidDigit(0x0A))
        );
        assert_eq!(bcd_to_int_be(&[0xAB]), Err(BcdError::InvalidDigit(0x0A)));
    }
}
