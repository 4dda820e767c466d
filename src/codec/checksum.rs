// Additive 8-bit checksum used by the interactive serial protocol

/// Sum of all bytes modulo 256.
pub fn checksum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum8() {
        assert_eq!(checksum8(&[]), 0);
        assert_eq!(checksum8(&[0x01, 0x02, 0x03]), 0x06);
        assert_eq!(checksum8(&[0xFF, 0x01]), 0x00); // wraps
        assert_eq!(checksum8(&[0x80, 0x80, 0x01]), 0x01);
    }
}
