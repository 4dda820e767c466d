// Fixed-width string fields as stored in codeplug records
//
// Radios store names as fixed-size byte arrays padded with a fill byte
// (0x00 or 0xff depending on vendor). Decoding stops at the first fill
// byte; encoding truncates and pads, never writing an explicit
// terminator. Only the Latin-1 range survives the trip -- these are
// 8-bit device character sets, not UTF-8.

/// Decode a fixed-width byte field into a string, stopping at `fill`.
pub fn decode_ascii(data: &[u8], fill: u8) -> String {
    data.iter()
        .take_while(|&&b| b != fill)
        .map(|&b| b as char)
        .collect()
}

/// Encode a string into a fixed-width byte field padded with `fill`.
///
/// Characters beyond `size` are dropped; characters outside the Latin-1
/// range are replaced by `' '` since the device charset cannot hold them.
pub fn encode_ascii(text: &str, size: usize, fill: u8) -> Vec<u8> {
    let mut out = vec![fill; size];
    for (i, c) in text.chars().take(size).enumerate() {
        out[i] = if (c as u32) < 0x100 { c as u8 } else { b' ' };
    }
    out
}

/// Decode a fixed-width UCS-2 little-endian field, stopping at `fill`.
///
/// Some vendor layouts store names as 16-bit code units. `data` holds
/// `2 * n` bytes; a unit equal to `fill` terminates the string.
pub fn decode_unicode(data: &[u8], fill: u16) -> String {
    data.chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != fill)
        .map(|u| char::from_u32(u as u32).unwrap_or(' '))
        .collect()
}

/// Encode a string into `size` UCS-2 little-endian code units.
pub fn encode_unicode(text: &str, size: usize, fill: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(size * 2);
    let mut units: Vec<u16> = text
        .chars()
        .take(size)
        .map(|c| if (c as u32) <= 0xFFFF { c as u16 } else { b' ' as u16 })
        .collect();
    units.resize(size, fill);
    for u in units {
        out.extend_from_slice(&u.to_le_bytes());
    }
    out
}
