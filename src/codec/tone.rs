// CTCSS/DCS sub-audible tone codecs
//
// Analog channels carry an optional squelch-opening tone: either one of
// the 50 standard CTCSS frequencies or a DCS code with normal/inverted
// polarity. The shared 16-bit table encoding is: 0xFFFF = no tone,
// CTCSS = frequency in tenths of a Hz (670..=2541), DCS = bit 15 set,
// bit 14 = inverted, low 9 bits = code.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ToneError {
    #[error("invalid DCS code: {0}")]
    InvalidDcs(u16),
}

/// The 50 standard CTCSS tones in tenths of a Hz.
pub const CTCSS_TONES: [u16; 50] = [
    670, 693, 719, 744, 770, 797, 825, 854, 885, 915, 948, 974, 1000, 1035, 1072, 1109, 1148,
    1188, 1230, 1273, 1318, 1365, 1413, 1462, 1514, 1567, 1598, 1622, 1655, 1679, 1713, 1738,
    1773, 1799, 1835, 1862, 1899, 1928, 1966, 1995, 2035, 2065, 2107, 2181, 2257, 2291, 2336,
    2418, 2503, 2541,
];

/// Table encoding of "no tone".
pub const TONE_NONE: u16 = 0xFFFF;

const DCS_FLAG: u16 = 0x8000;
const DCS_INVERTED: u16 = 0x4000;

/// A sub-audible selective-call setting on an analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectiveCall {
    /// Carrier squelch, no tone.
    #[default]
    None,
    /// CTCSS tone, frequency in tenths of a Hz (e.g. 670 = 67.0 Hz).
    Ctcss(u16),
    /// DCS code with polarity.
    Dcs { code: u16, inverted: bool },
}

impl SelectiveCall {
    /// Construct a CTCSS setting from a frequency in Hz.
    ///
    /// Frequencies not in the standard table yield `None` -- the silent
    /// fallback the binary formats require. Callers that want strict
    /// validation check `is_standard_ctcss` first.
    pub fn ctcss(freq_hz: f32) -> Self {
        let dhz = (freq_hz * 10.0).round() as u16;
        if CTCSS_TONES.contains(&dhz) {
            SelectiveCall::Ctcss(dhz)
        } else {
            SelectiveCall::None
        }
    }

    /// Construct a DCS setting.
    pub fn dcs(code: u16, inverted: bool) -> Self {
        SelectiveCall::Dcs { code, inverted }
    }

    /// CTCSS frequency in Hz, if this is a CTCSS setting.
    pub fn ctcss_hz(&self) -> Option<f32> {
        match self {
            SelectiveCall::Ctcss(dhz) => Some(*dhz as f32 / 10.0),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SelectiveCall::None)
    }

    /// Encode into the shared 16-bit tone-table value.
    pub fn encode(&self) -> u16 {
        match *self {
            SelectiveCall::None => TONE_NONE,
            SelectiveCall::Ctcss(dhz) => {
                if CTCSS_TONES.contains(&dhz) {
                    dhz
                } else {
                    TONE_NONE
                }
            }
            SelectiveCall::Dcs { code, inverted } => {
                DCS_FLAG | if inverted { DCS_INVERTED } else { 0 } | (code & 0x01FF)
            }
        }
    }

    /// Decode from the shared 16-bit tone-table value.
    ///
    /// Unknown CTCSS values decode to `None` rather than failing; the
    /// tables in real codeplugs contain garbage for unused slots.
    pub fn decode(value: u16) -> Self {
        if value == TONE_NONE {
            SelectiveCall::None
        } else if value & DCS_FLAG != 0 {
            SelectiveCall::Dcs {
                code: value & 0x01FF,
                inverted: value & DCS_INVERTED != 0,
            }
        } else if CTCSS_TONES.contains(&value) {
            SelectiveCall::Ctcss(value)
        } else {
            SelectiveCall::None
        }
    }
}

/// Is this frequency (in Hz) one of the 50 standard CTCSS tones?
pub fn is_standard_ctcss(freq_hz: f32) -> bool {
    CTCSS_TONES.contains(&((freq_hz * 10.0).round() as u16))
}

/// Render a DCS code as its conventional octal digit string read as a
/// decimal number: code 19 (0o023) -> 23. Several vendor layouts store
/// the code this way in BCD.
pub fn dcs_to_octal(code: u16) -> u16 {
    let mut out = 0u16;
    let mut mult = 1;
    let mut rest = code;
    while rest > 0 {
        out += (rest % 8) * mult;
        mult *= 10;
        rest /= 8;
    }
    out
}

/// Inverse of [`dcs_to_octal`]: 23 -> 19. Digits 8 and 9 are invalid.
pub fn dcs_from_octal(octal: u16) -> Result<u16, ToneError> {
    let mut out = 0u16;
    let mut mult = 1;
    let mut rest = octal;
    while rest > 0 {
        let digit = rest % 10;
        if digit > 7 {
            return Err(ToneError::InvalidDcs(octal));
        }
        out += digit * mult;
        mult *= 8;
        rest /= 10;
    }
    Ok(out)
}

impl fmt::Display for SelectiveCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectiveCall::None => write!(f, "-"),
            SelectiveCall::Ctcss(dhz) => write!(f, "{:.1}", *dhz as f32 / 10.0),
            SelectiveCall::Dcs { code, inverted } => {
                let pol = if *inverted { 'i' } else { 'n' };
                write!(f, "{}{:03}", pol, dcs_to_octal(*code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctcss_roundtrip() {
        let tone = SelectiveCall::ctcss(67.0);
        assert_eq!(tone, SelectiveCall::Ctcss(670));
        assert_eq!(tone.encode(), 670);
        assert_eq!(SelectiveCall::decode(670), tone);
        assert_eq!(SelectiveCall::decode(670).ctcss_hz(), Some(67.0));
    }

    #[test]
    fn test_ctcss_not_in_table() {
        // 999.9 Hz is no standard tone: encodes to the none sentinel.
        let tone = SelectiveCall::ctcss(999.9);
        assert_eq!(tone, SelectiveCall::None);
        assert_eq!(tone.encode(), TONE_NONE);
        assert!(!is_standard_ctcss(999.9));
        assert!(is_standard_ctcss(67.0));
    }

    #[test]
    fn test_all_table_entries_roundtrip() {
        for &dhz in CTCSS_TONES.iter() {
            let tone = SelectiveCall::Ctcss(dhz);
            assert_eq!(SelectiveCall::decode(tone.encode()), tone);
        }
    }

    #[test]
    fn test_dcs_roundtrip() {
        let dcs = SelectiveCall::dcs(19, false);
        let enc = dcs.encode();
        assert_eq!(enc & 0x8000, 0x8000);
        assert_eq!(SelectiveCall::decode(enc), dcs);

        let inv = SelectiveCall::dcs(19, true);
        assert_ne!(inv.encode(), enc);
        assert_eq!(SelectiveCall::decode(inv.encode()), inv);
    }

    #[test]
    fn test_none_roundtrip() {
        assert_eq!(SelectiveCall::None.encode(), TONE_NONE);
        assert_eq!(SelectiveCall::decode(TONE_NONE), SelectiveCall::None);
    }

    #[test]
    fn test_octal_conversion() {
        assert_eq!(dcs_to_octal(19), 23); // 0o023
        assert_eq!(dcs_from_octal(23).unwrap(), 19);
        assert_eq!(dcs_to_octal(0o754), 754);
        assert_eq!(dcs_from_octal(754).unwrap(), 0o754);
        assert!(dcs_from_octal(98).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SelectiveCall::ctcss(67.0).to_string(), "67.0");
        assert_eq!(SelectiveCall::dcs(19, true).to_string(), "i023");
        assert_eq!(SelectiveCall::None.to_string(), "-");
    }
}
