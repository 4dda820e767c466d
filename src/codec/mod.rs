// Primitive binary field codecs shared by all vendor codeplug formats
pub mod ascii;
pub mod bcd;
pub mod checksum;
pub mod tone;

pub use ascii::{decode_ascii, decode_unicode, encode_ascii, encode_unicode};
pub use bcd::{
    bcd_to_int_be, bcd_to_int_le, decode_dmr_id, decode_frequency, encode_dmr_id,
    encode_frequency, int_to_bcd_be, int_to_bcd_le, BcdError,
};
pub use checksum::checksum8;
pub use tone::{dcs_from_octal, dcs_to_octal, SelectiveCall, ToneError, CTCSS_TONES, TONE_NONE};
