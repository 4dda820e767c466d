// Vendor codeplug codecs and the model registry

pub mod d868uv;
pub mod rd5r;
pub mod traits;

pub use d868uv::D868uvCodeplug;
pub use rd5r::Rd5rCodeplug;
pub use traits::{Codeplug, CodeplugError, Result};

use std::collections::HashMap;

/// Static description of a supported radio model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioInfo {
    pub vendor: &'static str,
    pub model: &'static str,
    pub description: &'static str,
    /// Model string the radio reports in its identify record.
    pub ident: &'static str,
}

impl RadioInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.vendor, self.model)
    }
}

const RADIOS: &[RadioInfo] = &[
    RadioInfo {
        vendor: "AnyTone",
        model: "AT-D868UV",
        description: "Dual-band DMR handheld (VHF/UHF)",
        ident: "D868UVE",
    },
    RadioInfo {
        vendor: "Radioddity",
        model: "RD-5R",
        description: "Dual-band DMR handheld (VHF/UHF)",
        ident: "BF-5R",
    },
];

lazy_static::lazy_static! {
    /// Lookup key is the lowercased model name with separators removed,
    /// so `d868uv`, `AT-D868UV` and `at d868uv` all resolve.
    static ref MODEL_INDEX: HashMap<String, &'static RadioInfo> = {
        let mut map = HashMap::new();
        for info in RADIOS {
            map.insert(model_key(info.model), info);
            let bare = info.model.split_once('-').map(|(_, m)| m).unwrap_or(info.model);
            map.insert(model_key(bare), info);
        }
        map
    };
}

fn model_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// All supported radios, in registry order.
pub fn list_radios() -> &'static [RadioInfo] {
    RADIOS
}

/// Look up a radio by (a loose spelling of) its model name.
pub fn radio_info(model: &str) -> Option<&'static RadioInfo> {
    MODEL_INDEX.get(&model_key(model)).copied()
}

/// Match the model string from a radio's identify record.
pub fn radio_info_for_ident(ident: &str) -> Option<&'static RadioInfo> {
    RADIOS.iter().find(|info| ident.starts_with(info.ident))
}

/// Construct an empty codeplug for the given model name.
pub fn codeplug_for(model: &str) -> Option<Box<dyn Codeplug>> {
    let info = radio_info(model)?;
    match info.model {
        "AT-D868UV" => Some(Box::new(D868uvCodeplug::new())),
        "RD-5R" => Some(Box::new(Rd5rCodeplug::new())),
        _ => None,
    }
}

// Little-endian field helpers shared by the record accessors.

pub(crate) fn get_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn get_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

pub(crate) fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Round a region size up to the 64-byte read-block granularity.
pub(crate) fn align64(size: usize) -> usize {
    (size + 63) & !63
}

pub(crate) fn bit_is_set(bitmap: &[u8], index: usize) -> bool {
    bitmap[index / 8] & (1 << (index % 8)) != 0
}

pub(crate) fn set_bit(bitmap: &mut [u8], index: usize) {
    bitmap[index / 8] |= 1 << (index % 8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_helpers() {
        let mut buf = [0u8; 8];
        put_u16(&mut buf, 0, 0x1234);
        put_u32(&mut buf, 2, 0xDEADBEEF);
        assert_eq!(get_u16(&buf, 0), 0x1234);
        assert_eq!(get_u32(&buf, 2), 0xDEADBEEF);
        assert_eq!(&buf[..2], &[0x34, 0x12]);

        assert_eq!(align64(0), 0);
        assert_eq!(align64(1), 64);
        assert_eq!(align64(64), 64);
        assert_eq!(align64(100), 128);

        let mut bitmap = [0u8; 4];
        set_bit(&mut bitmap, 0);
        set_bit(&mut bitmap, 9);
        assert!(bit_is_set(&bitmap, 0));
        assert!(bit_is_set(&bitmap, 9));
        assert!(!bit_is_set(&bitmap, 8));
    }

    #[test]
    fn test_model_lookup_is_loose() {
        for spelling in ["AT-D868UV", "at-d868uv", "D868UV", "d868uv"] {
            let info = radio_info(spelling).unwrap();
            assert_eq!(info.model, "AT-D868UV");
        }
        assert_eq!(radio_info("rd5r").unwrap().vendor, "Radioddity");
        assert!(radio_info("ft-60").is_none());
    }

    #[test]
    fn test_ident_lookup() {
        assert_eq!(
            radio_info_for_ident("D868UVE").unwrap().model,
            "AT-D868UV"
        );
        assert_eq!(radio_info_for_ident("BF-5R").unwrap().model, "RD-5R");
        assert!(radio_info_for_ident("UV-5R").is_none());
    }

    #[test]
    fn test_codeplug_construction() {
        let cp = codeplug_for("d868uv").unwrap();
        assert_eq!(cp.model(), "AT-D868UV");
        let cp = codeplug_for("RD-5R").unwrap();
        assert_eq!(cp.model(), "RD-5R");
        assert!(codeplug_for("nope").is_none());
    }

    #[test]
    fn test_full_name() {
        assert_eq!(list_radios()[0].full_name(), "AnyTone AT-D868UV");
    }
}
