// DFU-style container files
//
// A container holds an ordered list of named images, each an ordered
// list of (address, data) elements. Layout, all integers little
// endian:
//
//   prefix:  "DfuSe", format version u8, total file size u32,
//            image count u8
//   image:   "Target", alternate setting u8, named flag u32,
//            name [255 bytes, zero filled], image size u32,
//            element count u32
//   element: address u32, size u32, data
//
// Codeplug metadata (radio model, firmware) lives in a JSON sidecar
// next to the container, `<file>.json`, so the binary payload stays
// bit-exact with what the radio sent.

use crate::codec::{decode_ascii, encode_ascii};
use crate::image::Image;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DfuError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed container: {0}")]
    Malformed(String),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DfuError>;

const FILE_PREFIX: &[u8] = b"DfuSe";
const IMAGE_PREFIX: &[u8] = b"Target";
const FORMAT_VERSION: u8 = 1;
const NAME_SIZE: usize = 255;

/// Sidecar record describing where a container's payload came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub radio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.offset + count;
        if end > self.data.len() {
            return Err(DfuError::Malformed(format!(
                "truncated at offset {}, needed {} more bytes",
                self.offset,
                end - self.data.len()
            )));
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn expect(&mut self, prefix: &[u8], what: &str) -> Result<()> {
        if self.take(prefix.len())? != prefix {
            return Err(DfuError::Malformed(format!("missing {} prefix", what)));
        }
        Ok(())
    }
}

fn parse_image(reader: &mut Reader) -> Result<Image> {
    reader.expect(IMAGE_PREFIX, "image")?;
    let _alternate = reader.u8()?;
    let named = reader.u32()?;
    let name_bytes = reader.take(NAME_SIZE)?;
    let name = if named != 0 {
        decode_ascii(name_bytes, 0x00)
    } else {
        String::new()
    };
    let _image_size = reader.u32()?;
    let num_elements = reader.u32()?;

    let mut image = Image::new(name);
    for _ in 0..num_elements {
        let address = reader.u32()?;
        let size = reader.u32()? as usize;
        let data = reader.take(size)?;
        image
            .add_element(address, size)
            .map_err(|e| DfuError::Malformed(e.to_string()))?;
        image
            .write(address, data)
            .map_err(|e| DfuError::Malformed(e.to_string()))?;
    }
    Ok(image)
}

fn parse(data: &[u8]) -> Result<Vec<Image>> {
    let mut reader = Reader::new(data);
    reader.expect(FILE_PREFIX, "container")?;
    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(DfuError::Malformed(format!(
            "unknown format version {}",
            version
        )));
    }
    let total_size = reader.u32()? as usize;
    if total_size != data.len() {
        return Err(DfuError::Malformed(format!(
            "file is {} bytes, header says {}",
            data.len(),
            total_size
        )));
    }
    let num_images = reader.u8()?;
    (0..num_images).map(|_| parse_image(&mut reader)).collect()
}

/// Read all images from a container file.
pub fn read_dfu(path: impl AsRef<Path>) -> Result<Vec<Image>> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    parse(&data)
}

fn image_payload(image: &Image) -> Vec<u8> {
    let mut out = Vec::new();
    for element in image.elements() {
        out.extend_from_slice(&element.address().to_le_bytes());
        out.extend_from_slice(&(element.len() as u32).to_le_bytes());
        out.extend_from_slice(element.data());
    }
    out
}

fn serialize(images: &[Image]) -> Vec<u8> {
    let mut body = Vec::new();
    for (alternate, image) in images.iter().enumerate() {
        let payload = image_payload(image);
        body.extend_from_slice(IMAGE_PREFIX);
        body.push(alternate as u8);
        let named = u32::from(!image.name().is_empty());
        body.extend_from_slice(&named.to_le_bytes());
        body.extend_from_slice(&encode_ascii(image.name(), NAME_SIZE, 0x00));
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(&(image.num_elements() as u32).to_le_bytes());
        body.extend_from_slice(&payload);
    }

    let total = FILE_PREFIX.len() + 1 + 4 + 1 + body.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(FILE_PREFIX);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.push(images.len() as u8);
    out.extend_from_slice(&body);
    out
}

/// Write images to a container file, replacing any existing file.
pub fn write_dfu(path: impl AsRef<Path>, images: &[Image]) -> Result<()> {
    File::create(path)?.write_all(&serialize(images))?;
    Ok(())
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Read the JSON sidecar next to a container, if present.
pub fn read_metadata(path: impl AsRef<Path>) -> Result<Option<Metadata>> {
    let sidecar = sidecar_path(path.as_ref());
    if !sidecar.exists() {
        return Ok(None);
    }
    let mut text = String::new();
    File::open(sidecar)?.read_to_string(&mut text)?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// Write the JSON sidecar next to a container.
pub fn write_metadata(path: impl AsRef<Path>, metadata: &Metadata) -> Result<()> {
    let text = serde_json::to_string_pretty(metadata)?;
    File::create(sidecar_path(path.as_ref()))?.write_all(text.as_bytes())?;
    Ok(())
}

/// Human-readable listing of a container's images and elements.
pub fn dump(images: &[Image]) -> String {
    let mut out = String::new();
    for image in images {
        let name = if image.name().is_empty() {
            "(unnamed)"
        } else {
            image.name()
        };
        let _ = writeln!(
            out,
            "image \"{}\": {} elements, {} bytes",
            name,
            image.num_elements(),
            image.total_size()
        );
        for element in image.elements() {
            let _ = writeln!(
                out,
                "  0x{:08x}  {:6} bytes",
                element.address(),
                element.len()
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_images() -> Vec<Image> {
        let mut codeplug = Image::new("codeplug");
        codeplug.add_element(0x0080_0000, 64).unwrap();
        codeplug.data_mut(0x0080_0000).unwrap()[0] = 0x42;
        codeplug.add_element(0x0264_0000, 32).unwrap();

        let mut callsigns = Image::new("callsign db");
        callsigns.add_element(0x0400_0000, 16).unwrap();
        vec![codeplug, callsigns]
    }

    #[test]
    fn test_container_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radio.dfu");

        let images = sample_images();
        write_dfu(&path, &images).unwrap();

        let back = read_dfu(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].name(), "codeplug");
        assert_eq!(back[1].name(), "callsign db");
        assert_eq!(back[0].data(0x0080_0000).unwrap()[0], 0x42);
        assert_eq!(back[0].num_elements(), 2);
    }

    #[test]
    fn test_bad_prefix_rejected() {
        assert!(matches!(
            parse(b"NotDfu"),
            Err(DfuError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let bytes = serialize(&sample_images());
        // Cutting the payload invalidates the size header first.
        let err = parse(&bytes[..bytes.len() - 8]).unwrap_err();
        assert!(matches!(err, DfuError::Malformed(_)));
    }

    #[test]
    fn test_size_header_checked() {
        let mut bytes = serialize(&sample_images());
        bytes[6] ^= 0xFF;
        let err = parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("header says"));
    }

    #[test]
    fn test_metadata_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radio.dfu");
        write_dfu(&path, &sample_images()).unwrap();
        assert!(read_metadata(&path).unwrap().is_none());

        let meta = Metadata {
            radio: "AT-D868UV".to_string(),
            firmware: Some("V1.26".to_string()),
        };
        write_metadata(&path, &meta).unwrap();
        assert_eq!(read_metadata(&path).unwrap(), Some(meta));
    }

    #[test]
    fn test_dump_lists_elements() {
        let text = dump(&sample_images());
        assert!(text.contains("codeplug"));
        assert!(text.contains("0x00800000"));
        assert!(text.contains("2 elements"));
    }
}
