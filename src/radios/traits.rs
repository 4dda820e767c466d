// Vendor codeplug codec trait

use crate::config::Config;
use crate::image::{Image, ImageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodeplugError {
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("cannot encode {what} '{name}': {message}")]
    Encode {
        what: &'static str,
        name: String,
        message: String,
    },

    #[error("cannot decode {what} {index}: {message}")]
    Decode {
        what: &'static str,
        index: usize,
        message: String,
    },

    #[error("too many {what}: {count} (device limit {limit})")]
    Capacity {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    #[error("{model} does not support {what}")]
    Unsupported {
        model: &'static str,
        what: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, CodeplugError>;

/// A vendor codeplug: a sparse memory image plus the codec that maps it
/// to and from the generic `Config`.
///
/// Allocation is split into three steps so a transfer can interleave
/// device I/O with layout decisions: the bitmap elements are read
/// first, then `allocate_for_decoding` inspects them to allocate only
/// the record regions the radio actually populated. Uploads instead
/// call `allocate_updated` for the read-modify-write sections, then
/// `allocate_for_encoding` for everything `encode` fills.
pub trait Codeplug: Send {
    fn model(&self) -> &'static str;

    /// Allocate the bitmap and index elements the other allocators
    /// consult. Must run (and the elements be read) before
    /// `allocate_for_decoding`.
    fn allocate_bitmaps(&mut self) -> Result<()>;

    /// Allocate every record region the bitmaps mark as present.
    fn allocate_for_decoding(&mut self) -> Result<()>;

    /// Allocate the sections that must be read back before an upload
    /// so device-only settings survive a read-modify-write.
    fn allocate_updated(&mut self) -> Result<()>;

    /// Allocate every element `encode` writes for this configuration,
    /// and set the bitmaps accordingly.
    fn allocate_for_encoding(&mut self, config: &Config) -> Result<()>;

    /// Fill the allocated elements from the configuration.
    fn encode(&mut self, config: &Config) -> Result<()>;

    /// Reconstruct a configuration from the image. Runs its own parse
    /// and link passes; the image is not modified.
    fn decode(&self) -> Result<Config>;

    fn image(&self) -> &Image;
    fn image_mut(&mut self) -> &mut Image;

    /// Device block granularity for reads.
    fn read_block_size(&self) -> usize {
        64
    }

    /// Device block granularity for writes.
    fn write_block_size(&self) -> usize {
        16
    }
}
