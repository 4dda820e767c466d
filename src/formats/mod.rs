// Container file formats

pub mod dfu;

pub use dfu::{read_dfu, read_metadata, write_dfu, write_metadata, DfuError, Metadata};
