// Device transfer layer
//
// Three pieces: the `Device` trait hiding how bytes reach a radio, the
// AnyTone-style serial wire protocol implementing it, and the
// orchestrator that drives a whole codeplug download or upload through
// the allocation/read/encode/write phases.

pub mod device;
pub mod mock;
pub mod orchestrator;
pub mod protocol;

pub use device::{Device, DeviceIdent};
pub use mock::MockDevice;
pub use orchestrator::{
    download_in_background, upload_in_background, Event, Orchestrator, State,
};
pub use protocol::{open_serial, AnytoneInterface};

use crate::image::ImageError;
use crate::radios::CodeplugError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("serial port error: {0}")]
    Port(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timeout waiting for radio")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connected radio is a {found}, expected {expected}")]
    WrongRadio { expected: String, found: String },

    #[error("device has no memory bank {0}")]
    UnsupportedBank(u32),

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("codeplug error: {0}")]
    Codeplug(#[from] CodeplugError),
}

pub type Result<T> = std::result::Result<T, TransferError>;
