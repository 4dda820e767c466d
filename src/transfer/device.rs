// Device abstraction for codeplug transfers

use super::Result;

/// Identity record a radio reports when entering program mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdent {
    pub model: String,
    pub firmware: String,
}

/// A radio reachable for memory transfers.
///
/// Addresses are flat per bank; devices without banked memory accept
/// only bank 0. Implementations enforce their block-size constraints
/// and return human-readable errors, the orchestrator never retries.
pub trait Device: Send {
    /// Put the radio into program mode and report its identity.
    fn open(&mut self) -> Result<DeviceIdent>;

    /// Read `buffer.len()` bytes starting at `address`.
    fn read(&mut self, bank: u32, address: u32, buffer: &mut [u8]) -> Result<()>;

    /// Write `buffer` starting at `address`.
    fn write(&mut self, bank: u32, address: u32, buffer: &[u8]) -> Result<()>;

    /// Leave program mode and restart the radio.
    fn reboot(&mut self) -> Result<()>;

    /// Release the underlying connection.
    fn close(&mut self) -> Result<()>;
}
