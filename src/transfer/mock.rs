// In-memory device for testing transfers without hardware

use super::device::{Device, DeviceIdent};
use super::{Result, TransferError};
use crate::image::Image;
use std::collections::HashMap;

/// A `Device` backed by a byte map. Unwritten memory reads as zero.
/// An error can be injected after a number of transfers to exercise
/// the orchestrator's failure path.
pub struct MockDevice {
    memory: HashMap<(u32, u32), u8>,
    ident: DeviceIdent,
    transfers: usize,
    fail_after: Option<usize>,
    pub opened: bool,
    pub rebooted: bool,
    pub closed: bool,
}

impl MockDevice {
    pub fn new(model: &str) -> Self {
        Self {
            memory: HashMap::new(),
            ident: DeviceIdent {
                model: model.to_string(),
                firmware: "V1.00".to_string(),
            },
            transfers: 0,
            fail_after: None,
            opened: false,
            rebooted: false,
            closed: false,
        }
    }

    /// Fail the Nth read or write with a timeout.
    pub fn fail_after(mut self, transfers: usize) -> Self {
        self.fail_after = Some(transfers);
        self
    }

    /// Seed the device memory from an encoded image, as if a previous
    /// upload had stored it.
    pub fn load_image(&mut self, image: &Image) {
        for element in image.elements() {
            for (i, &b) in element.data().iter().enumerate() {
                self.memory.insert((0, element.address() + i as u32), b);
            }
        }
    }

    pub fn byte_at(&self, bank: u32, address: u32) -> u8 {
        *self.memory.get(&(bank, address)).unwrap_or(&0)
    }

    fn tick(&mut self) -> Result<()> {
        self.transfers += 1;
        if let Some(limit) = self.fail_after {
            if self.transfers > limit {
                return Err(TransferError::Timeout);
            }
        }
        Ok(())
    }
}

impl Device for MockDevice {
    fn open(&mut self) -> Result<DeviceIdent> {
        self.opened = true;
        Ok(self.ident.clone())
    }

    fn read(&mut self, bank: u32, address: u32, buffer: &mut [u8]) -> Result<()> {
        self.tick()?;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = *self
                .memory
                .get(&(bank, address + i as u32))
                .unwrap_or(&0);
        }
        Ok(())
    }

    fn write(&mut self, bank: u32, address: u32, buffer: &[u8]) -> Result<()> {
        self.tick()?;
        for (i, &b) in buffer.iter().enumerate() {
            self.memory.insert((bank, address + i as u32), b);
        }
        Ok(())
    }

    fn reboot(&mut self) -> Result<()> {
        self.rebooted = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_memory() {
        let mut dev = MockDevice::new("RD-5R");
        dev.write(0, 0x100, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 5];
        dev.read(0, 0x100, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 0, 0]);
        assert_eq!(dev.byte_at(0, 0x101), 2);
        // Another bank is independent.
        assert_eq!(dev.byte_at(1, 0x100), 0);
    }

    #[test]
    fn test_injected_failure() {
        let mut dev = MockDevice::new("RD-5R").fail_after(1);
        dev.write(0, 0, &[0]).unwrap();
        assert!(matches!(
            dev.write(0, 0, &[0]),
            Err(TransferError::Timeout)
        ));
    }

    #[test]
    fn test_load_image() {
        let mut image = Image::new("test");
        image.add_element(0x40, 16).unwrap();
        image.data_mut(0x40).unwrap()[0] = 0xAB;

        let mut dev = MockDevice::new("RD-5R");
        dev.load_image(&image);
        assert_eq!(dev.byte_at(0, 0x40), 0xAB);
    }
}
