// AnyTone-style serial wire protocol
//
// All framing is bit-exact. Entering program mode:
//
//   -> "PROGRAM"            <- 51 58 06                 ("QX\x06")
//   -> 02                   <- 'I' model[8] fw[6] 06
//
// Reads move 64 bytes, writes 16, both framed the same way:
//
//   -> 'R' addr[4 LE] 40    <- 'R' addr[4 LE] 40 data[64] sum 06
//   -> 'W' addr[4 LE] 10 data[16] sum 06
//                           <- 06
//
// The checksum is the additive 8-bit sum over the data bytes only.
// Any mismatch or unexpected byte aborts the transfer; "END" leaves
// program mode.

use super::device::{Device, DeviceIdent};
use super::{Result, TransferError};
use crate::codec::{checksum8, decode_ascii};
use std::io::{Read, Write};
use std::time::Duration;

const READ_BLOCK: usize = 64;
const WRITE_BLOCK: usize = 16;
const ACK: u8 = 0x06;
const ENTER_PROGRAM: &[u8] = b"PROGRAM";
const PROGRAM_ACK: [u8; 3] = [0x51, 0x58, 0x06];
const LEAVE_PROGRAM: &[u8] = b"END";
const IDENTIFY: [u8; 1] = [0x02];

pub(crate) fn read_request(address: u32) -> [u8; 6] {
    let a = address.to_le_bytes();
    [b'R', a[0], a[1], a[2], a[3], READ_BLOCK as u8]
}

pub(crate) fn write_frame(address: u32, data: &[u8; WRITE_BLOCK]) -> [u8; 24] {
    let mut frame = [0u8; 24];
    frame[0] = b'W';
    frame[1..5].copy_from_slice(&address.to_le_bytes());
    frame[5] = WRITE_BLOCK as u8;
    frame[6..22].copy_from_slice(data);
    frame[22] = checksum8(&frame[6..22]);
    frame[23] = ACK;
    frame
}

pub(crate) fn parse_read_response(frame: &[u8; 72], address: u32) -> Result<[u8; READ_BLOCK]> {
    if frame[0] != b'R' {
        return Err(TransferError::Protocol(format!(
            "unexpected response type {:#04x}",
            frame[0]
        )));
    }
    let echoed = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
    if echoed != address || frame[5] as usize != READ_BLOCK {
        return Err(TransferError::Protocol(format!(
            "response for {:#010x} (size {}), requested {:#010x}",
            echoed, frame[5], address
        )));
    }
    let sum = checksum8(&frame[6..70]);
    if sum != frame[70] {
        return Err(TransferError::Protocol(format!(
            "checksum mismatch at {:#010x}: got {:#04x}, expected {:#04x}",
            address, frame[70], sum
        )));
    }
    if frame[71] != ACK {
        return Err(TransferError::Protocol(format!(
            "missing frame terminator at {:#010x}",
            address
        )));
    }
    let mut data = [0u8; READ_BLOCK];
    data.copy_from_slice(&frame[6..70]);
    Ok(data)
}

fn parse_ident(frame: &[u8; 16]) -> Result<DeviceIdent> {
    if frame[0] != b'I' || frame[15] != ACK {
        return Err(TransferError::Protocol(
            "malformed identity record".to_string(),
        ));
    }
    Ok(DeviceIdent {
        model: decode_ascii(&frame[1..9], 0x00).trim_end().to_string(),
        firmware: decode_ascii(&frame[9..15], 0x00).trim_end().to_string(),
    })
}

/// Serial interface speaking the protocol above over any byte stream.
pub struct AnytoneInterface<T: Read + Write + Send> {
    port: T,
    in_program_mode: bool,
}

/// Open a serial port for an AnyTone-style radio. One second is the
/// only bounded wait the protocol has; there is no retry.
pub fn open_serial(path: &str) -> Result<AnytoneInterface<Box<dyn serialport::SerialPort>>> {
    let port = serialport::new(path, 115_200)
        .timeout(Duration::from_secs(1))
        .open()
        .map_err(|e| TransferError::Port(e.to_string()))?;
    Ok(AnytoneInterface::new(port))
}

impl<T: Read + Write + Send> AnytoneInterface<T> {
    pub fn new(port: T) -> Self {
        Self {
            port,
            in_program_mode: false,
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data).map_err(map_io)?;
        self.port.flush().map_err(map_io)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.port.read_exact(buffer).map_err(map_io)
    }

    fn leave_program_mode(&mut self) -> Result<()> {
        if self.in_program_mode {
            self.in_program_mode = false;
            self.send(LEAVE_PROGRAM)?;
        }
        Ok(())
    }
}

fn map_io(e: std::io::Error) -> TransferError {
    if e.kind() == std::io::ErrorKind::TimedOut {
        TransferError::Timeout
    } else {
        TransferError::Io(e)
    }
}

impl<T: Read + Write + Send> Device for AnytoneInterface<T> {
    fn open(&mut self) -> Result<DeviceIdent> {
        self.send(ENTER_PROGRAM)?;
        let mut ack = [0u8; 3];
        self.receive(&mut ack)?;
        if ack != PROGRAM_ACK {
            return Err(TransferError::Protocol(format!(
                "radio refused program mode: {:02x?}",
                ack
            )));
        }
        self.in_program_mode = true;

        self.send(&IDENTIFY)?;
        let mut frame = [0u8; 16];
        self.receive(&mut frame)?;
        parse_ident(&frame)
    }

    fn read(&mut self, bank: u32, address: u32, buffer: &mut [u8]) -> Result<()> {
        if bank != 0 {
            return Err(TransferError::UnsupportedBank(bank));
        }
        if address as usize % READ_BLOCK != 0 || buffer.len() % READ_BLOCK != 0 {
            return Err(TransferError::Protocol(format!(
                "read of {} bytes at {:#010x} is not {}-byte aligned",
                buffer.len(),
                address,
                READ_BLOCK
            )));
        }
        for (i, chunk) in buffer.chunks_exact_mut(READ_BLOCK).enumerate() {
            let addr = address + (i * READ_BLOCK) as u32;
            self.send(&read_request(addr))?;
            let mut frame = [0u8; 72];
            self.receive(&mut frame)?;
            chunk.copy_from_slice(&parse_read_response(&frame, addr)?);
        }
        Ok(())
    }

    fn write(&mut self, bank: u32, address: u32, buffer: &[u8]) -> Result<()> {
        if bank != 0 {
            return Err(TransferError::UnsupportedBank(bank));
        }
        if address as usize % WRITE_BLOCK != 0 || buffer.len() % WRITE_BLOCK != 0 {
            return Err(TransferError::Protocol(format!(
                "write of {} bytes at {:#010x} is not {}-byte aligned",
                buffer.len(),
                address,
                WRITE_BLOCK
            )));
        }
        for (i, chunk) in buffer.chunks_exact(WRITE_BLOCK).enumerate() {
            let addr = address + (i * WRITE_BLOCK) as u32;
            let mut data = [0u8; WRITE_BLOCK];
            data.copy_from_slice(chunk);
            self.send(&write_frame(addr, &data))?;
            let mut ack = [0u8; 1];
            self.receive(&mut ack)?;
            if ack[0] != ACK {
                return Err(TransferError::Protocol(format!(
                    "radio rejected write at {:#010x}: {:#04x}",
                    addr, ack[0]
                )));
            }
        }
        Ok(())
    }

    fn reboot(&mut self) -> Result<()> {
        // Leaving program mode restarts the radio.
        self.leave_program_mode()
    }

    fn close(&mut self) -> Result<()> {
        self.leave_program_mode()
    }
}
