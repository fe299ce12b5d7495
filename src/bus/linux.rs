//! Transport over the Linux i2c-dev character device

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use log::debug;
use std::path::Path;

use super::{expect_len, Transport};
use crate::error::BusError;

/// One slave address on one `/dev/i2c-N` bus
///
/// Dropping the transport closes the file descriptor; `close()` does the
/// same explicitly and turns every later call into [`BusError::Closed`].
pub struct LinuxTransport {
    device: Option<LinuxI2CDevice>,
    address: u16,
}

impl LinuxTransport {
    /// Open `path` (e.g. `/dev/i2c-1`) and select the 7-bit slave `address`
    pub fn open<P: AsRef<Path>>(path: P, address: u16) -> Result<Self, BusError> {
        let device = LinuxI2CDevice::new(path.as_ref(), address)?;
        debug!(
            "Opened {} for slave 0x{:02x}",
            path.as_ref().display(),
            address
        );
        Ok(Self {
            device: Some(device),
            address,
        })
    }

    fn device(&mut self) -> Result<&mut LinuxI2CDevice, BusError> {
        self.device.as_mut().ok_or(BusError::Closed)
    }
}

impl Transport for LinuxTransport {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        Ok(self.device()?.smbus_read_byte_data(register)?)
    }

    fn read_word(&mut self, register: u8) -> Result<u16, BusError> {
        Ok(self.device()?.smbus_read_word_data(register)?)
    }

    fn read_block(&mut self, register: u8, count: usize) -> Result<Vec<u8>, BusError> {
        // SMBus i2c-block transfers are capped at 32 bytes by the kernel
        let len = u8::try_from(count.min(32)).unwrap_or(32);
        let data = self.device()?.smbus_read_i2c_block_data(register, len)?;
        expect_len(data, count)
    }

    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, BusError> {
        let mut buf = vec![0u8; count];
        self.device()?.read(&mut buf)?;
        Ok(buf)
    }

    fn write_byte(&mut self, value: u8) -> Result<(), BusError> {
        Ok(self.device()?.write(&[value])?)
    }

    fn write_byte_reg(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        Ok(self.device()?.smbus_write_byte_data(register, value)?)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        Ok(self.device()?.write(bytes)?)
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            debug!("Closed i2c handle for slave 0x{:02x}", self.address);
        }
    }
}
