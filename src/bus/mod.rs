//! Register-level transport consumed by the sensor drivers.
//!
//! Drivers never touch `/dev/i2c-N` directly; they talk to a [`Transport`],
//! which is either the Linux character device ([`LinuxTransport`]) or the
//! in-memory register file used by the tests ([`mock::RegisterBus`]).

pub mod linux;
pub mod mock;

pub use linux::LinuxTransport;

use crate::error::BusError;

/// Byte/word/block access to one addressed device on an I2C/SMBus channel
///
/// Every call blocks for the duration of the bus transaction. Failures are
/// returned as [`BusError`] values; drivers decide whether a failure degrades
/// a single quantity or aborts construction.
pub trait Transport {
    /// SMBus "read byte data" from `register`
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError>;

    /// SMBus "read word data" from `register`
    ///
    /// The first byte on the wire ends up in the low half of the result.
    /// Chips that send their most significant byte first need to swap.
    fn read_word(&mut self, register: u8) -> Result<u16, BusError>;

    /// I2C block read of `count` consecutive registers starting at `register`
    ///
    /// Implementations may return fewer bytes than requested; drivers go
    /// through [`Transport::read_block_exact`].
    fn read_block(&mut self, register: u8, count: usize) -> Result<Vec<u8>, BusError>;

    /// Plain I2C read of `count` bytes without addressing a register
    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, BusError>;

    /// [`Transport::read_block`] that fails with [`BusError::ShortRead`]
    /// unless exactly `count` bytes arrived
    fn read_block_exact(&mut self, register: u8, count: usize) -> Result<Vec<u8>, BusError> {
        expect_len(self.read_block(register, count)?, count)
    }

    /// [`Transport::read_bytes`] with the same length check
    fn read_bytes_exact(&mut self, count: usize) -> Result<Vec<u8>, BusError> {
        expect_len(self.read_bytes(count)?, count)
    }

    /// Plain I2C write of a single byte (command or register pointer)
    fn write_byte(&mut self, value: u8) -> Result<(), BusError>;

    /// SMBus "write byte data" of `value` to `register`
    fn write_byte_reg(&mut self, register: u8, value: u8) -> Result<(), BusError>;

    /// Plain I2C write of a byte sequence
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    /// Release the underlying handle. Idempotent.
    fn close(&mut self);
}

/// Check that a read returned exactly `expected` bytes
pub(crate) fn expect_len(data: Vec<u8>, expected: usize) -> Result<Vec<u8>, BusError> {
    if data.len() != expected {
        return Err(BusError::ShortRead {
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}
