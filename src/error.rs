//! Error types shared by the bus layer and the sensor drivers

use i2cdev::linux::LinuxI2CError;
use thiserror::Error;

/// Failure of a single bus transaction
#[derive(Debug, Error)]
pub enum BusError {
    /// The kernel rejected or failed the transfer
    #[error("i2c transfer failed: {0}")]
    Io(#[from] LinuxI2CError),

    /// The device returned fewer bytes than requested
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// The transport was used after `close()`
    #[error("bus handle already closed")]
    Closed,

    /// The device did not acknowledge the transfer
    #[error("no acknowledgment for register 0x{0:02x}")]
    Nack(u8),
}

/// Driver-level errors
#[derive(Debug, Error)]
pub enum Error {
    /// Calibration constants could not be read, the sensor is unusable
    #[error("failed to load calibration: {0}")]
    Calibration(#[source] BusError),

    /// Opening or talking to the bus failed
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A frame carried a checksum that does not match its payload
    #[error("checksum mismatch: computed 0x{computed:04x}, received 0x{received:04x}")]
    Checksum { computed: u16, received: u16 },

    /// A response frame had an unexpected header
    #[error("malformed frame: {0}")]
    Frame(&'static str),
}
