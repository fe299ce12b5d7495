//! EEPROM calibration coefficients of the BMP180/BMP085

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use super::REG_CALIBRATION;
use crate::bus::Transport;
use crate::error::Error;

pub const BLOCK_LEN: usize = 22;

/// The eleven 16-bit coefficients stored MSB first from 0xAA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bmp180Calibration {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl Bmp180Calibration {
    pub fn from_bytes(data: &[u8; BLOCK_LEN]) -> Self {
        Self {
            ac1: BigEndian::read_i16(&data[0..2]),
            ac2: BigEndian::read_i16(&data[2..4]),
            ac3: BigEndian::read_i16(&data[4..6]),
            ac4: BigEndian::read_u16(&data[6..8]),
            ac5: BigEndian::read_u16(&data[8..10]),
            ac6: BigEndian::read_u16(&data[10..12]),
            b1: BigEndian::read_i16(&data[12..14]),
            b2: BigEndian::read_i16(&data[14..16]),
            mb: BigEndian::read_i16(&data[16..18]),
            mc: BigEndian::read_i16(&data[18..20]),
            md: BigEndian::read_i16(&data[20..22]),
        }
    }

    pub fn load<T: Transport>(transport: &mut T) -> Result<Self, Error> {
        let data = transport
            .read_block_exact(REG_CALIBRATION, BLOCK_LEN)
            .map_err(Error::Calibration)?;
        let mut block = [0u8; BLOCK_LEN];
        block.copy_from_slice(&data);
        let calibration = Self::from_bytes(&block);
        debug!("BMP180 calibration: {:?}", calibration);
        Ok(calibration)
    }
}
