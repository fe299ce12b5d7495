//! Factory trimming parameters of the BMP280/BME280

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use super::registers::{REG_CALIB_H1, REG_CALIB_H2, REG_CALIB_TP};
use crate::bus::Transport;
use crate::error::Error;
use crate::sensors::raw::reinterpret_i8;

/// Size of the temperature/pressure trimming block at 0x88
pub const TP_BLOCK_LEN: usize = 24;
/// Size of the humidity trimming block at 0xE1
pub const H_BLOCK_LEN: usize = 7;

/// Temperature and pressure compensation words (`dig_T1`..`dig_P9`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bmx280Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

impl Bmx280Calibration {
    /// Parse the 24-byte little-endian block starting at 0x88
    pub fn from_bytes(data: &[u8; TP_BLOCK_LEN]) -> Self {
        Self {
            t1: LittleEndian::read_u16(&data[0..2]),
            t2: LittleEndian::read_i16(&data[2..4]),
            t3: LittleEndian::read_i16(&data[4..6]),
            p1: LittleEndian::read_u16(&data[6..8]),
            p2: LittleEndian::read_i16(&data[8..10]),
            p3: LittleEndian::read_i16(&data[10..12]),
            p4: LittleEndian::read_i16(&data[12..14]),
            p5: LittleEndian::read_i16(&data[14..16]),
            p6: LittleEndian::read_i16(&data[16..18]),
            p7: LittleEndian::read_i16(&data[18..20]),
            p8: LittleEndian::read_i16(&data[20..22]),
            p9: LittleEndian::read_i16(&data[22..24]),
        }
    }

    pub fn load<T: Transport>(transport: &mut T) -> Result<Self, Error> {
        let data = transport
            .read_block_exact(REG_CALIB_TP, TP_BLOCK_LEN)
            .map_err(Error::Calibration)?;
        let mut block = [0u8; TP_BLOCK_LEN];
        block.copy_from_slice(&data);
        let calibration = Self::from_bytes(&block);
        debug!("BMx280 calibration: {:?}", calibration);
        Ok(calibration)
    }
}

/// BME280 humidity compensation values (`dig_H1`..`dig_H6`)
///
/// H4 and H5 are 12-bit signed values that share register 0xE5: H4 takes
/// its low nibble, H5 its high nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumidityCalibration {
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl HumidityCalibration {
    /// Build from `dig_H1` (0xA1) and the 7 bytes starting at 0xE1
    pub fn from_bytes(h1: u8, data: &[u8; H_BLOCK_LEN]) -> Self {
        let e4 = i16::from(reinterpret_i8(data[3]));
        let e5 = i16::from(data[4]);
        let e6 = i16::from(reinterpret_i8(data[5]));
        Self {
            h1,
            h2: LittleEndian::read_i16(&data[0..2]),
            h3: data[2],
            h4: (e4 << 4) | (e5 & 0x0F),
            h5: (e6 << 4) | (e5 >> 4),
            h6: reinterpret_i8(data[6]),
        }
    }

    pub fn load<T: Transport>(transport: &mut T) -> Result<Self, Error> {
        let h1 = transport
            .read_byte(REG_CALIB_H1)
            .map_err(Error::Calibration)?;
        let data = transport
            .read_block_exact(REG_CALIB_H2, H_BLOCK_LEN)
            .map_err(Error::Calibration)?;
        let mut block = [0u8; H_BLOCK_LEN];
        block.copy_from_slice(&data);
        let calibration = Self::from_bytes(h1, &block);
        debug!("BME280 humidity calibration: {:?}", calibration);
        Ok(calibration)
    }
}
