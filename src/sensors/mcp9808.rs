//! Microchip MCP9808 digital temperature sensor

use log::{debug, warn};

use crate::bus::Transport;
use crate::error::BusError;
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::swap_word;
use crate::sensors::{available, Sensor, State};

pub const DEFAULT_ADDRESS: u16 = 0x18;
pub const MANUFACTURER_ID: u16 = 0x0054;
pub const DEVICE_ID: u8 = 0x04;

const REG_AMBIENT: u8 = 0x05;
const REG_MANUFACTURER: u8 = 0x06;
const REG_DEVICE: u8 = 0x07;
const REG_RESOLUTION: u8 = 0x08;

/// Temperature from the ambient temperature register
///
/// Bits 0..12 hold the magnitude in 1/16 °C, bit 12 is the sign and the
/// alert flags in bits 13..16 are ignored.
pub fn temperature_from_word(word: u16) -> f64 {
    let mut temperature = f64::from(word & 0x0FFF) / 16.0;
    if word & 0x1000 != 0 {
        temperature -= 256.0;
    }
    temperature
}

/// Conversion resolution (register 0x08)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl Resolution {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Resolution::Half),
            1 => Some(Resolution::Quarter),
            2 => Some(Resolution::Eighth),
            3 => Some(Resolution::Sixteenth),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Resolution::Half => 0,
            Resolution::Quarter => 1,
            Resolution::Eighth => 2,
            Resolution::Sixteenth => 3,
        }
    }
}

pub struct Mcp9808<T: Transport> {
    transport: T,
    manufacturer_id: Option<u16>,
    device_id: Option<u8>,
    resolution: Option<Resolution>,
    state: State,
}

impl<T: Transport> Mcp9808<T> {
    /// Read the identity registers; the power-on resolution is left alone
    pub fn new(mut transport: T) -> Self {
        let manufacturer_id = match transport.read_word(REG_MANUFACTURER) {
            Ok(word) => Some(swap_word(word)),
            Err(e) => {
                warn!("MCP9808: failed to read manufacturer id: {}", e);
                None
            }
        };
        let device_id = match transport.read_word(REG_DEVICE) {
            Ok(word) => Some((swap_word(word) >> 8) as u8),
            Err(e) => {
                warn!("MCP9808: failed to read device id: {}", e);
                None
            }
        };

        let sensor = Self {
            transport,
            manufacturer_id,
            device_id,
            resolution: None,
            state: State::Ready,
        };
        if !sensor.is_genuine() {
            warn!(
                "MCP9808: unexpected identity {:?}/{:?}",
                manufacturer_id, device_id
            );
        }
        sensor
    }

    fn is_genuine(&self) -> bool {
        self.manufacturer_id == Some(MANUFACTURER_ID) && self.device_id == Some(DEVICE_ID)
    }

    pub fn manufacturer_id(&self) -> Option<u16> {
        self.manufacturer_id
    }

    pub fn device_id(&self) -> Option<u8> {
        self.device_id
    }

    /// Stage a resolution code (`0..=3`), written before the next reading
    pub fn set_resolution(&mut self, code: u8) -> bool {
        match Resolution::from_code(code) {
            Some(resolution) => {
                self.resolution = Some(resolution);
                self.state = State::Calibrated;
                true
            }
            None => {
                debug!("MCP9808: rejected resolution code {}", code);
                false
            }
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn flush(&mut self) -> Result<(), BusError> {
        if self.state == State::Ready {
            return Ok(());
        }
        if let Some(resolution) = self.resolution {
            self.transport
                .write_byte_reg(REG_RESOLUTION, resolution.code())?;
        }
        self.state = State::Ready;
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f64, BusError> {
        self.flush()?;
        let word = swap_word(self.transport.read_word(REG_AMBIENT)?);
        debug!("MCP9808: raw 0x{:04x}", word);
        Ok(temperature_from_word(word))
    }

    pub fn temperature(&mut self) -> Option<f64> {
        available("MCP9808", Quantity::Temperature, self.read_temperature())
    }
}

impl<T: Transport> Sensor for Mcp9808<T> {
    fn name(&self) -> &'static str {
        "MCP9808"
    }

    fn ok(&self) -> bool {
        self.is_genuine()
    }

    fn state(&self) -> State {
        self.state
    }

    fn measure(&mut self) -> Measurement {
        Measurement::new().with(Quantity::Temperature, self.temperature())
    }

    fn close(&mut self) {
        self.transport.close();
    }
}
