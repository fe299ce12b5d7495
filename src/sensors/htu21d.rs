//! HTU21D(F) relative humidity and temperature sensor

use crc::{Algorithm, Crc};
use log::{debug, info, warn};

use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::Error;
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::be_u16;
use crate::sensors::{available, Sensor, State};

pub const DEFAULT_ADDRESS: u16 = 0x40;

const CMD_TEMPERATURE: u8 = 0xF3; // no hold master
const CMD_HUMIDITY: u8 = 0xF5; // no hold master
const CMD_SOFT_RESET: u8 = 0xFE;

const RESET_MS: u32 = 15;
const TEMPERATURE_MS: u32 = 50;
const HUMIDITY_MS: u32 = 20;

/// x^8 + x^5 + x^4 + 1, no reflection
pub const CRC_8_HTU21D: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xA2,
    residue: 0x00,
};

const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_HTU21D);

/// Checksum the chip appends to a measurement word
pub fn checksum(msb: u8, lsb: u8) -> u8 {
    CRC.checksum(&[msb, lsb])
}

/// Validate a `msb lsb crc` frame and return the word with status bits cleared
pub fn decode_frame(frame: &[u8]) -> Result<u16, Error> {
    if frame.len() < 3 {
        return Err(Error::Frame("truncated measurement"));
    }
    let computed = checksum(frame[0], frame[1]);
    if computed != frame[2] {
        return Err(Error::Checksum {
            computed: u16::from(computed),
            received: u16::from(frame[2]),
        });
    }
    Ok(be_u16(frame) & 0xFFFC)
}

pub fn temperature_from_raw(raw: u16) -> f64 {
    -46.85 + 175.72 * f64::from(raw) / 65536.0
}

pub fn humidity_from_raw(raw: u16) -> f64 {
    -6.0 + 125.0 * f64::from(raw) / 65536.0
}

pub struct Htu21d<T: Transport, D: Delay = StdDelay> {
    transport: T,
    delay: D,
    reset_ok: bool,
}

impl<T: Transport> Htu21d<T> {
    pub fn new(transport: T) -> Self {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Htu21d<T, D> {
    /// Soft-reset the chip; a failed reset is reported through `ok()`
    pub fn with_delay(transport: T, delay: D) -> Self {
        let mut sensor = Self {
            transport,
            delay,
            reset_ok: false,
        };
        sensor.reset_ok = sensor.reset();
        info!("HTU21D initialised (reset ok: {})", sensor.reset_ok);
        sensor
    }

    pub fn reset(&mut self) -> bool {
        match self.transport.write_byte(CMD_SOFT_RESET) {
            Ok(()) => {
                self.delay.delay_ms(RESET_MS);
                true
            }
            Err(e) => {
                warn!("HTU21D: soft reset failed: {}", e);
                false
            }
        }
    }

    fn convert(&mut self, command: u8, wait_ms: u32) -> Result<u16, Error> {
        self.transport.write_byte(command)?;
        self.delay.delay_ms(wait_ms);
        let frame = self.transport.read_bytes_exact(3)?;
        let raw = decode_frame(&frame)?;
        debug!("HTU21D: command 0x{:02x} raw {}", command, raw);
        Ok(raw)
    }

    pub fn temperature(&mut self) -> Option<f64> {
        let raw = self.convert(CMD_TEMPERATURE, TEMPERATURE_MS);
        available("HTU21D", Quantity::Temperature, raw).map(temperature_from_raw)
    }

    pub fn humidity(&mut self) -> Option<f64> {
        let raw = self.convert(CMD_HUMIDITY, HUMIDITY_MS);
        available("HTU21D", Quantity::Humidity, raw).map(humidity_from_raw)
    }
}

impl<T: Transport, D: Delay> Sensor for Htu21d<T, D> {
    fn name(&self) -> &'static str {
        "HTU21D"
    }

    fn ok(&self) -> bool {
        self.reset_ok
    }

    fn state(&self) -> State {
        State::Ready
    }

    fn measure(&mut self) -> Measurement {
        let temperature = self.temperature();
        let humidity = self.humidity();
        Measurement::new()
            .with(Quantity::Temperature, temperature)
            .with(Quantity::Humidity, humidity)
    }

    fn close(&mut self) {
        self.transport.close();
    }
}
