//! Bosch BMP180 digital pressure sensor and its predecessor, the BMP085.

pub mod calibration;
pub mod compensation;

pub use calibration::Bmp180Calibration;

use log::{debug, info, warn};

use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::{BusError, Error};
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::{be_u16, be_u24};
use crate::sensors::{altitude_at, available, Sensor, State, SEA_LEVEL_PA};
use compensation::Temperature;

pub const CHIP_ID: u8 = 0x55;
pub const DEFAULT_ADDRESS: u16 = 0x77;

const REG_CALIBRATION: u8 = 0xAA;
const REG_ID: u8 = 0xD0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_OUT_MSB: u8 = 0xF6;

const CMD_TEMPERATURE: u8 = 0x2E;
const CMD_PRESSURE: u8 = 0x34;
const TEMPERATURE_WAIT_MS: u32 = 5;

/// Pressure oversampling setting (`oss`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversampling {
    #[default]
    UltraLowPower,
    Standard,
    HighResolution,
    UltraHighResolution,
}

impl Oversampling {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Oversampling::UltraLowPower),
            1 => Some(Oversampling::Standard),
            2 => Some(Oversampling::HighResolution),
            3 => Some(Oversampling::UltraHighResolution),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Oversampling::UltraLowPower => 0,
            Oversampling::Standard => 1,
            Oversampling::HighResolution => 2,
            Oversampling::UltraHighResolution => 3,
        }
    }

    /// Maximum conversion time rounded up to whole milliseconds
    pub fn conversion_ms(self) -> u32 {
        match self {
            Oversampling::UltraLowPower => 5,
            Oversampling::Standard => 8,
            Oversampling::HighResolution => 14,
            Oversampling::UltraHighResolution => 26,
        }
    }

    /// Control register value that starts a pressure conversion
    pub fn command(self) -> u8 {
        CMD_PRESSURE + (self.code() << 6)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bmp180Config {
    pub oversampling: Oversampling,
}

/// Temperature, pressure and altitude from a BMP180 or BMP085
///
/// The oversampling setting travels with every conversion command, so there
/// is nothing to push at construction and the driver is ready right after
/// the calibration is loaded.
pub struct Bmp180<T: Transport, D: Delay = StdDelay> {
    transport: T,
    delay: D,
    chip_id: Option<u8>,
    calibration: Bmp180Calibration,
    config: Bmp180Config,
    state: State,
    sea_level: f64,
}

/// Register compatible predecessor
pub type Bmp085<T, D = StdDelay> = Bmp180<T, D>;

impl<T: Transport> Bmp180<T> {
    pub fn new(transport: T) -> Result<Self, Error> {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Bmp180<T, D> {
    pub fn with_delay(mut transport: T, delay: D) -> Result<Self, Error> {
        let chip_id = match transport.read_byte(REG_ID) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("BMP180: failed to read chip id: {}", e);
                None
            }
        };
        if let Some(id) = chip_id.filter(|id| *id != CHIP_ID) {
            warn!("BMP180: unexpected chip id 0x{:02x}", id);
        }

        let calibration = match Bmp180Calibration::load(&mut transport) {
            Ok(calibration) => calibration,
            Err(e) => {
                transport.close();
                return Err(e);
            }
        };
        info!("BMP180 initialised");

        Ok(Self {
            transport,
            delay,
            chip_id,
            calibration,
            config: Bmp180Config::default(),
            state: State::Ready,
            sea_level: SEA_LEVEL_PA,
        })
    }

    pub fn chip_id(&self) -> Option<u8> {
        self.chip_id
    }

    pub fn calibration(&self) -> &Bmp180Calibration {
        &self.calibration
    }

    pub fn config(&self) -> Bmp180Config {
        self.config
    }

    pub fn configure(&mut self, config: Bmp180Config) {
        self.config = config;
    }

    /// Set the oversampling code (`0..=3`); other values are ignored
    pub fn set_oversampling(&mut self, code: u8) -> bool {
        match Oversampling::from_code(code) {
            Some(oss) => {
                self.config.oversampling = oss;
                true
            }
            None => {
                debug!("BMP180: rejected oversampling code {}", code);
                false
            }
        }
    }

    fn read_temperature(&mut self) -> Result<Option<Temperature>, BusError> {
        self.transport.write_byte_reg(REG_CTRL_MEAS, CMD_TEMPERATURE)?;
        self.delay.delay_ms(TEMPERATURE_WAIT_MS);
        let data = self.transport.read_block_exact(REG_OUT_MSB, 2)?;
        let ut = i64::from(be_u16(&data));
        debug!("BMP180: UT={}", ut);
        Ok(compensation::compensate_temperature(ut, &self.calibration))
    }

    fn read_pressure(&mut self, temperature: Temperature) -> Result<Option<i64>, BusError> {
        let oss = self.config.oversampling;
        self.transport.write_byte_reg(REG_CTRL_MEAS, oss.command())?;
        self.delay.delay_ms(oss.conversion_ms());
        let data = self.transport.read_block_exact(REG_OUT_MSB, 3)?;
        let up = i64::from(be_u24(&data) >> (8 - oss.code()));
        debug!("BMP180: UP={} oss={}", up, oss.code());
        Ok(compensation::compensate_pressure(
            up,
            oss.code(),
            temperature,
            &self.calibration,
        ))
    }

    pub fn measure(&mut self) -> Measurement {
        let mut measurement = Measurement::new()
            .with(Quantity::Temperature, None)
            .with(Quantity::Pressure, None)
            .with(Quantity::Altitude, None);

        let temperature = available("BMP180", Quantity::Temperature, self.read_temperature());
        let Some(temperature) = temperature.flatten() else {
            return measurement;
        };
        measurement.set(Quantity::Temperature, Some(temperature.celsius()));

        let pressure = available("BMP180", Quantity::Pressure, self.read_pressure(temperature))
            .flatten()
            .map(|p| p as f64);
        measurement.set(Quantity::Pressure, pressure);
        measurement.set(
            Quantity::Altitude,
            pressure.map(|p| altitude_at(p, self.sea_level)),
        );
        measurement
    }

    pub fn temperature(&mut self) -> Option<f64> {
        self.measure().temperature()
    }

    pub fn pressure(&mut self) -> Option<f64> {
        self.measure().pressure()
    }

    pub fn altitude(&mut self) -> Option<f64> {
        self.measure().altitude()
    }
}

impl<T: Transport, D: Delay> Sensor for Bmp180<T, D> {
    fn name(&self) -> &'static str {
        "BMP180"
    }

    fn ok(&self) -> bool {
        self.chip_id == Some(CHIP_ID)
    }

    fn state(&self) -> State {
        self.state
    }

    fn measure(&mut self) -> Measurement {
        Bmp180::measure(self)
    }

    fn set_sea_level_pressure(&mut self, pressure: f64) {
        self.sea_level = pressure;
    }

    fn close(&mut self) {
        self.transport.close();
    }
}
