//! Bosch BMP280 (temperature, pressure) and BME280 (plus humidity).
//!
//! Both chips share the register map, the trimming layout and the
//! compensation formulas. [`Bmx280`] holds that common core; [`Bmp280`] and
//! [`Bme280`] wrap it with the chip id they expect and the quantities they
//! report.

pub mod bme280;
pub mod bmp280;
pub mod calibration;
pub mod compensation;
pub mod config;

pub use bme280::Bme280;
pub use bmp280::Bmp280;
pub use calibration::{Bmx280Calibration, HumidityCalibration};
pub use compensation::FineTemperature;
pub use config::{Bmx280Config, Filter, Mode, Oversampling, Standby};

use log::{debug, info, warn};

use crate::bus::Transport;
use crate::delay::Delay;
use crate::error::{BusError, Error};
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::{be_u16, bosch_20bit};
use crate::sensors::{altitude_at, available, State, SEA_LEVEL_PA};

pub mod registers {
    pub const REG_CALIB_TP: u8 = 0x88;
    pub const REG_CALIB_H1: u8 = 0xA1;
    pub const REG_ID: u8 = 0xD0;
    pub const REG_CALIB_H2: u8 = 0xE1;
    pub const REG_CTRL_HUM: u8 = 0xF2;
    pub const REG_CTRL_MEAS: u8 = 0xF4;
    pub const REG_CONFIG: u8 = 0xF5;
    pub const REG_PRESSURE: u8 = 0xF7;
    pub const REG_TEMPERATURE: u8 = 0xFA;
    pub const REG_HUMIDITY: u8 = 0xFD;
}

use registers::*;

/// Chip specific parameters of the shared core
#[derive(Debug, Clone, Copy)]
pub(crate) struct Variant {
    pub name: &'static str,
    pub chip_id: u8,
    pub humidity: bool,
}

/// Shared BMP280/BME280 driver core
pub struct Bmx280<T: Transport, D: Delay> {
    transport: T,
    delay: D,
    variant: Variant,
    chip_id: Option<u8>,
    calibration: Bmx280Calibration,
    humidity: Option<HumidityCalibration>,
    config: Bmx280Config,
    state: State,
    sea_level: f64,
}

impl<T: Transport, D: Delay> Bmx280<T, D> {
    /// Identify, load the trimming parameters and push the default config
    ///
    /// A calibration failure closes the transport and aborts construction.
    pub(crate) fn open(mut transport: T, delay: D, variant: Variant) -> Result<Self, Error> {
        let chip_id = match transport.read_byte(REG_ID) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("{}: failed to read chip id: {}", variant.name, e);
                None
            }
        };
        if let Some(id) = chip_id.filter(|id| *id != variant.chip_id) {
            warn!(
                "{}: unexpected chip id 0x{:02x}, expected 0x{:02x}",
                variant.name, id, variant.chip_id
            );
        }

        let calibration = match load_calibration(&mut transport, variant.humidity) {
            Ok(calibration) => calibration,
            Err(e) => {
                transport.close();
                return Err(e);
            }
        };

        let mut sensor = Self {
            transport,
            delay,
            variant,
            chip_id,
            calibration: calibration.0,
            humidity: calibration.1,
            config: Bmx280Config::default(),
            state: State::Calibrated,
            sea_level: SEA_LEVEL_PA,
        };
        if let Err(e) = sensor.push_config() {
            warn!("{}: initial configuration not applied: {}", variant.name, e);
        }
        info!("{} initialised (state {:?})", variant.name, sensor.state);
        Ok(sensor)
    }

    pub fn ok(&self) -> bool {
        self.chip_id == Some(self.variant.chip_id)
    }

    pub fn chip_id(&self) -> Option<u8> {
        self.chip_id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn calibration(&self) -> &Bmx280Calibration {
        &self.calibration
    }

    pub fn humidity_calibration(&self) -> Option<&HumidityCalibration> {
        self.humidity.as_ref()
    }

    pub fn config(&self) -> Bmx280Config {
        self.config
    }

    pub fn set_sea_level_pressure(&mut self, pressure: f64) {
        self.sea_level = pressure;
    }

    /// Replace the whole configuration and push it right away
    pub fn configure(&mut self, config: Bmx280Config) -> Result<(), BusError> {
        self.config = config;
        self.push_config()
    }

    /// Push staged settings to the device
    pub fn update(&mut self) -> Result<(), BusError> {
        self.push_config()
    }

    pub fn set_temperature_oversampling(&mut self, code: u8) -> bool {
        self.stage(code, "temperature oversampling", |cfg, code| {
            Oversampling::from_code(code).map(|o| cfg.temperature = o)
        })
    }

    pub fn set_pressure_oversampling(&mut self, code: u8) -> bool {
        self.stage(code, "pressure oversampling", |cfg, code| {
            Oversampling::from_code(code).map(|o| cfg.pressure = o)
        })
    }

    pub(crate) fn set_humidity_oversampling(&mut self, code: u8) -> bool {
        self.stage(code, "humidity oversampling", |cfg, code| {
            Oversampling::from_code(code).map(|o| cfg.humidity = o)
        })
    }

    pub fn set_mode(&mut self, code: u8) -> bool {
        self.stage(code, "power mode", |cfg, code| {
            Mode::from_code(code).map(|m| cfg.mode = m)
        })
    }

    pub fn set_standby(&mut self, code: u8) -> bool {
        self.stage(code, "standby time", |cfg, code| {
            Standby::from_code(code).map(|s| cfg.standby = s)
        })
    }

    pub fn set_filter(&mut self, code: u8) -> bool {
        self.stage(code, "filter", |cfg, code| {
            Filter::from_code(code).map(|f| cfg.filter = f)
        })
    }

    /// Apply a raw setting to the staged config; out-of-range codes are ignored
    fn stage<F>(&mut self, code: u8, what: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Bmx280Config, u8) -> Option<()>,
    {
        if apply(&mut self.config, code).is_none() {
            debug!("{}: rejected {} code {}", self.variant.name, what, code);
            return false;
        }
        if self.state == State::Ready {
            self.state = State::Calibrated;
        }
        true
    }

    fn push_config(&mut self) -> Result<(), BusError> {
        let result = self.write_config();
        match &result {
            Ok(()) => {
                debug!("{}: pushed {:?}", self.variant.name, self.config);
                self.state = State::Ready;
            }
            Err(_) => self.state = State::Calibrated,
        }
        result
    }

    fn write_config(&mut self) -> Result<(), BusError> {
        // ctrl_hum only takes effect after the following ctrl_meas write
        if self.variant.humidity {
            self.transport
                .write_byte_reg(REG_CTRL_HUM, self.config.ctrl_hum())?;
        }
        self.transport
            .write_byte_reg(REG_CTRL_MEAS, self.config.ctrl_meas())?;
        self.transport
            .write_byte_reg(REG_CONFIG, self.config.config())
    }

    /// Flush pending settings and, in forced mode, run one conversion
    fn prepare(&mut self) -> Result<(), BusError> {
        if self.state != State::Ready {
            self.push_config()?;
        }
        if self.config.mode == Mode::Forced {
            self.transport
                .write_byte_reg(REG_CTRL_MEAS, self.config.ctrl_meas())?;
            let wait = self.config.measurement_time_ms(self.variant.humidity);
            self.delay.delay_ms(wait);
        }
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<(f64, FineTemperature), BusError> {
        let data = self.transport.read_block_exact(REG_TEMPERATURE, 3)?;
        let adc_t = bosch_20bit(&data);
        let (centi, t_fine) = compensation::compensate_temperature(adc_t, &self.calibration);
        debug!("{}: adc_T={} t_fine={}", self.variant.name, adc_t, t_fine.0);
        Ok((f64::from(centi) / 100.0, t_fine))
    }

    /// `Ok(None)` when the trimming words overflow the compensation
    fn read_pressure(&mut self, t_fine: FineTemperature) -> Result<Option<f64>, BusError> {
        let data = self.transport.read_block_exact(REG_PRESSURE, 3)?;
        let adc_p = bosch_20bit(&data);
        debug!("{}: adc_P={}", self.variant.name, adc_p);
        let q24_8 = compensation::compensate_pressure(adc_p, t_fine, &self.calibration);
        if q24_8.is_none() {
            warn!(
                "{}: pressure compensation overflowed, calibration is not from this chip",
                self.variant.name
            );
        }
        Ok(q24_8.map(|p| f64::from(p) / 256.0))
    }

    fn read_humidity(
        &mut self,
        t_fine: FineTemperature,
        calibration: &HumidityCalibration,
    ) -> Result<Option<f64>, BusError> {
        let data = self.transport.read_block_exact(REG_HUMIDITY, 2)?;
        let adc_h = i32::from(be_u16(&data));
        debug!("{}: adc_H={}", self.variant.name, adc_h);
        let q22_10 = compensation::compensate_humidity(adc_h, t_fine, calibration);
        if q22_10.is_none() {
            warn!(
                "{}: humidity compensation overflowed, calibration is not from this chip",
                self.variant.name
            );
        }
        Ok(q22_10.map(|h| f64::from(h) / 1024.0))
    }

    /// One read cycle over every quantity of the chip
    pub fn measure(&mut self) -> Measurement {
        let name = self.variant.name;
        let mut measurement = Measurement::new()
            .with(Quantity::Temperature, None)
            .with(Quantity::Pressure, None)
            .with(Quantity::Altitude, None);
        if self.variant.humidity {
            measurement.set(Quantity::Humidity, None);
        }

        if let Err(e) = self.prepare() {
            warn!("{}: not ready, measurement unavailable: {}", name, e);
            return measurement;
        }

        let Some((temperature, t_fine)) =
            available(name, Quantity::Temperature, self.read_temperature())
        else {
            return measurement;
        };
        measurement.set(Quantity::Temperature, Some(temperature));

        let pressure =
            available(name, Quantity::Pressure, self.read_pressure(t_fine)).flatten();
        measurement.set(Quantity::Pressure, pressure);
        measurement.set(
            Quantity::Altitude,
            pressure.map(|p| altitude_at(p, self.sea_level)),
        );

        if let Some(calibration) = self.humidity {
            let humidity = self.read_humidity(t_fine, &calibration);
            measurement.set(
                Quantity::Humidity,
                available(name, Quantity::Humidity, humidity).flatten(),
            );
        }
        measurement
    }

    pub fn close(&mut self) {
        self.transport.close();
    }
}

fn load_calibration<T: Transport>(
    transport: &mut T,
    humidity: bool,
) -> Result<(Bmx280Calibration, Option<HumidityCalibration>), Error> {
    let tp = Bmx280Calibration::load(transport)?;
    let h = if humidity {
        Some(HumidityCalibration::load(transport)?)
    } else {
        None
    };
    Ok((tp, h))
}
