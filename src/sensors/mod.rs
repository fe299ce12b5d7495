//! Drivers for the supported environmental sensors.
//!
//! Each chip module holds its register map, its calibration types (when the
//! chip has factory constants), the pure compensation functions and the
//! driver struct that ties them to a [`Transport`].

pub mod am2315;
pub mod bmp180;
pub mod bmx280;
pub mod hdc1008;
pub mod htu21d;
pub mod lm75;
pub mod mcp9808;
pub mod mpl115a2;
pub mod raw;
pub mod tsl2561;

pub use am2315::Am2315;
pub use bmp180::{Bmp085, Bmp180};
pub use bmx280::{Bme280, Bmp280};
pub use hdc1008::Hdc1008;
pub use htu21d::Htu21d;
pub use lm75::Lm75;
pub use mcp9808::Mcp9808;
pub use mpl115a2::Mpl115a2;
pub use tsl2561::Tsl2561;

use log::warn;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::bus::Transport;
use crate::delay::Delay;
use crate::error::Error;
use crate::models::{Measurement, Quantity};

/// Standard atmosphere pressure at sea level, in pascal
pub const SEA_LEVEL_PA: f64 = 101_325.0;

/// Altitude in meters for `pressure` (Pa) against the standard sea level
pub fn altitude(pressure: f64) -> f64 {
    altitude_at(pressure, SEA_LEVEL_PA)
}

/// International barometric formula against a custom sea-level pressure
///
/// Evaluated literally: a pressure of 0 gives 44330 m.
pub fn altitude_at(pressure: f64, sea_level: f64) -> f64 {
    44330.0 * (1.0 - (pressure / sea_level).powf(1.0 / 5.255))
}

/// Lifecycle of a driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    /// Identity registers have been read (whether or not they matched)
    Identified,
    /// Calibration loaded, acquisition settings not yet on the device
    Calibrated,
    /// Device configured and ready for measurements
    Ready,
}

/// Common surface of every driver
pub trait Sensor {
    /// Chip name, e.g. `"BME280"`
    fn name(&self) -> &'static str;

    /// Whether the chip identified itself as expected
    fn ok(&self) -> bool;

    fn state(&self) -> State;

    /// Read every quantity the chip provides
    ///
    /// Never fails as a whole: a quantity that could not be read is `None`.
    fn measure(&mut self) -> Measurement;

    /// Pressure reference used for altitude; ignored by chips without pressure
    fn set_sea_level_pressure(&mut self, _pressure: f64) {}

    /// Release the bus handle
    fn close(&mut self);
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn ok(&self) -> bool {
        (**self).ok()
    }

    fn state(&self) -> State {
        (**self).state()
    }

    fn measure(&mut self) -> Measurement {
        (**self).measure()
    }

    fn set_sea_level_pressure(&mut self, pressure: f64) {
        (**self).set_sea_level_pressure(pressure)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Closes the wrapped sensor on every exit path, including unwinding
pub struct Scoped<S: Sensor> {
    sensor: S,
}

impl<S: Sensor> Scoped<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }
}

impl<S: Sensor> Deref for Scoped<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.sensor
    }
}

impl<S: Sensor> DerefMut for Scoped<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

impl<S: Sensor> Drop for Scoped<S> {
    fn drop(&mut self) {
        self.sensor.close();
    }
}

/// Run `f` with `sensor` and close it afterwards
pub fn with_sensor<S, F, R>(sensor: S, f: F) -> R
where
    S: Sensor,
    F: FnOnce(&mut S) -> R,
{
    let mut guard = Scoped::new(sensor);
    f(&mut guard)
}

/// Turn a per-quantity read result into an optional value, logging failures
pub(crate) fn available<V, E: fmt::Display>(
    sensor: &str,
    quantity: Quantity,
    result: Result<V, E>,
) -> Option<V> {
    available_together(sensor, &[quantity], result)
}

/// Like [`available`] for a transfer that carries several quantities at once
pub(crate) fn available_together<V, E: fmt::Display>(
    sensor: &str,
    quantities: &[Quantity],
    result: Result<V, E>,
) -> Option<V> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {} unavailable: {}", sensor, quantity_list(quantities), e);
            None
        }
    }
}

fn quantity_list(quantities: &[Quantity]) -> String {
    quantities
        .iter()
        .map(|quantity| quantity.name())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Chip families that can be opened by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Am2315,
    Bme280,
    Bmp085,
    Bmp180,
    Bmp280,
    Hdc1008,
    Htu21d,
    Lm75,
    Mcp9808,
    Mpl115a2,
    Tsl2561,
}

impl SensorKind {
    /// Factory default 7-bit address
    pub fn default_address(self) -> u16 {
        match self {
            SensorKind::Am2315 => 0x5C,
            SensorKind::Bme280 | SensorKind::Bmp280 => 0x77,
            SensorKind::Bmp085 | SensorKind::Bmp180 => 0x77,
            SensorKind::Hdc1008 | SensorKind::Htu21d => 0x40,
            SensorKind::Lm75 => 0x48,
            SensorKind::Mcp9808 => 0x18,
            SensorKind::Mpl115a2 => 0x60,
            SensorKind::Tsl2561 => 0x39,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Am2315 => "am2315",
            SensorKind::Bme280 => "bme280",
            SensorKind::Bmp085 => "bmp085",
            SensorKind::Bmp180 => "bmp180",
            SensorKind::Bmp280 => "bmp280",
            SensorKind::Hdc1008 => "hdc1008",
            SensorKind::Htu21d => "htu21d",
            SensorKind::Lm75 => "lm75",
            SensorKind::Mcp9808 => "mcp9808",
            SensorKind::Mpl115a2 => "mpl115a2",
            SensorKind::Tsl2561 => "tsl2561",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "am2315" => Ok(SensorKind::Am2315),
            "bme280" => Ok(SensorKind::Bme280),
            "bmp085" => Ok(SensorKind::Bmp085),
            "bmp180" => Ok(SensorKind::Bmp180),
            "bmp280" => Ok(SensorKind::Bmp280),
            "hdc1008" => Ok(SensorKind::Hdc1008),
            "htu21d" => Ok(SensorKind::Htu21d),
            "lm75" => Ok(SensorKind::Lm75),
            "mcp9808" => Ok(SensorKind::Mcp9808),
            "mpl115a2" => Ok(SensorKind::Mpl115a2),
            "tsl2561" => Ok(SensorKind::Tsl2561),
            other => Err(format!("unknown sensor kind '{}'", other)),
        }
    }
}

/// Construct the driver for `kind` on an already opened transport
pub fn build<T, D>(kind: SensorKind, transport: T, delay: D) -> Result<Box<dyn Sensor + Send>, Error>
where
    T: Transport + Send + 'static,
    D: Delay + Send + 'static,
{
    let sensor: Box<dyn Sensor + Send> = match kind {
        SensorKind::Am2315 => Box::new(Am2315::with_delay(transport, delay)),
        SensorKind::Bme280 => Box::new(Bme280::with_delay(transport, delay)?),
        SensorKind::Bmp085 => Box::new(Bmp085::with_delay(transport, delay)?),
        SensorKind::Bmp180 => Box::new(Bmp180::with_delay(transport, delay)?),
        SensorKind::Bmp280 => Box::new(Bmp280::with_delay(transport, delay)?),
        SensorKind::Hdc1008 => Box::new(Hdc1008::with_delay(transport, delay)),
        SensorKind::Htu21d => Box::new(Htu21d::with_delay(transport, delay)),
        SensorKind::Lm75 => Box::new(Lm75::new(transport)),
        SensorKind::Mcp9808 => Box::new(Mcp9808::new(transport)),
        SensorKind::Mpl115a2 => Box::new(Mpl115a2::with_delay(transport, delay)?),
        SensorKind::Tsl2561 => Box::new(Tsl2561::with_delay(transport, delay)),
    };
    Ok(sensor)
}
