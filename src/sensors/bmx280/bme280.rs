//! Bosch BME280 combined humidity, pressure and temperature sensor

use std::ops::{Deref, DerefMut};

use super::{Bmx280, Variant};
use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::Error;
use crate::models::Measurement;
use crate::sensors::{Sensor, State};

pub const CHIP_ID: u8 = 0x60;
pub const DEFAULT_ADDRESS: u16 = 0x77;

const VARIANT: Variant = Variant {
    name: "BME280",
    chip_id: CHIP_ID,
    humidity: true,
};

pub struct Bme280<T: Transport, D: Delay = StdDelay> {
    core: Bmx280<T, D>,
}

impl<T: Transport> Bme280<T> {
    pub fn new(transport: T) -> Result<Self, Error> {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Bme280<T, D> {
    pub fn with_delay(transport: T, delay: D) -> Result<Self, Error> {
        Ok(Self {
            core: Bmx280::open(transport, delay, VARIANT)?,
        })
    }

    /// Stage the humidity oversampling code (`0..=5`)
    pub fn set_humidity_oversampling(&mut self, code: u8) -> bool {
        self.core.set_humidity_oversampling(code)
    }

    pub fn temperature(&mut self) -> Option<f64> {
        self.core.measure().temperature()
    }

    pub fn pressure(&mut self) -> Option<f64> {
        self.core.measure().pressure()
    }

    pub fn humidity(&mut self) -> Option<f64> {
        self.core.measure().humidity()
    }

    pub fn altitude(&mut self) -> Option<f64> {
        self.core.measure().altitude()
    }
}

impl<T: Transport, D: Delay> Deref for Bme280<T, D> {
    type Target = Bmx280<T, D>;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl<T: Transport, D: Delay> DerefMut for Bme280<T, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.core
    }
}

impl<T: Transport, D: Delay> Sensor for Bme280<T, D> {
    fn name(&self) -> &'static str {
        VARIANT.name
    }

    fn ok(&self) -> bool {
        self.core.ok()
    }

    fn state(&self) -> State {
        self.core.state()
    }

    fn measure(&mut self) -> Measurement {
        self.core.measure()
    }

    fn set_sea_level_pressure(&mut self, pressure: f64) {
        self.core.set_sea_level_pressure(pressure);
    }

    fn close(&mut self) {
        self.core.close();
    }
}
