//! Bosch BMP280 barometric pressure sensor

use std::ops::{Deref, DerefMut};

use super::{Bmx280, Variant};
use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::Error;
use crate::models::Measurement;
use crate::sensors::{Sensor, State};

pub const CHIP_ID: u8 = 0x58;
pub const DEFAULT_ADDRESS: u16 = 0x77;

const VARIANT: Variant = Variant {
    name: "BMP280",
    chip_id: CHIP_ID,
    humidity: false,
};

/// Temperature, pressure and derived altitude
///
/// Configuration and raw setters are reached through [`Bmx280`] via `Deref`.
pub struct Bmp280<T: Transport, D: Delay = StdDelay> {
    core: Bmx280<T, D>,
}

impl<T: Transport> Bmp280<T> {
    pub fn new(transport: T) -> Result<Self, Error> {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Bmp280<T, D> {
    pub fn with_delay(transport: T, delay: D) -> Result<Self, Error> {
        Ok(Self {
            core: Bmx280::open(transport, delay, VARIANT)?,
        })
    }

    pub fn temperature(&mut self) -> Option<f64> {
        self.core.measure().temperature()
    }

    pub fn pressure(&mut self) -> Option<f64> {
        self.core.measure().pressure()
    }

    pub fn altitude(&mut self) -> Option<f64> {
        self.core.measure().altitude()
    }
}

impl<T: Transport, D: Delay> Deref for Bmp280<T, D> {
    type Target = Bmx280<T, D>;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl<T: Transport, D: Delay> DerefMut for Bmp280<T, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.core
    }
}

impl<T: Transport, D: Delay> Sensor for Bmp280<T, D> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::RegisterBus;
    use crate::delay::RecordingDelay;
    use crate::models::Quantity;
    use crate::sensors::bmx280::registers::{REG_CTRL_HUM, REG_PRESSURE, REG_TEMPERATURE};
    use crate::sensors::bmx280::tests::datasheet_bus;
    use float_cmp::approx_eq;

    fn sensor(bus: &RegisterBus) -> Bmp280<RegisterBus, RecordingDelay> {
        Bmp280::with_delay(bus.clone(), RecordingDelay::new()).unwrap()
    }

    #[test]
    fn datasheet_example_end_to_end() {
        let bus = datasheet_bus(CHIP_ID);
        let mut bmp = sensor(&bus);
        assert!(bmp.ok());

        let m = bmp.measure();
        assert_eq!(m.temperature(), Some(25.08));
        assert_eq!(m.pressure(), Some(100_653.25390625));
        let alt = m.altitude().unwrap();
        assert!(approx_eq!(f64, alt, 56.08, epsilon = 0.01), "got {}", alt);
        assert!(!m.provides(Quantity::Humidity));
    }

    #[test]
    fn humidity_control_is_never_written() {
        let bus = datasheet_bus(CHIP_ID);
        let _bmp = sensor(&bus);
        assert_eq!(bus.register(REG_CTRL_HUM), 0);
    }

    #[test]
    fn wrong_chip_id_is_not_fatal() {
        let bus = datasheet_bus(0x60);
        let mut bmp = sensor(&bus);
        assert!(!bmp.ok());
        assert_eq!(bmp.temperature(), Some(25.08));
    }

    #[test]
    fn pressure_failure_leaves_temperature() {
        let bus = datasheet_bus(CHIP_ID);
        let mut bmp = sensor(&bus);
        bus.fail_register(REG_PRESSURE);
        let m = bmp.measure();
        assert_eq!(m.temperature(), Some(25.08));
        assert!(m.provides(Quantity::Pressure));
        assert_eq!(m.pressure(), None);
        assert_eq!(m.altitude(), None);
    }

    #[test]
    fn temperature_failure_makes_pressure_unavailable() {
        let bus = datasheet_bus(CHIP_ID);
        let mut bmp = sensor(&bus);
        bus.fail_register(REG_TEMPERATURE);
        assert!(bmp.measure().is_unavailable());
    }

    #[test]
    fn raw_setters_reject_out_of_range_codes() {
        let bus = datasheet_bus(CHIP_ID);
        let mut bmp = sensor(&bus);
        assert!(bmp.set_pressure_oversampling(5));
        assert!(!bmp.set_pressure_oversampling(6));
        assert_eq!(bmp.config().pressure.code(), 5);
        assert!(!bmp.set_filter(9));
        assert!(!bmp.set_standby(8));
        assert!(!bmp.set_mode(7));
    }

    #[test]
    fn sea_level_reference_moves_altitude() {
        let bus = datasheet_bus(CHIP_ID);
        let mut bmp = sensor(&bus);
        bmp.set_sea_level_pressure(100_653.25390625);
        let alt = bmp.altitude().unwrap();
        assert!(approx_eq!(f64, alt, 0.0, epsilon = 1e-9));
    }
}
