//! LM75 digital temperature sensor

use log::debug;

use crate::bus::Transport;
use crate::error::BusError;
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::{reinterpret_i16, swap_word};
use crate::sensors::{available, Sensor, State};

pub const DEFAULT_ADDRESS: u16 = 0x48;

const REG_TEMPERATURE: u8 = 0x00;

/// Temperature from the 9-bit two's complement value in the top bits of
/// the big-endian temperature register, 0.5 °C per LSB
pub fn temperature_from_word(word: u16) -> f64 {
    f64::from(reinterpret_i16(word) >> 7) * 0.5
}

/// The LM75 has no identity register; it is always reported as ok
pub struct Lm75<T: Transport> {
    transport: T,
}

impl<T: Transport> Lm75<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn read_temperature(&mut self) -> Result<f64, BusError> {
        let word = swap_word(self.transport.read_word(REG_TEMPERATURE)?);
        debug!("LM75: raw 0x{:04x}", word);
        Ok(temperature_from_word(word))
    }

    pub fn temperature(&mut self) -> Option<f64> {
        available("LM75", Quantity::Temperature, self.read_temperature())
    }
}

impl<T: Transport> Sensor for Lm75<T> {
    fn name(&self) -> &'static str {
        "LM75"
    }

    fn ok(&self) -> bool {
        true
    }

    fn state(&self) -> State {
        State::Ready
    }

    fn measure(&mut self) -> Measurement {
        Measurement::new().with(Quantity::Temperature, self.temperature())
    }

    fn close(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::RegisterBus;

    #[test]
    fn nine_bit_conversion() {
        assert_eq!(temperature_from_word(0x1900), 25.0);
        assert_eq!(temperature_from_word(0x1980), 25.5);
        assert_eq!(temperature_from_word(0x0080), 0.5);
        assert_eq!(temperature_from_word(0xFF80), -0.5);
        assert_eq!(temperature_from_word(0xE700), -25.0);
        assert_eq!(temperature_from_word(0xC900), -55.0);
    }

    #[test]
    fn unused_low_bits_are_ignored() {
        assert_eq!(temperature_from_word(0x197F), 25.0);
    }

    #[test]
    fn word_is_swapped_from_wire_order() {
        let bus = RegisterBus::new();
        bus.load(REG_TEMPERATURE, &[0xFF, 0x80]);
        let mut lm75 = Lm75::new(bus);
        assert!(lm75.ok());
        assert_eq!(lm75.measure().temperature(), Some(-0.5));
    }

    #[test]
    fn read_failure_is_unavailable() {
        let bus = RegisterBus::new();
        bus.fail_reads(true);
        let mut lm75 = Lm75::new(bus);
        let m = lm75.measure();
        assert!(m.provides(Quantity::Temperature));
        assert!(m.is_unavailable());
    }
}
