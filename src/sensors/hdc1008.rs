//! Texas Instruments HDC1008 humidity and temperature sensor

use log::{debug, info, warn};

use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::BusError;
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::be_u16;
use crate::sensors::{available_together, Sensor, State};

pub const DEFAULT_ADDRESS: u16 = 0x40;
pub const MANUFACTURER_ID: u16 = 0x5449;
pub const DEVICE_ID: u16 = 0x1000;

const REG_TEMPERATURE: u8 = 0x00;
const REG_CONFIG: u8 = 0x02;
const REG_SERIAL: [u8; 3] = [0xFB, 0xFC, 0xFD];
const REG_MANUFACTURER: u8 = 0xFE;
const REG_DEVICE: u8 = 0xFF;

/// Acquire temperature and humidity in one sequence
const MODE_SEQUENTIAL: u16 = 1 << 12;
const CONVERSION_MS: u32 = 15;

pub fn temperature_from_raw(raw: u16) -> f64 {
    f64::from(raw) / 65536.0 * 165.0 - 40.0
}

pub fn humidity_from_raw(raw: u16) -> f64 {
    f64::from(raw) / 65536.0 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureResolution {
    #[default]
    Bits14,
    Bits11,
}

impl TemperatureResolution {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TemperatureResolution::Bits14),
            1 => Some(TemperatureResolution::Bits11),
            _ => None,
        }
    }

    fn bits(self) -> u16 {
        match self {
            TemperatureResolution::Bits14 => 0,
            TemperatureResolution::Bits11 => 1 << 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HumidityResolution {
    #[default]
    Bits14,
    Bits11,
    Bits8,
}

impl HumidityResolution {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HumidityResolution::Bits14),
            1 => Some(HumidityResolution::Bits11),
            2 => Some(HumidityResolution::Bits8),
            _ => None,
        }
    }

    fn bits(self) -> u16 {
        match self {
            HumidityResolution::Bits14 => 0,
            HumidityResolution::Bits11 => 1 << 8,
            HumidityResolution::Bits8 => 2 << 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hdc1008Config {
    pub temperature: TemperatureResolution,
    pub humidity: HumidityResolution,
}

impl Hdc1008Config {
    /// Value of the configuration register
    pub fn register(&self) -> u16 {
        MODE_SEQUENTIAL | self.temperature.bits() | self.humidity.bits()
    }
}

pub struct Hdc1008<T: Transport, D: Delay = StdDelay> {
    transport: T,
    delay: D,
    manufacturer_id: Option<u16>,
    device_id: Option<u16>,
    serial: Option<u64>,
    config: Hdc1008Config,
    state: State,
}

impl<T: Transport> Hdc1008<T> {
    pub fn new(transport: T) -> Self {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Hdc1008<T, D> {
    pub fn with_delay(transport: T, delay: D) -> Self {
        let mut sensor = Self {
            transport,
            delay,
            manufacturer_id: None,
            device_id: None,
            serial: None,
            config: Hdc1008Config::default(),
            state: State::Uninitialized,
        };
        sensor.identify();
        if let Err(e) = sensor.push_config() {
            warn!("HDC1008: initial configuration not applied: {}", e);
        }
        info!("HDC1008 initialised (state {:?})", sensor.state);
        sensor
    }

    fn read_register(&mut self, register: u8) -> Result<u16, BusError> {
        self.transport.write_byte(register)?;
        let data = self.transport.read_bytes_exact(2)?;
        Ok(be_u16(&data))
    }

    fn identify(&mut self) {
        self.manufacturer_id = self.read_register(REG_MANUFACTURER).ok();
        self.device_id = self.read_register(REG_DEVICE).ok();
        if !self.is_genuine() {
            warn!(
                "HDC1008: unexpected identity {:?}/{:?}",
                self.manufacturer_id, self.device_id
            );
        }
        self.serial = self.read_serial().ok();
        self.state = State::Identified;
    }

    fn read_serial(&mut self) -> Result<u64, BusError> {
        let mut serial = 0u64;
        for register in REG_SERIAL {
            serial = (serial << 16) | u64::from(self.read_register(register)?);
        }
        // the low 7 bits of the last word are reserved
        Ok(serial >> 7)
    }

    fn is_genuine(&self) -> bool {
        self.manufacturer_id == Some(MANUFACTURER_ID) && self.device_id == Some(DEVICE_ID)
    }

    pub fn serial(&self) -> Option<u64> {
        self.serial
    }

    pub fn config(&self) -> Hdc1008Config {
        self.config
    }

    pub fn configure(&mut self, config: Hdc1008Config) -> Result<(), BusError> {
        self.config = config;
        self.push_config()
    }

    pub fn set_temperature_resolution(&mut self, code: u8) -> bool {
        match TemperatureResolution::from_code(code) {
            Some(resolution) => {
                self.config.temperature = resolution;
                self.stage();
                true
            }
            None => {
                debug!("HDC1008: rejected temperature resolution code {}", code);
                false
            }
        }
    }

    pub fn set_humidity_resolution(&mut self, code: u8) -> bool {
        match HumidityResolution::from_code(code) {
            Some(resolution) => {
                self.config.humidity = resolution;
                self.stage();
                true
            }
            None => {
                debug!("HDC1008: rejected humidity resolution code {}", code);
                false
            }
        }
    }

    fn stage(&mut self) {
        if self.state == State::Ready {
            self.state = State::Calibrated;
        }
    }

    fn push_config(&mut self) -> Result<(), BusError> {
        let [msb, lsb] = self.config.register().to_be_bytes();
        match self.transport.write_bytes(&[REG_CONFIG, msb, lsb]) {
            Ok(()) => {
                self.delay.delay_ms(CONVERSION_MS);
                self.state = State::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = State::Calibrated;
                Err(e)
            }
        }
    }

    /// Trigger a sequential conversion and read both result registers
    fn read_raw(&mut self) -> Result<(u16, u16), BusError> {
        if self.state != State::Ready {
            self.push_config()?;
        }
        self.transport.write_byte(REG_TEMPERATURE)?;
        self.delay.delay_ms(CONVERSION_MS);
        let data = self.transport.read_bytes_exact(4)?;
        Ok((be_u16(&data[0..2]), be_u16(&data[2..4])))
    }

    pub fn measure(&mut self) -> Measurement {
        let raw = available_together(
            "HDC1008",
            &[Quantity::Temperature, Quantity::Humidity],
            self.read_raw(),
        );
        debug!("HDC1008: raw {:?}", raw);
        Measurement::new()
            .with(
                Quantity::Temperature,
                raw.map(|(t, _)| temperature_from_raw(t)),
            )
            .with(Quantity::Humidity, raw.map(|(_, h)| humidity_from_raw(h)))
    }

    pub fn temperature(&mut self) -> Option<f64> {
        self.measure().temperature()
    }

    pub fn humidity(&mut self) -> Option<f64> {
        self.measure().humidity()
    }
}

impl<T: Transport, D: Delay> Sensor for Hdc1008<T, D> {
    fn name(&self) -> &'static str {
        "HDC1008"
    }

    fn ok(&self) -> bool {
        self.is_genuine()
    }

    fn state(&self) -> State {
        self.state
    }

    fn measure(&mut self) -> Measurement {
        Hdc1008::measure(self)
    }

    fn close(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{RegisterBus, Write};
    use crate::delay::RecordingDelay;
    use float_cmp::approx_eq;

    /// Queue the identity and serial number responses read at construction
    fn identified_bus() -> RegisterBus {
        let bus = RegisterBus::new();
        bus.push_response(&[0x54, 0x49])
            .push_response(&[0x10, 0x00])
            .push_response(&[0x01, 0x23])
            .push_response(&[0x45, 0x67])
            .push_response(&[0x89, 0x80]);
        bus
    }

    #[test]
    fn conversions() {
        assert_eq!(temperature_from_raw(0), -40.0);
        assert!(approx_eq!(f64, temperature_from_raw(0x6000), 21.875, ulps = 2));
        assert_eq!(humidity_from_raw(0x8000), 50.0);
    }

    #[test]
    fn config_register_layout() {
        assert_eq!(Hdc1008Config::default().register(), 0x1000);
        let cfg = Hdc1008Config {
            temperature: TemperatureResolution::Bits11,
            humidity: HumidityResolution::Bits8,
        };
        assert_eq!(cfg.register(), 0x1600);
    }

    #[test]
    fn construction_identifies_and_configures() {
        let bus = identified_bus();
        let sensor = Hdc1008::with_delay(bus.clone(), RecordingDelay::new());
        assert!(sensor.ok());
        assert_eq!(sensor.state(), State::Ready);
        assert_eq!(sensor.serial(), Some(0x0123_4567_8980 >> 7));
        assert_eq!(
            bus.writes().last(),
            Some(&Write::Bytes(vec![REG_CONFIG, 0x10, 0x00]))
        );
    }

    #[test]
    fn one_conversion_yields_both_values() {
        let bus = identified_bus();
        let delay = RecordingDelay::new();
        let mut sensor = Hdc1008::with_delay(bus.clone(), delay.clone());
        bus.clear_writes();
        bus.push_response(&[0x60, 0x00, 0x80, 0x00]);

        let m = sensor.measure();
        assert!(approx_eq!(f64, m.temperature().unwrap(), 21.875, ulps = 2));
        assert_eq!(m.humidity(), Some(50.0));
        assert_eq!(bus.writes(), vec![Write::Byte(REG_TEMPERATURE)]);
        assert_eq!(delay.requested(), vec![15, 15]);
    }

    #[test]
    fn resolution_change_is_pushed_before_the_next_conversion() {
        let bus = identified_bus();
        let mut sensor = Hdc1008::with_delay(bus.clone(), RecordingDelay::new());
        assert!(sensor.set_humidity_resolution(1));
        assert!(!sensor.set_humidity_resolution(3));
        assert!(!sensor.set_temperature_resolution(2));
        assert_eq!(sensor.state(), State::Calibrated);

        bus.clear_writes();
        bus.push_response(&[0x60, 0x00, 0x80, 0x00]);
        sensor.measure();
        assert_eq!(
            bus.writes(),
            vec![
                Write::Bytes(vec![REG_CONFIG, 0x11, 0x00]),
                Write::Byte(REG_TEMPERATURE),
            ]
        );
        assert_eq!(sensor.state(), State::Ready);
    }

    #[test]
    fn unknown_chip_is_flagged() {
        let bus = RegisterBus::new();
        bus.push_response(&[0x00, 0x00]);
        let sensor = Hdc1008::with_delay(bus, RecordingDelay::new());
        assert!(!sensor.ok());
        assert_eq!(sensor.serial(), None);
    }
}
