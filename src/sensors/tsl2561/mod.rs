//! TAOS TSL2561 light-to-digital converter.

pub mod compensation;

pub use compensation::{Gain, IntegrationTime, Package};

use log::{debug, info, warn};

use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::BusError;
use crate::models::{Measurement, Quantity};
use crate::sensors::{available, Sensor, State};

pub const DEFAULT_ADDRESS: u16 = 0x39;

pub mod registers {
    pub const COMMAND: u8 = 0x80;
    pub const WORD: u8 = 0x20;

    pub const CONTROL: u8 = 0x00;
    pub const TIMING: u8 = 0x01;
    pub const ID: u8 = 0x0A;
    pub const DATA0: u8 = 0x0C;
    pub const DATA1: u8 = 0x0E;

    pub const POWER_ON: u8 = 0x03;
    pub const POWER_OFF: u8 = 0x00;
}

use registers::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tsl2561Config {
    pub integration: IntegrationTime,
    pub gain: Gain,
}

impl Tsl2561Config {
    /// Value of the timing register
    pub fn timing(&self) -> u8 {
        self.integration.code() | self.gain.code()
    }
}

/// Package from the part number in the high nibble of the ID register
pub fn package_from_id(id: u8) -> Option<Package> {
    match id >> 4 {
        0x1 => Some(Package::Cs),
        0x5 => Some(Package::T),
        _ => None,
    }
}

pub struct Tsl2561<T: Transport, D: Delay = StdDelay> {
    transport: T,
    delay: D,
    id: Option<u8>,
    package: Package,
    config: Tsl2561Config,
    state: State,
}

impl<T: Transport> Tsl2561<T> {
    pub fn new(transport: T) -> Self {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Tsl2561<T, D> {
    /// Identify the package and apply the default timing
    ///
    /// An unrecognised part falls back to the T/FN/CL response curve.
    pub fn with_delay(mut transport: T, delay: D) -> Self {
        let id = match transport.read_byte(COMMAND | ID) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("TSL2561: failed to read id: {}", e);
                None
            }
        };
        let package = id.and_then(package_from_id).unwrap_or_default();

        let mut sensor = Self {
            transport,
            delay,
            id,
            package,
            config: Tsl2561Config::default(),
            state: State::Identified,
        };
        if let Err(e) = sensor.push_config() {
            warn!("TSL2561: initial timing not applied: {}", e);
        }
        info!(
            "TSL2561 initialised: id {:?}, package {:?}, state {:?}",
            sensor.id, sensor.package, sensor.state
        );
        sensor
    }

    pub fn id(&self) -> Option<u8> {
        self.id
    }

    pub fn package(&self) -> Package {
        self.package
    }

    pub fn config(&self) -> Tsl2561Config {
        self.config
    }

    pub fn configure(&mut self, config: Tsl2561Config) -> Result<(), BusError> {
        self.config = config;
        self.push_config()
    }

    /// Stage a gain given as timing register bits (`0x00` 1x, `0x10` 16x)
    pub fn set_gain(&mut self, code: u8) -> bool {
        match Gain::from_code(code) {
            Some(gain) => {
                self.config.gain = gain;
                self.stage();
                true
            }
            None => {
                debug!("TSL2561: rejected gain code 0x{:02x}", code);
                false
            }
        }
    }

    /// Stage an integration time code (`0x00` 13.7 ms, `0x01` 101 ms, `0x02` 402 ms)
    pub fn set_integration_time(&mut self, code: u8) -> bool {
        match IntegrationTime::from_code(code) {
            Some(integration) => {
                self.config.integration = integration;
                self.stage();
                true
            }
            None => {
                debug!("TSL2561: rejected integration time code 0x{:02x}", code);
                false
            }
        }
    }

    fn stage(&mut self) {
        if self.state == State::Ready {
            self.state = State::Calibrated;
        }
    }

    pub fn power_on(&mut self) -> Result<(), BusError> {
        self.transport.write_byte_reg(COMMAND | CONTROL, POWER_ON)
    }

    pub fn power_off(&mut self) -> Result<(), BusError> {
        self.transport.write_byte_reg(COMMAND | CONTROL, POWER_OFF)
    }

    fn push_config(&mut self) -> Result<(), BusError> {
        let result = self.power_on().and_then(|()| {
            self.transport
                .write_byte_reg(COMMAND | TIMING, self.config.timing())
        });
        match result {
            Ok(()) => {
                self.state = State::Ready;
                self.release();
                Ok(())
            }
            Err(e) => {
                self.state = State::Calibrated;
                Err(e)
            }
        }
    }

    /// Power down, logging rather than failing
    fn release(&mut self) {
        if let Err(e) = self.power_off() {
            warn!("TSL2561: power off failed: {}", e);
        }
    }

    /// Integrate one cycle and return `(ch0, ch1)`
    fn read_channels(&mut self) -> Result<(u16, u16), BusError> {
        if self.state != State::Ready {
            self.push_config()?;
        }
        self.power_on()?;
        self.delay.delay_ms(self.config.integration.wait_ms());
        let channels = self
            .transport
            .read_word(COMMAND | WORD | DATA0)
            .and_then(|ch0| Ok((ch0, self.transport.read_word(COMMAND | WORD | DATA1)?)));
        self.release();
        let (ch0, ch1) = channels?;
        debug!("TSL2561: ch0={} ch1={}", ch0, ch1);
        Ok((ch0, ch1))
    }

    pub fn measure(&mut self) -> Measurement {
        let channels = available("TSL2561", Quantity::Illuminance, self.read_channels());
        let config = self.config;
        let package = self.package;
        let lux = channels.map(|(ch0, ch1)| {
            f64::from(compensation::lux(
                ch0,
                ch1,
                config.integration,
                config.gain,
                package,
            ))
        });
        Measurement::new().with(Quantity::Illuminance, lux)
    }

    pub fn illuminance(&mut self) -> Option<f64> {
        self.measure().illuminance()
    }
}

impl<T: Transport, D: Delay> Sensor for Tsl2561<T, D> {
    fn name(&self) -> &'static str {
        "TSL2561"
    }

    fn ok(&self) -> bool {
        self.id.and_then(package_from_id).is_some()
    }

    fn state(&self) -> State {
        self.state
    }

    fn measure(&mut self) -> Measurement {
        Tsl2561::measure(self)
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

    fn bus_with(id: u8, ch0: u16, ch1: u16) -> RegisterBus {
        let bus = RegisterBus::new();
        bus.load(COMMAND | ID, &[id])
            .load(COMMAND | WORD | DATA0, &ch0.to_le_bytes())
            .load(COMMAND | WORD | DATA1, &ch1.to_le_bytes());
        bus
    }

    #[test]
    fn id_selects_the_package() {
        assert_eq!(package_from_id(0x50), Some(Package::T));
        assert_eq!(package_from_id(0x1A), Some(Package::Cs));
        assert_eq!(package_from_id(0x00), None);
    }

    #[test]
    fn construction_applies_default_timing() {
        let bus = bus_with(0x50, 0, 0);
        let sensor = Tsl2561::with_delay(bus.clone(), RecordingDelay::new());
        assert!(sensor.ok());
        assert_eq!(sensor.package(), Package::T);
        assert_eq!(sensor.state(), State::Ready);
        assert_eq!(
            bus.writes(),
            vec![
                Write::Register(COMMAND | CONTROL, POWER_ON),
                Write::Register(COMMAND | TIMING, 0x02),
                Write::Register(COMMAND | CONTROL, POWER_OFF),
            ]
        );
    }

    #[test]
    fn measure_powers_up_integrates_and_powers_down() {
        let bus = bus_with(0x50, 1000, 0);
        let delay = RecordingDelay::new();
        let mut sensor = Tsl2561::with_delay(bus.clone(), delay.clone());
        bus.clear_writes();

        assert_eq!(sensor.illuminance(), Some(486.0));
        assert_eq!(
            bus.writes(),
            vec![
                Write::Register(COMMAND | CONTROL, POWER_ON),
                Write::Register(COMMAND | CONTROL, POWER_OFF),
            ]
        );
        assert_eq!(delay.requested(), vec![403]);
    }

    #[test]
    fn staged_timing_is_flushed_first() {
        let bus = bus_with(0x1A, 1000, 500);
        let delay = RecordingDelay::new();
        let mut sensor = Tsl2561::with_delay(bus.clone(), delay.clone());
        assert_eq!(sensor.package(), Package::Cs);
        assert!(sensor.set_gain(0x10));
        assert!(!sensor.set_gain(0x01));
        assert!(!sensor.set_integration_time(0x03));
        assert_eq!(sensor.state(), State::Calibrated);
        bus.clear_writes();

        assert_eq!(sensor.illuminance(), Some(9.0));
        assert_eq!(
            bus.writes()[..2],
            [
                Write::Register(COMMAND | CONTROL, POWER_ON),
                Write::Register(COMMAND | TIMING, 0x12),
            ]
        );
        assert_eq!(sensor.state(), State::Ready);
    }

    #[test]
    fn saturated_channel_reads_zero() {
        let bus = bus_with(0x50, 65000, 100);
        let mut sensor = Tsl2561::with_delay(bus, RecordingDelay::new());
        assert_eq!(sensor.illuminance(), Some(0.0));
    }

    #[test]
    fn failed_channel_read_still_powers_down() {
        let bus = bus_with(0x50, 1000, 0);
        let mut sensor = Tsl2561::with_delay(bus.clone(), RecordingDelay::new());
        bus.clear_writes();
        bus.fail_register(COMMAND | WORD | DATA1);

        let m = sensor.measure();
        assert!(m.is_unavailable());
        assert_eq!(
            bus.writes().last(),
            Some(&Write::Register(COMMAND | CONTROL, POWER_OFF))
        );
    }

    #[test]
    fn unknown_part_uses_the_t_curve() {
        let bus = bus_with(0x00, 1000, 0);
        let sensor = Tsl2561::with_delay(bus, RecordingDelay::new());
        assert!(!sensor.ok());
        assert_eq!(sensor.package(), Package::T);
    }
}
