//! Freescale MPL115A2 miniature I2C barometer.
//!
//! The chip stores four fixed-point coefficients that are converted to
//! floating point once at construction; pressure compensation is then a
//! short floating point polynomial.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, info};

use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::{BusError, Error};
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::be_u16;
use crate::sensors::{altitude_at, available_together, Sensor, State, SEA_LEVEL_PA};

pub const DEFAULT_ADDRESS: u16 = 0x60;

const REG_PADC: u8 = 0x00;
const REG_COEFFICIENTS: u8 = 0x04;
const REG_CONVERT: u8 = 0x12;
const CONVERSION_MS: u32 = 5;

/// Pre-scaled compensation coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mpl115a2Coefficients {
    pub a0: f64,
    pub b1: f64,
    pub b2: f64,
    pub c12: f64,
}

impl Mpl115a2Coefficients {
    /// Parse the 8 big-endian bytes starting at 0x04
    pub fn from_bytes(data: &[u8; 8]) -> Self {
        Self {
            a0: f64::from(BigEndian::read_i16(&data[0..2])) / 8.0,
            b1: f64::from(BigEndian::read_i16(&data[2..4])) / 8192.0,
            b2: f64::from(BigEndian::read_i16(&data[4..6])) / 16384.0,
            c12: f64::from(BigEndian::read_i16(&data[6..8])) / 16_777_216.0,
        }
    }

    pub fn load<T: Transport>(transport: &mut T) -> Result<Self, Error> {
        let data = transport
            .read_block_exact(REG_COEFFICIENTS, 8)
            .map_err(Error::Calibration)?;
        let mut block = [0u8; 8];
        block.copy_from_slice(&data);
        Ok(Self::from_bytes(&block))
    }

    /// Pressure in Pa from the 10-bit pressure and temperature ADC values
    pub fn pressure(&self, padc: u16, tadc: u16) -> f64 {
        let padc = f64::from(padc);
        let tadc = f64::from(tadc);
        let pcomp = self.a0 + (self.b1 + self.c12 * tadc) * padc + self.b2 * tadc;
        (pcomp * 65.0 / 1023.0 + 50.0) * 1000.0
    }
}

/// Temperature in °C from the 10-bit temperature ADC value
pub fn temperature_from_adc(tadc: u16) -> f64 {
    f64::from(tadc) * -0.1706 + 112.27
}

pub struct Mpl115a2<T: Transport, D: Delay = StdDelay> {
    transport: T,
    delay: D,
    coefficients: Mpl115a2Coefficients,
    sea_level: f64,
}

impl<T: Transport> Mpl115a2<T> {
    pub fn new(transport: T) -> Result<Self, Error> {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Mpl115a2<T, D> {
    pub fn with_delay(mut transport: T, delay: D) -> Result<Self, Error> {
        let coefficients = match Mpl115a2Coefficients::load(&mut transport) {
            Ok(coefficients) => coefficients,
            Err(e) => {
                transport.close();
                return Err(e);
            }
        };
        info!("MPL115A2 initialised: {:?}", coefficients);
        Ok(Self {
            transport,
            delay,
            coefficients,
            sea_level: SEA_LEVEL_PA,
        })
    }

    pub fn coefficients(&self) -> &Mpl115a2Coefficients {
        &self.coefficients
    }

    /// Start a conversion and return `(Padc, Tadc)`
    fn convert(&mut self) -> Result<(u16, u16), BusError> {
        self.transport.write_byte_reg(REG_CONVERT, 0x00)?;
        self.delay.delay_ms(CONVERSION_MS);
        let data = self.transport.read_block_exact(REG_PADC, 4)?;
        let padc = be_u16(&data[0..2]) >> 6;
        let tadc = be_u16(&data[2..4]) >> 6;
        debug!("MPL115A2: Padc={} Tadc={}", padc, tadc);
        Ok((padc, tadc))
    }

    pub fn measure(&mut self) -> Measurement {
        let adc = available_together(
            "MPL115A2",
            &[Quantity::Temperature, Quantity::Pressure],
            self.convert(),
        );
        let pressure = adc.map(|(padc, tadc)| self.coefficients.pressure(padc, tadc));
        Measurement::new()
            .with(
                Quantity::Temperature,
                adc.map(|(_, tadc)| temperature_from_adc(tadc)),
            )
            .with(Quantity::Pressure, pressure)
            .with(
                Quantity::Altitude,
                pressure.map(|p| altitude_at(p, self.sea_level)),
            )
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

impl<T: Transport, D: Delay> Sensor for Mpl115a2<T, D> {
    fn name(&self) -> &'static str {
        "MPL115A2"
    }

    /// No identity register; a constructed driver has its coefficients
    fn ok(&self) -> bool {
        true
    }

    fn state(&self) -> State {
        State::Ready
    }

    fn measure(&mut self) -> Measurement {
        Mpl115a2::measure(self)
    }

    fn set_sea_level_pressure(&mut self, pressure: f64) {
        self.sea_level = pressure;
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

    const DATASHEET: [u8; 8] = [0x3E, 0xCE, 0xB3, 0xF9, 0xC5, 0x17, 0x33, 0xC8];

    #[test]
    fn coefficients_are_prescaled() {
        let c = Mpl115a2Coefficients::from_bytes(&DATASHEET);
        assert_eq!(c.a0, 2009.75);
        assert_eq!(c.b1, -2.3758544921875);
        assert_eq!(c.b2, -0.92047119140625);
        assert!(approx_eq!(f64, c.c12, 0.00079012, epsilon = 1e-8));
    }

    #[test]
    fn datasheet_pressure() {
        let c = Mpl115a2Coefficients::from_bytes(&DATASHEET);
        let p = c.pressure(410, 507);
        assert!(approx_eq!(f64, p, 96_587.33, epsilon = 0.01), "got {}", p);
    }

    #[test]
    fn measure_runs_one_conversion() {
        let bus = RegisterBus::new();
        bus.load(REG_COEFFICIENTS, &DATASHEET)
            .load(REG_PADC, &[0x66, 0x80, 0x7E, 0xC0]);
        let delay = RecordingDelay::new();
        let mut mpl = Mpl115a2::with_delay(bus.clone(), delay.clone()).unwrap();

        let m = mpl.measure();
        assert!(approx_eq!(f64, m.pressure().unwrap(), 96_587.33, epsilon = 0.01));
        assert!(approx_eq!(f64, m.temperature().unwrap(), 25.7758, epsilon = 1e-6));
        assert!(m.altitude().unwrap() > 0.0);
        assert_eq!(bus.writes(), vec![Write::Register(REG_CONVERT, 0x00)]);
        assert_eq!(delay.requested(), vec![5]);
    }

    #[test]
    fn failed_conversion_blanks_all_quantities() {
        let bus = RegisterBus::new();
        bus.load(REG_COEFFICIENTS, &DATASHEET);
        let mut mpl = Mpl115a2::with_delay(bus.clone(), RecordingDelay::new()).unwrap();
        bus.fail_register(REG_PADC);
        let m = mpl.measure();
        assert!(m.is_unavailable());
        assert!(m.provides(Quantity::Altitude));
    }

    #[test]
    fn missing_coefficients_are_fatal() {
        let bus = RegisterBus::new();
        bus.fail_reads(true);
        assert!(matches!(
            Mpl115a2::with_delay(bus.clone(), RecordingDelay::new()),
            Err(Error::Calibration(_))
        ));
        assert!(bus.is_closed());
    }
}
