//! Aosong AM2315 encased temperature and humidity sensor
//!
//! The chip sleeps between transactions and does not acknowledge the first
//! transfer that wakes it up. Readings use a Modbus-like request/response
//! exchange protected by CRC-16/Modbus.

use crc::{Crc, CRC_16_MODBUS};
use log::{debug, trace};

use crate::bus::Transport;
use crate::delay::{Delay, StdDelay};
use crate::error::Error;
use crate::models::{Measurement, Quantity};
use crate::sensors::raw::be_u16;
use crate::sensors::{available_together, Sensor, State};

pub const DEFAULT_ADDRESS: u16 = 0x5C;

const FUNCTION_READ: u8 = 0x03;
const REG_HUMIDITY: u8 = 0x00;
const READ_LEN: u8 = 0x04;
const FRAME_LEN: usize = 8;
const WAKE_MS: u32 = 10;
const RESPONSE_MS: u32 = 10;

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Humidity (%RH) and temperature (°C) decoded from one response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub humidity: f64,
    pub temperature: f64,
}

/// Validate and decode `[fn, len, rh_h, rh_l, t_h, t_l, crc_l, crc_h]`
pub fn decode_frame(frame: &[u8]) -> Result<Reading, Error> {
    if frame.len() < FRAME_LEN {
        return Err(Error::Frame("truncated response"));
    }
    if frame[0] != FUNCTION_READ {
        return Err(Error::Frame("unexpected function code"));
    }
    if frame[1] != READ_LEN {
        return Err(Error::Frame("unexpected payload length"));
    }
    let received = u16::from_le_bytes([frame[6], frame[7]]);
    let computed = CRC.checksum(&frame[..6]);
    if computed != received {
        return Err(Error::Checksum { computed, received });
    }

    let humidity = f64::from(be_u16(&frame[2..4])) / 10.0;
    // sign and magnitude, not two's complement
    let magnitude = f64::from(be_u16(&frame[4..6]) & 0x7FFF) / 10.0;
    let temperature = if frame[4] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };
    Ok(Reading {
        humidity,
        temperature,
    })
}

pub struct Am2315<T: Transport, D: Delay = StdDelay> {
    transport: T,
    delay: D,
    responsive: bool,
}

impl<T: Transport> Am2315<T> {
    pub fn new(transport: T) -> Self {
        Self::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: Delay> Am2315<T, D> {
    pub fn with_delay(transport: T, delay: D) -> Self {
        Self {
            transport,
            delay,
            responsive: false,
        }
    }

    /// Wake the chip from sleep
    ///
    /// The sleeping chip never acknowledges this write, so a failure here is
    /// expected and deliberately ignored.
    pub fn wake_best_effort(&mut self) {
        if let Err(e) = self.transport.write_byte(0x00) {
            trace!("AM2315: wake pulse not acknowledged: {}", e);
        }
        self.delay.delay_ms(WAKE_MS);
    }

    fn read_frame(&mut self) -> Result<Reading, Error> {
        self.wake_best_effort();
        self.transport
            .write_bytes(&[FUNCTION_READ, REG_HUMIDITY, READ_LEN])?;
        self.delay.delay_ms(RESPONSE_MS);
        let frame = self.transport.read_bytes_exact(FRAME_LEN)?;
        debug!("AM2315: frame {:02x?}", frame);
        decode_frame(&frame)
    }

    /// Both quantities come from one frame, so they fail together
    pub fn measure(&mut self) -> Measurement {
        let result = self.read_frame();
        self.responsive = result.is_ok();
        let reading = available_together(
            "AM2315",
            &[Quantity::Temperature, Quantity::Humidity],
            result,
        );
        Measurement::new()
            .with(Quantity::Temperature, reading.map(|r| r.temperature))
            .with(Quantity::Humidity, reading.map(|r| r.humidity))
    }

    pub fn temperature(&mut self) -> Option<f64> {
        self.measure().temperature()
    }

    pub fn humidity(&mut self) -> Option<f64> {
        self.measure().humidity()
    }
}

impl<T: Transport, D: Delay> Sensor for Am2315<T, D> {
    fn name(&self) -> &'static str {
        "AM2315"
    }

    /// Whether the last exchange returned a valid frame
    fn ok(&self) -> bool {
        self.responsive
    }

    fn state(&self) -> State {
        State::Ready
    }

    fn measure(&mut self) -> Measurement {
        Am2315::measure(self)
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

    const WARM: [u8; 8] = [0x03, 0x04, 0x01, 0xF4, 0x00, 0xFA, 0x31, 0xA5];
    const FREEZING: [u8; 8] = [0x03, 0x04, 0x02, 0x58, 0x80, 0x65, 0xD0, 0x68];

    #[test]
    fn modbus_check_value() {
        assert_eq!(CRC.checksum(b"123456789"), 0x4B37);
    }

    #[test]
    fn decodes_positive_and_negative_temperatures() {
        assert_eq!(
            decode_frame(&WARM).unwrap(),
            Reading {
                humidity: 50.0,
                temperature: 25.0
            }
        );
        assert_eq!(
            decode_frame(&FREEZING).unwrap(),
            Reading {
                humidity: 60.0,
                temperature: -10.1
            }
        );
    }

    #[test]
    fn rejects_bad_header_and_checksum() {
        let mut frame = WARM;
        frame[6] ^= 0x01;
        assert!(matches!(decode_frame(&frame), Err(Error::Checksum { .. })));

        let mut frame = WARM;
        frame[0] = 0x83;
        assert!(matches!(decode_frame(&frame), Err(Error::Frame(_))));

        let mut frame = WARM;
        frame[1] = 0x02;
        assert!(matches!(decode_frame(&frame), Err(Error::Frame(_))));
    }

    #[test]
    fn cycle_wakes_requests_and_decodes() {
        let bus = RegisterBus::new();
        bus.push_response(&WARM);
        let delay = RecordingDelay::new();
        let mut sensor = Am2315::with_delay(bus.clone(), delay.clone());
        assert!(!sensor.ok());

        let m = sensor.measure();
        assert_eq!(m.temperature(), Some(25.0));
        assert_eq!(m.humidity(), Some(50.0));
        assert!(sensor.ok());
        assert_eq!(
            bus.writes(),
            vec![Write::Byte(0x00), Write::Bytes(vec![0x03, 0x00, 0x04])]
        );
        assert_eq!(delay.requested(), vec![10, 10]);
    }

    #[test]
    fn missed_response_recovers_on_the_next_cycle() {
        let bus = RegisterBus::new();
        bus.push_failure().push_response(&WARM);
        let mut sensor = Am2315::with_delay(bus, RecordingDelay::new());

        assert!(sensor.measure().is_unavailable());
        assert!(!sensor.ok());
        assert_eq!(sensor.measure().temperature(), Some(25.0));
        assert!(sensor.ok());
    }

    #[test]
    fn corrupted_frame_blanks_the_cycle() {
        let bus = RegisterBus::new();
        let mut frame = FREEZING;
        frame[7] = 0;
        bus.push_response(&frame);
        let mut sensor = Am2315::with_delay(bus, RecordingDelay::new());
        let m = sensor.measure();
        assert!(m.is_unavailable());
        assert!(m.provides(Quantity::Temperature));
        assert!(m.provides(Quantity::Humidity));
        assert!(!sensor.ok());
    }
}
