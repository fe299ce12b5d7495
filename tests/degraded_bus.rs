use envsensors::bus::mock::RegisterBus;
use envsensors::bus::Transport;
use envsensors::delay::RecordingDelay;
use envsensors::sensors::bmx280::registers::*;
use envsensors::sensors::{self, Bme280, Bmp280, Scoped, Sensor, SensorKind};
use envsensors::{BusError, Error, Measurement, Quantity};
use float_cmp::approx_eq;

const BMX280_TRIMMING: [u8; 24] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C, 0x00,
    0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
];
const BME280_HUMIDITY: [u8; 7] = [0x6A, 0x01, 0x00, 0x14, 0x04, 0x00, 0x1E];
const BMP180_EEPROM: [u8; 22] = [
    0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71, 0x18, 0x2E, 0x00, 0x04,
    0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
];
const MPL115A2_COEFFICIENTS: [u8; 8] = [0x3E, 0xCE, 0xB3, 0xF9, 0xC5, 0x17, 0x33, 0xC8];

const ALL_KINDS: [SensorKind; 11] = [
    SensorKind::Am2315,
    SensorKind::Bme280,
    SensorKind::Bmp085,
    SensorKind::Bmp180,
    SensorKind::Bmp280,
    SensorKind::Hdc1008,
    SensorKind::Htu21d,
    SensorKind::Lm75,
    SensorKind::Mcp9808,
    SensorKind::Mpl115a2,
    SensorKind::Tsl2561,
];

/// A bus holding factory constants for every calibrated chip
fn calibrated_bus() -> RegisterBus {
    let bus = RegisterBus::new();
    bus.load(0x04, &MPL115A2_COEFFICIENTS)
        .load(REG_CALIB_TP, &BMX280_TRIMMING)
        .load(REG_CALIB_H1, &[0x4B])
        .load(0xAA, &BMP180_EEPROM)
        .load(REG_CALIB_H2, &BME280_HUMIDITY);
    bus
}

fn provided(kind: SensorKind) -> &'static [Quantity] {
    use Quantity::*;
    match kind {
        SensorKind::Am2315 | SensorKind::Hdc1008 | SensorKind::Htu21d => &[Temperature, Humidity],
        SensorKind::Bme280 => &[Temperature, Humidity, Pressure, Altitude],
        SensorKind::Bmp085 | SensorKind::Bmp180 | SensorKind::Bmp280 | SensorKind::Mpl115a2 => {
            &[Temperature, Pressure, Altitude]
        }
        SensorKind::Lm75 | SensorKind::Mcp9808 => &[Temperature],
        SensorKind::Tsl2561 => &[Illuminance],
    }
}

fn quantities(measurement: &Measurement) -> Vec<Quantity> {
    measurement.iter().map(|(quantity, _)| quantity).collect()
}

#[test]
fn every_chip_reports_all_quantities_unavailable_on_a_dead_bus() {
    for kind in ALL_KINDS {
        let bus = calibrated_bus();
        let mut sensor = sensors::build(kind, bus.clone(), RecordingDelay::new())
            .unwrap_or_else(|e| panic!("{} failed to build: {}", kind, e));
        bus.fail_reads(true).fail_writes(true);

        let measurement = sensor.measure();
        assert!(measurement.is_unavailable(), "{}: {:?}", kind, measurement);

        let mut expected = provided(kind).to_vec();
        expected.sort();
        assert_eq!(quantities(&measurement), expected, "{}", kind);
    }
}

#[test]
fn closed_transport_degrades_like_a_dead_bus() {
    for kind in ALL_KINDS {
        let mut sensor = sensors::build(kind, calibrated_bus(), RecordingDelay::new())
            .unwrap_or_else(|e| panic!("{} failed to build: {}", kind, e));
        sensor.close();
        assert!(sensor.measure().is_unavailable(), "{}", kind);
    }
}

fn bme280_bus() -> RegisterBus {
    let bus = calibrated_bus();
    bus.load(REG_ID, &[0x60])
        .load(REG_PRESSURE, &[0x65, 0x5A, 0xC0])
        .load(REG_TEMPERATURE, &[0x7E, 0xED, 0x00])
        .load(REG_HUMIDITY, &[0x75, 0x30]);
    bus
}

#[test]
fn humidity_failure_leaves_temperature_and_pressure() {
    let bus = bme280_bus();
    let mut bme = Bme280::with_delay(bus.clone(), RecordingDelay::new()).unwrap();
    bus.fail_register(REG_HUMIDITY);

    let m = bme.measure();
    assert!(approx_eq!(f64, m.temperature().unwrap(), 25.08, epsilon = 1e-9));
    assert!(m.pressure().is_some());
    assert!(m.altitude().is_some());
    assert!(m.provides(Quantity::Humidity));
    assert_eq!(m.humidity(), None);
}

#[test]
fn transient_failure_recovers_on_the_next_cycle() {
    let bus = bme280_bus();
    let mut bmp = Bmp280::with_delay(bus.clone(), RecordingDelay::new()).unwrap();
    let healthy = bmp.measure();

    bus.fail_register(REG_TEMPERATURE);
    let degraded = bmp.measure();
    assert!(degraded.is_unavailable());

    bus.heal_register(REG_TEMPERATURE);
    assert_eq!(bmp.measure(), healthy);
}

#[test]
fn scoped_sensor_closes_its_transport() {
    let bus = bme280_bus();
    {
        let mut bme = Scoped::new(Bme280::with_delay(bus.clone(), RecordingDelay::new()).unwrap());
        assert!(bme.humidity().is_some());
        assert!(!bus.is_closed());
    }
    assert!(bus.is_closed());
}

#[test]
fn failed_calibration_releases_the_bus() {
    let bus = RegisterBus::new();
    bus.fail_register(REG_CALIB_TP);
    assert!(sensors::build(SensorKind::Bmp280, bus.clone(), RecordingDelay::new()).is_err());
    assert!(bus.is_closed());
}

#[test]
fn foreign_trimming_leaves_pressure_unavailable() {
    // t1=0, t2=t3=32767, p1=65535, p2..p9=-32768
    let mut trimming: Vec<u8> = vec![0x00, 0x00, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0xFF];
    trimming.extend([0x00, 0x80].repeat(8));

    let bus = RegisterBus::new();
    bus.load(REG_ID, &[0x58])
        .load(REG_CALIB_TP, &trimming)
        .load(REG_PRESSURE, &[0xFF, 0xFF, 0xF0])
        .load(REG_TEMPERATURE, &[0xFF, 0xFF, 0xF0]);
    let mut bmp = Bmp280::with_delay(bus, RecordingDelay::new()).unwrap();

    let m = bmp.measure();
    assert!(approx_eq!(f64, m.temperature().unwrap(), 819.16, epsilon = 1e-9));
    assert!(m.provides(Quantity::Pressure));
    assert_eq!(m.pressure(), None);
    assert_eq!(m.altitude(), None);
    assert!(!m.is_unavailable());
}

/// Drops the last byte of every block read that starts at `register`
struct ShortBlock {
    bus: RegisterBus,
    register: u8,
}

impl Transport for ShortBlock {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        self.bus.read_byte(register)
    }

    fn read_word(&mut self, register: u8) -> Result<u16, BusError> {
        self.bus.read_word(register)
    }

    fn read_block(&mut self, register: u8, count: usize) -> Result<Vec<u8>, BusError> {
        let mut data = self.bus.read_block(register, count)?;
        if register == self.register {
            data.pop();
        }
        Ok(data)
    }

    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, BusError> {
        self.bus.read_bytes(count)
    }

    fn write_byte(&mut self, value: u8) -> Result<(), BusError> {
        self.bus.write_byte(value)
    }

    fn write_byte_reg(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.bus.write_byte_reg(register, value)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.bus.write_bytes(bytes)
    }

    fn close(&mut self) {
        self.bus.close()
    }
}

#[test]
fn truncated_calibration_block_fails_construction() {
    let bus = bme280_bus();
    let transport = ShortBlock {
        bus: bus.clone(),
        register: REG_CALIB_TP,
    };
    assert!(matches!(
        Bmp280::with_delay(transport, RecordingDelay::new()),
        Err(Error::Calibration(BusError::ShortRead {
            expected: 24,
            actual: 23
        }))
    ));
    assert!(bus.is_closed());
}

#[test]
fn truncated_data_block_degrades_only_its_quantity() {
    let transport = ShortBlock {
        bus: bme280_bus(),
        register: REG_PRESSURE,
    };
    let mut bme = Bme280::with_delay(transport, RecordingDelay::new()).unwrap();

    let m = bme.measure();
    assert!(approx_eq!(f64, m.temperature().unwrap(), 25.08, epsilon = 1e-9));
    assert!(m.humidity().is_some());
    assert_eq!(m.pressure(), None);
    assert_eq!(m.altitude(), None);
}
