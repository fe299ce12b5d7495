//! Drivers for I2C/SMBus environmental sensors.
//!
//! Every chip is exposed as a driver generic over a [`bus::Transport`] and a
//! [`delay::Delay`]. Drivers load their factory calibration at construction,
//! apply the chip's compensation formulas and report readings as a
//! [`models::Measurement`] in which each quantity is either a value or
//! unavailable.
//!
//! ```no_run
//! use envsensors::bus::LinuxTransport;
//! use envsensors::sensors::{Bme280, Sensor};
//!
//! # fn main() -> Result<(), envsensors::Error> {
//! let transport = LinuxTransport::open("/dev/i2c-1", 0x77)?;
//! let mut bme = Bme280::new(transport)?;
//! println!("{:?}", bme.measure());
//! bme.close();
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod delay;
pub mod error;
pub mod models;
pub mod sensors;
pub mod utils;

pub use error::{BusError, Error};
pub use models::{Measurement, Quantity};
pub use sensors::{Sensor, SensorKind, State};
