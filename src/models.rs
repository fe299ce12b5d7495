use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// Physical quantity reported by a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantity {
    Temperature,
    Humidity,
    Pressure,
    Altitude,
    Illuminance,
}

impl Quantity {
    pub fn name(self) -> &'static str {
        match self {
            Quantity::Temperature => "temperature",
            Quantity::Humidity => "humidity",
            Quantity::Pressure => "pressure",
            Quantity::Altitude => "altitude",
            Quantity::Illuminance => "illuminance",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Temperature => "°C",
            Quantity::Humidity => "%",
            Quantity::Pressure => "Pa",
            Quantity::Altitude => "m",
            Quantity::Illuminance => "lx",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One reading cycle of a sensor
///
/// Every quantity the chip provides has an entry; `None` marks a quantity
/// that could not be read in this cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    values: BTreeMap<Quantity, Option<f64>>,
}

impl Measurement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, quantity: Quantity, value: Option<f64>) {
        self.values.insert(quantity, value);
    }

    pub fn with(mut self, quantity: Quantity, value: Option<f64>) -> Self {
        self.set(quantity, value);
        self
    }

    /// Value of `quantity`, `None` when unavailable or not provided
    pub fn get(&self, quantity: Quantity) -> Option<f64> {
        self.values.get(&quantity).copied().flatten()
    }

    pub fn provides(&self, quantity: Quantity) -> bool {
        self.values.contains_key(&quantity)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.get(Quantity::Temperature)
    }

    pub fn humidity(&self) -> Option<f64> {
        self.get(Quantity::Humidity)
    }

    pub fn pressure(&self) -> Option<f64> {
        self.get(Quantity::Pressure)
    }

    pub fn altitude(&self) -> Option<f64> {
        self.get(Quantity::Altitude)
    }

    pub fn illuminance(&self) -> Option<f64> {
        self.get(Quantity::Illuminance)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quantity, Option<f64>)> + '_ {
        self.values.iter().map(|(q, v)| (*q, *v))
    }

    /// True when no provided quantity could be read
    pub fn is_unavailable(&self) -> bool {
        self.values.values().all(Option::is_none)
    }
}

/// Averaged readings of one sensor over a collection interval
#[derive(Debug, Clone)]
pub struct AverageData {
    pub values: BTreeMap<Quantity, f64>,
    pub time: OffsetDateTime,
    pub name: String,
    pub samples: i32,
    pub failed_samples: i32,
}
