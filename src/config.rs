use log::{debug, info};
use std::collections::HashMap;
use std::env;

use crate::sensors::{SensorKind, SEA_LEVEL_PA};

const DEFAULT_BUS: &str = "/dev/i2c-1";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 300;

/// One configured chip on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntry {
    pub kind: SensorKind,
    pub address: u16,
}

impl SensorEntry {
    /// Label used to key measurements, e.g. `bme280@0x77`
    pub fn label(&self) -> String {
        format!("{}@0x{:02x}", self.kind, self.address)
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub bus: String,
    pub sensors: Vec<SensorEntry>,
    pub poll_interval_secs: u64,
    pub collection_interval_secs: u64,
    pub sea_level_pa: f64,
}

impl PollerConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, Box<dyn std::error::Error>> {
        let bus = vars
            .get("I2C_BUS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BUS.to_string());

        // Try SENSORS format first
        let sensors = match vars.get("SENSORS") {
            Some(list) => {
                debug!("Found SENSORS: '{}'", list);
                parse_sensor_list(list)?
            }
            None => {
                debug!("SENSORS environment variable not found, trying individual variables");
                parse_indexed(vars)?
            }
        };

        if sensors.is_empty() {
            return Err("No sensors configured. Please set SENSORS or SENSOR_<N>_KIND/SENSOR_<N>_ADDR environment variables".into());
        }

        let config = PollerConfig {
            bus,
            sensors,
            poll_interval_secs: parse_or(vars, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            collection_interval_secs: parse_or(
                vars,
                "COLLECTION_INTERVAL_SECS",
                DEFAULT_COLLECTION_INTERVAL_SECS,
            )?,
            sea_level_pa: parse_or(vars, "SEA_LEVEL_PA", SEA_LEVEL_PA)?,
        };

        info!("Total sensors configured: {}", config.sensors.len());
        for entry in &config.sensors {
            info!("Sensor: {} on {}", entry.label(), config.bus);
        }
        Ok(config)
    }
}

fn parse_or<V>(
    vars: &HashMap<String, String>,
    key: &str,
    default: V,
) -> Result<V, Box<dyn std::error::Error>>
where
    V: std::str::FromStr,
{
    match vars.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("Invalid value for {}: '{}'", key, value).into()),
        None => Ok(default),
    }
}

/// Parse a 7-bit address written in hex (`0x77`) or decimal (`119`)
pub fn parse_address(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse(),
    };
    match parsed {
        Ok(address) if address <= 0x7F => Ok(address),
        _ => Err(format!("invalid i2c address '{}'", text)),
    }
}

fn entry(kind: &str, address: Option<&str>) -> Result<SensorEntry, String> {
    let kind: SensorKind = kind.parse()?;
    let address = match address {
        Some(address) => parse_address(address)?,
        None => kind.default_address(),
    };
    Ok(SensorEntry { kind, address })
}

/// Parse `kind[@address]` items separated by commas
pub fn parse_sensor_list(list: &str) -> Result<Vec<SensorEntry>, String> {
    let mut sensors = Vec::new();
    for item in list.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let sensor = match item.split_once('@') {
            Some((kind, address)) => entry(kind, Some(address))?,
            None => entry(item, None)?,
        };
        debug!("Found sensor: {}", sensor.label());
        sensors.push(sensor);
    }
    Ok(sensors)
}

/// Collect `SENSOR_<N>_KIND` / `SENSOR_<N>_ADDR` pairs in index order
fn parse_indexed(vars: &HashMap<String, String>) -> Result<Vec<SensorEntry>, String> {
    let mut indexed = Vec::new();
    for (key, kind) in vars {
        if let Some(index) = key
            .strip_prefix("SENSOR_")
            .and_then(|s| s.strip_suffix("_KIND"))
        {
            let address = vars.get(&format!("SENSOR_{}_ADDR", index));
            let sensor = entry(kind, address.map(String::as_str))?;
            let order = index.parse::<u32>().unwrap_or(u32::MAX);
            indexed.push((order, index.to_string(), sensor));
        }
    }
    indexed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    Ok(indexed.into_iter().map(|(_, _, sensor)| sensor).collect())
}
