//! Acquisition settings of the BMP280/BME280

/// Oversampling setting of one measurement channel (`osrs_x`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// Channel disabled, its output register keeps the reset value
    Skip,
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Oversampling::Skip),
            1 => Some(Oversampling::X1),
            2 => Some(Oversampling::X2),
            3 => Some(Oversampling::X4),
            4 => Some(Oversampling::X8),
            5 => Some(Oversampling::X16),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Oversampling::Skip => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 3,
            Oversampling::X8 => 4,
            Oversampling::X16 => 5,
        }
    }

    /// Number of ADC samples averaged per conversion
    pub fn samples(self) -> u32 {
        match self {
            Oversampling::Skip => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// Power mode (`mode[1:0]` of ctrl_meas)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sleep,
    /// One conversion per write of ctrl_meas, then back to sleep
    Forced,
    /// Continuous conversions separated by the standby time
    Normal,
}

impl Mode {
    /// Codes 1 and 2 both select forced mode
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Sleep),
            1 | 2 => Some(Mode::Forced),
            3 => Some(Mode::Normal),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Mode::Sleep => 0,
            Mode::Forced => 1,
            Mode::Normal => 3,
        }
    }
}

/// Inactive time between conversions in normal mode (`t_sb`)
///
/// Named after the BMP280 table; on the BME280 the last two codes mean
/// 10 ms and 20 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standby {
    Ms0_5,
    Ms62_5,
    Ms125,
    Ms250,
    Ms500,
    Ms1000,
    Ms2000,
    Ms4000,
}

impl Standby {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Standby::Ms0_5),
            1 => Some(Standby::Ms62_5),
            2 => Some(Standby::Ms125),
            3 => Some(Standby::Ms250),
            4 => Some(Standby::Ms500),
            5 => Some(Standby::Ms1000),
            6 => Some(Standby::Ms2000),
            7 => Some(Standby::Ms4000),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Standby::Ms0_5 => 0,
            Standby::Ms62_5 => 1,
            Standby::Ms125 => 2,
            Standby::Ms250 => 3,
            Standby::Ms500 => 4,
            Standby::Ms1000 => 5,
            Standby::Ms2000 => 6,
            Standby::Ms4000 => 7,
        }
    }
}

/// IIR filter coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Off,
    X2,
    X4,
    X8,
    X16,
}

impl Filter {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Filter::Off),
            1 => Some(Filter::X2),
            2 => Some(Filter::X4),
            3 => Some(Filter::X8),
            4 => Some(Filter::X16),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Filter::Off => 0,
            Filter::X2 => 1,
            Filter::X4 => 2,
            Filter::X8 => 3,
            Filter::X16 => 4,
        }
    }
}

/// Full acquisition configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bmx280Config {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    /// Ignored by the BMP280
    pub humidity: Oversampling,
    pub mode: Mode,
    pub standby: Standby,
    pub filter: Filter,
}

impl Default for Bmx280Config {
    fn default() -> Self {
        Self {
            temperature: Oversampling::X1,
            pressure: Oversampling::X1,
            humidity: Oversampling::X1,
            mode: Mode::Normal,
            standby: Standby::Ms1000,
            filter: Filter::Off,
        }
    }
}

impl Bmx280Config {
    /// Value of the ctrl_meas register (0xF4)
    pub fn ctrl_meas(&self) -> u8 {
        (self.temperature.code() << 5) | (self.pressure.code() << 2) | self.mode.code()
    }

    /// Value of the config register (0xF5)
    pub fn config(&self) -> u8 {
        (self.standby.code() << 5) | (self.filter.code() << 2)
    }

    /// Value of the ctrl_hum register (0xF2)
    pub fn ctrl_hum(&self) -> u8 {
        self.humidity.code()
    }

    /// Datasheet maximum conversion time in forced mode, rounded up to ms
    pub fn measurement_time_ms(&self, with_humidity: bool) -> u32 {
        let channel = |osrs: Oversampling| match osrs.samples() {
            0 => 0,
            n => 2300 * n + 575,
        };
        let mut micros = 1250 + 2300 * self.temperature.samples() + channel(self.pressure);
        if with_humidity {
            micros += channel(self.humidity);
        }
        (micros + 999) / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_encode_to_expected_registers() {
        let cfg = Bmx280Config::default();
        assert_eq!(cfg.ctrl_meas(), 0b001_001_11);
        assert_eq!(cfg.config(), 0b101_000_00);
        assert_eq!(cfg.ctrl_hum(), 0x01);
    }

    #[test]
    fn codes_round_trip_in_range() {
        for code in 0..=5 {
            assert_eq!(Oversampling::from_code(code).map(Oversampling::code), Some(code));
        }
        for code in 0..=7 {
            assert_eq!(Standby::from_code(code).map(Standby::code), Some(code));
        }
        for code in 0..=4 {
            assert_eq!(Filter::from_code(code).map(Filter::code), Some(code));
        }
        assert_eq!(Mode::from_code(2), Some(Mode::Forced));
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        assert_eq!(Oversampling::from_code(6), None);
        assert_eq!(Mode::from_code(4), None);
        assert_eq!(Standby::from_code(8), None);
        assert_eq!(Filter::from_code(5), None);
    }

    #[test]
    fn forced_conversion_time_follows_oversampling() {
        let mut cfg = Bmx280Config::default();
        // 1.25 + 2.3 + 2.875 (+ 2.875 humidity)
        assert_eq!(cfg.measurement_time_ms(false), 7);
        assert_eq!(cfg.measurement_time_ms(true), 10);
        cfg.temperature = Oversampling::X16;
        cfg.pressure = Oversampling::X16;
        cfg.humidity = Oversampling::Skip;
        assert_eq!(cfg.measurement_time_ms(true), 76);
    }
}
