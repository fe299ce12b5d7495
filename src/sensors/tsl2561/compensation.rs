//! Integer lux approximation of the TSL2561 datasheet.
//!
//! Channel counts are first normalised to 402 ms at 16x gain, then the
//! ratio of infrared (channel 1) to broadband (channel 0) light selects a
//! linear segment `lux = ch0 * b - ch1 * m` of the package's response curve.

const LUX_SCALE: u32 = 14;
const RATIO_SCALE: u32 = 9;
const CH_SCALE: u32 = 10;

const CH_SCALE_TINT0: u64 = 0x7517; // 322/11 * 2^CH_SCALE
const CH_SCALE_TINT1: u64 = 0x0FE7; // 322/81 * 2^CH_SCALE

/// Chip package, which determines the response curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Package {
    /// T, FN and CL packages
    #[default]
    T,
    Cs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationTime {
    Ms13,
    Ms101,
    #[default]
    Ms402,
}

impl IntegrationTime {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(IntegrationTime::Ms13),
            0x01 => Some(IntegrationTime::Ms101),
            0x02 => Some(IntegrationTime::Ms402),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            IntegrationTime::Ms13 => 0x00,
            IntegrationTime::Ms101 => 0x01,
            IntegrationTime::Ms402 => 0x02,
        }
    }

    /// Time to wait after power-up before the channels hold a full cycle
    pub fn wait_ms(self) -> u32 {
        match self {
            IntegrationTime::Ms13 => 14,
            IntegrationTime::Ms101 => 101,
            IntegrationTime::Ms402 => 403,
        }
    }

    /// Count at or above which a channel is considered saturated
    pub fn clipping_threshold(self) -> u16 {
        match self {
            IntegrationTime::Ms13 => 4900,
            IntegrationTime::Ms101 => 37000,
            IntegrationTime::Ms402 => 65000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    #[default]
    X1,
    X16,
}

impl Gain {
    /// Accepts the timing register bit values `0x00` and `0x10`
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Gain::X1),
            0x10 => Some(Gain::X16),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Gain::X1 => 0x00,
            Gain::X16 => 0x10,
        }
    }
}

/// `(k, b, m)`: ratio upper bound, channel 0 and channel 1 coefficients
type Segment = (u64, u64, u64);

const T_SEGMENTS: [Segment; 8] = [
    (0x0040, 0x01F2, 0x01BE),
    (0x0080, 0x0214, 0x02D1),
    (0x00C0, 0x023F, 0x037B),
    (0x0100, 0x0270, 0x03FE),
    (0x0138, 0x016F, 0x01FC),
    (0x019A, 0x00D2, 0x00FB),
    (0x029A, 0x0018, 0x0012),
    (0x029A, 0x0000, 0x0000),
];

const CS_SEGMENTS: [Segment; 8] = [
    (0x0043, 0x0204, 0x01AD),
    (0x0085, 0x0228, 0x02C1),
    (0x00C8, 0x0253, 0x0363),
    (0x010A, 0x0282, 0x03DF),
    (0x014D, 0x0177, 0x01DD),
    (0x019A, 0x0101, 0x0127),
    (0x029A, 0x0037, 0x002B),
    (0x029A, 0x0000, 0x0000),
];

/// Factor normalising raw counts to 402 ms and 16x gain, scaled by 2^10
pub fn channel_scale(integration: IntegrationTime, gain: Gain) -> u64 {
    let scale = match integration {
        IntegrationTime::Ms13 => CH_SCALE_TINT0,
        IntegrationTime::Ms101 => CH_SCALE_TINT1,
        IntegrationTime::Ms402 => 1 << CH_SCALE,
    };
    match gain {
        Gain::X1 => scale << 4,
        Gain::X16 => scale,
    }
}

/// Rounded `ch1 / ch0` ratio scaled by 2^9, 0 when channel 0 is dark
pub fn ratio(channel0: u64, channel1: u64) -> u64 {
    if channel0 == 0 {
        return 0;
    }
    let ratio1 = (channel1 << (RATIO_SCALE + 1)) / channel0;
    (ratio1 + 1) >> 1
}

fn segment(ratio: u64, package: Package) -> (u64, u64) {
    let table = match package {
        Package::T => &T_SEGMENTS,
        Package::Cs => &CS_SEGMENTS,
    };
    table
        .iter()
        .find(|(k, _, _)| ratio <= *k)
        .map(|(_, b, m)| (*b, *m))
        .unwrap_or((0, 0))
}

/// Illuminance in lux from the raw channel counts
///
/// Saturated channels yield 0.
pub fn lux(
    ch0: u16,
    ch1: u16,
    integration: IntegrationTime,
    gain: Gain,
    package: Package,
) -> u32 {
    let threshold = integration.clipping_threshold();
    if ch0 >= threshold || ch1 >= threshold {
        return 0;
    }

    let scale = channel_scale(integration, gain);
    let channel0 = (u64::from(ch0) * scale) >> CH_SCALE;
    let channel1 = (u64::from(ch1) * scale) >> CH_SCALE;
    let (b, m) = segment(ratio(channel0, channel1), package);

    let weighted = (channel0 * b).saturating_sub(channel1 * m);
    ((weighted + (1 << (LUX_SCALE - 1))) >> LUX_SCALE) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    use IntegrationTime::*;

    #[test]
    fn scale_depends_on_integration_and_gain() {
        assert_eq!(channel_scale(Ms402, Gain::X16), 1024);
        assert_eq!(channel_scale(Ms402, Gain::X1), 16384);
        assert_eq!(channel_scale(Ms13, Gain::X16), 0x7517);
        assert_eq!(channel_scale(Ms101, Gain::X1), 0x0FE7 << 4);
    }

    #[test]
    fn zero_ratio_uses_the_first_segment() {
        assert_eq!(ratio(1000, 0), 0);
        assert_eq!(lux(1000, 0, Ms402, Gain::X16, Package::T), 30);
        assert_eq!(lux(1000, 0, Ms402, Gain::X1, Package::T), 486);
    }

    #[test]
    fn dark_channel_zero_is_ratio_zero() {
        assert_eq!(ratio(0, 100), 0);
        assert_eq!(lux(0, 0, Ms402, Gain::X16, Package::T), 0);
    }

    #[test]
    fn packages_use_their_own_tables() {
        assert_eq!(ratio(1000, 500), 256);
        assert_eq!(lux(1000, 500, Ms402, Gain::X16, Package::T), 7);
        assert_eq!(lux(1000, 500, Ms402, Gain::X16, Package::Cs), 9);
    }

    #[test]
    fn short_integration_is_normalised() {
        assert_eq!(lux(2000, 100, Ms13, Gain::X16, Package::T), 1700);
        assert_eq!(lux(2000, 100, Ms101, Gain::X1, Package::T), 3694);
    }

    #[test]
    fn infrared_dominated_light_is_zero() {
        assert_eq!(lux(100, 1000, Ms402, Gain::X16, Package::T), 0);
    }

    #[test]
    fn saturation_depends_on_integration_time() {
        assert_eq!(lux(4900, 0, Ms13, Gain::X16, Package::T), 0);
        assert_eq!(lux(4899, 0, Ms13, Gain::X16, Package::T), 4359);
        assert_eq!(lux(100, 37000, Ms101, Gain::X16, Package::T), 0);
        assert!(lux(36999, 0, Ms101, Gain::X16, Package::T) > 0);
        assert_eq!(lux(65000, 0, Ms402, Gain::X16, Package::T), 0);
        assert!(lux(64999, 0, Ms402, Gain::X16, Package::T) > 0);
    }
}
