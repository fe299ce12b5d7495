//! Integer compensation algorithm of the BMP180/BMP085 datasheet.
//!
//! Divisions truncate toward zero. Coefficient sets that would divide by
//! zero or overflow the pressure polynomial produce `None` instead of a value.

use super::calibration::Bmp180Calibration;

/// Compensated temperature plus the `B5` term the pressure formula needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temperature {
    /// Temperature in 0.1 °C
    pub deci_celsius: i64,
    pub b5: i64,
}

impl Temperature {
    pub fn celsius(&self) -> f64 {
        self.deci_celsius as f64 / 10.0
    }
}

pub fn compensate_temperature(ut: i64, cal: &Bmp180Calibration) -> Option<Temperature> {
    let x1 = ((ut - i64::from(cal.ac6)) * i64::from(cal.ac5)) >> 15;
    let x2 = (i64::from(cal.mc) << 11).checked_div(x1 + i64::from(cal.md))?;
    let b5 = x1 + x2;
    Some(Temperature {
        deci_celsius: (b5 + 8) >> 4,
        b5,
    })
}

/// Pressure in Pa for the uncompensated `up` sampled at `oss`
pub fn compensate_pressure(
    up: i64,
    oss: u8,
    temperature: Temperature,
    cal: &Bmp180Calibration,
) -> Option<i64> {
    let ac1 = i64::from(cal.ac1);
    let ac2 = i64::from(cal.ac2);
    let ac3 = i64::from(cal.ac3);
    let ac4 = i64::from(cal.ac4);
    let b1 = i64::from(cal.b1);
    let b2 = i64::from(cal.b2);

    let b6 = temperature.b5 - 4000;
    let mut x1 = (b2 * ((b6 * b6) >> 12)) >> 11;
    let mut x2 = (ac2 * b6) >> 11;
    let mut x3 = x1 + x2;
    let b3 = ((((ac1 * 4) + x3) << oss) + 2) / 4;

    x1 = (ac3 * b6) >> 13;
    x2 = (b1 * ((b6 * b6) >> 12)) >> 16;
    x3 = ((x1 + x2) + 2) >> 2;
    let b4 = (ac4 * (x3 + 32_768)) >> 15;
    let b7 = (up - b3).checked_mul(50_000 >> oss)?;

    // datasheet branch that keeps the intermediate within 32 bits
    let p = if b7 < 0x8000_0000 {
        b7.checked_mul(2)?.checked_div(b4)?
    } else {
        b7.checked_div(b4)?.checked_mul(2)?
    };

    x1 = (p >> 8).checked_mul(p >> 8)?.checked_mul(3038)? >> 16;
    x2 = p.checked_mul(-7357)? >> 16;
    p.checked_add((x1 + x2 + 3791) >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::bmp180::calibration::tests::DATASHEET;

    fn calibration() -> Bmp180Calibration {
        Bmp180Calibration::from_bytes(&DATASHEET)
    }

    #[test]
    fn datasheet_temperature() {
        let t = compensate_temperature(27_898, &calibration()).unwrap();
        assert_eq!(t.b5, 2400);
        assert_eq!(t.deci_celsius, 150);
        assert_eq!(t.celsius(), 15.0);
    }

    #[test]
    fn datasheet_pressure() {
        let t = compensate_temperature(27_898, &calibration()).unwrap();
        assert_eq!(compensate_pressure(23_843, 0, t, &calibration()), Some(69_964));
    }

    #[test]
    fn oversampling_scales_the_pressure_path() {
        let t = compensate_temperature(27_898, &calibration()).unwrap();
        assert_eq!(compensate_pressure(47_686, 1, t, &calibration()), Some(69_962));
    }

    #[test]
    fn full_scale_reading_takes_the_halved_division() {
        let t = compensate_temperature(27_898, &calibration()).unwrap();
        // B7 = (65534 - 422) * 50000 = 3_255_600_000, above 2^31
        // (B7 / B4) * 2 = 194_612 where (B7 * 2) / B4 would give 194_613
        assert_eq!(compensate_pressure(65_534, 0, t, &calibration()), Some(195_156));
        assert_eq!(compensate_pressure(65_535, 0, t, &calibration()), Some(195_160));
    }

    #[test]
    fn overflowing_coefficients_leave_pressure_unavailable() {
        let mut cal = calibration();
        cal.ac1 = -32768;
        cal.ac2 = -32768;
        cal.ac3 = 32767;
        cal.ac4 = 1;
        cal.b1 = -32768;
        cal.b2 = -32768;
        cal.mc = 32767;
        let t = compensate_temperature(27_898, &cal).unwrap();
        assert_eq!(t.deci_celsius, 848);
        // B4 collapses to 1, so (p >> 8)^2 * 3038 leaves i64
        assert_eq!(compensate_pressure(65_535, 0, t, &cal), None);
    }

    #[test]
    fn degenerate_coefficients_do_not_divide_by_zero() {
        let mut cal = calibration();
        cal.md = 0;
        cal.mc = 0;
        cal.ac5 = 0;
        assert_eq!(compensate_temperature(27_898, &cal), None);

        let mut cal = calibration();
        cal.ac4 = 0;
        let t = compensate_temperature(27_898, &cal).unwrap();
        assert_eq!(compensate_pressure(23_843, 0, t, &cal), None);
    }
}
