//! Bosch fixed-point compensation for the BMP280/BME280.
//!
//! All arithmetic is done in `i64` with arithmetic right shifts. Division
//! truncates toward zero like the datasheet's C reference code. The pressure
//! and humidity polynomials are checked because foreign trimming words
//! overflow them.

use super::calibration::{Bmx280Calibration, HumidityCalibration};

/// Upper bound of the humidity intermediate, 100 %RH in Q22.10 shifted by 12
pub const HUMIDITY_MAX: i64 = 419_430_400;

/// Temperature intermediate shared by the pressure and humidity formulas
///
/// Only produced by [`compensate_temperature`] so every pressure or humidity
/// value is computed against the temperature of the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FineTemperature(pub i32);

/// Temperature in 0.01 °C and the fine temperature of this conversion
pub fn compensate_temperature(adc_t: i32, cal: &Bmx280Calibration) -> (i32, FineTemperature) {
    let adc_t = i64::from(adc_t);
    let t1 = i64::from(cal.t1);
    let t2 = i64::from(cal.t2);
    let t3 = i64::from(cal.t3);

    let var1 = (((adc_t >> 3) - (t1 << 1)) * t2) >> 11;
    let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * t3) >> 14;
    let t_fine = var1 + var2;
    let centi = (t_fine * 5 + 128) >> 8;
    (centi as i32, FineTemperature(t_fine as i32))
}

/// Pressure in Pa as unsigned Q24.8
///
/// Returns `Some(0)` when the calibration makes the divisor vanish and `None`
/// when trimming words that no genuine chip carries overflow an intermediate.
pub fn compensate_pressure(
    adc_p: i32,
    t_fine: FineTemperature,
    cal: &Bmx280Calibration,
) -> Option<u32> {
    let p1 = i64::from(cal.p1);
    let p2 = i64::from(cal.p2);
    let p3 = i64::from(cal.p3);
    let p4 = i64::from(cal.p4);
    let p5 = i64::from(cal.p5);
    let p6 = i64::from(cal.p6);
    let p7 = i64::from(cal.p7);
    let p8 = i64::from(cal.p8);
    let p9 = i64::from(cal.p9);

    let var1 = i64::from(t_fine.0) - 128_000;
    let var2 = var1
        .checked_mul(var1)?
        .checked_mul(p6)?
        .checked_add(var1.checked_mul(p5)?.checked_mul(1 << 17)?)?
        .checked_add(p4 << 35)?;
    let var1 = (var1.checked_mul(var1)?.checked_mul(p3)? >> 8)
        .checked_add(var1.checked_mul(p2)?.checked_mul(1 << 12)?)?;
    let var1 = (1i64 << 47).checked_add(var1)?.checked_mul(p1)? >> 33;
    if var1 == 0 {
        return Some(0);
    }

    let p = 1_048_576 - i64::from(adc_p);
    let p = p
        .checked_mul(1 << 31)?
        .checked_sub(var2)?
        .checked_mul(3125)?
        .checked_div(var1)?;
    let var1 = p9.checked_mul(p >> 13)?.checked_mul(p >> 13)? >> 25;
    let var2 = p8.checked_mul(p)? >> 19;
    let p = (p.checked_add(var1)?.checked_add(var2)? >> 8).checked_add(p7 << 4)?;
    u32::try_from(p).ok()
}

/// Unclamped humidity intermediate (`v_x1_u32r` before the range check)
pub fn humidity_intermediate(
    adc_h: i32,
    t_fine: FineTemperature,
    cal: &HumidityCalibration,
) -> Option<i64> {
    let h1 = i64::from(cal.h1);
    let h2 = i64::from(cal.h2);
    let h3 = i64::from(cal.h3);
    let h4 = i64::from(cal.h4);
    let h5 = i64::from(cal.h5);
    let h6 = i64::from(cal.h6);

    let v = i64::from(t_fine.0) - 76_800;
    let scaled = (((i64::from(adc_h) << 14) - (h4 << 20) - (h5 * v)) + 16_384) >> 15;
    let slope = ((((v * h6) >> 10).checked_mul(((v * h3) >> 11) + 32_768)? >> 10) + 2_097_152)
        .checked_mul(h2)?
        .checked_add(8192)?;
    let v = scaled.checked_mul(slope >> 14)?;
    let correction = ((v >> 15).checked_mul(v >> 15)? >> 7).checked_mul(h1)? >> 4;
    v.checked_sub(correction)
}

pub fn clamp_humidity(intermediate: i64) -> i64 {
    intermediate.clamp(0, HUMIDITY_MAX)
}

/// Relative humidity in %RH as unsigned Q22.10, `None` on overflow
pub fn compensate_humidity(
    adc_h: i32,
    t_fine: FineTemperature,
    cal: &HumidityCalibration,
) -> Option<u32> {
    humidity_intermediate(adc_h, t_fine, cal).map(|v| (clamp_humidity(v) >> 12) as u32)
}
