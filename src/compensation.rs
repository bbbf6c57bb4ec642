//! Second order temperature and pressure compensation for the MS5837-30BA.
//!
//! All arithmetic is carried out on `i64`. Rust's integer division truncates
//! toward zero, matching the reference algorithm bit for bit, so none of the
//! power of two divisions below may be rewritten as shifts.

use crate::CalibrationTable;

/// Mask for one 24 bit ADC word.
const ADC_MASK: u32 = 0xFF_FFFF;

/// Raw ADC words from one pair of conversions.
///
/// The ADC produces 24 bit words. [`compensate`] only looks at the low 24 bits
/// of each field.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Digital pressure value, D1.
    pub pressure: u32,
    /// Digital temperature value, D2.
    pub temperature: u32,
}

/// A compensated reading.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibratedSample {
    /// Pressure in mbar, 0.1 mbar resolution.
    pub pressure_mbar: f32,
    /// Temperature in °C, 0.01 °C resolution.
    pub temperature_c: f32,
}

/// First order results, before any low temperature correction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct FirstOrder {
    pub dt: i64,
    /// Hundredths of a degree C.
    pub temperature: i64,
    pub offset: i64,
    pub sensitivity: i64,
}

/// Second order correction terms, subtracted from the first order values.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub(crate) struct Correction {
    pub temperature: i64,
    pub offset: i64,
    pub sensitivity: i64,
}

pub(crate) fn first_order(calibration: &CalibrationTable, raw_temperature: u32) -> FirstOrder {
    let sens_t1 = i64::from(calibration.pressure_sensitivity());
    let off_t1 = i64::from(calibration.pressure_offset());
    let tcs = i64::from(calibration.temperature_coefficient_of_pressure_sensitivity());
    let tco = i64::from(calibration.temperature_coefficient_of_pressure_offset());
    let t_ref = i64::from(calibration.reference_temperature());
    let temp_sens = i64::from(calibration.temperature_coefficient_of_temperature());

    // Difference between actual and reference temperature.
    let dt = i64::from(raw_temperature) - t_ref * 256;

    FirstOrder {
        dt,
        temperature: 2000 + dt * temp_sens / 8_388_608,
        offset: off_t1 * 65_536 + tco * dt / 128,
        sensitivity: sens_t1 * 32_768 + tcs * dt / 256,
    }
}

/// Low temperature correction. `temperature` must be the first order value.
pub(crate) fn second_order(dt: i64, temperature: i64) -> Correction {
    if temperature >= 2000 {
        return Correction::default();
    }

    let low = (temperature - 2000).pow(2);
    let mut correction = Correction {
        temperature: 3 * dt.pow(2) / 8_589_934_592,
        offset: 3 * low / 2,
        sensitivity: 5 * low / 8,
    };

    if temperature < -1500 {
        let very_low = (temperature + 1500).pow(2);
        correction.offset += 7 * very_low;
        correction.sensitivity += 4 * very_low;
    }
    correction
}

/// Converts a raw sample into pressure and temperature using the factory
/// calibration.
///
/// This is a pure function: identical inputs always give identical output.
/// Bits above the 24 bit ADC range are ignored, which keeps every
/// intermediate within `i64` for any input.
///
/// # Example
///
/// ```
/// use ms5837_30ba::{compensate, CalibrationTable, RawSample};
///
/// let calibration = CalibrationTable::new([0x2000, 34982, 36352, 20328, 22354, 26646, 26146]);
/// let sample = compensate(
///     &calibration,
///     RawSample {
///         pressure: 4_958_179,
///         temperature: 6_815_414,
///     },
/// );
/// assert_eq!(sample.pressure_mbar, 3999.8);
/// ```
pub fn compensate(calibration: &CalibrationTable, raw: RawSample) -> CalibratedSample {
    let raw_pressure = raw.pressure & ADC_MASK;
    let first = first_order(calibration, raw.temperature & ADC_MASK);
    let correction = second_order(first.dt, first.temperature);

    let temperature = first.temperature - correction.temperature;
    let offset = first.offset - correction.offset;
    let sensitivity = first.sensitivity - correction.sensitivity;

    // Temperature compensated pressure = D1 * SENS - OFF
    let pressure = (i64::from(raw_pressure) * sensitivity / 2_097_152 - offset) / 8192;

    CalibratedSample {
        pressure_mbar: pressure as f32 / 10.0,
        temperature_c: temperature as f32 / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datasheet() -> CalibrationTable {
        CalibrationTable::new([0x2000, 34982, 36352, 20328, 22354, 26646, 26146])
    }

    fn regression() -> CalibrationTable {
        CalibrationTable::new([0, 34982, 36974, 20699, 22650, 26396, 28165])
    }

    #[test]
    fn datasheet_reference_values() {
        let raw = RawSample {
            pressure: 4_958_179,
            temperature: 6_815_414,
        };
        let first = first_order(&datasheet(), raw.temperature);
        assert_eq!(first.dt, -5962);
        // The datasheet prints 1981, computed with real division. Truncation
        // toward zero lands one hundredth above it.
        assert_eq!(first.temperature, 1982);
        assert_eq!(first.offset, 2_381_323_465);
        assert_eq!(first.sensitivity, 1_145_816_756);

        let sample = compensate(&datasheet(), raw);
        assert_eq!(sample.pressure_mbar, 3999.8);
        assert_eq!(sample.temperature_c, 19.82);
        assert!((sample.temperature_c - 19.81).abs() <= 0.0101);
    }

    #[test]
    fn regression_fixture() {
        let raw = RawSample {
            pressure: 0x42_0000,
            temperature: 0x3A_0000,
        };
        let first = first_order(&regression(), raw.temperature);
        assert_eq!(first.dt, -2_956_288);
        assert_eq!(first.temperature, -7925);
        assert_eq!(first.offset, 1_900_003_664);
        assert_eq!(first.sensitivity, 907_258_124);

        let sample = compensate(&regression(), raw);
        assert_eq!(sample.temperature_c, -109.77);
        assert_eq!(sample.pressure_mbar, -727.6);
    }

    #[test]
    fn compensation_is_deterministic() {
        let raw = RawSample {
            pressure: 0x42_0000,
            temperature: 0x3A_0000,
        };
        let calibration = regression();
        assert_eq!(compensate(&calibration, raw), compensate(&calibration, raw));
    }

    #[test]
    fn no_correction_at_or_above_reference() {
        // dT * C6 / 2^23 is -0.99..., which truncates to 0 rather than -1.
        let first = first_order(&regression(), 6_757_079);
        assert_eq!(first.dt, -297);
        assert_eq!(first.temperature, 2000);
        assert_eq!(second_order(first.dt, first.temperature), Correction::default());

        let sample = compensate(
            &regression(),
            RawSample {
                pressure: 0x42_0000,
                temperature: 6_757_079,
            },
        );
        assert_eq!(sample.temperature_c, 20.0);
        assert_eq!(sample.pressure_mbar, -719.0);
    }

    #[test]
    fn correction_just_below_reference() {
        let first = first_order(&regression(), 6_756_781);
        assert_eq!(first.temperature, 1999);
        let correction = second_order(first.dt, first.temperature);
        assert_eq!(
            correction,
            Correction {
                temperature: 0,
                offset: 1,
                sensitivity: 0,
            }
        );
    }

    #[test]
    fn extra_terms_below_minus_fifteen_degrees() {
        let above = first_order(&regression(), 5_714_646);
        assert_eq!(above.temperature, -1500);
        let below = first_order(&regression(), 5_714_348);
        assert_eq!(below.temperature, -1501);

        let at_threshold = second_order(above.dt, above.temperature);
        assert_eq!(at_threshold.offset, 3 * 3500i64.pow(2) / 2);
        assert_eq!(at_threshold.sensitivity, 5 * 3500i64.pow(2) / 8);

        let past_threshold = second_order(below.dt, below.temperature);
        assert_eq!(past_threshold.offset, 3 * 3501i64.pow(2) / 2 + 7);
        assert_eq!(past_threshold.sensitivity, 5 * 3501i64.pow(2) / 8 + 4);

        // Removing the quadratic term leaves exactly the extra correction.
        let extra = (-1501i64 + 1500).pow(2);
        assert_eq!(past_threshold.offset - 3 * 3501i64.pow(2) / 2, 7 * extra);
        assert_eq!(past_threshold.sensitivity - 5 * 3501i64.pow(2) / 8, 4 * extra);

        let sample = compensate(
            &regression(),
            RawSample {
                pressure: 0x42_0000,
                temperature: 5_714_348,
            },
        );
        assert_eq!(sample.temperature_c, -18.8);
        assert_eq!(sample.pressure_mbar, -557.7);

        let sample = compensate(
            &regression(),
            RawSample {
                pressure: 0x42_0000,
                temperature: 5_714_646,
            },
        );
        assert_eq!(sample.temperature_c, -18.79);
        assert_eq!(sample.pressure_mbar, -557.8);
    }

    #[test]
    fn thresholds_use_first_order_temperature() {
        // First order TEMP is -7925, the corrected value is -10977. The
        // correction must be computed from the former.
        let first = first_order(&regression(), 0x3A_0000);
        let correction = second_order(first.dt, first.temperature);
        let low = (first.temperature - 2000).pow(2);
        let very_low = (first.temperature + 1500).pow(2);
        assert_eq!(correction.offset, 3 * low / 2 + 7 * very_low);
        assert_eq!(correction.sensitivity, 5 * low / 8 + 4 * very_low);
        assert_eq!(first.temperature - correction.temperature, -10977);
    }

    #[test]
    fn full_scale_inputs_do_not_overflow() {
        let calibration = CalibrationTable::new([0xFFFF; 7]);
        let _ = compensate(
            &calibration,
            RawSample {
                pressure: 0xFF_FFFF,
                temperature: 0,
            },
        );
        let _ = compensate(
            &calibration,
            RawSample {
                pressure: 0xFF_FFFF,
                temperature: 0xFF_FFFF,
            },
        );
    }

    #[test]
    fn bits_above_the_adc_range_are_ignored() {
        let calibration = CalibrationTable::new([0xFFFF; 7]);
        let full_scale = compensate(
            &calibration,
            RawSample {
                pressure: 0xFF_FFFF,
                temperature: 0,
            },
        );
        // u32::MAX * SENS would not fit in i64 here.
        let oversized = compensate(
            &calibration,
            RawSample {
                pressure: u32::MAX,
                temperature: 0,
            },
        );
        assert_eq!(oversized, full_scale);

        let sample = compensate(
            &datasheet(),
            RawSample {
                pressure: 0xFF00_0000 | 4_958_179,
                temperature: 0x0100_0000 | 6_815_414,
            },
        );
        assert_eq!(sample.pressure_mbar, 3999.8);
        assert_eq!(sample.temperature_c, 19.82);
    }
}
