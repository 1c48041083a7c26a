//! Sensitivity Table and Raw-to-Physical Conversion
//!
//! Every output register of the LSM9DS1 holds a signed 16-bit count. The
//! physical value of one count (the sensitivity) depends on the sensor and on
//! the full-scale range it is configured for. The values below are the
//! typical figures from table 3 of the LSM9DS1 datasheet.

use crate::{accel::AccelFullScale, gyro::GyroFullScale, magnetometer::MagFullScale};

/// Accelerometer sensitivity at ±2 g, in g/LSB
pub const ACCEL_2G: f32 = 0.000061;
/// Accelerometer sensitivity at ±4 g, in g/LSB
pub const ACCEL_4G: f32 = 0.000122;
/// Accelerometer sensitivity at ±8 g, in g/LSB
pub const ACCEL_8G: f32 = 0.000244;
/// Accelerometer sensitivity at ±16 g, in g/LSB
pub const ACCEL_16G: f32 = 0.000732;
/// Gyroscope sensitivity at ±245 dps, in dps/LSB
pub const GYRO_245DPS: f32 = 0.00875;
/// Gyroscope sensitivity at ±500 dps, in dps/LSB
pub const GYRO_500DPS: f32 = 0.0175;
/// Gyroscope sensitivity at ±2000 dps, in dps/LSB
pub const GYRO_2000DPS: f32 = 0.07;
/// Magnetometer sensitivity at ±4 gauss, in gauss/LSB
pub const MAG_4GAUSS: f32 = 0.00014;
/// Magnetometer sensitivity at ±8 gauss, in gauss/LSB
pub const MAG_8GAUSS: f32 = 0.00029;
/// Magnetometer sensitivity at ±12 gauss, in gauss/LSB
pub const MAG_12GAUSS: f32 = 0.00043;
/// Magnetometer sensitivity at ±16 gauss, in gauss/LSB
pub const MAG_16GAUSS: f32 = 0.00058;

/// The three sensors of the LSM9DS1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

/// Full-scale setting of one sensor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorScale {
    Accel(AccelFullScale),
    Gyro(GyroFullScale),
    Mag(MagFullScale),
}

impl SensorScale {
    /// Sensor this scale belongs to
    pub const fn kind(self) -> SensorKind {
        match self {
            Self::Accel(_) => SensorKind::Accelerometer,
            Self::Gyro(_) => SensorKind::Gyroscope,
            Self::Mag(_) => SensorKind::Magnetometer,
        }
    }

    /// Range in the sensor's physical unit (g, dps or gauss)
    pub const fn range(self) -> u16 {
        match self {
            Self::Accel(scale) => scale.range(),
            Self::Gyro(scale) => scale.range(),
            Self::Mag(scale) => scale.range(),
        }
    }

    /// Constrain a requested range for the given sensor, falling back to the
    /// lowest scale of that sensor.
    pub const fn constrain(kind: SensorKind, range: u16) -> Self {
        match kind {
            SensorKind::Accelerometer => Self::Accel(AccelFullScale::constrain(range)),
            SensorKind::Gyroscope => Self::Gyro(GyroFullScale::constrain(range)),
            SensorKind::Magnetometer => Self::Mag(MagFullScale::constrain(range)),
        }
    }

    /// Physical units per LSB at this scale
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::Accel(scale) => scale.sensitivity(),
            Self::Gyro(scale) => scale.sensitivity(),
            Self::Mag(scale) => scale.sensitivity(),
        }
    }
}

/// One row of the sensitivity table.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SensitivityEntry {
    pub kind: SensorKind,
    pub range: u16,
    pub sensitivity: f32,
}

/// Immutable `(sensor, range) -> sensitivity` mapping.
pub struct SensitivityTable;

impl SensitivityTable {
    pub const ENTRIES: [SensitivityEntry; 11] = [
        SensitivityEntry { kind: SensorKind::Accelerometer, range: 2, sensitivity: ACCEL_2G },
        SensitivityEntry { kind: SensorKind::Accelerometer, range: 4, sensitivity: ACCEL_4G },
        SensitivityEntry { kind: SensorKind::Accelerometer, range: 8, sensitivity: ACCEL_8G },
        SensitivityEntry { kind: SensorKind::Accelerometer, range: 16, sensitivity: ACCEL_16G },
        SensitivityEntry { kind: SensorKind::Gyroscope, range: 245, sensitivity: GYRO_245DPS },
        SensitivityEntry { kind: SensorKind::Gyroscope, range: 500, sensitivity: GYRO_500DPS },
        SensitivityEntry { kind: SensorKind::Gyroscope, range: 2000, sensitivity: GYRO_2000DPS },
        SensitivityEntry { kind: SensorKind::Magnetometer, range: 4, sensitivity: MAG_4GAUSS },
        SensitivityEntry { kind: SensorKind::Magnetometer, range: 8, sensitivity: MAG_8GAUSS },
        SensitivityEntry { kind: SensorKind::Magnetometer, range: 12, sensitivity: MAG_12GAUSS },
        SensitivityEntry { kind: SensorKind::Magnetometer, range: 16, sensitivity: MAG_16GAUSS },
    ];

    /// Look up the sensitivity of a sensor at an exact range.
    /// Returns `None` for ranges the sensor does not support.
    pub const fn lookup(kind: SensorKind, range: u16) -> Option<f32> {
        let mut i = 0;
        while i < Self::ENTRIES.len() {
            let entry = &Self::ENTRIES[i];
            if entry.kind as u8 == kind as u8 && entry.range == range {
                return Some(entry.sensitivity);
            }
            i += 1;
        }
        None
    }

    /// Sensitivity for a (possibly illegal) requested range, after applying the
    /// lowest-scale fallback.
    pub const fn constrained(kind: SensorKind, range: u16) -> f32 {
        SensorScale::constrain(kind, range).sensitivity()
    }
}

/// Convert a raw register count into a physical value.
#[inline]
pub fn convert(raw: i16, sensitivity: f32) -> f32 {
    raw as f32 * sensitivity
}
