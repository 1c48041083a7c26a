//! LSM9DS1 Device Configuration
//!
//! The configuration applied at bring-up covers:
//! - Full-scale ranges of the three sensors
//! - Output data rates
//! - Magnetometer performance mode (noise vs. power)
//! - How long to wait for the dies to identify themselves
//! - The complementary filter coefficient used for pitch/roll
//!
//! Ranges are requested in physical units and constrained on the way in, so a
//! `Config` never holds an illegal scale.

use crate::{
    accel::AccelFullScale, gyro::GyroFullScale, magnetometer::MagFullScale,
    orientation::DEFAULT_ALPHA,
};

/// Default number of `WHO_AM_I` reads before giving up on a die
pub const IDENTITY_ATTEMPTS: u32 = 100;

/// Gyroscope output data rate. The discriminant is the `ODR_G` field of
/// `CTRL_REG1_G`; the accelerometer runs at the same rate when both are on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GyroDataRate {
    PowerDown = 0,
    Hz14_9 = 1,
    Hz59_5 = 2,
    Hz119 = 3,
    Hz238 = 4,
    Hz476 = 5,
    Hz952 = 6,
}

/// Accelerometer output data rate. The discriminant is the `ODR_XL` field of
/// `CTRL_REG6_XL`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccelDataRate {
    PowerDown = 0,
    Hz10 = 1,
    Hz50 = 2,
    Hz119 = 3,
    Hz238 = 4,
    Hz476 = 5,
    Hz952 = 6,
}

/// Magnetometer output data rate. The discriminant is the `DO` field of
/// `CTRL_REG1_M`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MagDataRate {
    Hz0_625 = 0,
    Hz1_25 = 1,
    Hz2_5 = 2,
    Hz5 = 3,
    Hz10 = 4,
    Hz20 = 5,
    Hz40 = 6,
    Hz80 = 7,
}

/// Magnetometer operating mode per axis group.
///
/// Higher performance modes lower the noise floor at the cost of current.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MagPerformance {
    LowPower = 0,
    Medium = 1,
    High = 2,
    UltraHigh = 3,
}

/// Bring-up configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    pub accel_scale: AccelFullScale,
    pub gyro_scale: GyroFullScale,
    pub mag_scale: MagFullScale,
    pub accel_rate: AccelDataRate,
    pub gyro_rate: GyroDataRate,
    pub mag_rate: MagDataRate,
    pub mag_performance: MagPerformance,
    /// Number of `WHO_AM_I` reads per die before initialization fails
    pub identity_attempts: u32,
    /// Weight of the integrated gyro angle in the complementary filter
    pub filter_alpha: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accel_scale: AccelFullScale::G2,
            gyro_scale: GyroFullScale::Dps245,
            mag_scale: MagFullScale::Gauss4,
            accel_rate: AccelDataRate::Hz952,
            gyro_rate: GyroDataRate::Hz952,
            mag_rate: MagDataRate::Hz80,
            mag_performance: MagPerformance::UltraHigh,
            identity_attempts: IDENTITY_ATTEMPTS,
            filter_alpha: DEFAULT_ALPHA,
        }
    }
}

impl Config {
    /// Request an accelerometer range in g (illegal values select ±2 g)
    pub fn with_accel_range(self, g: u16) -> Self {
        Self {
            accel_scale: AccelFullScale::constrain(g),
            ..self
        }
    }

    /// Request a gyroscope range in dps (illegal values select ±245 dps)
    pub fn with_gyro_range(self, dps: u16) -> Self {
        Self {
            gyro_scale: GyroFullScale::constrain(dps),
            ..self
        }
    }

    /// Request a magnetometer range in gauss (illegal values select ±4 gauss)
    pub fn with_mag_range(self, gauss: u16) -> Self {
        Self {
            mag_scale: MagFullScale::constrain(gauss),
            ..self
        }
    }

    pub fn with_accel_rate(self, accel_rate: AccelDataRate) -> Self {
        Self { accel_rate, ..self }
    }

    pub fn with_gyro_rate(self, gyro_rate: GyroDataRate) -> Self {
        Self { gyro_rate, ..self }
    }

    pub fn with_mag_rate(self, mag_rate: MagDataRate) -> Self {
        Self { mag_rate, ..self }
    }

    pub fn with_mag_performance(self, mag_performance: MagPerformance) -> Self {
        Self {
            mag_performance,
            ..self
        }
    }

    /// Change the identity check retry bound (at least one read is always made)
    pub fn with_identity_attempts(self, identity_attempts: u32) -> Self {
        Self {
            identity_attempts,
            ..self
        }
    }

    pub fn with_filter_alpha(self, filter_alpha: f32) -> Self {
        Self {
            filter_alpha,
            ..self
        }
    }

    /// `CTRL_REG1_G` value: `ODR_G | FS_G`, bandwidth left at its default
    pub(crate) const fn ctrl_reg1_g(&self) -> u8 {
        ((self.gyro_rate as u8) << 5) | ((self.gyro_scale as u8) << 3)
    }

    /// `CTRL_REG6_XL` value: `ODR_XL | FS_XL`
    pub(crate) const fn ctrl_reg6_xl(&self) -> u8 {
        ((self.accel_rate as u8) << 5) | ((self.accel_scale as u8) << 3)
    }

    /// `CTRL_REG1_M` value: X/Y performance mode and output data rate
    pub(crate) const fn ctrl_reg1_m(&self) -> u8 {
        ((self.mag_performance as u8) << 5) | ((self.mag_rate as u8) << 2)
    }

    /// `CTRL_REG2_M` value: full scale
    pub(crate) const fn ctrl_reg2_m(&self) -> u8 {
        (self.mag_scale as u8) << 5
    }

    /// `CTRL_REG4_M` value: Z-axis performance mode
    pub(crate) const fn ctrl_reg4_m(&self) -> u8 {
        (self.mag_performance as u8) << 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_register_values() {
        let config = Config::default();
        assert_eq!(config.ctrl_reg1_g(), 0b1100_0000);
        assert_eq!(config.ctrl_reg6_xl(), 0b1100_0000);
        assert_eq!(config.ctrl_reg1_m(), 0b0111_1100);
        assert_eq!(config.ctrl_reg2_m(), 0x00);
        assert_eq!(config.ctrl_reg4_m(), 0b0000_1100);
    }

    #[test]
    fn ranges_are_constrained() {
        let config = Config::default()
            .with_accel_range(16)
            .with_gyro_range(2000)
            .with_mag_range(12);
        assert_eq!(config.accel_scale, AccelFullScale::G16);
        assert_eq!(config.gyro_scale, GyroFullScale::Dps2000);
        assert_eq!(config.mag_scale, MagFullScale::Gauss12);
        assert_eq!(config.ctrl_reg1_g(), 0b1101_1000);
        assert_eq!(config.ctrl_reg6_xl(), 0b1100_1000);
        assert_eq!(config.ctrl_reg2_m(), 0b0100_0000);

        let config = config.with_accel_range(3).with_gyro_range(1000).with_mag_range(6);
        assert_eq!(config.accel_scale, AccelFullScale::G2);
        assert_eq!(config.gyro_scale, GyroFullScale::Dps245);
        assert_eq!(config.mag_scale, MagFullScale::Gauss4);
    }
}
