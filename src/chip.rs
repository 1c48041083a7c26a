//! LSM9DS1 Chip-Select Targets
//!
//! The accelerometer/gyroscope and the magnetometer sit behind separate
//! chip-select lines and answer to their own `WHO_AM_I` register:
//! - Accelerometer/gyroscope (`CS_A/G`): 0x68
//! - Magnetometer (`CS_M`): 0x3D

use crate::registers::{WHO_AM_I_M_VALUE, WHO_AM_I_XG_VALUE};

/// One of the two dies of the LSM9DS1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Chip {
    /// Accelerometer and gyroscope die
    AccelGyro,
    /// Magnetometer die
    Magnetometer,
}

impl Chip {
    /// Identity byte the die must report before it is used
    pub const fn identity(self) -> u8 {
        match self {
            Self::AccelGyro => WHO_AM_I_XG_VALUE,
            Self::Magnetometer => WHO_AM_I_M_VALUE,
        }
    }
}
