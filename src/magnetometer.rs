//! Magnetometer Data Processing
//!
//! The LSM9DS1 magnetometer die measures the magnetic field along three axes
//! and outputs one signed 16-bit count per axis, low byte first. The die also
//! has hard-iron offset registers (`OFFSET_*_REG_M`) in the same format; the
//! offset is subtracted from every sample before it reaches the output
//! registers.
use crate::sensitivity::{self, convert};

/// Raw magnetometer readings vector.
/// Also used to represent the hard-iron offset written to the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "postcard-experimental", derive(postcard::experimental::max_size::MaxSize))]
pub struct Mag {
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) z: i16,
}

impl Mag {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    pub const fn from_bytes(data: [u8; 6]) -> Self {
        Self {
            x: i16::from_le_bytes([data[0], data[1]]),
            y: i16::from_le_bytes([data[2], data[3]]),
            z: i16::from_le_bytes([data[4], data[5]]),
        }
    }

    pub const fn to_bytes(&self) -> [u8; 6] {
        let x = self.x.to_le_bytes();
        let y = self.y.to_le_bytes();
        let z = self.z.to_le_bytes();
        [x[0], x[1], y[0], y[1], z[0], z[1]]
    }

    pub fn x(&self) -> i16 {
        self.x
    }

    pub fn y(&self) -> i16 {
        self.y
    }

    pub fn z(&self) -> i16 {
        self.z
    }

    pub fn scaled(&self, scale: MagFullScale) -> MagF32 {
        MagF32 {
            x: scale.scale_value(self.x),
            y: scale.scale_value(self.y),
            z: scale.scale_value(self.z),
        }
    }
}

/// Magnetometer full-scale range. The discriminant is the `FS` field
/// of `CTRL_REG2_M`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MagFullScale {
    #[default]
    Gauss4 = 0,
    Gauss8 = 1,
    Gauss12 = 2,
    Gauss16 = 3,
}

impl MagFullScale {
    /// Map a requested range in gauss onto a legal scale.
    /// Anything other than 4, 8, 12 or 16 falls back to ±4 gauss.
    pub const fn constrain(range: u16) -> Self {
        match range {
            8 => Self::Gauss8,
            12 => Self::Gauss12,
            16 => Self::Gauss16,
            _ => Self::Gauss4,
        }
    }

    /// Range in gauss
    pub const fn range(self) -> u16 {
        match self {
            Self::Gauss4 => 4,
            Self::Gauss8 => 8,
            Self::Gauss12 => 12,
            Self::Gauss16 => 16,
        }
    }

    /// gauss per LSB
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::Gauss4 => sensitivity::MAG_4GAUSS,
            Self::Gauss8 => sensitivity::MAG_8GAUSS,
            Self::Gauss12 => sensitivity::MAG_12GAUSS,
            Self::Gauss16 => sensitivity::MAG_16GAUSS,
        }
    }

    pub fn scale_value(self, value: i16) -> f32 {
        convert(value, self.sensitivity())
    }
}

/// Magnetic field in gauss.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagF32 {
    x: f32,
    y: f32,
    z: f32,
}

impl MagF32 {
    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn z(&self) -> f32 {
        self.z
    }
}

/// Axis selection for the magnetometer data-ready probe. The discriminant is
/// the bit position in `STATUS_REG_M`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MagAxes {
    X = 0,
    Y = 1,
    Z = 2,
    All = 3,
}

impl MagAxes {
    pub(crate) const fn is_ready(self, status: u8) -> bool {
        status & (1 << self as u8) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_scale_behaves_like_lowest() {
        let requested = MagFullScale::constrain(6);
        let explicit = MagFullScale::constrain(4);
        assert_eq!(requested, explicit);
        assert_eq!(requested.sensitivity(), explicit.sensitivity());
    }

    #[test]
    fn offset_bytes_round_trip_register_layout() {
        let offset = Mag::new(-2, 0x0102, 300);
        assert_eq!(offset.to_bytes(), [0xfe, 0xff, 0x02, 0x01, 0x2c, 0x01]);
        assert_eq!(Mag::from_bytes(offset.to_bytes()), offset);
    }

    #[test]
    fn status_bits() {
        assert!(MagAxes::X.is_ready(0b0000_0001));
        assert!(!MagAxes::Y.is_ready(0b0000_0001));
        assert!(MagAxes::Z.is_ready(0b0000_0100));
        assert!(MagAxes::All.is_ready(0b0000_1000));
        assert!(!MagAxes::All.is_ready(0b0000_0111));
    }

    #[test]
    fn field_at_16_gauss() {
        let field = Mag::new(1000, -1000, 0).scaled(MagFullScale::Gauss16);
        assert!((field.x() - 0.58).abs() < 1e-4);
        assert!((field.y() + 0.58).abs() < 1e-4);
    }
}
