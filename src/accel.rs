use crate::sensitivity::{self, convert};

/// Raw acceleration readings vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "postcard-experimental", derive(postcard::experimental::max_size::MaxSize))]
pub struct Accel {
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) z: i16,
}

impl Accel {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Decode `OUT_X_L_XL..OUT_Z_H_XL` (low byte first).
    pub const fn from_bytes(data: [u8; 6]) -> Self {
        Self {
            x: i16::from_le_bytes([data[0], data[1]]),
            y: i16::from_le_bytes([data[2], data[3]]),
            z: i16::from_le_bytes([data[4], data[5]]),
        }
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

    pub fn scaled(&self, scale: AccelFullScale) -> AccelF32 {
        AccelF32 {
            x: scale.scale_value(self.x),
            y: scale.scale_value(self.y),
            z: scale.scale_value(self.z),
        }
    }
}

/// Accelerometer full-scale range. The discriminant is the `FS_XL` field
/// of `CTRL_REG6_XL`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccelFullScale {
    #[default]
    G2 = 0,
    G16 = 1,
    G4 = 2,
    G8 = 3,
}

impl AccelFullScale {
    /// Map a requested range in g onto a legal scale.
    /// Anything other than 2, 4, 8 or 16 falls back to ±2 g.
    pub const fn constrain(range: u16) -> Self {
        match range {
            4 => Self::G4,
            8 => Self::G8,
            16 => Self::G16,
            _ => Self::G2,
        }
    }

    /// Range in g
    pub const fn range(self) -> u16 {
        match self {
            Self::G2 => 2,
            Self::G4 => 4,
            Self::G8 => 8,
            Self::G16 => 16,
        }
    }

    /// g per LSB
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::G2 => sensitivity::ACCEL_2G,
            Self::G4 => sensitivity::ACCEL_4G,
            Self::G8 => sensitivity::ACCEL_8G,
            Self::G16 => sensitivity::ACCEL_16G,
        }
    }

    pub fn scale_value(self, value: i16) -> f32 {
        convert(value, self.sensitivity())
    }
}

/// Acceleration in g.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelF32 {
    x: f32,
    y: f32,
    z: f32,
}

impl AccelF32 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_ranges_are_kept() {
        for scale in [AccelFullScale::G2, AccelFullScale::G4, AccelFullScale::G8, AccelFullScale::G16] {
            assert_eq!(AccelFullScale::constrain(scale.range()), scale);
        }
    }

    #[test]
    fn illegal_ranges_fall_back_to_2g() {
        for range in [0, 1, 3, 6, 12, 32, u16::MAX] {
            assert_eq!(AccelFullScale::constrain(range), AccelFullScale::G2);
        }
    }

    #[test]
    fn one_g_at_2g_scale() {
        let accel = Accel::from_bytes([0x00, 0x00, 0x00, 0x00, 0x00, 0x40]);
        assert_eq!(accel, Accel::new(0, 0, 16384));

        let g = accel.scaled(AccelFullScale::G2);
        assert_eq!(g.x(), 0.0);
        assert_eq!(g.y(), 0.0);
        assert!((g.z() - 1.0).abs() < 0.001);
    }

    #[test]
    fn bytes_are_little_endian() {
        let accel = Accel::from_bytes([0x34, 0x12, 0xff, 0xff, 0x00, 0x80]);
        assert_eq!(accel.x(), 0x1234);
        assert_eq!(accel.y(), -1);
        assert_eq!(accel.z(), i16::MIN);
    }
}
