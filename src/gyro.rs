use crate::sensitivity::{self, convert};

/// Raw gyro readings vector.
/// Also used to represent the gyro zero-rate bias estimate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "postcard-experimental", derive(postcard::experimental::max_size::MaxSize))]
pub struct Gyro {
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) z: i16,
}

impl Gyro {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Decode `OUT_X_L_G..OUT_Z_H_G` (low byte first).
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

    /// Component-wise `self - bias`, saturating at the `i16` limits.
    pub fn corrected(&self, bias: &Gyro) -> Gyro {
        Gyro {
            x: self.x.saturating_sub(bias.x),
            y: self.y.saturating_sub(bias.y),
            z: self.z.saturating_sub(bias.z),
        }
    }

    pub fn scaled(&self, scale: GyroFullScale) -> GyroF32 {
        GyroF32 {
            x: scale.scale_value(self.x),
            y: scale.scale_value(self.y),
            z: scale.scale_value(self.z),
        }
    }
}

/// Gyroscope full-scale range. The discriminant is the `FS_G` field
/// of `CTRL_REG1_G` (code 2 is not available).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GyroFullScale {
    #[default]
    Dps245 = 0,
    Dps500 = 1,
    Dps2000 = 3,
}

impl GyroFullScale {
    /// Map a requested range in dps onto a legal scale.
    /// Anything other than 245, 500 or 2000 falls back to ±245 dps.
    pub const fn constrain(range: u16) -> Self {
        match range {
            500 => Self::Dps500,
            2000 => Self::Dps2000,
            _ => Self::Dps245,
        }
    }

    /// Range in dps
    pub const fn range(self) -> u16 {
        match self {
            Self::Dps245 => 245,
            Self::Dps500 => 500,
            Self::Dps2000 => 2000,
        }
    }

    /// dps per LSB
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::Dps245 => sensitivity::GYRO_245DPS,
            Self::Dps500 => sensitivity::GYRO_500DPS,
            Self::Dps2000 => sensitivity::GYRO_2000DPS,
        }
    }

    pub fn scale_value(self, value: i16) -> f32 {
        convert(value, self.sensitivity())
    }
}

/// Angular rate in degrees per second.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GyroF32 {
    x: f32,
    y: f32,
    z: f32,
}

impl GyroF32 {
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
