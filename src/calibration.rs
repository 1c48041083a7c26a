use crate::{gyro::Gyro, magnetometer::Mag};

/// Number of gyro samples averaged into the bias estimate
pub(crate) const GYRO_SAMPLES: u16 = 32;
/// Number of gyro samples discarded before averaging
pub(crate) const WARMUP_SAMPLES: u16 = 8;
/// Number of magnetometer samples used to find the per-axis extremes
pub(crate) const MAG_SAMPLES: u16 = 128;
/// Data-ready polls before a wait gives up
pub(crate) const MAX_POLLS: u32 = 1000;
/// Delay between data-ready polls
pub(crate) const POLL_INTERVAL_US: u32 = 100;

/// Calibration parameters.
/// (all the values that influence calibration and do not change while it runs)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationParameters {
    /// Number of gyro samples averaged into the bias (at least one is taken)
    pub gyro_samples: u16,
    /// Number of gyro samples discarded first, while the output settles
    pub warmup_samples: u16,
    /// Number of magnetometer samples scanned for extremes
    pub mag_samples: u16,
    /// Data-ready polls per sample before failing with `Error::Timeout`
    pub max_polls: u32,
    /// Delay between two data-ready polls, in microseconds
    pub poll_interval_us: u32,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            gyro_samples: GYRO_SAMPLES,
            warmup_samples: WARMUP_SAMPLES,
            mag_samples: MAG_SAMPLES,
            max_polls: MAX_POLLS,
            poll_interval_us: POLL_INTERVAL_US,
        }
    }
}

impl CalibrationParameters {
    /// Change the number of averaged gyro samples
    /// (consumes and returns `Self` to be callable in a "builder-like" pattern)
    pub fn with_gyro_samples(self, gyro_samples: u16) -> Self {
        Self {
            gyro_samples,
            ..self
        }
    }

    /// Change the number of discarded warmup samples
    /// (consumes and returns `Self` to be callable in a "builder-like" pattern)
    pub fn with_warmup_samples(self, warmup_samples: u16) -> Self {
        Self {
            warmup_samples,
            ..self
        }
    }

    /// Change the number of magnetometer samples
    /// (consumes and returns `Self` to be callable in a "builder-like" pattern)
    pub fn with_mag_samples(self, mag_samples: u16) -> Self {
        Self {
            mag_samples,
            ..self
        }
    }

    /// Change the data-ready poll budget. `u32::MAX` effectively waits forever.
    /// (consumes and returns `Self` to be callable in a "builder-like" pattern)
    pub fn with_max_polls(self, max_polls: u32) -> Self {
        Self { max_polls, ..self }
    }

    /// Change the delay between data-ready polls
    /// (consumes and returns `Self` to be callable in a "builder-like" pattern)
    pub fn with_poll_interval_us(self, poll_interval_us: u32) -> Self {
        Self {
            poll_interval_us,
            ..self
        }
    }
}

/// Holds running sums while averaging gyro samples into a bias estimate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct BiasAccumulator {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub samples: u16,
}

impl BiasAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new sample. Saturates after `u16::MAX` samples, which keeps
    /// the sums inside `i32`.
    pub fn add(&mut self, gyro: &Gyro) {
        if self.samples == u16::MAX {
            return;
        }
        self.x += gyro.x() as i32;
        self.y += gyro.y() as i32;
        self.z += gyro.z() as i32;
        self.samples += 1;
    }

    /// Compute the average (consumes `self` because the computation is done).
    /// Returns `None` when no sample was added.
    pub fn bias(self) -> Option<Gyro> {
        if self.samples == 0 {
            return None;
        }
        let n = self.samples as i32;
        Some(Gyro::new(
            (self.x / n) as i16,
            (self.y / n) as i16,
            (self.z / n) as i16,
        ))
    }
}

/// Tracks per-axis minimum and maximum while the magnetometer is rotated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MagExtremes {
    pub min: Mag,
    pub max: Mag,
    pub samples: u16,
}

impl Default for MagExtremes {
    fn default() -> Self {
        Self {
            min: Mag::new(i16::MAX, i16::MAX, i16::MAX),
            max: Mag::new(i16::MIN, i16::MIN, i16::MIN),
            samples: 0,
        }
    }
}

impl MagExtremes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mag: &Mag) {
        self.min = Mag::new(
            self.min.x.min(mag.x),
            self.min.y.min(mag.y),
            self.min.z.min(mag.z),
        );
        self.max = Mag::new(
            self.max.x.max(mag.x),
            self.max.y.max(mag.y),
            self.max.z.max(mag.z),
        );
        self.samples = self.samples.saturating_add(1);
    }

    /// Hard-iron offset that centres the observed range on zero.
    /// Returns `None` when no sample was added.
    pub fn offset(self) -> Option<Mag> {
        if self.samples == 0 {
            return None;
        }
        let mid = |min: i16, max: i16| ((min as i32 + max as i32) / 2) as i16;
        Some(Mag::new(
            mid(self.min.x, self.max.x),
            mid(self.min.y, self.max.y),
            mid(self.min.z, self.max.z),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaging_identical_samples_is_exact() {
        for bias in [Gyro::new(0, 0, 0), Gyro::new(-17, 250, 3), Gyro::new(i16::MIN, i16::MAX, -1)] {
            let mut acc = BiasAccumulator::new();
            for _ in 0..GYRO_SAMPLES {
                acc.add(&bias);
            }
            assert_eq!(acc.bias(), Some(bias));
        }
    }

    #[test]
    fn averaging_truncates_toward_zero() {
        let mut acc = BiasAccumulator::new();
        acc.add(&Gyro::new(1, -1, 10));
        acc.add(&Gyro::new(2, -2, 11));
        assert_eq!(acc.bias(), Some(Gyro::new(1, -1, 10)));
    }

    #[test]
    fn no_samples_no_bias() {
        assert_eq!(BiasAccumulator::new().bias(), None);
        assert_eq!(MagExtremes::new().offset(), None);
    }

    #[test]
    fn accumulator_does_not_overflow() {
        let mut acc = BiasAccumulator::new();
        for _ in 0..u16::MAX as u32 + 10 {
            acc.add(&Gyro::new(i16::MAX, i16::MIN, 0));
        }
        assert_eq!(acc.samples, u16::MAX);
        assert_eq!(acc.bias(), Some(Gyro::new(i16::MAX, i16::MIN, 0)));
    }

    #[test]
    fn mag_offset_is_midpoint() {
        let mut extremes = MagExtremes::new();
        extremes.add(&Mag::new(-300, 100, i16::MIN));
        extremes.add(&Mag::new(500, 900, i16::MAX));
        extremes.add(&Mag::new(0, 400, 0));
        assert_eq!(extremes.min, Mag::new(-300, 100, i16::MIN));
        assert_eq!(extremes.max, Mag::new(500, 900, i16::MAX));
        assert_eq!(extremes.offset(), Some(Mag::new(100, 500, 0)));
    }

    #[test]
    fn builder() {
        let parameters = CalibrationParameters::default()
            .with_gyro_samples(4)
            .with_warmup_samples(0)
            .with_mag_samples(2)
            .with_max_polls(3)
            .with_poll_interval_us(0);
        assert_eq!(
            parameters,
            CalibrationParameters {
                gyro_samples: 4,
                warmup_samples: 0,
                mag_samples: 2,
                max_polls: 3,
                poll_interval_us: 0,
            }
        );
    }
}
