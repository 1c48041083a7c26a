/// Operating mode of the accelerometer/gyroscope FIFO (`FMODE` field of
/// `FIFO_CTRL`).
///
/// The FIFO holds up to 32 samples of gyro and accelerometer data:
/// - `Bypass`: FIFO off, output registers hold the newest sample
/// - `StopWhenFull`: collect until full, then stop
/// - `ContinuousUntilTrigger`: continuous until the trigger deasserts, then FIFO mode
/// - `BypassUntilTrigger`: bypass until the trigger deasserts, then continuous
/// - `Continuous`: newest sample overwrites the oldest when full
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FifoMode {
    #[default]
    Bypass = 0,
    StopWhenFull = 1,
    ContinuousUntilTrigger = 3,
    BypassUntilTrigger = 4,
    Continuous = 6,
}

/// Largest FIFO threshold the `FTH` field can hold
pub const MAX_FIFO_THRESHOLD: u8 = 31;

/// FIFO mode plus threshold level.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fifo {
    pub mode: FifoMode,
    /// Threshold level, clamped to [`MAX_FIFO_THRESHOLD`] when written
    pub threshold: u8,
}

impl Fifo {
    pub fn new(mode: FifoMode, threshold: u8) -> Self {
        Self { mode, threshold }
    }

    /// FIFO off.
    pub fn bypass() -> Self {
        Self::default()
    }

    /// `FIFO_CTRL` value: `FMODE[7:5] | FTH[4:0]`
    pub(crate) fn to_byte(self) -> u8 {
        ((self.mode as u8) << 5) | self.threshold.min(MAX_FIFO_THRESHOLD)
    }
}

/// Decoded `FIFO_SRC` register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct FifoStatus {
    /// Fill level reached the threshold
    pub threshold_reached: bool,
    /// FIFO is full and at least one sample was overwritten
    pub overrun: bool,
    /// Number of unread samples
    pub samples: u8,
}

impl FifoStatus {
    pub(crate) fn from_byte(byte: u8) -> Self {
        Self {
            threshold_reached: (byte & 0b1000_0000) != 0,
            overrun: (byte & 0b0100_0000) != 0,
            samples: byte & 0b0011_1111,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(Fifo::new(FifoMode::Continuous, 200).to_byte(), 0b1101_1111);
        assert_eq!(Fifo::new(FifoMode::StopWhenFull, 10).to_byte(), 0b0010_1010);
        assert_eq!(Fifo::bypass().to_byte(), 0);
    }

    #[test]
    fn status_decoding() {
        let status = FifoStatus::from_byte(0b1110_0000);
        assert!(status.threshold_reached);
        assert!(status.overrun);
        assert_eq!(status.samples, 32);

        let status = FifoStatus::from_byte(0b0000_0101);
        assert!(!status.threshold_reached);
        assert!(!status.overrun);
        assert_eq!(status.samples, 5);
    }
}
