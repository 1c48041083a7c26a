//! Error types shared by the blocking and async drivers.
//!
//! Both front ends talk to the device through two `SpiDevice` handles with a
//! common error type `E`, so one error enum serves both.

use core::fmt::{Debug, Display, Formatter};

use crate::chip::Chip;

/// Error during initialization of the sensor. Wraps [`Error`] and hands the
/// bus handles back to the caller.
pub struct InitError<XG, M, E> {
    pub xg: XG,
    pub mag: M,
    pub error: Error<E>,
}

impl<XG, M, E> Debug for InitError<XG, M, E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.error, f)
    }
}

/// Error for sensor operations.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// SPI transfer failed
    Bus(E),
    /// The die did not answer with its identity byte
    WrongDevice { chip: Chip, found: u8 },
    /// A data-ready flag stayed low for the whole poll budget
    Timeout { chip: Chip },
}

impl<E> Display for Error<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "SPI bus error: {e:?}"),
            Self::WrongDevice { chip, found } => write!(
                f,
                "{chip:?} reported identity {found:#04x}, expected {:#04x}",
                chip.identity()
            ),
            Self::Timeout { chip } => write!(f, "{chip:?} never signalled data ready"),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::{format, string::ToString};

    #[test]
    fn display_names_the_chip() {
        let error: Error<()> = Error::WrongDevice {
            chip: Chip::Magnetometer,
            found: 0x00,
        };
        assert_eq!(
            error.to_string(),
            "Magnetometer reported identity 0x00, expected 0x3d"
        );

        let error: Error<()> = Error::Timeout {
            chip: Chip::AccelGyro,
        };
        assert_eq!(error.to_string(), "AccelGyro never signalled data ready");
    }

    #[test]
    fn init_error_debug_shows_only_the_error() {
        let error = InitError {
            xg: "xg bus",
            mag: "mag bus",
            error: Error::Bus(7u8),
        };
        assert_eq!(format!("{error:?}"), "Bus(7)");
    }
}
