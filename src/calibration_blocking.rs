//! Blocking Calibration Implementation
//!
//! Synchronous versions of the calibration routines:
//! - Averaging resting gyro samples into a zero-rate bias
//! - Sweeping the magnetometer for its hard-iron offset
//!
//! Every sample waits for the data-ready flag with a bounded number of polls,
//! so a stalled sensor ends the routine with `Error::Timeout`.

use crate::{
    calibration::{BiasAccumulator, CalibrationParameters, MagExtremes},
    error::Error,
    gyro::Gyro,
    magnetometer::{Mag, MagAxes},
    sensor::Lsm9ds1,
};
use embedded_hal::{delay::DelayNs, spi::SpiDevice};

/// Average resting gyro samples (after discarding the warmup samples)
pub fn collect_gyro_bias<XG, M>(
    imu: &mut Lsm9ds1<XG, M>,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<Gyro, Error<XG::Error>>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    for _ in 0..parameters.warmup_samples {
        imu.wait_for_gyro_data(delay, parameters.max_polls, parameters.poll_interval_us)?;
        _ = imu.gyro()?;
    }

    let mut accumulator = BiasAccumulator::new();
    for _ in 0..parameters.gyro_samples.max(1) {
        imu.wait_for_gyro_data(delay, parameters.max_polls, parameters.poll_interval_us)?;
        accumulator.add(&imu.gyro()?);
    }

    Ok(accumulator.bias().unwrap_or_default())
}

/// Measure the gyro bias and store it in the driver's session
pub fn calibrate_gyro<XG, M>(
    imu: &mut Lsm9ds1<XG, M>,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<Gyro, Error<XG::Error>>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    info!("gyro calibration: {} samples", parameters.gyro_samples);
    let bias = collect_gyro_bias(imu, delay, parameters)?;
    imu.session_mut().set_gyro_bias(bias);
    info!("gyro bias: {} {} {}", bias.x(), bias.y(), bias.z());
    Ok(bias)
}

/// Clear the device offset, track per-axis extremes and load their midpoint
/// as the new hard-iron offset
pub fn calibrate_mag<XG, M>(
    imu: &mut Lsm9ds1<XG, M>,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<Mag, Error<XG::Error>>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    info!("mag calibration: {} samples", parameters.mag_samples);
    imu.set_mag_offset(&Mag::default())?;

    let mut extremes = MagExtremes::new();
    for _ in 0..parameters.mag_samples.max(1) {
        imu.wait_for_mag_data(
            delay,
            MagAxes::All,
            parameters.max_polls,
            parameters.poll_interval_us,
        )?;
        extremes.add(&imu.mag()?);
    }

    let offset = extremes.offset().unwrap_or_default();
    imu.set_mag_offset(&offset)?;
    info!("mag offset: {} {} {}", offset.x(), offset.y(), offset.z());
    Ok(offset)
}
