use crate::{
    calibration::{BiasAccumulator, CalibrationParameters, MagExtremes},
    error::Error,
    gyro::Gyro,
    magnetometer::{Mag, MagAxes},
    sensor_async::Lsm9ds1,
};
use embedded_hal_async::{delay::DelayNs, spi::SpiDevice};

/// Average resting gyro samples (after discarding the warmup samples)
pub async fn collect_gyro_bias<XG, M>(
    imu: &mut Lsm9ds1<XG, M>,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<Gyro, Error<XG::Error>>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    for _ in 0..parameters.warmup_samples {
        imu.wait_for_gyro_data(delay, parameters.max_polls, parameters.poll_interval_us)
            .await?;
        _ = imu.gyro().await?;
    }

    let mut accumulator = BiasAccumulator::new();
    for _ in 0..parameters.gyro_samples.max(1) {
        imu.wait_for_gyro_data(delay, parameters.max_polls, parameters.poll_interval_us)
            .await?;
        accumulator.add(&imu.gyro().await?);
    }

    Ok(accumulator.bias().unwrap_or_default())
}

/// Measure the gyro bias and store it in the driver's session
pub async fn calibrate_gyro<XG, M>(
    imu: &mut Lsm9ds1<XG, M>,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<Gyro, Error<XG::Error>>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    info!("gyro calibration: {} samples", parameters.gyro_samples);
    let bias = collect_gyro_bias(imu, delay, parameters).await?;
    imu.session_mut().set_gyro_bias(bias);
    info!("gyro bias: {} {} {}", bias.x(), bias.y(), bias.z());
    Ok(bias)
}

/// Clear the device offset, track per-axis extremes and load their midpoint
/// as the new hard-iron offset
pub async fn calibrate_mag<XG, M>(
    imu: &mut Lsm9ds1<XG, M>,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<Mag, Error<XG::Error>>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    info!("mag calibration: {} samples", parameters.mag_samples);
    imu.set_mag_offset(&Mag::default()).await?;

    let mut extremes = MagExtremes::new();
    for _ in 0..parameters.mag_samples.max(1) {
        imu.wait_for_mag_data(
            delay,
            MagAxes::All,
            parameters.max_polls,
            parameters.poll_interval_us,
        )
        .await?;
        extremes.add(&imu.mag().await?);
    }

    let offset = extremes.offset().unwrap_or_default();
    imu.set_mag_offset(&offset).await?;
    info!("mag offset: {} {} {}", offset.x(), offset.y(), offset.z());
    Ok(offset)
}
