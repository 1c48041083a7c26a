//! Calibration and conversion state for one device.
//!
//! A [`Session`] owns everything that turns raw counts into calibrated
//! physical values: the current full-scale settings, the gyro zero-rate bias,
//! a mirror of the magnetometer hard-iron offset, and the pitch/roll filter.
//! It performs no bus I/O, so it can be driven from recorded samples as well as
//! from the driver.

use crate::{
    accel::{Accel, AccelF32, AccelFullScale},
    config::Config,
    gyro::{Gyro, GyroF32, GyroFullScale},
    magnetometer::{Mag, MagF32, MagFullScale},
    orientation::{ComplementaryFilter, Orientation},
};

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Session {
    accel_scale: AccelFullScale,
    gyro_scale: GyroFullScale,
    mag_scale: MagFullScale,
    gyro_bias: Option<Gyro>,
    mag_offset: Option<Mag>,
    filter: ComplementaryFilter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            accel_scale: config.accel_scale,
            gyro_scale: config.gyro_scale,
            mag_scale: config.mag_scale,
            gyro_bias: None,
            mag_offset: None,
            filter: ComplementaryFilter::new(config.filter_alpha),
        }
    }

    pub fn accel_scale(&self) -> AccelFullScale {
        self.accel_scale
    }

    pub fn gyro_scale(&self) -> GyroFullScale {
        self.gyro_scale
    }

    pub fn mag_scale(&self) -> MagFullScale {
        self.mag_scale
    }

    /// Select the accelerometer range in g. Illegal requests select ±2 g.
    pub fn constrain_accel_scale(&mut self, range: u16) -> AccelFullScale {
        self.accel_scale = AccelFullScale::constrain(range);
        if self.accel_scale.range() != range {
            warn!("accel range {} not supported, using {}", range, self.accel_scale.range());
        }
        self.accel_scale
    }

    /// Select the gyroscope range in dps. Illegal requests select ±245 dps.
    ///
    /// A recorded bias is rescaled to counts of the new range, so it keeps
    /// the same physical value.
    pub fn constrain_gyro_scale(&mut self, range: u16) -> GyroFullScale {
        let previous = self.gyro_scale;
        self.gyro_scale = GyroFullScale::constrain(range);
        if self.gyro_scale.range() != range {
            warn!("gyro range {} not supported, using {}", range, self.gyro_scale.range());
        }
        if let Some(bias) = self.gyro_bias {
            if previous != self.gyro_scale {
                let ratio = previous.sensitivity() / self.gyro_scale.sensitivity();
                let rescale = |counts: i16| libm::roundf(counts as f32 * ratio) as i16;
                self.gyro_bias = Some(Gyro::new(
                    rescale(bias.x()),
                    rescale(bias.y()),
                    rescale(bias.z()),
                ));
            }
        }
        self.gyro_scale
    }

    /// Select the magnetometer range in gauss. Illegal requests select ±4 gauss.
    pub fn constrain_mag_scale(&mut self, range: u16) -> MagFullScale {
        self.mag_scale = MagFullScale::constrain(range);
        if self.mag_scale.range() != range {
            warn!("mag range {} not supported, using {}", range, self.mag_scale.range());
        }
        self.mag_scale
    }

    /// Whether a gyro bias has been recorded. Once calibrated the session
    /// stays calibrated; a new calibration only replaces the estimate.
    pub fn is_gyro_calibrated(&self) -> bool {
        self.gyro_bias.is_some()
    }

    pub fn gyro_bias(&self) -> Option<Gyro> {
        self.gyro_bias
    }

    pub fn set_gyro_bias(&mut self, bias: Gyro) {
        self.gyro_bias = Some(bias);
    }

    /// Last hard-iron offset written to the magnetometer
    pub fn mag_offset(&self) -> Option<Mag> {
        self.mag_offset
    }

    pub fn set_mag_offset(&mut self, offset: Mag) {
        self.mag_offset = Some(offset);
    }

    /// Raw gyro sample minus the bias (unchanged while uncalibrated)
    pub fn correct_gyro(&self, raw: &Gyro) -> Gyro {
        match &self.gyro_bias {
            Some(bias) => raw.corrected(bias),
            None => *raw,
        }
    }

    /// Bias-corrected angular rate in dps
    pub fn angular_rate(&self, raw: &Gyro) -> GyroF32 {
        self.correct_gyro(raw).scaled(self.gyro_scale)
    }

    /// Acceleration in g
    pub fn acceleration(&self, raw: &Accel) -> AccelF32 {
        raw.scaled(self.accel_scale)
    }

    /// Magnetic field in gauss (the device already removed the hard-iron offset)
    pub fn magnetic_field(&self, raw: &Mag) -> MagF32 {
        raw.scaled(self.mag_scale)
    }

    /// Convert one accelerometer/gyro sample pair and fold it into the pitch/roll
    /// estimate. `dt` is the time since the previous update in seconds.
    pub fn update_orientation(&mut self, accel: &Accel, gyro: &Gyro, dt: f32) -> Orientation {
        let accel = self.acceleration(accel);
        let rate = self.angular_rate(gyro);
        self.filter.update(&accel, &rate, dt)
    }

    /// Current pitch/roll estimate
    pub fn orientation(&self) -> Orientation {
        self.filter.estimate()
    }

    pub fn filter(&self) -> &ComplementaryFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut ComplementaryFilter {
        &mut self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::BiasAccumulator;

    #[test]
    fn starts_uncalibrated_with_configured_scales() {
        let session = Session::new(&Config::default().with_gyro_range(500).with_mag_range(16));
        assert!(!session.is_gyro_calibrated());
        assert_eq!(session.gyro_scale(), GyroFullScale::Dps500);
        assert_eq!(session.mag_scale(), MagFullScale::Gauss16);
        assert_eq!(session.accel_scale(), AccelFullScale::G2);
        assert_eq!(session.correct_gyro(&Gyro::new(5, 6, 7)), Gyro::new(5, 6, 7));
    }

    #[test]
    fn constrain_updates_state() {
        let mut session = Session::default();
        assert_eq!(session.constrain_accel_scale(8), AccelFullScale::G8);
        assert_eq!(session.accel_scale(), AccelFullScale::G8);
        assert_eq!(session.constrain_accel_scale(9), AccelFullScale::G2);
        assert_eq!(session.accel_scale(), AccelFullScale::G2);
        assert_eq!(session.constrain_gyro_scale(2000), GyroFullScale::Dps2000);
        assert_eq!(session.constrain_gyro_scale(1), GyroFullScale::Dps245);
    }

    #[test]
    fn illegal_mag_scale_matches_lowest() {
        let mut a = Session::default();
        let mut b = Session::default();
        a.constrain_mag_scale(16);
        b.constrain_mag_scale(16);
        a.constrain_mag_scale(6);
        b.constrain_mag_scale(4);
        assert_eq!(a.mag_scale(), b.mag_scale());
        let raw = Mag::new(1234, -4321, 77);
        assert_eq!(a.magnetic_field(&raw), b.magnetic_field(&raw));
    }

    #[test]
    fn calibration_sample_reads_back_as_zero() {
        let sample = Gyro::new(-42, 17, 250);
        let mut acc = BiasAccumulator::new();
        for _ in 0..16 {
            acc.add(&sample);
        }

        let mut session = Session::default();
        session.set_gyro_bias(acc.bias().unwrap());
        assert!(session.is_gyro_calibrated());
        assert_eq!(session.correct_gyro(&sample), Gyro::new(0, 0, 0));

        let rate = session.angular_rate(&sample);
        assert_eq!((rate.x(), rate.y(), rate.z()), (0.0, 0.0, 0.0));
    }

    #[test]
    fn calibration_is_one_way() {
        let mut session = Session::default();
        session.set_gyro_bias(Gyro::new(1, 2, 3));
        session.set_gyro_bias(Gyro::new(0, 0, 0));
        assert!(session.is_gyro_calibrated());
        assert_eq!(session.gyro_bias(), Some(Gyro::new(0, 0, 0)));
    }

    #[test]
    fn one_g_end_to_end() {
        let session = Session::default();
        let g = session.acceleration(&Accel::new(0, 0, 16384));
        assert_eq!(g.x(), 0.0);
        assert_eq!(g.y(), 0.0);
        assert!((g.z() - 1.0).abs() < 0.001);
    }

    #[test]
    fn orientation_uses_bias_corrected_rates() {
        let mut session = Session::new(&Config::default().with_filter_alpha(1.0));
        session.set_gyro_bias(Gyro::new(100, 100, 100));
        let level = Accel::new(0, 0, 16384);

        session.update_orientation(&level, &Gyro::new(100, 100, 100), 0.01);
        // the biased-but-still sensor integrates nothing
        let out = session.update_orientation(&level, &Gyro::new(100, 100, 100), 1.0);
        assert!(out.pitch.abs() < 1e-4);
        assert!(out.roll.abs() < 1e-4);

        // 1143 counts above bias at 245 dps is ~10 dps
        let out = session.update_orientation(&level, &Gyro::new(1243, 100, 100), 1.0);
        assert!((out.roll - 1143.0 * 0.00875).abs() < 1e-3);
        assert_eq!(session.orientation(), out);
    }

    #[test]
    fn bias_follows_gyro_scale_changes() {
        let mut session = Session::default();
        session.set_gyro_bias(Gyro::new(800, -400, 3));
        let before = session.angular_rate(&Gyro::new(0, 0, 0));

        // 245 -> 2000 dps: 0.00875 / 0.07 = 1/8
        session.constrain_gyro_scale(2000);
        assert_eq!(session.gyro_bias(), Some(Gyro::new(100, -50, 0)));
        let after = session.angular_rate(&Gyro::new(0, 0, 0));
        assert!((before.x() - after.x()).abs() < 1e-3);
        assert!((before.y() - after.y()).abs() < 1e-3);

        // same range again leaves it alone
        session.constrain_gyro_scale(2000);
        assert_eq!(session.gyro_bias(), Some(Gyro::new(100, -50, 0)));

        session.constrain_gyro_scale(500);
        assert_eq!(session.gyro_bias(), Some(Gyro::new(400, -200, 0)));
    }
}
