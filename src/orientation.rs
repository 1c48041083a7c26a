//! Pitch/Roll Estimation
//!
//! The LSM9DS1 has no on-chip fusion, so attitude comes from two sources:
//! - The accelerometer gives an absolute tilt from the direction of gravity,
//!   but is noisy and disturbed by linear acceleration
//! - The gyroscope gives a smooth angular rate, but integrating it drifts
//!
//! A complementary filter blends the two: the integrated gyro angle is trusted
//! over short periods and the accelerometer angle pulls the estimate back over
//! long periods.
//!
//! ```text
//! angle = alpha * (angle + rate * dt) + (1 - alpha) * accel_angle
//! ```
//!
//! With a sample period `dt` and a time constant `tau`, `alpha = tau / (tau + dt)`.

use crate::{accel::AccelF32, gyro::GyroF32};

/// Default gyro weight (`tau` of ~0.5 s at 100 Hz)
pub const DEFAULT_ALPHA: f32 = 0.98;

const RAD_TO_DEG: f64 = 180.0 / core::f64::consts::PI;

/// Pitch and roll in degrees.
///
/// - Pitch: rotation around the Y axis, nose up positive, -90° to 90°
/// - Roll: rotation around the X axis, -180° to 180°
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orientation {
    pub pitch: f32,
    pub roll: f32,
}

/// Tilt angles implied by an accelerometer reading taken at rest.
///
/// - roll = atan2(ay, az)
/// - pitch = atan2(-ax, sqrt(ay² + az²))
pub fn accel_angles(accel: &AccelF32) -> Orientation {
    let (ax, ay, az) = (accel.x() as f64, accel.y() as f64, accel.z() as f64);
    let roll = libm::atan2(ay, az);
    let pitch = libm::atan2(-ax, libm::sqrt(ay * ay + az * az));
    Orientation {
        pitch: (pitch * RAD_TO_DEG) as f32,
        roll: (roll * RAD_TO_DEG) as f32,
    }
}

/// Map an angle in degrees into `[-180, 180)`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = libm::fmodf(angle + 180.0, 360.0);
    if wrapped < 0.0 {
        wrapped + 180.0
    } else {
        wrapped - 180.0
    }
}

/// Complementary filter over pitch and roll.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ComplementaryFilter {
    alpha: f32,
    estimate: Orientation,
    seeded: bool,
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl ComplementaryFilter {
    /// Create a filter with the given gyro weight, clamped to `[0, 1]`
    /// (a NaN weight selects [`DEFAULT_ALPHA`]).
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_nan() {
            DEFAULT_ALPHA
        } else {
            alpha.clamp(0.0, 1.0)
        };
        Self {
            alpha,
            estimate: Orientation::default(),
            seeded: false,
        }
    }

    /// Create a filter from a time constant and the expected sample period,
    /// both in seconds.
    pub fn with_time_constant(tau: f32, dt: f32) -> Self {
        if tau + dt > 0.0 {
            Self::new(tau / (tau + dt))
        } else {
            Self::new(0.0)
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Last estimate (zero until the first update)
    pub fn estimate(&self) -> Orientation {
        self.estimate
    }

    /// Forget the estimate; the next update seeds from the accelerometer again.
    pub fn reset(&mut self) {
        self.estimate = Orientation::default();
        self.seeded = false;
    }

    /// Fold one calibrated sample into the estimate. `dt` is the time since the
    /// previous sample in seconds.
    ///
    /// The first sample seeds the estimate with the accelerometer angles so the
    /// filter does not have to converge from zero.
    pub fn update(&mut self, accel: &AccelF32, gyro: &GyroF32, dt: f32) -> Orientation {
        let measured = accel_angles(accel);

        if !self.seeded {
            self.estimate = measured;
            self.seeded = true;
            return self.estimate;
        }

        let pitch = self.estimate.pitch + gyro.y() * dt;
        let roll = self.estimate.roll + gyro.x() * dt;
        // roll wraps at ±180°, so blend along the shorter arc
        let roll_error = wrap_degrees(roll - measured.roll);
        self.estimate = Orientation {
            pitch: self.alpha * pitch + (1.0 - self.alpha) * measured.pitch,
            roll: wrap_degrees(measured.roll + self.alpha * roll_error),
        };
        self.estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn level_sensor_has_zero_tilt() {
        let angles = accel_angles(&AccelF32::new(0.0, 0.0, 1.0));
        assert!(close(angles.pitch, 0.0));
        assert!(close(angles.roll, 0.0));
    }

    #[test]
    fn tilt_from_gravity() {
        // Rolled 90° onto the Y axis
        let angles = accel_angles(&AccelF32::new(0.0, 1.0, 0.0));
        assert!(close(angles.roll, 90.0));
        assert!(close(angles.pitch, 0.0));

        // Nose up 45°: gravity splits between -X and Z
        let h = core::f32::consts::FRAC_1_SQRT_2;
        let angles = accel_angles(&AccelF32::new(-h, 0.0, h));
        assert!(close(angles.pitch, 45.0));
        assert!(close(angles.roll, 0.0));
    }

    #[test]
    fn first_update_seeds_from_accelerometer() {
        let mut filter = ComplementaryFilter::new(0.98);
        let accel = AccelF32::new(0.0, 0.5, 0.866_025_4);
        let out = filter.update(&accel, &GyroF32::new(100.0, 100.0, 0.0), 1.0);
        assert!(close(out.roll, 30.0));
        assert!(close(out.pitch, 0.0));
    }

    #[test]
    fn stable_under_repeated_input_without_rotation() {
        let mut filter = ComplementaryFilter::default();
        let accel = AccelF32::new(0.2, -0.3, 0.93);
        let still = GyroF32::new(0.0, 0.0, 0.0);
        let first = filter.update(&accel, &still, 0.01);
        for _ in 0..100 {
            let next = filter.update(&accel, &still, 0.0);
            assert!(close(next.pitch, first.pitch));
            assert!(close(next.roll, first.roll));
        }
    }

    #[test]
    fn zero_dt_ignores_rate() {
        let mut filter = ComplementaryFilter::new(0.9);
        let accel = AccelF32::new(0.0, 0.0, 1.0);
        filter.update(&accel, &GyroF32::new(0.0, 0.0, 0.0), 0.01);
        let out = filter.update(&accel, &GyroF32::new(500.0, -500.0, 0.0), 0.0);
        assert!(close(out.pitch, 0.0));
        assert!(close(out.roll, 0.0));
    }

    #[test]
    fn blends_integrated_rate_with_accelerometer() {
        let mut filter = ComplementaryFilter::new(0.9);
        let level = AccelF32::new(0.0, 0.0, 1.0);
        filter.update(&level, &GyroF32::new(0.0, 0.0, 0.0), 0.0);

        // 100 dps about X for 0.1 s: the gyro says 10°, the accelerometer says 0°
        let out = filter.update(&level, &GyroF32::new(100.0, 0.0, 0.0), 0.1);
        assert!(close(out.roll, 9.0));
        assert!(close(out.pitch, 0.0));

        // pitch follows the Y rate
        let out = filter.update(&level, &GyroF32::new(0.0, -50.0, 0.0), 0.1);
        assert!(close(out.pitch, -4.5));
        assert!(close(out.roll, 8.1));
    }

    #[test]
    fn alpha_is_clamped() {
        assert_eq!(ComplementaryFilter::new(1.5).alpha(), 1.0);
        assert_eq!(ComplementaryFilter::new(-0.1).alpha(), 0.0);
        assert_eq!(ComplementaryFilter::new(f32::NAN).alpha(), DEFAULT_ALPHA);
        assert!(close(ComplementaryFilter::with_time_constant(0.49, 0.01).alpha(), 0.98));
        assert_eq!(ComplementaryFilter::with_time_constant(0.0, 0.0).alpha(), 0.0);
    }

    #[test]
    fn reset_reseeds() {
        let mut filter = ComplementaryFilter::new(0.5);
        filter.update(&AccelF32::new(0.0, 0.0, 1.0), &GyroF32::new(0.0, 0.0, 0.0), 0.0);
        filter.reset();
        assert_eq!(filter.estimate(), Orientation::default());
        let out = filter.update(&AccelF32::new(0.0, 1.0, 0.0), &GyroF32::new(0.0, 0.0, 0.0), 0.0);
        assert!(close(out.roll, 90.0));
    }

    #[test]
    fn wraps_into_half_open_range() {
        assert!(close(wrap_degrees(190.0), -170.0));
        assert!(close(wrap_degrees(-190.0), 170.0));
        assert!(close(wrap_degrees(180.0), -180.0));
        assert!(close(wrap_degrees(-180.0), -180.0));
        assert!(close(wrap_degrees(725.0), 5.0));
        assert!(close(wrap_degrees(42.0), 42.0));
    }

    #[test]
    fn roll_stays_continuous_when_upside_down() {
        let upside_down = |deg: f32| {
            let rad = deg.to_radians();
            AccelF32::new(0.0, libm::sinf(rad), libm::cosf(rad))
        };
        let still = GyroF32::new(0.0, 0.0, 0.0);
        let mut filter = ComplementaryFilter::new(0.98);

        let seeded = filter.update(&upside_down(179.0), &still, 0.01);
        assert!((seeded.roll - 179.0).abs() < 0.01);

        // the accelerometer crossed to -179°: two degrees away, not 358
        let out = filter.update(&upside_down(-179.0), &still, 0.01);
        assert!(wrap_degrees(out.roll - 179.04).abs() < 0.01, "roll {}", out.roll);
        assert!((-180.0..180.0).contains(&out.roll));

        for _ in 0..500 {
            filter.update(&upside_down(-179.0), &still, 0.01);
        }
        assert!((filter.estimate().roll + 179.0).abs() < 0.01);
    }
}
