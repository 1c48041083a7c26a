//! Interrupt configuration for the LSM9DS1.
//!
//! The accelerometer/gyroscope die routes its interrupt sources to the INT1
//! and INT2 pins; the magnetometer die has its own INT_M pin driven by a
//! threshold comparator. This module only encodes and decodes register values,
//! the driver writes them.

use bitflags::bitflags;

/// Gyroscope axis selection for the threshold comparator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GyroAxis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Gyroscope threshold for one axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GyroThreshold {
    pub axis: GyroAxis,
    /// 15-bit threshold in raw gyro counts
    pub threshold: u16,
    /// Samples the rate must stay past the threshold (7 bits)
    pub duration: u8,
    /// Also wait `duration` samples before clearing the interrupt
    pub wait: bool,
}

impl GyroThreshold {
    /// `INT_GEN_THS_*H_G`, `INT_GEN_THS_*L_G`
    pub(crate) const fn threshold_bytes(&self) -> [u8; 2] {
        [((self.threshold & 0x7F00) >> 8) as u8, (self.threshold & 0x00FF) as u8]
    }

    /// `INT_GEN_DUR_G`
    pub(crate) const fn duration_byte(&self) -> u8 {
        ((self.wait as u8) << 7) | (self.duration & 0x7F)
    }
}

/// High/low events of the gyro interrupt generator (`INT_GEN_CFG_G[5:0]`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GyroEvents(u8);

bitflags! {
    impl GyroEvents: u8 {
        const X_LOW = 1 << 0;
        const X_HIGH = 1 << 1;
        const Y_LOW = 1 << 2;
        const Y_HIGH = 1 << 3;
        const Z_LOW = 1 << 4;
        const Z_HIGH = 1 << 5;
    }
}

/// Gyroscope interrupt generator configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GyroInterrupt {
    pub events: GyroEvents,
    /// Fire only when all events hold (AND) instead of any (OR)
    pub and_events: bool,
    /// Keep the interrupt asserted until the source register is read
    pub latch: bool,
}

impl GyroInterrupt {
    /// `INT_GEN_CFG_G`
    pub(crate) const fn to_byte(self) -> u8 {
        self.events.bits() | ((self.and_events as u8) << 7) | ((self.latch as u8) << 6)
    }

    /// Decode `INT_GEN_SRC_G`: the events that fired, if the interrupt is active.
    pub(crate) const fn decode_source(byte: u8) -> Option<GyroEvents> {
        if byte & 0b0100_0000 != 0 {
            Some(GyroEvents::from_bits_truncate(byte))
        } else {
            None
        }
    }
}

/// Inactivity detection.
///
/// When the gyro stays below `threshold` for `duration` (in ODR periods) the
/// `INACT` status bit is set and the gyro sleeps or powers down.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Inactivity {
    pub duration: u8,
    /// 7-bit activity threshold
    pub threshold: u8,
    /// Gyro enters sleep (true) or power-down (false) while inactive
    pub gyro_sleep: bool,
}

impl Inactivity {
    /// `ACT_THS`
    pub(crate) const fn threshold_byte(&self) -> u8 {
        (self.threshold & 0x7F) | ((self.gyro_sleep as u8) << 7)
    }

    /// `INACT` flag of `STATUS_REG`
    pub(crate) const fn is_inactive(status: u8) -> bool {
        status & 0b0001_0000 != 0
    }
}

/// Accelerometer/gyroscope interrupt pins.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum InterruptPin {
    Int1,
    Int2,
}

/// Interrupt sources routed to INT1 or INT2 (`INT1_CTRL` / `INT2_CTRL`).
///
/// Bits 2, 6 and 7 mean different things on each pin; the names say which.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PinSources(u8);

bitflags! {
    impl PinSources: u8 {
        const ACCEL_DATA_READY = 1 << 0;
        const GYRO_DATA_READY = 1 << 1;
        /// INT1 only
        const BOOT_STATUS = 1 << 2;
        /// INT2 only
        const TEMP_DATA_READY = 1 << 2;
        const FIFO_THRESHOLD = 1 << 3;
        const FIFO_OVERRUN = 1 << 4;
        const FIFO_FULL = 1 << 5;
        /// INT1 only
        const ACCEL_INTERRUPT = 1 << 6;
        /// INT1 only
        const GYRO_INTERRUPT = 1 << 7;
        /// INT2 only
        const INACTIVITY = 1 << 7;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ActiveLevel {
    #[default]
    High,
    Low,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PinMode {
    #[default]
    PushPull,
    OpenDrain,
}

/// Routing and electrical mode of one interrupt pin.
///
/// Both pins share the level and drive settings in `CTRL_REG8`, so the last
/// configured pin wins.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PinConfig {
    pub pin: InterruptPin,
    pub sources: PinSources,
    pub level: ActiveLevel,
    pub mode: PinMode,
}

impl PinConfig {
    /// Apply `H_LACTIVE` (bit 5) and `PP_OD` (bit 4) to a `CTRL_REG8` value
    pub(crate) const fn apply_ctrl_reg8(&self, value: u8) -> u8 {
        let mut value = value;
        value = match self.level {
            ActiveLevel::High => value & !(1 << 5),
            ActiveLevel::Low => value | (1 << 5),
        };
        match self.mode {
            PinMode::PushPull => value & !(1 << 4),
            PinMode::OpenDrain => value | (1 << 4),
        }
    }
}

/// Magnetometer threshold interrupt configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MagInterrupt {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub level: ActiveLevel,
    /// Keep INT_M asserted until `INT_SRC_M` is read
    pub latch: bool,
}

impl MagInterrupt {
    /// `INT_CFG_M`: axis enables, `IEA` (active high), `IEL` (0 = latched), `IEN`
    pub(crate) const fn to_byte(self) -> u8 {
        let mut value = ((self.x as u8) << 7) | ((self.y as u8) << 6) | ((self.z as u8) << 5);
        if matches!(self.level, ActiveLevel::High) {
            value |= 1 << 2;
        }
        if !self.latch {
            value |= 1 << 1;
        }
        if value & 0b1110_0000 != 0 {
            value |= 1 << 0;
        }
        value
    }

    /// `INT_THS_L_M`, `INT_THS_H_M` for a 15-bit unsigned threshold
    pub(crate) const fn threshold_bytes(threshold: u16) -> [u8; 2] {
        [(threshold & 0x00FF) as u8, ((threshold & 0x7F00) >> 8) as u8]
    }
}

/// Decoded `INT_SRC_M`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MagInterruptSource {
    pub positive_x: bool,
    pub positive_y: bool,
    pub positive_z: bool,
    pub negative_x: bool,
    pub negative_y: bool,
    pub negative_z: bool,
    /// Internal measurement range overflow
    pub overflow: bool,
}

impl MagInterruptSource {
    /// Decode the source register, `None` when no interrupt is pending.
    pub(crate) const fn decode(byte: u8) -> Option<Self> {
        if byte & 0b0000_0001 == 0 {
            return None;
        }
        Some(Self {
            positive_x: byte & (1 << 7) != 0,
            positive_y: byte & (1 << 6) != 0,
            positive_z: byte & (1 << 5) != 0,
            negative_x: byte & (1 << 4) != 0,
            negative_y: byte & (1 << 3) != 0,
            negative_z: byte & (1 << 2) != 0,
            overflow: byte & (1 << 1) != 0,
        })
    }
}
