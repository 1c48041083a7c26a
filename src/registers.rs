//! LSM9DS1 Register Addresses
//!
//! The LSM9DS1 is two dies in one package, each with its own chip select and
//! its own register space:
//! - The accelerometer/gyroscope die (`XgRegister`)
//! - The magnetometer die (`MagRegister`)
//!
//! Only the registers this driver touches are listed.

/// SPI address bit selecting a read transfer
pub(crate) const SPI_READ: u8 = 0x80;

/// Magnetometer SPI address bit enabling address auto-increment
pub(crate) const MAG_AUTO_INCREMENT: u8 = 0x40;

/// Expected `WHO_AM_I` response of the accelerometer/gyroscope die
pub const WHO_AM_I_XG_VALUE: u8 = 0x68;

/// Expected `WHO_AM_I_M` response of the magnetometer die
pub const WHO_AM_I_M_VALUE: u8 = 0x3D;

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum XgRegister {
    /// Activity threshold and gyro behaviour during inactivity
    ActThs = 0x04,
    /// Inactivity duration
    ActDur = 0x05,
    /// INT1 pin routing
    Int1Ctrl = 0x0C,
    /// INT2 pin routing
    Int2Ctrl = 0x0D,
    /// Device identity (0x68)
    WhoAmI = 0x0F,

    /// Gyro output data rate, full scale and bandwidth
    CtrlReg1G = 0x10,
    /// Gyro output path selection
    CtrlReg2G = 0x11,
    /// Gyro low power and high-pass filter
    CtrlReg3G = 0x12,
    /// Gyro axis sign and orientation
    OrientCfgG = 0x13,
    /// Gyro interrupt source
    IntGenSrcG = 0x14,
    /// Status, including the inactivity flag
    StatusReg0 = 0x17,

    // Gyroscope Data Registers
    /// Low byte of X-axis angular rate
    OutXL_G = 0x18,
    /// High byte of X-axis angular rate
    OutXH_G = 0x19,
    /// Low byte of Y-axis angular rate
    OutYL_G = 0x1A,
    /// High byte of Y-axis angular rate
    OutYH_G = 0x1B,
    /// Low byte of Z-axis angular rate
    OutZL_G = 0x1C,
    /// High byte of Z-axis angular rate
    OutZH_G = 0x1D,

    /// Gyro axis output enable
    CtrlReg4 = 0x1E,
    /// Accelerometer axis output enable
    CtrlReg5Xl = 0x1F,
    /// Accelerometer output data rate and full scale
    CtrlReg6Xl = 0x20,
    /// Accelerometer filtering
    CtrlReg7Xl = 0x21,
    /// Interrupt pin electrical mode and address auto-increment
    CtrlReg8 = 0x22,
    /// Gyro sleep and FIFO enable
    CtrlReg9 = 0x23,
    /// Data-ready flags for accelerometer (bit 0) and gyroscope (bit 1)
    StatusReg1 = 0x27,

    // Accelerometer Data Registers
    /// Low byte of X-axis acceleration
    OutXL_XL = 0x28,
    /// High byte of X-axis acceleration
    OutXH_XL = 0x29,
    /// Low byte of Y-axis acceleration
    OutYL_XL = 0x2A,
    /// High byte of Y-axis acceleration
    OutYH_XL = 0x2B,
    /// Low byte of Z-axis acceleration
    OutZL_XL = 0x2C,
    /// High byte of Z-axis acceleration
    OutZH_XL = 0x2D,

    // FIFO Registers
    /// FIFO mode and threshold
    FifoCtrl = 0x2E,
    /// FIFO status and unread sample count
    FifoSrc = 0x2F,

    // Gyro Interrupt Generator Registers
    /// Gyro interrupt generator configuration
    IntGenCfgG = 0x30,
    /// High byte of the X-axis gyro threshold (Y and Z follow in pairs)
    IntGenThsXH_G = 0x31,
    /// Gyro interrupt duration and wait flag
    IntGenDurG = 0x37,
}

impl XgRegister {
    /// High byte of the threshold register pair for the given gyro axis
    pub(crate) const fn gyro_threshold_high(axis: u8) -> u8 {
        XgRegister::IntGenThsXH_G as u8 + axis * 2
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MagRegister {
    /// Low byte of the X-axis hard-iron offset (Y and Z follow)
    OffsetXRegL = 0x05,
    /// Device identity (0x3D)
    WhoAmI = 0x0F,
    /// Temperature compensation, X/Y performance mode and output data rate
    CtrlReg1 = 0x20,
    /// Full scale
    CtrlReg2 = 0x21,
    /// Operating mode
    CtrlReg3 = 0x22,
    /// Z-axis performance mode
    CtrlReg4 = 0x23,
    /// Block data update
    CtrlReg5 = 0x24,
    /// Data-ready flags per axis
    StatusReg = 0x27,
    /// Low byte of X-axis field (Y and Z follow)
    OutXL = 0x28,
    /// Interrupt generator configuration
    IntCfg = 0x30,
    /// Interrupt source
    IntSrc = 0x31,
    /// Low byte of the interrupt threshold
    IntThsL = 0x32,
    /// High byte of the interrupt threshold
    IntThsH = 0x33,
}
