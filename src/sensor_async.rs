//! LSM9DS1 Asynchronous Driver Implementation
//!
//! Non-blocking interface to the LSM9DS1 over embedded-hal-async SPI:
//! - Identity check and bring-up of both dies
//! - Scale selection and raw/calibrated sample reads
//! - Bounded data-ready waits, gyro bias and magnetometer offset calibration
//! - FIFO, gyro sleep and interrupt configuration
//!
//! This mirrors the blocking version (sensor.rs); all conversion and
//! calibration state lives in the same [`Session`] type.

use crate::{
    accel::{Accel, AccelF32, AccelFullScale},
    calibration::CalibrationParameters,
    calibration_async::{calibrate_gyro, calibrate_mag, collect_gyro_bias},
    chip::Chip,
    config::Config,
    error::{Error, InitError},
    fifo::{Fifo, FifoStatus},
    gyro::{Gyro, GyroF32, GyroFullScale},
    interrupt::{
        GyroEvents, GyroInterrupt, GyroThreshold, Inactivity, InterruptPin, MagInterrupt,
        MagInterruptSource, PinConfig,
    },
    magnetometer::{Mag, MagAxes, MagF32, MagFullScale},
    orientation::Orientation,
    registers::{MagRegister, XgRegister, MAG_AUTO_INCREMENT, SPI_READ},
    session::Session,
};

use embedded_hal_async::{
    delay::DelayNs,
    spi::{Operation, SpiDevice},
};

/// STMicroelectronics LSM9DS1 driver
pub struct Lsm9ds1<XG, M> {
    xg: XG,
    mag: M,
    session: Session,
}

impl<XG, M> Lsm9ds1<XG, M>
where
    XG: SpiDevice,
    M: SpiDevice<Error = XG::Error>,
{
    /// Check both dies identify themselves, then configure them.
    pub async fn new(
        xg: XG,
        mag: M,
        delay: &mut impl DelayNs,
        config: Config,
    ) -> Result<Self, InitError<XG, M, XG::Error>> {
        let mut sensor = Self {
            xg,
            mag,
            session: Session::new(&config),
        };

        if let Err(error) = sensor.initialize(delay, &config).await {
            Err(InitError {
                error,
                xg: sensor.xg,
                mag: sensor.mag,
            })
        } else {
            Ok(sensor)
        }
    }

    /// Returns the underlying SPI devices, consuming this driver.
    pub fn release(self) -> (XG, M) {
        (self.xg, self.mag)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Load a previously measured gyro bias (raw counts at the current range)
    pub fn set_gyro_bias(&mut self, bias: Gyro) {
        self.session.set_gyro_bias(bias);
    }

    /// Drop the pitch/roll estimate; the next update seeds from the accelerometer.
    pub fn reset_orientation(&mut self) {
        self.session.filter_mut().reset();
    }

    async fn initialize(
        &mut self,
        delay: &mut impl DelayNs,
        config: &Config,
    ) -> Result<(), Error<XG::Error>> {
        self.wait_for_identity(Chip::AccelGyro, delay, config.identity_attempts)
            .await?;
        self.wait_for_identity(Chip::Magnetometer, delay, config.identity_attempts)
            .await?;

        self.write_xg_register(XgRegister::CtrlReg8, 0b0000_0100).await?;
        self.write_xg_register(XgRegister::CtrlReg1G, config.ctrl_reg1_g()).await?;
        self.write_xg_register(XgRegister::CtrlReg2G, 0x00).await?;
        self.write_xg_register(XgRegister::CtrlReg3G, 0x00).await?;
        self.write_xg_register(XgRegister::CtrlReg4, 0b0011_1000).await?;
        self.write_xg_register(XgRegister::OrientCfgG, 0x00).await?;
        self.write_xg_register(XgRegister::CtrlReg5Xl, 0b0011_1000).await?;
        self.write_xg_register(XgRegister::CtrlReg6Xl, config.ctrl_reg6_xl()).await?;
        self.write_xg_register(XgRegister::CtrlReg7Xl, 0x00).await?;

        self.write_mag_register(MagRegister::CtrlReg1, config.ctrl_reg1_m()).await?;
        self.write_mag_register(MagRegister::CtrlReg2, config.ctrl_reg2_m()).await?;
        self.write_mag_register(MagRegister::CtrlReg3, 0x00).await?;
        self.write_mag_register(MagRegister::CtrlReg4, config.ctrl_reg4_m()).await?;
        self.write_mag_register(MagRegister::CtrlReg5, 0x00).await?;

        info!(
            "LSM9DS1 ready: accel {}g gyro {}dps mag {}gauss",
            config.accel_scale.range(),
            config.gyro_scale.range(),
            config.mag_scale.range()
        );
        Ok(())
    }

    async fn wait_for_identity(
        &mut self,
        chip: Chip,
        delay: &mut impl DelayNs,
        attempts: u32,
    ) -> Result<(), Error<XG::Error>> {
        let mut found = 0;
        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                delay.delay_ms(1).await;
            }
            found = self.who_am_i(chip).await?;
            if found == chip.identity() {
                debug!("{} identified after {} attempts", chip, attempt + 1);
                return Ok(());
            }
        }
        warn!("{} answered {} instead of {}", chip, found, chip.identity());
        Err(Error::WrongDevice { chip, found })
    }

    pub async fn who_am_i(&mut self, chip: Chip) -> Result<u8, Error<XG::Error>> {
        match chip {
            Chip::AccelGyro => self.read_register(chip, XgRegister::WhoAmI as u8).await,
            Chip::Magnetometer => self.read_register(chip, MagRegister::WhoAmI as u8).await,
        }
    }

    pub async fn check_identity(&mut self, chip: Chip) -> Result<(), Error<XG::Error>> {
        let found = self.who_am_i(chip).await?;
        if found == chip.identity() {
            Ok(())
        } else {
            Err(Error::WrongDevice { chip, found })
        }
    }

    pub async fn read_registers<'a>(
        &mut self,
        chip: Chip,
        address: u8,
        buf: &'a mut [u8],
    ) -> Result<&'a [u8], Error<XG::Error>> {
        let result = match chip {
            Chip::AccelGyro => {
                let command = [address | SPI_READ];
                self.xg
                    .transaction(&mut [Operation::Write(&command), Operation::Read(&mut buf[..])])
                    .await
            }
            Chip::Magnetometer => {
                let mut command = address | SPI_READ;
                if buf.len() > 1 {
                    command |= MAG_AUTO_INCREMENT;
                }
                self.mag
                    .transaction(&mut [Operation::Write(&[command]), Operation::Read(&mut buf[..])])
                    .await
            }
        };
        result.map_err(Error::Bus)?;
        Ok(buf)
    }

    pub async fn read_register(&mut self, chip: Chip, address: u8) -> Result<u8, Error<XG::Error>> {
        let mut buf = [0; 1];
        self.read_registers(chip, address, &mut buf).await?;
        Ok(buf[0])
    }

    pub async fn write_register(
        &mut self,
        chip: Chip,
        address: u8,
        value: u8,
    ) -> Result<(), Error<XG::Error>> {
        let bytes = [address & !SPI_READ, value];
        let result = match chip {
            Chip::AccelGyro => self.xg.write(&bytes).await,
            Chip::Magnetometer => self.mag.write(&bytes).await,
        };
        result.map_err(Error::Bus)
    }

    async fn read_xg_register(&mut self, reg: XgRegister) -> Result<u8, Error<XG::Error>> {
        self.read_register(Chip::AccelGyro, reg as u8).await
    }

    async fn write_xg_register(&mut self, reg: XgRegister, value: u8) -> Result<(), Error<XG::Error>> {
        self.write_register(Chip::AccelGyro, reg as u8, value).await
    }

    async fn read_mag_register(&mut self, reg: MagRegister) -> Result<u8, Error<XG::Error>> {
        self.read_register(Chip::Magnetometer, reg as u8).await
    }

    async fn write_mag_register(&mut self, reg: MagRegister, value: u8) -> Result<(), Error<XG::Error>> {
        self.write_register(Chip::Magnetometer, reg as u8, value).await
    }

    async fn modify_xg_register(
        &mut self,
        reg: XgRegister,
        f: impl FnOnce(u8) -> u8,
    ) -> Result<(), Error<XG::Error>> {
        let value = self.read_xg_register(reg).await?;
        self.write_xg_register(reg, f(value)).await
    }

    /// Select the accelerometer range in g. Illegal ranges select ±2 g.
    pub async fn set_accel_scale(&mut self, range: u16) -> Result<AccelFullScale, Error<XG::Error>> {
        let scale = AccelFullScale::constrain(range);
        self.modify_xg_register(XgRegister::CtrlReg6Xl, |value| {
            (value & !0b0001_1000) | ((scale as u8) << 3)
        })
        .await?;
        Ok(self.session.constrain_accel_scale(range))
    }

    /// Select the gyroscope range in dps. Illegal ranges select ±245 dps.
    /// A calibrated bias is rescaled to the new range.
    pub async fn set_gyro_scale(&mut self, range: u16) -> Result<GyroFullScale, Error<XG::Error>> {
        let scale = GyroFullScale::constrain(range);
        self.modify_xg_register(XgRegister::CtrlReg1G, |value| {
            (value & !0b0001_1000) | ((scale as u8) << 3)
        })
        .await?;
        Ok(self.session.constrain_gyro_scale(range))
    }

    /// Select the magnetometer range in gauss. Illegal ranges select ±4 gauss.
    pub async fn set_mag_scale(&mut self, range: u16) -> Result<MagFullScale, Error<XG::Error>> {
        let scale = MagFullScale::constrain(range);
        let value = self.read_mag_register(MagRegister::CtrlReg2).await?;
        self.write_mag_register(
            MagRegister::CtrlReg2,
            (value & !0b0110_0000) | ((scale as u8) << 5),
        )
        .await?;
        Ok(self.session.constrain_mag_scale(range))
    }

    pub async fn accel(&mut self) -> Result<Accel, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::AccelGyro, XgRegister::OutXL_XL as u8, &mut data)
            .await?;
        Ok(Accel::from_bytes(data))
    }

    pub async fn gyro(&mut self) -> Result<Gyro, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::AccelGyro, XgRegister::OutXL_G as u8, &mut data)
            .await?;
        Ok(Gyro::from_bytes(data))
    }

    pub async fn mag(&mut self) -> Result<Mag, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::Magnetometer, MagRegister::OutXL as u8, &mut data)
            .await?;
        Ok(Mag::from_bytes(data))
    }

    pub async fn acceleration(&mut self) -> Result<AccelF32, Error<XG::Error>> {
        let raw = self.accel().await?;
        Ok(self.session.acceleration(&raw))
    }

    pub async fn angular_rate(&mut self) -> Result<GyroF32, Error<XG::Error>> {
        let raw = self.gyro().await?;
        Ok(self.session.angular_rate(&raw))
    }

    pub async fn magnetic_field(&mut self) -> Result<MagF32, Error<XG::Error>> {
        let raw = self.mag().await?;
        Ok(self.session.magnetic_field(&raw))
    }

    /// Read one accelerometer/gyro sample pair and update the pitch/roll estimate
    pub async fn update_orientation(&mut self, dt: f32) -> Result<Orientation, Error<XG::Error>> {
        let accel = self.accel().await?;
        let gyro = self.gyro().await?;
        Ok(self.session.update_orientation(&accel, &gyro, dt))
    }

    pub async fn gyro_data_available(&mut self) -> Result<bool, Error<XG::Error>> {
        Ok(self.read_xg_register(XgRegister::StatusReg1).await? & 0b0000_0010 != 0)
    }

    pub async fn accel_data_available(&mut self) -> Result<bool, Error<XG::Error>> {
        Ok(self.read_xg_register(XgRegister::StatusReg1).await? & 0b0000_0001 != 0)
    }

    pub async fn mag_data_available(&mut self, axes: MagAxes) -> Result<bool, Error<XG::Error>> {
        Ok(axes.is_ready(self.read_mag_register(MagRegister::StatusReg).await?))
    }

    pub async fn wait_for_gyro_data(
        &mut self,
        delay: &mut impl DelayNs,
        max_polls: u32,
        poll_interval_us: u32,
    ) -> Result<(), Error<XG::Error>> {
        for _ in 0..max_polls.max(1) {
            if self.gyro_data_available().await? {
                return Ok(());
            }
            delay.delay_us(poll_interval_us).await;
        }
        warn!("gyro data not ready after {} polls", max_polls);
        Err(Error::Timeout {
            chip: Chip::AccelGyro,
        })
    }

    pub async fn wait_for_mag_data(
        &mut self,
        delay: &mut impl DelayNs,
        axes: MagAxes,
        max_polls: u32,
        poll_interval_us: u32,
    ) -> Result<(), Error<XG::Error>> {
        for _ in 0..max_polls.max(1) {
            if self.mag_data_available(axes).await? {
                return Ok(());
            }
            delay.delay_us(poll_interval_us).await;
        }
        warn!("mag data not ready after {} polls", max_polls);
        Err(Error::Timeout {
            chip: Chip::Magnetometer,
        })
    }

    /// Average resting gyro samples into the session's bias.
    pub async fn calibrate_gyro(
        &mut self,
        delay: &mut impl DelayNs,
        parameters: &CalibrationParameters,
    ) -> Result<Gyro, Error<XG::Error>> {
        calibrate_gyro(self, delay, parameters).await
    }

    pub async fn collect_gyro_bias(
        &mut self,
        delay: &mut impl DelayNs,
        parameters: &CalibrationParameters,
    ) -> Result<Gyro, Error<XG::Error>> {
        collect_gyro_bias(self, delay, parameters).await
    }

    /// Find the magnetometer hard-iron offset and load it into the device.
    pub async fn calibrate_mag(
        &mut self,
        delay: &mut impl DelayNs,
        parameters: &CalibrationParameters,
    ) -> Result<Mag, Error<XG::Error>> {
        calibrate_mag(self, delay, parameters).await
    }

    pub async fn mag_offset(&mut self) -> Result<Mag, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::Magnetometer, MagRegister::OffsetXRegL as u8, &mut data)
            .await?;
        Ok(Mag::from_bytes(data))
    }

    pub async fn set_mag_offset(&mut self, offset: &Mag) -> Result<(), Error<XG::Error>> {
        let command = [MagRegister::OffsetXRegL as u8 | MAG_AUTO_INCREMENT];
        let data = offset.to_bytes();
        self.mag
            .transaction(&mut [Operation::Write(&command), Operation::Write(&data)])
            .await
            .map_err(Error::Bus)?;
        self.session.set_mag_offset(*offset);
        Ok(())
    }

    pub async fn set_fifo(&mut self, fifo: Fifo) -> Result<(), Error<XG::Error>> {
        self.write_xg_register(XgRegister::FifoCtrl, fifo.to_byte()).await
    }

    pub async fn enable_fifo(&mut self, enable: bool) -> Result<(), Error<XG::Error>> {
        self.modify_xg_register(XgRegister::CtrlReg9, |value| {
            if enable {
                value | (1 << 1)
            } else {
                value & !(1 << 1)
            }
        })
        .await
    }

    pub async fn fifo_status(&mut self) -> Result<FifoStatus, Error<XG::Error>> {
        let value = self.read_xg_register(XgRegister::FifoSrc).await?;
        Ok(FifoStatus::from_byte(value))
    }

    pub async fn fifo_samples(&mut self) -> Result<u8, Error<XG::Error>> {
        Ok(self.fifo_status().await?.samples)
    }

    pub async fn sleep_gyro(&mut self, enable: bool) -> Result<(), Error<XG::Error>> {
        self.modify_xg_register(XgRegister::CtrlReg9, |value| {
            if enable {
                value | (1 << 6)
            } else {
                value & !(1 << 6)
            }
        })
        .await
    }

    pub async fn configure_gyro_threshold(
        &mut self,
        threshold: &GyroThreshold,
    ) -> Result<(), Error<XG::Error>> {
        let [high, low] = threshold.threshold_bytes();
        let address = XgRegister::gyro_threshold_high(threshold.axis as u8);
        self.write_register(Chip::AccelGyro, address, high).await?;
        self.write_register(Chip::AccelGyro, address + 1, low).await?;
        self.write_xg_register(XgRegister::IntGenDurG, threshold.duration_byte())
            .await
    }

    pub async fn configure_gyro_interrupt(&mut self, config: GyroInterrupt) -> Result<(), Error<XG::Error>> {
        self.write_xg_register(XgRegister::IntGenCfgG, config.to_byte()).await
    }

    pub async fn gyro_interrupt_source(&mut self) -> Result<Option<GyroEvents>, Error<XG::Error>> {
        let value = self.read_xg_register(XgRegister::IntGenSrcG).await?;
        Ok(GyroInterrupt::decode_source(value))
    }

    pub async fn configure_inactivity(&mut self, inactivity: Inactivity) -> Result<(), Error<XG::Error>> {
        self.write_xg_register(XgRegister::ActThs, inactivity.threshold_byte())
            .await?;
        self.write_xg_register(XgRegister::ActDur, inactivity.duration).await
    }

    pub async fn is_inactive(&mut self) -> Result<bool, Error<XG::Error>> {
        let value = self.read_xg_register(XgRegister::StatusReg0).await?;
        Ok(Inactivity::is_inactive(value))
    }

    pub async fn configure_interrupt_pin(&mut self, config: PinConfig) -> Result<(), Error<XG::Error>> {
        let reg = match config.pin {
            InterruptPin::Int1 => XgRegister::Int1Ctrl,
            InterruptPin::Int2 => XgRegister::Int2Ctrl,
        };
        self.write_xg_register(reg, config.sources.bits()).await?;
        self.modify_xg_register(XgRegister::CtrlReg8, |value| config.apply_ctrl_reg8(value))
            .await
    }

    pub async fn configure_mag_threshold(&mut self, threshold: u16) -> Result<(), Error<XG::Error>> {
        let [low, high] = MagInterrupt::threshold_bytes(threshold);
        self.write_mag_register(MagRegister::IntThsH, high).await?;
        self.write_mag_register(MagRegister::IntThsL, low).await
    }

    pub async fn configure_mag_interrupt(&mut self, config: MagInterrupt) -> Result<(), Error<XG::Error>> {
        self.write_mag_register(MagRegister::IntCfg, config.to_byte()).await
    }

    pub async fn mag_interrupt_source(
        &mut self,
    ) -> Result<Option<MagInterruptSource>, Error<XG::Error>> {
        let value = self.read_mag_register(MagRegister::IntSrc).await?;
        Ok(MagInterruptSource::decode(value))
    }
}
