use crate::{
    accel::{Accel, AccelF32, AccelFullScale},
    calibration::CalibrationParameters,
    calibration_blocking::{calibrate_gyro, calibrate_mag, collect_gyro_bias},
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
use embedded_hal::{
    delay::DelayNs,
    spi::{Operation, SpiDevice},
};

/// STMicroelectronics LSM9DS1 driver over two SPI chip selects
/// (accelerometer/gyroscope and magnetometer).
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
    ///
    /// Each `WHO_AM_I` is read up to `config.identity_attempts` times, one
    /// millisecond apart, before giving up with [`Error::WrongDevice`].
    pub fn new(
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

        if let Err(error) = sensor.initialize(delay, &config) {
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

    /// Calibration and conversion state
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

    fn initialize(&mut self, delay: &mut impl DelayNs, config: &Config) -> Result<(), Error<XG::Error>> {
        self.wait_for_identity(Chip::AccelGyro, delay, config.identity_attempts)?;
        self.wait_for_identity(Chip::Magnetometer, delay, config.identity_attempts)?;
        self.init_accel_gyro(config)?;
        self.init_mag(config)?;
        info!(
            "LSM9DS1 ready: accel {}g gyro {}dps mag {}gauss",
            config.accel_scale.range(),
            config.gyro_scale.range(),
            config.mag_scale.range()
        );
        Ok(())
    }

    fn init_accel_gyro(&mut self, config: &Config) -> Result<(), Error<XG::Error>> {
        // IF_ADD_INC: multi-byte reads walk the register space
        self.write_xg_register(XgRegister::CtrlReg8, 0b0000_0100)?;
        self.write_xg_register(XgRegister::CtrlReg1G, config.ctrl_reg1_g())?;
        self.write_xg_register(XgRegister::CtrlReg2G, 0x00)?;
        self.write_xg_register(XgRegister::CtrlReg3G, 0x00)?;
        // Zen_G | Yen_G | Xen_G
        self.write_xg_register(XgRegister::CtrlReg4, 0b0011_1000)?;
        self.write_xg_register(XgRegister::OrientCfgG, 0x00)?;
        // Zen_XL | Yen_XL | Xen_XL
        self.write_xg_register(XgRegister::CtrlReg5Xl, 0b0011_1000)?;
        self.write_xg_register(XgRegister::CtrlReg6Xl, config.ctrl_reg6_xl())?;
        self.write_xg_register(XgRegister::CtrlReg7Xl, 0x00)
    }

    fn init_mag(&mut self, config: &Config) -> Result<(), Error<XG::Error>> {
        self.write_mag_register(MagRegister::CtrlReg1, config.ctrl_reg1_m())?;
        self.write_mag_register(MagRegister::CtrlReg2, config.ctrl_reg2_m())?;
        // continuous conversion
        self.write_mag_register(MagRegister::CtrlReg3, 0x00)?;
        self.write_mag_register(MagRegister::CtrlReg4, config.ctrl_reg4_m())?;
        self.write_mag_register(MagRegister::CtrlReg5, 0x00)
    }

    fn wait_for_identity(
        &mut self,
        chip: Chip,
        delay: &mut impl DelayNs,
        attempts: u32,
    ) -> Result<(), Error<XG::Error>> {
        let mut found = 0;
        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                delay.delay_ms(1);
            }
            found = self.who_am_i(chip)?;
            if found == chip.identity() {
                debug!("{} identified after {} attempts", chip, attempt + 1);
                return Ok(());
            }
        }
        warn!("{} answered {} instead of {}", chip, found, chip.identity());
        Err(Error::WrongDevice { chip, found })
    }

    /// Read the identity register of one die
    pub fn who_am_i(&mut self, chip: Chip) -> Result<u8, Error<XG::Error>> {
        match chip {
            Chip::AccelGyro => self.read_register(chip, XgRegister::WhoAmI as u8),
            Chip::Magnetometer => self.read_register(chip, MagRegister::WhoAmI as u8),
        }
    }

    /// Fail with [`Error::WrongDevice`] unless the die reports its identity byte
    pub fn check_identity(&mut self, chip: Chip) -> Result<(), Error<XG::Error>> {
        let found = self.who_am_i(chip)?;
        if found == chip.identity() {
            Ok(())
        } else {
            Err(Error::WrongDevice { chip, found })
        }
    }

    /// Read consecutive registers of one die starting at `address`.
    pub fn read_registers<'a>(
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
            }
            Chip::Magnetometer => {
                let mut command = address | SPI_READ;
                if buf.len() > 1 {
                    command |= MAG_AUTO_INCREMENT;
                }
                self.mag
                    .transaction(&mut [Operation::Write(&[command]), Operation::Read(&mut buf[..])])
            }
        };
        result.map_err(Error::Bus)?;
        Ok(buf)
    }

    pub fn read_register(&mut self, chip: Chip, address: u8) -> Result<u8, Error<XG::Error>> {
        let mut buf = [0; 1];
        self.read_registers(chip, address, &mut buf)?;
        Ok(buf[0])
    }

    pub fn write_register(&mut self, chip: Chip, address: u8, value: u8) -> Result<(), Error<XG::Error>> {
        let bytes = [address & !SPI_READ, value];
        let result = match chip {
            Chip::AccelGyro => self.xg.write(&bytes),
            Chip::Magnetometer => self.mag.write(&bytes),
        };
        result.map_err(Error::Bus)
    }

    pub(crate) fn read_xg_register(&mut self, reg: XgRegister) -> Result<u8, Error<XG::Error>> {
        self.read_register(Chip::AccelGyro, reg as u8)
    }

    pub(crate) fn write_xg_register(&mut self, reg: XgRegister, value: u8) -> Result<(), Error<XG::Error>> {
        self.write_register(Chip::AccelGyro, reg as u8, value)
    }

    pub(crate) fn read_mag_register(&mut self, reg: MagRegister) -> Result<u8, Error<XG::Error>> {
        self.read_register(Chip::Magnetometer, reg as u8)
    }

    pub(crate) fn write_mag_register(&mut self, reg: MagRegister, value: u8) -> Result<(), Error<XG::Error>> {
        self.write_register(Chip::Magnetometer, reg as u8, value)
    }

    fn modify_xg_register(
        &mut self,
        reg: XgRegister,
        f: impl FnOnce(u8) -> u8,
    ) -> Result<(), Error<XG::Error>> {
        let value = self.read_xg_register(reg)?;
        self.write_xg_register(reg, f(value))
    }

    /// Select the accelerometer range in g. Illegal ranges select ±2 g.
    pub fn set_accel_scale(&mut self, range: u16) -> Result<AccelFullScale, Error<XG::Error>> {
        let scale = AccelFullScale::constrain(range);
        self.modify_xg_register(XgRegister::CtrlReg6Xl, |value| {
            (value & !0b0001_1000) | ((scale as u8) << 3)
        })?;
        Ok(self.session.constrain_accel_scale(range))
    }

    /// Select the gyroscope range in dps. Illegal ranges select ±245 dps.
    /// A calibrated bias is rescaled to the new range.
    pub fn set_gyro_scale(&mut self, range: u16) -> Result<GyroFullScale, Error<XG::Error>> {
        let scale = GyroFullScale::constrain(range);
        self.modify_xg_register(XgRegister::CtrlReg1G, |value| {
            (value & !0b0001_1000) | ((scale as u8) << 3)
        })?;
        Ok(self.session.constrain_gyro_scale(range))
    }

    /// Select the magnetometer range in gauss. Illegal ranges select ±4 gauss.
    pub fn set_mag_scale(&mut self, range: u16) -> Result<MagFullScale, Error<XG::Error>> {
        let scale = MagFullScale::constrain(range);
        let value = self.read_mag_register(MagRegister::CtrlReg2)?;
        self.write_mag_register(
            MagRegister::CtrlReg2,
            (value & !0b0110_0000) | ((scale as u8) << 5),
        )?;
        Ok(self.session.constrain_mag_scale(range))
    }

    pub fn accel(&mut self) -> Result<Accel, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::AccelGyro, XgRegister::OutXL_XL as u8, &mut data)?;
        Ok(Accel::from_bytes(data))
    }

    pub fn gyro(&mut self) -> Result<Gyro, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::AccelGyro, XgRegister::OutXL_G as u8, &mut data)?;
        Ok(Gyro::from_bytes(data))
    }

    pub fn mag(&mut self) -> Result<Mag, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::Magnetometer, MagRegister::OutXL as u8, &mut data)?;
        Ok(Mag::from_bytes(data))
    }

    /// Acceleration in g
    pub fn acceleration(&mut self) -> Result<AccelF32, Error<XG::Error>> {
        let raw = self.accel()?;
        Ok(self.session.acceleration(&raw))
    }

    /// Bias-corrected angular rate in dps
    pub fn angular_rate(&mut self) -> Result<GyroF32, Error<XG::Error>> {
        let raw = self.gyro()?;
        Ok(self.session.angular_rate(&raw))
    }

    /// Magnetic field in gauss
    pub fn magnetic_field(&mut self) -> Result<MagF32, Error<XG::Error>> {
        let raw = self.mag()?;
        Ok(self.session.magnetic_field(&raw))
    }

    /// Read one accelerometer/gyro sample pair and update the pitch/roll
    /// estimate. `dt` is the time since the previous update in seconds.
    pub fn update_orientation(&mut self, dt: f32) -> Result<Orientation, Error<XG::Error>> {
        let accel = self.accel()?;
        let gyro = self.gyro()?;
        Ok(self.session.update_orientation(&accel, &gyro, dt))
    }

    pub fn gyro_data_available(&mut self) -> Result<bool, Error<XG::Error>> {
        Ok(self.read_xg_register(XgRegister::StatusReg1)? & 0b0000_0010 != 0)
    }

    pub fn accel_data_available(&mut self) -> Result<bool, Error<XG::Error>> {
        Ok(self.read_xg_register(XgRegister::StatusReg1)? & 0b0000_0001 != 0)
    }

    pub fn mag_data_available(&mut self, axes: MagAxes) -> Result<bool, Error<XG::Error>> {
        Ok(axes.is_ready(self.read_mag_register(MagRegister::StatusReg)?))
    }

    /// Poll the gyro data-ready flag at most `max_polls` times.
    pub fn wait_for_gyro_data(
        &mut self,
        delay: &mut impl DelayNs,
        max_polls: u32,
        poll_interval_us: u32,
    ) -> Result<(), Error<XG::Error>> {
        for _ in 0..max_polls.max(1) {
            if self.gyro_data_available()? {
                return Ok(());
            }
            delay.delay_us(poll_interval_us);
        }
        warn!("gyro data not ready after {} polls", max_polls);
        Err(Error::Timeout {
            chip: Chip::AccelGyro,
        })
    }

    /// Poll the magnetometer data-ready flag at most `max_polls` times.
    pub fn wait_for_mag_data(
        &mut self,
        delay: &mut impl DelayNs,
        axes: MagAxes,
        max_polls: u32,
        poll_interval_us: u32,
    ) -> Result<(), Error<XG::Error>> {
        for _ in 0..max_polls.max(1) {
            if self.mag_data_available(axes)? {
                return Ok(());
            }
            delay.delay_us(poll_interval_us);
        }
        warn!("mag data not ready after {} polls", max_polls);
        Err(Error::Timeout {
            chip: Chip::Magnetometer,
        })
    }

    /// Average gyro samples taken at rest and store the result as the session's
    /// bias. Every later angular rate has the bias removed.
    ///
    /// The device must be still; this is assumed, not verified.
    pub fn calibrate_gyro(
        &mut self,
        delay: &mut impl DelayNs,
        parameters: &CalibrationParameters,
    ) -> Result<Gyro, Error<XG::Error>> {
        calibrate_gyro(self, delay, parameters)
    }

    /// A building block for calibration: average gyro samples without storing them
    pub fn collect_gyro_bias(
        &mut self,
        delay: &mut impl DelayNs,
        parameters: &CalibrationParameters,
    ) -> Result<Gyro, Error<XG::Error>> {
        collect_gyro_bias(self, delay, parameters)
    }

    /// Find the magnetometer hard-iron offset and load it into the device.
    ///
    /// The sensor should be rotated through as many orientations as possible
    /// while this runs: the offset is the midpoint of the observed range per axis.
    pub fn calibrate_mag(
        &mut self,
        delay: &mut impl DelayNs,
        parameters: &CalibrationParameters,
    ) -> Result<Mag, Error<XG::Error>> {
        calibrate_mag(self, delay, parameters)
    }

    /// Hard-iron offset currently loaded in the device
    pub fn mag_offset(&mut self) -> Result<Mag, Error<XG::Error>> {
        let mut data = [0; 6];
        self.read_registers(Chip::Magnetometer, MagRegister::OffsetXRegL as u8, &mut data)?;
        Ok(Mag::from_bytes(data))
    }

    pub fn set_mag_offset(&mut self, offset: &Mag) -> Result<(), Error<XG::Error>> {
        let command = [MagRegister::OffsetXRegL as u8 | MAG_AUTO_INCREMENT];
        let data = offset.to_bytes();
        self.mag
            .transaction(&mut [Operation::Write(&command), Operation::Write(&data)])
            .map_err(Error::Bus)?;
        self.session.set_mag_offset(*offset);
        Ok(())
    }

    pub fn set_fifo(&mut self, fifo: Fifo) -> Result<(), Error<XG::Error>> {
        self.write_xg_register(XgRegister::FifoCtrl, fifo.to_byte())
    }

    pub fn enable_fifo(&mut self, enable: bool) -> Result<(), Error<XG::Error>> {
        self.modify_xg_register(XgRegister::CtrlReg9, |value| {
            if enable {
                value | (1 << 1)
            } else {
                value & !(1 << 1)
            }
        })
    }

    pub fn fifo_status(&mut self) -> Result<FifoStatus, Error<XG::Error>> {
        let value = self.read_xg_register(XgRegister::FifoSrc)?;
        Ok(FifoStatus::from_byte(value))
    }

    /// Number of unread samples in the FIFO
    pub fn fifo_samples(&mut self) -> Result<u8, Error<XG::Error>> {
        Ok(self.fifo_status()?.samples)
    }

    /// Put the gyro to sleep (accelerometer keeps running) or wake it.
    pub fn sleep_gyro(&mut self, enable: bool) -> Result<(), Error<XG::Error>> {
        self.modify_xg_register(XgRegister::CtrlReg9, |value| {
            if enable {
                value | (1 << 6)
            } else {
                value & !(1 << 6)
            }
        })
    }

    pub fn configure_gyro_threshold(&mut self, threshold: &GyroThreshold) -> Result<(), Error<XG::Error>> {
        let [high, low] = threshold.threshold_bytes();
        let address = XgRegister::gyro_threshold_high(threshold.axis as u8);
        self.write_register(Chip::AccelGyro, address, high)?;
        self.write_register(Chip::AccelGyro, address + 1, low)?;
        self.write_xg_register(XgRegister::IntGenDurG, threshold.duration_byte())
    }

    pub fn configure_gyro_interrupt(&mut self, config: GyroInterrupt) -> Result<(), Error<XG::Error>> {
        self.write_xg_register(XgRegister::IntGenCfgG, config.to_byte())
    }

    /// Events that raised the gyro interrupt, `None` when it is not active
    pub fn gyro_interrupt_source(&mut self) -> Result<Option<GyroEvents>, Error<XG::Error>> {
        let value = self.read_xg_register(XgRegister::IntGenSrcG)?;
        Ok(GyroInterrupt::decode_source(value))
    }

    pub fn configure_inactivity(&mut self, inactivity: Inactivity) -> Result<(), Error<XG::Error>> {
        self.write_xg_register(XgRegister::ActThs, inactivity.threshold_byte())?;
        self.write_xg_register(XgRegister::ActDur, inactivity.duration)
    }

    pub fn is_inactive(&mut self) -> Result<bool, Error<XG::Error>> {
        let value = self.read_xg_register(XgRegister::StatusReg0)?;
        Ok(Inactivity::is_inactive(value))
    }

    /// Route interrupt sources to INT1 or INT2 and set the pins' electrical mode
    pub fn configure_interrupt_pin(&mut self, config: PinConfig) -> Result<(), Error<XG::Error>> {
        let reg = match config.pin {
            InterruptPin::Int1 => XgRegister::Int1Ctrl,
            InterruptPin::Int2 => XgRegister::Int2Ctrl,
        };
        self.write_xg_register(reg, config.sources.bits())?;
        self.modify_xg_register(XgRegister::CtrlReg8, |value| config.apply_ctrl_reg8(value))
    }

    /// Set the 15-bit magnetometer interrupt threshold (raw counts)
    pub fn configure_mag_threshold(&mut self, threshold: u16) -> Result<(), Error<XG::Error>> {
        let [low, high] = MagInterrupt::threshold_bytes(threshold);
        self.write_mag_register(MagRegister::IntThsH, high)?;
        self.write_mag_register(MagRegister::IntThsL, low)
    }

    pub fn configure_mag_interrupt(&mut self, config: MagInterrupt) -> Result<(), Error<XG::Error>> {
        self.write_mag_register(MagRegister::IntCfg, config.to_byte())
    }

    pub fn mag_interrupt_source(&mut self) -> Result<Option<MagInterruptSource>, Error<XG::Error>> {
        let value = self.read_mag_register(MagRegister::IntSrc)?;
        Ok(MagInterruptSource::decode(value))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::interrupt::{ActiveLevel, GyroAxis, PinMode, PinSources};
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        spi::{Mock as SpiMock, Transaction as SpiTransaction},
    };
    use std::{vec, vec::Vec};

    type Imu = Lsm9ds1<SpiMock<u8>, SpiMock<u8>>;

    fn read(command: u8, response: &[u8]) -> Vec<SpiTransaction<u8>> {
        vec![
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![command]),
            SpiTransaction::read_vec(response.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    fn xg_read(reg: XgRegister, response: &[u8]) -> Vec<SpiTransaction<u8>> {
        read(reg as u8 | 0x80, response)
    }

    fn mag_read(reg: MagRegister, response: &[u8]) -> Vec<SpiTransaction<u8>> {
        let increment = if response.len() > 1 { 0x40 } else { 0x00 };
        read(reg as u8 | 0x80 | increment, response)
    }

    fn write(address: u8, value: u8) -> Vec<SpiTransaction<u8>> {
        vec![
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![address, value]),
            SpiTransaction::transaction_end(),
        ]
    }

    fn mag_offset_write(data: [u8; 6]) -> Vec<SpiTransaction<u8>> {
        vec![
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x05 | 0x40]),
            SpiTransaction::write_vec(data.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    fn le_bytes(x: i16, y: i16, z: i16) -> [u8; 6] {
        let [x0, x1] = x.to_le_bytes();
        let [y0, y1] = y.to_le_bytes();
        let [z0, z1] = z.to_le_bytes();
        [x0, x1, y0, y1, z0, z1]
    }

    fn xg_bring_up(config: &Config) -> Vec<SpiTransaction<u8>> {
        [
            xg_read(XgRegister::WhoAmI, &[0x68]),
            write(0x22, 0x04),
            write(0x10, config.ctrl_reg1_g()),
            write(0x11, 0x00),
            write(0x12, 0x00),
            write(0x1E, 0x38),
            write(0x13, 0x00),
            write(0x1F, 0x38),
            write(0x20, config.ctrl_reg6_xl()),
            write(0x21, 0x00),
        ]
        .concat()
    }

    fn mag_bring_up(config: &Config) -> Vec<SpiTransaction<u8>> {
        [
            mag_read(MagRegister::WhoAmI, &[0x3D]),
            write(0x20, config.ctrl_reg1_m()),
            write(0x21, config.ctrl_reg2_m()),
            write(0x22, 0x00),
            write(0x23, config.ctrl_reg4_m()),
            write(0x24, 0x00),
        ]
        .concat()
    }

    fn imu(xg: Vec<SpiTransaction<u8>>, mag: Vec<SpiTransaction<u8>>) -> Imu {
        imu_with(Config::default(), xg, mag)
    }

    fn imu_with(config: Config, xg: Vec<SpiTransaction<u8>>, mag: Vec<SpiTransaction<u8>>) -> Imu {
        let xg = [xg_bring_up(&config), xg].concat();
        let mag = [mag_bring_up(&config), mag].concat();
        Lsm9ds1::new(SpiMock::new(&xg), SpiMock::new(&mag), &mut NoopDelay::new(), config).unwrap()
    }

    fn done(imu: Imu) {
        let (mut xg, mut mag) = imu.release();
        xg.done();
        mag.done();
    }

    #[test]
    fn bring_up_writes_configuration() {
        let config = Config::default().with_accel_range(8).with_gyro_range(500).with_mag_range(12);
        let imu = imu_with(config, vec![], vec![]);
        assert_eq!(imu.session().accel_scale(), AccelFullScale::G8);
        assert_eq!(imu.session().gyro_scale(), GyroFullScale::Dps500);
        assert_eq!(imu.session().mag_scale(), MagFullScale::Gauss12);
        assert!(!imu.session().is_gyro_calibrated());
        done(imu);
    }

    #[test]
    fn identity_is_retried_then_rejected() {
        let config = Config::default().with_identity_attempts(3);
        let xg = [
            xg_read(XgRegister::WhoAmI, &[0x00]),
            xg_read(XgRegister::WhoAmI, &[0x68]),
        ]
        .concat();
        let mag = [
            mag_read(MagRegister::WhoAmI, &[0xFF]),
            mag_read(MagRegister::WhoAmI, &[0xFF]),
            mag_read(MagRegister::WhoAmI, &[0x3C]),
        ]
        .concat();

        let result = Lsm9ds1::new(
            SpiMock::new(&xg),
            SpiMock::new(&mag),
            &mut NoopDelay::new(),
            config,
        );
        let Err(InitError { mut xg, mut mag, error }) = result else {
            panic!("initialization should fail");
        };
        assert_eq!(
            error,
            Error::WrongDevice {
                chip: Chip::Magnetometer,
                found: 0x3C
            }
        );
        xg.done();
        mag.done();
    }

    #[test]
    fn one_g_at_rest() {
        let mut imu = imu(xg_read(XgRegister::OutXL_XL, &[0, 0, 0, 0, 0x00, 0x40]), vec![]);
        let g = imu.acceleration().unwrap();
        assert_eq!(g.x(), 0.0);
        assert_eq!(g.y(), 0.0);
        assert!((g.z() - 1.0).abs() < 0.001);
        done(imu);
    }

    #[test]
    fn illegal_mag_scale_is_written_as_lowest() {
        let mag = [
            mag_read(MagRegister::CtrlReg2, &[0b0110_0000]),
            write(0x21, 0x00),
            mag_read(MagRegister::CtrlReg2, &[0x00]),
            write(0x21, 0x00),
            mag_read(MagRegister::OutXL, &[0x10, 0x27, 0xF0, 0xD8, 0x00, 0x00]),
        ]
        .concat();
        let mut imu = imu_with(Config::default().with_mag_range(16), vec![], mag);

        assert_eq!(imu.set_mag_scale(6).unwrap(), MagFullScale::Gauss4);
        assert_eq!(imu.set_mag_scale(4).unwrap(), MagFullScale::Gauss4);
        let field = imu.magnetic_field().unwrap();
        assert!((field.x() - 1.4).abs() < 1e-4);
        assert!((field.y() + 1.4).abs() < 1e-4);
        done(imu);
    }

    #[test]
    fn gyro_scale_preserves_other_bits() {
        let xg = [
            xg_read(XgRegister::CtrlReg1G, &[0b1100_0011]),
            write(0x10, 0b1101_1011),
            xg_read(XgRegister::CtrlReg6Xl, &[0b1101_1000]),
            write(0x20, 0b1101_0000),
        ]
        .concat();
        let mut imu = imu(xg, vec![]);
        assert_eq!(imu.set_gyro_scale(2000).unwrap(), GyroFullScale::Dps2000);
        assert_eq!(imu.set_accel_scale(4).unwrap(), AccelFullScale::G4);
        assert_eq!(imu.session().gyro_scale(), GyroFullScale::Dps2000);
        done(imu);
    }

    #[test]
    fn scale_change_keeps_stored_bias_physical() {
        let xg = [
            xg_read(XgRegister::CtrlReg1G, &[0b1100_0000]),
            write(0x10, 0b1101_1000),
            xg_read(XgRegister::OutXL_G, &[0; 6]),
        ]
        .concat();
        let mut imu = imu(xg, vec![]);
        imu.set_gyro_bias(Gyro::new(800, 0, -800));

        imu.set_gyro_scale(2000).unwrap();
        assert_eq!(imu.session().gyro_bias(), Some(Gyro::new(100, 0, -100)));
        let rate = imu.angular_rate().unwrap();
        assert!((rate.x() + 7.0).abs() < 1e-3);
        assert!((rate.z() - 7.0).abs() < 1e-3);

        imu.reset_orientation();
        assert_eq!(imu.session().orientation(), Orientation::default());
        done(imu);
    }

    #[test]
    fn gyro_wait_times_out() {
        let xg = [
            xg_read(XgRegister::StatusReg1, &[0x01]),
            xg_read(XgRegister::StatusReg1, &[0x00]),
            xg_read(XgRegister::StatusReg1, &[0x05]),
        ]
        .concat();
        let mut imu = imu(xg, vec![]);
        let result = imu.wait_for_gyro_data(&mut NoopDelay::new(), 3, 0);
        assert_eq!(result, Err(Error::Timeout { chip: Chip::AccelGyro }));
        done(imu);
    }

    #[test]
    fn mag_wait_checks_requested_axes() {
        let mag = [
            mag_read(MagRegister::StatusReg, &[0b0000_0111]),
            mag_read(MagRegister::StatusReg, &[0b0000_1111]),
            mag_read(MagRegister::StatusReg, &[0b0000_0100]),
        ]
        .concat();
        let mut imu = imu(vec![], mag);
        imu.wait_for_mag_data(&mut NoopDelay::new(), MagAxes::All, 5, 0).unwrap();
        assert!(imu.mag_data_available(MagAxes::Z).unwrap());
        done(imu);
    }

    #[test]
    fn gyro_calibration_zeroes_resting_samples() {
        let resting = [0xF6, 0xFF, 0x19, 0x00, 0x2C, 0x01];
        let mut xg = [
            // warmup: one not-ready poll, then a sample that is thrown away
            xg_read(XgRegister::StatusReg1, &[0x00]),
            xg_read(XgRegister::StatusReg1, &[0x02]),
            xg_read(XgRegister::OutXL_G, &[0x00, 0x10, 0x00, 0x10, 0x00, 0x10]),
        ]
        .concat();
        for _ in 0..4 {
            xg.extend(xg_read(XgRegister::StatusReg1, &[0x03]));
            xg.extend(xg_read(XgRegister::OutXL_G, &resting));
        }
        xg.extend(xg_read(XgRegister::OutXL_G, &resting));

        let mut imu = imu(xg, vec![]);
        let parameters = CalibrationParameters::default()
            .with_warmup_samples(1)
            .with_gyro_samples(4)
            .with_max_polls(2)
            .with_poll_interval_us(0);

        let bias = imu.calibrate_gyro(&mut NoopDelay::new(), &parameters).unwrap();
        assert_eq!(bias, Gyro::new(-10, 25, 300));
        assert_eq!(imu.session().gyro_bias(), Some(bias));

        let rate = imu.angular_rate().unwrap();
        assert_eq!((rate.x(), rate.y(), rate.z()), (0.0, 0.0, 0.0));
        done(imu);
    }

    #[test]
    fn gyro_calibration_surfaces_timeout() {
        let xg = [
            xg_read(XgRegister::StatusReg1, &[0x00]),
            xg_read(XgRegister::StatusReg1, &[0x00]),
        ]
        .concat();
        let mut imu = imu(xg, vec![]);
        let parameters = CalibrationParameters::default()
            .with_warmup_samples(0)
            .with_max_polls(2)
            .with_poll_interval_us(0);
        let result = imu.calibrate_gyro(&mut NoopDelay::new(), &parameters);
        assert_eq!(result, Err(Error::Timeout { chip: Chip::AccelGyro }));
        assert!(!imu.session().is_gyro_calibrated());
        done(imu);
    }

    #[test]
    fn mag_calibration_loads_midpoint_offset() {
        let mag = [
            mag_offset_write([0; 6]),
            mag_read(MagRegister::StatusReg, &[0x08]),
            mag_read(MagRegister::OutXL, &Mag::new(-300, 100, 40).to_bytes()),
            mag_read(MagRegister::StatusReg, &[0x00]),
            mag_read(MagRegister::StatusReg, &[0x0F]),
            mag_read(MagRegister::OutXL, &Mag::new(500, 900, -40).to_bytes()),
            mag_offset_write(Mag::new(100, 500, 0).to_bytes()),
            mag_read(MagRegister::OffsetXRegL, &Mag::new(100, 500, 0).to_bytes()),
        ]
        .concat();
        let mut imu = imu(vec![], mag);
        let parameters = CalibrationParameters::default()
            .with_mag_samples(2)
            .with_max_polls(2)
            .with_poll_interval_us(0);

        let offset = imu.calibrate_mag(&mut NoopDelay::new(), &parameters).unwrap();
        assert_eq!(offset, Mag::new(100, 500, 0));
        assert_eq!(imu.session().mag_offset(), Some(offset));
        assert_eq!(imu.mag_offset().unwrap(), offset);
        done(imu);
    }

    #[test]
    fn orientation_from_device_samples() {
        let xg = [
            xg_read(XgRegister::OutXL_XL, &le_bytes(0, 8192, 14189)),
            xg_read(XgRegister::OutXL_G, &[0; 6]),
        ]
        .concat();
        let mut imu = imu(xg, vec![]);
        let orientation = imu.update_orientation(0.01).unwrap();
        assert!((orientation.roll - 30.0).abs() < 0.01);
        assert!(orientation.pitch.abs() < 0.01);
        done(imu);
    }

    #[test]
    fn fifo_and_sleep() {
        let xg = [
            write(0x2E, 0b1101_1111),
            xg_read(XgRegister::CtrlReg9, &[0x00]),
            write(0x23, 0b0000_0010),
            xg_read(XgRegister::FifoSrc, &[0b1001_0100]),
            xg_read(XgRegister::CtrlReg9, &[0b0000_0010]),
            write(0x23, 0b0100_0010),
            xg_read(XgRegister::CtrlReg9, &[0b0100_0010]),
            write(0x23, 0b0000_0010),
        ]
        .concat();
        let mut imu = imu(xg, vec![]);
        imu.set_fifo(Fifo::new(crate::fifo::FifoMode::Continuous, 99)).unwrap();
        imu.enable_fifo(true).unwrap();
        assert_eq!(imu.fifo_samples().unwrap(), 20);
        imu.sleep_gyro(true).unwrap();
        imu.sleep_gyro(false).unwrap();
        done(imu);
    }

    #[test]
    fn interrupt_configuration() {
        let xg = [
            write(0x35, 0x01),
            write(0x36, 0x2C),
            write(0x37, 0x85),
            write(0x30, 0b0110_0000),
            xg_read(XgRegister::IntGenSrcG, &[0b0110_0000]),
            write(0x04, 0x8A),
            write(0x05, 0x20),
            xg_read(XgRegister::StatusReg0, &[0b0001_0000]),
            write(0x0D, 0x80),
            xg_read(XgRegister::CtrlReg8, &[0x04]),
            write(0x22, 0x34),
        ]
        .concat();
        let mag = [
            write(0x33, 0x01),
            write(0x32, 0xF4),
            write(0x30, 0b1000_0101),
            mag_read(MagRegister::IntSrc, &[0b0001_0001]),
        ]
        .concat();
        let mut imu = imu(xg, mag);

        imu.configure_gyro_threshold(&GyroThreshold {
            axis: GyroAxis::Z,
            threshold: 300,
            duration: 5,
            wait: true,
        })
        .unwrap();
        imu.configure_gyro_interrupt(GyroInterrupt {
            events: GyroEvents::Z_HIGH,
            and_events: false,
            latch: true,
        })
        .unwrap();
        assert_eq!(imu.gyro_interrupt_source().unwrap(), Some(GyroEvents::Z_HIGH));

        imu.configure_inactivity(Inactivity {
            duration: 0x20,
            threshold: 10,
            gyro_sleep: true,
        })
        .unwrap();
        assert!(imu.is_inactive().unwrap());

        imu.configure_interrupt_pin(PinConfig {
            pin: InterruptPin::Int2,
            sources: PinSources::INACTIVITY,
            level: ActiveLevel::Low,
            mode: PinMode::OpenDrain,
        })
        .unwrap();

        imu.configure_mag_threshold(500).unwrap();
        imu.configure_mag_interrupt(MagInterrupt {
            x: true,
            y: false,
            z: false,
            level: ActiveLevel::High,
            latch: true,
        })
        .unwrap();
        let source = imu.mag_interrupt_source().unwrap().unwrap();
        assert!(source.negative_x);
        assert!(!source.positive_x);
        done(imu);
    }
}
