//! Input and output report frames.
//!
//! Input reports are fixed 50-byte frames built by the device; output reports
//! are decoded from whatever the host wrote to the interrupt channel.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use super::constants::*;
use super::spi;
use super::subcommand::{OutputReportId, Subcommand};

/// Framing errors raised while decoding an output report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Empty report")]
    Empty,
    #[error("Bad report length: expected at least {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },
    #[error("Malformed report: expected prefix 0x{expected:02X}, got 0x{actual:02X}")]
    Malformed { expected: u8, actual: u8 },
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02X}", b)?;
    }
    Ok(())
}

/// Device -> host report.
#[derive(Clone, PartialEq, Eq)]
pub struct InputReport {
    data: [u8; INPUT_REPORT_LEN],
}

impl InputReport {
    /// Allocate an empty frame with the battery/connection byte set.
    pub fn new() -> Self {
        let mut data = [0u8; INPUT_REPORT_LEN];
        data[0] = INPUT_REPORT_PREFIX;
        data[IN_BATTERY_CONN] = BATTERY_CONN_INFO;
        Self { data }
    }

    /// Allocate a frame tagged with `report_id`.
    pub fn standard(report_id: u8) -> Self {
        let mut report = Self::new();
        report.set_report_id(report_id);
        report
    }

    /// Unsolicited 0x30 report, with resting IMU samples when `imu` is set.
    pub fn standard_full(imu: bool) -> Self {
        let mut report = Self::standard(REPORT_STANDARD_FULL);
        report.set_imu_data(imu);
        report
    }

    pub fn set_report_id(&mut self, id: u8) {
        self.data[IN_REPORT_ID] = id;
    }

    pub fn report_id(&self) -> u8 {
        self.data[IN_REPORT_ID]
    }

    pub fn timer(&self) -> u8 {
        self.data[IN_TIMER]
    }

    /// Write the timer and, once the host has identified the device, the
    /// neutral button and stick state.
    pub fn fill_standard_data(&mut self, elapsed: u8, device_info_requested: bool) {
        self.data[IN_TIMER] = elapsed;
        self.data[IN_BATTERY_CONN] = BATTERY_CONN_INFO;
        self.data[IN_BUTTONS..IN_LEFT_STICK].fill(0);
        if device_info_requested {
            self.data[IN_LEFT_STICK..IN_RIGHT_STICK].copy_from_slice(&STICK_CENTER);
            self.data[IN_RIGHT_STICK..IN_VIBRATOR].copy_from_slice(&STICK_CENTER);
        } else {
            self.data[IN_LEFT_STICK..IN_VIBRATOR].fill(0);
        }
        self.data[IN_VIBRATOR] = VIBRATOR_REPORT;
    }

    /// Whether the standard input block carries stick data, i.e. the report
    /// was filled after the host requested device info.
    pub fn has_standard_input(&self) -> bool {
        self.data[IN_LEFT_STICK..IN_RIGHT_STICK] == STICK_CENTER
    }

    /// Fill or clear the IMU block of a standard full report.
    pub fn set_imu_data(&mut self, enabled: bool) {
        let imu = &mut self.data[IN_IMU_DATA..IN_IMU_DATA + IMU_SAMPLE_LEN * IMU_SAMPLE_COUNT];
        imu.fill(0);
        if !enabled {
            return;
        }
        // Controller at rest, face up: accel (x, y, z) then gyro (x, y, z).
        for sample in imu.chunks_exact_mut(IMU_SAMPLE_LEN) {
            LittleEndian::write_i16(&mut sample[4..6], IMU_ONE_G);
        }
    }

    pub fn imu_data(&self) -> &[u8] {
        &self.data[IN_IMU_DATA..IN_IMU_DATA + IMU_SAMPLE_LEN * IMU_SAMPLE_COUNT]
    }

    /// ACK byte, only meaningful for subcommand replies.
    pub fn ack(&self) -> Option<u8> {
        self.is_subcommand_reply().then_some(self.data[IN_ACK])
    }

    /// Subcommand this report replies to.
    pub fn subcommand_id(&self) -> Option<u8> {
        self.is_subcommand_reply().then_some(self.data[IN_SUBCOMMAND])
    }

    pub fn is_subcommand_reply(&self) -> bool {
        self.report_id() == REPORT_SUBCOMMAND_REPLY
    }

    pub fn reply_data(&self) -> &[u8] {
        &self.data[IN_REPLY_DATA..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn set_reply(&mut self, ack: u8, subcommand: Subcommand, reply: &[u8]) {
        self.data[IN_ACK] = ack;
        self.data[IN_SUBCOMMAND] = subcommand.value();
        let region = &mut self.data[IN_REPLY_DATA..];
        region.fill(0);
        let len = reply.len().min(REPLY_DATA_LEN);
        region[..len].copy_from_slice(&reply[..len]);
    }

    pub fn ack_device_info(&mut self, mac: &[u8; MAC_LEN]) {
        let mut reply = Vec::with_capacity(12);
        reply.extend_from_slice(&FIRMWARE_VERSION);
        reply.push(CONTROLLER_TYPE_PRO);
        reply.push(0x02);
        reply.extend_from_slice(mac);
        // Use colors from SPI.
        reply.push(0x01);
        reply.push(0x01);
        self.set_reply(ACK_DEVICE_INFO, Subcommand::RequestDeviceInfo, &reply);
    }

    pub fn ack_set_input_report_mode(&mut self) {
        self.set_reply(ACK_OK, Subcommand::SetInputReportMode, &[]);
    }

    pub fn ack_trigger_buttons_elapsed_time(&mut self) {
        self.set_reply(ACK_TRIGGER_ELAPSED, Subcommand::TriggerButtonsElapsedTime, &[]);
    }

    pub fn ack_set_shipment_low_power_state(&mut self) {
        self.set_reply(ACK_OK, Subcommand::SetShipmentLowPowerState, &[]);
    }

    /// Echo the requested address and length followed by the flash bytes.
    ///
    /// `request` is the subcommand payload: u32 LE address, u8 length.
    pub fn ack_spi_flash_read(&mut self, request: &[u8]) {
        if request.len() < SPI_READ_HEADER_LEN {
            self.set_reply(ACK_OK, Subcommand::SpiFlashRead, &[]);
            return;
        }
        let address = LittleEndian::read_u32(&request[..4]);
        let len = request[4];
        let mut reply = Vec::with_capacity(SPI_READ_HEADER_LEN + SPI_READ_MAX);
        reply.extend_from_slice(&request[..SPI_READ_HEADER_LEN]);
        reply.extend_from_slice(&spi::read_flash(address, len));
        self.set_reply(ACK_SPI_READ, Subcommand::SpiFlashRead, &reply);
    }

    pub fn ack_set_nfc_mcu_config(&mut self) {
        self.set_reply(ACK_NFC_MCU_CONFIG, Subcommand::SetNfcMcuConfig, &NFC_MCU_CONFIG_REPLY);
    }

    pub fn ack_set_nfc_mcu_state(&mut self) {
        self.set_reply(ACK_OK, Subcommand::SetNfcMcuState, &[]);
    }

    pub fn ack_set_player_lights(&mut self) {
        self.set_reply(ACK_OK, Subcommand::SetPlayerLights, &[]);
    }

    pub fn ack_enable_imu(&mut self) {
        self.set_reply(ACK_OK, Subcommand::EnableImu, &[]);
    }

    pub fn ack_enable_vibration(&mut self) {
        self.set_reply(ACK_VIBRATION, Subcommand::EnableVibration, &[]);
    }
}

impl Default for InputReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputReport(")?;
        write_hex(f, &self.data)?;
        write!(f, ")")
    }
}

impl fmt::Display for InputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subcommand_id() {
            Some(id) => write!(
                f,
                "0x{:02X} timer={} reply={}",
                self.report_id(),
                self.timer(),
                Subcommand::from_u8(id)
            ),
            None => write!(f, "0x{:02X} timer={}", self.report_id(), self.timer()),
        }
    }
}

/// Host -> device report.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputReport {
    data: Vec<u8>,
}

impl OutputReport {
    /// Decode one frame as read from the interrupt channel.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportError> {
        if bytes.is_empty() {
            return Err(ReportError::Empty);
        }
        if bytes.len() < OUTPUT_REPORT_MIN_LEN {
            return Err(ReportError::BadLength {
                expected: OUTPUT_REPORT_MIN_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != OUTPUT_REPORT_PREFIX {
            return Err(ReportError::Malformed {
                expected: OUTPUT_REPORT_PREFIX,
                actual: bytes[0],
            });
        }
        if bytes[OUT_REPORT_ID] == OUTPUT_RUMBLE_AND_SUBCOMMAND
            && bytes.len() < SUBCOMMAND_REPORT_MIN_LEN
        {
            return Err(ReportError::BadLength {
                expected: SUBCOMMAND_REPORT_MIN_LEN,
                actual: bytes.len(),
            });
        }

        let len = bytes.len().min(OUTPUT_REPORT_MAX_LEN);
        Ok(Self {
            data: bytes[..len].to_vec(),
        })
    }

    /// Build a rumble + subcommand frame, as the host would send it.
    pub fn rumble_and_subcommand(timer: u8, subcommand: u8, payload: &[u8]) -> Self {
        let mut data = vec![0u8; OUTPUT_REPORT_MAX_LEN];
        data[0] = OUTPUT_REPORT_PREFIX;
        data[OUT_REPORT_ID] = OUTPUT_RUMBLE_AND_SUBCOMMAND;
        data[OUT_TIMER] = timer;
        data[OUT_SUBCOMMAND] = subcommand;
        let len = payload.len().min(OUTPUT_REPORT_MAX_LEN - OUT_SUBCOMMAND_DATA);
        data[OUT_SUBCOMMAND_DATA..OUT_SUBCOMMAND_DATA + len].copy_from_slice(&payload[..len]);
        Self { data }
    }

    /// Build a frame with only a report ID, timer, and empty rumble data.
    pub fn with_id(report_id: u8, timer: u8) -> Self {
        let mut data = vec![0u8; OUTPUT_REPORT_MIN_LEN];
        data[0] = OUTPUT_REPORT_PREFIX;
        data[OUT_REPORT_ID] = report_id;
        data[OUT_TIMER] = timer;
        Self { data }
    }

    pub fn report_id(&self) -> OutputReportId {
        OutputReportId::from_u8(self.data[OUT_REPORT_ID])
    }

    pub fn timer(&self) -> u8 {
        self.data[OUT_TIMER]
    }

    /// Subcommand ID, present only on rumble + subcommand reports.
    pub fn subcommand(&self) -> Option<Subcommand> {
        match self.report_id() {
            OutputReportId::RumbleAndSubcommand => {
                self.data.get(OUT_SUBCOMMAND).copied().map(Subcommand::from_u8)
            }
            _ => None,
        }
    }

    pub fn subcommand_data(&self) -> &[u8] {
        self.data.get(OUT_SUBCOMMAND_DATA..).unwrap_or(&[])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for OutputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputReport(")?;
        write_hex(f, &self.data)?;
        write!(f, ")")
    }
}

impl fmt::Display for OutputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subcommand() {
            Some(sub) => write!(f, "{} timer={} sub={}", self.report_id(), self.timer(), sub),
            None => write!(f, "{} timer={}", self.report_id(), self.timer()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors() {
        assert_eq!(OutputReport::from_bytes(&[]), Err(ReportError::Empty));
        assert_eq!(
            OutputReport::from_bytes(&[OUTPUT_REPORT_PREFIX, 0x10]),
            Err(ReportError::BadLength {
                expected: OUTPUT_REPORT_MIN_LEN,
                actual: 2
            })
        );
        assert_eq!(
            OutputReport::from_bytes(&[0x00; 12]),
            Err(ReportError::Malformed {
                expected: OUTPUT_REPORT_PREFIX,
                actual: 0x00
            })
        );

        // A subcommand report must carry the subcommand byte.
        let mut short = vec![0u8; OUTPUT_REPORT_MIN_LEN];
        short[0] = OUTPUT_REPORT_PREFIX;
        short[1] = OUTPUT_RUMBLE_AND_SUBCOMMAND;
        assert!(matches!(
            OutputReport::from_bytes(&short),
            Err(ReportError::BadLength { expected: 12, .. })
        ));
    }

    #[test]
    fn test_decode_subcommand() {
        let host = OutputReport::rumble_and_subcommand(7, SUBCMD_ENABLE_IMU, &[0x01]);
        let report = OutputReport::from_bytes(host.as_bytes()).unwrap();
        assert_eq!(report.report_id(), OutputReportId::RumbleAndSubcommand);
        assert_eq!(report.timer(), 7);
        assert_eq!(report.subcommand(), Some(Subcommand::EnableImu));
        assert_eq!(report.subcommand_data()[0], 0x01);
    }

    #[test]
    fn test_rumble_only_has_no_subcommand() {
        let report = OutputReport::from_bytes(OutputReport::with_id(0x10, 0).as_bytes()).unwrap();
        assert_eq!(report.report_id(), OutputReportId::RumbleOnly);
        assert_eq!(report.subcommand(), None);
        assert!(report.subcommand_data().is_empty());
    }

    #[test]
    fn test_oversized_frame_is_truncated() {
        let mut bytes = vec![0u8; 300];
        bytes[0] = OUTPUT_REPORT_PREFIX;
        bytes[1] = OUTPUT_RUMBLE_ONLY;
        let report = OutputReport::from_bytes(&bytes).unwrap();
        assert_eq!(report.as_bytes().len(), OUTPUT_REPORT_MAX_LEN);
    }

    #[test]
    fn test_standard_data() {
        let mut report = InputReport::standard(REPORT_SUBCOMMAND_REPLY);
        report.fill_standard_data(0x42, false);
        assert_eq!(report.as_bytes()[0], INPUT_REPORT_PREFIX);
        assert_eq!(report.timer(), 0x42);
        assert!(!report.has_standard_input());

        report.fill_standard_data(0x43, true);
        assert!(report.has_standard_input());
        assert_eq!(report.as_bytes()[IN_BATTERY_CONN], BATTERY_CONN_INFO);
    }

    #[test]
    fn test_device_info_reply() {
        let mac = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        let mut report = InputReport::standard(REPORT_SUBCOMMAND_REPLY);
        report.ack_device_info(&mac);
        assert_eq!(report.ack(), Some(ACK_DEVICE_INFO));
        assert_eq!(report.subcommand_id(), Some(SUBCMD_REQUEST_DEVICE_INFO));
        assert_eq!(&report.reply_data()[4..10], &mac);
    }

    #[test]
    fn test_spi_read_reply() {
        let mut report = InputReport::standard(REPORT_SUBCOMMAND_REPLY);
        report.ack_spi_flash_read(&[0x50, 0x60, 0x00, 0x00, 0x0D]);
        assert_eq!(report.ack(), Some(ACK_SPI_READ));
        let data = report.reply_data();
        assert_eq!(&data[..5], &[0x50, 0x60, 0x00, 0x00, 0x0D]);
        assert_eq!(&data[5..8], &[0x32, 0x32, 0x32]);
    }

    #[test]
    fn test_spi_read_short_request() {
        let mut report = InputReport::standard(REPORT_SUBCOMMAND_REPLY);
        report.ack_spi_flash_read(&[0x50, 0x60]);
        assert_eq!(report.ack(), Some(ACK_OK));
        assert!(report.reply_data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_imu_data() {
        let mut report = InputReport::standard(REPORT_STANDARD_FULL);
        assert!(report.imu_data().iter().all(|&b| b == 0));
        report.set_imu_data(true);
        assert_eq!(LittleEndian::read_i16(&report.imu_data()[4..6]), IMU_ONE_G);
        assert_eq!(report.ack(), None);
        report.set_imu_data(false);
        assert!(report.imu_data().iter().all(|&b| b == 0));
    }
}
