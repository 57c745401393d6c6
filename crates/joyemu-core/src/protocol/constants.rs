//! Protocol constants for the Pro Controller Bluetooth HID protocol.
//!
//! Values follow the community reverse-engineering notes used by
//! joycontrol/NXBT.

// ============================================================================
// Frame Layout
// ============================================================================

/// HID transaction prefix for DATA | INPUT (device -> host).
pub const INPUT_REPORT_PREFIX: u8 = 0xA1;

/// HID transaction prefix for DATA | OUTPUT (host -> device).
pub const OUTPUT_REPORT_PREFIX: u8 = 0xA2;

/// Input report frame size, prefix included.
pub const INPUT_REPORT_LEN: usize = 50;

/// Largest output report frame we keep, prefix included.
pub const OUTPUT_REPORT_MAX_LEN: usize = 50;

/// Prefix + report id + timer + 8 bytes of rumble.
pub const OUTPUT_REPORT_MIN_LEN: usize = 11;

/// Minimum length of a rumble + subcommand frame (adds the subcommand id).
pub const SUBCOMMAND_REPORT_MIN_LEN: usize = 12;

/// Read buffer handed to the transport; larger than any valid frame so
/// oversized frames are still observed.
pub const READ_BUFFER_LEN: usize = 512;

// Input report offsets
pub const IN_REPORT_ID: usize = 1;
pub const IN_TIMER: usize = 2;
pub const IN_BATTERY_CONN: usize = 3;
pub const IN_BUTTONS: usize = 4;
pub const IN_LEFT_STICK: usize = 7;
pub const IN_RIGHT_STICK: usize = 10;
pub const IN_VIBRATOR: usize = 13;
pub const IN_ACK: usize = 14;
pub const IN_SUBCOMMAND: usize = 15;
pub const IN_REPLY_DATA: usize = 16;
pub const IN_IMU_DATA: usize = 14;

/// Bytes available for subcommand reply data.
pub const REPLY_DATA_LEN: usize = INPUT_REPORT_LEN - IN_REPLY_DATA;

/// Three 12-byte IMU samples per standard report.
pub const IMU_SAMPLE_LEN: usize = 12;
pub const IMU_SAMPLE_COUNT: usize = 3;

// Output report offsets
pub const OUT_REPORT_ID: usize = 1;
pub const OUT_TIMER: usize = 2;
pub const OUT_SUBCOMMAND: usize = 11;
pub const OUT_SUBCOMMAND_DATA: usize = 12;

// ============================================================================
// Input Report IDs (Device -> Host)
// ============================================================================

/// Standard input report with a subcommand reply.
pub const REPORT_SUBCOMMAND_REPLY: u8 = 0x21;

/// Standard full-mode input report (buttons, sticks, IMU).
pub const REPORT_STANDARD_FULL: u8 = 0x30;

// ============================================================================
// Output Report IDs (Host -> Device)
// ============================================================================

pub const OUTPUT_RUMBLE_AND_SUBCOMMAND: u8 = 0x01;
pub const OUTPUT_UPDATE_NFC_PACKET: u8 = 0x03;
pub const OUTPUT_RUMBLE_ONLY: u8 = 0x10;
pub const OUTPUT_REQUEST_NFC_DATA: u8 = 0x11;

// ============================================================================
// Subcommand IDs
// ============================================================================

pub const SUBCMD_REQUEST_DEVICE_INFO: u8 = 0x02;
pub const SUBCMD_SET_INPUT_REPORT_MODE: u8 = 0x03;
pub const SUBCMD_TRIGGER_BUTTONS_ELAPSED_TIME: u8 = 0x04;
pub const SUBCMD_SET_SHIPMENT_LOW_POWER_STATE: u8 = 0x08;
pub const SUBCMD_SPI_FLASH_READ: u8 = 0x10;
pub const SUBCMD_SET_NFC_MCU_CONFIG: u8 = 0x21;
pub const SUBCMD_SET_NFC_MCU_STATE: u8 = 0x22;
pub const SUBCMD_SET_PLAYER_LIGHTS: u8 = 0x30;
pub const SUBCMD_ENABLE_IMU: u8 = 0x40;
pub const SUBCMD_ENABLE_VIBRATION: u8 = 0x48;

// ============================================================================
// ACK Bytes
// ============================================================================

/// Plain ACK with no reply data.
pub const ACK_OK: u8 = 0x80;
/// ACK for device info (0x80 | type 0x02).
pub const ACK_DEVICE_INFO: u8 = 0x82;
/// ACK for trigger elapsed time.
pub const ACK_TRIGGER_ELAPSED: u8 = 0x83;
/// ACK for SPI flash read (0x80 | type 0x10).
pub const ACK_SPI_READ: u8 = 0x90;
/// ACK carrying NFC/IR MCU state.
pub const ACK_NFC_MCU_CONFIG: u8 = 0xA0;
/// ACK for enable vibration.
pub const ACK_VIBRATION: u8 = 0x82;

// ============================================================================
// Device Identity
// ============================================================================

/// Firmware version reported in device info (3.139).
pub const FIRMWARE_VERSION: [u8; 2] = [0x03, 0x8B];

/// Controller type: Pro Controller.
pub const CONTROLLER_TYPE_PRO: u8 = 0x03;

/// Battery full (high nibble 0x8) | Pro Controller connection (0xE).
pub const BATTERY_CONN_INFO: u8 = 0x8E;

/// Neutral 12-bit stick position (x = 0x800, y = 0x800), packed.
pub const STICK_CENTER: [u8; 3] = [0x00, 0x08, 0x80];

/// Vibrator input report byte.
pub const VIBRATOR_REPORT: u8 = 0x80;

/// MAC address length.
pub const MAC_LEN: usize = 6;

// ============================================================================
// SPI Flash
// ============================================================================

/// Maximum bytes per SPI read reply.
pub const SPI_READ_MAX: usize = 0x1D;

/// Address (4) + length (1) echoed before the flash data.
pub const SPI_READ_HEADER_LEN: usize = 5;

pub const SPI_SERIAL_NUMBER: u32 = 0x6000;
pub const SPI_IMU_FACTORY_CAL: u32 = 0x6020;
pub const SPI_STICK_FACTORY_CAL: u32 = 0x603D;
pub const SPI_COLORS: u32 = 0x6050;
pub const SPI_SENSOR_PARAMS: u32 = 0x6080;
pub const SPI_STICK_PARAMS: u32 = 0x6086;
pub const SPI_STICK_USER_CAL: u32 = 0x8010;
pub const SPI_IMU_USER_CAL: u32 = 0x8026;

// ============================================================================
// NFC/IR MCU
// ============================================================================

/// MCU state block returned for SetNfcMcuConfig.
pub const NFC_MCU_CONFIG_REPLY: [u8; 8] = [0x01, 0x00, 0xFF, 0x00, 0x03, 0x00, 0x05, 0x01];

// ============================================================================
// IMU
// ============================================================================

/// Accelerometer reading for +1 g at the default +/-8 g sensitivity.
pub const IMU_ONE_G: i16 = 4096;
