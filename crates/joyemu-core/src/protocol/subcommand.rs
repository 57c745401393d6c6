//! Typed report and subcommand identifiers.

use std::fmt;

use super::constants::*;

/// Output report ID sent by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputReportId {
    RumbleAndSubcommand,
    UpdateNfcPacket,
    RumbleOnly,
    RequestNfcData,
    /// Any ID the engine does not know about.
    Other(u8),
}

impl OutputReportId {
    pub fn from_u8(id: u8) -> Self {
        match id {
            OUTPUT_RUMBLE_AND_SUBCOMMAND => Self::RumbleAndSubcommand,
            OUTPUT_UPDATE_NFC_PACKET => Self::UpdateNfcPacket,
            OUTPUT_RUMBLE_ONLY => Self::RumbleOnly,
            OUTPUT_REQUEST_NFC_DATA => Self::RequestNfcData,
            other => Self::Other(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            Self::RumbleAndSubcommand => OUTPUT_RUMBLE_AND_SUBCOMMAND,
            Self::UpdateNfcPacket => OUTPUT_UPDATE_NFC_PACKET,
            Self::RumbleOnly => OUTPUT_RUMBLE_ONLY,
            Self::RequestNfcData => OUTPUT_REQUEST_NFC_DATA,
            Self::Other(id) => *id,
        }
    }
}

impl fmt::Display for OutputReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RumbleAndSubcommand => write!(f, "RUMBLE_AND_SUBCOMMAND"),
            Self::UpdateNfcPacket => write!(f, "UPDATE_NFC_PACKET"),
            Self::RumbleOnly => write!(f, "RUMBLE_ONLY"),
            Self::RequestNfcData => write!(f, "REQUEST_NFC_DATA"),
            Self::Other(id) => write!(f, "0x{:02X}", id),
        }
    }
}

/// Subcommand carried by a rumble + subcommand output report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    RequestDeviceInfo,
    SetInputReportMode,
    TriggerButtonsElapsedTime,
    SetShipmentLowPowerState,
    SpiFlashRead,
    SetNfcMcuConfig,
    SetNfcMcuState,
    SetPlayerLights,
    EnableImu,
    EnableVibration,
    Unknown(u8),
}

impl Subcommand {
    pub fn from_u8(id: u8) -> Self {
        match id {
            SUBCMD_REQUEST_DEVICE_INFO => Self::RequestDeviceInfo,
            SUBCMD_SET_INPUT_REPORT_MODE => Self::SetInputReportMode,
            SUBCMD_TRIGGER_BUTTONS_ELAPSED_TIME => Self::TriggerButtonsElapsedTime,
            SUBCMD_SET_SHIPMENT_LOW_POWER_STATE => Self::SetShipmentLowPowerState,
            SUBCMD_SPI_FLASH_READ => Self::SpiFlashRead,
            SUBCMD_SET_NFC_MCU_CONFIG => Self::SetNfcMcuConfig,
            SUBCMD_SET_NFC_MCU_STATE => Self::SetNfcMcuState,
            SUBCMD_SET_PLAYER_LIGHTS => Self::SetPlayerLights,
            SUBCMD_ENABLE_IMU => Self::EnableImu,
            SUBCMD_ENABLE_VIBRATION => Self::EnableVibration,
            other => Self::Unknown(other),
        }
    }

    /// Raw subcommand ID.
    pub fn value(&self) -> u8 {
        match self {
            Self::RequestDeviceInfo => SUBCMD_REQUEST_DEVICE_INFO,
            Self::SetInputReportMode => SUBCMD_SET_INPUT_REPORT_MODE,
            Self::TriggerButtonsElapsedTime => SUBCMD_TRIGGER_BUTTONS_ELAPSED_TIME,
            Self::SetShipmentLowPowerState => SUBCMD_SET_SHIPMENT_LOW_POWER_STATE,
            Self::SpiFlashRead => SUBCMD_SPI_FLASH_READ,
            Self::SetNfcMcuConfig => SUBCMD_SET_NFC_MCU_CONFIG,
            Self::SetNfcMcuState => SUBCMD_SET_NFC_MCU_STATE,
            Self::SetPlayerLights => SUBCMD_SET_PLAYER_LIGHTS,
            Self::EnableImu => SUBCMD_ENABLE_IMU,
            Self::EnableVibration => SUBCMD_ENABLE_VIBRATION,
            Self::Unknown(id) => *id,
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestDeviceInfo => write!(f, "REQUEST_DEVICE_INFO"),
            Self::SetInputReportMode => write!(f, "SET_INPUT_REPORT_MODE"),
            Self::TriggerButtonsElapsedTime => write!(f, "TRIGGER_BUTTONS_ELAPSED_TIME"),
            Self::SetShipmentLowPowerState => write!(f, "SET_SHIPMENT_LOW_POWER_STATE"),
            Self::SpiFlashRead => write!(f, "SPI_FLASH_READ"),
            Self::SetNfcMcuConfig => write!(f, "SET_NFC_MCU_CONFIG"),
            Self::SetNfcMcuState => write!(f, "SET_NFC_MCU_STATE"),
            Self::SetPlayerLights => write!(f, "SET_PLAYER_LIGHTS"),
            Self::EnableImu => write!(f, "ENABLE_IMU"),
            Self::EnableVibration => write!(f, "ENABLE_VIBRATION"),
            Self::Unknown(id) => write!(f, "UNKNOWN(0x{:02X})", id),
        }
    }
}
