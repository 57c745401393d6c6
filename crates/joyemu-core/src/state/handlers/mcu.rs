//! NFC/IR MCU handlers.
//!
//! The MCU is not emulated; both subcommands are acknowledged so the host
//! moves on.

use tracing::debug;

use crate::events::EngineObserver;
use crate::protocol::Subcommand;

use super::{HandleResult, HandlerContext};

/// 0x21 - Set NFC/IR MCU configuration.
pub fn handle_set_nfc_mcu_config<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
    data: &[u8],
) -> HandleResult {
    debug!(command = ?data.first(), "NFC MCU config");
    ctx.reply(Subcommand::SetNfcMcuConfig, |report| {
        report.ack_set_nfc_mcu_config()
    })
}

/// 0x22 - Set NFC/IR MCU state.
pub fn handle_set_nfc_mcu_state<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
    data: &[u8],
) -> HandleResult {
    debug!(state = ?data.first(), "NFC MCU state");
    ctx.reply(Subcommand::SetNfcMcuState, |report| {
        report.ack_set_nfc_mcu_state()
    })
}
