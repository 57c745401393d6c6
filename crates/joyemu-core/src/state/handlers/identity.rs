//! Identity handlers (device info, SPI flash).

use tracing::{debug, info};

use crate::events::EngineObserver;
use crate::protocol::{SPI_READ_HEADER_LEN, Subcommand};

use super::{HandleResult, HandlerContext};

/// 0x02 - Request device info.
///
/// Marks the connection as identified before the reply is built, so the
/// reply itself already carries stick data.
pub fn handle_device_info<O: EngineObserver>(ctx: &mut HandlerContext<'_, O>) -> HandleResult {
    ctx.state.mark_device_info_requested();
    let mac = *ctx.state.mac_address();
    info!(mac = %crate::events::format_mac(&mac), "Answering device info");
    ctx.reply(Subcommand::RequestDeviceInfo, |report| {
        report.ack_device_info(&mac)
    })
}

/// 0x10 - SPI flash read.
pub fn handle_spi_flash_read<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
    data: &[u8],
) -> HandleResult {
    if data.len() >= SPI_READ_HEADER_LEN {
        debug!(
            address = %format!("0x{:04X}", u32::from_le_bytes([data[0], data[1], data[2], data[3]])),
            len = data[4],
            "SPI flash read"
        );
    }
    ctx.reply(Subcommand::SpiFlashRead, |report| {
        report.ack_spi_flash_read(data)
    })
}
