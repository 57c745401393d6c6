//! Controller setting handlers.

use tracing::{debug, info};

use crate::events::EngineObserver;
use crate::protocol::Subcommand;

use super::{HandleResult, HandlerContext};

/// 0x03 - Set input report mode.
pub fn handle_set_input_report_mode<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
    data: &[u8],
) -> HandleResult {
    if let Some(&mode) = data.first() {
        ctx.state.set_input_report_mode(mode);
    }
    ctx.reply(Subcommand::SetInputReportMode, |report| {
        report.ack_set_input_report_mode()
    })
}

/// 0x04 - Trigger buttons elapsed time.
pub fn handle_trigger_buttons_elapsed_time<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
) -> HandleResult {
    ctx.reply(Subcommand::TriggerButtonsElapsedTime, |report| {
        report.ack_trigger_buttons_elapsed_time()
    })
}

/// 0x08 - Set shipment low power state.
pub fn handle_set_shipment_state<O: EngineObserver>(ctx: &mut HandlerContext<'_, O>) -> HandleResult {
    ctx.reply(Subcommand::SetShipmentLowPowerState, |report| {
        report.ack_set_shipment_low_power_state()
    })
}

/// 0x30 - Set player lights.
pub fn handle_set_player_lights<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
    data: &[u8],
) -> HandleResult {
    if let Some(&lights) = data.first() {
        debug!(lights = %format!("{:08b}", lights), "Player lights");
    }
    ctx.reply(Subcommand::SetPlayerLights, |report| {
        report.ack_set_player_lights()
    })
}

/// 0x40 - Enable IMU. Only a payload of `0x01` enables it.
pub fn handle_enable_imu<O: EngineObserver>(
    ctx: &mut HandlerContext<'_, O>,
    data: &[u8],
) -> HandleResult {
    let arg = data.first().copied().unwrap_or_default();
    let was_enabled = ctx.state.motion_sensor_enabled();
    ctx.state.apply_enable_imu(arg);
    if !was_enabled && ctx.state.motion_sensor_enabled() {
        info!("IMU enabled");
    }
    ctx.reply(Subcommand::EnableImu, |report| report.ack_enable_imu())
}

/// 0x48 - Enable vibration.
pub fn handle_enable_vibration<O: EngineObserver>(ctx: &mut HandlerContext<'_, O>) -> HandleResult {
    ctx.reply(Subcommand::EnableVibration, |report| {
        report.ack_enable_vibration()
    })
}
