//! Subcommand handlers - dispatch logic for each host subcommand.
//!
//! This module is split into submodules by functionality:
//! - `identity`: device info and SPI flash reads
//! - `mcu`: NFC/IR MCU configuration
//! - `settings`: input mode, lights, IMU, vibration and power settings

mod identity;
mod mcu;
mod settings;

use tracing::{debug, warn};

use crate::events::{EngineEvent, EngineObserver, ReportSource};
use crate::protocol::{InputReport, OutputReport, REPORT_SUBCOMMAND_REPLY, Subcommand};
use crate::queue::ReportQueue;
use crate::state::machine::ProtocolState;

use identity::{handle_device_info, handle_spi_flash_read};
use mcu::{handle_set_nfc_mcu_config, handle_set_nfc_mcu_state};
use settings::{
    handle_enable_imu, handle_enable_vibration, handle_set_input_report_mode,
    handle_set_player_lights, handle_set_shipment_state, handle_trigger_buttons_elapsed_time,
};

/// Result of handling one subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleResult {
    /// ACK queued.
    Replied(Subcommand),
    /// Unknown subcommand; a standard report was queued instead.
    Ignored(u8),
    /// Reply built but the queue refused it.
    Dropped(Subcommand),
}

/// Handler context containing all resources.
pub struct HandlerContext<'a, O: EngineObserver> {
    pub state: &'a mut ProtocolState,
    pub queue: &'a ReportQueue,
    pub observer: &'a O,
}

impl<'a, O: EngineObserver> HandlerContext<'a, O> {
    fn emit(&self, event: EngineEvent) {
        self.observer.on_event(&event);
    }

    /// Build a subcommand reply with the common header, let `ack` append
    /// the payload, and queue it.
    fn reply(&mut self, subcommand: Subcommand, ack: impl FnOnce(&mut InputReport)) -> HandleResult {
        let mut report = InputReport::standard(REPORT_SUBCOMMAND_REPLY);
        report.fill_standard_data(self.state.elapsed_ticks(), self.state.device_info_requested());
        ack(&mut report);

        let ack_byte = report.ack().unwrap_or_default();
        if !enqueue_report(self.queue, self.observer, report, ReportSource::Reply) {
            return HandleResult::Dropped(subcommand);
        }
        self.emit(EngineEvent::SubcommandHandled {
            subcommand,
            ack: ack_byte,
        });
        HandleResult::Replied(subcommand)
    }
}

/// Queue `report`, reporting the outcome to `observer`.
///
/// Returns false when the queue refused the report.
pub fn enqueue_report<O: EngineObserver + ?Sized>(
    queue: &ReportQueue,
    observer: &O,
    report: InputReport,
    source: ReportSource,
) -> bool {
    let report_id = report.report_id();
    match queue.push(report) {
        Ok(()) => {
            observer.on_event(&EngineEvent::ReportQueued { report_id, source });
            true
        }
        Err(e) => {
            warn!(error = %e, source = %source, "Input report not queued");
            observer.on_event(&EngineEvent::ReportDropped { report_id, source });
            false
        }
    }
}

/// Answer a RumbleAndSubcommand report.
///
/// Queues exactly one report: the ACK for a known subcommand, or an
/// unsolicited standard report for anything else.
pub fn handle_subcommand<O: EngineObserver>(
    report: &OutputReport,
    ctx: &mut HandlerContext<'_, O>,
) -> HandleResult {
    let elapsed = ctx.state.update_timer();
    let data = report.subcommand_data();

    let Some(subcommand) = report.subcommand() else {
        // Decoding guarantees the byte for this report id.
        return fallback(ctx, 0);
    };
    debug!(subcommand = %subcommand, elapsed, len = data.len(), "Dispatching subcommand");

    match subcommand {
        Subcommand::RequestDeviceInfo => handle_device_info(ctx),
        Subcommand::SetInputReportMode => handle_set_input_report_mode(ctx, data),
        Subcommand::TriggerButtonsElapsedTime => handle_trigger_buttons_elapsed_time(ctx),
        Subcommand::SetShipmentLowPowerState => handle_set_shipment_state(ctx),
        Subcommand::SpiFlashRead => handle_spi_flash_read(ctx, data),
        Subcommand::SetNfcMcuConfig => handle_set_nfc_mcu_config(ctx, data),
        Subcommand::SetNfcMcuState => handle_set_nfc_mcu_state(ctx, data),
        Subcommand::SetPlayerLights => handle_set_player_lights(ctx, data),
        Subcommand::EnableImu => handle_enable_imu(ctx, data),
        Subcommand::EnableVibration => handle_enable_vibration(ctx),
        Subcommand::Unknown(id) => fallback(ctx, id),
    }
}

// A NACK would have the host retry forever; carry on with a heartbeat.
fn fallback<O: EngineObserver>(ctx: &mut HandlerContext<'_, O>, id: u8) -> HandleResult {
    ctx.emit(EngineEvent::UnknownSubcommand { id });
    let report = InputReport::standard_full(ctx.state.motion_sensor_enabled());
    enqueue_report(ctx.queue, ctx.observer, report, ReportSource::Fallback);
    HandleResult::Ignored(id)
}
