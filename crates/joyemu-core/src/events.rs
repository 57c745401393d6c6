//! Event system for front-end decoupling.
//!
//! Lets the CLI (or any embedder) watch the engine without touching its
//! threads.

use std::fmt;
use std::sync::Mutex;

use crate::protocol::{OutputReportId, Subcommand};

/// Why a report was put on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    /// Delayed handshake kickoff.
    Bootstrap,
    /// Reply to a recognized subcommand.
    Reply,
    /// Standard report sent in place of an ACK for an unknown subcommand.
    Fallback,
    /// Standard report sent after a framing error.
    Resync,
}

impl fmt::Display for ReportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportSource::Bootstrap => write!(f, "bootstrap"),
            ReportSource::Reply => write!(f, "reply"),
            ReportSource::Fallback => write!(f, "fallback"),
            ReportSource::Resync => write!(f, "resync"),
        }
    }
}

/// Events emitted by the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine threads started.
    Started { mac: [u8; 6] },
    /// Output report decoded.
    ReportReceived {
        report_id: OutputReportId,
        subcommand: Option<Subcommand>,
    },
    /// Subcommand answered with an ACK.
    SubcommandHandled { subcommand: Subcommand, ack: u8 },
    /// Subcommand not recognized; no ACK sent.
    UnknownSubcommand { id: u8 },
    /// Input report queued for the writer.
    ReportQueued { report_id: u8, source: ReportSource },
    /// Input report discarded because the queue stayed full.
    ReportDropped { report_id: u8, source: ReportSource },
    /// Input report written to the channel.
    ReportWritten { report_id: u8, length: usize },
    /// Channel write failed; the report is gone.
    WriteFailed { report_id: u8, message: String },
    /// Output reader stopped for good.
    ReaderStopped { reason: String, resync: bool },
}

/// Observer trait for receiving engine events.
///
/// Called from the engine threads, so implementations must be cheap and
/// must not block.
pub trait EngineObserver: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn on_event(&self, _event: &EngineEvent) {}
}

/// Observer that keeps every event, for tests and diagnostics.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EngineObserver for RecordingObserver {
    fn on_event(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Started { mac } => {
                tracing::info!(mac = %format_mac(mac), "Engine started");
            }
            EngineEvent::ReportReceived {
                report_id,
                subcommand,
            } => match subcommand {
                Some(sub) => tracing::debug!(report = %report_id, subcommand = %sub, "Output report"),
                None => tracing::trace!(report = %report_id, "Output report"),
            },
            EngineEvent::SubcommandHandled { subcommand, ack } => {
                tracing::debug!(subcommand = %subcommand, ack = %format!("0x{:02X}", ack), "Subcommand answered");
            }
            EngineEvent::UnknownSubcommand { id } => {
                tracing::warn!(id = %format!("0x{:02X}", id), "Unknown subcommand ignored");
            }
            EngineEvent::ReportQueued { report_id, source } => {
                tracing::trace!(report = %format!("0x{:02X}", report_id), source = %source, "Input report queued");
            }
            EngineEvent::ReportDropped { report_id, source } => {
                tracing::warn!(report = %format!("0x{:02X}", report_id), source = %source, "Queue full, input report dropped");
            }
            EngineEvent::ReportWritten { report_id, length } => {
                tracing::trace!(report = %format!("0x{:02X}", report_id), len = length, "Input report written");
            }
            EngineEvent::WriteFailed { report_id, message } => {
                tracing::error!(report = %format!("0x{:02X}", report_id), "Write failed: {}", message);
            }
            EngineEvent::ReaderStopped { reason, resync } => {
                if *resync {
                    tracing::warn!(reason = %reason, "Reader stopped after resync");
                } else {
                    tracing::error!(reason = %reason, "Reader stopped");
                }
            }
        }
    }
}

/// Format a MAC address as `AA:BB:CC:DD:EE:FF`.
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}
