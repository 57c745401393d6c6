//! Report transport abstraction.
//!
//! Defines the `ReportTransport` trait for the HID interrupt channel,
//! allowing different implementations (file descriptor, mock, etc.).

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// Non-blocking read with no data available yet.
    #[error("Operation would block")]
    WouldBlock,

    #[error("Failed to open channel: {0}")]
    OpenFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Channel disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn is_would_block(&self) -> bool {
        matches!(self, TransportError::WouldBlock)
    }
}

/// Abstract duplex report channel.
///
/// Both the reader and the writer thread hold the same transport, so every
/// method takes `&self`.
pub trait ReportTransport: Send + Sync {
    /// Read one frame into `buf`, returning its length.
    ///
    /// Returns `TransportError::WouldBlock` when nothing is available.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write one frame.
    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Wait until a read may succeed, or `timeout` elapses.
    ///
    /// Called after `WouldBlock`; the caller reads again as soon as this
    /// returns, whatever the outcome.
    fn wait_readable(&self, _timeout: Duration) -> Result<(), TransportError> {
        std::thread::yield_now();
        Ok(())
    }
}
