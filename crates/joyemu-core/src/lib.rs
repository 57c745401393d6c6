//! JoyEmu-Core: Pro Controller HID protocol emulation in Rust.
//!
//! This crate answers a Switch host over an already-connected Bluetooth HID
//! interrupt channel, replying to subcommands with correctly framed input
//! reports.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Report layouts, subcommand IDs, SPI flash contents
//! - **Transport**: Channel abstraction (file descriptor, mock)
//! - **State**: Per-connection state and subcommand handlers
//! - **Queue**: Bounded outbound report queue
//! - **Events**: Observer pattern for front-end decoupling
//! - **Session**: The reader, writer and bootstrap threads
//!
//! # Example
//!
//! ```no_run
//! use joyemu_core::session::{EngineConfig, ProtocolEngine};
//! use joyemu_core::transport::FdTransport;
//!
//! let interrupt = FdTransport::open("/dev/hidg0").expect("open");
//! let control = FdTransport::open("/dev/hidg1").expect("open");
//! let mac = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
//!
//! let mut engine = ProtocolEngine::setup(interrupt, control, mac, EngineConfig::default())
//!     .expect("setup failed");
//! let exit = engine.drain();
//! println!("reader stopped: {:?}", exit);
//! ```

pub mod events;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use events::{EngineEvent, EngineObserver, NullObserver, RecordingObserver, TracingObserver};
pub use protocol::{InputReport, OutputReport, OutputReportId, ReportError, Subcommand};
pub use queue::{EnqueuePolicy, QueueError, ReportQueue, ReportReceiver, report_queue};
pub use session::{ConfigError, EngineConfig, EngineError, EngineStatus, ProtocolEngine, ReaderExit};
pub use state::{ProtocolState, StateSnapshot, TimerMode};
pub use transport::{FdTransport, MockRead, MockTransport, ReportTransport, TransportError};
