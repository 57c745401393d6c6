//! Transport layer module.

pub mod fd;
pub mod mock;
pub mod traits;

pub use fd::FdTransport;
pub use mock::{MockRead, MockTransport};
pub use traits::{ReportTransport, TransportError};
