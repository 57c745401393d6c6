//! Protocol module - Pro Controller report definitions.

pub mod constants;
pub mod report;
pub mod spi;
pub mod subcommand;

pub use constants::*;
pub use report::{InputReport, OutputReport, ReportError};
pub use subcommand::{OutputReportId, Subcommand};
