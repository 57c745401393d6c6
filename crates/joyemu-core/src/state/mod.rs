//! Protocol state and subcommand handling.

pub mod handlers;
pub mod machine;

pub use handlers::{HandleResult, HandlerContext, enqueue_report, handle_subcommand};
pub use machine::{ElapsedTimer, ProtocolState, SharedFlags, StateSnapshot, TimerMode};
