//! Subsystem Modules
//!
//! The serial echo session and the LED heartbeat fallback.
//! Depends on: hal, platform_core

pub mod echo;
pub mod heartbeat;

// Re-exports for convenience
pub use echo::{EchoSession, LineSummary};
pub use heartbeat::Heartbeat;
