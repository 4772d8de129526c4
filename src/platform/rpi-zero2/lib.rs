//! fbcon for Raspberry Pi Zero 2W
//!
//! A bare-metal kernel that negotiates a framebuffer with the VideoCore
//! firmware over the mailbox property interface, then echoes the serial
//! console onto the screen.
//!
//! # Module Organization
//!
//! The platform is organized into layers with clear dependencies:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Application                      │
//! │          (main.rs - negotiation, echo loop)         │
//! ├─────────────────────────────────────────────────────┤
//! │       Subsystems          │         Display         │
//! │    echo, heartbeat        │ framebuffer, surface,   │
//! │                           │ console, font           │
//! ├─────────────────────────────────────────────────────┤
//! │                      HAL                            │
//! │          gpio, uart, mailbox, property              │
//! ├─────────────────────────────────────────────────────┤
//! │                      Core                           │
//! │                mmio, timer, cpu                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers reach hardware only through
//! [`RegisterAccess`](platform_core::mmio::RegisterAccess), so everything
//! above the core layer runs under `cargo test` on the host.

#![cfg_attr(not(test), no_std)]

// ============================================================================
// Module Hierarchy
// ============================================================================

/// Compile-time configuration
pub mod config;

/// UART console and `log` backend
pub mod logging;

/// Low-level core: MMIO, system timer, CPU control
pub mod platform_core;

/// Hardware abstraction: GPIO, UART, mailbox
pub mod hal;

/// Display: framebuffer negotiation, drawing, text console
pub mod display;

/// Subsystems: serial echo, LED heartbeat
pub mod subsystems;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

pub use config::KernelConfig;
pub use display::{
    FramebufferInfo, NegotiationError, Negotiator, STATUS_OK, init_framebuffer, status_of,
};
pub use hal::{Mailbox, MailboxError};
