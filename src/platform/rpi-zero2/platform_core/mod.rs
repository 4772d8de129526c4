//! Low-Level Core Modules
//!
//! Foundation layer with no dependencies on other platform modules.
//! Provides register access, the system timer and CPU control.

pub mod cpu;
pub mod mmio;
pub mod timer;

// Re-exports for convenience
pub use cpu::{exception_level, wait_forever};
pub use mmio::{bus_to_phys, phys_to_bus, Mmio, RegisterAccess, PERIPHERAL_BASE};
pub use mmio::{dmb, dsb};
pub use timer::{spin_cycles, SystemTimer};
