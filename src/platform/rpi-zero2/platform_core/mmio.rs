//! Low-level MMIO, bus addressing and memory barrier primitives
//!
//! Drivers never dereference peripheral addresses themselves. They go
//! through [`RegisterAccess`], which [`Mmio`] implements with volatile
//! loads and stores, so the same driver code can be exercised against the
//! simulated peripherals in the unit tests.

use core::ptr::{read_volatile, write_volatile};

// ============================================================================
// Hardware Base Addresses
// ============================================================================

/// BCM2837 peripheral base address (Pi Zero 2W / Pi 3, same window as Pi 2)
pub const PERIPHERAL_BASE: usize = 0x3F00_0000;

/// VideoCore bus alias for ARM RAM with the GPU L2 cache bypassed
pub const BUS_UNCACHED_ALIAS: u32 = 0xC000_0000;

/// Bits of a bus address that carry the ARM physical address
const BUS_ADDRESS_MASK: u32 = 0x3FFF_FFFF;

// ============================================================================
// Register Access
// ============================================================================

/// Word-sized access to memory-mapped hardware.
///
/// Implementations must perform every access exactly once and in program
/// order: status registers change under the CPU's feet and data registers
/// pop FIFOs when read.
pub trait RegisterAccess {
    /// Read the 32-bit register at `addr`
    fn read_word(&self, addr: usize) -> u32;

    /// Write `value` to the 32-bit register at `addr`
    fn write_word(&self, addr: usize, value: u32);

    /// Address under which the VideoCore reaches the memory at `ptr`.
    ///
    /// The peer may write through this address, so `ptr` must come from
    /// a mutable borrow that outlives the exchange.
    fn bus_address(&self, ptr: *mut u32) -> u32 {
        phys_to_bus(ptr as usize)
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &T {
    #[inline(always)]
    fn read_word(&self, addr: usize) -> u32 {
        (**self).read_word(addr)
    }

    #[inline(always)]
    fn write_word(&self, addr: usize, value: u32) {
        (**self).write_word(addr, value)
    }

    #[inline(always)]
    fn bus_address(&self, ptr: *mut u32) -> u32 {
        (**self).bus_address(ptr)
    }
}

/// Direct access to the physical peripheral window
#[derive(Debug, Clone, Copy, Default)]
pub struct Mmio;

impl RegisterAccess for Mmio {
    #[inline(always)]
    fn read_word(&self, addr: usize) -> u32 {
        // SAFETY: callers only pass register addresses inside the peripheral
        // window, which is identity mapped and always readable.
        unsafe { read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write_word(&self, addr: usize, value: u32) {
        // SAFETY: see read_word.
        unsafe { write_volatile(addr as *mut u32, value) }
    }
}

// ============================================================================
// Bus Address Translation
// ============================================================================

/// ARM physical address to VideoCore bus address (uncached alias)
#[inline]
pub const fn phys_to_bus(addr: usize) -> u32 {
    (addr as u32 & BUS_ADDRESS_MASK) | BUS_UNCACHED_ALIAS
}

/// VideoCore bus address to ARM physical address
#[inline]
pub const fn bus_to_phys(addr: u32) -> usize {
    (addr & BUS_ADDRESS_MASK) as usize
}

// ============================================================================
// Memory Barriers
// ============================================================================

/// Data Memory Barrier - orders memory accesses before and after it
#[inline(always)]
pub fn dmb() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("dmb sy", options(nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Data Synchronization Barrier - all memory accesses complete before the
/// next instruction executes
#[inline(always)]
pub fn dsb() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
