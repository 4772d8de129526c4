//! CPU state queries and idle loops

// ============================================================================
// Exception Level
// ============================================================================

/// Get current exception level (1, 2, or 3)
#[cfg(target_arch = "aarch64")]
pub fn exception_level() -> u8 {
    let el: u64;
    // SAFETY: CurrentEL is readable at every exception level.
    unsafe {
        core::arch::asm!("mrs {}, CurrentEL", out(reg) el, options(nomem, nostack));
    }
    ((el >> 2) & 0x3) as u8
}

/// Host builds run as an ordinary EL0 process
#[cfg(not(target_arch = "aarch64"))]
pub fn exception_level() -> u8 {
    0
}

// ============================================================================
// Idle
// ============================================================================

/// Wait for event (low-power idle hint)
#[inline(always)]
pub fn wfe() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: WFE has no side effects beyond suspending until an event.
    unsafe {
        core::arch::asm!("wfe", options(nomem, nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::hint::spin_loop();
}

/// Park the core forever
pub fn wait_forever() -> ! {
    loop {
        wfe();
    }
}
