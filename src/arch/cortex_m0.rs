//! Control transfer on the Cortex-M0+.

use core::arch::asm;

use bringup::handoff::ContextTransfer;

/// The executing core.
pub struct CortexM0 {
    _private: (),
}

impl CortexM0 {
    /// # Safety
    ///
    /// Must run on a Cortex-M0+ in privileged thread mode.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl ContextTransfer for CortexM0 {
    #[inline(always)]
    unsafe fn set_main_stack_pointer(&mut self, sp: u32) {
        unsafe { asm!("msr msp, {}", in(reg) sp, options(nomem, nostack, preserves_flags)) };
    }

    #[inline(always)]
    unsafe fn branch_exchange(&mut self, target: u32) -> ! {
        unsafe { asm!("bx {}", in(reg) target, options(noreturn, nostack)) }
    }

    #[inline(always)]
    unsafe fn call(&mut self, target: u32) {
        unsafe { asm!("blx {}", in(reg) target, clobber_abi("C")) };
    }
}
