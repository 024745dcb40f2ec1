//! The RESETS block: peripherals come out of power-on held in reset.

use crate::mmio::{Bus, Reg};

pub const RESETS_BASE: usize = 0x4000_c000;

pub const RESET: Reg = Reg::offset(RESETS_BASE, 0x0);
pub const RESET_DONE: Reg = Reg::offset(RESETS_BASE, 0x8);

pub const IO_BANK0: u32 = 1 << 5;
pub const PLL_SYS: u32 = 1 << 12;
pub const TIMER: u32 = 1 << 21;
pub const UART0: u32 = 1 << 22;

/// Puts the peripherals in `mask` in reset.
pub fn reset<B: Bus>(bus: &mut B, mask: u32) {
    RESET.set_bits(bus, mask);
}

/// Releases the peripherals in `mask` and waits until all of them report done.
pub fn unreset_wait<B: Bus>(bus: &mut B, mask: u32) {
    RESET.clear_bits(bus, mask);
    RESET_DONE.wait_until(bus, |done| done & mask == mask);
}
