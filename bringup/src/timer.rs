//! The 64-bit microsecond timer, ticking once `init_system` set up the watchdog tick.

use crate::mmio::{Bus, Reg};

pub const TIMER_BASE: usize = 0x4005_4000;

/// Raw high word, no latching.
pub const TIMERAWH: Reg = Reg::offset(TIMER_BASE, 0x24);
/// Raw low word, no latching.
pub const TIMERAWL: Reg = Reg::offset(TIMER_BASE, 0x28);

/// Microseconds since the timer came out of reset.
///
/// The two halves are read separately: if the high word moved while the low word was read, the
/// low word wrapped and the read is retried.
pub fn now_us<B: Bus>(bus: &mut B) -> u64 {
    loop {
        let hi = TIMERAWH.read(bus);
        let lo = TIMERAWL.read(bus);
        if TIMERAWH.read(bus) == hi {
            return ((hi as u64) << 32) | lo as u64;
        }
    }
}

/// Busy-waits for at least `us` microseconds.
pub fn sleep_us<B: Bus>(bus: &mut B, us: u64) {
    let start = now_us(bus);
    while now_us(bus).wrapping_sub(start) < us {
        core::hint::spin_loop();
    }
}
