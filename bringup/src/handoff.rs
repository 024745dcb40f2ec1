//! Leaving boot stage 2 for the application in the XIP window.

use crate::mmio::{Bus, Reg};

/// Vector table offset register of the Cortex-M0+.
pub const VTOR: Reg = Reg::at(0xe000_ed08);

/// Sets the Thumb bit on a branch target.
///
/// The Cortex-M0+ only executes Thumb code: an interworking branch to an even address faults.
#[inline(always)]
pub const fn thumb(addr: u32) -> u32 {
    addr | 1
}

/// Architecture-specific control transfer. Nothing else in the crate is allowed to move the
/// stack pointer or jump to a computed address.
pub trait ContextTransfer {
    /// Loads the main stack pointer.
    ///
    /// # Safety
    ///
    /// Everything still on the current stack is lost; the caller must not touch it afterwards.
    unsafe fn set_main_stack_pointer(&mut self, sp: u32);

    /// Interworking branch to `target`.
    ///
    /// # Safety
    ///
    /// `target` must be the address of code that never returns, with the Thumb bit set.
    unsafe fn branch_exchange(&mut self, target: u32) -> !;

    /// Calls the function at `target`.
    ///
    /// # Safety
    ///
    /// `target` must be the address of an `extern "C" fn()`, with the Thumb bit set.
    unsafe fn call(&mut self, target: u32);
}

/// How boot stage 2 leaves for the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handoff {
    /// Call the first instruction of the application image.
    Call,
    /// Point `VTOR` at the application vector table and boot it like a reset would.
    VectorTable,
}

/// Initial stack pointer and reset vector, as found in a vector table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub stack_pointer: u32,
    pub reset: u32,
}

/// Points `VTOR` at the vector table at `base` and fetches its first two slots.
///
/// The slots are read through `VTOR` so they come from wherever the core now takes its vectors.
#[inline(always)]
pub fn rebase_vector_table<B: Bus>(bus: &mut B, base: u32) -> Entry {
    VTOR.write(bus, base);
    let table = VTOR.read(bus) as usize;
    Entry {
        stack_pointer: Reg::at(table).read(bus),
        reset: Reg::at(table + 4).read(bus),
    }
}

/// Boots `entry`: stack pointer first, then the reset vector.
///
/// # Safety
///
/// `entry` must describe a valid stack and a reset handler.
#[inline(always)]
pub unsafe fn enter<C: ContextTransfer>(cpu: &mut C, entry: Entry) -> ! {
    unsafe {
        cpu.set_main_stack_pointer(entry.stack_pointer);
        cpu.branch_exchange(entry.reset)
    }
}

/// Calls the code at `addr` and parks the core if it ever comes back.
///
/// # Safety
///
/// `addr` must be the start of Thumb code.
#[inline(always)]
pub unsafe fn call<C: ContextTransfer>(cpu: &mut C, addr: u32) -> ! {
    unsafe { cpu.call(thumb(addr)) };
    loop {
        core::hint::spin_loop();
    }
}

/// Hands control to the application at `app_base`.
///
/// # Safety
///
/// The XIP window must be readable and hold an application image at `app_base`.
#[inline(always)]
pub unsafe fn hand_off<B: Bus, C: ContextTransfer>(
    bus: &mut B,
    cpu: &mut C,
    handoff: Handoff,
    app_base: u32,
) -> ! {
    match handoff {
        Handoff::Call => unsafe { call(cpu, app_base) },
        Handoff::VectorTable => {
            let entry = rebase_vector_table(bus, app_base);
            unsafe { enter(cpu, entry) }
        }
    }
}
