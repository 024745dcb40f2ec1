//! Memory-mapped register access.
//!
//! A [`Reg`] is a register bound to a fixed address. It does not touch memory by itself: reads
//! and writes are issued through a [`Bus`], which is [`Mmio`] on the target and a simulated
//! register file in tests.

use core::ptr;

/// Something that can carry 32-bit register reads and writes.
pub trait Bus {
    fn read(&mut self, addr: usize) -> u32;
    fn write(&mut self, addr: usize, value: u32);
}

impl<B: Bus + ?Sized> Bus for &mut B {
    #[inline(always)]
    fn read(&mut self, addr: usize) -> u32 {
        (**self).read(addr)
    }

    #[inline(always)]
    fn write(&mut self, addr: usize, value: u32) {
        (**self).write(addr, value)
    }
}

/// The physical bus: volatile accesses to the RP2040 memory map.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Returns a handle on the physical bus.
    ///
    /// # Safety
    ///
    /// Must only be used on an RP2040, where every address handed to the bus is a valid,
    /// word-aligned register or memory location.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Bus for Mmio {
    #[inline(always)]
    fn read(&mut self, addr: usize) -> u32 {
        // SAFETY: the caller of `Mmio::new` guarantees the memory map.
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, addr: usize, value: u32) {
        // SAFETY: the caller of `Mmio::new` guarantees the memory map.
        unsafe { ptr::write_volatile(addr as *mut u32, value) }
    }
}

/// A 32-bit register at a fixed address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reg {
    addr: usize,
}

impl Reg {
    pub const fn at(addr: usize) -> Self {
        Self { addr }
    }

    /// A register at `offset` from a peripheral base.
    pub const fn offset(base: usize, offset: usize) -> Self {
        Self { addr: base + offset }
    }

    pub const fn addr(self) -> usize {
        self.addr
    }

    #[inline(always)]
    pub fn read<B: Bus>(self, bus: &mut B) -> u32 {
        bus.read(self.addr)
    }

    #[inline(always)]
    pub fn write<B: Bus>(self, bus: &mut B, value: u32) {
        bus.write(self.addr, value)
    }

    /// Read-modify-write.
    #[inline(always)]
    pub fn modify<B: Bus>(self, bus: &mut B, f: impl FnOnce(u32) -> u32) {
        let value = self.read(bus);
        self.write(bus, f(value));
    }

    #[inline(always)]
    pub fn set_bits<B: Bus>(self, bus: &mut B, mask: u32) {
        self.modify(bus, |v| v | mask);
    }

    #[inline(always)]
    pub fn clear_bits<B: Bus>(self, bus: &mut B, mask: u32) {
        self.modify(bus, |v| v & !mask);
    }

    /// Spins until `done` holds for the register value.
    ///
    /// There is no timeout: during boot there is nobody to report a stuck peripheral to.
    #[inline(always)]
    pub fn wait_until<B: Bus>(self, bus: &mut B, done: impl Fn(u32) -> bool) {
        while !done(self.read(bus)) {
            core::hint::spin_loop();
        }
    }
}
