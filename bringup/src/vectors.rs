//! Exception dispatch table of the Cortex-M0+.
//!
//! The linked vector table has 48 words: the initial stack pointer, the reset vector, then the
//! 46 slots described here. A [`HandlerTable`] names the handlers that are overridden and is
//! resolved at compile time, every other slot pointing at a shared fallback.

/// An exception or interrupt handler.
pub type Handler = unsafe extern "C" fn();

/// One word of the vector table.
#[derive(Clone, Copy)]
#[repr(C)]
pub union Vector {
    pub handler: Handler,
    pub reserved: usize,
}

/// Slots after the stack pointer and the reset vector.
pub const SLOTS: usize = 46;

/// Number of external interrupt lines. The NVIC has room for 32, the last 6 slots are reserved.
pub const IRQS: u8 = 26;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exception {
    Nmi,
    HardFault,
    SvCall,
    PendSv,
    SysTick,
    /// External interrupt line `0..26`.
    Irq(u8),
}

impl Exception {
    /// Exception number, as used by the architecture (reset is 1).
    pub const fn number(self) -> usize {
        match self {
            Exception::Nmi => 2,
            Exception::HardFault => 3,
            Exception::SvCall => 11,
            Exception::PendSv => 14,
            Exception::SysTick => 15,
            Exception::Irq(n) => 16 + n as usize,
        }
    }

    /// Index into the [`SLOTS`] handler slots.
    pub const fn slot(self) -> usize {
        self.number() - 2
    }
}

/// Slots the architecture leaves unused, and those of the interrupt lines the RP2040 does not
/// wire. They hold zero.
pub const fn is_reserved(slot: usize) -> bool {
    matches!(slot + 2, 4..=10 | 12 | 13 | 42..=47)
}

/// The handlers overriding the fallback.
#[derive(Clone, Copy)]
pub struct HandlerTable {
    handlers: [Option<Handler>; SLOTS],
}

impl HandlerTable {
    /// A table where every exception goes to the fallback.
    pub const fn new() -> Self {
        Self {
            handlers: [None; SLOTS],
        }
    }

    /// Routes `exception` to `handler`.
    pub const fn with(mut self, exception: Exception, handler: Handler) -> Self {
        if let Exception::Irq(n) = exception {
            assert!(n < IRQS, "the RP2040 has 26 interrupt lines");
        }
        self.handlers[exception.slot()] = Some(handler);
        self
    }

    pub const fn handler(&self, exception: Exception) -> Option<Handler> {
        self.handlers[exception.slot()]
    }

    /// Produces the 46 linked slots, `fallback` filling every slot not overridden.
    pub const fn resolve(&self, fallback: Handler) -> [Vector; SLOTS] {
        let mut vectors = [Vector { reserved: 0 }; SLOTS];
        let mut slot = 0;
        while slot < SLOTS {
            if !is_reserved(slot) {
                let handler = match self.handlers[slot] {
                    Some(handler) => handler,
                    None => fallback,
                };
                vectors[slot] = Vector { handler };
            }
            slot += 1;
        }
        vectors
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
