//! Vector table, reset handler and fault handler.

use bringup::mmio::Mmio;
use bringup::vectors::{Exception, HandlerTable, SLOTS, Vector};
use bringup::{clocks, gpio, startup, timer};

use crate::platform::{FAULT_BLINK_US, LED_PIN};

unsafe extern "C" {
    static mut __data_start: u32;
    static mut __data_end: u32;
    static __data_load: u32;
    static mut __bss_start: u32;
    static mut __bss_end: u32;
}

/// Entered from the vector table, or from [`app_entry`] when boot stage 2 calls into flash.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn reset_handler() -> ! {
    // SAFETY: nothing has touched `.data` or `.bss` yet, the linker script provides the bounds.
    unsafe {
        startup::init_data(
            &raw mut __data_start,
            &raw mut __data_end,
            &raw const __data_load,
        );
        startup::zero_bss(&raw mut __bss_start, &raw mut __bss_end);
    }
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);

    // SAFETY: running on the RP2040.
    let mut bus = unsafe { Mmio::new() };
    clocks::init_system(&mut bus);

    crate::main()
}

/// First instruction of the image when boot stage 2 calls `APP_BASE` instead of going through a
/// vector table: take over the exceptions, then run the reset path on the ROM's stack.
#[cfg(feature = "handoff-call")]
#[unsafe(no_mangle)]
#[unsafe(link_section = ".entry")]
pub unsafe extern "C" fn app_entry() -> ! {
    unsafe extern "C" {
        static __vector_table: u32;
    }
    // SAFETY: running on the RP2040, `__vector_table` is placed by the linker script.
    unsafe {
        let mut bus = Mmio::new();
        bringup::handoff::VTOR.write(&mut bus, (&raw const __vector_table) as u32);
        reset_handler()
    }
}

// ——————————————————————————————— Vectors ——————————————————————————————— //

/// Slot 0 of the table, the initial stack pointer, is emitted by the linker script.
#[unsafe(link_section = ".vector_table.reset_vector")]
#[used]
static RESET_VECTOR: unsafe extern "C" fn() -> ! = reset_handler;

const HANDLERS: HandlerTable = HandlerTable::new().with(Exception::HardFault, hard_fault);

#[unsafe(link_section = ".vector_table.exceptions")]
#[used]
static EXCEPTIONS: [Vector; SLOTS] = HANDLERS.resolve(default_handler);

unsafe extern "C" fn hard_fault() {
    log::error!("hard fault");
    fault_blink()
}

unsafe extern "C" fn default_handler() {
    log::error!("unexpected exception");
    fault_blink()
}

/// Blinks the LED fast, forever.
fn fault_blink() -> ! {
    // SAFETY: running on the RP2040.
    let mut bus = unsafe { Mmio::new() };
    let led = gpio::Output::init(&mut bus, LED_PIN);
    loop {
        led.toggle(&mut bus);
        timer::sleep_us(&mut bus, FAULT_BLINK_US);
    }
}
