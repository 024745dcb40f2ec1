//! Board constants for a Raspberry Pi Pico.

/// Base address of UART0, wired to GPIO 0 (TX) and GPIO 1 (RX).
pub const UART0_BASE: usize = 0x4003_4000;
pub const UART0_TX_PIN: u32 = 0;
pub const UART0_RX_PIN: u32 = 1;
pub const UART0_BAUD: u32 = 115_200;

/// The on-board LED.
pub const LED_PIN: u32 = 25;

/// Half period of the application blink.
pub const BLINK_PERIOD_US: u64 = 500_000;
/// Half period of the fault blink.
pub const FAULT_BLINK_US: u64 = 50_000;
