#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod arch;
#[cfg(target_os = "none")]
mod boot2;
#[cfg(target_os = "none")]
mod boot2_crc;
#[cfg(target_os = "none")]
mod config;
#[cfg(target_os = "none")]
mod logger;
#[cfg(target_os = "none")]
mod pl011;
#[cfg(target_os = "none")]
mod platform;
#[cfg(target_os = "none")]
mod rt;

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("xipblink is RP2040 firmware, build it for thumbv6m-none-eabi");
    std::process::exit(1);
}

/// The application, entered by the reset handler once RAM and clocks are set up.
#[cfg(target_os = "none")]
fn main() -> ! {
    use bringup::{clocks, gpio, mmio::Mmio, timer};
    use log::{debug, info};

    logger::init();
    info!("xipblink running from XIP flash");
    debug!("clk_sys at {} Hz", clocks::SYS_HZ);
    info!(
        "read mode {:?}, handoff {:?}, clk_div {}",
        config::READ_MODE,
        config::HANDOFF,
        config::CLK_DIV
    );

    // SAFETY: running on the RP2040.
    let mut bus = unsafe { Mmio::new() };
    let led = gpio::Output::init(&mut bus, platform::LED_PIN);

    let mut blinks: u32 = 0;
    loop {
        led.toggle(&mut bus);
        blinks = blinks.wrapping_add(1);
        if blinks % 16 == 0 {
            debug!("{} toggles, {} us", blinks, timer::now_us(&mut bus));
        }
        timer::sleep_us(&mut bus, platform::BLINK_PERIOD_US);
    }
}

// ————————————————————————————— Panic Handler —————————————————————————————— //

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("{info}");
    loop {
        core::hint::spin_loop();
    }
}
