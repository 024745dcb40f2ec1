//! Architecture-specific code.

#[cfg(target_arch = "arm")]
mod cortex_m0;

#[cfg(target_arch = "arm")]
pub use cortex_m0::CortexM0;
