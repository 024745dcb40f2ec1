//! Build-time choices, selected with cargo features.

use bringup::flash::ReadMode;
use bringup::handoff::Handoff;

#[cfg(all(feature = "read-single", feature = "read-quad-output"))]
compile_error!("`read-single` and `read-quad-output` are mutually exclusive");

#[cfg(feature = "read-single")]
pub const READ_MODE: ReadMode = ReadMode::Single;
#[cfg(feature = "read-quad-output")]
pub const READ_MODE: ReadMode = ReadMode::QuadOutput;
#[cfg(not(any(feature = "read-single", feature = "read-quad-output")))]
pub const READ_MODE: ReadMode = ReadMode::QuadIo;

#[cfg(feature = "handoff-call")]
pub const HANDOFF: Handoff = Handoff::Call;
#[cfg(not(feature = "handoff-call"))]
pub const HANDOFF: Handoff = Handoff::VectorTable;

/// SSI clock divider: `clk_sys / 4` on the flash clock pin.
pub const CLK_DIV: u32 = 4;
