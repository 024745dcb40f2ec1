// Generated by `trailer --crc-only`: CRC32/MPEG-2 of the 252-byte boot stage.
// Placeholder until the firmware has been built once; see `boot2.rs`.

#[unsafe(link_section = ".boot2_crc")]
#[used]
pub static BOOT2_CRC: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
