//! Generated Rust source for the sealed boot block.

use std::fmt::Write;

use bringup::image::{BLOCK_SIZE, PAYLOAD_SIZE};

const BYTES_PER_LINE: usize = 16;

/// The checksum bytes at the end of `block`, low byte first.
pub fn crc(block: &[u8; BLOCK_SIZE]) -> [u8; 4] {
    let mut crc = [0; 4];
    crc.copy_from_slice(&block[PAYLOAD_SIZE..]);
    crc
}

/// `boot2.rs`: the whole block, placed in `.boot2`.
pub fn block_source(block: &[u8; BLOCK_SIZE]) -> String {
    let mut out = String::new();
    out.push_str("// Generated by `trailer`: boot stage 2 padded to 252 bytes, CRC32/MPEG-2 last.\n\n");
    out.push_str("#[unsafe(link_section = \".boot2\")]\n");
    out.push_str("#[used]\n");
    let _ = writeln!(out, "pub static BOOT2: [u8; {BLOCK_SIZE}] = [");
    for line in block.chunks(BYTES_PER_LINE) {
        out.push_str("    ");
        let bytes: Vec<String> = line.iter().map(|b| format!("{b:#04x}")).collect();
        out.push_str(&bytes.join(", "));
        out.push_str(",\n");
    }
    out.push_str("];\n");
    out
}

/// `boot2_crc.rs`: only the checksum, placed in `.boot2_crc` right after a linked boot stage.
pub fn crc_source(crc: [u8; 4]) -> String {
    let [b0, b1, b2, b3] = crc;
    format!(
        "// Generated by `trailer --crc-only`: CRC32/MPEG-2 of the 252-byte boot stage.\n\n\
         #[unsafe(link_section = \".boot2_crc\")]\n\
         #[used]\n\
         pub static BOOT2_CRC: [u8; 4] = [{b0:#04x}, {b1:#04x}, {b2:#04x}, {b3:#04x}];\n"
    )
}
