//! The boot block the mask ROM loads from the start of flash.
//!
//! 256 bytes: a boot stage of at most 252 bytes, zero-padded, followed by its CRC32/MPEG-2 in
//! little endian. The ROM refuses to run a block whose checksum does not match.

use crcxx::crc32::{Crc, LookupTable256, catalog::CRC_32_MPEG_2};
use thiserror::Error;

pub const PAYLOAD_SIZE: usize = 252;
pub const BLOCK_SIZE: usize = 256;

const CRC32: Crc<LookupTable256> = Crc::<LookupTable256>::new(&CRC_32_MPEG_2);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    #[error("boot stage is {0} bytes, at most 252 fit in the boot block")]
    PayloadTooLarge(usize),
}

/// Zero-pads `payload` to the checksummed size.
pub fn pad(payload: &[u8]) -> Result<[u8; PAYLOAD_SIZE], ImageError> {
    if payload.len() > PAYLOAD_SIZE {
        return Err(ImageError::PayloadTooLarge(payload.len()));
    }
    let mut padded = [0; PAYLOAD_SIZE];
    padded[..payload.len()].copy_from_slice(payload);
    Ok(padded)
}

/// CRC32/MPEG-2: polynomial 0x04c11db7, not reflected, all-ones seed, no final xor.
pub fn checksum(padded: &[u8; PAYLOAD_SIZE]) -> u32 {
    CRC32.compute(padded)
}

/// Builds the full boot block for `payload`.
pub fn seal(payload: &[u8]) -> Result<[u8; BLOCK_SIZE], ImageError> {
    let padded = pad(payload)?;
    let mut block = [0; BLOCK_SIZE];
    block[..PAYLOAD_SIZE].copy_from_slice(&padded);
    block[PAYLOAD_SIZE..].copy_from_slice(&checksum(&padded).to_le_bytes());
    Ok(block)
}

/// Whether the ROM would accept `block`.
pub fn verify(block: &[u8; BLOCK_SIZE]) -> bool {
    let (payload, trailer) = block.split_at(PAYLOAD_SIZE);
    let mut padded = [0; PAYLOAD_SIZE];
    padded.copy_from_slice(payload);
    checksum(&padded).to_le_bytes() == trailer
}
