//! Digest and checksum primitives used by the encoder.
//!
//! - [`content_hash`]: SHA-256, used for the archive signature and for the
//!   per-image integrity prefix.
//! - [`checksum16`]: CRC-16/GENIBUS (poly 0x1021, init 0xFFFF, no reflection,
//!   xor-out 0xFFFF), guarding the header against accidental corruption only.

use crc::{Crc, CRC_16_GENIBUS};
use sha2::{Digest as _, Sha256};

/// Byte length of a [`Digest`].
pub const DIGEST_LEN: usize = 32;

/// A 256-bit content digest.
pub type Digest = [u8; DIGEST_LEN];

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_GENIBUS);

/// SHA-256 over exactly `data`.
pub fn content_hash(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// SHA-256 over the concatenation of `parts`, without materialising it.
pub fn content_hash_parts<'a, I>(parts: I) -> Digest
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// CRC-16/GENIBUS over `data`.
pub fn checksum16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}
