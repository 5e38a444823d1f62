use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::checksum::{checksum16, Digest, DIGEST_LEN};

pub const MAGIC: u16 = 0x12FC;
pub const VERSION: u8 = 0x01;

/// Bytes covered by the header CRC: everything before the CRC field.
pub const HEADER_CRC_OFFSET: usize = 2 + 1 + 2 + 2 + 4 + 4 + DIGEST_LEN;
pub const HEADER_SIZE: usize = HEADER_CRC_OFFSET + 2;

/// Archive header.  Built last, once every other section is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic:        u16,
    pub version:      u8,
    pub meta_size:    u16,
    pub index_size:   u16,
    pub reg_size:     u32,
    pub img_size:     u32,
    /// Digest over meta, index and regular payload sections.
    pub signature:    Digest,
}

impl Header {
    pub fn new(meta_size: u16, index_size: u16, reg_size: u32, img_size: u32, signature: Digest) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            meta_size,
            index_size,
            reg_size,
            img_size,
            signature,
        }
    }

    fn body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.push(self.version);
        out.extend_from_slice(&self.meta_size.to_le_bytes());
        out.extend_from_slice(&self.index_size.to_le_bytes());
        out.extend_from_slice(&self.reg_size.to_le_bytes());
        out.extend_from_slice(&self.img_size.to_le_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// CRC-16 over every header byte preceding the CRC field.
    pub fn crc(&self) -> u16 {
        checksum16(&self.body())
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let body = self.body();
        writer.write_all(&body)?;
        writer.write_u16::<LittleEndian>(checksum16(&body))?;
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..HEADER_CRC_OFFSET].copy_from_slice(&self.body());
        out[HEADER_CRC_OFFSET..].copy_from_slice(&self.crc().to_le_bytes());
        out
    }
}
