//! Block compression envelope.
//!
//! ```text
//! u32 original length | u16 block size | { u16 stored length | stored bytes }*
//! ```
//!
//! Every block is compressed on its own and stored raw when the compressed
//! form is not strictly smaller, so a stored length equal to the block's raw
//! length always means "uncompressed".

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::io::{self, Read, Write};

use crate::codec::Codec;
use crate::error::{PackError, PackResult};

/// Archive-wide envelope block size.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;
/// Encoded size of [`EnvelopeHeader`].
pub const ENVELOPE_HEADER_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub original_length: u32,
    pub block_size:      u16,
}

impl EnvelopeHeader {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.original_length)?;
        writer.write_u16::<LittleEndian>(self.block_size)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            original_length: reader.read_u32::<LittleEndian>()?,
            block_size:      reader.read_u16::<LittleEndian>()?,
        })
    }
}

/// Check that `block_size` can be carried by the envelope's u16 field.
pub fn validate_block_size(block_size: usize) -> PackResult<u16> {
    match u16::try_from(block_size) {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(PackError::InvalidBlockSize(block_size)),
    }
}

/// A single block after the fallback decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlock {
    pub raw_len: usize,
    pub stored:  Vec<u8>,
}

impl StoredBlock {
    pub fn is_compressed(&self) -> bool {
        self.stored.len() < self.raw_len
    }
}

/// Compress one block, keeping the raw bytes unless compression strictly
/// shrinks them.
pub fn store_block(codec: &dyn Codec, level: i32, chunk: &[u8]) -> PackResult<StoredBlock> {
    let packed = codec.compress(chunk, level)?;
    let stored = if packed.len() < chunk.len() { packed } else { chunk.to_vec() };
    Ok(StoredBlock { raw_len: chunk.len(), stored })
}

/// Wrap `data` in a block envelope.
pub fn encode_envelope(
    block_size: usize,
    data:       &[u8],
    codec:      &dyn Codec,
    level:      i32,
) -> PackResult<Vec<u8>> {
    let header = EnvelopeHeader {
        block_size:      validate_block_size(block_size)?,
        original_length: u32::try_from(data.len()).map_err(|_| PackError::SectionTooLarge {
            section: "envelope input",
            size:    data.len() as u64,
            max:     u32::MAX as u64,
        })?,
    };

    let blocks = compress_blocks(block_size, data, codec, level)?;

    let body: usize = blocks.iter().map(|b| 2 + b.stored.len()).sum();
    let mut out = Vec::with_capacity(ENVELOPE_HEADER_SIZE + body);
    header.write(&mut out)?;
    for (i, block) in blocks.iter().enumerate() {
        debug!(
            "- Compressing block {}... {} -> {} bytes ({})",
            i, block.raw_len, block.stored.len(), ratio(block.raw_len, block.stored.len()),
        );
        // A stored block never exceeds the raw block, which fits in u16.
        out.write_u16::<LittleEndian>(block.stored.len() as u16)?;
        out.write_all(&block.stored)?;
    }
    debug!(
        "- Overall compression {} -> {} bytes ({})",
        data.len(), out.len(), ratio(data.len(), out.len()),
    );
    Ok(out)
}

fn compress_blocks(
    block_size: usize,
    data:       &[u8],
    codec:      &dyn Codec,
    level:      i32,
) -> PackResult<Vec<StoredBlock>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let chunks: Vec<&[u8]> = data.chunks(block_size).collect();
        chunks
            .par_iter()
            .map(|chunk| store_block(codec, level, chunk))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        data.chunks(block_size)
            .map(|chunk| store_block(codec, level, chunk))
            .collect()
    }
}

/// Diagnostic size change, e.g. `-93.75%`.
pub fn ratio(before: usize, after: usize) -> String {
    if before == after {
        "incompressible".into()
    } else {
        format!("{:.2}%", -100.0 + 100.0 * after as f64 / before as f64)
    }
}
