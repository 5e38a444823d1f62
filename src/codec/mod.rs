//! Compressor primitives behind the block envelope.
//!
//! A [`Codec`] compresses one block at a time and emits a bare stream, with
//! no framing header of its own; the envelope in [`crate::block`] carries all
//! lengths.  The archive format only knows one real codec, LZO1X, selected by
//! the `FLAG_LZO` entry bit.  [`NoneCodec`] exists for tests and diagnostics.

use thiserror::Error;

/// Effort setting handed to the compressor.  LZO1X-999 is the level-9
/// variant of the LZO1X family.
pub const LZO_LEVEL: i32 = 9;

// ── CodecId enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    None,
    Lzo,
}

impl CodecId {
    /// Human-readable name (for diagnostics only — never parsed from disk).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None => "none",
            CodecId::Lzo  => "lzo",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(CodecId::None),
            "lzo"  => Some(CodecId::Lzo),
            _      => None,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError>;
    /// `expected_len` is the raw length recorded by the envelope, when known.
    fn decompress(&self, data: &[u8], expected_len: Option<usize>) -> Result<Vec<u8>, CodecError>;
}

// ── Built-in codec implementations ──────────────────────────────────────────

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8], _: i32) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
    fn decompress(&self, data: &[u8], _: Option<usize>) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

/// LZO1X-999, raw stream without a length header.
/// The matcher has a single (maximum) effort setting, so `level` is ignored.
pub struct LzoCodec;
impl Codec for LzoCodec {
    fn codec_id(&self) -> CodecId { CodecId::Lzo }
    fn compress(&self, data: &[u8], _: i32) -> Result<Vec<u8>, CodecError> {
        lzokay_native::compress(data).map_err(|e| CodecError::Compression(format!("{e:?}")))
    }
    fn decompress(&self, data: &[u8], expected_len: Option<usize>) -> Result<Vec<u8>, CodecError> {
        lzokay_native::decompress_all(data, expected_len)
            .map_err(|e| CodecError::Decompression(format!("{e:?}")))
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a CodecId to a built-in codec.
pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::None => Box::new(NoneCodec),
        CodecId::Lzo  => Box::new(LzoCodec),
    }
}
