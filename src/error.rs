//! Error taxonomy of the archive encoder.

use thiserror::Error;

use crate::codec::CodecError;

pub type PackResult<T> = Result<T, PackError>;

#[derive(Error, Debug)]
pub enum PackError {
    /// A string does not fit its fixed-width record field.
    #[error("{record} '{name}': field `{field}` is {len} bytes, maximum is {max}")]
    FieldTooLong {
        record: &'static str,
        name:   String,
        field:  &'static str,
        len:    usize,
        max:    usize,
    },

    /// Neither or both of the regular/image type bits are set.
    #[error("entry '{name}': flags {flags:#04x} must set exactly one of the regular or image type bits")]
    AmbiguousType { name: String, flags: u8 },

    /// A section or offset outgrew the integer width the header gives it.
    #[error("{section} is {size} bytes, maximum is {max}")]
    SectionTooLarge {
        section: &'static str,
        size:    u64,
        max:     u64,
    },

    #[error("invalid block size {0}: must be between 1 and 65535")]
    InvalidBlockSize(usize),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
