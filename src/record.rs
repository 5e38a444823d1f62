//! Fixed-width meta and index records.
//!
//! Strings are UTF-8, right-padded with zero bytes to the field width.  A
//! string that does not fit is rejected rather than truncated.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::error::{PackError, PackResult};

pub const META_KEY_LEN:   usize = 32;
pub const META_VALUE_LEN: usize = 64;
pub const ENTRY_NAME_LEN: usize = 64;

/// flags(1) + key(32) + value(64)
pub const META_RECORD_SIZE:  usize = 1 + META_KEY_LEN + META_VALUE_LEN;
/// offset(4) + length(4) + flags(1) + name(64)
pub const INDEX_RECORD_SIZE: usize = 4 + 4 + 1 + ENTRY_NAME_LEN;

/// Ensure `value` fits a `width`-byte field.
pub fn check_width(
    record: &'static str,
    name:   &str,
    field:  &'static str,
    value:  &str,
    width:  usize,
) -> PackResult<()> {
    if value.len() > width {
        return Err(PackError::FieldTooLong {
            record,
            name: name.to_owned(),
            field,
            len: value.len(),
            max: width,
        });
    }
    Ok(())
}

/// Write `value` zero-padded to `width` bytes.  Callers validate the width first.
fn write_padded<W: Write>(mut writer: W, value: &str, width: usize) -> io::Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > width {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "string wider than its field"));
    }
    writer.write_all(bytes)?;
    writer.write_all(&vec![0u8; width - bytes.len()])
}

// ── MetaRecord ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRecord {
    pub flags: u8,
    pub key:   String,
    pub value: String,
}

impl MetaRecord {
    pub fn new(flags: u8, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { flags, key: key.into(), value: value.into() }
    }

    pub fn validate(&self) -> PackResult<()> {
        check_width("meta", &self.key, "key", &self.key, META_KEY_LEN)?;
        check_width("meta", &self.key, "value", &self.value, META_VALUE_LEN)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.flags)?;
        write_padded(&mut writer, &self.key, META_KEY_LEN)?;
        write_padded(&mut writer, &self.value, META_VALUE_LEN)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> PackResult<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::with_capacity(META_RECORD_SIZE);
        self.write(&mut out)?;
        Ok(out)
    }
}

// ── IndexRecord ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    /// Absolute from the start of the archive.
    pub offset: u32,
    /// Length of the stored (transformed) payload.
    pub length: u32,
    pub flags:  u8,
    pub name:   String,
}

impl IndexRecord {
    pub fn validate(&self) -> PackResult<()> {
        check_width("entry", &self.name, "name", &self.name, ENTRY_NAME_LEN)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.length)?;
        writer.write_u8(self.flags)?;
        write_padded(&mut writer, &self.name, ENTRY_NAME_LEN)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> PackResult<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::with_capacity(INDEX_RECORD_SIZE);
        self.write(&mut out)?;
        Ok(out)
    }

    /// Byte range of the payload within the archive.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset as usize + self.length as usize)
    }
}
