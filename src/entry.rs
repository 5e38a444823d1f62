//! Archive entries and their payload transform.
//!
//! An entry's payload is produced by an immutable chain:
//!
//! ```text
//! Entry ──hash──▶ Hashed ──compress──▶ Compressed ──finalize──▶ PreparedEntry
//! ```
//!
//! Image entries carry a SHA-256 of their *original* bytes in front of the
//! (possibly compressed) payload.  The hash attests the content as it was
//! before compression.

use std::borrow::Cow;

use crate::block::encode_envelope;
use crate::checksum::{content_hash, Digest};
use crate::codec::Codec;
use crate::error::{PackError, PackResult};
use crate::record::{check_width, ENTRY_NAME_LEN};

/// bit0: regular file.
pub const FLAG_REGULAR: u8 = 0x01;
/// bit1: image file.
pub const FLAG_IMAGE: u8 = 0x02;
/// bit4: payload wrapped in an LZO block envelope.
pub const FLAG_LZO: u8 = 0x10;

/// Section an entry belongs to.  The derived order is the section order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    Regular,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name:  String,
    pub flags: u8,
    pub data:  Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, flags: u8, data: Vec<u8>) -> Self {
        Self { name: name.into(), flags, data }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_LZO != 0
    }

    /// Type of the entry; exactly one type bit must be set.
    pub fn kind(&self) -> PackResult<EntryKind> {
        match (self.flags & FLAG_REGULAR != 0, self.flags & FLAG_IMAGE != 0) {
            (true, false) => Ok(EntryKind::Regular),
            (false, true) => Ok(EntryKind::Image),
            _ => Err(PackError::AmbiguousType { name: self.name.clone(), flags: self.flags }),
        }
    }

    /// Check everything that can be checked before any bytes are produced.
    pub fn validate(&self) -> PackResult<EntryKind> {
        check_width("entry", &self.name, "name", &self.name, ENTRY_NAME_LEN)?;
        self.kind()
    }

    /// Human-readable type, e.g. "lzo compressed image file".
    pub fn describe(&self) -> String {
        let mut s = String::new();
        if self.is_compressed() {
            s.push_str("lzo compressed ");
        }
        // Image wins when both bits are set.
        if self.flags & FLAG_IMAGE != 0 {
            s.push_str("image file");
        } else if self.flags & FLAG_REGULAR != 0 {
            s.push_str("regular file");
        } else {
            s.push_str("unknown");
        }
        s
    }

    /// Start the transform chain.
    pub fn hash(&self) -> PackResult<Hashed<'_>> {
        let kind = self.kind()?;
        let image_hash = match kind {
            EntryKind::Image   => Some(content_hash(&self.data)),
            EntryKind::Regular => None,
        };
        Ok(Hashed { entry: self, kind, image_hash })
    }

    /// Run the whole chain.
    pub fn prepare(&self, block_size: usize, codec: &dyn Codec, level: i32) -> PackResult<PreparedEntry> {
        Ok(self.hash()?.compress(block_size, codec, level)?.finalize())
    }
}

/// Ordering key for the archive body: regular entries before image
/// entries, then ascending by raw payload length.
pub fn layout_key(entry: &Entry) -> PackResult<(EntryKind, usize)> {
    Ok((entry.kind()?, entry.data.len()))
}

/// Stable sort of `entries` into layout order.  Ties keep input order.
pub fn layout_order(entries: &[Entry]) -> PackResult<Vec<&Entry>> {
    let mut keyed = entries
        .iter()
        .map(|e| layout_key(e).map(|k| (k, e)))
        .collect::<PackResult<Vec<_>>>()?;
    keyed.sort_by_key(|(k, _)| *k);
    Ok(keyed.into_iter().map(|(_, e)| e).collect())
}

#[derive(Debug)]
pub struct Hashed<'a> {
    entry:      &'a Entry,
    kind:       EntryKind,
    image_hash: Option<Digest>,
}

impl<'a> Hashed<'a> {
    pub fn compress(self, block_size: usize, codec: &dyn Codec, level: i32) -> PackResult<Compressed<'a>> {
        let body = if self.entry.is_compressed() {
            Cow::Owned(encode_envelope(block_size, &self.entry.data, codec, level)?)
        } else {
            Cow::Borrowed(self.entry.data.as_slice())
        };
        Ok(Compressed { hashed: self, body })
    }
}

#[derive(Debug)]
pub struct Compressed<'a> {
    hashed: Hashed<'a>,
    body:   Cow<'a, [u8]>,
}

impl Compressed<'_> {
    pub fn finalize(self) -> PreparedEntry {
        let Hashed { entry, kind, image_hash } = self.hashed;
        let payload = match image_hash {
            Some(hash) => {
                let mut p = Vec::with_capacity(hash.len() + self.body.len());
                p.extend_from_slice(&hash);
                p.extend_from_slice(&self.body);
                p
            }
            None => self.body.into_owned(),
        };
        PreparedEntry {
            name: entry.name.clone(),
            flags: entry.flags,
            kind,
            raw_len: entry.data.len(),
            image_hash,
            payload,
        }
    }
}

/// An entry with its final stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedEntry {
    pub name:       String,
    pub flags:      u8,
    pub kind:       EntryKind,
    pub raw_len:    usize,
    /// Hash of the original bytes, for image entries.
    pub image_hash: Option<Digest>,
    pub payload:    Vec<u8>,
}
