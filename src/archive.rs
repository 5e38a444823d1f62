//! Layout engine — the primary embedding surface.
//!
//! ```text
//! header | meta records | index records | regular payloads | image payloads
//! ```
//!
//! Regular entries precede image entries; within each group entries are
//! ordered by ascending raw length.  The header signature covers the meta,
//! index and regular sections only, so the image section can be stripped
//! without invalidating it.
//!
//! ```no_run
//! use packfs::archive::build_archive;
//! use packfs::entry::{Entry, FLAG_REGULAR};
//! use packfs::record::MetaRecord;
//!
//! let meta = [MetaRecord::new(0, "board", "rev1")];
//! let entries = [Entry::new("init.bin", FLAG_REGULAR, b"ABCD".to_vec())];
//! let bytes = build_archive(&meta, &entries, false)?;
//! assert_eq!(bytes.len(), 49 + 97 + 73 + 4);
//! # Ok::<(), packfs::error::PackError>(())
//! ```

use log::info;

use crate::block::{validate_block_size, DEFAULT_BLOCK_SIZE};
use crate::checksum::content_hash_parts;
use crate::codec::{get_codec, Codec, CodecId, LZO_LEVEL};
use crate::entry::{layout_order, Entry, EntryKind, PreparedEntry};
use crate::error::{PackError, PackResult};
use crate::header::{Header, HEADER_SIZE};
use crate::record::{IndexRecord, MetaRecord, INDEX_RECORD_SIZE, META_RECORD_SIZE};

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`pack`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Envelope block size for compressed entries.
    pub block_size: usize,
    pub level:      i32,
    /// Leave the image section out of the output.
    pub strip:      bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            level:      LZO_LEVEL,
            strip:      false,
        }
    }
}

// ── PackFile ──────────────────────────────────────────────────────────────────

/// A fully laid-out archive.
#[derive(Debug, Clone)]
pub struct PackFile {
    pub header:  Header,
    /// Index records in layout order.
    pub index:   Vec<IndexRecord>,
    /// Transformed entries in layout order, parallel to `index`.
    pub entries: Vec<PreparedEntry>,
    pub bytes:   Vec<u8>,
}

impl PackFile {
    pub fn meta_section_offset(&self) -> usize {
        HEADER_SIZE
    }

    pub fn index_section_offset(&self) -> usize {
        HEADER_SIZE + self.header.meta_size as usize
    }

    pub fn body_offset(&self) -> usize {
        self.index_section_offset() + self.header.index_size as usize
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Build an archive with the default block size and LZO compressor.
pub fn build_archive(meta: &[MetaRecord], entries: &[Entry], strip: bool) -> PackResult<Vec<u8>> {
    let opts = PackOptions { strip, ..PackOptions::default() };
    Ok(pack(meta, entries, &opts)?.bytes)
}

pub fn pack(meta: &[MetaRecord], entries: &[Entry], opts: &PackOptions) -> PackResult<PackFile> {
    pack_with_codec(meta, entries, opts, get_codec(CodecId::Lzo).as_ref())
}

/// Build an archive, compressing flagged entries with `codec`.
///
/// Every record is validated before any entry is transformed, so a failure
/// never leaves partially built output behind.
pub fn pack_with_codec(
    meta:    &[MetaRecord],
    entries: &[Entry],
    opts:    &PackOptions,
    codec:   &dyn Codec,
) -> PackResult<PackFile> {
    validate_block_size(opts.block_size)?;
    for m in meta {
        m.validate()?;
    }
    for e in entries {
        e.validate()?;
    }

    let meta_size  = section_u16("meta section", meta.len() * META_RECORD_SIZE)?;
    let index_size = section_u16("index section", entries.len() * INDEX_RECORD_SIZE)?;

    info!(
        "Adding meta keys {}",
        meta.iter()
            .map(|m| format!("[{:#x}]{}={}", m.flags, m.key, m.value))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let ordered  = layout_order(entries)?;
    let prepared = prepare_all(&ordered, opts, codec)?;

    // ── Offsets ──────────────────────────────────────────────────────────────
    let mut cursor = (HEADER_SIZE + meta_size as usize + index_size as usize) as u64;
    let mut index = Vec::with_capacity(prepared.len());
    for (entry, p) in ordered.iter().zip(&prepared) {
        info!("Adding {} entry {}", entry.describe(), p.name);
        let length = p.payload.len() as u64;
        let end = cursor + length;
        if end > u32::MAX as u64 {
            return Err(PackError::SectionTooLarge { section: "archive", size: end, max: u32::MAX as u64 });
        }
        index.push(IndexRecord {
            offset: cursor as u32,
            length: length as u32,
            flags:  p.flags,
            name:   p.name.clone(),
        });
        info!("- Entry offset {} length {}", cursor, length);
        cursor = end;
    }

    // ── Sections ─────────────────────────────────────────────────────────────
    let mut head = Vec::with_capacity(meta_size as usize + index_size as usize);
    for m in meta {
        m.write(&mut head)?;
    }
    for r in &index {
        r.write(&mut head)?;
    }

    let reg: Vec<u8> = section_bytes(&prepared, EntryKind::Regular);
    let img: Vec<u8> = section_bytes(&prepared, EntryKind::Image);

    let signature = content_hash_parts([head.as_slice(), reg.as_slice()]);
    let header = Header::new(
        meta_size,
        index_size,
        reg.len() as u32,
        img.len() as u32,
        signature,
    );

    let total = HEADER_SIZE + head.len() + reg.len() + if opts.strip { 0 } else { img.len() };
    let mut bytes = Vec::with_capacity(total);
    header.write(&mut bytes)?;
    bytes.extend_from_slice(&head);
    bytes.extend_from_slice(&reg);
    if !opts.strip {
        bytes.extend_from_slice(&img);
    }
    info!("=> Total filesize {} bytes", bytes.len());

    Ok(PackFile { header, index, entries: prepared, bytes })
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn section_u16(section: &'static str, size: usize) -> PackResult<u16> {
    u16::try_from(size).map_err(|_| PackError::SectionTooLarge {
        section,
        size: size as u64,
        max:  u16::MAX as u64,
    })
}

fn section_bytes(prepared: &[PreparedEntry], kind: EntryKind) -> Vec<u8> {
    prepared
        .iter()
        .filter(|p| p.kind == kind)
        .flat_map(|p| p.payload.iter().copied())
        .collect()
}

/// Transform entries, already in layout order.  The result keeps that order.
fn prepare_all(ordered: &[&Entry], opts: &PackOptions, codec: &dyn Codec) -> PackResult<Vec<PreparedEntry>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        ordered
            .par_iter()
            .map(|e| e.prepare(opts.block_size, codec, opts.level))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        ordered
            .iter()
            .map(|e| e.prepare(opts.block_size, codec, opts.level))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::content_hash;
    use crate::codec::NoneCodec;
    use crate::entry::{FLAG_IMAGE, FLAG_LZO, FLAG_REGULAR};

    #[test]
    fn single_regular_entry() {
        let meta = [MetaRecord::new(0, "board", "rev1")];
        let entries = [Entry::new("init.bin", FLAG_REGULAR, b"ABCD".to_vec())];
        let pf = pack(&meta, &entries, &PackOptions::default()).unwrap();

        assert_eq!(pf.index.len(), 1);
        assert_eq!(pf.index[0].offset, 219);
        assert_eq!(pf.index[0].length, 4);
        assert_eq!(pf.header.meta_size, 97);
        assert_eq!(pf.header.index_size, 73);
        assert_eq!(pf.header.reg_size, 4);
        assert_eq!(pf.header.img_size, 0);
        assert_eq!(&pf.bytes[219..], b"ABCD");
        assert_eq!(pf.body_offset(), 219);

        let stripped = build_archive(&meta, &entries, true).unwrap();
        assert_eq!(stripped, pf.bytes);
    }

    #[test]
    fn offsets_are_contiguous_across_sections() {
        let entries = [
            Entry::new("i1", FLAG_IMAGE, vec![7; 3]),
            Entry::new("r1", FLAG_REGULAR, vec![1; 20]),
            Entry::new("r2", FLAG_REGULAR, vec![2; 5]),
        ];
        let pf = pack_with_codec(&[], &entries, &PackOptions::default(), &NoneCodec).unwrap();
        let names: Vec<&str> = pf.index.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["r2", "r1", "i1"]);

        let mut expected = (HEADER_SIZE + 3 * INDEX_RECORD_SIZE) as u32;
        for r in &pf.index {
            assert_eq!(r.offset, expected);
            expected += r.length;
        }
        assert_eq!(expected as usize, pf.bytes.len());
        // image payload = hash + raw bytes
        assert_eq!(pf.index[2].length, 32 + 3);
        assert_eq!(&pf.bytes[pf.index[2].span()][..32], &content_hash(&[7; 3]));
    }

    #[test]
    fn signature_covers_head_and_regular() {
        let meta = [MetaRecord::new(1, "k", "v")];
        let entries = [
            Entry::new("r", FLAG_REGULAR, b"regular".to_vec()),
            Entry::new("i", FLAG_IMAGE, b"image".to_vec()),
        ];
        let pf = pack(&meta, &entries, &PackOptions::default()).unwrap();
        let img_start = pf.bytes.len() - pf.header.img_size as usize;
        assert_eq!(pf.header.signature, content_hash(&pf.bytes[HEADER_SIZE..img_start]));
    }

    #[test]
    fn invalid_input_fails_before_transform() {
        let entries = [
            Entry::new("ok", FLAG_REGULAR | FLAG_LZO, vec![0; 4096]),
            Entry::new("both", FLAG_REGULAR | FLAG_IMAGE, vec![]),
        ];
        let err = pack(&[], &entries, &PackOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::AmbiguousType { ref name, .. } if name == "both"));

        let meta = [MetaRecord::new(0, "key", "v".repeat(65))];
        let err = pack(&meta, &[], &PackOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::FieldTooLong { field: "value", .. }));
    }

    #[test]
    fn bad_block_size() {
        let opts = PackOptions { block_size: 0, ..PackOptions::default() };
        assert!(matches!(pack(&[], &[], &opts), Err(PackError::InvalidBlockSize(0))));
    }

    #[test]
    fn meta_section_overflow() {
        // 676 * 97 > 65535
        let meta: Vec<MetaRecord> = (0..676).map(|i| MetaRecord::new(0, format!("k{i}"), "")).collect();
        let err = pack(&meta, &[], &PackOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::SectionTooLarge { section: "meta section", .. }));
    }

    #[test]
    fn empty_archive_is_just_header() {
        let pf = pack(&[], &[], &PackOptions::default()).unwrap();
        assert_eq!(pf.bytes.len(), HEADER_SIZE);
        assert_eq!(pf.header.signature, content_hash(&[]));
    }
}
