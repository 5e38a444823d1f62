pub mod checksum;
pub mod codec;
pub mod block;
pub mod record;
pub mod header;
pub mod entry;
pub mod archive;
pub mod error;
pub mod manifest;

pub use archive::{build_archive, pack, pack_with_codec, PackFile, PackOptions};
pub use codec::{Codec, CodecId, get_codec};
pub use entry::{Entry, EntryKind, FLAG_IMAGE, FLAG_LZO, FLAG_REGULAR};
pub use error::{PackError, PackResult};
pub use header::Header;
pub use record::{IndexRecord, MetaRecord};
