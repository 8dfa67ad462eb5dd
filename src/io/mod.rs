//! Container formats and byte-level plumbing.
//!
//! Two container eras coexist in a client data directory:
//!
//! - [`MulContainer`] - a data file paired with a fixed-record index file,
//!   addressed by integer id.
//! - [`UopArchive`] - a block-chained archive addressed by the 64-bit hash
//!   of a virtual path.
//!
//! Both hand out [`Entry`] values describing where a resource's bytes live;
//! [`compression`] turns stored payloads into usable bytes.

mod arena;
mod bwt;
pub mod compression;
mod cursor;
mod entry;
mod mul;
mod source;
mod uop;

pub use arena::EntryArena;
pub use compression::decompress;
pub use cursor::SliceReader;
pub use entry::{Compression, DataSource, Entry, SENTINEL};
pub use mul::{MulContainer, IDX_RECORD_SIZE};
pub use source::ByteSource;
pub use uop::{UopArchive, UOP_MAGIC};
