//! # uoarc
//!
//! Reader for the asset archives of legacy Ultima Online clients.
//!
//! The original formats and client developed by Origin Systems and
//! Electronic Arts; all rights to the data formats belong to their owners.
//! This is an independent implementation of the read side: locating,
//! indexing, patching, decompressing and decoding game resources from the
//! two container eras (index-paired MUL files and hash-addressed UOP
//! archives).
//!
//! ## Modules
//!
//! - [`util`] - errors, client versions
//! - [`io`] - byte sources, both container formats, decompression
//! - [`def`] / [`verdata`] - the text and binary patch overlays
//! - [`sprite`] - run-length pixel decoding to RGBA
//! - [`anim`] - animation index resolution and frame decoding
//! - [`art`], [`gumps`], [`hues`], [`tiledata`], [`map`], [`multis`],
//!   [`skills`], [`sounds`], [`fonts`], [`multimap`] - resource categories
//! - [`manager`] - parallel load orchestration and the patch sequence
//!
//! ## Example
//!
//! ```ignore
//! use uoarc::manager::{AssetManager, LoadOptions};
//!
//! let options = LoadOptions::new("7.0.59.8".parse()?, "/path/to/client");
//! let assets = AssetManager::load(options)?;
//!
//! if let Some(art) = &assets.art {
//!     let frame = art.static_art(0x0EED); // a pile of gold
//!     println!("{}x{}", frame.width, frame.height);
//! }
//! ```

pub mod anim;
pub mod art;
pub mod def;
pub mod fonts;
pub mod gumps;
pub mod hues;
pub mod io;
pub mod manager;
pub mod map;
pub mod multimap;
pub mod multis;
pub mod resolve;
pub mod skills;
pub mod sounds;
pub mod sprite;
pub mod table;
pub mod tiledata;
pub mod util;
pub mod verdata;

// Re-export commonly used types
pub use io::{ByteSource, Compression, Entry, MulContainer, UopArchive};
pub use manager::{AssetManager, LoadOptions};
pub use sprite::DecodedFrame;
pub use util::{ClientVersion, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::anim::{AnimGroupType, AnimationLoader, BodyConvFlags};
    pub use crate::io::{ByteSource, Compression, Entry, MulContainer, UopArchive};
    pub use crate::manager::{AssetManager, LoadOptions};
    pub use crate::sprite::DecodedFrame;
    pub use crate::util::{ClientVersion, Error, Result};
}
