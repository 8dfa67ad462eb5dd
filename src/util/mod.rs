//! Shared utility types.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`ClientVersion`] - packed, ordered client version

mod error;
mod version;

pub use error::*;
pub use version::*;
