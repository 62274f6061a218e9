//! Binary codecs behind the light, map and mission editors.
//!
//! Each codec works on a whole-file byte buffer: reads decode a region into
//! typed records, writes take the current bytes and return a complete
//! replacement. [`store::BufferStore`] owns the buffer between edits.

mod binary;

pub mod config;
pub mod error;
pub mod lights;
pub mod map;
pub mod math;
pub mod mission;
pub mod store;

pub use config::EditorConfig;
pub use error::{AssetError, Result};
pub use store::{AssetKind, BufferStore};
