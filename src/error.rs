use std::io;

use thiserror::Error;

/// Errors raised by the asset codecs and the buffer store.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Buffer is shorter than the fixed layout being read or written
    #[error("buffer too small: need {needed} bytes, have {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Light, prim, tile or EventPoint index outside the table
    #[error("index {index} out of range (valid: 0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A fixed table or a packed field cannot hold the requested data
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Computed section offsets point outside the file
    #[error("malformed region: {0}")]
    MalformedRegion(String),

    #[error("unsupported mission version {found} (newest known is {max})")]
    UnsupportedVersion { found: u32, max: u32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Record-level decode failure from binrw
    #[error("decode error: {0}")]
    Decode(#[from] binrw::Error),
}

pub type Result<T> = std::result::Result<T, AssetError>;

/// Fail with `BufferTooSmall` unless `data` holds at least `needed` bytes.
pub(crate) fn ensure_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(AssetError::BufferTooSmall {
            needed,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Fail with `IndexOutOfRange` unless `index < len`.
pub(crate) fn ensure_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(AssetError::IndexOutOfRange { index, len });
    }
    Ok(())
}
