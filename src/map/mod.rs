//! Codecs for `.iam` map files.
//!
//! ```text
//! offset                      content
//!      0                      save_type (i32)
//!      4                      object_bytes (i32), size of the object section
//!      8                      128 x 128 tile records, 6 bytes each
//!  98312                      building region (variable size)
//!  object_offset              object section (prims + MapWho)
//!  len - 4 - trailer          world number (i32)
//!  len - 2000                 2000-byte trailer, only when save_type >= 25
//! ```

pub mod building;
pub mod objects;
pub mod texture;

use serde::Serialize;

use crate::binary::read_i32;
use crate::error::{ensure_len, AssetError, Result};

pub const MAP_HEADER_SIZE: usize = 8;
/// Tiles along each side of the map.
pub const MAP_SIZE: usize = 128;
pub const TILE_RECORD_SIZE: usize = 6;
/// First byte after the tile grid.
pub const TILES_END: usize = MAP_HEADER_SIZE + MAP_SIZE * MAP_SIZE * TILE_RECORD_SIZE;

/// Save types from this version on carry a 2000-byte trailer.
pub const TRAILER_SAVE_TYPE: i32 = 25;
pub const TRAILER_SIZE: usize = 2000;

/// Fixed bytes after the object section, counted from the end of the file.
const OBJECT_TAIL: i64 = 12;
/// Offset correction applied to the tail-relative object position.
const OBJECT_BIAS: i64 = 8;

fn trailer_size(save_type: i32) -> usize {
    if save_type >= TRAILER_SAVE_TYPE {
        TRAILER_SIZE
    } else {
        0
    }
}

/// Object section offset as computed from the header, before any validation.
///
/// `len - 12 - trailer - object_bytes + 8`
pub fn raw_object_offset(data: &[u8]) -> Result<i64> {
    ensure_len(data, MAP_HEADER_SIZE)?;
    let save_type = read_i32(data, 0)?;
    let object_bytes = read_i32(data, 4)?;
    Ok(data.len() as i64 - OBJECT_TAIL - trailer_size(save_type) as i64 - object_bytes as i64
        + OBJECT_BIAS)
}

/// Validated section positions of one map buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapLayout {
    pub save_type: i32,
    pub object_bytes: usize,
    pub object_offset: usize,
    pub file_len: usize,
}

impl MapLayout {
    pub fn read(data: &[u8]) -> Result<Self> {
        ensure_len(data, TILES_END)?;
        let save_type = read_i32(data, 0)?;
        let object_bytes = read_i32(data, 4)?;
        if object_bytes < 4 {
            return Err(AssetError::MalformedRegion(format!(
                "object section size {object_bytes} is too small"
            )));
        }

        let offset = raw_object_offset(data)?;
        let end = offset + object_bytes as i64;
        let world_offset = data.len() as i64 - 4 - trailer_size(save_type) as i64;
        if offset < TILES_END as i64 || end > world_offset {
            return Err(AssetError::MalformedRegion(format!(
                "object section [{offset}, {end}) does not fit between the tiles and the \
                 world number at {world_offset}"
            )));
        }

        Ok(Self {
            save_type,
            object_bytes: object_bytes as usize,
            object_offset: offset as usize,
            file_len: data.len(),
        })
    }

    pub fn has_trailer(&self) -> bool {
        self.save_type >= TRAILER_SAVE_TYPE
    }

    pub fn object_end(&self) -> usize {
        self.object_offset + self.object_bytes
    }

    pub fn world_number_offset(&self) -> usize {
        self.file_len - 4 - trailer_size(self.save_type)
    }
}

/// Texture world number stored near the end of the file.
pub fn read_world_number(data: &[u8]) -> Result<i32> {
    ensure_len(data, MAP_HEADER_SIZE)?;
    let save_type = read_i32(data, 0)?;
    let back = 4 + trailer_size(save_type);
    ensure_len(data, MAP_HEADER_SIZE + back)?;
    read_i32(data, data.len() - back)
}
