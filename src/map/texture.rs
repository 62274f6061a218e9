//! Per-tile texture records of the map grid.
//!
//! Each tile is 6 bytes: byte 0 is the texture number, byte 1 packs the bank
//! (bits 0-1) and the rotation (bits 2-3). The remaining bytes are not part of
//! the texture identity and are carried through untouched.
//!
//! Tiles are stored mirrored on both axes relative to logical (tx, ty):
//! `file_index = (127 - ty) * 128 + (127 - tx)`.

use std::fmt;

use serde::Serialize;

use super::{read_world_number, MAP_HEADER_SIZE, MAP_SIZE, TILES_END, TILE_RECORD_SIZE};
use crate::error::{ensure_index, ensure_len, AssetError, Result};

const BANK_MASK: u8 = 0b0000_0011;
const ROTATION_SHIFT: u8 = 2;
const ROTATION_MASK: u8 = 0b0000_1100;

/// Texture id offset applied to the shared bank.
const SHARED_ID_OFFSET: i32 = 256;
/// Texture id offset applied to the shared prim bank (after sign extension).
const SHARED_PRIMS_ID_OFFSET: i32 = 64;

/// Degrees for each rotation code. Not monotonic.
const ROTATION_DEGREES: [u16; 4] = [180, 90, 0, 270];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureBank {
    /// Per-world set, numbered by the world number stored in the file
    World(i32),
    Shared,
    SharedPrims,
}

/// Texture identity relative to the texture root, e.g. `world3/12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextureKey {
    pub bank: TextureBank,
    pub id: i32,
}

impl fmt::Display for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bank {
            TextureBank::World(n) => write!(f, "world{}/{}", n, self.id),
            TextureBank::Shared => write!(f, "shared/{}", self.id),
            TextureBank::SharedPrims => write!(f, "shared_prims/{}", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileTexture {
    pub tx: usize,
    pub ty: usize,
    pub key: TextureKey,
    pub rotation_degrees: u16,
}

/// Position of a logical tile in file storage order.
pub fn tile_file_index(tx: usize, ty: usize) -> usize {
    (MAP_SIZE - 1 - ty) * MAP_SIZE + (MAP_SIZE - 1 - tx)
}

/// Absolute byte offset of a logical tile's record.
pub fn tile_offset(tx: usize, ty: usize) -> usize {
    MAP_HEADER_SIZE + tile_file_index(tx, ty) * TILE_RECORD_SIZE
}

pub fn rotation_degrees(code: u8) -> u16 {
    ROTATION_DEGREES[(code & 3) as usize]
}

/// Inverse of [`rotation_degrees`]; `None` for angles that are not a stored value.
pub fn rotation_code(degrees: u16) -> Option<u8> {
    ROTATION_DEGREES
        .iter()
        .position(|&d| d == degrees)
        .map(|code| code as u8)
}

fn decode_key(texture: u8, info: u8, world: i32) -> TextureKey {
    match info & BANK_MASK {
        0 => TextureKey {
            bank: TextureBank::World(world),
            id: texture as i32,
        },
        1 => TextureKey {
            bank: TextureBank::Shared,
            id: texture as i32 + SHARED_ID_OFFSET,
        },
        _ => TextureKey {
            bank: TextureBank::SharedPrims,
            id: texture as i8 as i32 + SHARED_PRIMS_ID_OFFSET,
        },
    }
}

fn check_tile(tx: usize, ty: usize) -> Result<()> {
    ensure_index(tx, MAP_SIZE)?;
    ensure_index(ty, MAP_SIZE)
}

pub fn read_tile(data: &[u8], tx: usize, ty: usize) -> Result<TileTexture> {
    check_tile(tx, ty)?;
    ensure_len(data, TILES_END)?;
    let world = read_world_number(data)?;
    let offset = tile_offset(tx, ty);
    let (texture, info) = (data[offset], data[offset + 1]);

    Ok(TileTexture {
        tx,
        ty,
        key: decode_key(texture, info, world),
        rotation_degrees: rotation_degrees((info & ROTATION_MASK) >> ROTATION_SHIFT),
    })
}

/// All tiles in logical row-major order (`ty * 128 + tx`).
pub fn read_all_tiles(data: &[u8]) -> Result<Vec<TileTexture>> {
    ensure_len(data, TILES_END)?;
    let world = read_world_number(data)?;
    let mut tiles = Vec::with_capacity(MAP_SIZE * MAP_SIZE);
    for ty in 0..MAP_SIZE {
        for tx in 0..MAP_SIZE {
            let offset = tile_offset(tx, ty);
            let (texture, info) = (data[offset], data[offset + 1]);
            tiles.push(TileTexture {
                tx,
                ty,
                key: decode_key(texture, info, world),
                rotation_degrees: rotation_degrees((info & ROTATION_MASK) >> ROTATION_SHIFT),
            });
        }
    }
    Ok(tiles)
}

/// Raw texture fields to paint onto one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePaint {
    pub texture: u8,
    /// Bank code 0-3 (0 world, 1 shared, 2/3 shared prims)
    pub bank: u8,
    pub rotation_degrees: u16,
}

/// Write texture number, bank and rotation of one tile; all other bits are kept.
pub fn write_tile(data: &[u8], tx: usize, ty: usize, paint: TilePaint) -> Result<Vec<u8>> {
    check_tile(tx, ty)?;
    ensure_len(data, TILES_END)?;
    if paint.bank > BANK_MASK {
        return Err(AssetError::CapacityExceeded(format!(
            "texture bank {} does not fit in 2 bits",
            paint.bank
        )));
    }
    let rotation = rotation_code(paint.rotation_degrees).ok_or_else(|| {
        AssetError::CapacityExceeded(format!(
            "rotation {} is not one of 0/90/180/270",
            paint.rotation_degrees
        ))
    })?;

    let mut out = data.to_vec();
    let offset = tile_offset(tx, ty);
    out[offset] = paint.texture;
    let info = out[offset + 1] & !(BANK_MASK | ROTATION_MASK);
    out[offset + 1] = info | paint.bank | (rotation << ROTATION_SHIFT);
    Ok(out)
}
