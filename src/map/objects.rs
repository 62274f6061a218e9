//! Prim (placed object) array and the MapWho spatial index.
//!
//! Object section layout:
//!
//! ```text
//! num_objects          i32, stored count including the sentinel
//! prims[num_objects]   8 bytes each; prims[0] is a sentinel
//! mapwho[32 * 32]      u16 each: bits 0-10 start (1-based), bits 11-15 count
//! ```
//!
//! MapWho is a back-reference index: each cell names a contiguous run of the
//! prim array. A prim's `x`/`z` are local to the cell that owns it, so a prim
//! no cell claims has no position and is not drawn.

use std::ops::Range;

use binrw::binrw;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::MapLayout;
use crate::binary::{read_array, read_at, read_i32, write_at};
use crate::error::{ensure_index, AssetError, Result};
use crate::math::world_to_ui;

pub const PRIM_RECORD_SIZE: usize = 8;
/// Cells along each side of the MapWho grid.
pub const MAPWHO_SIZE: usize = 32;
pub const MAPWHO_CELLS: usize = MAPWHO_SIZE * MAPWHO_SIZE;
pub const MAPWHO_BYTES: usize = MAPWHO_CELLS * 2;

/// Largest run a single cell can describe (5-bit count).
pub const MAX_CELL_COUNT: usize = 0x1F;
/// Largest start index a cell can describe (11-bit field).
pub const MAX_START_INDEX: usize = 0x7FF;
/// Sanity bound on the stored object count.
pub const DEFAULT_MAX_OBJECTS: usize = 10_000;

/// World units per local prim unit.
const LOCAL_UNIT: i32 = 4;
/// World units covered by one MapWho cell (256 local units).
pub const CELL_WORLD_SIZE: i32 = 256 * LOCAL_UNIT;

// ============================================================================
// Records
// ============================================================================

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimRecord {
    pub y: i16,
    /// Position inside the owning cell
    pub x: u8,
    /// Position inside the owning cell
    pub z: u8,
    /// Prim type number; 0 marks an empty record
    pub prim: u8,
    pub yaw: u8,
    pub flags: u8,
    pub inside: u8,
}

/// One packed MapWho cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapWhoCell(pub u16);

impl MapWhoCell {
    pub fn pack(start: usize, count: usize) -> Result<Self> {
        if count > MAX_CELL_COUNT {
            return Err(AssetError::CapacityExceeded(format!(
                "MapWho cell needs {count} prims, limit is {MAX_CELL_COUNT}"
            )));
        }
        if start > MAX_START_INDEX {
            return Err(AssetError::CapacityExceeded(format!(
                "MapWho start index {start} exceeds {MAX_START_INDEX}"
            )));
        }
        Ok(Self(start as u16 | ((count as u16) << 11)))
    }

    /// 1-based start index (equal to the stored array index).
    pub fn start(&self) -> usize {
        (self.0 & 0x7FF) as usize
    }

    pub fn count(&self) -> usize {
        ((self.0 >> 11) & 0x1F) as usize
    }

    /// Logical (sentinel-excluded) index range this cell claims.
    pub fn logical_range(&self) -> Option<Range<usize>> {
        if self.count() == 0 || self.start() == 0 {
            return None;
        }
        let first = self.start() - 1;
        Some(first..first + self.count())
    }
}

/// MapWho cell index for cell coordinates.
pub fn cell_index(cell_x: usize, cell_z: usize) -> usize {
    cell_x * MAPWHO_SIZE + cell_z
}

/// A prim in the logical list together with the cell that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prim {
    pub record: PrimRecord,
    pub cell: Option<usize>,
}

impl Prim {
    pub fn is_visible(&self) -> bool {
        self.record.prim != 0 && self.cell.is_some()
    }

    /// World (x, z), available once a cell owns the prim.
    pub fn world_position(&self) -> Option<(i32, i32)> {
        let cell = self.cell?;
        let (cx, cz) = ((cell / MAPWHO_SIZE) as i32, (cell % MAPWHO_SIZE) as i32);
        Some((
            cx * CELL_WORLD_SIZE + self.record.x as i32 * LOCAL_UNIT,
            cz * CELL_WORLD_SIZE + self.record.z as i32 * LOCAL_UNIT,
        ))
    }

    pub fn ui_position(&self) -> Option<(i32, i32)> {
        self.world_position().map(|(x, z)| (world_to_ui(x), world_to_ui(z)))
    }

    /// Move the prim to a world position, re-deriving its cell.
    pub fn set_world_position(&mut self, x: i32, z: i32) -> Result<()> {
        let extent = CELL_WORLD_SIZE * MAPWHO_SIZE as i32;
        if !(0..extent).contains(&x) || !(0..extent).contains(&z) {
            return Err(AssetError::IndexOutOfRange {
                index: x.max(z).max(0) as usize,
                len: extent as usize,
            });
        }
        let cell = cell_index((x / CELL_WORLD_SIZE) as usize, (z / CELL_WORLD_SIZE) as usize);
        self.cell = Some(cell);
        self.record.x = ((x % CELL_WORLD_SIZE) / LOCAL_UNIT) as u8;
        self.record.z = ((z % CELL_WORLD_SIZE) / LOCAL_UNIT) as u8;
        Ok(())
    }
}

/// Decoded object section.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSection {
    pub layout: MapLayout,
    pub sentinel: PrimRecord,
    /// Logical prims; index 0 here is stored index 1
    pub prims: Vec<Prim>,
    pub mapwho: Vec<MapWhoCell>,
    /// Bytes between the MapWho grid and the end of the section
    #[serde(skip)]
    pub tail: Vec<u8>,
}

impl ObjectSection {
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Prim)> {
        self.prims.iter().enumerate().filter(|(_, p)| p.is_visible())
    }

    pub fn cell_range(&self, cell: usize) -> Option<Range<usize>> {
        self.mapwho.get(cell).and_then(MapWhoCell::logical_range)
    }
}

// ============================================================================
// Read
// ============================================================================

pub fn read_all_prims(data: &[u8]) -> Result<ObjectSection> {
    read_all_prims_with_limit(data, DEFAULT_MAX_OBJECTS)
}

pub fn read_all_prims_with_limit(data: &[u8], max_objects: usize) -> Result<ObjectSection> {
    let layout = MapLayout::read(data)?;
    let offset = layout.object_offset;

    let num_objects = read_i32(data, offset)?;
    if num_objects < 1 || num_objects as usize > max_objects {
        return Err(AssetError::CapacityExceeded(format!(
            "object count {num_objects} outside 1..={max_objects}"
        )));
    }
    let num_objects = num_objects as usize;

    let records_offset = offset + 4;
    let mapwho_offset = records_offset + num_objects * PRIM_RECORD_SIZE;
    let mapwho_end = mapwho_offset + MAPWHO_BYTES;
    if mapwho_end > layout.object_end() {
        return Err(AssetError::MalformedRegion(format!(
            "{num_objects} prims and MapWho need {} bytes, section holds {}",
            mapwho_end - offset,
            layout.object_bytes
        )));
    }

    let records: Vec<PrimRecord> =
        read_array(data, records_offset, num_objects, PRIM_RECORD_SIZE)?;
    let mapwho: Vec<MapWhoCell> = (0..MAPWHO_CELLS)
        .map(|i| read_at::<u16>(data, mapwho_offset + i * 2).map(MapWhoCell))
        .collect::<Result<_>>()?;

    let mut prims: Vec<Prim> = records[1..]
        .iter()
        .map(|&record| Prim { record, cell: None })
        .collect();
    for (cell, packed) in mapwho.iter().enumerate() {
        let Some(range) = packed.logical_range() else {
            continue;
        };
        for i in range {
            match prims.get_mut(i) {
                Some(prim) if prim.cell.is_none() => prim.cell = Some(cell),
                _ => {}
            }
        }
    }

    debug!(
        prims = prims.len(),
        visible = prims.iter().filter(|p| p.is_visible()).count(),
        "decoded object section"
    );

    Ok(ObjectSection {
        layout,
        sentinel: records[0],
        prims,
        mapwho,
        tail: data[mapwho_end..layout.object_end()].to_vec(),
    })
}

// ============================================================================
// Rebuild
// ============================================================================

/// True when every cell's prims already form one contiguous run.
fn is_grouped(prims: &[Prim]) -> Result<bool> {
    let mut closed = vec![false; MAPWHO_CELLS];
    let mut current = None;
    for prim in prims {
        if prim.cell == current {
            continue;
        }
        if let Some(cell) = current {
            closed[cell] = true;
        }
        if let Some(cell) = prim.cell {
            ensure_index(cell, MAPWHO_CELLS)?;
            if closed[cell] {
                return Ok(false);
            }
        }
        current = prim.cell;
    }
    Ok(true)
}

/// Order prims by owning cell and derive the MapWho grid.
///
/// A list whose cells already form contiguous runs keeps its order, so stored
/// indices stay put. Otherwise cells are laid out in order of first
/// appearance, prims keep their relative order inside a cell, and unowned
/// prims go last.
pub fn build_mapwho(prims: &[Prim]) -> Result<(Vec<Prim>, Vec<MapWhoCell>)> {
    let ordered = if is_grouped(prims)? {
        prims.to_vec()
    } else {
        let mut cells = Vec::new();
        let mut by_cell: Vec<Vec<Prim>> = vec![Vec::new(); MAPWHO_CELLS];
        let mut orphans = Vec::new();
        for prim in prims {
            match prim.cell {
                Some(cell) => {
                    ensure_index(cell, MAPWHO_CELLS)?;
                    if by_cell[cell].is_empty() {
                        cells.push(cell);
                    }
                    by_cell[cell].push(*prim);
                }
                None => orphans.push(*prim),
            }
        }
        let mut ordered = Vec::with_capacity(prims.len());
        for cell in cells {
            ordered.append(&mut by_cell[cell]);
        }
        ordered.extend(orphans);
        ordered
    };

    let mut mapwho = vec![MapWhoCell::default(); MAPWHO_CELLS];
    for (i, prim) in ordered.iter().enumerate() {
        let Some(cell) = prim.cell else {
            continue;
        };
        let run = mapwho[cell];
        // Stored index of the first member; the sentinel occupies 0.
        mapwho[cell] = if run.count() == 0 {
            MapWhoCell::pack(i + 1, 1)?
        } else {
            MapWhoCell::pack(run.start(), run.count() + 1)?
        };
    }

    Ok((ordered, mapwho))
}

fn encode_section(
    section: &ObjectSection,
    prims: &[Prim],
    mapwho: &[MapWhoCell],
) -> Result<Vec<u8>> {
    let count = prims.len() + 1;
    let mut out = vec![0u8; 4 + count * PRIM_RECORD_SIZE + MAPWHO_BYTES];
    write_at(&mut out, 0, &(count as i32))?;
    write_at(&mut out, 4, &section.sentinel)?;
    for (i, prim) in prims.iter().enumerate() {
        write_at(&mut out, 4 + (i + 1) * PRIM_RECORD_SIZE, &prim.record)?;
    }
    let mapwho_offset = 4 + count * PRIM_RECORD_SIZE;
    for (i, cell) in mapwho.iter().enumerate() {
        write_at(&mut out, mapwho_offset + i * 2, &cell.0)?;
    }
    out.extend_from_slice(&section.tail);
    Ok(out)
}

/// Splice a new object section into the file and update `object_bytes`.
fn splice_section(data: &[u8], layout: &MapLayout, section_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() + section_bytes.len());
    out.extend_from_slice(&data[..layout.object_offset]);
    out.extend_from_slice(section_bytes);
    out.extend_from_slice(&data[layout.object_end()..]);
    write_at(&mut out, 4, &(section_bytes.len() as i32))?;
    Ok(out)
}

/// Replace the logical prim list, rebuilding MapWho from prim cells.
pub fn replace_all_prims(data: &[u8], prims: &[Prim]) -> Result<Vec<u8>> {
    let section = read_all_prims(data)?;
    let (ordered, mapwho) = build_mapwho(prims)?;
    let bytes = encode_section(&section, &ordered, &mapwho)?;
    debug!(prims = ordered.len(), "replaced prim list");
    splice_section(data, &section.layout, &bytes)
}

/// Remove one logical prim, compacting the array and rebuilding MapWho.
pub fn delete_prim(data: &[u8], index: usize) -> Result<Vec<u8>> {
    let section = read_all_prims(data)?;
    ensure_index(index, section.prims.len())?;
    let mut prims = section.prims.clone();
    prims.remove(index);
    let (ordered, mapwho) = build_mapwho(&prims)?;
    let bytes = encode_section(&section, &ordered, &mapwho)?;
    debug!(index, remaining = ordered.len(), "deleted prim");
    splice_section(data, &section.layout, &bytes)
}

/// Overwrite one logical prim (record and cell) and rebuild.
pub fn update_prim(data: &[u8], index: usize, prim: Prim) -> Result<Vec<u8>> {
    let section = read_all_prims(data)?;
    ensure_index(index, section.prims.len())?;
    let mut prims = section.prims;
    prims[index] = prim;
    replace_all_prims(data, &prims)
}
