//! Locating the building-geometry block embedded before the object section.
//!
//! The block has no offset in the header. It is found by scanning backward from
//! the object section for a 4-byte marker; when the marker is absent the block
//! is assumed to span everything between the tile grid and the objects.
//!
//! Block layout after the marker:
//!
//! ```text
//! marker           u32 0xFC09F00D
//! building_count   u16
//! facet_count      u16
//! buildings        building_count x 24 bytes
//! facets           facet_count x 26 bytes
//! ```

use std::ops::Range;

use binrw::binrw;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{raw_object_offset, TILES_END};
use crate::binary::{read_array, read_u16};
use crate::error::{AssetError, Result};

pub const BUILDING_SIGNATURE: u32 = 0xFC09F00D;
const SIGNATURE_BYTES: [u8; 4] = BUILDING_SIGNATURE.to_le_bytes();
/// Default number of bytes scanned backward from the object section.
pub const DEFAULT_SCAN_WINDOW: usize = 500_000;
/// Start of the region when it is inferred rather than found.
pub const FALLBACK_START: usize = TILES_END;

const BLOCK_HEADER_SIZE: usize = 8;
pub const BUILDING_RECORD_SIZE: usize = 24;
pub const FACET_RECORD_SIZE: usize = 26;
/// World units per facet coordinate step.
const FACET_UNIT: i32 = 256;

/// Where the building block was found and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionLocation {
    FoundBySignature { start: usize, len: usize },
    FoundByFallback { start: usize, len: usize },
    NotFound,
}

impl RegionLocation {
    pub fn range(&self) -> Option<Range<usize>> {
        match *self {
            RegionLocation::FoundBySignature { start, len }
            | RegionLocation::FoundByFallback { start, len } => Some(start..start + len),
            RegionLocation::NotFound => None,
        }
    }
}

fn scan_backward(data: &[u8], end: usize, window: usize) -> Option<usize> {
    if end < SIGNATURE_BYTES.len() {
        return None;
    }
    let lowest = end.saturating_sub(window);
    (lowest..=end - SIGNATURE_BYTES.len())
        .rev()
        .find(|&p| data[p..p + SIGNATURE_BYTES.len()] == SIGNATURE_BYTES)
}

/// Find the building block of a map buffer.
///
/// `window` bounds how far before the object section the marker may lie.
pub fn locate(data: &[u8], window: usize) -> RegionLocation {
    let object_offset = raw_object_offset(data).ok();

    if let Some(offset) = object_offset {
        if offset >= 0 && (offset as usize) <= data.len() {
            let end = offset as usize;
            if let Some(hit) = scan_backward(data, end, window) {
                debug!(start = hit, len = end - hit, "building block found by signature");
                return RegionLocation::FoundBySignature {
                    start: hit,
                    len: end - hit,
                };
            }
        }
    }

    let end = object_offset
        .unwrap_or(0)
        .clamp(0, data.len() as i64) as usize;
    if end <= FALLBACK_START {
        debug!("no building block");
        return RegionLocation::NotFound;
    }
    warn!(
        start = FALLBACK_START,
        len = end - FALLBACK_START,
        "building signature not found, using fallback region"
    );
    RegionLocation::FoundByFallback {
        start: FALLBACK_START,
        len: end - FALLBACK_START,
    }
}

// ============================================================================
// Block records
// ============================================================================

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub start_facet: u16,
    pub end_facet: u16,
    pub walkable: u16,
    pub counter: [u8; 2],
    pub padding: u16,
    pub ware: u8,
    pub kind: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRecord {
    pub kind: u8,
    pub height: u8,
    pub x: [u8; 2],
    pub y: [i16; 2],
    pub z: [u8; 2],
    pub flags: u16,
    pub style: u16,
    pub building: u16,
    pub storey: u16,
    pub fheight: u8,
    pub block_height: u8,
    pub open: u8,
    pub dfcache: u8,
    pub shake: u8,
    pub cut_hole: u8,
    pub counter: [u8; 2],
}

impl FacetRecord {
    /// World (x, z) of both ends of the facet.
    pub fn world_endpoints(&self) -> [(i32, i32); 2] {
        [
            (self.x[0] as i32 * FACET_UNIT, self.z[0] as i32 * FACET_UNIT),
            (self.x[1] as i32 * FACET_UNIT, self.z[1] as i32 * FACET_UNIT),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildingBlock {
    pub buildings: Vec<BuildingRecord>,
    pub facets: Vec<FacetRecord>,
}

/// Decode the block behind a signature hit.
///
/// Fallback and missing regions carry no trustworthy header and yield `None`.
pub fn decode_buildings(data: &[u8], location: &RegionLocation) -> Result<Option<BuildingBlock>> {
    let RegionLocation::FoundBySignature { start, len } = *location else {
        return Ok(None);
    };
    let end = start + len;
    if end > data.len() || len < BLOCK_HEADER_SIZE {
        return Err(AssetError::MalformedRegion(format!(
            "building block [{start}, {end}) cannot hold its header"
        )));
    }

    let building_count = read_u16(data, start + 4)? as usize;
    let facet_count = read_u16(data, start + 6)? as usize;
    let buildings_offset = start + BLOCK_HEADER_SIZE;
    let facets_offset = buildings_offset + building_count * BUILDING_RECORD_SIZE;
    let records_end = facets_offset + facet_count * FACET_RECORD_SIZE;
    if records_end > end {
        return Err(AssetError::MalformedRegion(format!(
            "{building_count} buildings and {facet_count} facets overrun the block end {end}"
        )));
    }

    Ok(Some(BuildingBlock {
        buildings: read_array(data, buildings_offset, building_count, BUILDING_RECORD_SIZE)?,
        facets: read_array(data, facets_offset, facet_count, FACET_RECORD_SIZE)?,
    }))
}
