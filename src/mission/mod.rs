//! Codec for `.ucm` mission files.
//!
//! ```text
//! offset   size       content
//!      0   1316       header (version, flags, five 260-byte paths, list heads, rates)
//!   1316   512*74     EventPoints
//!  39204   254        skill levels (i8)
//!  39458   3          boredom_rate, cars_rate, music_world
//!  39461   variable   extras (see `extras`)
//!      -   128*128    zone flags
//!      -   rest       trailer, preserved
//! ```
//!
//! EventPoints form two doubly linked lists threaded through `next`/`prev`:
//! the used list (head `used_head`) and the free list (head `free_head`).
//! Slot 0 is never handed out, so 0 doubles as "none".

pub mod cutscene;
pub mod data;
pub mod event_point;
pub mod extras;

use std::fmt;
use std::io::Cursor;

use binrw::binrw;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::binary::{fixed_str, push_record, read_at, read_next, read_u32, take, take_u8};
use crate::error::{ensure_index, ensure_len, AssetError, Result};

pub use cutscene::Cutscene;
pub use data::{AbilityFlags, BehaviourFlags, DataView, ExtraFlags};
pub use event_point::{EventPoint, TriggerType, WaypointType, EVENT_POINT_SIZE, MAX_EVENT_POINTS};
pub use extras::{CutsceneBlock, EventExtras, MissionText};

/// Newest mission version this codec understands.
pub const MAX_VERSION: u32 = 10;
/// Version stamped on new missions.
pub const CURRENT_VERSION: u32 = MAX_VERSION;

pub const PATH_SIZE: usize = 260;
pub const HEADER_SIZE: usize = 1316;
pub const SKILL_LEVELS: usize = 254;
pub const ZONE_SIZE: usize = 128;
pub const ZONES_BYTES: usize = ZONE_SIZE * ZONE_SIZE;

pub const EVENT_POINTS_OFFSET: usize = HEADER_SIZE;
pub const SKILL_LEVELS_OFFSET: usize = EVENT_POINTS_OFFSET + MAX_EVENT_POINTS * EVENT_POINT_SIZE;
pub const RATES_OFFSET: usize = SKILL_LEVELS_OFFSET + SKILL_LEVELS;
pub const EXTRAS_OFFSET: usize = RATES_OFFSET + 3;
/// Smallest possible mission: no extras, no trailer.
pub const MIN_MISSION_SIZE: usize = EXTRAS_OFFSET + ZONES_BYTES;

// ============================================================================
// Header
// ============================================================================

/// NUL-terminated path in a fixed 260-byte field.
#[binrw]
#[brw(little)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedPath(pub [u8; PATH_SIZE]);

impl FixedPath {
    pub fn as_str(&self) -> String {
        fixed_str(&self.0)
    }

    pub fn set(&mut self, path: &str) -> Result<()> {
        let bytes = path.as_bytes();
        if bytes.len() >= PATH_SIZE {
            return Err(AssetError::CapacityExceeded(format!(
                "path of {} bytes does not fit in {PATH_SIZE}",
                bytes.len()
            )));
        }
        self.0 = [0; PATH_SIZE];
        self.0[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

impl Default for FixedPath {
    fn default() -> Self {
        FixedPath([0; PATH_SIZE])
    }
}

impl fmt::Debug for FixedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl Serialize for FixedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MissionHeader {
    pub version: u32,
    pub flags: u32,
    pub mission_name: FixedPath,
    pub map_name: FixedPath,
    pub brief_name: FixedPath,
    pub light_map_name: FixedPath,
    pub citizen_speech_map_name: FixedPath,
    pub map_index: u16,
    pub free_head: u16,
    pub used_head: u16,
    pub crime_rate: u8,
    pub civs_rate: u8,
}

// ============================================================================
// Mission
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mission {
    pub header: MissionHeader,
    pub event_points: Vec<EventPoint>,
    pub skill_levels: Vec<i8>,
    pub boredom_rate: u8,
    pub cars_rate: u8,
    pub music_world: u8,
    /// One entry per EventPoint slot
    pub extras: Vec<EventExtras>,
    #[serde(skip)]
    pub zones: Vec<u8>,
    #[serde(skip)]
    pub trailer: Vec<u8>,
}

impl Mission {
    /// Empty mission with every slot but 0 on the free list.
    pub fn new_template() -> Self {
        let mut event_points = vec![EventPoint::default(); MAX_EVENT_POINTS];
        for (i, ep) in event_points.iter_mut().enumerate().skip(1) {
            ep.prev = (i - 1) as u16;
            ep.next = if i + 1 < MAX_EVENT_POINTS { (i + 1) as u16 } else { 0 };
        }

        Mission {
            header: MissionHeader {
                version: CURRENT_VERSION,
                free_head: 1,
                used_head: 0,
                ..MissionHeader::default()
            },
            event_points,
            skill_levels: vec![0; SKILL_LEVELS],
            boredom_rate: 0,
            cars_rate: 0,
            music_world: 0,
            extras: vec![EventExtras::default(); MAX_EVENT_POINTS],
            zones: vec![0; ZONES_BYTES],
            trailer: Vec::new(),
        }
    }

    pub fn used(&self) -> impl Iterator<Item = (usize, &EventPoint)> {
        self.event_points.iter().enumerate().filter(|(_, ep)| ep.is_used())
    }

    fn check_slot(&self, index: usize) -> Result<()> {
        ensure_index(index, self.event_points.len())?;
        if index == 0 {
            return Err(AssetError::IndexOutOfRange {
                index,
                len: self.event_points.len(),
            });
        }
        Ok(())
    }

    /// Resolve a list link read from the file. 0 means "none".
    fn link(&self, value: u16) -> Result<Option<usize>> {
        let index = value as usize;
        if index == 0 {
            return Ok(None);
        }
        if index >= self.event_points.len() {
            return Err(AssetError::MalformedRegion(format!(
                "EventPoint link {index} outside the {}-slot table",
                self.event_points.len()
            )));
        }
        Ok(Some(index))
    }

    /// Take the head of the free list, mark it used and link it in front of
    /// the used list.
    pub fn alloc_event_point(&mut self) -> Result<usize> {
        let Some(index) = self.link(self.header.free_head)? else {
            return Err(AssetError::CapacityExceeded(
                "all EventPoint slots are in use".to_string(),
            ));
        };
        let next_free = self.link(self.event_points[index].next)?;
        let used_head = self.link(self.header.used_head)?;

        self.header.free_head = self.event_points[index].next;
        if let Some(next_free) = next_free {
            self.event_points[next_free].prev = 0;
        }
        if let Some(used_head) = used_head {
            self.event_points[used_head].prev = index as u16;
        }
        self.event_points[index] = EventPoint {
            used: 1,
            next: self.header.used_head,
            prev: 0,
            ..EventPoint::default()
        };
        self.header.used_head = index as u16;
        if let Some(extras) = self.extras.get_mut(index) {
            *extras = EventExtras::default();
        }
        Ok(index)
    }

    /// Unlink a used slot, clear it and push it on the free list. Freeing a
    /// slot that is already free does nothing.
    pub fn free_event_point(&mut self, index: usize) -> Result<()> {
        self.check_slot(index)?;
        let ep = self.event_points[index];
        if !ep.is_used() {
            return Ok(());
        }
        let prev = self.link(ep.prev)?;
        let next = self.link(ep.next)?;
        let free_head = self.link(self.header.free_head)?;

        match prev {
            Some(prev) => self.event_points[prev].next = ep.next,
            None => self.header.used_head = ep.next,
        }
        if let Some(next) = next {
            self.event_points[next].prev = ep.prev;
        }
        if let Some(free_head) = free_head {
            self.event_points[free_head].prev = index as u16;
        }
        self.event_points[index] = EventPoint {
            next: self.header.free_head,
            ..EventPoint::default()
        };
        self.header.free_head = index as u16;
        if let Some(extras) = self.extras.get_mut(index) {
            *extras = EventExtras::default();
        }
        Ok(())
    }

    /// Copy the editable fields of `ep` into a used slot, keeping its list
    /// links.
    pub fn set_event_point(&mut self, index: usize, ep: EventPoint) -> Result<()> {
        self.check_slot(index)?;
        let slot = &mut self.event_points[index];
        if !slot.is_used() {
            return Err(AssetError::MalformedRegion(format!(
                "EventPoint {index} is free; allocate it first"
            )));
        }
        *slot = EventPoint {
            used: slot.used,
            next: slot.next,
            prev: slot.prev,
            ..ep
        };
        Ok(())
    }

    pub fn zone(&self, x: usize, z: usize) -> Result<u8> {
        ensure_index(x, ZONE_SIZE)?;
        ensure_index(z, ZONE_SIZE)?;
        Ok(self.zones[x * ZONE_SIZE + z])
    }

    pub fn set_zone(&mut self, x: usize, z: usize, flags: u8) -> Result<()> {
        ensure_index(x, ZONE_SIZE)?;
        ensure_index(z, ZONE_SIZE)?;
        self.zones[x * ZONE_SIZE + z] = flags;
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.event_points.len() != MAX_EVENT_POINTS {
            return Err(AssetError::CapacityExceeded(format!(
                "{} EventPoints, the table holds exactly {MAX_EVENT_POINTS}",
                self.event_points.len()
            )));
        }
        let version = self.header.version;
        let mut out = Vec::with_capacity(MIN_MISSION_SIZE + self.trailer.len());

        push_record(&mut out, &self.header)?;
        for ep in &self.event_points {
            push_record(&mut out, ep)?;
        }

        let mut skills = [0u8; SKILL_LEVELS];
        for (dst, &src) in skills.iter_mut().zip(&self.skill_levels) {
            *dst = src as u8;
        }
        out.extend_from_slice(&skills);
        out.extend_from_slice(&[self.boredom_rate, self.cars_rate, self.music_world]);

        extras::write_extras(&mut out, version, &self.event_points, &self.extras)?;

        let mut zones = vec![0u8; ZONES_BYTES];
        let n = self.zones.len().min(ZONES_BYTES);
        zones[..n].copy_from_slice(&self.zones[..n]);
        out.extend_from_slice(&zones);
        out.extend_from_slice(&self.trailer);
        Ok(out)
    }
}

fn check_version(data: &[u8]) -> Result<u32> {
    let version = read_u32(data, 0)?;
    if version > MAX_VERSION {
        return Err(AssetError::UnsupportedVersion {
            found: version,
            max: MAX_VERSION,
        });
    }
    Ok(version)
}

pub fn decode(data: &[u8]) -> Result<Mission> {
    ensure_len(data, MIN_MISSION_SIZE)?;
    let version = check_version(data)?;

    let mut cursor = Cursor::new(data);
    let header: MissionHeader = read_next(&mut cursor)?;
    let mut event_points = Vec::with_capacity(MAX_EVENT_POINTS);
    for _ in 0..MAX_EVENT_POINTS {
        event_points.push(read_next::<EventPoint>(&mut cursor)?);
    }
    let skill_levels = take(&mut cursor, SKILL_LEVELS)?
        .iter()
        .map(|&b| b as i8)
        .collect();
    let boredom_rate = take_u8(&mut cursor)?;
    let cars_rate = take_u8(&mut cursor)?;
    let music_world = take_u8(&mut cursor)?;

    let extras = extras::read_extras(&mut cursor, version, &event_points)?;
    let zones = take(&mut cursor, ZONES_BYTES)?.to_vec();
    let trailer = data[cursor.position() as usize..].to_vec();

    debug!(
        version,
        used = event_points.iter().filter(|ep| ep.is_used()).count(),
        trailer = trailer.len(),
        "decoded mission"
    );

    Ok(Mission {
        header,
        event_points,
        skill_levels,
        boredom_rate,
        cars_rate,
        music_world,
        extras,
        zones,
        trailer,
    })
}

// ============================================================================
// Buffer-level operations
// ============================================================================

fn event_point_offset(index: usize) -> usize {
    EVENT_POINTS_OFFSET + index * EVENT_POINT_SIZE
}

pub fn read_event_point(data: &[u8], index: usize) -> Result<EventPoint> {
    ensure_index(index, MAX_EVENT_POINTS)?;
    ensure_len(data, SKILL_LEVELS_OFFSET)?;
    check_version(data)?;
    read_at(data, event_point_offset(index))
}

/// Replace the contents of one used EventPoint. List links and the used flag
/// stay as they are; the extras section is re-laid out for the new types.
pub fn write_event_point(data: &[u8], index: usize, ep: EventPoint) -> Result<Vec<u8>> {
    let mut mission = decode(data)?;
    mission.set_event_point(index, ep)?;
    mission.encode()
}

/// Allocate a slot for `ep` and return the new buffer and the slot index.
pub fn add_event_point(data: &[u8], ep: EventPoint) -> Result<(Vec<u8>, usize)> {
    let mut mission = decode(data)?;
    let index = mission.alloc_event_point()?;
    mission.set_event_point(index, ep)?;
    debug!(index, waypoint_type = ep.waypoint_type, "added EventPoint");
    Ok((mission.encode()?, index))
}

pub fn delete_event_point(data: &[u8], index: usize) -> Result<Vec<u8>> {
    let mut mission = decode(data)?;
    mission.free_event_point(index)?;
    mission.encode()
}
