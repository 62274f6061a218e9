//! The variable-length extras section that follows the skill table.
//!
//! Walks the EventPoints in slot order. A used EventPoint contributes, in this
//! order: a waypoint text block, a cutscene block, a trigger text block, each
//! only when its type calls for it. From version 8 every block starts with a
//! one-byte tag. Text is `len:u32` + bytes from version 5, a fixed 260-byte
//! field before that.

use std::io::Cursor;

use serde::Serialize;

use super::cutscene::Cutscene;
use super::event_point::{EventPoint, TriggerType, WaypointType};
use crate::binary::{fixed_str, push_u32, take, take_u32, take_u8};
use crate::error::{AssetError, Result};

pub const FIXED_TEXT_SIZE: usize = 260;
pub const TAGGED_BLOCKS_VERSION: u32 = 8;
pub const LENGTH_PREFIXED_TEXT_VERSION: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissionText {
    pub tag: Option<u8>,
    /// Stored bytes; for fixed-width files this is the whole 260-byte field
    pub bytes: Vec<u8>,
}

impl MissionText {
    pub fn text(&self) -> String {
        fixed_str(&self.bytes)
    }

    pub fn set_text(&mut self, text: &str) {
        self.bytes = text.as_bytes().to_vec();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CutsceneBlock {
    pub tag: Option<u8>,
    pub cutscene: Cutscene,
}

/// Extra blocks owned by one EventPoint slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventExtras {
    pub waypoint_text: Option<MissionText>,
    pub cutscene: Option<CutsceneBlock>,
    pub trigger_text: Option<MissionText>,
}

impl EventExtras {
    pub fn is_empty(&self) -> bool {
        self.waypoint_text.is_none() && self.cutscene.is_none() && self.trigger_text.is_none()
    }
}

/// Which blocks an EventPoint carries.
struct BlockPlan {
    waypoint_text: bool,
    cutscene: bool,
    trigger_text: bool,
}

fn plan(ep: &EventPoint) -> BlockPlan {
    if !ep.is_used() {
        return BlockPlan {
            waypoint_text: false,
            cutscene: false,
            trigger_text: false,
        };
    }
    let waypoint = ep.waypoint();
    BlockPlan {
        waypoint_text: waypoint.is_some_and(WaypointType::has_text),
        cutscene: waypoint == Some(WaypointType::CutScene),
        trigger_text: ep.trigger().is_some_and(TriggerType::has_text),
    }
}

fn read_tag(cursor: &mut Cursor<&[u8]>, version: u32) -> Result<Option<u8>> {
    if version >= TAGGED_BLOCKS_VERSION {
        Ok(Some(take_u8(cursor)?))
    } else {
        Ok(None)
    }
}

fn read_text(cursor: &mut Cursor<&[u8]>, version: u32) -> Result<MissionText> {
    let tag = read_tag(cursor, version)?;
    let len = if version >= LENGTH_PREFIXED_TEXT_VERSION {
        take_u32(cursor)? as usize
    } else {
        FIXED_TEXT_SIZE
    };
    let bytes = take(cursor, len)?.to_vec();
    Ok(MissionText { tag, bytes })
}

/// Read the extras of every EventPoint; the result has one entry per slot.
pub fn read_extras(
    cursor: &mut Cursor<&[u8]>,
    version: u32,
    event_points: &[EventPoint],
) -> Result<Vec<EventExtras>> {
    let mut out = Vec::with_capacity(event_points.len());
    for ep in event_points {
        let plan = plan(ep);
        let mut extras = EventExtras::default();
        if plan.waypoint_text {
            extras.waypoint_text = Some(read_text(cursor, version)?);
        }
        if plan.cutscene {
            let tag = read_tag(cursor, version)?;
            let cutscene = Cutscene::read(cursor)?;
            extras.cutscene = Some(CutsceneBlock { tag, cutscene });
        }
        if plan.trigger_text {
            extras.trigger_text = Some(read_text(cursor, version)?);
        }
        out.push(extras);
    }
    Ok(out)
}

fn write_tag(out: &mut Vec<u8>, version: u32, tag: Option<u8>, fallback: u8) {
    if version >= TAGGED_BLOCKS_VERSION {
        out.push(tag.unwrap_or(fallback));
    }
}

fn write_text(
    out: &mut Vec<u8>,
    version: u32,
    text: Option<&MissionText>,
    fallback_tag: u8,
) -> Result<()> {
    let bytes = text.map(|t| t.bytes.as_slice()).unwrap_or(&[]);
    if version < LENGTH_PREFIXED_TEXT_VERSION && bytes.len() > FIXED_TEXT_SIZE {
        return Err(AssetError::CapacityExceeded(format!(
            "text of {} bytes does not fit the {FIXED_TEXT_SIZE}-byte field of version {version}",
            bytes.len()
        )));
    }

    write_tag(out, version, text.and_then(|t| t.tag), fallback_tag);
    if version >= LENGTH_PREFIXED_TEXT_VERSION {
        push_u32(out, bytes.len() as u32);
        out.extend_from_slice(bytes);
    } else {
        let mut field = [0u8; FIXED_TEXT_SIZE];
        field[..bytes.len()].copy_from_slice(bytes);
        out.extend_from_slice(&field);
    }
    Ok(())
}

/// Append the extras section. Which blocks are written is decided by the
/// EventPoints alone; a block the EventPoint needs but `extras` lacks is
/// written empty.
pub fn write_extras(
    out: &mut Vec<u8>,
    version: u32,
    event_points: &[EventPoint],
    extras: &[EventExtras],
) -> Result<()> {
    let empty = EventExtras::default();
    for (i, ep) in event_points.iter().enumerate() {
        let plan = plan(ep);
        let extra = extras.get(i).unwrap_or(&empty);
        if plan.waypoint_text {
            write_text(out, version, extra.waypoint_text.as_ref(), ep.waypoint_type)?;
        }
        if plan.cutscene {
            let block = extra.cutscene.as_ref();
            write_tag(out, version, block.and_then(|b| b.tag), ep.waypoint_type);
            match block {
                Some(block) => block.cutscene.write(out)?,
                None => Cutscene::default().write(out)?,
            }
        }
        if plan.trigger_text {
            write_text(out, version, extra.trigger_text.as_ref(), ep.triggered_by)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(waypoint: WaypointType, trigger: TriggerType) -> EventPoint {
        EventPoint {
            used: 1,
            waypoint_type: waypoint as u8,
            triggered_by: trigger as u8,
            ..EventPoint::default()
        }
    }

    fn text(tag: Option<u8>, s: &str) -> MissionText {
        MissionText {
            tag,
            bytes: s.as_bytes().to_vec(),
        }
    }

    #[test]
    fn unused_points_have_no_blocks() {
        let mut message = ep(WaypointType::Message, TriggerType::ShoutAll);
        message.used = 0;
        let mut out = Vec::new();
        write_extras(&mut out, 8, &[message], &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn tagged_length_prefixed_blocks() {
        let points = [
            ep(WaypointType::Message, TriggerType::ShoutAny),
            ep(WaypointType::Simple, TriggerType::Radius),
        ];
        let extras = vec![
            EventExtras {
                waypoint_text: Some(text(Some(12), "go")),
                trigger_text: Some(text(Some(18), "help")),
                ..EventExtras::default()
            },
            EventExtras::default(),
        ];
        let mut out = Vec::new();
        write_extras(&mut out, 8, &points, &extras).unwrap();

        let mut expected = vec![12];
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"go");
        expected.push(18);
        expected.extend_from_slice(&4u32.to_le_bytes());
        expected.extend_from_slice(b"help");
        assert_eq!(out, expected);

        let back = read_extras(&mut Cursor::new(out.as_slice()), 8, &points).unwrap();
        assert_eq!(back, extras);
    }

    #[test]
    fn untagged_before_version_eight() {
        let points = [ep(WaypointType::Shout, TriggerType::None)];
        let extras = [EventExtras {
            waypoint_text: Some(text(None, "hey")),
            ..EventExtras::default()
        }];
        let mut out = Vec::new();
        write_extras(&mut out, 6, &points, &extras).unwrap();
        assert_eq!(out.len(), 4 + 3);
        assert_eq!(&out[4..], b"hey");
    }

    #[test]
    fn fixed_width_text_before_version_five() {
        let points = [ep(WaypointType::NavBeacon, TriggerType::None)];
        let extras = [EventExtras {
            waypoint_text: Some(text(None, "beacon")),
            ..EventExtras::default()
        }];
        let mut out = Vec::new();
        write_extras(&mut out, 4, &points, &extras).unwrap();
        assert_eq!(out.len(), FIXED_TEXT_SIZE);

        let back = read_extras(&mut Cursor::new(out.as_slice()), 4, &points).unwrap();
        let read = back[0].waypoint_text.as_ref().unwrap();
        assert_eq!(read.bytes.len(), FIXED_TEXT_SIZE);
        assert_eq!(read.text(), "beacon");

        // a full stored field is written back as-is
        let mut again = Vec::new();
        write_extras(&mut again, 4, &points, &back).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn fixed_width_text_must_fit() {
        let points = [ep(WaypointType::Message, TriggerType::None)];
        let long = [EventExtras {
            waypoint_text: Some(MissionText {
                tag: None,
                bytes: vec![b'a'; 400],
            }),
            ..EventExtras::default()
        }];
        let mut out = Vec::new();
        assert!(matches!(
            write_extras(&mut out, 4, &points, &long),
            Err(AssetError::CapacityExceeded(_))
        ));

        // length-prefixed versions take it as is
        let mut out = Vec::new();
        write_extras(&mut out, 6, &points, &long).unwrap();
        assert_eq!(out.len(), 4 + 400);
    }

    #[test]
    fn missing_blocks_are_written_empty() {
        let points = [ep(WaypointType::CutScene, TriggerType::ShoutAll)];
        let mut out = Vec::new();
        write_extras(&mut out, 8, &points, &[]).unwrap();
        // cutscene tag + empty cutscene, then trigger tag + zero length
        assert_eq!(out, vec![15, 0, 0, 12, 0, 0, 0, 0]);
    }
}
