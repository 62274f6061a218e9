// Common fixture builders for the integration tests
#![allow(dead_code)]

use uc_tools_lib::lights::LightsFile;
use uc_tools_lib::map::objects::{self, Prim, PrimRecord};
use uc_tools_lib::map::TILES_END;
use uc_tools_lib::mission::cutscene::{
    Cutscene, CutsceneChannel, Packet, PacketRecord, PacketText, PACKET_TYPE_TEXT,
};
use uc_tools_lib::mission::{
    CutsceneBlock, EventExtras, Mission, MissionText, TriggerType, WaypointType,
};

pub const SAVE_TYPE_WITH_TRAILER: i32 = 27;
pub const SAVE_TYPE_NO_TRAILER: i32 = 20;

/// Blank 5171-byte lights file.
pub fn lights_template() -> Vec<u8> {
    LightsFile::new_template().encode().expect("template encodes")
}

/// Object section holding only the sentinel prim and an empty MapWho grid.
pub fn empty_object_section() -> Vec<u8> {
    let mut section = Vec::new();
    section.extend_from_slice(&1i32.to_le_bytes());
    section.extend_from_slice(&[0u8; 8]);
    section.extend_from_slice(&[0u8; 2048]);
    section
}

/// Map buffer with zeroed tiles, `building` bytes in front of an empty object
/// section, then the world number and (for newer save types) a trailer.
pub fn map_bytes(save_type: i32, building: &[u8], world: i32) -> Vec<u8> {
    let objects = empty_object_section();
    let mut data = Vec::new();
    data.extend_from_slice(&save_type.to_le_bytes());
    data.extend_from_slice(&(objects.len() as i32).to_le_bytes());
    data.resize(TILES_END, 0);
    data.extend_from_slice(building);
    data.extend_from_slice(&objects);
    data.extend_from_slice(&world.to_le_bytes());
    if save_type >= 25 {
        let trailer: Vec<u8> = (0..2000).map(|i| (i % 251) as u8).collect();
        data.extend_from_slice(&trailer);
    }
    data
}

/// Prim of type `prim` at a world position.
pub fn prim_at(prim: u8, x: i32, z: i32) -> Prim {
    let mut p = Prim {
        record: PrimRecord {
            y: 16,
            prim,
            yaw: 64,
            ..PrimRecord::default()
        },
        cell: None,
    };
    p.set_world_position(x, z).expect("position inside the map");
    p
}

/// Map buffer with the given prims placed through the object codec.
pub fn map_with_prims(save_type: i32, prims: &[Prim]) -> Vec<u8> {
    let data = map_bytes(save_type, &[], 1);
    objects::replace_all_prims(&data, prims).expect("prims fit")
}

fn text(tag: Option<u8>, s: &str) -> MissionText {
    MissionText {
        tag,
        bytes: s.as_bytes().to_vec(),
    }
}

fn fixed_text(s: &str) -> MissionText {
    let mut bytes = vec![0u8; 260];
    bytes[..s.len()].copy_from_slice(s.as_bytes());
    MissionText { tag: None, bytes }
}

fn sample_cutscene() -> Cutscene {
    let text_record = PacketRecord {
        kind: PACKET_TYPE_TEXT,
        index: 2,
        start: 40,
        length: 100,
        ..PacketRecord::default()
    };
    let camera_record = PacketRecord {
        kind: 1,
        start: 0,
        length: 40,
        x: 12_000,
        y: 300,
        z: -4_000,
        angle: 512,
        pitch: 30,
        ..PacketRecord::default()
    };
    Cutscene {
        version: 1,
        channels: vec![
            CutsceneChannel {
                kind: 1,
                flags: 0,
                reserved: [0, 0],
                index: 0,
                packets: vec![Packet {
                    record: camera_record,
                    text: None,
                }],
            },
            CutsceneChannel {
                kind: 3,
                flags: 1,
                reserved: [0, 0],
                index: 1,
                packets: vec![
                    Packet {
                        record: text_record,
                        text: Some(PacketText {
                            marker: 0x0040_0000,
                            bytes: b"Freeze!".to_vec(),
                        }),
                    },
                    Packet {
                        record: PacketRecord {
                            kind: PACKET_TYPE_TEXT,
                            start: 150,
                            ..PacketRecord::default()
                        },
                        text: None,
                    },
                ],
            },
        ],
    }
}

/// A mission exercising every kind of extras block the given version can hold.
pub fn sample_mission(version: u32) -> Mission {
    let tagged = version >= 8;
    let tag = |t: u8| if tagged { Some(t) } else { None };
    let mk_text = |t: u8, s: &str| {
        if version >= 5 {
            text(tag(t), s)
        } else {
            fixed_text(s)
        }
    };

    let mut m = Mission::new_template();
    m.header.version = version;
    m.header.flags = 0x3;
    m.header.mission_name.set("Test Drive").expect("fits");
    m.header.map_name.set("data\\park.iam").expect("fits");
    m.header.crime_rate = 40;
    m.header.civs_rate = 8;
    m.skill_levels[0] = -3;
    m.skill_levels[253] = 9;
    m.boredom_rate = 4;
    m.cars_rate = 2;
    m.music_world = 1;
    m.set_zone(10, 20, 0x05).expect("zone in range");
    m.trailer = vec![0xEE; 17];

    let message = m.alloc_event_point().expect("slot");
    let cutscene = m.alloc_event_point().expect("slot");
    let enemies = m.alloc_event_point().expect("slot");
    let shout = m.alloc_event_point().expect("slot");

    {
        let ep = &mut m.event_points[message];
        ep.waypoint_type = WaypointType::Message as u8;
        ep.triggered_by = TriggerType::Radius as u8;
        ep.radius = 512;
        ep.x = 8000;
        ep.z = 9000;
        ep.data[0] = 120;
    }
    m.extras[message].waypoint_text = Some(mk_text(12, "Meet me at the docks."));

    m.event_points[cutscene].waypoint_type = WaypointType::CutScene as u8;
    m.extras[cutscene].cutscene = Some(CutsceneBlock {
        tag: tag(15),
        cutscene: sample_cutscene(),
    });

    {
        let ep = &mut m.event_points[enemies];
        ep.waypoint_type = WaypointType::CreateEnemies as u8;
        ep.data[0] = (3 << 16) | 7;
        ep.data[2] = (0x0101 << 16) | 200;
        ep.data[9] = -1;
    }

    {
        let ep = &mut m.event_points[shout];
        ep.waypoint_type = WaypointType::Shout as u8;
        ep.triggered_by = TriggerType::ShoutAny as u8;
    }
    m.extras[shout] = EventExtras {
        waypoint_text: Some(mk_text(19, "Over here!")),
        trigger_text: Some(mk_text(18, "ALARM")),
        ..EventExtras::default()
    };

    m
}

/// Encoded form of [`sample_mission`].
pub fn sample_mission_bytes(version: u32) -> Vec<u8> {
    sample_mission(version).encode().expect("sample encodes")
}
