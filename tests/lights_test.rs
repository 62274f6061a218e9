// Light file tests: fixed layout, free-slot search and free-list maintenance

use uc_tools_lib::error::AssetError;
use uc_tools_lib::lights::{
    self, LightEntry, LightsFile, NightColour, NightFlags, LIGHTS_FILE_SIZE, MAX_LIGHTS,
    NIGHT_COLOUR_OFFSET, PROPERTIES_OFFSET,
};

#[path = "common/mod.rs"]
mod common;

fn lamp(x: i32, z: i32) -> LightEntry {
    LightEntry {
        range: 200,
        red: 100,
        green: 90,
        blue: -20,
        x,
        y: 256,
        z,
        ..LightEntry::default()
    }
}

#[test]
fn blank_file_takes_index_zero() {
    let data = common::lights_template();
    assert_eq!(data.len(), LIGHTS_FILE_SIZE);
    assert_eq!(lights::find_first_free_index(&data).unwrap(), Some(0));

    let (data, index) = lights::add_light(&data, lamp(1000, 2000)).unwrap();
    assert_eq!(index, 0);
    let stored = lights::read_entry(&data, 0).unwrap();
    assert!(stored.is_used());
    assert_eq!((stored.x, stored.z), (1000, 2000));
}

#[test]
fn decode_encode_is_identity() {
    let (data, _) = lights::add_light(&common::lights_template(), lamp(4, 8)).unwrap();
    let (data, _) = lights::add_light(&data, lamp(12, 16)).unwrap();
    let mut properties = lights::read_properties(&data).unwrap();
    properties.set_flags(NightFlags::NIGHT | NightFlags::LAMPS);
    properties.amb_d3d_colour = 0xFF10_2030;
    properties.lampost_radius = 700;
    let data = lights::encode_properties(&data, &properties).unwrap();
    let colour = NightColour {
        red: 10,
        green: 20,
        blue: 60,
    };
    let data = lights::encode_night_colour(&data, &colour).unwrap();

    let file = lights::decode(&data).unwrap();
    assert_eq!(file.encode().unwrap(), data);
    assert_eq!(file.used_lights().count(), 2);
    assert_eq!(file.properties.flags(), NightFlags::NIGHT | NightFlags::LAMPS);
    assert_eq!(file.properties.ambient_argb(), [0xFF, 0x10, 0x20, 0x30]);
    assert_eq!(&data[NIGHT_COLOUR_OFFSET..], &[10, 20, 60]);
    assert_eq!(
        i32::from_le_bytes(data[PROPERTIES_OFFSET..PROPERTIES_OFFSET + 4].try_into().unwrap()),
        file.properties.ed_light_free
    );
}

#[test]
fn fill_then_overflow() {
    let mut data = common::lights_template();
    for expected in 0..MAX_LIGHTS {
        let (next, index) = lights::add_light(&data, lamp(expected as i32, 0)).unwrap();
        assert_eq!(index, expected);
        data = next;
    }
    assert_eq!(lights::find_first_free_index(&data).unwrap(), None);
    assert!(matches!(
        lights::add_light(&data, lamp(0, 0)),
        Err(AssetError::CapacityExceeded(_))
    ));

    let data = lights::delete_light(&data, 100).unwrap();
    assert_eq!(lights::read_properties(&data).unwrap().ed_light_free, 101);
    let (_, index) = lights::add_light(&data, lamp(0, 0)).unwrap();
    assert_eq!(index, 100);
}

#[test]
fn delete_only_moves_the_head_backwards() {
    let mut data = common::lights_template();
    for _ in 0..10 {
        data = lights::add_light(&data, lamp(0, 0)).unwrap().0;
    }
    // head now points at slot 10
    assert_eq!(lights::read_properties(&data).unwrap().ed_light_free, 11);

    let data = lights::delete_light(&data, 3).unwrap();
    assert_eq!(lights::read_properties(&data).unwrap().ed_light_free, 4);

    // slot 7 lies after the head; the head stays on slot 3
    let data = lights::delete_light(&data, 7).unwrap();
    assert_eq!(lights::read_properties(&data).unwrap().ed_light_free, 4);
    assert!(!lights::read_entry(&data, 7).unwrap().is_used());
}

#[test]
fn short_buffers_and_bad_indices() {
    let data = common::lights_template();
    assert!(matches!(
        lights::decode(&data[..LIGHTS_FILE_SIZE - 1]),
        Err(AssetError::BufferTooSmall { needed: 5171, .. })
    ));
    assert!(matches!(
        lights::read_entry(&data, MAX_LIGHTS),
        Err(AssetError::IndexOutOfRange { index: 255, len: 255 })
    ));
    assert!(lights::encode_entry(&data, 300, &lamp(0, 0)).is_err());
}

#[test]
fn ui_positions_follow_the_map_flip() {
    let mut entry = lamp(0, 0);
    entry.set_ui_position(100, 200);
    assert_eq!((entry.x, entry.z), (32768 - 400, 32768 - 800));
    assert_eq!(entry.ui_position(), (100, 200));
}

#[test]
fn template_header_values() {
    let file = LightsFile::new_template();
    assert_eq!(file.header.sizeof_light, 20);
    assert_eq!(file.header.max_lights, 256);
    assert_eq!(file.header.sizeof_night_colour, 3);
    assert_eq!(file.entries.len(), MAX_LIGHTS);
}
