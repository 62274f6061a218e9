//! Codec for `.lgt` light files.
//!
//! Binary layout (little-endian, 5171 bytes):
//!
//! ```text
//! offset  size      content
//!      0    12      header: sizeof_light(i32) max_lights(i32) sizeof_night_colour(i32)
//!     12    20      reserved (engine slot 0, never used)
//!     32    255*20  light entries
//!   5132    36      properties
//!   5168    3       night colour (sky RGB)
//! ```
//!
//! All encoders are copy-then-mutate: they take the current bytes and return a
//! complete replacement buffer.

pub mod free_list;

use binrw::binrw;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binary::{read_at, write_at};
use crate::error::{ensure_index, ensure_len, Result};
use crate::math::{ui_to_world, world_to_ui};

pub use free_list::{add_light, delete_light, find_first_free_index};

pub const HEADER_SIZE: usize = 12;
pub const RESERVED_SIZE: usize = 20;
pub const LIGHT_ENTRY_SIZE: usize = 20;
/// Editable light slots stored in the file.
pub const MAX_LIGHTS: usize = 255;
pub const PROPERTIES_SIZE: usize = 36;
pub const NIGHT_COLOUR_SIZE: usize = 3;

pub const ENTRIES_OFFSET: usize = HEADER_SIZE + RESERVED_SIZE;
pub const PROPERTIES_OFFSET: usize = ENTRIES_OFFSET + MAX_LIGHTS * LIGHT_ENTRY_SIZE;
pub const NIGHT_COLOUR_OFFSET: usize = PROPERTIES_OFFSET + PROPERTIES_SIZE;
/// Size of a complete lights file (5171 bytes).
pub const LIGHTS_FILE_SIZE: usize = NIGHT_COLOUR_OFFSET + NIGHT_COLOUR_SIZE;

/// Engine-side table size written in the header; includes the reserved slot 0.
const ENGINE_MAX_LIGHTS: i32 = MAX_LIGHTS as i32 + 1;

// ============================================================================
// Records
// ============================================================================

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsHeader {
    pub sizeof_light: i32,
    pub max_lights: i32,
    pub sizeof_night_colour: i32,
}

impl Default for LightsHeader {
    fn default() -> Self {
        Self {
            sizeof_light: LIGHT_ENTRY_SIZE as i32,
            max_lights: ENGINE_MAX_LIGHTS,
            sizeof_night_colour: NIGHT_COLOUR_SIZE as i32,
        }
    }
}

/// One light slot (20 bytes).
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightEntry {
    pub range: u8,
    pub red: i8,
    pub green: i8,
    pub blue: i8,
    /// Free-list link; stamped 0 when a light is placed
    pub next: u8,
    /// 1 = present, 0 = free slot
    pub used: u8,
    pub flags: u8,
    pub padding: u8,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl LightEntry {
    pub fn is_used(&self) -> bool {
        self.used == 1
    }

    /// Display position of the light's (x, z) world coordinates.
    pub fn ui_position(&self) -> (i32, i32) {
        (world_to_ui(self.x), world_to_ui(self.z))
    }

    pub fn set_ui_position(&mut self, px: i32, py: i32) {
        self.x = ui_to_world(px);
        self.z = ui_to_world(py);
    }
}

bitflags! {
    /// Bits of `LightProperties::night_flag`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NightFlags: u32 {
        const NIGHT = 1 << 0;
        const LAMPS = 1 << 1;
        const DARKEN_WALLS = 1 << 2;
        const DAY = 1 << 3;
    }
}

/// Lighting properties block (36 bytes).
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightProperties {
    /// Free-list head: slot index + 1, or 0 when no free slot is known
    pub ed_light_free: i32,
    pub night_flag: u32,
    /// Packed ARGB
    pub amb_d3d_colour: u32,
    /// Packed ARGB
    pub amb_d3d_specular: u32,
    pub amb_red: i32,
    pub amb_green: i32,
    pub amb_blue: i32,
    pub lampost_red: i8,
    pub lampost_green: i8,
    pub lampost_blue: i8,
    pub padding: u8,
    pub lampost_radius: i32,
}

impl LightProperties {
    pub fn flags(&self) -> NightFlags {
        NightFlags::from_bits_retain(self.night_flag)
    }

    pub fn set_flags(&mut self, flags: NightFlags) {
        self.night_flag = flags.bits();
    }

    pub fn ambient_argb(&self) -> [u8; 4] {
        self.amb_d3d_colour.to_be_bytes()
    }

    pub fn specular_argb(&self) -> [u8; 4] {
        self.amb_d3d_specular.to_be_bytes()
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightColour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Fully decoded lights file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightsFile {
    pub header: LightsHeader,
    #[serde(skip)]
    pub reserved: [u8; RESERVED_SIZE],
    pub entries: Vec<LightEntry>,
    pub properties: LightProperties,
    pub night_colour: NightColour,
    /// Bytes past the night colour block, kept for round-trip
    #[serde(skip)]
    pub trailer: Vec<u8>,
}

impl LightsFile {
    /// Empty lights file: every slot free, free-list head at slot 0.
    pub fn new_template() -> Self {
        Self {
            header: LightsHeader::default(),
            reserved: [0; RESERVED_SIZE],
            entries: vec![LightEntry::default(); MAX_LIGHTS],
            properties: LightProperties {
                ed_light_free: 1,
                ..LightProperties::default()
            },
            night_colour: NightColour::default(),
            trailer: Vec::new(),
        }
    }

    pub fn used_lights(&self) -> impl Iterator<Item = (usize, &LightEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| e.is_used())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; LIGHTS_FILE_SIZE];
        write_at(&mut buf, 0, &self.header)?;
        buf[HEADER_SIZE..ENTRIES_OFFSET].copy_from_slice(&self.reserved);
        for (i, entry) in self.entries.iter().take(MAX_LIGHTS).enumerate() {
            write_at(&mut buf, entry_offset(i), entry)?;
        }
        write_at(&mut buf, PROPERTIES_OFFSET, &self.properties)?;
        write_at(&mut buf, NIGHT_COLOUR_OFFSET, &self.night_colour)?;
        buf.extend_from_slice(&self.trailer);
        Ok(buf)
    }
}

// ============================================================================
// Decode
// ============================================================================

fn entry_offset(index: usize) -> usize {
    ENTRIES_OFFSET + index * LIGHT_ENTRY_SIZE
}

pub fn decode(data: &[u8]) -> Result<LightsFile> {
    ensure_len(data, LIGHTS_FILE_SIZE)?;

    let header: LightsHeader = read_at(data, 0)?;
    let mut reserved = [0u8; RESERVED_SIZE];
    reserved.copy_from_slice(&data[HEADER_SIZE..ENTRIES_OFFSET]);

    let mut entries = Vec::with_capacity(MAX_LIGHTS);
    for i in 0..MAX_LIGHTS {
        entries.push(read_at::<LightEntry>(data, entry_offset(i))?);
    }

    let properties: LightProperties = read_at(data, PROPERTIES_OFFSET)?;
    let night_colour: NightColour = read_at(data, NIGHT_COLOUR_OFFSET)?;

    debug!(
        used = entries.iter().filter(|e| e.is_used()).count(),
        free_head = properties.ed_light_free,
        "decoded lights file"
    );

    Ok(LightsFile {
        header,
        reserved,
        entries,
        properties,
        night_colour,
        trailer: data[LIGHTS_FILE_SIZE..].to_vec(),
    })
}

pub fn read_entry(data: &[u8], index: usize) -> Result<LightEntry> {
    ensure_index(index, MAX_LIGHTS)?;
    ensure_len(data, LIGHTS_FILE_SIZE)?;
    read_at(data, entry_offset(index))
}

pub fn read_properties(data: &[u8]) -> Result<LightProperties> {
    ensure_len(data, LIGHTS_FILE_SIZE)?;
    read_at(data, PROPERTIES_OFFSET)
}

pub fn read_night_colour(data: &[u8]) -> Result<NightColour> {
    ensure_len(data, LIGHTS_FILE_SIZE)?;
    read_at(data, NIGHT_COLOUR_OFFSET)
}

// ============================================================================
// Encode
// ============================================================================

pub fn encode_entry(data: &[u8], index: usize, entry: &LightEntry) -> Result<Vec<u8>> {
    ensure_index(index, MAX_LIGHTS)?;
    ensure_len(data, LIGHTS_FILE_SIZE)?;
    let mut out = data.to_vec();
    write_at(&mut out, entry_offset(index), entry)?;
    Ok(out)
}

pub fn encode_properties(data: &[u8], properties: &LightProperties) -> Result<Vec<u8>> {
    ensure_len(data, LIGHTS_FILE_SIZE)?;
    let mut out = data.to_vec();
    write_at(&mut out, PROPERTIES_OFFSET, properties)?;
    Ok(out)
}

pub fn encode_night_colour(data: &[u8], colour: &NightColour) -> Result<Vec<u8>> {
    ensure_len(data, LIGHTS_FILE_SIZE)?;
    let mut out = data.to_vec();
    write_at(&mut out, NIGHT_COLOUR_OFFSET, colour)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;

    fn sample_entry() -> LightEntry {
        LightEntry {
            range: 200,
            red: -20,
            green: 64,
            blue: 127,
            used: 1,
            x: 12_000,
            y: -256,
            z: 30_000,
            ..LightEntry::default()
        }
    }

    #[test]
    fn layout_constants() {
        assert_eq!(ENTRIES_OFFSET, 32);
        assert_eq!(PROPERTIES_OFFSET, 5132);
        assert_eq!(NIGHT_COLOUR_OFFSET, 5168);
        assert_eq!(LIGHTS_FILE_SIZE, 5171);
    }

    #[test]
    fn template_decodes() {
        let bytes = LightsFile::new_template().encode().unwrap();
        assert_eq!(bytes.len(), LIGHTS_FILE_SIZE);
        assert_eq!(&bytes[0..4], &20i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &256i32.to_le_bytes());

        let file = decode(&bytes).unwrap();
        assert_eq!(file.entries.len(), MAX_LIGHTS);
        assert_eq!(file.properties.ed_light_free, 1);
        assert_eq!(file.used_lights().count(), 0);
    }

    #[test]
    fn entry_bytes_at_fixed_offset() {
        let bytes = LightsFile::new_template().encode().unwrap();
        let out = encode_entry(&bytes, 3, &sample_entry()).unwrap();
        let off = 32 + 3 * 20;
        assert_eq!(out[off], 200);
        assert_eq!(out[off + 1] as i8, -20);
        assert_eq!(out[off + 5], 1);
        assert_eq!(&out[off + 8..off + 12], &12_000i32.to_le_bytes());
        assert_eq!(&out[off + 12..off + 16], &(-256i32).to_le_bytes());
        assert_eq!(read_entry(&out, 3).unwrap(), sample_entry());
        // Input buffer is untouched.
        assert_eq!(read_entry(&bytes, 3).unwrap(), LightEntry::default());
    }

    #[test]
    fn entry_index_out_of_range() {
        let bytes = LightsFile::new_template().encode().unwrap();
        let err = encode_entry(&bytes, MAX_LIGHTS, &sample_entry()).unwrap_err();
        assert!(matches!(err, AssetError::IndexOutOfRange { index: 255, len: 255 }));
    }

    #[test]
    fn short_buffer_rejected() {
        let err = decode(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            AssetError::BufferTooSmall {
                needed: LIGHTS_FILE_SIZE,
                actual: 100
            }
        ));
    }

    #[test]
    fn round_trip_preserves_every_byte() {
        let mut bytes: Vec<u8> = (0..LIGHTS_FILE_SIZE).map(|i| (i * 7 % 251) as u8).collect();
        bytes.extend_from_slice(b"tail");
        let file = decode(&bytes).unwrap();
        assert_eq!(file.trailer, b"tail");
        assert_eq!(file.encode().unwrap(), bytes);
    }

    #[test]
    fn properties_and_night_colour() {
        let bytes = LightsFile::new_template().encode().unwrap();
        let mut props = read_properties(&bytes).unwrap();
        props.set_flags(NightFlags::NIGHT | NightFlags::DARKEN_WALLS);
        props.amb_d3d_colour = 0xFF10_2030;
        props.lampost_red = -5;
        props.lampost_radius = 1024;
        let out = encode_properties(&bytes, &props).unwrap();
        assert_eq!(&out[5136..5140], &5u32.to_le_bytes());

        let decoded = read_properties(&out).unwrap();
        assert_eq!(decoded.flags(), NightFlags::NIGHT | NightFlags::DARKEN_WALLS);
        assert_eq!(decoded.ambient_argb(), [0xFF, 0x10, 0x20, 0x30]);
        assert_eq!(decoded.lampost_red, -5);

        let sky = NightColour { red: 10, green: 20, blue: 30 };
        let out = encode_night_colour(&out, &sky).unwrap();
        assert_eq!(&out[5168..5171], &[10, 20, 30]);
        assert_eq!(read_night_colour(&out).unwrap(), sky);
    }

    #[test]
    fn ui_position_uses_display_mapping() {
        let mut entry = LightEntry::default();
        entry.set_ui_position(100, 200);
        assert_eq!((entry.x, entry.z), (32368, 31968));
        assert_eq!(entry.ui_position(), (100, 200));
    }
}
