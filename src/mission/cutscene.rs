//! Cutscene blobs stored in the extras of CutScene EventPoints.
//!
//! ```text
//! version        u8
//! channel_count  u8
//! per channel:
//!   header       12 bytes (ChannelHeader)
//!   packets      packet_count x 24 bytes, text packets followed by their text
//! ```
//!
//! A text packet announces trailing text by a non-zero `x`. That value is only
//! a presence marker: it is kept aside in [`PacketText`] and `x` reads back as 0.

use std::io::Cursor;

use binrw::binrw;
use serde::Serialize;

use crate::binary::{push_record, push_u32, read_next, take, take_u32, take_u8};
use crate::error::{AssetError, Result};

pub const CHANNEL_HEADER_SIZE: usize = 12;
pub const PACKET_SIZE: usize = 24;
pub const PACKET_TYPE_TEXT: u8 = 5;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ChannelHeader {
    kind: u8,
    flags: u8,
    reserved: [u8; 2],
    index: u16,
    packet_count: u16,
    /// Runtime pointer in the saved struct; meaningless on disk
    pointer: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    pub kind: u8,
    pub flags: u8,
    pub index: u16,
    pub start: u16,
    pub length: u16,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub angle: u16,
    pub pitch: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketText {
    /// The stored non-zero `x` that flagged the text
    pub marker: i32,
    pub bytes: Vec<u8>,
}

impl PacketText {
    pub fn new(text: &str) -> Self {
        PacketText {
            marker: 1,
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub record: PacketRecord,
    pub text: Option<PacketText>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CutsceneChannel {
    pub kind: u8,
    pub flags: u8,
    pub reserved: [u8; 2],
    pub index: u16,
    pub packets: Vec<Packet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cutscene {
    pub version: u8,
    pub channels: Vec<CutsceneChannel>,
}

impl Cutscene {
    /// Read one cutscene at the cursor and leave the cursor after it.
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<Cutscene> {
        let version = take_u8(cursor)?;
        let channel_count = take_u8(cursor)?;

        let mut channels = Vec::with_capacity(channel_count as usize);
        for _ in 0..channel_count {
            let header: ChannelHeader = read_next(cursor)?;
            let mut packets = Vec::with_capacity(header.packet_count as usize);
            for _ in 0..header.packet_count {
                let mut record: PacketRecord = read_next(cursor)?;
                let text = if record.kind == PACKET_TYPE_TEXT && record.x != 0 {
                    let len = take_u32(cursor)? as usize;
                    let bytes = take(cursor, len)?.to_vec();
                    let marker = std::mem::take(&mut record.x);
                    Some(PacketText { marker, bytes })
                } else {
                    None
                };
                packets.push(Packet { record, text });
            }
            channels.push(CutsceneChannel {
                kind: header.kind,
                flags: header.flags,
                reserved: header.reserved,
                index: header.index,
                packets,
            });
        }

        Ok(Cutscene { version, channels })
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let channel_count = u8::try_from(self.channels.len()).map_err(|_| {
            AssetError::CapacityExceeded(format!(
                "{} cutscene channels, at most 255 fit",
                self.channels.len()
            ))
        })?;
        out.push(self.version);
        out.push(channel_count);

        for channel in &self.channels {
            let packet_count = u16::try_from(channel.packets.len()).map_err(|_| {
                AssetError::CapacityExceeded(format!(
                    "{} packets in channel {}",
                    channel.packets.len(),
                    channel.index
                ))
            })?;
            let header = ChannelHeader {
                kind: channel.kind,
                flags: channel.flags,
                reserved: channel.reserved,
                index: channel.index,
                packet_count,
                pointer: 0,
            };
            push_record(out, &header)?;

            for packet in &channel.packets {
                let mut record = packet.record;
                match &packet.text {
                    Some(text) if record.kind == PACKET_TYPE_TEXT => {
                        record.x = if text.marker != 0 { text.marker } else { 1 };
                        push_record(out, &record)?;
                        push_u32(out, text.bytes.len() as u32);
                        out.extend_from_slice(&text.bytes);
                    }
                    _ => {
                        if record.kind == PACKET_TYPE_TEXT {
                            // a non-zero x here would announce text that is not there
                            record.x = 0;
                        }
                        push_record(out, &record)?;
                    }
                }
            }
        }
        Ok(())
    }
}
