// AnyTone AT-D868UV codeplug codec
//
// The device address space is sparse: each table lives at its own base
// address, most with a presence bitmap the firmware consults before it
// touches a record. Reads happen in 64-byte blocks and writes in
// 16-byte blocks, so every element is allocated at a 64-byte aligned
// address with a size rounded up to 64 bytes.
//
// Cross references on the wire are device indices. Scan-list slots use
// the +1 convention with 0 reserved for the selected channel and
// 0xFFFF for "not set"; zone member lists are plain 0-based indices
// with 0xFFFF fill. The radio keeps no roaming tables, so roaming data
// in the configuration is dropped with a warning.

use super::traits::{Codeplug, CodeplugError, Result};
use super::{align64, bit_is_set, get_u16, get_u32, put_u16, put_u32, set_bit};
use crate::codec::{
    decode_ascii, decode_dmr_id, decode_frequency, encode_ascii, encode_dmr_id, encode_frequency,
    SelectiveCall,
};
use crate::config::{
    Admit, AnalogChannel, AprsAddress, AprsIcon, AprsSystem, Bandwidth, CallKind, Channel,
    ChannelRef, Config, Contact, DigitalChannel, DmrContact, DtmfContact, GpsSystem, GroupList,
    Power, PositioningSystem, RadioId, RadioIdRef, ScanList, TimeSlot, Zone,
};
use crate::image::Image;
use std::collections::HashMap;
use tracing::{debug, warn};

const NUM_CHANNELS: usize = 4000;
const CHANNELS_PER_BANK: usize = 128;
const CHANNEL_SIZE: usize = 0x40;
const CHANNEL_BANK_0: u32 = 0x0080_0000;
const CHANNEL_BANK_OFFSET: u32 = 0x0004_0000;
const CHANNEL_BITMAP: u32 = 0x024c_1500;
const CHANNEL_BITMAP_SIZE: usize = 0x200;

const NUM_CONTACTS: usize = 10_000;
const CONTACT_SIZE: usize = 100;
const CONTACT_BASE: u32 = 0x0268_0000;
const CONTACT_BITMAP: u32 = 0x0264_0000;
const CONTACT_BITMAP_SIZE: usize = 0x500;
const CONTACT_ID_MAP: u32 = 0x0434_0000;

const NUM_DTMF_CONTACTS: usize = 16;
const DTMF_CONTACT_SIZE: usize = 0x30;
const DTMF_CONTACT_BASE: u32 = 0x0294_0000;

const NUM_GROUP_LISTS: usize = 250;
const GROUP_LIST_SIZE: usize = 0x140;
const GROUP_LIST_MEMBERS: usize = 64;
const GROUP_LIST_BASE: u32 = 0x0298_0000;
const GROUP_LIST_OFFSET: u32 = 0x200;
const GROUP_LIST_BITMAP: u32 = 0x024c_13c0;
const GROUP_LIST_BITMAP_SIZE: usize = 0x40;

const NUM_ZONES: usize = 250;
const ZONE_MEMBERS: usize = 250;
const ZONE_LIST_SIZE: usize = 0x400;
const ZONE_LIST_BASE: u32 = 0x0100_0000;
const ZONE_NAME_SIZE: usize = 0x20;
const ZONE_NAME_BASE: u32 = 0x0254_0000;
const ZONE_BITMAP: u32 = 0x024c_1300;
const ZONE_BITMAP_SIZE: usize = 0x40;

const NUM_SCAN_LISTS: usize = 250;
const SCAN_LISTS_PER_BANK: usize = 16;
const SCAN_LIST_SIZE: usize = 0xC0;
const SCAN_LIST_MEMBERS: usize = 50;
const SCAN_LIST_BANK_0: u32 = 0x0108_0000;
const SCAN_LIST_BANK_OFFSET: u32 = 0x0004_0000;
const SCAN_BITMAP: u32 = 0x024c_1380;
const SCAN_BITMAP_SIZE: usize = 0x40;

const NUM_RADIO_IDS: usize = 250;
const RADIO_ID_SIZE: usize = 0x20;
const RADIO_ID_BASE: u32 = 0x0258_0000;
const RADIO_ID_BITMAP: u32 = 0x024c_1340;
const RADIO_ID_BITMAP_SIZE: usize = 0x40;

const NUM_GPS_SYSTEMS: usize = 8;
const GPS_RECORD_SIZE: usize = 0x10;
const GPS_SETTINGS: u32 = 0x0250_1000;
const GPS_SETTINGS_SIZE: usize = NUM_GPS_SYSTEMS * GPS_RECORD_SIZE;

const NUM_APRS_SYSTEMS: usize = 1;
const APRS_SETTINGS: u32 = 0x0250_1800;
const APRS_SETTINGS_SIZE: usize = 0x100;

const SETTINGS_BASE: u32 = 0x0250_0000;
const SETTINGS_SIZE: usize = 0x100;

/// "Not set" in a u16 index field.
const IDX16_NONE: u16 = 0xFFFF;
/// "Not set" in a u8 index field.
const IDX8_NONE: u8 = 0xFF;

fn channel_address(index: usize) -> u32 {
    let bank = (index / CHANNELS_PER_BANK) as u32;
    let slot = (index % CHANNELS_PER_BANK) as u32;
    CHANNEL_BANK_0 + bank * CHANNEL_BANK_OFFSET + slot * CHANNEL_SIZE as u32
}

fn channel_bank_address(bank: usize) -> u32 {
    CHANNEL_BANK_0 + bank as u32 * CHANNEL_BANK_OFFSET
}

fn contact_address(index: usize) -> u32 {
    CONTACT_BASE + (index * CONTACT_SIZE) as u32
}

fn group_list_address(index: usize) -> u32 {
    GROUP_LIST_BASE + index as u32 * GROUP_LIST_OFFSET
}

fn zone_list_address(index: usize) -> u32 {
    ZONE_LIST_BASE + (index * ZONE_LIST_SIZE) as u32
}

fn zone_name_address(index: usize) -> u32 {
    ZONE_NAME_BASE + (index * ZONE_NAME_SIZE) as u32
}

fn scan_list_address(index: usize) -> u32 {
    let bank = (index / SCAN_LISTS_PER_BANK) as u32;
    let slot = (index % SCAN_LISTS_PER_BANK) as u32;
    SCAN_LIST_BANK_0 + bank * SCAN_LIST_BANK_OFFSET + slot * SCAN_LIST_SIZE as u32
}

fn radio_id_address(index: usize) -> u32 {
    RADIO_ID_BASE + (index * RADIO_ID_SIZE) as u32
}

fn capacity(what: &'static str, count: usize, limit: usize) -> Result<()> {
    if count > limit {
        return Err(CodeplugError::Capacity { what, count, limit });
    }
    Ok(())
}

/// Encode a `ChannelRef` in the scan-list convention: 0 selected,
/// device index + 1 otherwise.
fn encode_channel_ref(r: ChannelRef) -> u16 {
    match r {
        ChannelRef::Selected => 0,
        ChannelRef::Channel(i) => i as u16 + 1,
    }
}

fn icon_code(icon: AprsIcon) -> u8 {
    match icon {
        AprsIcon::Jogger => 0,
        AprsIcon::Car => 1,
        AprsIcon::Home => 2,
        AprsIcon::Bicycle => 3,
        AprsIcon::Motorcycle => 4,
        AprsIcon::Truck => 5,
        AprsIcon::Boat => 6,
        AprsIcon::Balloon => 7,
        AprsIcon::Aircraft => 8,
        AprsIcon::Jeep => 9,
        AprsIcon::RecreationalVehicle => 10,
    }
}

fn icon_from_code(code: u8) -> AprsIcon {
    match code {
        1 => AprsIcon::Car,
        2 => AprsIcon::Home,
        3 => AprsIcon::Bicycle,
        4 => AprsIcon::Motorcycle,
        5 => AprsIcon::Truck,
        6 => AprsIcon::Boat,
        7 => AprsIcon::Balloon,
        8 => AprsIcon::Aircraft,
        9 => AprsIcon::Jeep,
        10 => AprsIcon::RecreationalVehicle,
        _ => AprsIcon::Jogger,
    }
}

/// Index translations computed up front for an encode run.
#[derive(Default)]
struct EncodeMaps {
    /// Contact slot -> device index in the DMR contact table.
    dmr_index: HashMap<usize, u16>,
    /// Positioning slot -> device index in the GPS table.
    gps_index: HashMap<usize, u8>,
    /// Slot of the (single) APRS system, if any.
    aprs_slot: Option<usize>,
    /// Device zones after A/B expansion: name plus member slots.
    device_zones: Vec<(String, Vec<usize>)>,
}

impl EncodeMaps {
    fn build(config: &Config) -> Result<Self> {
        let mut maps = EncodeMaps::default();

        let mut dmr = 0u16;
        let mut dtmf = 0usize;
        for (slot, contact) in config.contacts.iter().enumerate() {
            match contact {
                Contact::Dmr(_) => {
                    maps.dmr_index.insert(slot, dmr);
                    dmr += 1;
                }
                Contact::Dtmf(_) => dtmf += 1,
            }
        }
        capacity("contacts", dmr as usize, NUM_CONTACTS)?;
        capacity("DTMF contacts", dtmf, NUM_DTMF_CONTACTS)?;

        let mut gps = 0u8;
        let mut aprs = 0usize;
        for (slot, sys) in config.positioning.iter().enumerate() {
            match sys {
                PositioningSystem::Gps(_) => {
                    maps.gps_index.insert(slot, gps);
                    gps += 1;
                }
                PositioningSystem::Aprs(_) => {
                    if maps.aprs_slot.is_none() {
                        maps.aprs_slot = Some(slot);
                    }
                    aprs += 1;
                }
            }
        }
        capacity("GPS systems", gps as usize, NUM_GPS_SYSTEMS)?;
        capacity("APRS systems", aprs, NUM_APRS_SYSTEMS)?;

        for zone in &config.zones {
            if zone.is_split() {
                maps.device_zones
                    .push((format!("{} A", zone.name), zone.a.clone()));
                maps.device_zones
                    .push((format!("{} B", zone.name), zone.b.clone()));
            } else {
                maps.device_zones.push((zone.name.clone(), zone.a.clone()));
            }
        }

        capacity("channels", config.channels.len(), NUM_CHANNELS)?;
        capacity("zones", maps.device_zones.len(), NUM_ZONES)?;
        capacity("group lists", config.group_lists.len(), NUM_GROUP_LISTS)?;
        capacity("scan lists", config.scan_lists.len(), NUM_SCAN_LISTS)?;
        capacity("radio IDs", config.radio_ids.len(), NUM_RADIO_IDS)?;

        Ok(maps)
    }

    fn num_dmr_contacts(&self) -> usize {
        self.dmr_index.len()
    }
}

/// Raw cross references held back for the decode link pass.
#[derive(Default)]
struct PendingLinks {
    /// (channel slot, digital?, contact, group list, radio id, scan
    /// list, positioning)
    channels: Vec<(usize, bool, u16, u16, u8, u8, u8)>,
    group_lists: Vec<(usize, Vec<u32>)>,
    zones: Vec<(usize, Vec<u16>, Vec<u16>)>,
    scan_lists: Vec<(usize, u16, u16, u16, Vec<u16>)>,
    gps: Vec<(usize, u16, u16)>,
    aprs: Vec<(usize, u16)>,
    default_radio_id: Option<u8>,
}

/// Device index -> configuration slot maps built during the parse pass.
#[derive(Default)]
struct DecodeMaps {
    channels: HashMap<usize, usize>,
    contacts: HashMap<usize, usize>,
    group_lists: HashMap<usize, usize>,
    scan_lists: HashMap<usize, usize>,
    radio_ids: HashMap<usize, usize>,
    gps: HashMap<usize, usize>,
    aprs_slot: Option<usize>,
}

pub struct D868uvCodeplug {
    image: Image,
}

impl D868uvCodeplug {
    pub fn new() -> Self {
        Self {
            image: Image::new("AT-D868UV"),
        }
    }

    fn bitmap(&self, address: u32) -> Result<&[u8]> {
        Ok(self.image.data(address)?)
    }

    fn set_bitmap_bit(&mut self, address: u32, index: usize) -> Result<()> {
        set_bit(self.image.data_mut(address)?, index);
        Ok(())
    }

    /// Reset every bitmap. An upload reads the device's bitmaps first,
    /// so entries the new configuration no longer has must be cleared
    /// before encoding marks its own.
    fn clear_bitmaps(&mut self) -> Result<()> {
        for address in [
            CHANNEL_BITMAP,
            CONTACT_BITMAP,
            GROUP_LIST_BITMAP,
            ZONE_BITMAP,
            SCAN_BITMAP,
            RADIO_ID_BITMAP,
        ] {
            self.image.data_mut(address)?.fill(0);
        }
        Ok(())
    }

    /// Device indices marked present in the bitmap at `address`.
    fn present(&self, address: u32, limit: usize) -> Result<Vec<usize>> {
        let map = self.bitmap(address)?;
        Ok((0..limit).filter(|&i| bit_is_set(map, i)).collect())
    }

    // ---- encode ----------------------------------------------------

    fn encode_radio_ids(&mut self, config: &Config) -> Result<()> {
        for (i, rid) in config.radio_ids.iter().enumerate() {
            self.set_bitmap_bit(RADIO_ID_BITMAP, i)?;
            let rec = &mut self.image.data_mut(radio_id_address(i))?[..RADIO_ID_SIZE];
            rec[0..4].copy_from_slice(&encode_dmr_id(rid.id));
            rec[4..20].copy_from_slice(&encode_ascii(&rid.name, 16, 0x00));
        }
        Ok(())
    }

    fn encode_contacts(&mut self, config: &Config, maps: &EncodeMaps) -> Result<()> {
        let mut id_map: Vec<(u32, u32)> = Vec::with_capacity(maps.num_dmr_contacts());
        let mut dtmf_index = 0usize;

        for (slot, contact) in config.contacts.iter().enumerate() {
            match contact {
                Contact::Dmr(c) => {
                    let dev = maps.dmr_index[&slot] as usize;
                    self.set_bitmap_bit(CONTACT_BITMAP, dev)?;
                    let rec = &mut self.image.data_mut(contact_address(dev))?[..CONTACT_SIZE];
                    rec[0] = match c.kind {
                        CallKind::Private => 0,
                        CallKind::Group => 1,
                        CallKind::All => 2,
                    };
                    rec[1..17].copy_from_slice(&encode_ascii(&c.name, 16, 0x00));
                    rec[0x11..0x15].copy_from_slice(&encode_dmr_id(c.id));
                    rec[0x15] = c.ring as u8;
                    id_map.push(((c.id << 1) | c.is_group() as u32, dev as u32));
                }
                Contact::Dtmf(c) => {
                    let rec = &mut self.image.data_mut(
                        DTMF_CONTACT_BASE + (dtmf_index * DTMF_CONTACT_SIZE) as u32,
                    )?[..DTMF_CONTACT_SIZE];
                    rec[0..16].copy_from_slice(&encode_ascii(&c.name, 16, 0x00));
                    rec[0x10..0x20].copy_from_slice(&encode_ascii(&c.number, 16, 0x00));
                    dtmf_index += 1;
                }
            }
        }

        // The firmware resolves incoming calls through this map and
        // requires it sorted by key.
        if !id_map.is_empty() {
            id_map.sort_unstable_by_key(|&(key, _)| key);
            let data = self.image.data_mut(CONTACT_ID_MAP)?;
            for (i, (key, dev)) in id_map.iter().enumerate() {
                put_u32(data, i * 8, *key);
                put_u32(data, i * 8 + 4, *dev);
            }
            put_u32(data, id_map.len() * 8, 0xFFFF_FFFF);
        }
        Ok(())
    }

    fn encode_group_lists(&mut self, config: &Config, maps: &EncodeMaps) -> Result<()> {
        for (i, gl) in config.group_lists.iter().enumerate() {
            capacity("group list members", gl.contacts.len(), GROUP_LIST_MEMBERS)?;
            self.set_bitmap_bit(GROUP_LIST_BITMAP, i)?;
            let mut members = Vec::with_capacity(gl.contacts.len());
            for &slot in &gl.contacts {
                let dev = maps.dmr_index.get(&slot).copied().ok_or_else(|| {
                    CodeplugError::Encode {
                        what: "group list",
                        name: gl.name.clone(),
                        message: format!("member {} is not a DMR contact", slot),
                    }
                })?;
                members.push(dev);
            }
            let rec = &mut self.image.data_mut(group_list_address(i))?[..GROUP_LIST_SIZE];
            for m in 0..GROUP_LIST_MEMBERS {
                let value = members.get(m).map(|&d| d as u32).unwrap_or(0xFFFF_FFFF);
                put_u32(rec, m * 4, value);
            }
            rec[0x100..0x110].copy_from_slice(&encode_ascii(&gl.name, 16, 0x00));
        }
        Ok(())
    }

    fn encode_channels(&mut self, config: &Config, maps: &EncodeMaps) -> Result<()> {
        for (i, channel) in config.channels.iter().enumerate() {
            self.set_bitmap_bit(CHANNEL_BITMAP, i)?;
            let base = channel.base();
            let rec = &mut self.image.data_mut(channel_address(i))?[..CHANNEL_SIZE];

            put_u32(rec, 0x00, encode_frequency(base.rx_frequency));
            put_u32(rec, 0x04, encode_frequency(base.tx_frequency));
            rec[0x09] = base.power as u8;
            rec[0x0b] = base.rx_only as u8;
            rec[0x19] = base
                .scan_list
                .map(|s| s as u8)
                .unwrap_or(IDX8_NONE);
            put_u16(rec, 0x1c, base.timeout.min(u16::MAX as u32) as u16);
            rec[0x20..0x30].copy_from_slice(&encode_ascii(&base.name, 16, 0x00));

            match channel {
                Channel::Analog(c) => {
                    rec[0x08] = 0;
                    rec[0x0a] = (c.bandwidth == Bandwidth::Wide) as u8;
                    put_u16(rec, 0x0c, c.rx_tone.encode());
                    put_u16(rec, 0x0e, c.tx_tone.encode());
                    rec[0x10] = c.squelch;
                    rec[0x12] = 1;
                    put_u16(rec, 0x14, IDX16_NONE);
                    put_u16(rec, 0x16, IDX16_NONE);
                    rec[0x18] = IDX8_NONE;
                    rec[0x1a] = match c.aprs {
                        Some(_) => 0,
                        None => IDX8_NONE,
                    };
                }
                Channel::Digital(c) => {
                    rec[0x08] = 1;
                    put_u16(rec, 0x0c, SelectiveCall::None.encode());
                    put_u16(rec, 0x0e, SelectiveCall::None.encode());
                    rec[0x11] = c.color_code;
                    rec[0x12] = c.time_slot.number();
                    rec[0x13] = match c.admit {
                        Admit::Always => 0,
                        Admit::ChannelFree => 1,
                        Admit::ColorCode => 2,
                    };
                    let contact = match c.tx_contact {
                        Some(slot) => maps.dmr_index.get(&slot).copied().ok_or_else(|| {
                            CodeplugError::Encode {
                                what: "channel",
                                name: base.name.clone(),
                                message: format!("TX contact {} is not a DMR contact", slot),
                            }
                        })?,
                        None => IDX16_NONE,
                    };
                    put_u16(rec, 0x14, contact);
                    put_u16(
                        rec,
                        0x16,
                        c.group_list.map(|g| g as u16).unwrap_or(IDX16_NONE),
                    );
                    rec[0x18] = match c.radio_id {
                        RadioIdRef::Default => IDX8_NONE,
                        RadioIdRef::Id(slot) => slot as u8,
                    };
                    rec[0x1a] = match c.gps_system {
                        Some(slot) => {
                            maps.gps_index.get(&slot).copied().ok_or_else(|| {
                                CodeplugError::Encode {
                                    what: "channel",
                                    name: base.name.clone(),
                                    message: format!("positioning {} is not a GPS system", slot),
                                }
                            })?
                        }
                        None => IDX8_NONE,
                    };
                }
            }
        }
        Ok(())
    }

    fn encode_zones(&mut self, maps: &EncodeMaps) -> Result<()> {
        for (i, (name, members)) in maps.device_zones.iter().enumerate() {
            capacity("zone members", members.len(), ZONE_MEMBERS)?;
            self.set_bitmap_bit(ZONE_BITMAP, i)?;
            self.image
                .write(zone_name_address(i), &encode_ascii(name, 16, 0x00))?;
            let rec = &mut self.image.data_mut(zone_list_address(i))?[..ZONE_LIST_SIZE];
            for m in 0..ZONE_LIST_SIZE / 2 {
                let value = members.get(m).map(|&c| c as u16).unwrap_or(IDX16_NONE);
                put_u16(rec, m * 2, value);
            }
        }
        Ok(())
    }

    fn encode_scan_lists(&mut self, config: &Config) -> Result<()> {
        for (i, sl) in config.scan_lists.iter().enumerate() {
            capacity("scan list members", sl.channels.len(), SCAN_LIST_MEMBERS)?;
            self.set_bitmap_bit(SCAN_BITMAP, i)?;
            let rec = &mut self.image.data_mut(scan_list_address(i))?[..SCAN_LIST_SIZE];
            rec[0x00..0x10].copy_from_slice(&encode_ascii(&sl.name, 16, 0x00));
            put_u16(
                rec,
                0x10,
                sl.priority1.map(encode_channel_ref).unwrap_or(IDX16_NONE),
            );
            put_u16(
                rec,
                0x12,
                sl.priority2.map(encode_channel_ref).unwrap_or(IDX16_NONE),
            );
            put_u16(
                rec,
                0x14,
                sl.revert.map(encode_channel_ref).unwrap_or(IDX16_NONE),
            );
            for m in 0..SCAN_LIST_MEMBERS {
                let value = sl
                    .channels
                    .get(m)
                    .map(|&r| encode_channel_ref(r))
                    .unwrap_or(IDX16_NONE);
                put_u16(rec, 0x20 + m * 2, value);
            }
        }
        Ok(())
    }

    fn encode_positioning(&mut self, config: &Config, maps: &EncodeMaps) -> Result<()> {
        let gps = self.image.data_mut(GPS_SETTINGS)?;
        for rec in gps.chunks_exact_mut(GPS_RECORD_SIZE).take(NUM_GPS_SYSTEMS) {
            put_u16(rec, 0x00, IDX16_NONE);
        }
        for (slot, sys) in config.positioning.iter().enumerate() {
            let PositioningSystem::Gps(g) = sys else {
                continue;
            };
            let dev = maps.gps_index[&slot] as usize;
            let dest = maps.dmr_index.get(&g.destination).copied().ok_or_else(|| {
                CodeplugError::Encode {
                    what: "GPS system",
                    name: g.name.clone(),
                    message: format!("destination {} is not a DMR contact", g.destination),
                }
            })?;
            let rec = &mut self.image.data_mut(GPS_SETTINGS)?
                [dev * GPS_RECORD_SIZE..(dev + 1) * GPS_RECORD_SIZE];
            put_u16(rec, 0x00, dest);
            put_u16(
                rec,
                0x02,
                g.revert.map(|c| c as u16).unwrap_or(IDX16_NONE),
            );
            put_u16(rec, 0x04, g.period.min(u16::MAX as u32) as u16);
        }

        let rec = self.image.data_mut(APRS_SETTINGS)?;
        put_u16(rec, 0x00, IDX16_NONE);
        if let Some(slot) = maps.aprs_slot {
            if let Some(PositioningSystem::Aprs(a)) = config.positioning.get(slot) {
                put_u16(rec, 0x00, a.channel as u16);
                put_u16(rec, 0x02, a.period.min(u16::MAX as u32) as u16);
                rec[0x04..0x0a].copy_from_slice(&encode_ascii(&a.source.call, 6, 0x00));
                rec[0x0a] = a.source.ssid;
                rec[0x0b..0x11].copy_from_slice(&encode_ascii(&a.destination.call, 6, 0x00));
                rec[0x11] = a.destination.ssid;
                rec[0x12..0x26].copy_from_slice(&encode_ascii(&a.path, 20, 0x00));
                rec[0x26] = icon_code(a.icon);
                let message = a.message.as_deref().unwrap_or("");
                rec[0x28..0x64].copy_from_slice(&encode_ascii(message, 60, 0x00));
            }
        }
        Ok(())
    }

    fn encode_settings(&mut self, config: &Config) -> Result<()> {
        let rec = self.image.data_mut(SETTINGS_BASE)?;
        rec[0x00..0x10].copy_from_slice(&encode_ascii(&config.settings.intro_line1, 16, 0x00));
        rec[0x10..0x20].copy_from_slice(&encode_ascii(&config.settings.intro_line2, 16, 0x00));
        rec[0x20] = config.default_radio_id.map(|i| i as u8).unwrap_or(0);
        Ok(())
    }

    // ---- decode ----------------------------------------------------

    fn parse_radio_ids(&self, config: &mut Config, maps: &mut DecodeMaps) -> Result<()> {
        for dev in self.present(RADIO_ID_BITMAP, NUM_RADIO_IDS)? {
            let rec = &self.image.data(radio_id_address(dev))?[..RADIO_ID_SIZE];
            let id = decode_dmr_id(&[rec[0], rec[1], rec[2], rec[3]]).map_err(|e| {
                CodeplugError::Decode {
                    what: "radio ID",
                    index: dev,
                    message: e.to_string(),
                }
            })?;
            let name = decode_ascii(&rec[4..20], 0x00);
            let slot = config.add_radio_id(RadioId::new(name, id));
            maps.radio_ids.insert(dev, slot);
        }
        Ok(())
    }

    fn parse_contacts(&self, config: &mut Config, maps: &mut DecodeMaps) -> Result<()> {
        for dev in self.present(CONTACT_BITMAP, NUM_CONTACTS)? {
            let rec = &self.image.data(contact_address(dev))?[..CONTACT_SIZE];
            let kind = match rec[0] {
                1 => CallKind::Group,
                2 => CallKind::All,
                _ => CallKind::Private,
            };
            let name = decode_ascii(&rec[1..17], 0x00);
            let id = decode_dmr_id(&[rec[0x11], rec[0x12], rec[0x13], rec[0x14]]).map_err(
                |e| CodeplugError::Decode {
                    what: "contact",
                    index: dev,
                    message: e.to_string(),
                },
            )?;
            let mut contact = DmrContact::new(kind, name, id);
            contact.ring = rec[0x15] != 0;
            maps.contacts.insert(dev, config.contacts.len());
            config.contacts.push(Contact::Dmr(contact));
        }

        for dev in 0..NUM_DTMF_CONTACTS {
            let addr = DTMF_CONTACT_BASE + (dev * DTMF_CONTACT_SIZE) as u32;
            let rec = &self.image.data(addr)?[..DTMF_CONTACT_SIZE];
            let number = decode_ascii(&rec[0x10..0x20], 0x00);
            if number.is_empty() {
                continue;
            }
            let name = decode_ascii(&rec[0..16], 0x00);
            config.contacts.push(Contact::Dtmf(DtmfContact::new(name, number)));
        }
        Ok(())
    }

    fn parse_group_lists(
        &self,
        config: &mut Config,
        maps: &mut DecodeMaps,
        links: &mut PendingLinks,
    ) -> Result<()> {
        for dev in self.present(GROUP_LIST_BITMAP, NUM_GROUP_LISTS)? {
            let rec = &self.image.data(group_list_address(dev))?[..GROUP_LIST_SIZE];
            let name = decode_ascii(&rec[0x100..0x110], 0x00);
            let members: Vec<u32> = (0..GROUP_LIST_MEMBERS)
                .map(|m| get_u32(rec, m * 4))
                .take_while(|&v| v != 0xFFFF_FFFF)
                .collect();
            let slot = config.group_lists.len();
            maps.group_lists.insert(dev, slot);
            config.group_lists.push(GroupList::new(name));
            links.group_lists.push((slot, members));
        }
        Ok(())
    }

    fn parse_channels(
        &self,
        config: &mut Config,
        maps: &mut DecodeMaps,
        links: &mut PendingLinks,
    ) -> Result<()> {
        for dev in self.present(CHANNEL_BITMAP, NUM_CHANNELS)? {
            let rec = &self.image.data(channel_address(dev))?[..CHANNEL_SIZE];
            let name = decode_ascii(&rec[0x20..0x30], 0x00);
            let digital = rec[0x08] == 1;

            let mut channel = if digital {
                let mut c = DigitalChannel::new(name);
                c.color_code = rec[0x11];
                c.time_slot = TimeSlot::from_number(rec[0x12]).unwrap_or_default();
                c.admit = match rec[0x13] {
                    1 => Admit::ChannelFree,
                    2 => Admit::ColorCode,
                    _ => Admit::Always,
                };
                Channel::Digital(c)
            } else {
                let mut c = AnalogChannel::new(name);
                c.bandwidth = if rec[0x0a] != 0 {
                    Bandwidth::Wide
                } else {
                    Bandwidth::Narrow
                };
                c.rx_tone = SelectiveCall::decode(get_u16(rec, 0x0c));
                c.tx_tone = SelectiveCall::decode(get_u16(rec, 0x0e));
                c.squelch = rec[0x10];
                Channel::Analog(c)
            };

            let base = channel.base_mut();
            base.rx_frequency =
                decode_frequency(get_u32(rec, 0x00)).map_err(|e| CodeplugError::Decode {
                    what: "channel",
                    index: dev,
                    message: e.to_string(),
                })?;
            base.tx_frequency =
                decode_frequency(get_u32(rec, 0x04)).map_err(|e| CodeplugError::Decode {
                    what: "channel",
                    index: dev,
                    message: e.to_string(),
                })?;
            base.power = match rec[0x09] {
                0 => Power::Min,
                1 => Power::Low,
                2 => Power::Mid,
                4 => Power::Max,
                _ => Power::High,
            };
            base.rx_only = rec[0x0b] != 0;
            base.timeout = get_u16(rec, 0x1c) as u32;

            let slot = config.channels.len();
            maps.channels.insert(dev, slot);
            config.channels.push(channel);
            links.channels.push((
                slot,
                digital,
                get_u16(rec, 0x14),
                get_u16(rec, 0x16),
                rec[0x18],
                rec[0x19],
                rec[0x1a],
            ));
        }
        Ok(())
    }

    fn parse_zones(&self, config: &mut Config, links: &mut PendingLinks) -> Result<()> {
        let mut device_zones: Vec<(String, Vec<u16>)> = Vec::new();
        for dev in self.present(ZONE_BITMAP, NUM_ZONES)? {
            let name = decode_ascii(&self.image.data(zone_name_address(dev))?[..16], 0x00);
            let rec = &self.image.data(zone_list_address(dev))?[..ZONE_LIST_SIZE];
            let members: Vec<u16> = (0..ZONE_LIST_SIZE / 2)
                .map(|m| get_u16(rec, m * 2))
                .take_while(|&v| v != IDX16_NONE)
                .collect();
            device_zones.push((name, members));
        }

        // Re-join zones the encoder split into " A"/" B" pairs; a lone
        // suffixed zone stays as it was found.
        let mut iter = device_zones.into_iter().peekable();
        while let Some((name, a)) = iter.next() {
            if let Some(base) = name.strip_suffix(" A") {
                let matches_b = iter
                    .peek()
                    .map(|(next, _)| next.strip_suffix(" B") == Some(base))
                    .unwrap_or(false);
                if matches_b {
                    let (_, b) = iter.next().unwrap_or_default();
                    let slot = config.zones.len();
                    config.zones.push(Zone::new(base));
                    links.zones.push((slot, a, b));
                    continue;
                }
            }
            let slot = config.zones.len();
            config.zones.push(Zone::new(name));
            links.zones.push((slot, a, Vec::new()));
        }
        Ok(())
    }

    fn parse_scan_lists(
        &self,
        config: &mut Config,
        maps: &mut DecodeMaps,
        links: &mut PendingLinks,
    ) -> Result<()> {
        for dev in self.present(SCAN_BITMAP, NUM_SCAN_LISTS)? {
            let rec = &self.image.data(scan_list_address(dev))?[..SCAN_LIST_SIZE];
            let name = decode_ascii(&rec[0x00..0x10], 0x00);
            let members: Vec<u16> = (0..SCAN_LIST_MEMBERS)
                .map(|m| get_u16(rec, 0x20 + m * 2))
                .take_while(|&v| v != IDX16_NONE)
                .collect();
            let slot = config.scan_lists.len();
            maps.scan_lists.insert(dev, slot);
            config.scan_lists.push(ScanList::new(name));
            links.scan_lists.push((
                slot,
                get_u16(rec, 0x10),
                get_u16(rec, 0x12),
                get_u16(rec, 0x14),
                members,
            ));
        }
        Ok(())
    }

    fn parse_positioning(
        &self,
        config: &mut Config,
        maps: &mut DecodeMaps,
        links: &mut PendingLinks,
    ) -> Result<()> {
        for dev in 0..NUM_GPS_SYSTEMS {
            let rec = &self.image.data(GPS_SETTINGS)?
                [dev * GPS_RECORD_SIZE..(dev + 1) * GPS_RECORD_SIZE];
            let dest = get_u16(rec, 0x00);
            if dest == IDX16_NONE {
                continue;
            }
            let mut gps = GpsSystem::new(format!("GPS {}", dev + 1), 0);
            gps.period = get_u16(rec, 0x04) as u32;
            let slot = config.positioning.len();
            maps.gps.insert(dev, slot);
            config.positioning.push(PositioningSystem::Gps(gps));
            links.gps.push((slot, dest, get_u16(rec, 0x02)));
        }

        let rec = self.image.data(APRS_SETTINGS)?;
        let channel = get_u16(rec, 0x00);
        if channel != IDX16_NONE {
            let mut aprs = AprsSystem::new("APRS", 0);
            aprs.period = get_u16(rec, 0x02) as u32;
            aprs.source = AprsAddress::new(decode_ascii(&rec[0x04..0x0a], 0x00), rec[0x0a]);
            aprs.destination = AprsAddress::new(decode_ascii(&rec[0x0b..0x11], 0x00), rec[0x11]);
            aprs.path = decode_ascii(&rec[0x12..0x26], 0x00);
            aprs.icon = icon_from_code(rec[0x26]);
            let message = decode_ascii(&rec[0x28..0x64], 0x00);
            aprs.message = if message.is_empty() {
                None
            } else {
                Some(message)
            };
            let slot = config.positioning.len();
            maps.aprs_slot = Some(slot);
            config.positioning.push(PositioningSystem::Aprs(aprs));
            links.aprs.push((slot, channel));
        }
        Ok(())
    }

    fn parse_settings(&self, config: &mut Config, links: &mut PendingLinks) -> Result<()> {
        let rec = self.image.data(SETTINGS_BASE)?;
        config.settings.intro_line1 = decode_ascii(&rec[0x00..0x10], 0x00);
        config.settings.intro_line2 = decode_ascii(&rec[0x10..0x20], 0x00);
        links.default_radio_id = Some(rec[0x20]);
        Ok(())
    }

    fn link(&self, config: &mut Config, maps: &DecodeMaps, links: PendingLinks) {
        let channel_ref = |raw: u16| -> Option<ChannelRef> {
            if raw == IDX16_NONE {
                None
            } else if raw == 0 {
                Some(ChannelRef::Selected)
            } else {
                maps.channels
                    .get(&(raw as usize - 1))
                    .map(|&s| ChannelRef::Channel(s))
            }
        };

        for (slot, digital, contact, group_list, radio_id, scan_list, positioning) in
            links.channels
        {
            let scan = if scan_list == IDX8_NONE {
                None
            } else {
                maps.scan_lists.get(&(scan_list as usize)).copied()
            };
            config.channels[slot].base_mut().scan_list = scan;

            if digital {
                let tx_contact = if contact == IDX16_NONE {
                    None
                } else {
                    maps.contacts.get(&(contact as usize)).copied()
                };
                let gl = if group_list == IDX16_NONE {
                    None
                } else {
                    maps.group_lists.get(&(group_list as usize)).copied()
                };
                let rid = if radio_id == IDX8_NONE {
                    RadioIdRef::Default
                } else {
                    maps.radio_ids
                        .get(&(radio_id as usize))
                        .map(|&s| RadioIdRef::Id(s))
                        .unwrap_or(RadioIdRef::Default)
                };
                let gps = if positioning == IDX8_NONE {
                    None
                } else {
                    maps.gps.get(&(positioning as usize)).copied()
                };
                if let Channel::Digital(c) = &mut config.channels[slot] {
                    c.tx_contact = tx_contact;
                    c.group_list = gl;
                    c.radio_id = rid;
                    c.gps_system = gps;
                }
            } else {
                let aprs = if positioning == IDX8_NONE {
                    None
                } else {
                    maps.aprs_slot
                };
                if let Channel::Analog(c) = &mut config.channels[slot] {
                    c.aprs = aprs;
                }
            }
        }

        for (slot, members) in links.group_lists {
            config.group_lists[slot].contacts = members
                .iter()
                .filter_map(|m| maps.contacts.get(&(*m as usize)).copied())
                .collect();
        }

        for (slot, a, b) in links.zones {
            config.zones[slot].a = a
                .iter()
                .filter_map(|m| maps.channels.get(&(*m as usize)).copied())
                .collect();
            config.zones[slot].b = b
                .iter()
                .filter_map(|m| maps.channels.get(&(*m as usize)).copied())
                .collect();
        }

        for (slot, pri1, pri2, revert, members) in links.scan_lists {
            let sl = &mut config.scan_lists[slot];
            sl.priority1 = channel_ref(pri1);
            sl.priority2 = channel_ref(pri2);
            sl.revert = channel_ref(revert);
            sl.channels = members.iter().filter_map(|&m| channel_ref(m)).collect();
        }

        for (slot, dest, revert) in links.gps {
            let destination = maps.contacts.get(&(dest as usize)).copied();
            let revert = if revert == IDX16_NONE {
                None
            } else {
                maps.channels.get(&(revert as usize)).copied()
            };
            if let Some(PositioningSystem::Gps(g)) = config.positioning.get_mut(slot) {
                match destination {
                    Some(d) => g.destination = d,
                    None => warn!("GPS system {} references a missing contact", g.name),
                }
                g.revert = revert;
            }
        }

        for (slot, channel) in links.aprs {
            let ch = maps.channels.get(&(channel as usize)).copied();
            if let Some(PositioningSystem::Aprs(a)) = config.positioning.get_mut(slot) {
                match ch {
                    Some(c) => a.channel = c,
                    None => warn!("APRS system {} references a missing channel", a.name),
                }
            }
        }

        if let Some(dev) = links.default_radio_id {
            if let Some(&slot) = maps.radio_ids.get(&(dev as usize)) {
                config.default_radio_id = Some(slot);
            }
        }
    }
}

impl Default for D868uvCodeplug {
    fn default() -> Self {
        Self::new()
    }
}

impl Codeplug for D868uvCodeplug {
    fn model(&self) -> &'static str {
        "AT-D868UV"
    }

    fn allocate_bitmaps(&mut self) -> Result<()> {
        self.image.add_element(CHANNEL_BITMAP, CHANNEL_BITMAP_SIZE)?;
        self.image.add_element(CONTACT_BITMAP, CONTACT_BITMAP_SIZE)?;
        self.image
            .add_element(GROUP_LIST_BITMAP, GROUP_LIST_BITMAP_SIZE)?;
        self.image.add_element(ZONE_BITMAP, ZONE_BITMAP_SIZE)?;
        self.image.add_element(SCAN_BITMAP, SCAN_BITMAP_SIZE)?;
        self.image
            .add_element(RADIO_ID_BITMAP, RADIO_ID_BITMAP_SIZE)?;
        Ok(())
    }

    fn allocate_for_decoding(&mut self) -> Result<()> {
        let channels = self.present(CHANNEL_BITMAP, NUM_CHANNELS)?;
        let mut banks: Vec<usize> = channels.iter().map(|&c| c / CHANNELS_PER_BANK).collect();
        banks.dedup();
        for bank in banks {
            self.image.add_element(
                channel_bank_address(bank),
                CHANNELS_PER_BANK * CHANNEL_SIZE,
            )?;
        }

        if let Some(&max) = self.present(CONTACT_BITMAP, NUM_CONTACTS)?.last() {
            self.image
                .add_element(CONTACT_BASE, align64((max + 1) * CONTACT_SIZE))?;
        }
        self.image
            .add_element(DTMF_CONTACT_BASE, align64(NUM_DTMF_CONTACTS * DTMF_CONTACT_SIZE))?;

        for dev in self.present(GROUP_LIST_BITMAP, NUM_GROUP_LISTS)? {
            self.image
                .add_element(group_list_address(dev), GROUP_LIST_SIZE)?;
        }

        let zones = self.present(ZONE_BITMAP, NUM_ZONES)?;
        if let Some(&max) = zones.last() {
            self.image
                .add_element(ZONE_NAME_BASE, align64((max + 1) * ZONE_NAME_SIZE))?;
        }
        for dev in zones {
            self.image.add_element(zone_list_address(dev), ZONE_LIST_SIZE)?;
        }

        for dev in self.present(SCAN_BITMAP, NUM_SCAN_LISTS)? {
            self.image
                .add_element(scan_list_address(dev), SCAN_LIST_SIZE)?;
        }

        if let Some(&max) = self.present(RADIO_ID_BITMAP, NUM_RADIO_IDS)?.last() {
            self.image
                .add_element(RADIO_ID_BASE, align64((max + 1) * RADIO_ID_SIZE))?;
        }

        self.image.add_element(GPS_SETTINGS, GPS_SETTINGS_SIZE)?;
        self.image.add_element(APRS_SETTINGS, APRS_SETTINGS_SIZE)?;
        self.image.add_element(SETTINGS_BASE, SETTINGS_SIZE)?;
        Ok(())
    }

    fn allocate_updated(&mut self) -> Result<()> {
        // Only the general settings block must be read back; every
        // other section is rewritten from scratch.
        self.image.add_element(SETTINGS_BASE, SETTINGS_SIZE)?;
        Ok(())
    }

    fn allocate_for_encoding(&mut self, config: &Config) -> Result<()> {
        let maps = EncodeMaps::build(config)?;
        self.allocate_bitmaps()?;

        let mut banks: Vec<usize> = (0..config.channels.len())
            .map(|c| c / CHANNELS_PER_BANK)
            .collect();
        banks.dedup();
        for bank in banks {
            self.image.add_element(
                channel_bank_address(bank),
                CHANNELS_PER_BANK * CHANNEL_SIZE,
            )?;
        }

        let dmr = maps.num_dmr_contacts();
        if dmr > 0 {
            self.image
                .add_element(CONTACT_BASE, align64(dmr * CONTACT_SIZE))?;
            self.image
                .add_element(CONTACT_ID_MAP, align64((dmr + 1) * 8))?;
        }
        self.image
            .add_element(DTMF_CONTACT_BASE, align64(NUM_DTMF_CONTACTS * DTMF_CONTACT_SIZE))?;

        for i in 0..config.group_lists.len() {
            self.image.add_element(group_list_address(i), GROUP_LIST_SIZE)?;
        }

        if !maps.device_zones.is_empty() {
            self.image.add_element(
                ZONE_NAME_BASE,
                align64(maps.device_zones.len() * ZONE_NAME_SIZE),
            )?;
        }
        for i in 0..maps.device_zones.len() {
            self.image.add_element(zone_list_address(i), ZONE_LIST_SIZE)?;
        }

        for i in 0..config.scan_lists.len() {
            self.image.add_element(scan_list_address(i), SCAN_LIST_SIZE)?;
        }

        if !config.radio_ids.is_empty() {
            self.image.add_element(
                RADIO_ID_BASE,
                align64(config.radio_ids.len() * RADIO_ID_SIZE),
            )?;
        }

        self.image.add_element(GPS_SETTINGS, GPS_SETTINGS_SIZE)?;
        self.image.add_element(APRS_SETTINGS, APRS_SETTINGS_SIZE)?;
        self.image.add_element(SETTINGS_BASE, SETTINGS_SIZE)?;
        Ok(())
    }

    fn encode(&mut self, config: &Config) -> Result<()> {
        let maps = EncodeMaps::build(config)?;
        if !config.roaming_zones.is_empty() || !config.roaming_channels.is_empty() {
            warn!("AT-D868UV has no roaming support, dropping roaming data");
        }

        self.clear_bitmaps()?;
        self.encode_radio_ids(config)?;
        self.encode_contacts(config, &maps)?;
        self.encode_group_lists(config, &maps)?;
        self.encode_channels(config, &maps)?;
        self.encode_zones(&maps)?;
        self.encode_scan_lists(config)?;
        self.encode_positioning(config, &maps)?;
        self.encode_settings(config)?;

        self.image.sort();
        debug!(
            "encoded {} channels into {}",
            config.channels.len(),
            self.image
        );
        Ok(())
    }

    fn decode(&self) -> Result<Config> {
        let mut config = Config::new();
        let mut maps = DecodeMaps::default();
        let mut links = PendingLinks::default();

        self.parse_radio_ids(&mut config, &mut maps)?;
        self.parse_contacts(&mut config, &mut maps)?;
        self.parse_group_lists(&mut config, &mut maps, &mut links)?;
        self.parse_channels(&mut config, &mut maps, &mut links)?;
        self.parse_zones(&mut config, &mut links)?;
        self.parse_scan_lists(&mut config, &mut maps, &mut links)?;
        self.parse_positioning(&mut config, &mut maps, &mut links)?;
        self.parse_settings(&mut config, &mut links)?;

        self.link(&mut config, &maps, links);
        debug!("decoded {} channels from {}", config.channels.len(), self.image);
        Ok(config)
    }

    fn image(&self) -> &Image {
        &self.image
    }

    fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn sample_config() -> Config {
        let mut config = Config::new();
        config.settings = Settings {
            version: String::new(),
            intro_line1: "dmrconf".into(),
            intro_line2: "test".into(),
        };
        config.add_radio_id(RadioId::new("DL1XYZ", 2_621_234));

        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Group, "WW", 91)));
        let mut john = DmrContact::new(CallKind::Private, "John", 12_345);
        john.ring = true;
        config.contacts.push(Contact::Dmr(john));

        let mut gl = GroupList::new("World");
        gl.contacts = vec![0];
        config.group_lists.push(gl);

        let mut digital = DigitalChannel::new("R0 Berlin");
        digital.base.rx_frequency = 439_575_000;
        digital.base.tx_frequency = 431_975_000;
        digital.base.power = Power::High;
        digital.base.timeout = 120;
        digital.base.scan_list = Some(0);
        digital.color_code = 1;
        digital.time_slot = TimeSlot::Ts2;
        digital.admit = Admit::ColorCode;
        digital.group_list = Some(0);
        digital.tx_contact = Some(0);
        digital.gps_system = Some(0);
        config.channels.push(Channel::Digital(digital));

        let mut analog = AnalogChannel::new("Simplex");
        analog.base.rx_frequency = 145_500_000;
        analog.base.tx_frequency = 145_500_000;
        analog.rx_tone = SelectiveCall::ctcss(67.0);
        analog.tx_tone = SelectiveCall::dcs(19, true);
        analog.bandwidth = Bandwidth::Wide;
        analog.squelch = 3;
        config.channels.push(Channel::Analog(analog));

        let mut home = Zone::new("Home");
        home.a = vec![0];
        home.b = vec![1];
        config.zones.push(home);
        let mut work = Zone::new("Work");
        work.a = vec![0, 1];
        config.zones.push(work);

        let mut sl = ScanList::new("Scan");
        sl.priority1 = Some(ChannelRef::Selected);
        sl.priority2 = Some(ChannelRef::Channel(1));
        sl.channels = vec![ChannelRef::Channel(0), ChannelRef::Channel(1)];
        config.scan_lists.push(sl);

        let mut gps = GpsSystem::new("GPS 1", 1);
        gps.period = 180;
        gps.revert = Some(0);
        config.positioning.push(PositioningSystem::Gps(gps));

        config
    }

    fn encode_sample() -> (D868uvCodeplug, Config) {
        let config = sample_config();
        let mut cp = D868uvCodeplug::new();
        cp.allocate_for_encoding(&config).unwrap();
        cp.encode(&config).unwrap();
        (cp, config)
    }

    #[test]
    fn test_roundtrip() {
        let (cp, config) = encode_sample();
        let decoded = cp.decode().unwrap();

        assert_eq!(decoded.settings.intro_line1, "dmrconf");
        assert_eq!(decoded.radio_ids, config.radio_ids);
        assert_eq!(decoded.default_radio_id, Some(0));
        assert_eq!(decoded.contacts, config.contacts);
        assert_eq!(decoded.group_lists, config.group_lists);
        assert_eq!(decoded.scan_lists, config.scan_lists);

        assert_eq!(decoded.channels.len(), 2);
        let digital = decoded.channels[0].as_digital().unwrap();
        assert_eq!(digital.base.name, "R0 Berlin");
        assert_eq!(digital.base.rx_frequency, 439_575_000);
        assert_eq!(digital.base.tx_frequency, 431_975_000);
        assert_eq!(digital.base.timeout, 120);
        assert_eq!(digital.base.scan_list, Some(0));
        assert_eq!(digital.time_slot, TimeSlot::Ts2);
        assert_eq!(digital.admit, Admit::ColorCode);
        assert_eq!(digital.tx_contact, Some(0));
        assert_eq!(digital.group_list, Some(0));
        assert_eq!(digital.gps_system, Some(0));
        assert_eq!(digital.radio_id, RadioIdRef::Default);

        let analog = decoded.channels[1].as_analog().unwrap();
        assert_eq!(analog.rx_tone, SelectiveCall::ctcss(67.0));
        assert_eq!(analog.tx_tone, SelectiveCall::dcs(19, true));
        assert_eq!(analog.bandwidth, Bandwidth::Wide);
        assert_eq!(analog.squelch, 3);

        let gps = match &decoded.positioning[0] {
            PositioningSystem::Gps(g) => g,
            _ => panic!("expected GPS system"),
        };
        assert_eq!(gps.destination, 1);
        assert_eq!(gps.revert, Some(0));
        assert_eq!(gps.period, 180);
    }

    #[test]
    fn test_zone_split_and_merge() {
        let (cp, _) = encode_sample();

        // On the wire: "Home A", "Home B", "Work".
        let names: Vec<String> = (0..3)
            .map(|i| decode_ascii(&cp.image().data(zone_name_address(i)).unwrap()[..16], 0x00))
            .collect();
        assert_eq!(names, vec!["Home A", "Home B", "Work"]);

        let decoded = cp.decode().unwrap();
        assert_eq!(decoded.zones.len(), 2);
        assert_eq!(decoded.zones[0].name, "Home");
        assert!(decoded.zones[0].is_split());
        assert_eq!(decoded.zones[0].a, vec![0]);
        assert_eq!(decoded.zones[0].b, vec![1]);
        assert_eq!(decoded.zones[1].name, "Work");
        assert!(!decoded.zones[1].is_split());
    }

    #[test]
    fn test_lone_a_suffix_stays() {
        let mut config = sample_config();
        config.zones.truncate(0);
        let mut z = Zone::new("Odd A");
        z.a = vec![0];
        config.zones.push(z);

        let mut cp = D868uvCodeplug::new();
        cp.allocate_for_encoding(&config).unwrap();
        cp.encode(&config).unwrap();
        let decoded = cp.decode().unwrap();
        assert_eq!(decoded.zones.len(), 1);
        assert_eq!(decoded.zones[0].name, "Odd A");
    }

    #[test]
    fn test_selected_sentinel_encodes_as_zero() {
        let (cp, _) = encode_sample();
        let rec = &cp.image().data(scan_list_address(0)).unwrap()[..SCAN_LIST_SIZE];
        assert_eq!(get_u16(rec, 0x10), 0);
        assert_eq!(get_u16(rec, 0x12), 2);
        assert_eq!(get_u16(rec, 0x20), 1);
        assert_eq!(get_u16(rec, 0x22), 2);
        assert_eq!(get_u16(rec, 0x24), IDX16_NONE);
    }

    #[test]
    fn test_contact_id_map_sorted() {
        let (cp, _) = encode_sample();
        let data = cp.image().data(CONTACT_ID_MAP).unwrap();
        // (91 << 1) | 1 = 183 group call, (12345 << 1) | 0 = 24690.
        assert_eq!(get_u32(data, 0), 183);
        assert_eq!(get_u32(data, 4), 0);
        assert_eq!(get_u32(data, 8), 24_690);
        assert_eq!(get_u32(data, 12), 1);
        assert_eq!(get_u32(data, 16), 0xFFFF_FFFF);
    }

    #[test]
    fn test_image_block_aligned() {
        let (cp, _) = encode_sample();
        assert!(cp.image().check_aligned(64).is_ok());
        assert!(cp.image().check_aligned(16).is_ok());
    }

    #[test]
    fn test_bitmap_regions_disjoint() {
        let mut cp = D868uvCodeplug::new();
        cp.allocate_bitmaps().unwrap();

        let mut regions: Vec<(u32, usize)> = cp
            .image()
            .elements()
            .iter()
            .map(|e| (e.address(), e.len()))
            .collect();
        regions.sort();
        for pair in regions.windows(2) {
            assert!(pair[0].0 as usize + pair[0].1 <= pair[1].0 as usize);
        }
    }

    #[test]
    fn test_capacity_limit() {
        let mut config = sample_config();
        for i in 0..9 {
            config
                .positioning
                .push(PositioningSystem::Gps(GpsSystem::new(format!("G{}", i), 0)));
        }
        let mut cp = D868uvCodeplug::new();
        assert!(matches!(
            cp.allocate_for_encoding(&config),
            Err(CodeplugError::Capacity {
                what: "GPS systems",
                ..
            })
        ));
    }

    #[test]
    fn test_non_dmr_group_member_rejected() {
        let mut config = sample_config();
        config
            .contacts
            .push(Contact::Dtmf(DtmfContact::new("Gate", "1234#")));
        config.group_lists[0].contacts.push(2);

        let mut cp = D868uvCodeplug::new();
        cp.allocate_for_encoding(&config).unwrap();
        assert!(matches!(
            cp.encode(&config),
            Err(CodeplugError::Encode {
                what: "group list",
                ..
            })
        ));
    }

    #[test]
    fn test_dtmf_contacts_survive() {
        let mut config = sample_config();
        config
            .contacts
            .push(Contact::Dtmf(DtmfContact::new("Gate", "1234#")));

        let mut cp = D868uvCodeplug::new();
        cp.allocate_for_encoding(&config).unwrap();
        cp.encode(&config).unwrap();
        let decoded = cp.decode().unwrap();
        assert_eq!(
            decoded.contacts[2],
            Contact::Dtmf(DtmfContact::new("Gate", "1234#"))
        );
    }
}
