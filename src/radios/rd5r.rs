// Radioddity RD-5R codeplug codec
//
// A much smaller device than the AnyTone family: one flat table per
// entity, presence tracked in one-byte-per-record bytemaps, BCD
// frequencies and half-byte BCD tones. The whole codeplug fits in a
// few kilobytes, so the allocators grab each table as one element
// instead of picking records out of bitmaps.
//
// Wire index conventions: contact, group-list, scan-list and zone
// member fields are 1-based with 0 meaning "not set"; scan-list
// channel slots use 0 unset, 1 selected channel, device index + 2
// otherwise. The radio has a single DMR ID, no positioning and no
// roaming; such data is dropped with a warning on encode.

use super::traits::{Codeplug, CodeplugError, Result};
use super::{align64, get_u16, get_u32, put_u16, put_u32};
use crate::codec::{
    dcs_from_octal, dcs_to_octal, decode_ascii, decode_dmr_id, decode_frequency, encode_ascii,
    encode_dmr_id, encode_frequency, SelectiveCall,
};
use crate::config::{
    Admit, AnalogChannel, Bandwidth, CallKind, Channel, ChannelRef, Config, Contact,
    DigitalChannel, DmrContact, GroupList, Power, RadioId, RadioIdRef, ScanList, TimeSlot, Zone,
};
use crate::image::Image;
use std::collections::HashMap;
use tracing::{debug, warn};

const SETTINGS_BASE: u32 = 0x0000_0080;
const SETTINGS_SIZE: usize = 0x40;

const NUM_CHANNELS: usize = 128;
const CHANNEL_SIZE: usize = 56;
const CHANNEL_BYTEMAP: u32 = 0x0000_3700;
const CHANNEL_BYTEMAP_SIZE: usize = 0x80;
const CHANNEL_BASE: u32 = 0x0000_3780;

const NUM_CONTACTS: usize = 256;
const CONTACT_SIZE: usize = 24;
const CONTACT_BYTEMAP: u32 = 0x0001_7500;
const CONTACT_BYTEMAP_SIZE: usize = 0x100;
const CONTACT_BASE: u32 = 0x0001_7600;

const NUM_ZONES: usize = 250;
const ZONE_SIZE: usize = 48;
const ZONE_MEMBERS: usize = 16;
const ZONE_BYTEMAP: u32 = 0x0000_7F00;
const ZONE_BYTEMAP_SIZE: usize = 0x100;
const ZONE_BASE: u32 = 0x0000_8000;

const NUM_GROUP_LISTS: usize = 64;
const GROUP_LIST_SIZE: usize = 48;
const GROUP_LIST_MEMBERS: usize = 16;
const GROUP_LIST_BYTEMAP: u32 = 0x0001_D580;
const GROUP_LIST_BYTEMAP_SIZE: usize = 0x40;
const GROUP_LIST_BASE: u32 = 0x0001_D600;

const NUM_SCAN_LISTS: usize = 250;
const SCAN_LIST_SIZE: usize = 88;
const SCAN_LIST_MEMBERS: usize = 32;
const SCAN_LIST_BYTEMAP: u32 = 0x0001_FF00;
const SCAN_LIST_BYTEMAP_SIZE: usize = 0x100;
const SCAN_LIST_BASE: u32 = 0x0002_0000;

const TONE_NONE: u16 = 0xFFFF;
const TONE_DCS: u16 = 0x8000;
const TONE_DCS_INVERTED: u16 = 0x4000;

fn capacity(what: &'static str, count: usize, limit: usize) -> Result<()> {
    if count > limit {
        return Err(CodeplugError::Capacity { what, count, limit });
    }
    Ok(())
}

fn to_bcd4(value: u16) -> u16 {
    ((value / 1000) % 10) << 12
        | ((value / 100) % 10) << 8
        | ((value / 10) % 10) << 4
        | (value % 10)
}

fn from_bcd4(bcd: u16) -> Option<u16> {
    let mut value = 0u16;
    for shift in [12u16, 8, 4, 0] {
        let nibble = (bcd >> shift) & 0xF;
        if nibble > 9 {
            return None;
        }
        value = value * 10 + nibble;
    }
    Some(value)
}

/// Half-byte BCD tone field: CTCSS deci-Hz as four BCD nibbles
/// (67.0 Hz is 0x0670), DCS as the BCD octal code with the 0x8000
/// flag (0x4000 adds inversion), 0xFFFF for no tone.
fn encode_tone(tone: &SelectiveCall) -> u16 {
    match *tone {
        SelectiveCall::None => TONE_NONE,
        SelectiveCall::Ctcss(dhz) => to_bcd4(dhz),
        SelectiveCall::Dcs { code, inverted } => {
            let mut value = TONE_DCS | to_bcd4(dcs_to_octal(code));
            if inverted {
                value |= TONE_DCS_INVERTED;
            }
            value
        }
    }
}

fn decode_tone(value: u16) -> SelectiveCall {
    if value == TONE_NONE {
        return SelectiveCall::None;
    }
    if value & TONE_DCS != 0 {
        let inverted = value & TONE_DCS_INVERTED != 0;
        let octal = match from_bcd4(value & 0x0FFF) {
            Some(o) => o,
            None => return SelectiveCall::None,
        };
        return match dcs_from_octal(octal) {
            Ok(code) => SelectiveCall::dcs(code, inverted),
            Err(_) => SelectiveCall::None,
        };
    }
    match from_bcd4(value) {
        Some(dhz) => SelectiveCall::Ctcss(dhz),
        None => SelectiveCall::None,
    }
}

fn channel_address(index: usize) -> u32 {
    CHANNEL_BASE + (index * CHANNEL_SIZE) as u32
}

fn contact_address(index: usize) -> u32 {
    CONTACT_BASE + (index * CONTACT_SIZE) as u32
}

fn zone_address(index: usize) -> u32 {
    ZONE_BASE + (index * ZONE_SIZE) as u32
}

fn group_list_address(index: usize) -> u32 {
    GROUP_LIST_BASE + (index * GROUP_LIST_SIZE) as u32
}

fn scan_list_address(index: usize) -> u32 {
    SCAN_LIST_BASE + (index * SCAN_LIST_SIZE) as u32
}

/// Scan-list slot encoding: 0 unset, 1 selected, index + 2 otherwise.
fn encode_scan_slot(r: Option<ChannelRef>) -> u16 {
    match r {
        None => 0,
        Some(ChannelRef::Selected) => 1,
        Some(ChannelRef::Channel(i)) => i as u16 + 2,
    }
}

pub struct Rd5rCodeplug {
    image: Image,
}

impl Rd5rCodeplug {
    pub fn new() -> Self {
        Self {
            image: Image::new("RD-5R"),
        }
    }

    fn mark(&mut self, bytemap: u32, index: usize) -> Result<()> {
        self.image.data_mut(bytemap)?[index] = 1;
        Ok(())
    }

    fn present(&self, bytemap: u32, limit: usize) -> Result<Vec<usize>> {
        let map = self.image.data(bytemap)?;
        Ok((0..limit).filter(|&i| map[i] != 0).collect())
    }

    /// Reset every bytemap. An upload reads the device's bytemaps
    /// first, so records the new configuration no longer has must be
    /// cleared before encoding marks its own.
    fn clear_bytemaps(&mut self) -> Result<()> {
        for bytemap in [
            CHANNEL_BYTEMAP,
            CONTACT_BYTEMAP,
            ZONE_BYTEMAP,
            GROUP_LIST_BYTEMAP,
            SCAN_LIST_BYTEMAP,
        ] {
            self.image.data_mut(bytemap)?.fill(0);
        }
        Ok(())
    }

    /// Slot -> device index for DMR contacts; DTMF contacts are not
    /// representable on this radio.
    fn dmr_contact_map(config: &Config) -> Result<HashMap<usize, u16>> {
        let mut map = HashMap::new();
        let mut dev = 0u16;
        let mut dropped = 0usize;
        for (slot, contact) in config.contacts.iter().enumerate() {
            match contact {
                Contact::Dmr(_) => {
                    map.insert(slot, dev);
                    dev += 1;
                }
                Contact::Dtmf(_) => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!("RD-5R has no DTMF contacts, dropping {}", dropped);
        }
        capacity("contacts", dev as usize, NUM_CONTACTS)?;
        Ok(map)
    }

    fn device_zones(config: &Config) -> Result<Vec<(String, Vec<usize>)>> {
        let mut zones = Vec::new();
        for zone in &config.zones {
            if zone.is_split() {
                zones.push((format!("{} A", zone.name), zone.a.clone()));
                zones.push((format!("{} B", zone.name), zone.b.clone()));
            } else {
                zones.push((zone.name.clone(), zone.a.clone()));
            }
        }
        capacity("zones", zones.len(), NUM_ZONES)?;
        for (name, members) in &zones {
            if members.len() > ZONE_MEMBERS {
                return Err(CodeplugError::Encode {
                    what: "zone",
                    name: name.clone(),
                    message: format!(
                        "{} channels, device zones hold {}",
                        members.len(),
                        ZONE_MEMBERS
                    ),
                });
            }
        }
        Ok(zones)
    }

    fn encode_settings(&mut self, config: &Config) -> Result<()> {
        let rid = config.default_radio_id().cloned();
        if config.radio_ids.len() > 1 {
            warn!(
                "RD-5R stores a single DMR ID, keeping only '{}'",
                rid.as_ref().map(|r| r.name.as_str()).unwrap_or("")
            );
        }
        let rec = self.image.data_mut(SETTINGS_BASE)?;
        let rid = rid.unwrap_or_else(|| RadioId::new("", 0));
        rec[0x00..0x08].copy_from_slice(&encode_ascii(&rid.name, 8, 0x00));
        rec[0x08..0x0c].copy_from_slice(&encode_dmr_id(rid.id));
        rec[0x10..0x20].copy_from_slice(&encode_ascii(&config.settings.intro_line1, 16, 0x00));
        rec[0x20..0x30].copy_from_slice(&encode_ascii(&config.settings.intro_line2, 16, 0x00));
        Ok(())
    }

    fn encode_contacts(&mut self, config: &Config, dmr: &HashMap<usize, u16>) -> Result<()> {
        for (slot, contact) in config.contacts.iter().enumerate() {
            let Contact::Dmr(c) = contact else {
                continue;
            };
            let dev = dmr[&slot] as usize;
            self.mark(CONTACT_BYTEMAP, dev)?;
            let rec = &mut self.image.data_mut(contact_address(dev))?[..CONTACT_SIZE];
            rec[0x00..0x10].copy_from_slice(&encode_ascii(&c.name, 16, 0x00));
            rec[0x10..0x14].copy_from_slice(&encode_dmr_id(c.id));
            rec[0x14] = match c.kind {
                CallKind::Private => 0,
                CallKind::Group => 1,
                CallKind::All => 2,
            };
            rec[0x15] = c.ring as u8;
        }
        Ok(())
    }

    fn encode_group_lists(&mut self, config: &Config, dmr: &HashMap<usize, u16>) -> Result<()> {
        for (i, gl) in config.group_lists.iter().enumerate() {
            capacity("group list members", gl.contacts.len(), GROUP_LIST_MEMBERS)?;
            self.mark(GROUP_LIST_BYTEMAP, i)?;
            let mut members = Vec::with_capacity(gl.contacts.len());
            for &slot in &gl.contacts {
                let dev = dmr.get(&slot).copied().ok_or_else(|| CodeplugError::Encode {
                    what: "group list",
                    name: gl.name.clone(),
                    message: format!("member {} is not a DMR contact", slot),
                })?;
                members.push(dev);
            }
            let rec = &mut self.image.data_mut(group_list_address(i))?[..GROUP_LIST_SIZE];
            rec[0x00..0x10].copy_from_slice(&encode_ascii(&gl.name, 16, 0x00));
            for m in 0..GROUP_LIST_MEMBERS {
                let value = members.get(m).map(|&d| d + 1).unwrap_or(0);
                put_u16(rec, 0x10 + m * 2, value);
            }
        }
        Ok(())
    }

    fn encode_channels(&mut self, config: &Config, dmr: &HashMap<usize, u16>) -> Result<()> {
        if config
            .channels
            .iter()
            .any(|c| matches!(c, Channel::Digital(d) if d.gps_system.is_some() || d.roaming.is_some()))
            || !config.positioning.is_empty()
        {
            warn!("RD-5R has no positioning or roaming support, dropping");
        }

        for (i, channel) in config.channels.iter().enumerate() {
            self.mark(CHANNEL_BYTEMAP, i)?;
            let base = channel.base();
            let rec = &mut self.image.data_mut(channel_address(i))?[..CHANNEL_SIZE];

            rec[0x00..0x10].copy_from_slice(&encode_ascii(&base.name, 16, 0x00));
            put_u32(rec, 0x10, encode_frequency(base.rx_frequency));
            put_u32(rec, 0x14, encode_frequency(base.tx_frequency));
            rec[0x19] = base.power as u8;
            rec[0x1b] = base.rx_only as u8;
            rec[0x29] = base.scan_list.map(|s| s as u8 + 1).unwrap_or(0);
            // Transmit timeout is stored in 15 second steps.
            rec[0x2a] = base.timeout.div_ceil(15).min(255) as u8;

            match channel {
                Channel::Analog(c) => {
                    rec[0x18] = 0;
                    rec[0x1a] = (c.bandwidth == Bandwidth::Wide) as u8;
                    put_u16(rec, 0x1c, encode_tone(&c.rx_tone));
                    put_u16(rec, 0x20, encode_tone(&c.tx_tone));
                    rec[0x22] = c.squelch;
                    rec[0x24] = 1;
                }
                Channel::Digital(c) => {
                    rec[0x18] = 1;
                    put_u16(rec, 0x1c, TONE_NONE);
                    put_u16(rec, 0x20, TONE_NONE);
                    rec[0x23] = c.color_code;
                    rec[0x24] = c.time_slot.number();
                    rec[0x25] = match c.admit {
                        Admit::Always => 0,
                        Admit::ChannelFree => 1,
                        Admit::ColorCode => 2,
                    };
                    let contact = match c.tx_contact {
                        Some(slot) => {
                            dmr.get(&slot).copied().ok_or_else(|| CodeplugError::Encode {
                                what: "channel",
                                name: base.name.clone(),
                                message: format!("TX contact {} is not a DMR contact", slot),
                            })? + 1
                        }
                        None => 0,
                    };
                    put_u16(rec, 0x26, contact);
                    rec[0x28] = c.group_list.map(|g| g as u8 + 1).unwrap_or(0);
                }
            }
        }
        Ok(())
    }

    fn encode_zones(&mut self, zones: &[(String, Vec<usize>)]) -> Result<()> {
        for (i, (name, members)) in zones.iter().enumerate() {
            self.mark(ZONE_BYTEMAP, i)?;
            let rec = &mut self.image.data_mut(zone_address(i))?[..ZONE_SIZE];
            rec[0x00..0x10].copy_from_slice(&encode_ascii(name, 16, 0x00));
            for m in 0..ZONE_MEMBERS {
                let value = members.get(m).map(|&c| c as u16 + 1).unwrap_or(0);
                put_u16(rec, 0x10 + m * 2, value);
            }
        }
        Ok(())
    }

    fn encode_scan_lists(&mut self, config: &Config) -> Result<()> {
        for (i, sl) in config.scan_lists.iter().enumerate() {
            capacity("scan list members", sl.channels.len(), SCAN_LIST_MEMBERS)?;
            self.mark(SCAN_LIST_BYTEMAP, i)?;
            let rec = &mut self.image.data_mut(scan_list_address(i))?[..SCAN_LIST_SIZE];
            rec[0x00..0x10].copy_from_slice(&encode_ascii(&sl.name, 16, 0x00));
            for m in 0..SCAN_LIST_MEMBERS {
                let value = encode_scan_slot(sl.channels.get(m).copied());
                put_u16(rec, 0x10 + m * 2, value);
            }
            put_u16(rec, 0x50, encode_scan_slot(sl.priority1));
            put_u16(rec, 0x52, encode_scan_slot(sl.priority2));
            put_u16(rec, 0x54, encode_scan_slot(sl.revert));
        }
        Ok(())
    }

    fn decode_scan_slot(
        value: u16,
        channels: &HashMap<usize, usize>,
    ) -> Option<ChannelRef> {
        match value {
            0 => None,
            1 => Some(ChannelRef::Selected),
            v => channels
                .get(&(v as usize - 2))
                .map(|&s| ChannelRef::Channel(s)),
        }
    }
}

impl Default for Rd5rCodeplug {
    fn default() -> Self {
        Self::new()
    }
}

impl Codeplug for Rd5rCodeplug {
    fn model(&self) -> &'static str {
        "RD-5R"
    }

    fn allocate_bitmaps(&mut self) -> Result<()> {
        self.image.add_element(CHANNEL_BYTEMAP, CHANNEL_BYTEMAP_SIZE)?;
        self.image.add_element(CONTACT_BYTEMAP, CONTACT_BYTEMAP_SIZE)?;
        self.image.add_element(ZONE_BYTEMAP, ZONE_BYTEMAP_SIZE)?;
        self.image
            .add_element(GROUP_LIST_BYTEMAP, GROUP_LIST_BYTEMAP_SIZE)?;
        self.image
            .add_element(SCAN_LIST_BYTEMAP, SCAN_LIST_BYTEMAP_SIZE)?;
        Ok(())
    }

    fn allocate_for_decoding(&mut self) -> Result<()> {
        // Flat tables: the whole codeplug is a few kilobytes, so every
        // table is read in full and the bytemaps only gate records.
        self.image.add_element(SETTINGS_BASE, SETTINGS_SIZE)?;
        self.image
            .add_element(CHANNEL_BASE, align64(NUM_CHANNELS * CHANNEL_SIZE))?;
        self.image
            .add_element(CONTACT_BASE, align64(NUM_CONTACTS * CONTACT_SIZE))?;
        self.image
            .add_element(ZONE_BASE, align64(NUM_ZONES * ZONE_SIZE))?;
        self.image
            .add_element(GROUP_LIST_BASE, align64(NUM_GROUP_LISTS * GROUP_LIST_SIZE))?;
        self.image
            .add_element(SCAN_LIST_BASE, align64(NUM_SCAN_LISTS * SCAN_LIST_SIZE))?;
        Ok(())
    }

    fn allocate_updated(&mut self) -> Result<()> {
        self.image.add_element(SETTINGS_BASE, SETTINGS_SIZE)?;
        Ok(())
    }

    fn allocate_for_encoding(&mut self, config: &Config) -> Result<()> {
        capacity("channels", config.channels.len(), NUM_CHANNELS)?;
        capacity("group lists", config.group_lists.len(), NUM_GROUP_LISTS)?;
        capacity("scan lists", config.scan_lists.len(), NUM_SCAN_LISTS)?;
        Self::dmr_contact_map(config)?;
        Self::device_zones(config)?;

        self.allocate_bitmaps()?;
        self.allocate_for_decoding()
    }

    fn encode(&mut self, config: &Config) -> Result<()> {
        let dmr = Self::dmr_contact_map(config)?;
        let zones = Self::device_zones(config)?;
        capacity("channels", config.channels.len(), NUM_CHANNELS)?;
        capacity("group lists", config.group_lists.len(), NUM_GROUP_LISTS)?;
        capacity("scan lists", config.scan_lists.len(), NUM_SCAN_LISTS)?;

        self.clear_bytemaps()?;
        self.encode_settings(config)?;
        self.encode_contacts(config, &dmr)?;
        self.encode_group_lists(config, &dmr)?;
        self.encode_channels(config, &dmr)?;
        self.encode_zones(&zones)?;
        self.encode_scan_lists(config)?;

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

        // Parse pass: entities in device order, remembering the device
        // index of each slot for the link pass below.
        let rec = self.image.data(SETTINGS_BASE)?;
        let name = decode_ascii(&rec[0x00..0x08], 0x00);
        let id = decode_dmr_id(&[rec[0x08], rec[0x09], rec[0x0a], rec[0x0b]]).map_err(|e| {
            CodeplugError::Decode {
                what: "radio ID",
                index: 0,
                message: e.to_string(),
            }
        })?;
        if !name.is_empty() || id != 0 {
            config.add_radio_id(RadioId::new(name, id));
        }
        config.settings.intro_line1 = decode_ascii(&rec[0x10..0x20], 0x00);
        config.settings.intro_line2 = decode_ascii(&rec[0x20..0x30], 0x00);

        let mut contacts: HashMap<usize, usize> = HashMap::new();
        for dev in self.present(CONTACT_BYTEMAP, NUM_CONTACTS)? {
            let rec = &self.image.data(contact_address(dev))?[..CONTACT_SIZE];
            let name = decode_ascii(&rec[0x00..0x10], 0x00);
            let id = decode_dmr_id(&[rec[0x10], rec[0x11], rec[0x12], rec[0x13]]).map_err(
                |e| CodeplugError::Decode {
                    what: "contact",
                    index: dev,
                    message: e.to_string(),
                },
            )?;
            let kind = match rec[0x14] {
                1 => CallKind::Group,
                2 => CallKind::All,
                _ => CallKind::Private,
            };
            let mut contact = DmrContact::new(kind, name, id);
            contact.ring = rec[0x15] != 0;
            contacts.insert(dev, config.contacts.len());
            config.contacts.push(Contact::Dmr(contact));
        }

        let mut group_lists: HashMap<usize, usize> = HashMap::new();
        let mut group_links: Vec<(usize, Vec<u16>)> = Vec::new();
        for dev in self.present(GROUP_LIST_BYTEMAP, NUM_GROUP_LISTS)? {
            let rec = &self.image.data(group_list_address(dev))?[..GROUP_LIST_SIZE];
            let name = decode_ascii(&rec[0x00..0x10], 0x00);
            let members: Vec<u16> = (0..GROUP_LIST_MEMBERS)
                .map(|m| get_u16(rec, 0x10 + m * 2))
                .take_while(|&v| v != 0)
                .collect();
            let slot = config.group_lists.len();
            group_lists.insert(dev, slot);
            config.group_lists.push(GroupList::new(name));
            group_links.push((slot, members));
        }

        let mut channels: HashMap<usize, usize> = HashMap::new();
        let mut channel_links: Vec<(usize, bool, u16, u8, u8)> = Vec::new();
        for dev in self.present(CHANNEL_BYTEMAP, NUM_CHANNELS)? {
            let rec = &self.image.data(channel_address(dev))?[..CHANNEL_SIZE];
            let name = decode_ascii(&rec[0x00..0x10], 0x00);
            let digital = rec[0x18] == 1;

            let mut channel = if digital {
                let mut c = DigitalChannel::new(name);
                c.color_code = rec[0x23];
                c.time_slot = TimeSlot::from_number(rec[0x24]).unwrap_or_default();
                c.admit = match rec[0x25] {
                    1 => Admit::ChannelFree,
                    2 => Admit::ColorCode,
                    _ => Admit::Always,
                };
                Channel::Digital(c)
            } else {
                let mut c = AnalogChannel::new(name);
                c.bandwidth = if rec[0x1a] != 0 {
                    Bandwidth::Wide
                } else {
                    Bandwidth::Narrow
                };
                c.rx_tone = decode_tone(get_u16(rec, 0x1c));
                c.tx_tone = decode_tone(get_u16(rec, 0x20));
                c.squelch = rec[0x22];
                Channel::Analog(c)
            };

            let base = channel.base_mut();
            base.rx_frequency =
                decode_frequency(get_u32(rec, 0x10)).map_err(|e| CodeplugError::Decode {
                    what: "channel",
                    index: dev,
                    message: e.to_string(),
                })?;
            base.tx_frequency =
                decode_frequency(get_u32(rec, 0x14)).map_err(|e| CodeplugError::Decode {
                    what: "channel",
                    index: dev,
                    message: e.to_string(),
                })?;
            base.power = match rec[0x19] {
                0 => Power::Min,
                1 => Power::Low,
                2 => Power::Mid,
                4 => Power::Max,
                _ => Power::High,
            };
            base.rx_only = rec[0x1b] != 0;
            base.timeout = rec[0x2a] as u32 * 15;

            let slot = config.channels.len();
            channels.insert(dev, slot);
            config.channels.push(channel);
            channel_links.push((slot, digital, get_u16(rec, 0x26), rec[0x28], rec[0x29]));
        }

        let mut device_zones: Vec<(String, Vec<u16>)> = Vec::new();
        for dev in self.present(ZONE_BYTEMAP, NUM_ZONES)? {
            let rec = &self.image.data(zone_address(dev))?[..ZONE_SIZE];
            let name = decode_ascii(&rec[0x00..0x10], 0x00);
            let members: Vec<u16> = (0..ZONE_MEMBERS)
                .map(|m| get_u16(rec, 0x10 + m * 2))
                .take_while(|&v| v != 0)
                .collect();
            device_zones.push((name, members));
        }

        let mut scan_map: HashMap<usize, usize> = HashMap::new();
        let mut scan_lists: Vec<(usize, u16, u16, u16, Vec<u16>)> = Vec::new();
        for dev in self.present(SCAN_LIST_BYTEMAP, NUM_SCAN_LISTS)? {
            let rec = &self.image.data(scan_list_address(dev))?[..SCAN_LIST_SIZE];
            let name = decode_ascii(&rec[0x00..0x10], 0x00);
            let members: Vec<u16> = (0..SCAN_LIST_MEMBERS)
                .map(|m| get_u16(rec, 0x10 + m * 2))
                .take_while(|&v| v != 0)
                .collect();
            let slot = config.scan_lists.len();
            scan_map.insert(dev, slot);
            config.scan_lists.push(ScanList::new(name));
            scan_lists.push((
                slot,
                get_u16(rec, 0x50),
                get_u16(rec, 0x52),
                get_u16(rec, 0x54),
                members,
            ));
        }

        // Link pass.
        for (slot, digital, contact, group_list, scan_list) in channel_links {
            let scan = if scan_list == 0 {
                None
            } else {
                scan_map.get(&(scan_list as usize - 1)).copied()
            };
            config.channels[slot].base_mut().scan_list = scan;
            if digital {
                let tx_contact = if contact == 0 {
                    None
                } else {
                    contacts.get(&(contact as usize - 1)).copied()
                };
                let gl = if group_list == 0 {
                    None
                } else {
                    group_lists.get(&(group_list as usize - 1)).copied()
                };
                if let Channel::Digital(c) = &mut config.channels[slot] {
                    c.tx_contact = tx_contact;
                    c.group_list = gl;
                    c.radio_id = RadioIdRef::Default;
                }
            }
        }

        for (slot, members) in group_links {
            config.group_lists[slot].contacts = members
                .iter()
                .filter_map(|&m| contacts.get(&(m as usize - 1)).copied())
                .collect();
        }

        // Re-join zones split into " A"/" B" pairs on encode.
        let mut iter = device_zones.into_iter().peekable();
        while let Some((name, a)) = iter.next() {
            if let Some(base) = name.strip_suffix(" A") {
                let matches_b = iter
                    .peek()
                    .map(|(next, _)| next.strip_suffix(" B") == Some(base))
                    .unwrap_or(false);
                if matches_b {
                    let (_, b) = iter.next().unwrap_or_default();
                    let mut zone = Zone::new(base);
                    zone.a = a
                        .iter()
                        .filter_map(|&m| channels.get(&(m as usize - 1)).copied())
                        .collect();
                    zone.b = b
                        .iter()
                        .filter_map(|&m| channels.get(&(m as usize - 1)).copied())
                        .collect();
                    config.zones.push(zone);
                    continue;
                }
            }
            let mut zone = Zone::new(name);
            zone.a = a
                .iter()
                .filter_map(|&m| channels.get(&(m as usize - 1)).copied())
                .collect();
            config.zones.push(zone);
        }

        for (slot, pri1, pri2, revert, members) in scan_lists {
            let sl = &mut config.scan_lists[slot];
            sl.priority1 = Self::decode_scan_slot(pri1, &channels);
            sl.priority2 = Self::decode_scan_slot(pri2, &channels);
            sl.revert = Self::decode_scan_slot(revert, &channels);
            sl.channels = members
                .iter()
                .filter_map(|&m| Self::decode_scan_slot(m, &channels))
                .collect();
        }

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

    fn sample_config() -> Config {
        let mut config = Config::new();
        config.settings.intro_line1 = "hello".into();
        config.add_radio_id(RadioId::new("DL1XYZ", 2_621_234));

        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Group, "WW", 91)));
        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Private, "John", 12_345)));

        let mut gl = GroupList::new("World");
        gl.contacts = vec![0];
        config.group_lists.push(gl);

        let mut digital = DigitalChannel::new("R0 Berlin");
        digital.base.rx_frequency = 439_575_000;
        digital.base.tx_frequency = 431_975_000;
        digital.base.timeout = 120;
        digital.base.scan_list = Some(0);
        digital.time_slot = TimeSlot::Ts2;
        digital.admit = Admit::ColorCode;
        digital.group_list = Some(0);
        digital.tx_contact = Some(0);
        config.channels.push(Channel::Digital(digital));

        let mut analog = AnalogChannel::new("Simplex");
        analog.base.rx_frequency = 145_500_000;
        analog.base.tx_frequency = 145_500_000;
        analog.rx_tone = SelectiveCall::ctcss(67.0);
        analog.tx_tone = SelectiveCall::dcs(19, false);
        analog.bandwidth = Bandwidth::Wide;
        config.channels.push(Channel::Analog(analog));

        let mut home = Zone::new("Home");
        home.a = vec![0];
        home.b = vec![1];
        config.zones.push(home);

        let mut sl = ScanList::new("Scan");
        sl.priority1 = Some(ChannelRef::Selected);
        sl.channels = vec![ChannelRef::Channel(0), ChannelRef::Channel(1)];
        config.scan_lists.push(sl);

        config
    }

    fn encode_sample() -> (Rd5rCodeplug, Config) {
        let config = sample_config();
        let mut cp = Rd5rCodeplug::new();
        cp.allocate_for_encoding(&config).unwrap();
        cp.encode(&config).unwrap();
        (cp, config)
    }

    #[test]
    fn test_roundtrip() {
        let (cp, config) = encode_sample();
        let decoded = cp.decode().unwrap();

        assert_eq!(decoded.radio_ids, config.radio_ids);
        assert_eq!(decoded.contacts, config.contacts);
        assert_eq!(decoded.group_lists, config.group_lists);
        assert_eq!(decoded.settings.intro_line1, "hello");

        let digital = decoded.channels[0].as_digital().unwrap();
        assert_eq!(digital.base.rx_frequency, 439_575_000);
        assert_eq!(digital.base.tx_frequency, 431_975_000);
        assert_eq!(digital.base.timeout, 120);
        assert_eq!(digital.base.scan_list, Some(0));
        assert_eq!(digital.time_slot, TimeSlot::Ts2);
        assert_eq!(digital.tx_contact, Some(0));
        assert_eq!(digital.group_list, Some(0));

        let analog = decoded.channels[1].as_analog().unwrap();
        assert_eq!(analog.rx_tone, SelectiveCall::ctcss(67.0));
        assert_eq!(analog.tx_tone, SelectiveCall::dcs(19, false));

        assert_eq!(decoded.zones.len(), 1);
        assert_eq!(decoded.zones[0].name, "Home");
        assert_eq!(decoded.zones[0].a, vec![0]);
        assert_eq!(decoded.zones[0].b, vec![1]);

        assert_eq!(decoded.scan_lists[0].priority1, Some(ChannelRef::Selected));
        assert_eq!(
            decoded.scan_lists[0].channels,
            vec![ChannelRef::Channel(0), ChannelRef::Channel(1)]
        );
    }

    #[test]
    fn test_half_byte_bcd_tones() {
        assert_eq!(encode_tone(&SelectiveCall::ctcss(67.0)), 0x0670);
        assert_eq!(encode_tone(&SelectiveCall::ctcss(123.0)), 0x1230);
        assert_eq!(decode_tone(0x0670), SelectiveCall::ctcss(67.0));
        assert_eq!(encode_tone(&SelectiveCall::None), TONE_NONE);

        // DCS 023 is code 19; inverted sets the 0x4000 flag.
        assert_eq!(
            encode_tone(&SelectiveCall::dcs(19, false)),
            TONE_DCS | 0x0023
        );
        assert_eq!(
            decode_tone(TONE_DCS | TONE_DCS_INVERTED | 0x0023),
            SelectiveCall::dcs(19, true)
        );
        // Bad nibble falls back to no tone.
        assert_eq!(decode_tone(0x0A70), SelectiveCall::None);
    }

    #[test]
    fn test_timeout_steps() {
        let mut config = sample_config();
        config.channels[0].base_mut().timeout = 100;
        let mut cp = Rd5rCodeplug::new();
        cp.allocate_for_encoding(&config).unwrap();
        cp.encode(&config).unwrap();
        // 100 s rounds up to the next 15 s step.
        assert_eq!(cp.decode().unwrap().channels[0].base().timeout, 105);
    }

    #[test]
    fn test_channel_capacity() {
        let mut config = sample_config();
        for i in 0..127 {
            let mut c = AnalogChannel::new(format!("C{}", i));
            c.base.rx_frequency = 145_000_000;
            c.base.tx_frequency = 145_000_000;
            config.channels.push(Channel::Analog(c));
        }
        let mut cp = Rd5rCodeplug::new();
        assert!(matches!(
            cp.allocate_for_encoding(&config),
            Err(CodeplugError::Capacity {
                what: "channels",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_zone_rejected() {
        let mut config = sample_config();
        config.zones[0].b.clear();
        config.zones[0].a = (0..17).map(|_| 0).collect();
        let mut cp = Rd5rCodeplug::new();
        assert!(matches!(
            cp.allocate_for_encoding(&config),
            Err(CodeplugError::Encode { what: "zone", .. })
        ));
    }

    #[test]
    fn test_image_block_aligned() {
        let (cp, _) = encode_sample();
        assert!(cp.image().check_aligned(64).is_ok());
    }
}
