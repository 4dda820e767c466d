// Config -> document writer
//
// Emits a document the reader maps back onto an equal `Config`. Slot
// indices become generated IDs (`ch3`, `cont1`, ...); scalar fields are
// written out explicitly so the round trip does not depend on reader
// defaults. Dangling slot indices are an error here, not a finding:
// callers verify before writing.

use super::{ConfigCodecError, Result};
use crate::codec::tone::SelectiveCall;
use crate::config::{
    Channel, ChannelBase, ChannelRef, Config, Contact, PositioningSystem, RadioIdRef, RoamingRef,
};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Number, Value};

/// Write a configuration as a document string.
pub fn write_config(config: &Config) -> Result<String> {
    let mut doc = Mapping::new();
    put(&mut doc, "version", Value::String(config.settings.version.clone()));
    if !config.settings.intro_line1.is_empty() {
        put(&mut doc, "intro-line1", Value::String(config.settings.intro_line1.clone()));
    }
    if !config.settings.intro_line2.is_empty() {
        put(&mut doc, "intro-line2", Value::String(config.settings.intro_line2.clone()));
    }

    put_list(&mut doc, "radio-ids", write_radio_ids(config));
    put_list(&mut doc, "contacts", write_contacts(config));
    put_list(&mut doc, "group-lists", write_group_lists(config)?);
    put_list(&mut doc, "channels", write_channels(config)?);
    put_list(&mut doc, "zones", write_zones(config)?);
    put_list(&mut doc, "scan-lists", write_scan_lists(config)?);
    put_list(&mut doc, "positioning", write_positioning(config)?);
    put_list(&mut doc, "roaming-channels", write_roaming_channels(config));
    put_list(&mut doc, "roaming", write_roaming_zones(config)?);

    Ok(serde_yaml::to_string(&Value::Mapping(doc))?)
}

// Generated IDs, index-stable so references stay valid across the
// round trip.

fn radio_id_id(i: usize) -> String {
    format!("id{}", i + 1)
}

fn contact_id(i: usize) -> String {
    format!("cont{}", i + 1)
}

fn group_list_id(i: usize) -> String {
    format!("grp{}", i + 1)
}

fn channel_id(i: usize) -> String {
    format!("ch{}", i + 1)
}

fn zone_id(i: usize) -> String {
    format!("zone{}", i + 1)
}

fn scan_list_id(i: usize) -> String {
    format!("scan{}", i + 1)
}

fn positioning_id(i: usize) -> String {
    format!("pos{}", i + 1)
}

fn roaming_channel_id(i: usize) -> String {
    format!("rch{}", i + 1)
}

fn roaming_zone_id(i: usize) -> String {
    format!("roam{}", i + 1)
}

// -- value builders ---------------------------------------------------------

fn put(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::String(key.to_string()), value);
}

fn put_list(map: &mut Mapping, key: &str, items: Vec<Value>) {
    if !items.is_empty() {
        put(map, key, Value::Sequence(items));
    }
}

fn put_str(map: &mut Mapping, key: &str, s: &str) {
    put(map, key, Value::String(s.to_string()));
}

fn put_u64(map: &mut Mapping, key: &str, n: u64) {
    put(map, key, Value::Number(Number::from(n)));
}

fn put_bool(map: &mut Mapping, key: &str, b: bool) {
    put(map, key, Value::Bool(b));
}

fn mhz(hz: u64) -> Value {
    Value::Number(Number::from(hz as f64 / 1e6))
}

fn tagged(tag: &str) -> Value {
    Value::Tagged(Box::new(TaggedValue {
        tag: Tag::new(tag),
        value: Value::Null,
    }))
}

fn tone(value: &SelectiveCall) -> Value {
    match value {
        SelectiveCall::None => Value::Null,
        SelectiveCall::Ctcss(dhz) => Value::Number(Number::from(*dhz as f64 / 10.0)),
        SelectiveCall::Dcs { .. } => Value::String(value.to_string()),
    }
}

fn dangling(location: String, what: &'static str, index: usize) -> ConfigCodecError {
    ConfigCodecError::parse(location, what, format!("slot {} does not exist", index))
}

/// The generated ID for a slot index, checked against the collection
/// size so a broken reference fails loudly instead of emitting a
/// dangling identifier.
fn slot_ref(
    len: usize,
    make: fn(usize) -> String,
    index: usize,
    location: &str,
    what: &'static str,
) -> Result<Value> {
    if index >= len {
        return Err(dangling(location.to_string(), what, index));
    }
    Ok(Value::String(make(index)))
}

// -- sections ---------------------------------------------------------------

fn write_radio_ids(config: &Config) -> Vec<Value> {
    config
        .radio_ids
        .iter()
        .enumerate()
        .map(|(i, rid)| {
            let mut map = Mapping::new();
            put_str(&mut map, "id", &radio_id_id(i));
            put_str(&mut map, "name", &rid.name);
            put_u64(&mut map, "number", rid.id as u64);
            Value::Mapping(map)
        })
        .collect()
}

fn write_contacts(config: &Config) -> Vec<Value> {
    config
        .contacts
        .iter()
        .enumerate()
        .map(|(i, contact)| {
            let mut body = Mapping::new();
            put_str(&mut body, "id", &contact_id(i));
            let kind = match contact {
                Contact::Dmr(c) => {
                    put_str(&mut body, "name", &c.name);
                    put_u64(&mut body, "number", c.id as u64);
                    put_bool(&mut body, "ring", c.ring);
                    match c.kind {
                        crate::config::CallKind::Private => "private",
                        crate::config::CallKind::Group => "group",
                        crate::config::CallKind::All => "all",
                    }
                }
                Contact::Dtmf(c) => {
                    put_str(&mut body, "name", &c.name);
                    put_str(&mut body, "number", &c.number);
                    "dtmf"
                }
            };
            let mut item = Mapping::new();
            put(&mut item, kind, Value::Mapping(body));
            Value::Mapping(item)
        })
        .collect()
}

fn write_group_lists(config: &Config) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (i, list) in config.group_lists.iter().enumerate() {
        let loc = format!("group-lists[{}]", i);
        let mut map = Mapping::new();
        put_str(&mut map, "id", &group_list_id(i));
        put_str(&mut map, "name", &list.name);
        let members = list
            .contacts
            .iter()
            .map(|&c| slot_ref(config.contacts.len(), contact_id, c, &loc, "contact"))
            .collect::<Result<Vec<_>>>()?;
        put(&mut map, "contacts", Value::Sequence(members));
        items.push(Value::Mapping(map));
    }
    Ok(items)
}

fn write_channel_base(
    map: &mut Mapping,
    base: &ChannelBase,
    config: &Config,
    loc: &str,
) -> Result<()> {
    put_str(map, "name", &base.name);
    put(map, "rx", mhz(base.rx_frequency));
    put(map, "tx", mhz(base.tx_frequency));
    put_str(map, "power", base.power.name());
    put_u64(map, "timeout", base.timeout as u64);
    put_bool(map, "rx-only", base.rx_only);
    if let Some(s) = base.scan_list {
        put(
            map,
            "scan-list",
            slot_ref(config.scan_lists.len(), scan_list_id, s, loc, "scan list")?,
        );
    }
    Ok(())
}

fn write_channels(config: &Config) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (i, channel) in config.channels.iter().enumerate() {
        let loc = format!("channels[{}]", i);
        let mut body = Mapping::new();
        put_str(&mut body, "id", &channel_id(i));
        let kind = match channel {
            Channel::Analog(c) => {
                write_channel_base(&mut body, &c.base, config, &loc)?;
                put_u64(&mut body, "squelch", c.squelch as u64);
                if !c.rx_tone.is_none() {
                    put(&mut body, "rx-tone", tone(&c.rx_tone));
                }
                if !c.tx_tone.is_none() {
                    put(&mut body, "tx-tone", tone(&c.tx_tone));
                }
                let bw = match c.bandwidth {
                    crate::config::Bandwidth::Narrow => "narrow",
                    crate::config::Bandwidth::Wide => "wide",
                };
                put_str(&mut body, "bandwidth", bw);
                if let Some(a) = c.aprs {
                    put(
                        &mut body,
                        "aprs",
                        slot_ref(config.positioning.len(), positioning_id, a, &loc, "APRS system")?,
                    );
                }
                "analog"
            }
            Channel::Digital(c) => {
                write_channel_base(&mut body, &c.base, config, &loc)?;
                put_u64(&mut body, "color-code", c.color_code as u64);
                put_str(&mut body, "time-slot", match c.time_slot {
                    crate::config::TimeSlot::Ts1 => "TS1",
                    crate::config::TimeSlot::Ts2 => "TS2",
                });
                put_str(&mut body, "admit", match c.admit {
                    crate::config::Admit::Always => "always",
                    crate::config::Admit::ChannelFree => "free",
                    crate::config::Admit::ColorCode => "color-code",
                });
                if let Some(g) = c.group_list {
                    put(
                        &mut body,
                        "group-list",
                        slot_ref(config.group_lists.len(), group_list_id, g, &loc, "group list")?,
                    );
                }
                if let Some(t) = c.tx_contact {
                    put(
                        &mut body,
                        "contact",
                        slot_ref(config.contacts.len(), contact_id, t, &loc, "contact")?,
                    );
                }
                if let Some(g) = c.gps_system {
                    put(
                        &mut body,
                        "gps",
                        slot_ref(
                            config.positioning.len(),
                            positioning_id,
                            g,
                            &loc,
                            "positioning system",
                        )?,
                    );
                }
                match c.roaming {
                    None => {}
                    Some(RoamingRef::Default) => put(&mut body, "roaming", tagged("!default")),
                    Some(RoamingRef::Zone(z)) => put(
                        &mut body,
                        "roaming",
                        slot_ref(
                            config.roaming_zones.len(),
                            roaming_zone_id,
                            z,
                            &loc,
                            "roaming zone",
                        )?,
                    ),
                }
                if let RadioIdRef::Id(r) = c.radio_id {
                    put(
                        &mut body,
                        "radio-id",
                        slot_ref(config.radio_ids.len(), radio_id_id, r, &loc, "radio ID")?,
                    );
                }
                "digital"
            }
        };
        let mut item = Mapping::new();
        put(&mut item, kind, Value::Mapping(body));
        items.push(Value::Mapping(item));
    }
    Ok(items)
}

fn write_zones(config: &Config) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (i, zone) in config.zones.iter().enumerate() {
        let loc = format!("zones[{}]", i);
        let mut map = Mapping::new();
        put_str(&mut map, "id", &zone_id(i));
        put_str(&mut map, "name", &zone.name);
        let channel_list = |list: &[usize]| {
            list.iter()
                .map(|&c| slot_ref(config.channels.len(), channel_id, c, &loc, "channel"))
                .collect::<Result<Vec<_>>>()
        };
        put(&mut map, "A", Value::Sequence(channel_list(&zone.a)?));
        if zone.is_split() {
            put(&mut map, "B", Value::Sequence(channel_list(&zone.b)?));
        }
        items.push(Value::Mapping(map));
    }
    Ok(items)
}

fn write_scan_lists(config: &Config) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (i, list) in config.scan_lists.iter().enumerate() {
        let loc = format!("scan-lists[{}]", i);
        let channel_ref = |r: &ChannelRef| -> Result<Value> {
            match r {
                ChannelRef::Selected => Ok(tagged("!selected")),
                ChannelRef::Channel(c) => {
                    slot_ref(config.channels.len(), channel_id, *c, &loc, "channel")
                }
            }
        };
        let mut map = Mapping::new();
        put_str(&mut map, "id", &scan_list_id(i));
        put_str(&mut map, "name", &list.name);
        let members = list
            .channels
            .iter()
            .map(&channel_ref)
            .collect::<Result<Vec<_>>>()?;
        put_list(&mut map, "channels", members);
        if let Some(r) = &list.priority1 {
            put(&mut map, "priority1", channel_ref(r)?);
        }
        if let Some(r) = &list.priority2 {
            put(&mut map, "priority2", channel_ref(r)?);
        }
        if let Some(r) = &list.revert {
            put(&mut map, "revert", channel_ref(r)?);
        }
        items.push(Value::Mapping(map));
    }
    Ok(items)
}

fn write_positioning(config: &Config) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (i, system) in config.positioning.iter().enumerate() {
        let loc = format!("positioning[{}]", i);
        let mut body = Mapping::new();
        put_str(&mut body, "id", &positioning_id(i));
        put_str(&mut body, "name", system.name());
        let kind = match system {
            PositioningSystem::Gps(s) => {
                put(
                    &mut body,
                    "destination",
                    slot_ref(config.contacts.len(), contact_id, s.destination, &loc, "contact")?,
                );
                if let Some(r) = s.revert {
                    put(
                        &mut body,
                        "revert",
                        slot_ref(config.channels.len(), channel_id, r, &loc, "channel")?,
                    );
                }
                put_u64(&mut body, "period", s.period as u64);
                "dmr"
            }
            PositioningSystem::Aprs(s) => {
                put_str(&mut body, "source", &s.source.to_string());
                put_str(&mut body, "destination", &s.destination.to_string());
                put_str(&mut body, "path", &s.path);
                put_str(&mut body, "icon", s.icon.name());
                if let Some(m) = &s.message {
                    put_str(&mut body, "message", m);
                }
                put(
                    &mut body,
                    "channel",
                    slot_ref(config.channels.len(), channel_id, s.channel, &loc, "channel")?,
                );
                put_u64(&mut body, "period", s.period as u64);
                "aprs"
            }
        };
        let mut item = Mapping::new();
        put(&mut item, kind, Value::Mapping(body));
        items.push(Value::Mapping(item));
    }
    Ok(items)
}

fn write_roaming_channels(config: &Config) -> Vec<Value> {
    config
        .roaming_channels
        .iter()
        .enumerate()
        .map(|(i, rc)| {
            let mut map = Mapping::new();
            put_str(&mut map, "id", &roaming_channel_id(i));
            put_str(&mut map, "name", &rc.name);
            put(&mut map, "rx", mhz(rc.rx_frequency));
            put(&mut map, "tx", mhz(rc.tx_frequency));
            if let Some(cc) = rc.color_code {
                put_u64(&mut map, "color-code", cc as u64);
            }
            if let Some(ts) = rc.time_slot {
                put_str(&mut map, "time-slot", match ts {
                    crate::config::TimeSlot::Ts1 => "TS1",
                    crate::config::TimeSlot::Ts2 => "TS2",
                });
            }
            Value::Mapping(map)
        })
        .collect()
}

fn write_roaming_zones(config: &Config) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (i, zone) in config.roaming_zones.iter().enumerate() {
        let loc = format!("roaming[{}]", i);
        let mut map = Mapping::new();
        put_str(&mut map, "id", &roaming_zone_id(i));
        put_str(&mut map, "name", &zone.name);
        let members = zone
            .channels
            .iter()
            .map(|&c| {
                slot_ref(
                    config.roaming_channels.len(),
                    roaming_channel_id,
                    c,
                    &loc,
                    "roaming channel",
                )
            })
            .collect::<Result<Vec<_>>>()?;
        put_list(&mut map, "channels", members);
        items.push(Value::Mapping(map));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tone::SelectiveCall;
    use crate::config::{
        AnalogChannel, Bandwidth, CallKind, ChannelRef, DigitalChannel, DmrContact, GroupList,
        RadioId, RadioIdRef, RoamingChannel, RoamingZone, ScanList, TimeSlot, Zone,
    };
    use crate::verify::IssueStack;
    use crate::yaml::{read_config, ExtensionRegistry};

    fn sample_config() -> Config {
        let mut config = Config::new();
        config.settings.version = "0.1.0".to_string();
        config.settings.intro_line1 = "dmrconf".to_string();
        config.add_radio_id(RadioId::new("DL1XYZ", 2621234));
        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Group, "WW", 91)));
        let mut gl = GroupList::new("World");
        gl.contacts.push(0);
        config.group_lists.push(gl);

        let mut d = DigitalChannel::new("R0 Berlin");
        d.base.rx_frequency = 439_575_000;
        d.base.tx_frequency = 431_975_000;
        d.time_slot = TimeSlot::Ts2;
        d.group_list = Some(0);
        d.tx_contact = Some(0);
        d.base.scan_list = Some(0);
        d.radio_id = RadioIdRef::Id(0);
        config.channels.push(Channel::Digital(d));

        let mut a = AnalogChannel::new("Simplex");
        a.base.rx_frequency = 145_500_000;
        a.base.tx_frequency = 145_500_000;
        a.rx_tone = SelectiveCall::ctcss(67.0);
        a.tx_tone = SelectiveCall::dcs(19, true);
        a.bandwidth = Bandwidth::Wide;
        config.channels.push(Channel::Analog(a));

        let mut zone = Zone::new("Home");
        zone.a = vec![0];
        zone.b = vec![1];
        config.zones.push(zone);

        let mut scan = ScanList::new("Scan");
        scan.channels = vec![ChannelRef::Channel(0), ChannelRef::Channel(1)];
        scan.priority1 = Some(ChannelRef::Selected);
        config.scan_lists.push(scan);

        let mut rc = RoamingChannel::new("R0");
        rc.rx_frequency = 439_575_000;
        rc.tx_frequency = 431_975_000;
        rc.color_code = Some(1);
        config.roaming_channels.push(rc);
        let mut rz = RoamingZone::new("All");
        rz.channels = vec![0];
        config.roaming_zones.push(rz);
        config
    }

    #[test]
    fn test_round_trip() {
        let config = sample_config();
        let text = write_config(&config).unwrap();
        let mut stack = IssueStack::new();
        let restored = read_config(&text, &ExtensionRegistry::new(), &mut stack).unwrap();
        assert!(!stack.has_critical(), "{:?}", stack.issues());
        assert_eq!(restored, config);
    }

    #[test]
    fn test_selected_marker_written_as_tag() {
        let text = write_config(&sample_config()).unwrap();
        assert!(text.contains("!selected"), "{}", text);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::new();
        let text = write_config(&config).unwrap();
        let mut stack = IssueStack::new();
        let restored = read_config(&text, &ExtensionRegistry::new(), &mut stack).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_dangling_slot_rejected() {
        let mut config = sample_config();
        config.group_lists[0].contacts.push(7);
        let err = write_config(&config).unwrap_err();
        assert!(err.to_string().contains("7"));
    }
}
