// Config -> tabular file writer
//
// Emits the record grammar the reader accepts, with consecutive 1-based
// indices per table. Sentinels map to their documented index values:
// selected channel and default roaming zone -> 0, unset -> "-".

use super::{Result, TabularError};
use crate::codec::tone::SelectiveCall;
use crate::config::{
    CallKind, Channel, ChannelBase, ChannelRef, Config, Contact, PositioningSystem, RadioIdRef,
    RoamingRef, TimeSlot,
};
use std::fmt::Write;

/// Write a configuration as a tabular file.
pub fn write_tabular(config: &Config) -> Result<String> {
    let mut out = String::new();
    let w = &mut out;

    push(w, format!("version: \"{}\"", config.settings.version));
    if !config.settings.intro_line1.is_empty() {
        push(w, format!("intro1: \"{}\"", config.settings.intro_line1));
    }
    if !config.settings.intro_line2.is_empty() {
        push(w, format!("intro2: \"{}\"", config.settings.intro_line2));
    }

    for (i, rid) in config.radio_ids.iter().enumerate() {
        push(w, format!("id {}: \"{}\" {}", i + 1, rid.name, rid.id));
    }

    for (i, contact) in config.contacts.iter().enumerate() {
        let line = match contact {
            Contact::Dmr(c) => {
                let kind = match c.kind {
                    CallKind::Private => "private",
                    CallKind::Group => "group",
                    CallKind::All => "all",
                };
                format!(
                    "contact {}: {} \"{}\" {} {}",
                    i + 1,
                    kind,
                    c.name,
                    c.id,
                    flag(c.ring)
                )
            }
            Contact::Dtmf(c) => {
                format!("contact {}: dtmf \"{}\" \"{}\"", i + 1, c.name, c.number)
            }
        };
        push(w, line);
    }

    for (i, list) in config.group_lists.iter().enumerate() {
        let loc = format!("group list {}", i + 1);
        let mut line = format!("grouplist {}: \"{}\"", i + 1, list.name);
        if !list.contacts.is_empty() {
            let members = index_list(&list.contacts, config.contacts.len(), &loc, "contact")?;
            let _ = write!(line, " {}", members);
        }
        push(w, line);
    }

    for (i, channel) in config.channels.iter().enumerate() {
        push(w, write_channel(config, i, channel)?);
    }

    for (i, zone) in config.zones.iter().enumerate() {
        let loc = format!("zone {}", i + 1);
        let mut line = format!("zone {}: \"{}\"", i + 1, zone.name);
        if !zone.a.is_empty() {
            let a = index_list(&zone.a, config.channels.len(), &loc, "channel")?;
            let _ = write!(line, " {}", a);
        }
        if zone.is_split() {
            let b = index_list(&zone.b, config.channels.len(), &loc, "channel")?;
            let _ = write!(line, " {}", b);
        }
        push(w, line);
    }

    for (i, list) in config.scan_lists.iter().enumerate() {
        let loc = format!("scan list {}", i + 1);
        let slot = |r: &Option<ChannelRef>| -> Result<String> {
            match r {
                None => Ok("-".to_string()),
                Some(r) => channel_ref(r, config.channels.len(), &loc),
            }
        };
        let mut line = format!(
            "scanlist {}: \"{}\" {} {} {}",
            i + 1,
            list.name,
            slot(&list.priority1)?,
            slot(&list.priority2)?,
            slot(&list.revert)?
        );
        if !list.channels.is_empty() {
            let members = list
                .channels
                .iter()
                .map(|r| channel_ref(r, config.channels.len(), &loc))
                .collect::<Result<Vec<_>>>()?
                .join(",");
            let _ = write!(line, " {}", members);
        }
        push(w, line);
    }

    for (i, system) in config.positioning.iter().enumerate() {
        let loc = format!("positioning system {}", i + 1);
        let line = match system {
            PositioningSystem::Gps(s) => format!(
                "gps {}: \"{}\" {} {} {}",
                i + 1,
                s.name,
                index(s.destination, config.contacts.len(), &loc, "contact")?,
                s.period,
                opt_index(s.revert, config.channels.len(), &loc, "channel")?
            ),
            PositioningSystem::Aprs(s) => {
                let mut line = format!(
                    "aprs {}: \"{}\" {} {} \"{}\" {} {} {}",
                    i + 1,
                    s.name,
                    s.source,
                    s.destination,
                    s.path,
                    s.icon.name(),
                    index(s.channel, config.channels.len(), &loc, "channel")?,
                    s.period
                );
                if let Some(m) = &s.message {
                    let _ = write!(line, " \"{}\"", m);
                }
                line
            }
        };
        push(w, line);
    }

    for (i, rc) in config.roaming_channels.iter().enumerate() {
        let ts = match rc.time_slot {
            None => "-".to_string(),
            Some(TimeSlot::Ts1) => "1".to_string(),
            Some(TimeSlot::Ts2) => "2".to_string(),
        };
        let cc = match rc.color_code {
            None => "-".to_string(),
            Some(c) => c.to_string(),
        };
        push(
            w,
            format!(
                "roamingchannel {}: \"{}\" {} {} {} {}",
                i + 1,
                rc.name,
                mhz(rc.rx_frequency),
                mhz(rc.tx_frequency),
                cc,
                ts
            ),
        );
    }

    for (i, zone) in config.roaming_zones.iter().enumerate() {
        let loc = format!("roaming zone {}", i + 1);
        let mut line = format!("roaming {}: \"{}\"", i + 1, zone.name);
        if !zone.channels.is_empty() {
            let members = index_list(
                &zone.channels,
                config.roaming_channels.len(),
                &loc,
                "roaming channel",
            )?;
            let _ = write!(line, " {}", members);
        }
        push(w, line);
    }

    Ok(out)
}

fn write_channel(config: &Config, i: usize, channel: &Channel) -> Result<String> {
    let loc = format!("channel {}", i + 1);
    let scan = |base: &ChannelBase| -> Result<String> {
        opt_index(base.scan_list, config.scan_lists.len(), &loc, "scan list")
    };
    match channel {
        Channel::Analog(c) => Ok(format!(
            "analog {}: \"{}\" {} {} {} {} {} {} {} {} {} {} {}",
            i + 1,
            c.base.name,
            mhz(c.base.rx_frequency),
            mhz(c.base.tx_frequency),
            c.base.power.name(),
            c.base.timeout,
            flag(c.base.rx_only),
            scan(&c.base)?,
            c.squelch,
            tone(&c.rx_tone),
            tone(&c.tx_tone),
            match c.bandwidth {
                crate::config::Bandwidth::Narrow => "narrow",
                crate::config::Bandwidth::Wide => "wide",
            },
            opt_index(c.aprs, config.positioning.len(), &loc, "APRS system")?
        )),
        Channel::Digital(c) => {
            let roaming = match c.roaming {
                None => "-".to_string(),
                Some(RoamingRef::Default) => "0".to_string(),
                Some(RoamingRef::Zone(z)) => {
                    index(z, config.roaming_zones.len(), &loc, "roaming zone")?
                }
            };
            let radio_id = match c.radio_id {
                RadioIdRef::Default => "-".to_string(),
                RadioIdRef::Id(r) => index(r, config.radio_ids.len(), &loc, "radio ID")?,
            };
            Ok(format!(
                "digital {}: \"{}\" {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
                i + 1,
                c.base.name,
                mhz(c.base.rx_frequency),
                mhz(c.base.tx_frequency),
                c.base.power.name(),
                c.base.timeout,
                flag(c.base.rx_only),
                scan(&c.base)?,
                c.color_code,
                c.time_slot.number(),
                match c.admit {
                    crate::config::Admit::Always => "always",
                    crate::config::Admit::ChannelFree => "free",
                    crate::config::Admit::ColorCode => "color",
                },
                opt_index(c.group_list, config.group_lists.len(), &loc, "group list")?,
                opt_index(c.tx_contact, config.contacts.len(), &loc, "contact")?,
                opt_index(c.gps_system, config.positioning.len(), &loc, "positioning system")?,
                roaming,
                radio_id
            ))
        }
    }
}

fn push(out: &mut String, line: String) {
    out.push_str(&line);
    out.push('\n');
}

fn flag(b: bool) -> &'static str {
    if b {
        "+"
    } else {
        "-"
    }
}

fn mhz(hz: u64) -> String {
    format!("{}", hz as f64 / 1e6)
}

fn tone(t: &SelectiveCall) -> String {
    // Display already matches the token grammar: 67.0, n023, i023, -.
    t.to_string()
}

fn index(slot: usize, len: usize, loc: &str, what: &'static str) -> Result<String> {
    if slot >= len {
        return Err(TabularError::Parse {
            line: 0,
            message: format!("{}: {} slot {} does not exist", loc, what, slot),
        });
    }
    Ok((slot + 1).to_string())
}

fn opt_index(slot: Option<usize>, len: usize, loc: &str, what: &'static str) -> Result<String> {
    match slot {
        None => Ok("-".to_string()),
        Some(s) => index(s, len, loc, what),
    }
}

fn channel_ref(r: &ChannelRef, len: usize, loc: &str) -> Result<String> {
    match r {
        ChannelRef::Selected => Ok("0".to_string()),
        ChannelRef::Channel(c) => index(*c, len, loc, "channel"),
    }
}

fn index_list(list: &[usize], len: usize, loc: &str, what: &'static str) -> Result<String> {
    Ok(list
        .iter()
        .map(|&i| index(i, len, loc, what))
        .collect::<Result<Vec<_>>>()?
        .join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tone::SelectiveCall;
    use crate::config::{
        AnalogChannel, AprsAddress, AprsSystem, Bandwidth, DigitalChannel, DmrContact, GroupList,
        RadioId, RoamingChannel, RoamingZone, ScanList, TimeSlot, Zone,
    };
    use crate::tabular::read_tabular;
    use crate::verify::IssueStack;

    fn sample_config() -> Config {
        let mut config = Config::new();
        config.settings.version = "0.1.0".to_string();
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
        d.roaming = Some(RoamingRef::Default);
        config.channels.push(Channel::Digital(d));

        let mut a = AnalogChannel::new("Simplex");
        a.base.rx_frequency = 145_500_000;
        a.base.tx_frequency = 145_500_000;
        a.rx_tone = SelectiveCall::ctcss(67.0);
        a.tx_tone = SelectiveCall::dcs(19, true);
        a.bandwidth = Bandwidth::Wide;
        a.aprs = Some(0);
        config.channels.push(Channel::Analog(a));

        let mut aprs = AprsSystem::new("APRS", 1);
        aprs.source = AprsAddress::new("DL1XYZ", 7);
        aprs.path = "WIDE1-1".to_string();
        config.positioning.push(PositioningSystem::Aprs(aprs));

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
        let text = write_tabular(&config).unwrap();
        let mut stack = IssueStack::new();
        let restored = read_tabular(&text, &mut stack).unwrap();
        assert!(!stack.has_critical(), "{:?}", stack.issues());
        assert_eq!(restored, config);
    }

    #[test]
    fn test_sentinel_encodings() {
        let text = write_tabular(&sample_config()).unwrap();
        // Selected channel in priority slot 1 and the default roaming
        // zone both encode as index 0.
        assert!(text.contains("scanlist 1: \"Scan\" 0 - -"), "{}", text);
        assert!(text.contains(" 0 -\n") || text.contains(" 0 1\n"), "{}", text);
    }

    #[test]
    fn test_dangling_slot_rejected() {
        let mut config = sample_config();
        config.zones[0].a.push(9);
        assert!(write_tabular(&config).is_err());
    }
}
