// Document -> Config reader
//
// After the schema verifier accepted the tree, two passes run over it
// in the same fixed category order: settings, radio-ids, contacts,
// group-lists, channels, zones, scan-lists, positioning,
// roaming-channels, roaming, extensions. The parse pass allocates
// entities and registers their IDs; the link pass resolves symbolic
// references to slot indices. Forward references work because linking
// only starts once every ID is known.

use super::context::{Context, IdMap};
use super::extension::ExtensionRegistry;
use super::{ConfigCodecError, Result};
use crate::codec::tone::{dcs_from_octal, is_standard_ctcss, SelectiveCall};
use crate::config::{
    Admit, AnalogChannel, AprsAddress, AprsIcon, AprsSystem, Bandwidth, CallKind, Channel,
    ChannelBase, ChannelRef, Config, Contact, DigitalChannel, DmrContact, DtmfContact, GpsSystem,
    GroupList, PositioningSystem, Power, RadioId, RadioIdRef, RoamingChannel, RoamingRef,
    RoamingZone, ScanList, TimeSlot, Zone,
};
use crate::schema::{document_schema, verify_document};
use crate::verify::IssueStack;
use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Read a configuration document.
///
/// Runs the schema verifier first (findings land on `stack`), then the
/// parse and link passes. Registered extension sections are skipped by
/// the schema and handed to their readers in both passes.
pub fn read_config(
    text: &str,
    extensions: &ExtensionRegistry,
    stack: &mut IssueStack,
) -> Result<Config> {
    let doc: Value = serde_yaml::from_str(text)?;
    let schema_view = strip_extension_sections(&doc, extensions);
    verify_document(document_schema(), &schema_view, stack)?;

    let mut config = Config::new();
    let mut ctx = Context::new();

    parse_settings(&doc, &mut config);
    parse_radio_ids(&doc, &mut config, &mut ctx)?;
    parse_contacts(&doc, &mut config, &mut ctx, stack)?;
    parse_group_lists(&doc, &mut config, &mut ctx)?;
    parse_channels(&doc, &mut config, &mut ctx, stack)?;
    parse_zones(&doc, &mut config, &mut ctx)?;
    parse_scan_lists(&doc, &mut config, &mut ctx)?;
    parse_positioning(&doc, &mut config, &mut ctx, stack)?;
    parse_roaming_channels(&doc, &mut config, &mut ctx)?;
    parse_roaming_zones(&doc, &mut config, &mut ctx)?;
    for_extension_sections(&doc, extensions, |reader, section| {
        reader.parse(section, &mut config, &mut ctx)
    })?;

    link_group_lists(&doc, &mut config, &ctx)?;
    link_channels(&doc, &mut config, &ctx)?;
    link_zones(&doc, &mut config, &ctx)?;
    link_scan_lists(&doc, &mut config, &ctx)?;
    link_positioning(&doc, &mut config, &ctx)?;
    link_roaming_zones(&doc, &mut config, &ctx)?;
    for_extension_sections(&doc, extensions, |reader, section| {
        reader.link(section, &mut config, &ctx)
    })?;

    debug!(
        channels = config.channels.len(),
        contacts = config.contacts.len(),
        zones = config.zones.len(),
        "configuration read"
    );
    Ok(config)
}

// -- document access helpers ------------------------------------------------

fn section<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    doc.get(key)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The single `kind: body` pair of a dispatch item.
fn dispatch(item: &Value) -> Option<(&str, &Value)> {
    let map = item.as_mapping()?;
    let (key, body) = map.iter().next()?;
    key.as_str().map(|k| (k, body))
}

fn join(path: &str, key: &str) -> String {
    format!("{}.{}", path, key)
}

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

fn required_str<'a>(body: &'a Value, key: &str, path: &str) -> Result<&'a str> {
    str_field(body, key)
        .ok_or_else(|| ConfigCodecError::parse(join(path, key), "string", "missing value"))
}

fn u64_field(body: &Value, key: &str, default: u64) -> u64 {
    body.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn bool_field(body: &Value, key: &str, default: bool) -> bool {
    body.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn register_id(map: &mut IdMap, body: &Value, path: &str, index: usize) -> Result<()> {
    if let Some(id) = str_field(body, "id") {
        map.register(id, index)
            .map_err(|e| ConfigCodecError::reference(path, "identifier", e))?;
    }
    Ok(())
}

fn strip_extension_sections(doc: &Value, extensions: &ExtensionRegistry) -> Value {
    match doc.as_mapping() {
        Some(map) => {
            let filtered: Mapping = map
                .iter()
                .filter(|(k, _)| !k.as_str().is_some_and(|k| extensions.contains(k)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Value::Mapping(filtered)
        }
        None => doc.clone(),
    }
}

fn for_extension_sections<F>(doc: &Value, extensions: &ExtensionRegistry, mut f: F) -> Result<()>
where
    F: FnMut(&dyn super::ExtensionReader, &Value) -> Result<()>,
{
    let Some(map) = doc.as_mapping() else {
        return Ok(());
    };
    for (key, value) in map {
        if let Some(reader) = key.as_str().and_then(|k| extensions.get(k)) {
            f(reader, value)?;
        }
    }
    Ok(())
}

// -- scalar value parsers ---------------------------------------------------

/// A frequency field: absolute, or an offset relative to the channel's
/// receive frequency (signed string or negative number).
enum Freq {
    Absolute(u64),
    Offset(i64),
}

fn mhz_to_hz(mhz: f64) -> i64 {
    (mhz * 1e6).round() as i64
}

fn parse_frequency(value: &Value, path: &str) -> Result<Freq> {
    let bad = |msg: &str| ConfigCodecError::parse(path, "frequency", msg);
    match value {
        Value::Number(n) => {
            let mhz = n
                .as_f64()
                .ok_or_else(|| bad("not representable as a number"))?;
            let hz = mhz_to_hz(mhz);
            if hz < 0 {
                Ok(Freq::Offset(hz))
            } else {
                Ok(Freq::Absolute(hz as u64))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('+') {
                Some(rest) => (Some(1i64), rest),
                None => match s.strip_prefix('-') {
                    Some(rest) => (Some(-1i64), rest),
                    None => (None, s),
                },
            };
            let mhz: f64 = digits
                .parse()
                .map_err(|_| bad(&format!("cannot parse \"{}\"", s)))?;
            match sign {
                Some(sign) => Ok(Freq::Offset(sign * mhz_to_hz(mhz))),
                None => Ok(Freq::Absolute(mhz_to_hz(mhz).max(0) as u64)),
            }
        }
        _ => Err(bad("expected a number or string")),
    }
}

/// Resolve the `rx`/`tx` pair of a channel-like record. A missing `tx`
/// means simplex; an offset is applied to the receive frequency.
fn parse_frequency_pair(body: &Value, path: &str) -> Result<(u64, u64)> {
    let rx_value = body
        .get("rx")
        .ok_or_else(|| ConfigCodecError::parse(join(path, "rx"), "frequency", "missing value"))?;
    let rx = match parse_frequency(rx_value, &join(path, "rx"))? {
        Freq::Absolute(hz) => hz,
        Freq::Offset(_) => {
            return Err(ConfigCodecError::parse(
                join(path, "rx"),
                "frequency",
                "receive frequency cannot be an offset",
            ))
        }
    };
    let tx = match body.get("tx") {
        None => rx,
        Some(value) => match parse_frequency(value, &join(path, "tx"))? {
            Freq::Absolute(hz) => hz,
            Freq::Offset(offset) => (rx as i64 + offset).max(0) as u64,
        },
    };
    Ok((rx, tx))
}

fn parse_tone(value: &Value, path: &str, stack: &mut IssueStack) -> Result<SelectiveCall> {
    let bad = |msg: String| ConfigCodecError::parse(path, "tone", msg);
    let ctcss = |hz: f32, stack: &mut IssueStack| {
        if !is_standard_ctcss(hz) {
            stack.warn(path, format!("{} Hz is not a standard CTCSS tone", hz));
        }
        SelectiveCall::ctcss(hz)
    };
    match value {
        Value::Null => Ok(SelectiveCall::None),
        Value::Number(n) => {
            let hz = n
                .as_f64()
                .ok_or_else(|| bad("not representable as a number".into()))? as f32;
            Ok(ctcss(hz, stack))
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                return Ok(SelectiveCall::None);
            }
            let dcs = |digits: &str, inverted: bool| -> Result<SelectiveCall> {
                let octal: u16 = digits
                    .parse()
                    .map_err(|_| bad(format!("cannot parse DCS code \"{}\"", s)))?;
                let code = dcs_from_octal(octal).map_err(|e| bad(e.to_string()))?;
                Ok(SelectiveCall::dcs(code, inverted))
            };
            if let Some(digits) = s.strip_prefix('n') {
                dcs(digits, false)
            } else if let Some(digits) = s.strip_prefix('i') {
                dcs(digits, true)
            } else {
                let hz: f32 = s
                    .parse()
                    .map_err(|_| bad(format!("cannot parse \"{}\"", s)))?;
                Ok(ctcss(hz, stack))
            }
        }
        _ => Err(bad("expected a number, string or null".into())),
    }
}

// -- reference resolution ---------------------------------------------------

enum RefValue<'a> {
    Id(&'a str),
    Selected,
    Default,
}

fn ref_value<'a>(value: &'a Value, path: &str) -> Result<RefValue<'a>> {
    match value {
        Value::String(s) => Ok(RefValue::Id(s)),
        Value::Tagged(t) if t.tag == "!selected" => Ok(RefValue::Selected),
        Value::Tagged(t) if t.tag == "!default" => Ok(RefValue::Default),
        _ => Err(ConfigCodecError::parse(
            path,
            "reference",
            "expected an identifier",
        )),
    }
}

/// Resolve a plain reference field; sentinels are rejected.
fn resolve_ref(map: &IdMap, value: &Value, path: &str, what: &'static str) -> Result<usize> {
    match ref_value(value, path)? {
        RefValue::Id(id) => map
            .resolve(id)
            .map_err(|e| ConfigCodecError::reference(path, what, e)),
        _ => Err(ConfigCodecError::parse(
            path,
            what,
            "sentinel not allowed here",
        )),
    }
}

fn resolve_opt(
    map: &IdMap,
    body: &Value,
    key: &str,
    path: &str,
    what: &'static str,
) -> Result<Option<usize>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => resolve_ref(map, value, &join(path, key), what).map(Some),
    }
}

/// Resolve a channel slot that may hold the selected-channel marker.
fn resolve_channel_ref(ctx: &Context, value: &Value, path: &str) -> Result<ChannelRef> {
    match ref_value(value, path)? {
        RefValue::Selected => Ok(ChannelRef::Selected),
        RefValue::Id(id) => ctx
            .channels
            .resolve(id)
            .map(ChannelRef::Channel)
            .map_err(|e| ConfigCodecError::reference(path, "channel", e)),
        RefValue::Default => Err(ConfigCodecError::parse(
            path,
            "channel",
            "!default not allowed here",
        )),
    }
}

// -- parse pass -------------------------------------------------------------

fn parse_settings(doc: &Value, config: &mut Config) {
    config.settings.version = str_field(doc, "version").unwrap_or_default().to_string();
    config.settings.intro_line1 = str_field(doc, "intro-line1").unwrap_or_default().to_string();
    config.settings.intro_line2 = str_field(doc, "intro-line2").unwrap_or_default().to_string();
}

fn parse_radio_ids(doc: &Value, config: &mut Config, ctx: &mut Context) -> Result<()> {
    for (i, item) in section(doc, "radio-ids").iter().enumerate() {
        let path = format!("radio-ids[{}]", i);
        let index = config.radio_ids.len();
        register_id(&mut ctx.radio_ids, item, &path, index)?;
        let name = str_field(item, "name")
            .or_else(|| str_field(item, "id"))
            .unwrap_or_default();
        let number = u64_field(item, "number", 0) as u32;
        config.add_radio_id(RadioId::new(name, number));
    }
    Ok(())
}

fn parse_contacts(
    doc: &Value,
    config: &mut Config,
    ctx: &mut Context,
    stack: &mut IssueStack,
) -> Result<()> {
    for (i, item) in section(doc, "contacts").iter().enumerate() {
        let path = format!("contacts[{}]", i);
        let (kind, body) = dispatch(item).ok_or_else(|| {
            ConfigCodecError::parse(&path, "contact", "expected a single-key mapping")
        })?;
        let index = config.contacts.len();
        register_id(&mut ctx.contacts, body, &path, index)?;
        let name = required_str(body, "name", &path)?;
        let contact = match kind {
            "private" | "group" | "all" => {
                let call = match kind {
                    "private" => CallKind::Private,
                    "group" => CallKind::Group,
                    _ => CallKind::All,
                };
                let number = u64_field(body, "number", 0) as u32;
                let mut c = DmrContact::new(call, name, number);
                c.ring = bool_field(body, "ring", false);
                Contact::Dmr(c)
            }
            "dtmf" => {
                let number = required_str(body, "number", &path)?;
                let c = DtmfContact::new(name, number);
                if !c.is_valid() {
                    stack.warn(&path, format!("\"{}\" is not a valid DTMF number", number));
                }
                Contact::Dtmf(c)
            }
            other => {
                return Err(ConfigCodecError::parse(
                    &path,
                    "contact",
                    format!("unknown contact kind \"{}\"", other),
                ))
            }
        };
        config.contacts.push(contact);
    }
    Ok(())
}

fn parse_group_lists(doc: &Value, config: &mut Config, ctx: &mut Context) -> Result<()> {
    for (i, item) in section(doc, "group-lists").iter().enumerate() {
        let path = format!("group-lists[{}]", i);
        let index = config.group_lists.len();
        register_id(&mut ctx.group_lists, item, &path, index)?;
        let name = required_str(item, "name", &path)?;
        config.group_lists.push(GroupList::new(name));
    }
    Ok(())
}

fn parse_channels(
    doc: &Value,
    config: &mut Config,
    ctx: &mut Context,
    stack: &mut IssueStack,
) -> Result<()> {
    for (i, item) in section(doc, "channels").iter().enumerate() {
        let path = format!("channels[{}]", i);
        let (kind, body) = dispatch(item).ok_or_else(|| {
            ConfigCodecError::parse(&path, "channel", "expected a single-key mapping")
        })?;
        let index = config.channels.len();
        register_id(&mut ctx.channels, body, &path, index)?;
        let base = parse_channel_base(body, &path)?;
        let channel = match kind {
            "analog" => {
                let mut c = AnalogChannel::new("");
                c.base = base;
                c.squelch = u64_field(body, "squelch", 1) as u8;
                if let Some(v) = body.get("rx-tone") {
                    c.rx_tone = parse_tone(v, &join(&path, "rx-tone"), stack)?;
                }
                if let Some(v) = body.get("tx-tone") {
                    c.tx_tone = parse_tone(v, &join(&path, "tx-tone"), stack)?;
                }
                if let Some("wide") = str_field(body, "bandwidth") {
                    c.bandwidth = Bandwidth::Wide;
                }
                Channel::Analog(c)
            }
            "digital" => {
                let mut c = DigitalChannel::new("");
                c.base = base;
                c.color_code = u64_field(body, "color-code", 1) as u8;
                if let Some("TS2") = str_field(body, "time-slot") {
                    c.time_slot = TimeSlot::Ts2;
                }
                c.admit = match str_field(body, "admit") {
                    Some("free") => Admit::ChannelFree,
                    Some("color-code") => Admit::ColorCode,
                    _ => Admit::Always,
                };
                Channel::Digital(c)
            }
            other => {
                return Err(ConfigCodecError::parse(
                    &path,
                    "channel",
                    format!("unknown channel kind \"{}\"", other),
                ))
            }
        };
        config.channels.push(channel);
    }
    Ok(())
}

fn parse_channel_base(body: &Value, path: &str) -> Result<ChannelBase> {
    let mut base = ChannelBase::new(required_str(body, "name", path)?);
    let (rx, tx) = parse_frequency_pair(body, path)?;
    base.rx_frequency = rx;
    base.tx_frequency = tx;
    if let Some(p) = str_field(body, "power") {
        base.power = Power::parse(p).unwrap_or_default();
    }
    base.timeout = u64_field(body, "timeout", 0) as u32;
    base.rx_only = bool_field(body, "rx-only", false);
    Ok(base)
}

fn parse_zones(doc: &Value, config: &mut Config, ctx: &mut Context) -> Result<()> {
    for (i, item) in section(doc, "zones").iter().enumerate() {
        let path = format!("zones[{}]", i);
        let index = config.zones.len();
        register_id(&mut ctx.zones, item, &path, index)?;
        let name = required_str(item, "name", &path)?;
        config.zones.push(Zone::new(name));
    }
    Ok(())
}

fn parse_scan_lists(doc: &Value, config: &mut Config, ctx: &mut Context) -> Result<()> {
    for (i, item) in section(doc, "scan-lists").iter().enumerate() {
        let path = format!("scan-lists[{}]", i);
        let index = config.scan_lists.len();
        register_id(&mut ctx.scan_lists, item, &path, index)?;
        let name = required_str(item, "name", &path)?;
        config.scan_lists.push(ScanList::new(name));
    }
    Ok(())
}

fn parse_positioning(
    doc: &Value,
    config: &mut Config,
    ctx: &mut Context,
    stack: &mut IssueStack,
) -> Result<()> {
    for (i, item) in section(doc, "positioning").iter().enumerate() {
        let path = format!("positioning[{}]", i);
        let (kind, body) = dispatch(item).ok_or_else(|| {
            ConfigCodecError::parse(&path, "positioning system", "expected a single-key mapping")
        })?;
        let index = config.positioning.len();
        register_id(&mut ctx.positioning, body, &path, index)?;
        let name = required_str(body, "name", &path)?;
        let system = match kind {
            "dmr" => {
                // Destination is linked later; slot 0 is a placeholder.
                let mut s = GpsSystem::new(name, 0);
                s.period = u64_field(body, "period", 300) as u32;
                PositioningSystem::Gps(s)
            }
            "aprs" => {
                let mut s = AprsSystem::new(name, 0);
                let source = required_str(body, "source", &path)?;
                s.source = AprsAddress::parse(source).ok_or_else(|| {
                    ConfigCodecError::parse(
                        join(&path, "source"),
                        "APRS address",
                        format!("cannot parse \"{}\"", source),
                    )
                })?;
                if let Some(dest) = str_field(body, "destination") {
                    s.destination = AprsAddress::parse(dest).ok_or_else(|| {
                        ConfigCodecError::parse(
                            join(&path, "destination"),
                            "APRS address",
                            format!("cannot parse \"{}\"", dest),
                        )
                    })?;
                }
                if let Some(p) = str_field(body, "path") {
                    s.path = p.to_string();
                }
                if let Some(icon) = str_field(body, "icon") {
                    match AprsIcon::parse(icon) {
                        Some(icon) => s.icon = icon,
                        None => stack.warn(
                            join(&path, "icon"),
                            format!("unknown icon \"{}\", using default", icon),
                        ),
                    }
                }
                s.message = str_field(body, "message").map(str::to_string);
                s.period = u64_field(body, "period", 300) as u32;
                PositioningSystem::Aprs(s)
            }
            other => {
                return Err(ConfigCodecError::parse(
                    &path,
                    "positioning system",
                    format!("unknown system kind \"{}\"", other),
                ))
            }
        };
        config.positioning.push(system);
    }
    Ok(())
}

fn parse_roaming_channels(doc: &Value, config: &mut Config, ctx: &mut Context) -> Result<()> {
    for (i, item) in section(doc, "roaming-channels").iter().enumerate() {
        let path = format!("roaming-channels[{}]", i);
        let index = config.roaming_channels.len();
        register_id(&mut ctx.roaming_channels, item, &path, index)?;
        let mut rc = RoamingChannel::new(required_str(item, "name", &path)?);
        let (rx, tx) = parse_frequency_pair(item, &path)?;
        rc.rx_frequency = rx;
        rc.tx_frequency = tx;
        rc.color_code = item.get("color-code").and_then(Value::as_u64).map(|c| c as u8);
        rc.time_slot = match str_field(item, "time-slot") {
            Some("TS1") => Some(TimeSlot::Ts1),
            Some("TS2") => Some(TimeSlot::Ts2),
            _ => None,
        };
        config.roaming_channels.push(rc);
    }
    Ok(())
}

fn parse_roaming_zones(doc: &Value, config: &mut Config, ctx: &mut Context) -> Result<()> {
    for (i, item) in section(doc, "roaming").iter().enumerate() {
        let path = format!("roaming[{}]", i);
        let index = config.roaming_zones.len();
        register_id(&mut ctx.roaming_zones, item, &path, index)?;
        let name = required_str(item, "name", &path)?;
        config.roaming_zones.push(RoamingZone::new(name));
    }
    Ok(())
}

// -- link pass --------------------------------------------------------------

fn link_group_lists(doc: &Value, config: &mut Config, ctx: &Context) -> Result<()> {
    for (i, item) in section(doc, "group-lists").iter().enumerate() {
        let path = format!("group-lists[{}]", i);
        let mut members = Vec::new();
        for (j, value) in section(item, "contacts").iter().enumerate() {
            let p = format!("{}.contacts[{}]", path, j);
            members.push(resolve_ref(&ctx.contacts, value, &p, "contact")?);
        }
        config.group_lists[i].contacts = members;
    }
    Ok(())
}

fn link_channels(doc: &Value, config: &mut Config, ctx: &Context) -> Result<()> {
    for (i, item) in section(doc, "channels").iter().enumerate() {
        let path = format!("channels[{}]", i);
        let Some((kind, body)) = dispatch(item) else {
            continue;
        };
        let scan_list = resolve_opt(&ctx.scan_lists, body, "scan-list", &path, "scan list")?;
        if kind == "analog" {
            let aprs = resolve_opt(&ctx.positioning, body, "aprs", &path, "APRS system")?;
            if let Channel::Analog(c) = &mut config.channels[i] {
                c.base.scan_list = scan_list;
                c.aprs = aprs;
            }
        } else {
            let group_list =
                resolve_opt(&ctx.group_lists, body, "group-list", &path, "group list")?;
            let tx_contact = resolve_opt(&ctx.contacts, body, "contact", &path, "contact")?;
            let gps_system =
                resolve_opt(&ctx.positioning, body, "gps", &path, "positioning system")?;
            let roaming = match body.get("roaming") {
                None | Some(Value::Null) => None,
                Some(value) => match ref_value(value, &join(&path, "roaming"))? {
                    RefValue::Default => Some(RoamingRef::Default),
                    RefValue::Id(id) => {
                        Some(RoamingRef::Zone(ctx.roaming_zones.resolve(id).map_err(
                            |e| {
                                ConfigCodecError::reference(
                                    join(&path, "roaming"),
                                    "roaming zone",
                                    e,
                                )
                            },
                        )?))
                    }
                    RefValue::Selected => {
                        return Err(ConfigCodecError::parse(
                            join(&path, "roaming"),
                            "roaming zone",
                            "!selected not allowed here",
                        ))
                    }
                },
            };
            let radio_id = match body.get("radio-id") {
                None | Some(Value::Null) => RadioIdRef::Default,
                Some(value) => match ref_value(value, &join(&path, "radio-id"))? {
                    RefValue::Default => RadioIdRef::Default,
                    RefValue::Id(id) => RadioIdRef::Id(ctx.radio_ids.resolve(id).map_err(|e| {
                        ConfigCodecError::reference(join(&path, "radio-id"), "radio ID", e)
                    })?),
                    RefValue::Selected => {
                        return Err(ConfigCodecError::parse(
                            join(&path, "radio-id"),
                            "radio ID",
                            "!selected not allowed here",
                        ))
                    }
                },
            };
            if let Channel::Digital(c) = &mut config.channels[i] {
                c.base.scan_list = scan_list;
                c.group_list = group_list;
                c.tx_contact = tx_contact;
                c.gps_system = gps_system;
                c.roaming = roaming;
                c.radio_id = radio_id;
            }
        }
    }
    Ok(())
}

fn link_zones(doc: &Value, config: &mut Config, ctx: &Context) -> Result<()> {
    for (i, item) in section(doc, "zones").iter().enumerate() {
        let path = format!("zones[{}]", i);
        let mut lists = [Vec::new(), Vec::new()];
        for (list, key) in lists.iter_mut().zip(["A", "B"]) {
            for (j, value) in section(item, key).iter().enumerate() {
                let p = format!("{}.{}[{}]", path, key, j);
                list.push(resolve_ref(&ctx.channels, value, &p, "channel")?);
            }
        }
        let [a, b] = lists;
        config.zones[i].a = a;
        config.zones[i].b = b;
    }
    Ok(())
}

fn link_scan_lists(doc: &Value, config: &mut Config, ctx: &Context) -> Result<()> {
    for (i, item) in section(doc, "scan-lists").iter().enumerate() {
        let path = format!("scan-lists[{}]", i);
        let mut members = Vec::new();
        for (j, value) in section(item, "channels").iter().enumerate() {
            let p = format!("{}.channels[{}]", path, j);
            members.push(resolve_channel_ref(ctx, value, &p)?);
        }
        let mut slot = |key: &str| -> Result<Option<ChannelRef>> {
            match item.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => resolve_channel_ref(ctx, value, &join(&path, key)).map(Some),
            }
        };
        let priority1 = slot("priority1")?;
        let priority2 = slot("priority2")?;
        let revert = slot("revert")?;
        let list = &mut config.scan_lists[i];
        list.channels = members;
        list.priority1 = priority1;
        list.priority2 = priority2;
        list.revert = revert;
    }
    Ok(())
}

fn link_positioning(doc: &Value, config: &mut Config, ctx: &Context) -> Result<()> {
    for (i, item) in section(doc, "positioning").iter().enumerate() {
        let path = format!("positioning[{}]", i);
        let Some((_, body)) = dispatch(item) else {
            continue;
        };
        match &mut config.positioning[i] {
            PositioningSystem::Gps(s) => {
                let dest = body.get("destination").ok_or_else(|| {
                    ConfigCodecError::parse(
                        join(&path, "destination"),
                        "contact",
                        "missing value",
                    )
                })?;
                s.destination =
                    resolve_ref(&ctx.contacts, dest, &join(&path, "destination"), "contact")?;
                s.revert = resolve_opt(&ctx.channels, body, "revert", &path, "channel")?;
            }
            PositioningSystem::Aprs(s) => {
                let channel = body.get("channel").ok_or_else(|| {
                    ConfigCodecError::parse(join(&path, "channel"), "channel", "missing value")
                })?;
                s.channel =
                    resolve_ref(&ctx.channels, channel, &join(&path, "channel"), "channel")?;
            }
        }
    }
    Ok(())
}

fn link_roaming_zones(doc: &Value, config: &mut Config, ctx: &Context) -> Result<()> {
    for (i, item) in section(doc, "roaming").iter().enumerate() {
        let path = format!("roaming[{}]", i);
        let mut members = Vec::new();
        for (j, value) in section(item, "channels").iter().enumerate() {
            let p = format!("{}.channels[{}]", path, j);
            members.push(resolve_ref(&ctx.roaming_channels, value, &p, "roaming channel")?);
        }
        config.roaming_zones[i].channels = members;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelRef;

    const SAMPLE: &str = r#"
version: "0.1.0"
intro-line1: "dmrconf"
radio-ids:
  - {id: rid1, name: DL1XYZ, number: 2621234}
contacts:
  - group: {id: tg91, name: "WW", number: 91}
  - private: {id: op1, name: "Op", number: 2621001, ring: true}
group-lists:
  - {id: gl1, name: "World", contacts: [tg91]}
channels:
  - digital:
      id: ch1
      name: "R0 Berlin"
      rx: 439.575
      tx: "-7.6"
      color-code: 1
      time-slot: TS2
      group-list: gl1
      contact: tg91
      scan-list: scan1
      radio-id: rid1
  - analog:
      id: ch2
      name: "Simplex"
      rx: 145.500
      rx-tone: 67.0
      tx-tone: "i023"
      bandwidth: wide
zones:
  - {id: zone1, name: "Home", A: [ch1], B: [ch2]}
scan-lists:
  - {id: scan1, name: "Scan", channels: [ch1, ch2], priority1: !selected }
positioning:
  - dmr: {id: gps1, name: "BM GPS", destination: tg91, period: 180}
roaming-channels:
  - {id: rc1, name: "R0", rx: 439.575, tx: "-7.6", color-code: 1}
roaming:
  - {id: rz1, name: "All", channels: [rc1]}
"#;

    fn read(text: &str) -> (Config, IssueStack) {
        let mut stack = IssueStack::new();
        let config = read_config(text, &ExtensionRegistry::new(), &mut stack).unwrap();
        (config, stack)
    }

    #[test]
    fn test_read_sample() {
        let (config, stack) = read(SAMPLE);
        assert!(!stack.has_critical(), "{:?}", stack.issues());
        assert_eq!(config.settings.version, "0.1.0");
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.contacts.len(), 2);
        assert_eq!(config.default_radio_id().map(|r| r.id), Some(2621234));
    }

    #[test]
    fn test_offset_tx_frequency() {
        let (config, _) = read(SAMPLE);
        let base = config.channels[0].base();
        assert_eq!(base.rx_frequency, 439_575_000);
        assert_eq!(base.tx_frequency, 431_975_000);
    }

    #[test]
    fn test_digital_links_resolved() {
        let (config, _) = read(SAMPLE);
        let d = config.channels[0].as_digital().unwrap();
        assert_eq!(d.group_list, Some(0));
        assert_eq!(d.tx_contact, Some(0));
        assert_eq!(d.time_slot, TimeSlot::Ts2);
        assert_eq!(d.radio_id, RadioIdRef::Id(0));
        // Forward reference: the scan list is declared after the channel.
        assert_eq!(d.base.scan_list, Some(0));
    }

    #[test]
    fn test_analog_tones() {
        let (config, _) = read(SAMPLE);
        let a = config.channels[1].as_analog().unwrap();
        assert_eq!(a.rx_tone, SelectiveCall::Ctcss(670));
        assert_eq!(a.tx_tone, SelectiveCall::dcs(19, true));
        assert_eq!(a.bandwidth, Bandwidth::Wide);
    }

    #[test]
    fn test_scan_list_selected_marker() {
        let (config, _) = read(SAMPLE);
        let s = &config.scan_lists[0];
        assert_eq!(s.channels, vec![ChannelRef::Channel(0), ChannelRef::Channel(1)]);
        assert_eq!(s.priority1, Some(ChannelRef::Selected));
        assert_eq!(s.priority2, None);
    }

    #[test]
    fn test_zone_and_roaming_links() {
        let (config, _) = read(SAMPLE);
        assert_eq!(config.zones[0].a, vec![0]);
        assert_eq!(config.zones[0].b, vec![1]);
        assert_eq!(config.roaming_zones[0].channels, vec![0]);
        assert_eq!(config.positioning[0].as_gps().unwrap().destination, 0);
        assert_eq!(config.positioning[0].period(), 180);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let broken = SAMPLE.replace("contact: tg91", "contact: nosuch");
        let mut stack = IssueStack::new();
        let err = read_config(&broken, &ExtensionRegistry::new(), &mut stack).unwrap_err();
        assert!(err.to_string().contains("nosuch"));
    }

    #[test]
    fn test_nonstandard_tone_warns() {
        let warned = SAMPLE.replace("rx-tone: 67.0", "rx-tone: 68.3");
        let (config, stack) = read(&warned);
        let a = config.channels[1].as_analog().unwrap();
        assert_eq!(a.rx_tone, SelectiveCall::None);
        assert!(stack.iter().any(|i| i.message.contains("68.3")));
    }

    #[test]
    fn test_extension_sections_dispatched() {
        use crate::yaml::ExtensionReader;

        struct Marker;
        impl ExtensionReader for Marker {
            fn name(&self) -> &str {
                "device-settings"
            }
            fn parse(&self, value: &Value, config: &mut Config, _: &mut Context) -> Result<()> {
                if let Some(line) = str_field(value, "greeting") {
                    config.settings.intro_line2 = line.to_string();
                }
                Ok(())
            }
            fn link(&self, _: &Value, _: &mut Config, _: &Context) -> Result<()> {
                Ok(())
            }
        }

        let text = format!("{}\ndevice-settings:\n  greeting: hello\n", SAMPLE);
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(Marker));
        let mut stack = IssueStack::new();
        let config = read_config(&text, &registry, &mut stack).unwrap();
        assert_eq!(config.settings.intro_line2, "hello");
        // The registered section must not trip the unknown-key warning.
        assert!(!stack.iter().any(|i| i.message.contains("device-settings")));
    }
}
