// Tabular file -> Config reader
//
// Both passes walk the same lexed lines and every handler consumes its
// whole record each time; the parse pass keeps the scalar fields, the
// link pass keeps the resolved references. Record indices must be
// consecutive per table, starting at 1.

use super::lexer::{lex, Line, Token};
use super::{Result, TabularError};
use crate::codec::tone::{dcs_from_octal, is_standard_ctcss, SelectiveCall};
use crate::config::{
    Admit, AnalogChannel, AprsAddress, AprsIcon, AprsSystem, Bandwidth, CallKind, Channel,
    ChannelRef, Config,
    Contact, DigitalChannel, DmrContact, DtmfContact, GpsSystem, GroupList, PositioningSystem,
    Power, RadioId, RadioIdRef, RoamingChannel, RoamingRef, RoamingZone, ScanList, TimeSlot, Zone,
};
use crate::verify::IssueStack;
use tracing::debug;

/// Read a tabular configuration file.
pub fn read_tabular(text: &str, stack: &mut IssueStack) -> Result<Config> {
    let lines = lex(text)?;
    let mut config = Config::new();

    let mut tables = Tables::default();
    for line in &lines {
        handle_line(line, &mut config, &mut tables, stack, false)?;
    }
    let mut tables = Tables::default();
    for line in &lines {
        handle_line(line, &mut config, &mut tables, stack, true)?;
    }

    debug!(
        channels = config.channels.len(),
        contacts = config.contacts.len(),
        "tabular configuration read"
    );
    Ok(config)
}

/// Per-pass record counters; slot = counter value when the record is
/// reached, identical in both passes because the line order is.
#[derive(Default)]
struct Tables {
    radio_ids: usize,
    contacts: usize,
    group_lists: usize,
    channels: usize,
    zones: usize,
    scan_lists: usize,
    positioning: usize,
    roaming_channels: usize,
    roaming_zones: usize,
}

fn handle_line(
    line: &Line,
    config: &mut Config,
    tables: &mut Tables,
    stack: &mut IssueStack,
    link: bool,
) -> Result<()> {
    let mut cur = Cursor::new(line);
    let section = cur.keyword()?;
    match section.as_str() {
        "version" => {
            cur.colon()?;
            let v = cur.string()?;
            if !link {
                config.settings.version = v;
            }
        }
        "intro1" => {
            cur.colon()?;
            let v = cur.string()?;
            if !link {
                config.settings.intro_line1 = v;
            }
        }
        "intro2" => {
            cur.colon()?;
            let v = cur.string()?;
            if !link {
                config.settings.intro_line2 = v;
            }
        }
        "id" => handle_radio_id(&mut cur, config, tables, link)?,
        "contact" => handle_contact(&mut cur, config, tables, stack, link)?,
        "grouplist" => handle_group_list(&mut cur, config, tables, link)?,
        "digital" => handle_digital(&mut cur, config, tables, link)?,
        "analog" => handle_analog(&mut cur, config, tables, stack, link)?,
        "zone" => handle_zone(&mut cur, config, tables, link)?,
        "scanlist" => handle_scan_list(&mut cur, config, tables, link)?,
        "gps" => handle_gps(&mut cur, config, tables, link)?,
        "aprs" => handle_aprs(&mut cur, config, tables, stack, link)?,
        "roamingchannel" => handle_roaming_channel(&mut cur, config, tables, link)?,
        "roaming" => handle_roaming_zone(&mut cur, config, tables, link)?,
        other => {
            return Err(cur.error(format!("unknown section keyword \"{}\"", other)));
        }
    }
    cur.finish()
}

fn handle_radio_id(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    link: bool,
) -> Result<()> {
    cur.record_index(tables.radio_ids)?;
    tables.radio_ids += 1;
    let name = cur.string()?;
    let number = cur.unsigned()? as u32;
    if !link {
        config.add_radio_id(RadioId::new(name, number));
    }
    Ok(())
}

fn handle_contact(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    stack: &mut IssueStack,
    link: bool,
) -> Result<()> {
    let line = cur.line;
    cur.record_index(tables.contacts)?;
    tables.contacts += 1;
    let kind = cur.keyword()?;
    let contact = match kind.as_str() {
        "private" | "group" | "all" => {
            let call = match kind.as_str() {
                "private" => CallKind::Private,
                "group" => CallKind::Group,
                _ => CallKind::All,
            };
            let name = cur.string()?;
            let number = cur.unsigned()? as u32;
            let mut c = DmrContact::new(call, name, number);
            c.ring = cur.flag()?;
            Contact::Dmr(c)
        }
        "dtmf" => {
            let name = cur.string()?;
            let number = cur.string()?;
            let c = DtmfContact::new(name, number);
            if !link && !c.is_valid() {
                stack.warn(
                    format!("line {}", line),
                    format!("\"{}\" is not a valid DTMF number", c.number),
                );
            }
            Contact::Dtmf(c)
        }
        other => return Err(cur.error(format!("unknown contact kind \"{}\"", other))),
    };
    if !link {
        config.contacts.push(contact);
    }
    Ok(())
}

fn handle_group_list(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    link: bool,
) -> Result<()> {
    let slot = tables.group_lists;
    cur.record_index(slot)?;
    tables.group_lists += 1;
    let name = cur.string()?;
    let members = if cur.at_end() { Vec::new() } else { cur.index_list()? };
    if link {
        config.group_lists[slot].contacts = members
            .into_iter()
            .map(|i| resolve(i, config.contacts.len(), cur.line, "contact"))
            .collect::<Result<Vec<_>>>()?;
    } else {
        config.group_lists.push(GroupList::new(name));
    }
    Ok(())
}

// digital <n>: "<name>" <rx> <tx> <power> <tot> <ro> <scan|-> <cc> <ts>
//              <admit> <grouplist|-> <contact|-> [<gps|-> [<roaming|0|->
//              [<radio-id|->]]]
// Reference slots: "-" unset; roaming 0 = the radio's default zone.
fn handle_digital(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    link: bool,
) -> Result<()> {
    let slot = tables.channels;
    cur.record_index(slot)?;
    tables.channels += 1;

    let mut c = DigitalChannel::new(cur.string()?);
    parse_channel_common(cur, &mut c.base)?;
    let scan = cur.opt_index()?;
    c.color_code = cur.unsigned()? as u8;
    c.time_slot = match cur.unsigned()? {
        1 => TimeSlot::Ts1,
        2 => TimeSlot::Ts2,
        n => return Err(cur.error(format!("invalid time slot {}", n))),
    };
    c.admit = match cur.keyword()?.as_str() {
        "always" => Admit::Always,
        "free" => Admit::ChannelFree,
        "color" => Admit::ColorCode,
        other => return Err(cur.error(format!("unknown admit criterion \"{}\"", other))),
    };
    let group_list = cur.opt_index()?;
    let contact = cur.opt_index()?;
    let gps = if cur.at_end() { None } else { cur.opt_index()? };
    let roaming = if cur.at_end() { None } else { cur.opt_index()? };
    let radio_id = if cur.at_end() { None } else { cur.opt_index()? };

    if link {
        let line = cur.line;
        let resolved_scan = scan
            .map(|i| resolve(i, config.scan_lists.len(), line, "scan list"))
            .transpose()?;
        let resolved_group = group_list
            .map(|i| resolve(i, config.group_lists.len(), line, "group list"))
            .transpose()?;
        let resolved_contact = contact
            .map(|i| resolve(i, config.contacts.len(), line, "contact"))
            .transpose()?;
        let resolved_gps = gps
            .map(|i| resolve(i, config.positioning.len(), line, "positioning system"))
            .transpose()?;
        let resolved_roaming = match roaming {
            None => None,
            Some(0) => Some(RoamingRef::Default),
            Some(i) => Some(RoamingRef::Zone(resolve(
                i,
                config.roaming_zones.len(),
                line,
                "roaming zone",
            )?)),
        };
        let resolved_radio_id = match radio_id {
            None => RadioIdRef::Default,
            Some(i) => RadioIdRef::Id(resolve(i, config.radio_ids.len(), line, "radio ID")?),
        };
        let Channel::Digital(target) = &mut config.channels[slot] else {
            return Err(cur.error("channel kind changed between passes"));
        };
        target.base.scan_list = resolved_scan;
        target.group_list = resolved_group;
        target.tx_contact = resolved_contact;
        target.gps_system = resolved_gps;
        target.roaming = resolved_roaming;
        target.radio_id = resolved_radio_id;
    } else {
        config.channels.push(Channel::Digital(c));
    }
    Ok(())
}

// analog <n>: "<name>" <rx> <tx> <power> <tot> <ro> <scan|-> <squelch>
//             <rx-tone> <tx-tone> <narrow|wide> [<aprs|->]
fn handle_analog(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    stack: &mut IssueStack,
    link: bool,
) -> Result<()> {
    let slot = tables.channels;
    cur.record_index(slot)?;
    tables.channels += 1;

    let mut c = AnalogChannel::new(cur.string()?);
    parse_channel_common(cur, &mut c.base)?;
    let scan = cur.opt_index()?;
    c.squelch = cur.unsigned()? as u8;
    c.rx_tone = cur.tone(stack, link)?;
    c.tx_tone = cur.tone(stack, link)?;
    c.bandwidth = match cur.keyword()?.as_str() {
        "narrow" => Bandwidth::Narrow,
        "wide" => Bandwidth::Wide,
        other => return Err(cur.error(format!("unknown bandwidth \"{}\"", other))),
    };
    let aprs = if cur.at_end() { None } else { cur.opt_index()? };

    if link {
        let line = cur.line;
        let resolved_scan = scan
            .map(|i| resolve(i, config.scan_lists.len(), line, "scan list"))
            .transpose()?;
        let resolved_aprs = aprs
            .map(|i| resolve(i, config.positioning.len(), line, "APRS system"))
            .transpose()?;
        let Channel::Analog(target) = &mut config.channels[slot] else {
            return Err(cur.error("channel kind changed between passes"));
        };
        target.base.scan_list = resolved_scan;
        target.aprs = resolved_aprs;
    } else {
        config.channels.push(Channel::Analog(c));
    }
    Ok(())
}

fn parse_channel_common(cur: &mut Cursor, base: &mut crate::config::ChannelBase) -> Result<()> {
    let rx = cur.number()?;
    base.rx_frequency = (rx * 1e6).round().max(0.0) as u64;
    base.tx_frequency = match cur.next_token()? {
        Token::Number(mhz) => (mhz * 1e6).round().max(0.0) as u64,
        Token::Offset(mhz) => {
            let hz = base.rx_frequency as i64 + (mhz * 1e6).round() as i64;
            hz.max(0) as u64
        }
        other => return Err(cur.error(format!("expected a frequency, got {:?}", other))),
    };
    let power = cur.keyword()?;
    base.power = Power::parse(&power)
        .ok_or_else(|| cur.error(format!("unknown power level \"{}\"", power)))?;
    base.timeout = cur.unsigned()? as u32;
    base.rx_only = cur.flag()?;
    Ok(())
}

// zone <n>: "<name>" <a,...> [<b,...>]
fn handle_zone(cur: &mut Cursor, config: &mut Config, tables: &mut Tables, link: bool) -> Result<()> {
    let slot = tables.zones;
    cur.record_index(slot)?;
    tables.zones += 1;
    let name = cur.string()?;
    let a = if cur.at_end() { Vec::new() } else { cur.index_list()? };
    let b = if cur.at_end() { Vec::new() } else { cur.index_list()? };
    if link {
        let line = cur.line;
        let chan = |list: Vec<i64>| {
            list.into_iter()
                .map(|i| resolve(i, config.channels.len(), line, "channel"))
                .collect::<Result<Vec<_>>>()
        };
        config.zones[slot].a = chan(a)?;
        config.zones[slot].b = chan(b)?;
    } else {
        config.zones.push(Zone::new(name));
    }
    Ok(())
}

// scanlist <n>: "<name>" <pri1> <pri2> <revert> <member,...>
// Each slot: 1-based channel index, 0 = selected channel, "-" = none.
fn handle_scan_list(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    link: bool,
) -> Result<()> {
    let slot = tables.scan_lists;
    cur.record_index(slot)?;
    tables.scan_lists += 1;
    let name = cur.string()?;
    let pri1 = cur.opt_index()?;
    let pri2 = cur.opt_index()?;
    let revert = cur.opt_index()?;
    let members = if cur.at_end() { Vec::new() } else { cur.index_list()? };
    if link {
        let line = cur.line;
        let channel_ref = |i: i64| -> Result<ChannelRef> {
            if i == 0 {
                Ok(ChannelRef::Selected)
            } else {
                resolve(i, config.channels.len(), line, "channel").map(ChannelRef::Channel)
            }
        };
        let list = &mut config.scan_lists[slot];
        list.priority1 = pri1.map(channel_ref).transpose()?;
        list.priority2 = pri2.map(channel_ref).transpose()?;
        list.revert = revert.map(channel_ref).transpose()?;
        list.channels = members
            .into_iter()
            .map(channel_ref)
            .collect::<Result<Vec<_>>>()?;
    } else {
        config.scan_lists.push(ScanList::new(name));
    }
    Ok(())
}

// gps <n>: "<name>" <destination-contact> <period> <revert-channel|->
fn handle_gps(cur: &mut Cursor, config: &mut Config, tables: &mut Tables, link: bool) -> Result<()> {
    let slot = tables.positioning;
    cur.record_index(slot)?;
    tables.positioning += 1;
    let name = cur.string()?;
    let destination = cur.index()?;
    let period = cur.unsigned()? as u32;
    let revert = cur.opt_index()?;
    if link {
        let line = cur.line;
        let PositioningSystem::Gps(target) = &mut config.positioning[slot] else {
            return Err(cur.error("positioning kind changed between passes"));
        };
        target.destination = resolve(destination, config.contacts.len(), line, "contact")?;
        target.revert = revert
            .map(|i| resolve(i, config.channels.len(), line, "channel"))
            .transpose()?;
    } else {
        let mut s = GpsSystem::new(name, 0);
        s.period = period;
        config.positioning.push(PositioningSystem::Gps(s));
    }
    Ok(())
}

// aprs <n>: "<name>" <src CALL-SSID> <dest CALL-SSID> "<path>" <icon>
//           <channel> <period> ["<message>"]
fn handle_aprs(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    stack: &mut IssueStack,
    link: bool,
) -> Result<()> {
    let slot = tables.positioning;
    cur.record_index(slot)?;
    tables.positioning += 1;
    let name = cur.string()?;
    let source = cur.call()?;
    let destination = cur.call()?;
    let path = cur.string()?;
    let icon = cur.keyword()?;
    let channel = cur.index()?;
    let period = cur.unsigned()? as u32;
    let message = if cur.at_end() { None } else { Some(cur.string()?) };
    if link {
        let PositioningSystem::Aprs(target) = &mut config.positioning[slot] else {
            return Err(cur.error("positioning kind changed between passes"));
        };
        target.channel = resolve(channel, config.channels.len(), cur.line, "channel")?;
    } else {
        let mut s = AprsSystem::new(name, 0);
        s.source = source;
        s.destination = destination;
        s.path = path;
        s.icon = match AprsIcon::parse(&icon) {
            Some(icon) => icon,
            None => {
                stack.warn(
                    format!("line {}", cur.line),
                    format!("unknown icon \"{}\", using default", icon),
                );
                AprsIcon::default()
            }
        };
        s.period = period;
        s.message = message;
        config.positioning.push(PositioningSystem::Aprs(s));
    }
    Ok(())
}

// roamingchannel <n>: "<name>" <rx> <tx> <cc|-> <ts|->
fn handle_roaming_channel(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    link: bool,
) -> Result<()> {
    cur.record_index(tables.roaming_channels)?;
    tables.roaming_channels += 1;
    let mut rc = RoamingChannel::new(cur.string()?);
    let rx = cur.number()?;
    rc.rx_frequency = (rx * 1e6).round().max(0.0) as u64;
    rc.tx_frequency = match cur.next_token()? {
        Token::Number(mhz) => (mhz * 1e6).round().max(0.0) as u64,
        Token::Offset(mhz) => {
            (rc.rx_frequency as i64 + (mhz * 1e6).round() as i64).max(0) as u64
        }
        other => return Err(cur.error(format!("expected a frequency, got {:?}", other))),
    };
    rc.color_code = cur.opt_index()?.map(|c| c as u8);
    rc.time_slot = match cur.opt_index()? {
        None => None,
        Some(1) => Some(TimeSlot::Ts1),
        Some(2) => Some(TimeSlot::Ts2),
        Some(n) => return Err(cur.error(format!("invalid time slot {}", n))),
    };
    if !link {
        config.roaming_channels.push(rc);
    }
    Ok(())
}

// roaming <n>: "<name>" <roaming-channel,...>
fn handle_roaming_zone(
    cur: &mut Cursor,
    config: &mut Config,
    tables: &mut Tables,
    link: bool,
) -> Result<()> {
    let slot = tables.roaming_zones;
    cur.record_index(slot)?;
    tables.roaming_zones += 1;
    let name = cur.string()?;
    let members = if cur.at_end() { Vec::new() } else { cur.index_list()? };
    if link {
        config.roaming_zones[slot].channels = members
            .into_iter()
            .map(|i| resolve(i, config.roaming_channels.len(), cur.line, "roaming channel"))
            .collect::<Result<Vec<_>>>()?;
    } else {
        config.roaming_zones.push(RoamingZone::new(name));
    }
    Ok(())
}

/// 1-based file index to 0-based slot index, bounds-checked.
fn resolve(index: i64, len: usize, line: usize, what: &'static str) -> Result<usize> {
    if index >= 1 && (index as usize) <= len {
        Ok(index as usize - 1)
    } else {
        Err(TabularError::Reference { line, what, index })
    }
}

// -- token cursor -----------------------------------------------------------

struct Cursor<'a> {
    line: usize,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a Line) -> Self {
        Self {
            line: line.number,
            tokens: &line.tokens,
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> TabularError {
        TabularError::parse(self.line, message)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Result<&'a Token> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of record"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error(format!("trailing fields: {:?}", &self.tokens[self.pos..])))
        }
    }

    fn colon(&mut self) -> Result<()> {
        match self.next_token()? {
            Token::Colon => Ok(()),
            other => Err(self.error(format!("expected \":\", got {:?}", other))),
        }
    }

    fn keyword(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Keyword(k) => Ok(k.clone()),
            other => Err(self.error(format!("expected a keyword, got {:?}", other))),
        }
    }

    fn string(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Str(s) => Ok(s.clone()),
            other => Err(self.error(format!("expected a quoted string, got {:?}", other))),
        }
    }

    fn number(&mut self) -> Result<f64> {
        match self.next_token()? {
            Token::Number(n) => Ok(*n),
            other => Err(self.error(format!("expected a number, got {:?}", other))),
        }
    }

    fn unsigned(&mut self) -> Result<u64> {
        let n = self.number()?;
        if n.fract() == 0.0 && n >= 0.0 {
            Ok(n as u64)
        } else {
            Err(self.error(format!("expected an unsigned integer, got {}", n)))
        }
    }

    fn index(&mut self) -> Result<i64> {
        let n = self.number()?;
        if n.fract() == 0.0 {
            Ok(n as i64)
        } else {
            Err(self.error(format!("expected an index, got {}", n)))
        }
    }

    /// An index slot that may be `-` for "not set".
    fn opt_index(&mut self) -> Result<Option<i64>> {
        match self.peek() {
            Some(Token::Dash) => {
                self.pos += 1;
                Ok(None)
            }
            _ => self.index().map(Some),
        }
    }

    /// `+` enabled / `-` disabled.
    fn flag(&mut self) -> Result<bool> {
        match self.next_token()? {
            Token::Plus => Ok(true),
            Token::Dash => Ok(false),
            other => Err(self.error(format!("expected \"+\" or \"-\", got {:?}", other))),
        }
    }

    /// Comma-joined index list: `1,2,3`.
    fn index_list(&mut self) -> Result<Vec<i64>> {
        let mut list = vec![self.index()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            list.push(self.index()?);
        }
        Ok(list)
    }

    fn call(&mut self) -> Result<AprsAddress> {
        match self.next_token()? {
            Token::Call { call, ssid } => Ok(AprsAddress::new(call.clone(), *ssid)),
            other => Err(self.error(format!("expected CALL-SSID, got {:?}", other))),
        }
    }

    fn tone(&mut self, stack: &mut IssueStack, link: bool) -> Result<SelectiveCall> {
        match self.next_token()? {
            Token::Dash => Ok(SelectiveCall::None),
            Token::Number(hz) => {
                let hz = *hz as f32;
                if !link && !is_standard_ctcss(hz) {
                    stack.warn(
                        format!("line {}", self.line),
                        format!("{} Hz is not a standard CTCSS tone", hz),
                    );
                }
                Ok(SelectiveCall::ctcss(hz))
            }
            Token::Dcs { octal, inverted } => {
                let code = dcs_from_octal(*octal).map_err(|e| self.error(e.to_string()))?;
                Ok(SelectiveCall::dcs(code, *inverted))
            }
            other => Err(self.error(format!("expected a tone, got {:?}", other))),
        }
    }

    /// The record header `<index>:`, with the index checked against the
    /// table position so records stay consecutively numbered from 1.
    fn record_index(&mut self, expected_slot: usize) -> Result<()> {
        let index = self.index()?;
        self.colon()?;
        if index != expected_slot as i64 + 1 {
            return Err(self.error(format!(
                "expected record index {}, got {} (records must be numbered consecutively)",
                expected_slot + 1,
                index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# tabular sample
version: "0.1.0"
intro1: "dmrconf"
id 1: "DL1XYZ" 2621234
contact 1: group "WW" 91 -
contact 2: private "Op" 2621001 +
grouplist 1: "World" 1
digital 1: "R0 Berlin" 439.575 -7.6 high 0 - 1 1 2 color 1 1 - - 1
analog 2: "Simplex" 145.5 145.5 high 0 - - 1 67.0 i023 wide -
zone 1: "Home" 1,2
scanlist 1: "Scan" 0 - 1 1,2
gps 1: "BM GPS" 1 180 -
aprs 2: "Tracker" DL1XYZ-7 GPSV32-0 "WIDE1-1" jogger 2 300 "on tour"
roamingchannel 1: "R0" 439.575 -7.6 1 -
roaming 1: "All" 1
"#;

    fn read(text: &str) -> (Config, IssueStack) {
        let mut stack = IssueStack::new();
        let config = read_tabular(text, &mut stack).unwrap();
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
    fn test_digital_fields_and_links() {
        let (config, _) = read(SAMPLE);
        let d = config.channels[0].as_digital().unwrap();
        assert_eq!(d.base.rx_frequency, 439_575_000);
        assert_eq!(d.base.tx_frequency, 431_975_000);
        assert_eq!(d.color_code, 1);
        assert_eq!(d.time_slot, TimeSlot::Ts2);
        assert_eq!(d.admit, Admit::ColorCode);
        assert_eq!(d.group_list, Some(0));
        assert_eq!(d.tx_contact, Some(0));
        assert_eq!(d.radio_id, RadioIdRef::Id(0));
        // Forward reference: the scan list record comes later.
        assert_eq!(d.base.scan_list, Some(0));
    }

    #[test]
    fn test_analog_tones() {
        let (config, _) = read(SAMPLE);
        let a = config.channels[1].as_analog().unwrap();
        assert_eq!(a.rx_tone, SelectiveCall::Ctcss(670));
        assert_eq!(a.tx_tone, SelectiveCall::dcs(19, true));
        assert_eq!(a.bandwidth, Bandwidth::Wide);
        assert_eq!(a.squelch, 1);
    }

    #[test]
    fn test_scan_list_sentinels() {
        let (config, _) = read(SAMPLE);
        let s = &config.scan_lists[0];
        assert_eq!(s.priority1, Some(ChannelRef::Selected));
        assert_eq!(s.priority2, None);
        assert_eq!(s.revert, Some(ChannelRef::Channel(0)));
        assert_eq!(s.channels, vec![ChannelRef::Channel(0), ChannelRef::Channel(1)]);
    }

    #[test]
    fn test_zone_and_roaming() {
        let (config, _) = read(SAMPLE);
        assert_eq!(config.zones[0].a, vec![0, 1]);
        assert!(config.zones[0].b.is_empty());
        assert_eq!(config.roaming_zones[0].channels, vec![0]);
        let rc = &config.roaming_channels[0];
        assert_eq!(rc.color_code, Some(1));
        assert_eq!(rc.time_slot, None);
    }

    #[test]
    fn test_zone_with_b_list() {
        let split = SAMPLE.replace("zone 1: \"Home\" 1,2", "zone 1: \"Home\" 1 2,2");
        let (config, _) = read(&split);
        assert_eq!(config.zones[0].a, vec![0]);
        assert_eq!(config.zones[0].b, vec![1, 1]);
    }

    #[test]
    fn test_dangling_index_reports_line() {
        let broken = SAMPLE.replace("grouplist 1: \"World\" 1", "grouplist 1: \"World\" 9");
        let mut stack = IssueStack::new();
        let err = read_tabular(&broken, &mut stack).unwrap_err();
        assert_eq!(
            err,
            TabularError::Reference {
                line: 8,
                what: "contact",
                index: 9
            }
        );
    }

    #[test]
    fn test_non_consecutive_index_rejected() {
        let broken = SAMPLE.replace("contact 2:", "contact 5:");
        let mut stack = IssueStack::new();
        let err = read_tabular(&broken, &mut stack).unwrap_err();
        assert!(matches!(err, TabularError::Parse { line: 7, .. }));
    }

    #[test]
    fn test_gps_links() {
        let (config, _) = read(SAMPLE);
        let g = config.positioning[0].as_gps().unwrap();
        assert_eq!(g.destination, 0);
        assert_eq!(g.period, 180);
        assert_eq!(g.revert, None);
    }

    #[test]
    fn test_aprs_fields_and_link() {
        let (config, _) = read(SAMPLE);
        let a = config.positioning[1].as_aprs().unwrap();
        assert_eq!(a.source, AprsAddress::new("DL1XYZ", 7));
        assert_eq!(a.destination, AprsAddress::new("GPSV32", 0));
        assert_eq!(a.path, "WIDE1-1");
        assert_eq!(a.icon, AprsIcon::Jogger);
        assert_eq!(a.channel, 1);
        assert_eq!(a.period, 300);
        assert_eq!(a.message.as_deref(), Some("on tour"));
    }
}
