// Vendor-neutral configuration object graph
//
// The `Config` aggregate owns every entity; all cross references are
// slot indices into its collections and must resolve inside the same
// instance. Dangling references are a verification finding, never a
// crash: `verify` walks the whole graph and accumulates findings.

pub mod channel;
pub mod contact;
pub mod lists;
pub mod positioning;
pub mod radioid;
pub mod refs;

pub use channel::{
    Admit, AnalogChannel, Bandwidth, Channel, ChannelBase, DigitalChannel, Power, RoamingChannel,
    TimeSlot,
};
pub use contact::{CallKind, Contact, DmrContact, DtmfContact, ALL_CALL_ID};
pub use lists::{GroupList, RoamingZone, ScanList, Zone};
pub use positioning::{AprsAddress, AprsIcon, AprsSystem, GpsSystem, PositioningSystem};
pub use radioid::RadioId;
pub use refs::{ChannelRef, RadioIdRef, RoamingRef};

use crate::verify::IssueStack;
use serde::{Deserialize, Serialize};

/// Settings without a structured home: boot text and format version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    pub intro_line1: String,
    pub intro_line2: String,
}

/// The root aggregate owning all configuration entities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    pub settings: Settings,
    pub radio_ids: Vec<RadioId>,
    /// Index into `radio_ids` of the default ID; the first added one
    /// unless set explicitly.
    pub default_radio_id: Option<usize>,
    pub channels: Vec<Channel>,
    pub contacts: Vec<Contact>,
    pub group_lists: Vec<GroupList>,
    pub zones: Vec<Zone>,
    pub scan_lists: Vec<ScanList>,
    pub positioning: Vec<PositioningSystem>,
    pub roaming_channels: Vec<RoamingChannel>,
    pub roaming_zones: Vec<RoamingZone>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a radio ID; the first one becomes the default.
    pub fn add_radio_id(&mut self, id: RadioId) -> usize {
        self.radio_ids.push(id);
        let index = self.radio_ids.len() - 1;
        if self.default_radio_id.is_none() {
            self.default_radio_id = Some(index);
        }
        index
    }

    /// The default radio ID, if any is configured.
    pub fn default_radio_id(&self) -> Option<&RadioId> {
        self.default_radio_id.and_then(|i| self.radio_ids.get(i))
    }

    /// Resolve a radio-ID reference against this configuration.
    pub fn resolve_radio_id(&self, r: RadioIdRef) -> Option<&RadioId> {
        match r {
            RadioIdRef::Default => self.default_radio_id(),
            RadioIdRef::Id(i) => self.radio_ids.get(i),
        }
    }

    /// Slot index of a DMR contact by its DMR ID and group flag; vendor
    /// codecs use this when building index-based contact fields.
    pub fn index_of_dmr_contact(&self, id: u32, group: bool) -> Option<usize> {
        self.contacts.iter().position(|c| match c {
            Contact::Dmr(d) => d.id == id && d.is_group() == group,
            Contact::Dtmf(_) => false,
        })
    }

    /// Walk the whole graph and record every referential-integrity
    /// finding. Dangling or wrongly-typed references are critical;
    /// questionable but workable constructs are warnings.
    pub fn verify(&self, stack: &mut IssueStack) {
        self.verify_channels(stack);
        self.verify_lists(stack);
        self.verify_positioning(stack);

        if self.default_radio_id.is_some_and(|i| i >= self.radio_ids.len()) {
            stack.critical("radio-ids", "default radio ID index out of range");
        }
    }

    fn verify_channels(&self, stack: &mut IssueStack) {
        for (i, channel) in self.channels.iter().enumerate() {
            let loc = format!("channels[{}]", i);
            if let Some(s) = channel.base().scan_list {
                if s >= self.scan_lists.len() {
                    stack.critical(&loc, format!("scan list {} does not exist", s));
                }
            }
            match channel {
                Channel::Analog(a) => {
                    if let Some(p) = a.aprs {
                        match self.positioning.get(p) {
                            None => stack.critical(&loc, format!("APRS system {} does not exist", p)),
                            Some(PositioningSystem::Gps(_)) => stack.critical(
                                &loc,
                                format!("positioning system {} is not an APRS system", p),
                            ),
                            Some(PositioningSystem::Aprs(_)) => {}
                        }
                    }
                }
                Channel::Digital(d) => {
                    if let Some(g) = d.group_list {
                        if g >= self.group_lists.len() {
                            stack.critical(&loc, format!("group list {} does not exist", g));
                        }
                    } else {
                        stack.hint(&loc, "digital channel has no RX group list");
                    }
                    if let Some(c) = d.tx_contact {
                        if c >= self.contacts.len() {
                            stack.critical(&loc, format!("TX contact {} does not exist", c));
                        }
                    }
                    if let Some(g) = d.gps_system {
                        if g >= self.positioning.len() {
                            stack.critical(&loc, format!("positioning system {} does not exist", g));
                        }
                    }
                    if let Some(RoamingRef::Zone(z)) = d.roaming {
                        if z >= self.roaming_zones.len() {
                            stack.critical(&loc, format!("roaming zone {} does not exist", z));
                        }
                    }
                    if let RadioIdRef::Id(r) = d.radio_id {
                        if r >= self.radio_ids.len() {
                            stack.critical(&loc, format!("radio ID {} does not exist", r));
                        }
                    }
                    if d.color_code > 16 {
                        stack.critical(&loc, format!("color code {} out of range", d.color_code));
                    }
                }
            }
        }
    }

    fn verify_lists(&self, stack: &mut IssueStack) {
        for (i, zone) in self.zones.iter().enumerate() {
            let loc = format!("zones[{}]", i);
            for &c in zone.a.iter().chain(zone.b.iter()) {
                if c >= self.channels.len() {
                    stack.critical(&loc, format!("channel {} does not exist", c));
                }
            }
            if zone.a.is_empty() {
                stack.warn(&loc, "zone has an empty A list");
            }
        }

        for (i, list) in self.scan_lists.iter().enumerate() {
            let loc = format!("scan-lists[{}]", i);
            let slots = list
                .channels
                .iter()
                .chain(list.priority1.iter())
                .chain(list.priority2.iter())
                .chain(list.revert.iter());
            for r in slots {
                if let Some(c) = r.index() {
                    if c >= self.channels.len() {
                        stack.critical(&loc, format!("channel {} does not exist", c));
                    }
                }
            }
        }

        for (i, list) in self.group_lists.iter().enumerate() {
            let loc = format!("group-lists[{}]", i);
            for &c in &list.contacts {
                match self.contacts.get(c) {
                    None => stack.critical(&loc, format!("contact {} does not exist", c)),
                    Some(Contact::Dtmf(_)) => {
                        stack.critical(&loc, format!("contact {} is not a DMR contact", c))
                    }
                    Some(Contact::Dmr(d)) if !d.is_group() => {
                        stack.warn(&loc, format!("contact {} is not a group call", c))
                    }
                    Some(Contact::Dmr(_)) => {}
                }
            }
        }

        for (i, zone) in self.roaming_zones.iter().enumerate() {
            let loc = format!("roaming[{}]", i);
            for &c in &zone.channels {
                if c >= self.roaming_channels.len() {
                    stack.critical(&loc, format!("roaming channel {} does not exist", c));
                }
            }
        }
    }

    fn verify_positioning(&self, stack: &mut IssueStack) {
        for (i, sys) in self.positioning.iter().enumerate() {
            let loc = format!("positioning[{}]", i);
            match sys {
                PositioningSystem::Gps(g) => {
                    match self.contacts.get(g.destination) {
                        None => stack.critical(
                            &loc,
                            format!("destination contact {} does not exist", g.destination),
                        ),
                        Some(Contact::Dtmf(_)) => stack.critical(
                            &loc,
                            format!("destination contact {} is not a DMR contact", g.destination),
                        ),
                        Some(Contact::Dmr(_)) => {}
                    }
                    if let Some(r) = g.revert {
                        match self.channels.get(r) {
                            None => stack
                                .critical(&loc, format!("revert channel {} does not exist", r)),
                            Some(Channel::Analog(_)) => stack.critical(
                                &loc,
                                format!("revert channel {} is not a digital channel", r),
                            ),
                            Some(Channel::Digital(_)) => {}
                        }
                    }
                }
                PositioningSystem::Aprs(a) => match self.channels.get(a.channel) {
                    None => {
                        stack.critical(&loc, format!("TX channel {} does not exist", a.channel))
                    }
                    Some(Channel::Digital(_)) => stack.critical(
                        &loc,
                        format!("TX channel {} is not an analog channel", a.channel),
                    ),
                    Some(Channel::Analog(_)) => {}
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Severity;

    fn sample_config() -> Config {
        let mut config = Config::new();
        config.add_radio_id(RadioId::new("DL1XYZ", 2621234));
        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Group, "TG91", 91)));
        let mut gl = GroupList::new("World");
        gl.contacts.push(0);
        config.group_lists.push(gl);

        let mut dc = DigitalChannel::new("R0 Berlin");
        dc.base.rx_frequency = 439_575_000;
        dc.base.tx_frequency = 431_975_000;
        dc.group_list = Some(0);
        dc.tx_contact = Some(0);
        config.channels.push(Channel::Digital(dc));
        config
    }

    #[test]
    fn test_first_radio_id_is_default() {
        let mut config = Config::new();
        config.add_radio_id(RadioId::new("A", 1));
        config.add_radio_id(RadioId::new("B", 2));
        assert_eq!(config.default_radio_id, Some(0));
        assert_eq!(config.default_radio_id().map(|r| r.id), Some(1));
        assert_eq!(
            config.resolve_radio_id(RadioIdRef::Id(1)).map(|r| r.id),
            Some(2)
        );
    }

    #[test]
    fn test_verify_clean_config() {
        let config = sample_config();
        let mut stack = IssueStack::new();
        config.verify(&mut stack);
        assert!(!stack.has_critical(), "{:?}", stack.issues());
    }

    #[test]
    fn test_verify_dangling_reference() {
        let mut config = sample_config();
        if let Channel::Digital(d) = &mut config.channels[0] {
            d.tx_contact = Some(99);
        }
        let mut stack = IssueStack::new();
        config.verify(&mut stack);
        assert!(stack.has_critical());
        assert!(stack
            .iter()
            .any(|i| i.location == "channels[0]" && i.message.contains("99")));
    }

    #[test]
    fn test_verify_wrong_target_type() {
        let mut config = sample_config();
        config
            .contacts
            .push(Contact::Dtmf(DtmfContact::new("Gate", "123")));
        config.group_lists[0].contacts.push(1);
        let mut stack = IssueStack::new();
        config.verify(&mut stack);
        assert!(stack.has_critical());
    }

    #[test]
    fn test_group_list_private_call_is_warning() {
        let mut config = sample_config();
        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Private, "Op", 262)));
        config.group_lists[0].contacts.push(1);
        let mut stack = IssueStack::new();
        config.verify(&mut stack);
        assert!(!stack.has_critical());
        assert_eq!(stack.max_severity(), Some(Severity::Warning));
    }

    #[test]
    fn test_index_of_dmr_contact() {
        let config = sample_config();
        assert_eq!(config.index_of_dmr_contact(91, true), Some(0));
        assert_eq!(config.index_of_dmr_contact(91, false), None);
    }
}
