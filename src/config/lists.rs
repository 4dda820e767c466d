// List entities: zones, scan lists, RX group lists, roaming zones

use super::refs::ChannelRef;
use serde::{Deserialize, Serialize};

/// A zone: one or two ordered channel lists presented on the radio's
/// VFO A and B.
///
/// List B may be empty, making this a single-list zone. Formats that
/// can only store one list per zone split a two-list zone into a
/// `" A"`/`" B"` record pair and merge it back on decode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub a: Vec<usize>,
    pub b: Vec<usize>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            a: Vec::new(),
            b: Vec::new(),
        }
    }

    pub fn is_split(&self) -> bool {
        !self.b.is_empty()
    }
}

/// A scan list: member channels plus up to two priority channels and a
/// revert (transmit) channel. Each distinguished slot may hold the
/// selected-channel marker instead of a concrete channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanList {
    pub name: String,
    pub channels: Vec<ChannelRef>,
    pub priority1: Option<ChannelRef>,
    pub priority2: Option<ChannelRef>,
    pub revert: Option<ChannelRef>,
}

impl ScanList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
            priority1: None,
            priority2: None,
            revert: None,
        }
    }
}

/// An RX group list: the group calls a digital channel listens for.
///
/// Members are DMR contact slot indices. Non-group-call members are
/// tolerated at the type level; the verifier flags them with a warning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupList {
    pub name: String,
    pub contacts: Vec<usize>,
}

impl GroupList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contacts: Vec::new(),
        }
    }
}

/// A roaming zone: ordered roaming-channel slot indices the radio
/// cycles through to find the best repeater.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoamingZone {
    pub name: String,
    pub channels: Vec<usize>,
}

impl RoamingZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
        }
    }
}
