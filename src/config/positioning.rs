// Positioning systems: DMR GPS reporting and analog APRS

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a DMR GPS system sends its position reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsSystem {
    pub name: String,
    /// Destination contact slot index (a DMR contact).
    pub destination: usize,
    /// Revert channel slot index (a digital channel); `None` transmits
    /// on the current channel.
    pub revert: Option<usize>,
    /// Update period in seconds.
    pub period: u32,
}

impl GpsSystem {
    pub fn new(name: impl Into<String>, destination: usize) -> Self {
        Self {
            name: name.into(),
            destination,
            revert: None,
            period: 300,
        }
    }
}

/// Callsign + SSID pair as used in APRS addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AprsAddress {
    pub call: String,
    pub ssid: u8,
}

impl AprsAddress {
    pub fn new(call: impl Into<String>, ssid: u8) -> Self {
        Self {
            call: call.into(),
            ssid,
        }
    }

    /// Parse `"CALL-SSID"`; a missing SSID part means SSID 0.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        match s.rsplit_once('-') {
            Some((call, ssid)) => {
                let ssid: u8 = ssid.parse().ok()?;
                if call.is_empty() || ssid > 15 {
                    return None;
                }
                Some(Self::new(call, ssid))
            }
            None => Some(Self::new(s, 0)),
        }
    }
}

impl fmt::Display for AprsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.call, self.ssid)
    }
}

/// Analog APRS beacon system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AprsSystem {
    pub name: String,
    pub source: AprsAddress,
    pub destination: AprsAddress,
    /// Digipeater path, e.g. `"WIDE1-1,WIDE2-1"`.
    pub path: String,
    /// APRS symbol table/code pair packed as an icon selector.
    pub icon: AprsIcon,
    pub message: Option<String>,
    /// Transmit channel slot index (an analog channel).
    pub channel: usize,
    /// Update period in seconds.
    pub period: u32,
}

impl AprsSystem {
    pub fn new(name: impl Into<String>, channel: usize) -> Self {
        Self {
            name: name.into(),
            source: AprsAddress::new("N0CALL", 0),
            destination: AprsAddress::new("WIDE", 0),
            path: String::new(),
            icon: AprsIcon::default(),
            message: None,
            channel,
            period: 300,
        }
    }
}

/// Common APRS map icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AprsIcon {
    #[default]
    Jogger,
    Car,
    Home,
    Bicycle,
    Motorcycle,
    Truck,
    Boat,
    Balloon,
    Aircraft,
    Jeep,
    RecreationalVehicle,
}

impl AprsIcon {
    pub fn name(&self) -> &'static str {
        match self {
            AprsIcon::Jogger => "jogger",
            AprsIcon::Car => "car",
            AprsIcon::Home => "home",
            AprsIcon::Bicycle => "bicycle",
            AprsIcon::Motorcycle => "motorcycle",
            AprsIcon::Truck => "truck",
            AprsIcon::Boat => "boat",
            AprsIcon::Balloon => "balloon",
            AprsIcon::Aircraft => "aircraft",
            AprsIcon::Jeep => "jeep",
            AprsIcon::RecreationalVehicle => "rv",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jogger" => Some(AprsIcon::Jogger),
            "car" => Some(AprsIcon::Car),
            "home" => Some(AprsIcon::Home),
            "bicycle" => Some(AprsIcon::Bicycle),
            "motorcycle" => Some(AprsIcon::Motorcycle),
            "truck" => Some(AprsIcon::Truck),
            "boat" => Some(AprsIcon::Boat),
            "balloon" => Some(AprsIcon::Balloon),
            "aircraft" => Some(AprsIcon::Aircraft),
            "jeep" => Some(AprsIcon::Jeep),
            "rv" => Some(AprsIcon::RecreationalVehicle),
            _ => None,
        }
    }
}

/// A positioning system of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositioningSystem {
    Gps(GpsSystem),
    Aprs(AprsSystem),
}

impl PositioningSystem {
    pub fn name(&self) -> &str {
        match self {
            PositioningSystem::Gps(s) => &s.name,
            PositioningSystem::Aprs(s) => &s.name,
        }
    }

    pub fn period(&self) -> u32 {
        match self {
            PositioningSystem::Gps(s) => s.period,
            PositioningSystem::Aprs(s) => s.period,
        }
    }

    pub fn as_gps(&self) -> Option<&GpsSystem> {
        match self {
            PositioningSystem::Gps(s) => Some(s),
            PositioningSystem::Aprs(_) => None,
        }
    }

    pub fn as_aprs(&self) -> Option<&AprsSystem> {
        match self {
            PositioningSystem::Aprs(s) => Some(s),
            PositioningSystem::Gps(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aprs_address_display() {
        assert_eq!(AprsAddress::new("DL1XYZ", 7).to_string(), "DL1XYZ-7");
    }

    #[test]
    fn test_aprs_address_parse() {
        assert_eq!(
            AprsAddress::parse("DL1XYZ-7"),
            Some(AprsAddress::new("DL1XYZ", 7))
        );
        assert_eq!(AprsAddress::parse("WIDE1"), Some(AprsAddress::new("WIDE1", 0)));
        assert_eq!(AprsAddress::parse(""), None);
        assert_eq!(AprsAddress::parse("DL1XYZ-99"), None);
    }

    #[test]
    fn test_icon_names_roundtrip() {
        assert_eq!(AprsIcon::parse("car"), Some(AprsIcon::Car));
        assert_eq!(AprsIcon::parse(AprsIcon::Boat.name()), Some(AprsIcon::Boat));
        assert_eq!(AprsIcon::parse("spaceship"), None);
    }

    #[test]
    fn test_positioning_dispatch() {
        let gps = PositioningSystem::Gps(GpsSystem::new("BM GPS", 0));
        assert!(gps.as_gps().is_some());
        assert!(gps.as_aprs().is_none());
        assert_eq!(gps.period(), 300);
    }
}
