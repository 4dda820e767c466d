// Analog and digital channel entities
//
// A channel is a closed sum: every dispatch site matches exhaustively
// on `Channel::Analog` / `Channel::Digital` instead of downcasting.

use super::refs::{RadioIdRef, RoamingRef};
use crate::codec::tone::SelectiveCall;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transmit power setting, coarse vendor-neutral steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Power {
    Min,
    Low,
    Mid,
    #[default]
    High,
    Max,
}

impl Power {
    pub fn name(&self) -> &'static str {
        match self {
            Power::Min => "min",
            Power::Low => "low",
            Power::Mid => "mid",
            Power::High => "high",
            Power::Max => "max",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "min" => Some(Power::Min),
            "low" => Some(Power::Low),
            "mid" => Some(Power::Mid),
            "high" => Some(Power::High),
            "max" => Some(Power::Max),
            _ => None,
        }
    }
}

/// Analog channel bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bandwidth {
    #[default]
    Narrow,
    Wide,
}

/// DMR time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeSlot {
    #[default]
    Ts1,
    Ts2,
}

impl TimeSlot {
    pub fn number(&self) -> u8 {
        match self {
            TimeSlot::Ts1 => 1,
            TimeSlot::Ts2 => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(TimeSlot::Ts1),
            2 => Some(TimeSlot::Ts2),
            _ => None,
        }
    }
}

/// Transmit admit criterion for digital channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Admit {
    #[default]
    Always,
    ChannelFree,
    ColorCode,
}

/// Fields shared by analog and digital channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBase {
    pub name: String,
    /// Receive frequency in Hz, stored absolute.
    pub rx_frequency: u64,
    /// Transmit frequency in Hz, stored absolute even when the document
    /// expressed it as an offset.
    pub tx_frequency: u64,
    pub power: Power,
    pub rx_only: bool,
    /// Transmit timeout in seconds, 0 = disabled.
    pub timeout: u32,
    /// Scan list slot index, if assigned.
    pub scan_list: Option<usize>,
}

impl ChannelBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rx_frequency: 0,
            tx_frequency: 0,
            power: Power::default(),
            rx_only: false,
            timeout: 0,
            scan_list: None,
        }
    }
}

/// FM channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogChannel {
    pub base: ChannelBase,
    /// Squelch level 0..=10.
    pub squelch: u8,
    pub rx_tone: SelectiveCall,
    pub tx_tone: SelectiveCall,
    pub bandwidth: Bandwidth,
    /// APRS system slot index (must name an APRS positioning system).
    pub aprs: Option<usize>,
}

impl AnalogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ChannelBase::new(name),
            squelch: 1,
            rx_tone: SelectiveCall::None,
            tx_tone: SelectiveCall::None,
            bandwidth: Bandwidth::default(),
            aprs: None,
        }
    }
}

/// DMR channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalChannel {
    pub base: ChannelBase,
    /// Color code 1..=16 (0 tolerated on decode, radios emit it).
    pub color_code: u8,
    pub time_slot: TimeSlot,
    pub admit: Admit,
    /// RX group list slot index. Absent is tolerated as "unset" even
    /// though a functional channel wants one.
    pub group_list: Option<usize>,
    /// Default TX contact slot index.
    pub tx_contact: Option<usize>,
    /// GPS/APRS positioning system slot index.
    pub gps_system: Option<usize>,
    pub roaming: Option<RoamingRef>,
    pub radio_id: RadioIdRef,
}

impl DigitalChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ChannelBase::new(name),
            color_code: 1,
            time_slot: TimeSlot::default(),
            admit: Admit::default(),
            group_list: None,
            tx_contact: None,
            gps_system: None,
            roaming: None,
            radio_id: RadioIdRef::Default,
        }
    }
}

/// A channel of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Channel {
    Analog(AnalogChannel),
    Digital(DigitalChannel),
}

impl Channel {
    pub fn base(&self) -> &ChannelBase {
        match self {
            Channel::Analog(c) => &c.base,
            Channel::Digital(c) => &c.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ChannelBase {
        match self {
            Channel::Analog(c) => &mut c.base,
            Channel::Digital(c) => &mut c.base,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn is_digital(&self) -> bool {
        matches!(self, Channel::Digital(_))
    }

    pub fn as_digital(&self) -> Option<&DigitalChannel> {
        match self {
            Channel::Digital(c) => Some(c),
            Channel::Analog(_) => None,
        }
    }

    pub fn as_analog(&self) -> Option<&AnalogChannel> {
        match self {
            Channel::Analog(c) => Some(c),
            Channel::Digital(_) => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Channel::Analog(_) => "analog",
            Channel::Digital(_) => "digital",
        };
        write!(
            f,
            "{} channel \"{}\" ({:.5} MHz)",
            kind,
            self.name(),
            self.base().rx_frequency as f64 / 1e6
        )
    }
}

/// A partial-override record used inside roaming zones.
///
/// Frequencies are always overridden; color code and time slot each
/// carry their own override flag. Everything else is inherited from the
/// channel the radio is currently on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoamingChannel {
    pub name: String,
    pub rx_frequency: u64,
    pub tx_frequency: u64,
    pub color_code: Option<u8>,
    pub time_slot: Option<TimeSlot>,
}

impl RoamingChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rx_frequency: 0,
            tx_frequency: 0,
            color_code: None,
            time_slot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_dispatch() {
        let a = Channel::Analog(AnalogChannel::new("FM 1"));
        let d = Channel::Digital(DigitalChannel::new("DMR 1"));
        assert!(!a.is_digital());
        assert!(d.is_digital());
        assert!(a.as_analog().is_some());
        assert!(a.as_digital().is_none());
        assert_eq!(d.name(), "DMR 1");
    }

    #[test]
    fn test_time_slot_numbers() {
        assert_eq!(TimeSlot::Ts1.number(), 1);
        assert_eq!(TimeSlot::from_number(2), Some(TimeSlot::Ts2));
        assert_eq!(TimeSlot::from_number(3), None);
    }

    #[test]
    fn test_power_parse() {
        assert_eq!(Power::parse("high"), Some(Power::High));
        assert_eq!(Power::parse("huge"), None);
    }

    #[test]
    fn test_roaming_channel_overrides() {
        let mut rc = RoamingChannel::new("R1");
        rc.rx_frequency = 439_575_000;
        rc.tx_frequency = 431_975_000;
        assert_eq!(rc.color_code, None); // inherited
        rc.color_code = Some(1); // overridden
        assert_eq!(rc.time_slot, None);
    }
}
