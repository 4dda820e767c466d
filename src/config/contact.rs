// Contact entities: DMR calls and DTMF numbers

use serde::{Deserialize, Serialize};
use std::fmt;

/// The DMR all-call destination ID. Fixed by the protocol; an all-call
/// contact carries this number no matter what the input said.
pub const ALL_CALL_ID: u32 = 16_777_215;

/// Kind of a DMR call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Private,
    Group,
    All,
}

/// A DMR contact: a private, group or all call destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmrContact {
    pub name: String,
    pub kind: CallKind,
    /// DMR ID, 0..=16777215. Forced to [`ALL_CALL_ID`] for all calls.
    pub id: u32,
    pub ring: bool,
}

impl DmrContact {
    pub fn new(kind: CallKind, name: impl Into<String>, id: u32) -> Self {
        let id = match kind {
            CallKind::All => ALL_CALL_ID,
            _ => id,
        };
        Self {
            name: name.into(),
            kind,
            id,
            ring: false,
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == CallKind::Group
    }
}

/// A DTMF contact: a digit string dialed on analog channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtmfContact {
    pub name: String,
    /// Digits 0-9, A-D, `*`, `#`.
    pub number: String,
}

impl DtmfContact {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }

    /// All characters are valid DTMF symbols.
    pub fn is_valid(&self) -> bool {
        !self.number.is_empty()
            && self
                .number
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='D').contains(&c) || c == '*' || c == '#')
    }
}

/// A contact of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Contact {
    Dmr(DmrContact),
    Dtmf(DtmfContact),
}

impl Contact {
    pub fn name(&self) -> &str {
        match self {
            Contact::Dmr(c) => &c.name,
            Contact::Dtmf(c) => &c.name,
        }
    }

    pub fn as_dmr(&self) -> Option<&DmrContact> {
        match self {
            Contact::Dmr(c) => Some(c),
            Contact::Dtmf(_) => None,
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contact::Dmr(c) => {
                let kind = match c.kind {
                    CallKind::Private => "private",
                    CallKind::Group => "group",
                    CallKind::All => "all",
                };
                write!(f, "{} call \"{}\" ({})", kind, c.name, c.id)
            }
            Contact::Dtmf(c) => write!(f, "DTMF \"{}\" ({})", c.name, c.number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_call_id_pinned() {
        // The input ID is ignored for all calls.
        let c = DmrContact::new(CallKind::All, "Everyone", 1234);
        assert_eq!(c.id, ALL_CALL_ID);

        let p = DmrContact::new(CallKind::Private, "Op", 1234);
        assert_eq!(p.id, 1234);
    }

    #[test]
    fn test_dtmf_validation() {
        assert!(DtmfContact::new("Gate", "1234*#").is_valid());
        assert!(DtmfContact::new("Relay", "0A9D").is_valid());
        assert!(!DtmfContact::new("Bad", "12E4").is_valid());
        assert!(!DtmfContact::new("Empty", "").is_valid());
    }

    #[test]
    fn test_contact_dispatch() {
        let c = Contact::Dmr(DmrContact::new(CallKind::Group, "TG91", 91));
        assert!(c.as_dmr().is_some());
        assert!(c.as_dmr().is_some_and(|d| d.is_group()));
        assert_eq!(c.name(), "TG91");
    }
}
