// Typed cross-references between configuration entities
//
// In memory, entities reference each other by slot index into the
// owning `Config`'s collections; symbolic IDs exist only in the
// document layer. Fields that may alternatively point at a
// radio-managed default carry that sentinel explicitly in the type, so
// encoders match on it instead of comparing marker pointers.

use serde::{Deserialize, Serialize};

/// Reference to a channel, or the "currently selected channel" marker.
///
/// Scan lists use the marker in their priority/revert slots; vendor
/// formats encode it as a reserved index (0 or 0xffff depending on the
/// family), never as a real channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelRef {
    Selected,
    Channel(usize),
}

impl ChannelRef {
    pub fn index(&self) -> Option<usize> {
        match self {
            ChannelRef::Selected => None,
            ChannelRef::Channel(i) => Some(*i),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, ChannelRef::Selected)
    }
}

/// Reference to a radio ID, or the configuration's default ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RadioIdRef {
    #[default]
    Default,
    Id(usize),
}

impl RadioIdRef {
    pub fn index(&self) -> Option<usize> {
        match self {
            RadioIdRef::Default => None,
            RadioIdRef::Id(i) => Some(*i),
        }
    }
}

/// Reference to a roaming zone, or the radio's default roaming setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoamingRef {
    Default,
    Zone(usize),
}

impl RoamingRef {
    pub fn index(&self) -> Option<usize> {
        match self {
            RoamingRef::Default => None,
            RoamingRef::Zone(i) => Some(*i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ref() {
        assert!(ChannelRef::Selected.is_selected());
        assert_eq!(ChannelRef::Selected.index(), None);
        assert_eq!(ChannelRef::Channel(3).index(), Some(3));
    }

    #[test]
    fn test_default_sentinels() {
        assert_eq!(RadioIdRef::default(), RadioIdRef::Default);
        assert_eq!(RoamingRef::Default.index(), None);
        assert_eq!(RoamingRef::Zone(1).index(), Some(1));
    }
}
