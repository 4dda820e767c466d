// Radio identity: the DMR ID(s) this radio transmits with

use serde::{Deserialize, Serialize};

/// A named DMR radio ID. Channels that don't pick their own ID use the
/// configuration's default one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioId {
    pub name: String,
    /// DMR ID, 0..=16777215.
    pub id: u32,
}

impl RadioId {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_id() {
        let rid = RadioId::new("DL1XYZ", 2621234);
        assert_eq!(rid.id, 2621234);
        assert_eq!(rid.name, "DL1XYZ");
    }
}
