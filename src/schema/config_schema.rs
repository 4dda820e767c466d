// The fixed grammar of the configuration document
//
// Not user-extensible: extension readers hang off recognized top-level
// keys, unknown keys warn. Field names here are authoritative -- the
// reader looks values up under exactly these keys.

use super::SchemaNode;

const ID_RANGE: SchemaNode = SchemaNode::Int {
    min: 0,
    max: 16_777_215,
};

static RADIO_ID: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("number", ID_RANGE),
    ],
    mandatory: &["id", "number"],
};

static ANALOG_CHANNEL: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("rx", SchemaNode::Freq),
        ("tx", SchemaNode::Freq),
        ("power", SchemaNode::Enum(&["min", "low", "mid", "high", "max"])),
        ("timeout", SchemaNode::Int { min: 0, max: 3825 }),
        ("rx-only", SchemaNode::Bool),
        ("scan-list", SchemaNode::Ref),
        ("squelch", SchemaNode::Int { min: 0, max: 10 }),
        ("rx-tone", SchemaNode::Tone),
        ("tx-tone", SchemaNode::Tone),
        ("bandwidth", SchemaNode::Enum(&["narrow", "wide"])),
        ("aprs", SchemaNode::Ref),
    ],
    mandatory: &["id", "name", "rx"],
};

static DIGITAL_CHANNEL: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("rx", SchemaNode::Freq),
        ("tx", SchemaNode::Freq),
        ("power", SchemaNode::Enum(&["min", "low", "mid", "high", "max"])),
        ("timeout", SchemaNode::Int { min: 0, max: 3825 }),
        ("rx-only", SchemaNode::Bool),
        ("scan-list", SchemaNode::Ref),
        ("color-code", SchemaNode::Int { min: 0, max: 16 }),
        ("time-slot", SchemaNode::Enum(&["TS1", "TS2"])),
        ("admit", SchemaNode::Enum(&["always", "free", "color-code"])),
        ("group-list", SchemaNode::Ref),
        ("contact", SchemaNode::Ref),
        ("gps", SchemaNode::Ref),
        ("roaming", SchemaNode::Ref),
        ("radio-id", SchemaNode::Ref),
    ],
    mandatory: &["id", "name", "rx"],
};

static CHANNEL: SchemaNode = SchemaNode::Dispatch(&[
    ("analog", &ANALOG_CHANNEL),
    ("digital", &DIGITAL_CHANNEL),
]);

const REF_LIST: SchemaNode = SchemaNode::List {
    of: &SchemaNode::Ref,
    non_empty: false,
};

static ZONE: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("A", SchemaNode::List { of: &SchemaNode::Ref, non_empty: true }),
        ("B", REF_LIST),
    ],
    mandatory: &["id", "name", "A"],
};

static SCAN_LIST: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("channels", REF_LIST),
        ("priority1", SchemaNode::Ref),
        ("priority2", SchemaNode::Ref),
        ("revert", SchemaNode::Ref),
    ],
    mandatory: &["id", "name"],
};

static DMR_CONTACT: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("number", ID_RANGE),
        ("ring", SchemaNode::Bool),
    ],
    mandatory: &["id", "name", "number"],
};

static ALL_CONTACT: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        // The all-call number is fixed; tolerated on input, ignored.
        ("number", ID_RANGE),
        ("ring", SchemaNode::Bool),
    ],
    mandatory: &["id", "name"],
};

static DTMF_CONTACT: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("number", SchemaNode::Str),
    ],
    mandatory: &["id", "name", "number"],
};

static CONTACT: SchemaNode = SchemaNode::Dispatch(&[
    ("private", &DMR_CONTACT),
    ("group", &DMR_CONTACT),
    ("all", &ALL_CONTACT),
    ("dtmf", &DTMF_CONTACT),
]);

static GROUP_LIST: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        (
            "contacts",
            SchemaNode::List { of: &SchemaNode::Ref, non_empty: true },
        ),
    ],
    mandatory: &["id", "name", "contacts"],
};

static GPS_SYSTEM: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("destination", SchemaNode::Ref),
        ("revert", SchemaNode::Ref),
        ("period", SchemaNode::Int { min: 1, max: 65535 }),
    ],
    mandatory: &["id", "name", "destination"],
};

static APRS_SYSTEM: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("source", SchemaNode::Str),
        ("destination", SchemaNode::Str),
        ("path", SchemaNode::Str),
        ("icon", SchemaNode::Str),
        ("message", SchemaNode::Str),
        ("channel", SchemaNode::Ref),
        ("period", SchemaNode::Int { min: 1, max: 65535 }),
    ],
    mandatory: &["id", "name", "source", "channel"],
};

static POSITIONING: SchemaNode = SchemaNode::Dispatch(&[
    ("dmr", &GPS_SYSTEM),
    ("aprs", &APRS_SYSTEM),
]);

static ROAMING_CHANNEL: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("rx", SchemaNode::Freq),
        ("tx", SchemaNode::Freq),
        ("color-code", SchemaNode::Int { min: 1, max: 16 }),
        ("time-slot", SchemaNode::Enum(&["TS1", "TS2"])),
    ],
    mandatory: &["id", "name", "rx", "tx"],
};

static ROAMING_ZONE: SchemaNode = SchemaNode::Object {
    fields: &[
        ("id", SchemaNode::Id),
        ("name", SchemaNode::Str),
        ("channels", REF_LIST),
    ],
    mandatory: &["id", "name"],
};

static DOCUMENT: SchemaNode = SchemaNode::Object {
    fields: &[
        ("version", SchemaNode::Str),
        ("intro-line1", SchemaNode::Str),
        ("intro-line2", SchemaNode::Str),
        ("radio-ids", SchemaNode::List { of: &RADIO_ID, non_empty: false }),
        ("channels", SchemaNode::List { of: &CHANNEL, non_empty: false }),
        ("zones", SchemaNode::List { of: &ZONE, non_empty: false }),
        ("scan-lists", SchemaNode::List { of: &SCAN_LIST, non_empty: false }),
        ("contacts", SchemaNode::List { of: &CONTACT, non_empty: false }),
        ("group-lists", SchemaNode::List { of: &GROUP_LIST, non_empty: false }),
        ("positioning", SchemaNode::List { of: &POSITIONING, non_empty: false }),
        (
            "roaming-channels",
            SchemaNode::List { of: &ROAMING_CHANNEL, non_empty: false },
        ),
        ("roaming", SchemaNode::List { of: &ROAMING_ZONE, non_empty: false }),
    ],
    mandatory: &[],
};

/// The schema of a complete configuration document.
pub fn document_schema() -> &'static SchemaNode {
    &DOCUMENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::verify_document;
    use crate::verify::IssueStack;

    const SAMPLE: &str = r#"
version: "0.1.0"
intro-line1: "dmrconf"
radio-ids:
  - {id: rid1, name: DL1XYZ, number: 2621234}
contacts:
  - group: {id: tg91, name: "WW", number: 91}
  - private: {id: op1, name: "Op", number: 2621001, ring: true}
  - all: {id: everyone, name: "All Call"}
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
  - analog:
      id: ch2
      name: "Simplex"
      rx: 145.500
      rx-tone: 67.0
zones:
  - {id: zone1, name: "Home", A: [ch1, ch2]}
scan-lists:
  - {id: scan1, name: "Scan", channels: [ch1, ch2], priority1: !selected }
"#;

    #[test]
    fn test_sample_document_verifies() {
        let value: serde_yaml::Value = serde_yaml::from_str(SAMPLE).unwrap();
        let mut stack = IssueStack::new();
        let ids = verify_document(document_schema(), &value, &mut stack).unwrap();
        assert!(ids.contains("ch1"));
        assert!(ids.contains("scan1"));
        assert!(stack.is_empty(), "{:?}", stack.issues());
    }

    #[test]
    fn test_dangling_scan_list_detected() {
        let broken = SAMPLE.replace("scan-list: scan1", "scan-list: nosuch");
        let value: serde_yaml::Value = serde_yaml::from_str(&broken).unwrap();
        let mut stack = IssueStack::new();
        let err = verify_document(document_schema(), &value, &mut stack).unwrap_err();
        assert!(err.to_string().contains("nosuch"));
    }
}
