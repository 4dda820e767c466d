// Declarative document grammar and two-pass verifier
//
// The textual configuration is validated before anything is parsed
// into entities. A schema is a tree of composable node types; the
// verifier walks the document twice: the form pass checks shape,
// ranges and ID uniqueness while collecting every declared ID, then
// the reference pass checks that every `Ref` names a collected ID.
// The split is what makes forward references legal -- a reference may
// point at an ID declared later in document order.

use crate::verify::IssueStack;
use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use thiserror::Error;

lazy_static! {
    static ref ID_PATTERN: Regex = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("{path}: expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path}: value {value} out of range {min}..={max}")]
    OutOfRange {
        path: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("{path}: missing mandatory keys: {keys}")]
    MissingMandatory { path: String, keys: String },

    #[error("{path}: \"{value}\" is not one of {allowed}")]
    BadEnum {
        path: String,
        value: String,
        allowed: String,
    },

    #[error("{path}: \"{id}\" is not a valid identifier")]
    BadId { path: String, id: String },

    #[error("{path}: duplicate identifier \"{id}\" (first declared at {first})")]
    DuplicateId {
        path: String,
        id: String,
        first: String,
    },

    #[error("{path}: reference to undefined identifier \"{id}\"")]
    UndefinedRef { path: String, id: String },

    #[error("{path}: dispatch node must have exactly one key")]
    BadDispatch { path: String },

    #[error("{path}: unknown dispatch key \"{key}\"")]
    UnknownDispatch { path: String, key: String },

    #[error("{path}: list must not be empty")]
    EmptyList { path: String },
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Declared IDs collected during the form pass, keyed to the path of
/// their declaration.
#[derive(Debug, Default, Clone)]
pub struct IdRegistry {
    ids: HashMap<String, String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: &str, path: &str) -> Result<()> {
        if !ID_PATTERN.is_match(id) {
            return Err(SchemaError::BadId {
                path: path.to_string(),
                id: id.to_string(),
            });
        }
        if let Some(first) = self.ids.get(id) {
            return Err(SchemaError::DuplicateId {
                path: path.to_string(),
                id: id.to_string(),
                first: first.clone(),
            });
        }
        self.ids.insert(id.to_string(), path.to_string());
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One node type of the document grammar.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Bool,
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Str,
    /// Unique identifier declaration; registers itself in the form pass.
    Id,
    /// Symbolic reference; checked for existence in the reference pass
    /// only. Sentinel tags (`!selected`, `!default`) are always valid.
    Ref,
    Enum(&'static [&'static str]),
    /// Frequency scalar: a number in MHz or a string, optionally signed
    /// (`"+0.6"`) where an offset is meaningful.
    Freq,
    /// Sub-audible tone scalar: a CTCSS frequency number or a DCS code
    /// string (`n023` / `i023`), or null for none.
    Tone,
    Object {
        fields: &'static [(&'static str, SchemaNode)],
        mandatory: &'static [&'static str],
    },
    /// Tagged union: exactly one key selecting a sub-schema.
    Dispatch(&'static [(&'static str, &'static SchemaNode)]),
    List {
        of: &'static SchemaNode,
        non_empty: bool,
    },
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

impl SchemaNode {
    /// Form pass: shape, ranges, ID collection and uniqueness. Unknown
    /// object keys are tolerated with a warning for forward
    /// compatibility; everything else wrong here is a hard error.
    pub fn verify_form(
        &self,
        value: &Value,
        path: &str,
        ids: &mut IdRegistry,
        stack: &mut IssueStack,
    ) -> Result<()> {
        match self {
            SchemaNode::Bool => match value {
                Value::Bool(_) => Ok(()),
                other => Err(wrong(path, "bool", other)),
            },
            SchemaNode::Int { min, max } => match value {
                Value::Number(n) => {
                    let v = n.as_i64().ok_or_else(|| wrong(path, "integer", value))?;
                    if v < *min || v > *max {
                        return Err(SchemaError::OutOfRange {
                            path: path.to_string(),
                            value: v.to_string(),
                            min: min.to_string(),
                            max: max.to_string(),
                        });
                    }
                    Ok(())
                }
                other => Err(wrong(path, "integer", other)),
            },
            SchemaNode::Float { min, max } => match value {
                Value::Number(n) => {
                    let v = n.as_f64().unwrap_or(f64::NAN);
                    if !(v >= *min && v <= *max) {
                        return Err(SchemaError::OutOfRange {
                            path: path.to_string(),
                            value: v.to_string(),
                            min: min.to_string(),
                            max: max.to_string(),
                        });
                    }
                    Ok(())
                }
                other => Err(wrong(path, "number", other)),
            },
            SchemaNode::Str => match value {
                Value::String(_) => Ok(()),
                other => Err(wrong(path, "string", other)),
            },
            SchemaNode::Id => match value {
                Value::String(s) => ids.register(s, path),
                other => Err(wrong(path, "identifier", other)),
            },
            SchemaNode::Ref => match value {
                Value::String(s) if ID_PATTERN.is_match(s) => Ok(()),
                Value::String(s) => Err(SchemaError::BadId {
                    path: path.to_string(),
                    id: s.clone(),
                }),
                Value::Tagged(t)
                    if t.tag == "!selected" || t.tag == "!default" =>
                {
                    Ok(())
                }
                other => Err(wrong(path, "reference", other)),
            },
            SchemaNode::Enum(allowed) => match value {
                Value::String(s) if allowed.contains(&s.as_str()) => Ok(()),
                Value::String(s) => Err(SchemaError::BadEnum {
                    path: path.to_string(),
                    value: s.clone(),
                    allowed: allowed.join("|"),
                }),
                other => Err(wrong(path, "enum value", other)),
            },
            SchemaNode::Freq => match value {
                Value::Number(_) | Value::String(_) => Ok(()),
                other => Err(wrong(path, "frequency", other)),
            },
            SchemaNode::Tone => match value {
                Value::Null | Value::Number(_) | Value::String(_) => Ok(()),
                other => Err(wrong(path, "tone", other)),
            },
            SchemaNode::Object { fields, mandatory } => {
                let map = match value {
                    Value::Mapping(m) => m,
                    other => return Err(wrong(path, "mapping", other)),
                };
                let missing: Vec<&str> = mandatory
                    .iter()
                    .filter(|&&k| !map.contains_key(k))
                    .copied()
                    .collect();
                if !missing.is_empty() {
                    return Err(SchemaError::MissingMandatory {
                        path: path.to_string(),
                        keys: missing.join(", "),
                    });
                }
                for (key, child_value) in map {
                    let key = match key {
                        Value::String(s) => s.as_str(),
                        other => return Err(wrong(path, "string key", other)),
                    };
                    match fields.iter().find(|(name, _)| *name == key) {
                        Some((_, child)) => {
                            child.verify_form(child_value, &join(path, key), ids, stack)?
                        }
                        None => stack.warn(
                            join(path, key),
                            "unknown key ignored (newer format?)",
                        ),
                    }
                }
                Ok(())
            }
            SchemaNode::Dispatch(alternatives) => {
                let map = match value {
                    Value::Mapping(m) => m,
                    other => return Err(wrong(path, "mapping", other)),
                };
                if map.len() != 1 {
                    return Err(SchemaError::BadDispatch {
                        path: path.to_string(),
                    });
                }
                let (key, child_value) = map.iter().next().ok_or(SchemaError::BadDispatch {
                    path: path.to_string(),
                })?;
                let key = match key {
                    Value::String(s) => s.as_str(),
                    other => return Err(wrong(path, "string key", other)),
                };
                match alternatives.iter().find(|(name, _)| *name == key) {
                    Some((_, child)) => {
                        child.verify_form(child_value, &join(path, key), ids, stack)
                    }
                    None => Err(SchemaError::UnknownDispatch {
                        path: path.to_string(),
                        key: key.to_string(),
                    }),
                }
            }
            SchemaNode::List { of, non_empty } => {
                let seq = match value {
                    Value::Sequence(s) => s,
                    other => return Err(wrong(path, "list", other)),
                };
                if *non_empty && seq.is_empty() {
                    return Err(SchemaError::EmptyList {
                        path: path.to_string(),
                    });
                }
                for (i, item) in seq.iter().enumerate() {
                    of.verify_form(item, &format!("{}[{}]", path, i), ids, stack)?;
                }
                Ok(())
            }
        }
    }

    /// Reference pass: every `Ref` must name a collected ID. Walks the
    /// same tree shape as the form pass; by now the registry is
    /// complete, so forward references resolve.
    pub fn verify_references(
        &self,
        value: &Value,
        path: &str,
        ids: &IdRegistry,
    ) -> Result<()> {
        match self {
            SchemaNode::Ref => match value {
                Value::String(s) if ids.contains(s) => Ok(()),
                Value::String(s) => Err(SchemaError::UndefinedRef {
                    path: path.to_string(),
                    id: s.clone(),
                }),
                // Sentinels resolve on the radio, not in the document.
                _ => Ok(()),
            },
            SchemaNode::Object { fields, .. } => {
                let map = match value {
                    Value::Mapping(m) => m,
                    _ => return Ok(()),
                };
                for (key, child_value) in map {
                    if let Value::String(key) = key {
                        if let Some((_, child)) =
                            fields.iter().find(|(name, _)| *name == key.as_str())
                        {
                            child.verify_references(child_value, &join(path, key), ids)?;
                        }
                    }
                }
                Ok(())
            }
            SchemaNode::Dispatch(alternatives) => {
                let map = match value {
                    Value::Mapping(m) => m,
                    _ => return Ok(()),
                };
                for (key, child_value) in map {
                    if let Value::String(key) = key {
                        if let Some((_, child)) =
                            alternatives.iter().find(|(name, _)| *name == key.as_str())
                        {
                            child.verify_references(child_value, &join(path, key), ids)?;
                        }
                    }
                }
                Ok(())
            }
            SchemaNode::List { of, .. } => {
                if let Value::Sequence(seq) = value {
                    for (i, item) in seq.iter().enumerate() {
                        of.verify_references(item, &format!("{}[{}]", path, i), ids)?;
                    }
                }
                Ok(())
            }
            // Scalars carry no references.
            _ => Ok(()),
        }
    }
}

fn wrong(path: &str, expected: &'static str, found: &Value) -> SchemaError {
    SchemaError::WrongType {
        path: path.to_string(),
        expected,
        found: type_name(found),
    }
}

/// Verify a whole document against a schema: full form pass first
/// (collecting all IDs), then the full reference pass.
pub fn verify_document(
    schema: &SchemaNode,
    document: &Value,
    stack: &mut IssueStack,
) -> Result<IdRegistry> {
    let mut ids = IdRegistry::new();
    schema.verify_form(document, "", &mut ids, stack)?;
    schema.verify_references(document, "", &ids)?;
    Ok(ids)
}

pub mod config_schema;
pub use config_schema::document_schema;

#[cfg(test)]
mod tests {
    use super::*;

    static CHANNEL: SchemaNode = SchemaNode::Object {
        fields: &[
            ("id", SchemaNode::Id),
            ("name", SchemaNode::Str),
            ("scan-list", SchemaNode::Ref),
        ],
        mandatory: &["id", "name"],
    };
    const CHANNEL_LIST: SchemaNode = SchemaNode::List {
        of: &CHANNEL,
        non_empty: false,
    };
    static DOC: SchemaNode = SchemaNode::Object {
        fields: &[("channels", CHANNEL_LIST), ("version", SchemaNode::Str)],
        mandatory: &["channels"],
    };

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_missing_mandatory_names_key() {
        let mut stack = IssueStack::new();
        let mut ids = IdRegistry::new();
        let err = CHANNEL
            .verify_form(&doc("{id: ch1}"), "channels[0]", &mut ids, &mut stack)
            .unwrap_err();
        match err {
            SchemaError::MissingMandatory { keys, .. } => assert_eq!(keys, "name"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_id_on_second_occurrence() {
        let mut stack = IssueStack::new();
        let err = verify_document(
            &DOC,
            &doc("channels: [{id: ch1, name: a}, {id: ch1, name: b}]"),
            &mut stack,
        )
        .unwrap_err();
        match err {
            SchemaError::DuplicateId { id, path, .. } => {
                assert_eq!(id, "ch1");
                assert_eq!(path, "channels[1].id");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_undefined_reference_fails_second_pass() {
        let mut stack = IssueStack::new();
        let mut ids = IdRegistry::new();
        let value = doc("channels: [{id: ch1, name: a, scan-list: scan1}]");

        // Form pass succeeds: references are not checked yet.
        DOC.verify_form(&value, "", &mut ids, &mut stack).unwrap();
        let err = DOC.verify_references(&value, "", &ids).unwrap_err();
        match err {
            SchemaError::UndefinedRef { id, .. } => assert_eq!(id, "scan1"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_forward_reference_resolves() {
        // scan1 is declared "later"; both passes over the whole
        // document make this legal.
        static SCAN: SchemaNode = SchemaNode::Object {
            fields: &[("id", SchemaNode::Id), ("name", SchemaNode::Str)],
            mandatory: &["id"],
        };
        static FULL: SchemaNode = SchemaNode::Object {
            fields: &[
                ("channels", CHANNEL_LIST),
                (
                    "scan-lists",
                    SchemaNode::List {
                        of: &SCAN,
                        non_empty: false,
                    },
                ),
            ],
            mandatory: &[],
        };
        let mut stack = IssueStack::new();
        verify_document(
            &FULL,
            &doc(
                "channels: [{id: ch1, name: a, scan-list: scan1}]\nscan-lists: [{id: scan1}]",
            ),
            &mut stack,
        )
        .unwrap();
    }

    #[test]
    fn test_unknown_key_warns() {
        let mut stack = IssueStack::new();
        verify_document(
            &DOC,
            &doc("channels: []\nfuture-key: 1"),
            &mut stack,
        )
        .unwrap();
        assert_eq!(stack.len(), 1);
        assert!(stack.issues()[0].location.contains("future-key"));
    }

    #[test]
    fn test_int_range() {
        let node = SchemaNode::Int { min: 1, max: 16 };
        let mut stack = IssueStack::new();
        let mut ids = IdRegistry::new();
        assert!(node.verify_form(&doc("8"), "cc", &mut ids, &mut stack).is_ok());
        assert!(matches!(
            node.verify_form(&doc("17"), "cc", &mut ids, &mut stack),
            Err(SchemaError::OutOfRange { .. })
        ));
        assert!(matches!(
            node.verify_form(&doc("\"x\""), "cc", &mut ids, &mut stack),
            Err(SchemaError::WrongType { .. })
        ));
    }

    #[test]
    fn test_dispatch_exactly_one_key() {
        static KIND: SchemaNode = SchemaNode::Object {
            fields: &[("name", SchemaNode::Str)],
            mandatory: &[],
        };
        static DISPATCH: SchemaNode =
            SchemaNode::Dispatch(&[("analog", &KIND), ("digital", &KIND)]);
        let mut stack = IssueStack::new();
        let mut ids = IdRegistry::new();
        assert!(DISPATCH
            .verify_form(&doc("analog: {name: a}"), "", &mut ids, &mut stack)
            .is_ok());
        assert!(matches!(
            DISPATCH.verify_form(
                &doc("analog: {name: a}\ndigital: {name: b}"),
                "",
                &mut ids,
                &mut stack
            ),
            Err(SchemaError::BadDispatch { .. })
        ));
        assert!(matches!(
            DISPATCH.verify_form(&doc("fm: {name: a}"), "", &mut ids, &mut stack),
            Err(SchemaError::UnknownDispatch { .. })
        ));
    }

    #[test]
    fn test_selected_tag_is_valid_ref() {
        let mut stack = IssueStack::new();
        let mut ids = IdRegistry::new();
        let value = doc("!selected");
        SchemaNode::Ref
            .verify_form(&value, "priority1", &mut ids, &mut stack)
            .unwrap();
        SchemaNode::Ref
            .verify_references(&value, "priority1", &ids)
            .unwrap();
    }
}
