// Symbolic-ID resolution context for the two-pass reader
//
// The parse pass registers every declared ID with the slot index the
// entity landed in; the link pass resolves references against the then
// complete map. The context is append-only while parsing and passed by
// shared reference while linking, so late mutation is impossible by
// construction.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContextError {
    #[error("identifier \"{0}\" already declared")]
    Duplicate(String),

    #[error("reference \"{id}\" does not name a {kind}")]
    NotFound { kind: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, ContextError>;

/// One ID namespace: symbolic ID -> slot index.
#[derive(Debug, Default, Clone)]
pub struct IdMap {
    kind: &'static str,
    map: HashMap<String, usize>,
}

impl IdMap {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            map: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: &str, index: usize) -> Result<()> {
        if self.map.contains_key(id) {
            return Err(ContextError::Duplicate(id.to_string()));
        }
        self.map.insert(id.to_string(), index);
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<usize> {
        self.map
            .get(id)
            .copied()
            .ok_or_else(|| ContextError::NotFound {
                kind: self.kind,
                id: id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// All ID namespaces of one document. Entity kinds do not share a
/// namespace at resolution level even though the schema enforces
/// document-wide uniqueness.
#[derive(Debug, Default, Clone)]
pub struct Context {
    pub radio_ids: IdMap,
    pub channels: IdMap,
    pub contacts: IdMap,
    pub group_lists: IdMap,
    pub zones: IdMap,
    pub scan_lists: IdMap,
    pub positioning: IdMap,
    pub roaming_channels: IdMap,
    pub roaming_zones: IdMap,
}

impl Context {
    pub fn new() -> Self {
        Self {
            radio_ids: IdMap::new("radio ID"),
            channels: IdMap::new("channel"),
            contacts: IdMap::new("contact"),
            group_lists: IdMap::new("group list"),
            zones: IdMap::new("zone"),
            scan_lists: IdMap::new("scan list"),
            positioning: IdMap::new("positioning system"),
            roaming_channels: IdMap::new("roaming channel"),
            roaming_zones: IdMap::new("roaming zone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut ctx = Context::new();
        ctx.channels.register("ch1", 0).unwrap();
        ctx.channels.register("ch2", 1).unwrap();
        assert_eq!(ctx.channels.resolve("ch2").unwrap(), 1);
        assert_eq!(
            ctx.channels.resolve("ch3").unwrap_err(),
            ContextError::NotFound {
                kind: "channel",
                id: "ch3".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut ctx = Context::new();
        ctx.contacts.register("tg91", 0).unwrap();
        assert_eq!(
            ctx.contacts.register("tg91", 1).unwrap_err(),
            ContextError::Duplicate("tg91".to_string())
        );
    }
}
