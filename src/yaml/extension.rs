// Extension readers for vendor-specific document sections
//
// Third parties hook additional top-level keys into the generic
// reader. The registry is an explicit value built at startup and
// passed into `read_config`; registration order does not matter and
// nothing global is mutated.

use super::context::Context;
use super::Result;
use crate::config::Config;
use serde_yaml::Value;
use std::collections::HashMap;

/// A reader for one extension section, keyed by its top-level document
/// key. Both passes see the section's subtree and the shared context.
pub trait ExtensionReader: Send + Sync {
    /// The top-level key this extension claims.
    fn name(&self) -> &str;

    /// Parse pass: allocate whatever the extension stores.
    fn parse(&self, value: &Value, config: &mut Config, ctx: &mut Context) -> Result<()>;

    /// Link pass: resolve references against the complete context.
    fn link(&self, value: &Value, config: &mut Config, ctx: &Context) -> Result<()>;
}

/// The set of registered extensions for one reader invocation.
#[derive(Default)]
pub struct ExtensionRegistry {
    readers: HashMap<String, Box<dyn ExtensionReader>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, reader: Box<dyn ExtensionReader>) {
        self.readers.insert(reader.name().to_string(), reader);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExtensionReader> {
        self.readers.get(name).map(|r| r.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.readers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Probe {
        parses: Arc<AtomicUsize>,
    }

    impl ExtensionReader for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn parse(&self, _: &Value, _: &mut Config, _: &mut Context) -> Result<()> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn link(&self, _: &Value, _: &mut Config, _: &Context) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let parses = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(Probe {
            parses: parses.clone(),
        }));

        assert!(registry.contains("probe"));
        assert!(!registry.contains("other"));

        let mut config = Config::new();
        let mut ctx = Context::new();
        registry
            .get("probe")
            .unwrap()
            .parse(&Value::Null, &mut config, &mut ctx)
            .unwrap();
        assert_eq!(parses.load(Ordering::SeqCst), 1);
    }
}
