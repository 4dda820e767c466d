// Textual configuration codec: YAML document <-> Config
//
// Decoding runs the schema verifier, then two passes over the same
// tree: parse (allocate entities, scalar fields, register IDs) and
// link (resolve references). Categories are processed in a fixed order
// in both passes; because linking only starts after the whole parse
// pass, forward references across categories and within them work.

pub mod context;
pub mod extension;
mod reader;
mod writer;

pub use context::{Context, ContextError};
pub use extension::{ExtensionReader, ExtensionRegistry};
pub use reader::read_config;
pub use writer::write_config;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigCodecError {
    #[error("not a YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Schema(#[from] crate::schema::SchemaError),

    #[error("{path}: cannot parse {what}: {message}")]
    Parse {
        path: String,
        what: &'static str,
        message: String,
    },

    #[error("{path}: cannot link {what}: {source}")]
    Reference {
        path: String,
        what: &'static str,
        source: ContextError,
    },
}

impl ConfigCodecError {
    pub(crate) fn parse(
        path: impl Into<String>,
        what: &'static str,
        message: impl Into<String>,
    ) -> Self {
        ConfigCodecError::Parse {
            path: path.into(),
            what,
            message: message.into(),
        }
    }

    pub(crate) fn reference(
        path: impl Into<String>,
        what: &'static str,
        source: ContextError,
    ) -> Self {
        ConfigCodecError::Reference {
            path: path.into(),
            what,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigCodecError>;
