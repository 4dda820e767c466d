// dmrconf: codeplug programming for DMR radios
//
// The crate is layered bottom up: codec/image hold the raw binary
// model, config the vendor-neutral object graph, schema/yaml/tabular
// the text formats, radios the per-model binary codecs, and transfer
// the device protocol and orchestration.

pub mod codec;
pub mod config;
pub mod formats;
pub mod image;
pub mod radios;
pub mod schema;
pub mod tabular;
pub mod transfer;
pub mod verify;
pub mod yaml;

pub use config::Config;
pub use image::{Element, Image};
pub use radios::{codeplug_for, list_radios, Codeplug};
pub use transfer::{Device, Orchestrator};
pub use verify::{Issue, IssueStack, Severity};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
