// Tabular configuration codec
//
// A flat, line-oriented alternative to the document format. Every
// record is one line: a section keyword, a 1-based record index, a
// colon, then positional fields. Cross references are 1-based integer
// indices into the same file, not symbolic IDs. `#` starts a comment,
// `-` is "not set", `+`/`-` encode flags, comma-joined numbers form
// member lists.
//
//   version: "0.1.0"
//   id 1: "DL1XYZ" 2621234
//   contact 1: group "WW" 91 -
//   grouplist 1: "World" 1
//   digital 1: "R0 Berlin" 439.575 -7.6 high 0 - 1 1 2 color 1 1 - - -
//   analog 2: "Simplex" 145.5 145.5 high 0 - - 1 67.0 - wide -
//   zone 1: "Home" 1 2
//   scanlist 1: "Scan" 0 - - 1,2
//
// Distinguished index values in reference slots: `0` means the
// selected-channel sentinel (scan lists) or the default roaming zone
// (digital channels); `-` means not set. Concrete references are
// 1-based in the file and slot indices internally.
//
// Decoding is two passes over the same lexed lines: parse (allocate
// entities, scalar fields) then link (resolve integer references
// against the complete tables), so forward references work.

mod lexer;
mod reader;
mod writer;

pub use lexer::{lex, Line, Token};
pub use reader::read_tabular;
pub use writer::write_tabular;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TabularError {
    #[error("line {line}: {message}")]
    Lex { line: usize, message: String },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: no {what} with index {index}")]
    Reference {
        line: usize,
        what: &'static str,
        index: i64,
    },
}

impl TabularError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        TabularError::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TabularError>;
