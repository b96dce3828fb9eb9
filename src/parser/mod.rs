//! MIME parsing: header lexing and typed header values, header blocks, and
//! the part tree builder.

pub mod address;
pub mod date;
pub mod eml;
pub mod header;
pub mod lexer;
pub mod mime;
pub mod params;

use serde::{Deserialize, Serialize};

/// Containers nested deeper than this are treated as leaves.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Knobs for the part tree parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Nesting depth beyond which multipart and message parts become leaves.
    pub max_depth: usize,
    /// Charset for `text/*` parts that declare none.
    pub default_charset: String,
    /// Skip an mbox `From ` line before the first header.
    pub strip_mbox_from_line: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_charset: "us-ascii".to_string(),
            strip_mbox_from_line: true,
        }
    }
}
