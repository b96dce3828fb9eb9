//! `mimeshell`: a MIME message engine.
//!
//! Parses raw email into a tree of parts without copying content, decodes
//! part content lazily on request, re-serializes edited trees and exposes
//! the exact signed byte range of `multipart/signed` messages.

pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod signed;
pub mod store;

pub use decode::{ContentStream, TextConverter, TransferEncoding};
pub use error::{MimeError, Result};
pub use export::WriteOptions;
pub use model::{ContentType, Header, HeaderValue, Message, Part, PartId};
pub use parser::ParseOptions;
pub use signed::{DigestAlgorithm, SignedMessage};
pub use store::ByteSource;
