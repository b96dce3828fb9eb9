//! Byte sources backing parsed messages.

pub mod source;

pub use source::ByteSource;
