//! Core data model: the part tree, headers, content types, addresses.

pub mod address;
pub mod attachment;
pub mod content_type;
pub mod header;
pub mod message;
pub mod part;

pub use address::{Address, AddressList, Group, Mailbox};
pub use attachment::AttachmentInfo;
pub use content_type::{ContentType, ParameterizedValue};
pub use header::{Header, HeaderValue, Headers};
pub use message::{BodyKind, Message};
pub use part::{Body, Part, PartId};
