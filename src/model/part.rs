//! Nodes of the part tree.
//!
//! Parts live in an arena owned by [`Message`](crate::model::message::Message)
//! and refer to each other by [`PartId`]. The parent link is an index, never
//! a second owner.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

use crate::decode::TransferEncoding;
use crate::model::content_type::ContentType;
use crate::model::header::Headers;

/// Index of a part in its message's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartId(pub(crate) usize);

impl PartId {
    /// The root part of every message.
    pub const ROOT: PartId = PartId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a part's content comes from.
#[derive(Debug, Clone)]
pub enum Body {
    /// Transfer-encoded bytes at this range of the source.
    Source(Range<usize>),
    /// Decoded bytes supplied by the caller; encoded when written.
    Decoded(Arc<[u8]>),
}

impl Body {
    pub fn empty() -> Self {
        Self::Decoded(Arc::from(Vec::new()))
    }
}

/// One node of the MIME structure.
#[derive(Debug, Clone)]
pub struct Part {
    pub(crate) headers: Headers,
    pub(crate) content_type: ContentType,
    /// Type assumed when the part has no usable Content-Type.
    pub(crate) default_type: ContentType,
    pub(crate) body: Body,
    pub(crate) children: Vec<PartId>,
    pub(crate) parent: Option<PartId>,
    pub(crate) boundary: Option<String>,
    /// Headers plus body in the source, for parts read from one.
    pub(crate) range: Option<Range<usize>>,
    pub(crate) dirty: bool,
}

impl Part {
    /// A detached part with the given type and decoded content.
    pub fn new(content_type: ContentType, content: impl Into<Vec<u8>>) -> Self {
        let content: Vec<u8> = content.into();
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        Self {
            headers,
            default_type: ContentType::default_text("us-ascii"),
            boundary: content_type.boundary().map(str::to_string),
            content_type,
            body: Body::Decoded(Arc::from(content)),
            children: Vec::new(),
            parent: None,
            range: None,
            dirty: true,
        }
    }

    /// A text part in UTF-8 with the given subtype (`plain`, `html`).
    pub fn text(subtype: &str, text: &str) -> Self {
        let ct = ContentType::new("text", subtype).with_param("charset", "utf-8");
        let mut part = Self::new(ct, text.as_bytes());
        part.headers.add("Content-Transfer-Encoding", "quoted-printable");
        part
    }

    /// An empty multipart container; the boundary is chosen when written.
    pub fn multipart(subtype: &str) -> Self {
        Self::new(ContentType::new("multipart", subtype), Vec::new())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Effective content type, defaults applied.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn parent(&self) -> Option<PartId> {
        self.parent
    }

    pub fn children(&self) -> &[PartId] {
        &self.children
    }

    /// Boundary discovered in, or assigned to, a multipart part.
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Full source range (headers and body), if the part came from a source.
    pub fn source_range(&self) -> Option<Range<usize>> {
        self.range.clone()
    }

    /// Source range of the transfer-encoded content, if any.
    pub fn content_range(&self) -> Option<Range<usize>> {
        match &self.body {
            Body::Source(range) => Some(range.clone()),
            Body::Decoded(_) => None,
        }
    }

    /// `true` once the part or a descendant was edited.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the part holds child parts.
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
            || (self.content_type.is_multipart() && matches!(self.body, Body::Decoded(_)))
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .value("Content-Transfer-Encoding")
            .map(|v| TransferEncoding::parse(&v))
            .unwrap_or_default()
    }

    /// Re-derive the effective content type after a header edit.
    pub(crate) fn refresh_content_type(&mut self) {
        let parsed = self
            .headers
            .value("Content-Type")
            .and_then(|v| ContentType::parse(&v));
        self.content_type = parsed.unwrap_or_else(|| self.default_type.clone());
        if let Some(b) = self.content_type.boundary() {
            self.boundary = Some(b.to_string());
        }
    }
}
