//! The parsed message: an arena of parts plus message-level conveniences.

use std::io::Read;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::decode::{
    ContentStream, DecodeOptions, EncodingRsConverter, RawBytes, TextConverter, TransferEncoding,
};
use crate::error::{MimeError, Result};
use crate::model::content_type::{ContentType, ParameterizedValue};
use crate::model::header::{Header, HeaderValue};
use crate::model::part::{Body, Part, PartId};
use crate::parser::{mime, ParseOptions};
use crate::store::ByteSource;

/// Which body kind a text lookup selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Plain,
    Html,
}

impl BodyKind {
    fn essence(self) -> &'static str {
        match self {
            Self::Plain => "text/plain",
            Self::Html => "text/html",
        }
    }
}

/// A MIME message and its part tree.
///
/// The message owns every part; parts refer to each other by [`PartId`].
/// Content stays in the [`ByteSource`] until a stream over it is read.
pub struct Message {
    source: ByteSource,
    pub(crate) parts: Vec<Part>,
    converter: Arc<dyn TextConverter>,
    options: ParseOptions,
    charset_override: Option<String>,
    normalize_newlines: bool,
}

impl Message {
    // ── Construction ────────────────────────────────────────────

    /// An empty composed message.
    pub fn new() -> Self {
        let mut root = Part::new(ContentType::default_text("us-ascii"), Vec::new());
        root.headers = Default::default();
        root.headers.add("MIME-Version", "1.0");
        Self {
            source: ByteSource::default(),
            parts: vec![root],
            converter: Arc::new(EncodingRsConverter),
            options: ParseOptions::default(),
            charset_override: None,
            normalize_newlines: false,
        }
    }

    /// Parse a message held in memory.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_source(ByteSource::from_bytes(bytes), ParseOptions::default())
    }

    pub fn parse_with(bytes: impl Into<Vec<u8>>, options: ParseOptions) -> Self {
        Self::from_source(ByteSource::from_bytes(bytes), options)
    }

    /// Read and parse a message file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ParseOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: ParseOptions) -> Result<Self> {
        Ok(Self::from_source(ByteSource::open(path)?, options))
    }

    /// Read a whole message from `reader` and parse it.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(Self::from_source(
            ByteSource::from_reader(reader)?,
            ParseOptions::default(),
        ))
    }

    /// Parse an existing source with explicit options.
    pub fn from_source(source: ByteSource, options: ParseOptions) -> Self {
        Self::from_source_with(source, options, Arc::new(EncodingRsConverter))
    }

    /// Parse with a caller-supplied charset converter.
    pub fn from_source_with(
        source: ByteSource,
        options: ParseOptions,
        converter: Arc<dyn TextConverter>,
    ) -> Self {
        let parts = mime::parse_tree(source.as_bytes(), &options, converter.as_ref());
        Self {
            source,
            parts,
            converter,
            options,
            charset_override: None,
            normalize_newlines: false,
        }
    }

    // ── Tree access ─────────────────────────────────────────────

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    pub fn converter(&self) -> &dyn TextConverter {
        self.converter.as_ref()
    }

    pub fn root(&self) -> PartId {
        PartId::ROOT
    }

    /// Part by id; `None` for ids that do not belong to this message.
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.0)
    }

    pub(crate) fn node(&self, id: PartId) -> Result<&Part> {
        self.parts
            .get(id.0)
            .ok_or_else(|| MimeError::part_not_found("any", id.0))
    }

    pub(crate) fn node_mut(&mut self, id: PartId) -> Result<&mut Part> {
        self.parts
            .get_mut(id.0)
            .ok_or_else(|| MimeError::part_not_found("any", id.0))
    }

    /// Every part reachable from the root, depth-first in document order.
    pub fn walk(&self) -> Vec<PartId> {
        self.walk_from(PartId::ROOT)
    }

    pub fn walk_from(&self, start: PartId) -> Vec<PartId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(part) = self.parts.get(id.0) else {
                continue;
            };
            out.push(id);
            stack.extend(part.children.iter().rev().copied());
        }
        out
    }

    /// Nesting depth of `id` (root is 0).
    pub fn depth(&self, id: PartId) -> usize {
        let mut depth = 0;
        let mut cur = self.part(id).and_then(Part::parent);
        while let Some(p) = cur {
            depth += 1;
            cur = self.part(p).and_then(Part::parent);
        }
        depth
    }

    // ── Headers ─────────────────────────────────────────────────

    /// First header named `name` on `id`.
    pub fn header(&self, id: PartId, name: &str) -> Option<&Header> {
        self.part(id)?.headers.get(name)
    }

    /// Every header named `name` on `id`, in order.
    pub fn headers_all(&self, id: PartId, name: &str) -> Vec<&Header> {
        self.part(id)
            .map(|p| p.headers.get_all(name))
            .unwrap_or_default()
    }

    /// Typed value of a header on `id`.
    pub fn parsed_header(&self, id: PartId, name: &str) -> Option<&HeaderValue> {
        Some(self.header(id, name)?.parsed(self.converter.as_ref()))
    }

    /// Decoded value of a root header: encoded words resolved for
    /// unstructured headers, raw text for the others.
    pub fn header_value(&self, name: &str) -> Result<String> {
        let header = self
            .header(PartId::ROOT, name)
            .ok_or_else(|| MimeError::HeaderNotFound(name.to_string()))?;
        Ok(match header.parsed(self.converter.as_ref()) {
            HeaderValue::Text(text) => text.clone(),
            _ => header.value(),
        })
    }

    /// Parameter of a parameterized root header, e.g.
    /// `header_parameter("Content-Type", "protocol")`.
    pub fn header_parameter(&self, name: &str, param: &str) -> Option<String> {
        self.part_header_parameter(PartId::ROOT, name, param)
    }

    pub fn part_header_parameter(&self, id: PartId, name: &str, param: &str) -> Option<String> {
        self.parameterized(id, name)?.param(param).map(str::to_string)
    }

    fn parameterized(&self, id: PartId, name: &str) -> Option<&ParameterizedValue> {
        self.parsed_header(id, name)?.as_parameterized()
    }

    /// Display name of the first mailbox in a root address header.
    pub fn person_name(&self, name: &str) -> Option<String> {
        let list = self.parsed_header(PartId::ROOT, name)?.as_addresses()?;
        list.first()?.name.clone()
    }

    /// Address of the first mailbox in a root address header.
    pub fn email(&self, name: &str) -> Option<String> {
        let list = self.parsed_header(PartId::ROOT, name)?.as_addresses()?;
        list.first()
            .map(|m| m.address.clone())
            .filter(|a| !a.is_empty())
    }

    // ── Part metadata ───────────────────────────────────────────

    pub fn content_type(&self, id: PartId) -> Option<&ContentType> {
        self.part(id).map(Part::content_type)
    }

    /// Disposition main token, lowercased (`inline`, `attachment`).
    pub fn disposition(&self, id: PartId) -> Option<String> {
        let value = self.parameterized(id, "Content-Disposition")?;
        let token = value.value.trim().to_ascii_lowercase();
        (!token.is_empty()).then_some(token)
    }

    /// Content-Disposition `filename`, then Content-Type `name`.
    pub fn filename(&self, id: PartId) -> Option<String> {
        self.parameterized(id, "Content-Disposition")
            .and_then(|v| v.param("filename"))
            .or_else(|| self.part(id)?.content_type.param("name"))
            .map(str::to_string)
            .filter(|n| !n.is_empty())
    }

    /// Content-ID, brackets kept.
    pub fn content_id(&self, id: PartId) -> Option<String> {
        self.parsed_header(id, "Content-ID")?
            .as_identifiers()?
            .first()
            .cloned()
    }

    /// Charset used for text reads of `id`: the override, else the
    /// declared charset, else the configured default.
    pub fn effective_charset(&self, id: PartId) -> String {
        if let Some(cs) = &self.charset_override {
            return cs.clone();
        }
        self.part(id)
            .and_then(|p| p.content_type.charset())
            .map(str::to_string)
            .unwrap_or_else(|| self.options.default_charset.clone())
    }

    // ── Decoding ────────────────────────────────────────────────

    /// Force a charset for every text read on this message, or clear it.
    /// Raw header values are not affected.
    pub fn set_charset_override(&mut self, charset: Option<&str>) {
        self.charset_override = charset.map(str::to_string);
    }

    pub fn charset_override(&self) -> Option<&str> {
        self.charset_override.as_deref()
    }

    /// Convert CRLF and lone CR to LF in text reads.
    pub fn set_normalize_newlines(&mut self, normalize: bool) {
        self.normalize_newlines = normalize;
    }

    fn raw_bytes(&self, part: &Part) -> RawBytes {
        match &part.body {
            Body::Source(range) => RawBytes::Source {
                source: self.source.clone(),
                range: range.clone(),
            },
            Body::Decoded(bytes) => RawBytes::Owned(Arc::clone(bytes)),
        }
    }

    fn stream(&self, id: PartId, charset: Option<String>, normalize: bool) -> Result<ContentStream> {
        let part = self.node(id)?;
        let transfer_encoding = match part.body {
            Body::Source(_) => part.transfer_encoding(),
            Body::Decoded(_) => TransferEncoding::Binary,
        };
        Ok(ContentStream::new(
            self.raw_bytes(part),
            DecodeOptions {
                transfer_encoding,
                charset,
                normalize_newlines: normalize,
            },
            Arc::clone(&self.converter),
        ))
    }

    /// Transfer-decoded bytes of `id`, no charset conversion.
    pub fn content_stream(&self, id: PartId) -> Result<ContentStream> {
        self.stream(id, None, false)
    }

    /// Transfer-decoded and UTF-8 converted content of `id`.
    pub fn text_stream_of(&self, id: PartId) -> Result<ContentStream> {
        let charset = self.effective_charset(id);
        self.stream(id, Some(charset), self.normalize_newlines)
    }

    pub fn content(&self, id: PartId) -> Result<Vec<u8>> {
        Ok(self.content_stream(id)?.read_all()?)
    }

    /// Encoded length of a part's content.
    pub fn encoded_len(&self, id: PartId) -> usize {
        self.part(id)
            .map(|p| match &p.body {
                Body::Source(range) => range.len(),
                Body::Decoded(bytes) => bytes.len(),
            })
            .unwrap_or(0)
    }

    // ── Body selection ──────────────────────────────────────────

    fn is_body_candidate(&self, id: PartId, kind: BodyKind) -> bool {
        let Some(part) = self.part(id) else {
            return false;
        };
        !part.is_container()
            && part.content_type.is(kind.essence())
            && self.disposition(id).as_deref() != Some("attachment")
    }

    fn body_parts(&self, kind: BodyKind) -> Vec<PartId> {
        self.walk()
            .into_iter()
            .filter(|id| self.is_body_candidate(*id, kind))
            .collect()
    }

    fn body_part(&self, kind: BodyKind, index: usize) -> Result<PartId> {
        self.body_parts(kind)
            .get(index)
            .copied()
            .ok_or_else(|| MimeError::part_not_found(kind.essence(), index))
    }

    /// The `index`-th `text/plain` body, depth-first.
    pub fn text_part(&self, index: usize) -> Result<PartId> {
        self.body_part(BodyKind::Plain, index)
    }

    pub fn html_part(&self, index: usize) -> Result<PartId> {
        self.body_part(BodyKind::Html, index)
    }

    pub fn text_part_count(&self) -> usize {
        self.body_parts(BodyKind::Plain).len()
    }

    pub fn html_part_count(&self) -> usize {
        self.body_parts(BodyKind::Html).len()
    }

    pub fn text_stream(&self, index: usize) -> Result<ContentStream> {
        self.text_stream_of(self.text_part(index)?)
    }

    pub fn html_stream(&self, index: usize) -> Result<ContentStream> {
        self.text_stream_of(self.html_part(index)?)
    }

    pub fn text_content(&self, index: usize) -> Result<String> {
        Ok(self.text_stream(index)?.read_text()?)
    }

    pub fn html_content(&self, index: usize) -> Result<String> {
        Ok(self.html_stream(index)?.read_text()?)
    }

    // ── Attachments ─────────────────────────────────────────────

    /// `true` when `id` is the signature child of a `multipart/signed` part.
    pub fn is_signature_part(&self, id: PartId) -> bool {
        let Some(parent) = self.part(id).and_then(Part::parent) else {
            return false;
        };
        self.part(parent).is_some_and(|p| {
            p.content_type.is("multipart/signed") && p.children.get(1) == Some(&id)
        })
    }

    /// Attachment parts in document order: leaves that are not bodies,
    /// plus embedded messages (not descended into). Signatures are excluded.
    pub fn attachment_parts(&self) -> Vec<PartId> {
        let mut out = Vec::new();
        let mut stack = vec![PartId::ROOT];
        while let Some(id) = stack.pop() {
            let Some(part) = self.part(id) else {
                continue;
            };
            if self.is_signature_part(id) {
                continue;
            }
            if id != PartId::ROOT && part.content_type.is_message() {
                out.push(id);
                continue;
            }
            if part.is_container() {
                stack.extend(part.children.iter().rev().copied());
                continue;
            }
            let is_body = self.is_body_candidate(id, BodyKind::Plain)
                || self.is_body_candidate(id, BodyKind::Html);
            if !is_body {
                out.push(id);
            }
        }
        out
    }

    pub fn attachment_count(&self) -> usize {
        self.attachment_parts().len()
    }

    pub fn attachment_part(&self, index: usize) -> Result<PartId> {
        self.attachment_parts()
            .get(index)
            .copied()
            .ok_or_else(|| MimeError::part_not_found("attachment", index))
    }

    // ── Signed content ──────────────────────────────────────────

    /// Exact source range of the content signed by the `multipart/signed`
    /// part `id`: the first child's header block and body as they appear
    /// between the two delimiter lines.
    pub fn signed_range(&self, id: PartId) -> Option<Range<usize>> {
        let part = self.part(id)?;
        if !part.content_type.is("multipart/signed") {
            return None;
        }
        let first = *part.children.first()?;
        self.part(first)?.range.clone()
    }

    /// Source bytes of [`Self::signed_range`].
    pub fn signed_bytes(&self, id: PartId) -> Option<&[u8]> {
        self.signed_range(id).map(|r| self.source.slice(r))
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Mark `id` and its ancestors for rebuilding on write.
    pub(crate) fn mark_dirty(&mut self, id: PartId) {
        let mut cur = Some(id);
        while let Some(pid) = cur {
            let Some(part) = self.parts.get_mut(pid.0) else {
                break;
            };
            part.dirty = true;
            cur = part.parent;
        }
    }

    /// Before the transfer encoding of a source-backed leaf changes, decode
    /// it with the encoding it was written in. The serializer then encodes
    /// the content with whatever encoding the part ends up with.
    fn before_header_edit(&mut self, id: PartId, name: &str) -> Result<()> {
        if !name.trim().eq_ignore_ascii_case("Content-Transfer-Encoding") {
            return Ok(());
        }
        let part = self.node(id)?;
        if part.is_container() || !matches!(part.body, Body::Source(_)) {
            return Ok(());
        }
        let content = self.content(id)?;
        self.node_mut(id)?.body = Body::Decoded(Arc::from(content));
        Ok(())
    }

    fn after_header_edit(&mut self, id: PartId, name: &str) {
        if name.eq_ignore_ascii_case("Content-Type") {
            if let Some(part) = self.parts.get_mut(id.0) {
                part.refresh_content_type();
            }
        }
        self.mark_dirty(id);
    }

    /// Append a header to `id`.
    pub fn add_header(&mut self, id: PartId, name: &str, value: &str) -> Result<()> {
        self.before_header_edit(id, name)?;
        self.node_mut(id)?.headers.add(name, value);
        self.after_header_edit(id, name);
        Ok(())
    }

    /// Replace the first `name` header of `id` (dropping duplicates), or add it.
    pub fn set_header(&mut self, id: PartId, name: &str, value: &str) -> Result<()> {
        self.before_header_edit(id, name)?;
        self.node_mut(id)?.headers.set(name, value);
        self.after_header_edit(id, name);
        Ok(())
    }

    /// Remove every `name` header from `id`; returns how many were removed.
    pub fn remove_header(&mut self, id: PartId, name: &str) -> Result<usize> {
        self.before_header_edit(id, name)?;
        let removed = self.node_mut(id)?.headers.remove(name);
        if removed > 0 {
            self.after_header_edit(id, name);
        }
        Ok(removed)
    }

    /// Replace the decoded content of leaf `id`. It is encoded with the
    /// part's Content-Transfer-Encoding when written.
    pub fn set_content(&mut self, id: PartId, content: impl Into<Vec<u8>>) -> Result<()> {
        let part = self.node_mut(id)?;
        if part.is_container() {
            return Err(MimeError::InvalidEdit(format!(
                "part {id} is a container, its content is its children"
            )));
        }
        let content: Vec<u8> = content.into();
        part.body = Body::Decoded(Arc::from(content));
        self.mark_dirty(id);
        Ok(())
    }

    /// Replace the first `text/plain` body, or add one.
    pub fn set_text_part(&mut self, text: &str) -> Result<PartId> {
        self.set_body(BodyKind::Plain, text)
    }

    /// Replace the first `text/html` body, or add one.
    pub fn set_html_part(&mut self, html: &str) -> Result<PartId> {
        self.set_body(BodyKind::Html, html)
    }

    fn set_body(&mut self, kind: BodyKind, text: &str) -> Result<PartId> {
        let subtype = match kind {
            BodyKind::Plain => "plain",
            BodyKind::Html => "html",
        };

        if let Ok(id) = self.body_part(kind, 0) {
            self.rewrite_as_text(id, subtype, text)?;
            return Ok(id);
        }

        // An empty composed message becomes the body itself.
        if self.is_blank_root() {
            self.rewrite_as_text(PartId::ROOT, subtype, text)?;
            return Ok(PartId::ROOT);
        }

        let other = match kind {
            BodyKind::Plain => BodyKind::Html,
            BodyKind::Html => BodyKind::Plain,
        };
        let new_part = Part::text(subtype, text);
        match self.body_part(other, 0) {
            Ok(sibling) => {
                let parent_is_alternative = self
                    .part(sibling)
                    .and_then(Part::parent)
                    .and_then(|p| self.part(p))
                    .is_some_and(|p| p.content_type.is("multipart/alternative"));
                let container = if parent_is_alternative {
                    self.part(sibling).and_then(Part::parent).unwrap_or(PartId::ROOT)
                } else {
                    self.wrap_in_multipart(sibling, "alternative")?;
                    sibling
                };
                let id = self.attach_part(container, new_part)?;
                // Plain text goes first in an alternative.
                if kind == BodyKind::Plain {
                    let children = &mut self.node_mut(container)?.children;
                    children.retain(|c| *c != id);
                    children.insert(0, id);
                }
                Ok(id)
            }
            Err(_) => {
                let root = PartId::ROOT;
                if !self.node(root)?.content_type.is_multipart() {
                    self.wrap_in_multipart(root, "mixed")?;
                }
                let id = self.attach_part(root, new_part)?;
                let children = &mut self.node_mut(root)?.children;
                children.retain(|c| *c != id);
                children.insert(0, id);
                Ok(id)
            }
        }
    }

    fn is_blank_root(&self) -> bool {
        self.part(PartId::ROOT).is_some_and(|root| {
            root.children.is_empty()
                && root.headers.get("Content-Type").is_none()
                && match &root.body {
                    Body::Decoded(bytes) => bytes.is_empty(),
                    Body::Source(range) => range.is_empty(),
                }
        })
    }

    fn rewrite_as_text(&mut self, id: PartId, subtype: &str, text: &str) -> Result<()> {
        let ct = ContentType::new("text", subtype).with_param("charset", "utf-8");
        self.set_header(id, "Content-Type", &ct.to_string())?;
        self.set_header(id, "Content-Transfer-Encoding", "quoted-printable")?;
        self.set_content(id, text.as_bytes())
    }

    /// Turn `id` into a `multipart/<subtype>` container whose only child
    /// holds the former content and `Content-*` headers of `id`. Returns
    /// the new child.
    pub(crate) fn wrap_in_multipart(&mut self, id: PartId, subtype: &str) -> Result<PartId> {
        let child_id = PartId(self.parts.len());
        let part = self.node_mut(id)?;

        let mut moved = part.headers.clone();
        let names: Vec<String> = part.headers.iter().map(|h| h.name().to_string()).collect();
        for name in &names {
            if is_content_header(name) {
                part.headers.remove(name);
            } else {
                moved.remove(name);
            }
        }

        let mut child = part.clone();
        child.headers = moved;
        child.parent = Some(id);
        child.range = None;
        child.dirty = true;

        part.children = vec![child_id];
        part.body = Body::empty();
        part.range = None;
        part.boundary = None;
        part.headers.add(
            "Content-Type",
            ContentType::new("multipart", subtype).to_string(),
        );
        if id == PartId::ROOT && part.headers.get("MIME-Version").is_none() {
            part.headers.add("MIME-Version", "1.0");
        }
        part.refresh_content_type();

        let grandchildren = child.children.clone();
        self.parts.push(child);
        for gc in grandchildren {
            self.node_mut(gc)?.parent = Some(child_id);
        }
        self.mark_dirty(id);
        debug!(part = %id, subtype, "Wrapped part in multipart container");
        Ok(child_id)
    }

    /// Add `part` as the last child of multipart `parent`.
    pub fn attach_part(&mut self, parent: PartId, mut part: Part) -> Result<PartId> {
        if !self.node(parent)?.content_type.is_multipart() {
            return Err(MimeError::NotMultipart);
        }
        let id = PartId(self.parts.len());
        part.parent = Some(parent);
        part.children.clear();
        part.range = None;
        part.dirty = true;
        self.parts.push(part);
        self.node_mut(parent)?.children.push(id);
        self.mark_dirty(parent);
        Ok(id)
    }

    /// Unlink `id` from its parent and return a copy of it. The root cannot
    /// be detached.
    pub fn detach_part(&mut self, id: PartId) -> Result<Part> {
        let parent = self
            .node(id)?
            .parent
            .ok_or_else(|| MimeError::InvalidEdit("the root part cannot be detached".into()))?;
        self.node_mut(parent)?.children.retain(|c| *c != id);
        self.mark_dirty(parent);
        let part = self.node_mut(id)?;
        part.parent = None;
        Ok(part.clone())
    }

    /// Add an attachment, turning the message into `multipart/mixed` first
    /// when it is not one already.
    pub fn add_attachment(
        &mut self,
        content: impl Into<Vec<u8>>,
        mime_type: &str,
        filename: &str,
        encoding: TransferEncoding,
    ) -> Result<PartId> {
        let ct = ContentType::parse(mime_type)
            .unwrap_or_else(|| ContentType::new("application", "octet-stream"))
            .with_param("name", filename);
        let mut part = Part::new(ct, content);
        let disposition = ParameterizedValue {
            value: "attachment".into(),
            params: vec![("filename".into(), filename.to_string())],
        };
        part.headers.add("Content-Disposition", disposition.to_string());
        part.headers
            .add("Content-Transfer-Encoding", encoding.to_string());

        if !self.node(PartId::ROOT)?.content_type.is("multipart/mixed") {
            if self.is_blank_root() {
                self.set_header(PartId::ROOT, "Content-Type", "multipart/mixed")?;
                self.remove_header(PartId::ROOT, "Content-Transfer-Encoding")?;
            } else {
                self.wrap_in_multipart(PartId::ROOT, "mixed")?;
            }
        }
        self.attach_part(PartId::ROOT, part)
    }

    /// Detach the `index`-th attachment.
    pub fn remove_attachment(&mut self, index: usize) -> Result<Part> {
        let id = self.attachment_part(index)?;
        self.detach_part(id)
    }
}

fn is_content_header(name: &str) -> bool {
    name.get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("content-"))
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("source", &self.source)
            .field("parts", &self.parts.len())
            .field("charset_override", &self.charset_override)
            .finish()
    }
}
