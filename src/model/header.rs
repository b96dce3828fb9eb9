//! Header fields and ordered header collections.

use std::ops::Range;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::decode::charset::{decode_header_bytes, TextConverter};
use crate::model::address::AddressList;
use crate::model::content_type::ParameterizedValue;
use crate::parser::header::{parse_header_value, HeaderClass};

/// Typed value of a header, by header class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum HeaderValue {
    Addresses(AddressList),
    Parameterized(ParameterizedValue),
    /// `<...>` tokens, brackets kept.
    Identifiers(Vec<String>),
    /// `None` when the date could not be parsed.
    Date(Option<DateTime<FixedOffset>>),
    Text(String),
}

impl HeaderValue {
    pub fn as_addresses(&self) -> Option<&AddressList> {
        match self {
            Self::Addresses(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_parameterized(&self) -> Option<&ParameterizedValue> {
        match self {
            Self::Parameterized(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_identifiers(&self) -> Option<&[String]> {
        match self {
            Self::Identifiers(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Date(dt) => *dt,
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// One header field.
///
/// `raw_value` is everything between the colon and the line terminator with
/// folds joined. Parameterized headers keep their folds until the value is
/// parsed. Headers read from a source remember the byte range of their
/// original lines so an unmodified header can be written back verbatim.
#[derive(Debug)]
pub struct Header {
    name: String,
    raw_value: Vec<u8>,
    source_range: Option<Range<usize>>,
    parsed: OnceLock<HeaderValue>,
}

impl Header {
    /// A new programmatic header; it has no source lines.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_value: value.into().into_bytes(),
            source_range: None,
            parsed: OnceLock::new(),
        }
    }

    pub(crate) fn from_source(name: String, raw_value: Vec<u8>, source_range: Range<usize>) -> Self {
        Self {
            name,
            raw_value,
            source_range: Some(source_range),
            parsed: OnceLock::new(),
        }
    }

    /// Name as found (case preserved).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn raw_value(&self) -> &[u8] {
        &self.raw_value
    }

    /// Raw value as text, trimmed. Non-UTF-8 bytes are read as Windows-1252.
    pub fn value(&self) -> String {
        decode_header_bytes(&self.raw_value).trim().to_string()
    }

    /// Byte range of the original header lines, for unmodified headers.
    pub fn source_range(&self) -> Option<Range<usize>> {
        self.source_range.clone()
    }

    /// `true` when the header was added or changed after parsing.
    pub fn is_modified(&self) -> bool {
        self.source_range.is_none()
    }

    pub fn class(&self) -> HeaderClass {
        HeaderClass::for_name(&self.name)
    }

    /// Parsed value, computed on first use and cached.
    pub fn parsed(&self, converter: &dyn TextConverter) -> &HeaderValue {
        self.parsed
            .get_or_init(|| parse_header_value(&self.name, &self.value(), converter))
    }

    /// Replace the value; drops the cached parse and the source lines.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.raw_value = value.into().into_bytes();
        self.source_range = None;
        self.parsed.take();
    }
}

impl Clone for Header {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            raw_value: self.raw_value.clone(),
            source_range: self.source_range.clone(),
            parsed: self.parsed.get().cloned().map(OnceLock::from).unwrap_or_default(),
        }
    }
}

/// Ordered header fields; duplicates preserved.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header at the end.
    pub fn push(&mut self, header: Header) {
        self.fields.push(header);
    }

    /// Append a programmatic header.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.push(Header::new(name, value));
    }

    /// Replace the first header named `name` in place and remove the rest;
    /// append when absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter().position(|h| h.is(name)) {
            Some(first) => {
                self.fields[first].set_value(value);
                let mut index = 0;
                self.fields.retain(|h| {
                    let keep = index == first || !h.is(name);
                    index += 1;
                    keep
                });
            }
            None => self.add(name, value),
        }
    }

    /// Remove every header named `name`; returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|h| !h.is(name));
        before - self.fields.len()
    }

    /// First header named `name`.
    pub fn get(&self, name: &str) -> Option<&Header> {
        self.fields.iter().find(|h| h.is(name))
    }

    /// Every header named `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&Header> {
        self.fields.iter().filter(|h| h.is(name)).collect()
    }

    /// Trimmed raw value of the first header named `name`.
    pub fn value(&self, name: &str) -> Option<String> {
        self.get(name).map(Header::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `true` when any header was added or changed after parsing.
    pub fn any_modified(&self) -> bool {
        self.fields.iter().any(Header::is_modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::charset::EncodingRsConverter;

    #[test]
    fn test_get_is_case_insensitive_and_first() {
        let mut h = Headers::new();
        h.add("Received", "one");
        h.add("RECEIVED", "two");
        assert_eq!(h.value("received").as_deref(), Some("one"));
        assert_eq!(h.get_all("Received").len(), 2);
    }

    #[test]
    fn test_set_replaces_first_and_drops_rest() {
        let mut h = Headers::new();
        h.add("X-A", "1");
        h.add("Subject", "old");
        h.add("subject", "dup");
        h.set("Subject", "new");
        assert_eq!(h.len(), 2);
        assert_eq!(h.value("subject").as_deref(), Some("new"));
        assert_eq!(h.iter().nth(1).map(Header::name), Some("Subject"));
    }

    #[test]
    fn test_remove() {
        let mut h = Headers::new();
        h.add("X-A", "1");
        h.add("x-a", "2");
        h.add("X-B", "3");
        assert_eq!(h.remove("X-A"), 2);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_parsed_value_is_cached_and_invalidated() {
        let conv = EncodingRsConverter;
        let mut header = Header::new("Subject", "=?utf-8?Q?caf=C3=A9?=");
        assert_eq!(header.parsed(&conv).as_text(), Some("café"));
        header.set_value("plain");
        assert_eq!(header.parsed(&conv).as_text(), Some("plain"));
    }

    #[test]
    fn test_source_header_becomes_modified_on_set() {
        let mut header = Header::from_source("Subject".into(), b" hi".to_vec(), 0..12);
        assert!(!header.is_modified());
        assert_eq!(header.value(), "hi");
        header.set_value("bye");
        assert!(header.is_modified());
        assert_eq!(header.source_range(), None);
    }
}
