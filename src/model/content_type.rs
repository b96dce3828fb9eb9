//! Parameterized header values and the MIME content type built on them.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

/// Parsed `Content-Type` / `Content-Disposition` style value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterizedValue {
    /// The main token as written (`text/plain`, `attachment`).
    pub value: String,
    /// Parameters in source order, names lowercased, values fully decoded.
    pub params: Vec<(String, String)>,
}

impl ParameterizedValue {
    /// Parameter by name (case-insensitive).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace or append a parameter.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name.to_ascii_lowercase(), value)),
        }
    }
}

/// Characters escaped in RFC 2231 extended values.
const ATTR_CHAR_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']');

impl fmt::Display for ParameterizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        for (key, value) in &self.params {
            if !value.is_ascii() {
                let encoded = utf8_percent_encode(value, ATTR_CHAR_ESCAPES);
                write!(f, "; {key}*=utf-8''{encoded}")?;
            } else if value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
            {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }
        Ok(())
    }
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentType {
    /// Main type, lowercased (e.g. "text", "multipart").
    pub main_type: String,
    /// Subtype, lowercased (e.g. "plain", "mixed").
    pub sub_type: String,
    /// Parameters in source order.
    pub params: Vec<(String, String)>,
}

impl ContentType {
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// `text/plain; charset=us-ascii`, assumed when no Content-Type is given.
    pub fn default_text(charset: &str) -> Self {
        Self::new("text", "plain").with_param("charset", charset)
    }

    /// `message/rfc822`, the implicit type inside `multipart/digest`.
    pub fn message_rfc822() -> Self {
        Self::new("message", "rfc822")
    }

    /// Builds from a parsed parameterized value. A main token without `/`
    /// is `None`.
    pub fn from_parameterized(value: &ParameterizedValue) -> Option<Self> {
        let (main, sub) = value.value.split_once('/')?;
        let (main, sub) = (main.trim(), sub.trim());
        if main.is_empty() || sub.is_empty() {
            return None;
        }
        let mut ct = Self::new(main, sub);
        ct.params = value.params.clone();
        Some(ct)
    }

    /// Parses a content type string, falling back to `None` when the value
    /// is not `type/subtype`.
    pub fn parse(s: &str) -> Option<Self> {
        let value = crate::parser::params::parse_parameterized(s, &crate::decode::EncodingRsConverter);
        Self::from_parameterized(&value)
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name.to_ascii_lowercase(), value)),
        }
    }

    /// `type/subtype`.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// `true` when the essence equals `essence` (case-insensitive).
    pub fn is(&self, essence: &str) -> bool {
        essence
            .split_once('/')
            .is_some_and(|(m, s)| self.main_type.eq_ignore_ascii_case(m) && self.sub_type.eq_ignore_ascii_case(s))
    }

    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// `message/rfc822` and `message/global` wrap exactly one embedded message.
    pub fn is_embedded_message(&self) -> bool {
        self.main_type == "message" && matches!(self.sub_type.as_str(), "rfc822" | "global")
    }

    pub fn is_message(&self) -> bool {
        self.main_type == "message"
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let as_value = ParameterizedValue {
            value: self.essence(),
            params: self.params.clone(),
        };
        write!(f, "{as_value}")
    }
}
