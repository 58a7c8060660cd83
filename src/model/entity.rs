//! MIME entity tree produced by the builder.
//!
//! An entity is either a leaf (text body, attachment) or a multipart container
//! with ordered children. The `Content-Type` is kept structurally rather than
//! as a header so the serializer can add the boundary and charset parameters.

use crate::error::{RelayError, Result};

/// A `type/subtype` pair with an optional charset parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub main: String,
    pub sub: String,
    pub charset: Option<String>,
}

impl MediaType {
    /// A media type without parameters.
    pub fn new(main: &str, sub: &str) -> Self {
        Self {
            main: main.to_ascii_lowercase(),
            sub: sub.to_ascii_lowercase(),
            charset: None,
        }
    }

    /// `text/<sub>; charset="utf-8"`.
    pub fn text(sub: &str) -> Self {
        Self {
            charset: Some("utf-8".to_string()),
            ..Self::new("text", sub)
        }
    }

    /// `multipart/<sub>`.
    pub fn multipart(sub: &str) -> Self {
        Self::new("multipart", sub)
    }

    /// Split `type/subtype` on the first `/`.
    ///
    /// Parameters after a `;` are dropped; the builder decides the charset.
    pub fn parse(raw: &str) -> Result<Self> {
        let essence = raw.split(';').next().unwrap_or_default();
        let (main, sub) = essence
            .split_once('/')
            .ok_or_else(|| RelayError::MalformedContentType(raw.to_string()))?;
        Ok(Self::new(main.trim(), sub.trim()))
    }

    pub fn is_text(&self) -> bool {
        self.main == "text"
    }

    pub fn is_multipart(&self) -> bool {
        self.main == "multipart"
    }

    /// `main/sub` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main, self.sub)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.main, self.sub)?;
        if let Some(ref charset) = self.charset {
            write!(f, "; charset=\"{charset}\"")?;
        }
        Ok(())
    }
}

/// Ordered header list. Names keep their original case; lookups ignore it.
///
/// Duplicates are allowed, as in any RFC 5322 header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove every header called `name`, returning how many were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        before - self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Payload of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Text whose transfer encoding is chosen at serialization time.
    Text(String),
    /// Payload already in the transfer encoding its headers declare.
    Encoded(String),
    /// Ordered children of a multipart container.
    Multipart(Vec<MessageEntity>),
}

/// A node of the MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntity {
    content_type: MediaType,
    headers: Headers,
    body: Body,
}

impl MessageEntity {
    /// A leaf part.
    pub fn leaf(content_type: MediaType, body: Body) -> Self {
        Self {
            content_type,
            headers: Headers::new(),
            body,
        }
    }

    /// A UTF-8 text part (`text/plain`, `text/html`, …).
    pub fn text(sub: &str, content: &str) -> Self {
        Self::leaf(MediaType::text(sub), Body::Text(content.to_string()))
    }

    /// A `multipart/<sub>` container holding `parts` in order.
    pub fn multipart(sub: &str, parts: Vec<MessageEntity>) -> Self {
        Self {
            content_type: MediaType::multipart(sub),
            headers: Headers::new(),
            body: Body::Multipart(parts),
        }
    }

    pub fn content_type(&self) -> &MediaType {
        &self.content_type
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Children of a multipart entity; empty for leaves.
    pub fn parts(&self) -> &[MessageEntity] {
        match self.body {
            Body::Multipart(ref parts) => parts,
            _ => &[],
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }
}

/// Format a `name="value"` MIME parameter.
///
/// Non-ASCII values use the RFC 2231 extended form `name*=utf-8''…`.
pub fn mime_param(name: &str, value: &str) -> String {
    if value.is_ascii() {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("{name}=\"{escaped}\"");
    }

    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("{name}*=utf-8''{encoded}")
}
