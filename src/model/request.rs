//! The JSON mail request read from standard input.
//!
//! The shape is loosely based on Nodemailer's mail composer: every field is
//! optional, header fields take either a string or a list of strings, and
//! attachments carry their payload inline. Parsing validates the shape once,
//! at the boundary, so the builder only ever sees typed data.

use serde_json::{Map, Value};

use crate::error::{RelayError, Result};
use crate::parser::header::is_field_name;

/// A header value as supplied by the caller: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Text(String),
    List(Vec<String>),
}

impl HeaderValue {
    /// `true` for an empty string or an empty list.
    ///
    /// A list of empty strings is *not* empty; it still joins to a value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// Flatten into a single header value, joining list items with `sep`.
    pub fn join(&self, sep: &str) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(sep),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            _ => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(String::from).collect())
    }
}

/// Caller-supplied extra headers, in input order.
pub type CustomHeaders = Vec<(String, HeaderValue)>;

/// A complete mail request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub from: Option<HeaderValue>,
    pub sender: Option<HeaderValue>,
    pub to: Option<HeaderValue>,
    pub cc: Option<HeaderValue>,
    pub bcc: Option<HeaderValue>,
    pub reply_to: Option<HeaderValue>,
    pub in_reply_to: Option<HeaderValue>,
    pub references: Option<HeaderValue>,
    pub subject: Option<HeaderValue>,
    pub message_id: Option<HeaderValue>,
    pub date: Option<HeaderValue>,

    /// Plain-text body (empty when absent).
    pub text: String,
    /// HTML body (empty when absent).
    pub html: String,

    pub headers: CustomHeaders,
    pub attachments: Vec<AttachmentSpec>,

    /// SMTP host to relay through; not part of the message itself.
    pub host: Option<String>,
}

/// One attachment as described by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSpec {
    /// `None` means the key was absent; the builder then uses `"file"`.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Content-ID without angle brackets.
    pub cid: Option<String>,
    pub content_disposition: Option<String>,
    /// An explicit empty string suppresses the header entirely.
    pub content_transfer_encoding: Option<String>,
    pub headers: CustomHeaders,
    /// Payload, embedded exactly as given.
    pub content: String,
}

impl Request {
    /// Parse a request from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(&value)
    }

    /// Parse a request from raw stdin bytes.
    pub fn from_slice(input: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(input)?;
        Self::from_value(&value)
    }

    /// Validate and convert an already-decoded JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| RelayError::InvalidRequest("expected a JSON object".into()))?;

        Ok(Self {
            from: header_field(obj, "from")?,
            sender: header_field(obj, "sender")?,
            to: header_field(obj, "to")?,
            cc: header_field(obj, "cc")?,
            bcc: header_field(obj, "bcc")?,
            reply_to: header_field(obj, "replyTo")?,
            in_reply_to: header_field(obj, "inReplyTo")?,
            references: header_field(obj, "references")?,
            subject: header_field(obj, "subject")?,
            message_id: header_field(obj, "messageId")?,
            date: header_field(obj, "date")?,
            text: string_field(obj, "text")?.unwrap_or_default(),
            html: string_field(obj, "html")?.unwrap_or_default(),
            headers: custom_headers(obj.get("headers"))?,
            attachments: attachments(obj.get("attachments"))?,
            host: string_field(obj, "host")?.filter(|h| !h.is_empty()),
        })
    }
}

impl AttachmentSpec {
    fn from_object(obj: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            filename: string_field(obj, "filename")?,
            content_type: string_field(obj, "contentType")?,
            cid: string_field(obj, "cid")?,
            content_disposition: string_field(obj, "contentDisposition")?,
            content_transfer_encoding: string_field(obj, "contentTransferEncoding")?,
            headers: custom_headers(obj.get("headers"))?,
            content: string_field(obj, "content")?.unwrap_or_default(),
        })
    }
}

fn header_field(obj: &Map<String, Value>, key: &str) -> Result<Option<HeaderValue>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => HeaderValue::from_json(value).map(Some).ok_or_else(|| {
            RelayError::InvalidRequest(format!("'{key}' must be a string or a list of strings"))
        }),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RelayError::InvalidRequest(format!(
            "'{key}' must be a string"
        ))),
    }
}

/// Anything other than an object is ignored, matching how the headers
/// mapping was always treated.
fn custom_headers(value: Option<&Value>) -> Result<CustomHeaders> {
    let Some(Value::Object(map)) = value else {
        return Ok(Vec::new());
    };

    map.iter()
        .map(|(name, value)| {
            // A name with a colon or line break would smuggle in extra header lines.
            if !is_field_name(name) {
                return Err(RelayError::InvalidRequest(format!(
                    "invalid header name {name:?}"
                )));
            }
            if value.is_null() {
                return Ok((name.clone(), HeaderValue::List(Vec::new())));
            }
            HeaderValue::from_json(value)
                .map(|v| (name.clone(), v))
                .ok_or_else(|| {
                    RelayError::InvalidRequest(format!(
                        "header '{name}' must be a string or a list of strings"
                    ))
                })
        })
        .collect()
}

fn attachments(value: Option<&Value>) -> Result<Vec<AttachmentSpec>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(obj) => AttachmentSpec::from_object(obj),
                _ => Err(RelayError::InvalidAttachmentSpec { index }),
            })
            .collect(),
        Some(_) => Err(RelayError::InvalidRequest(
            "'attachments' must be a list".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal() {
        let req = Request::from_json("{}").unwrap();
        assert_eq!(req, Request::default());
    }

    #[test]
    fn test_parse_header_fields() {
        let req = Request::from_value(&json!({
            "from": "me@example.com",
            "to": ["a@x.com", "b@x.com"],
            "replyTo": "r@x.com",
            "references": ["<1@x>", "<2@x>"],
            "cc": null,
        }))
        .unwrap();
        assert_eq!(req.from, Some(HeaderValue::from("me@example.com")));
        assert_eq!(req.to, Some(HeaderValue::from(vec!["a@x.com", "b@x.com"])));
        assert_eq!(req.reply_to, Some(HeaderValue::from("r@x.com")));
        assert_eq!(req.references.unwrap().join(" "), "<1@x> <2@x>");
        assert_eq!(req.cc, None);
    }

    #[test]
    fn test_header_value_emptiness() {
        assert!(HeaderValue::from("").is_empty());
        assert!(HeaderValue::List(Vec::new()).is_empty());
        assert!(!HeaderValue::from(vec![""]).is_empty());
    }

    #[test]
    fn test_wrong_header_type_is_rejected() {
        let err = Request::from_value(&json!({ "subject": 42 })).unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(ref m) if m.contains("subject")));

        let err = Request::from_value(&json!({ "to": ["ok@x.com", 7] })).unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = Request::from_value(&json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
    }

    #[test]
    fn test_bad_json_is_json_error() {
        let err = Request::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RelayError::Json(_)));
    }

    #[test]
    fn test_headers_not_a_mapping_are_ignored() {
        let req = Request::from_value(&json!({ "headers": "X-Foo: bar" })).unwrap();
        assert!(req.headers.is_empty());

        let req = Request::from_value(&json!({ "headers": ["X-Foo"] })).unwrap();
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_custom_headers_keep_input_order() {
        let req = Request::from_json(r#"{"headers": {"X-Zeta": "1", "X-Alpha": ["a", "b"]}}"#)
            .unwrap();
        let names: Vec<&str> = req.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["X-Zeta", "X-Alpha"]);
    }

    #[test]
    fn test_header_names_must_be_field_names() {
        let err = Request::from_value(&json!({
            "headers": { "X-Scripts-SSL-Client-Email: forged@evil.com\r\nX-Pad": "1" }
        }))
        .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(ref m) if m.contains("header name")));

        for bad in ["", "Bad Name", "X-Colon:", "X-Tab\t", "X-Ünïcode"] {
            let mut headers = Map::new();
            headers.insert(bad.to_string(), json!("v"));
            let err = Request::from_value(&json!({ "headers": headers })).unwrap_err();
            assert!(matches!(err, RelayError::InvalidRequest(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_attachment_header_names_are_checked_too() {
        let err = Request::from_value(&json!({
            "attachments": [{ "filename": "a.txt", "headers": { "X-A\nBcc": "x@evil.com" } }]
        }))
        .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
    }

    #[test]
    fn test_attachment_entries_must_be_objects() {
        let err = Request::from_value(&json!({
            "attachments": [{ "filename": "a.txt" }, "oops"]
        }))
        .unwrap_err();
        assert!(matches!(err, RelayError::InvalidAttachmentSpec { index: 1 }));
    }

    #[test]
    fn test_attachments_must_be_a_list() {
        let err = Request::from_value(&json!({ "attachments": { "filename": "a" } })).unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_attachment_fields() {
        let req = Request::from_value(&json!({
            "attachments": [{
                "filename": "logo.png",
                "contentType": "image/png",
                "cid": "logo1",
                "contentTransferEncoding": "base64",
                "headers": { "X-Attachment-Id": "1" },
                "content": "iVBORw0KGgo="
            }]
        }))
        .unwrap();
        let att = &req.attachments[0];
        assert_eq!(att.filename.as_deref(), Some("logo.png"));
        assert_eq!(att.content_type.as_deref(), Some("image/png"));
        assert_eq!(att.cid.as_deref(), Some("logo1"));
        assert_eq!(att.content_disposition, None);
        assert_eq!(att.headers.len(), 1);
        assert_eq!(att.content, "iVBORw0KGgo=");
    }

    #[test]
    fn test_host_is_optional() {
        let req = Request::from_value(&json!({ "host": "smtp.example.com" })).unwrap();
        assert_eq!(req.host.as_deref(), Some("smtp.example.com"));
        let req = Request::from_value(&json!({ "host": "" })).unwrap();
        assert_eq!(req.host, None);
    }
}
