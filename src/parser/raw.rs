//! Raw RFC 2822 messages relayed without rebuilding.
//!
//! Only the header block is parsed (so the message can be stamped and its
//! envelope derived); the body is carried through untouched apart from
//! line-ending normalization.

use tracing::debug;

use crate::error::{RelayError, Result};
use crate::export::header::write_header;
use crate::export::Outgoing;
use crate::model::entity::Headers;

use super::header::{decode_header_bytes, unfold_headers};

/// A message read from stdin as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    headers: Headers,
    body: Vec<u8>,
}

impl RawMessage {
    /// Split raw bytes into a header list and an opaque body.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let data = skip_from_line(raw);
        let (header_bytes, body) = split_header_block(data);

        let text = decode_header_bytes(header_bytes);
        let headers = unfold_headers(&text).ok_or_else(|| {
            RelayError::InvalidRawMessage("header block contains a line that is not a header field".into())
        })?;
        if headers.is_empty() {
            return Err(RelayError::InvalidRawMessage("message has no headers".into()));
        }

        debug!(headers = headers.len(), body_bytes = body.len(), "Parsed raw message");
        Ok(Self {
            headers,
            body: body.to_vec(),
        })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Outgoing for RawMessage {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in self.headers.iter() {
            write_header(out, name, value);
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&normalize_crlf(&self.body));
        if !self.body.is_empty() && !out.ends_with(b"\r\n") {
            out.extend_from_slice(b"\r\n");
        }
    }
}

/// Skip a leading mbox `From ` separator line, as left by some mail tools.
fn skip_from_line(data: &[u8]) -> &[u8] {
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Split at the first empty line. Without one, everything is headers.
fn split_header_block(data: &[u8]) -> (&[u8], &[u8]) {
    let mut line_start = 0;
    for (i, &b) in data.iter().enumerate() {
        if b != b'\n' {
            continue;
        }
        let line = &data[line_start..i];
        if line.is_empty() || line == b"\r" {
            return (&data[..line_start], &data[i + 1..]);
        }
        line_start = i + 1;
    }
    (data, &[])
}

/// Turn bare `\n` into CRLF, leaving existing CRLF pairs alone.
fn normalize_crlf(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + body.len() / 32);
    let mut prev = 0u8;
    for &b in body {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    out
}
