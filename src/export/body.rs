//! Body encodings for leaf parts.

use base64::Engine;

/// RFC 5322 hard limit on line length, excluding CRLF.
const MAX_LINE: usize = 998;
/// Line width for base64 bodies (RFC 2045 §6.8).
const BASE64_LINE: usize = 76;

/// Transfer encoding picked for a text body that declares none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    SevenBit,
    QuotedPrintable,
}

impl TextEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::QuotedPrintable => "quoted-printable",
        }
    }
}

/// `7bit` when the text is pure ASCII with no overlong line, otherwise
/// `quoted-printable`.
pub fn choose_text_encoding(text: &str) -> TextEncoding {
    let short_lines = text.split('\n').all(|line| line.trim_end_matches('\r').len() <= MAX_LINE);
    if text.is_ascii() && short_lines {
        TextEncoding::SevenBit
    } else {
        TextEncoding::QuotedPrintable
    }
}

/// Encode a UTF-8 text body, returning the encoding used and the wire form.
pub fn encode_text(text: &str) -> (TextEncoding, String) {
    let normalized = normalize_newlines(text);
    match choose_text_encoding(text) {
        TextEncoding::SevenBit => (TextEncoding::SevenBit, normalized),
        TextEncoding::QuotedPrintable => (
            TextEncoding::QuotedPrintable,
            quoted_printable::encode_to_str(normalized.as_bytes()),
        ),
    }
}

/// Convert lone `\n` and lone `\r` into CRLF.
pub fn normalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            _ => out.push(ch),
        }
    }

    out
}

/// Prepare an already-encoded payload for the wire.
///
/// Base64 payloads are commonly supplied as one long line; those are
/// re-wrapped at 76 columns. Everything else only gets CRLF line endings.
pub fn encoded_payload(payload: &str, transfer_encoding: Option<&str>) -> String {
    let is_base64 = transfer_encoding.is_some_and(|cte| cte.trim().eq_ignore_ascii_case("base64"));
    if is_base64 && payload.lines().any(|line| line.len() > BASE64_LINE) {
        return wrap_base64(payload);
    }
    normalize_newlines(payload)
}

fn wrap_base64(payload: &str) -> String {
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if let Err(e) = base64::engine::general_purpose::STANDARD.decode(&compact) {
        tracing::warn!(error = %e, "Attachment payload is not valid base64, sending as given");
    }

    compact
        .chunks(BASE64_LINE)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}
