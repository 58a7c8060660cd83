//! Header rendering through lettre's header types.
//!
//! lettre B-encodes non-ASCII words (RFC 2047) and folds long lines. Address
//! headers are parsed into lettre mailboxes first so a display name is
//! encoded on its own and the address stays readable.

use lettre::message::header::{self, HeaderName, HeaderValue, Headers};
use lettre::message::{Mailbox, Mailboxes};

/// Render one `Name: value` line, CRLF-terminated.
///
/// Returns `None` when `name` is not a valid field name.
pub fn render_header(name: &str, value: &str) -> Option<String> {
    let value = sanitize_value(value);
    let mut headers = Headers::new();

    if !set_address_header(&mut headers, name, &value) {
        let name = HeaderName::new_from_ascii(name.to_string()).ok()?;
        headers.insert_raw(HeaderValue::new(name, separate_angle_addr(&value)));
    }
    Some(headers.to_string())
}

/// Append a rendered header to `out`, skipping it if the name is invalid.
pub fn write_header(out: &mut Vec<u8>, name: &str, value: &str) {
    match render_header(name, value) {
        Some(line) => out.extend_from_slice(line.as_bytes()),
        None => tracing::warn!(header = name, "Skipping header with an invalid name"),
    }
}

/// Replace CR and LF with spaces and drop other control characters, so a
/// value can never start a new header line.
pub fn sanitize_value(value: &str) -> String {
    value
        .replace(['\r', '\n'], " ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Typed lettre header for the address fields. Returns `false` for other
/// names and for values lettre cannot parse as mailboxes (group syntax, for
/// instance), which then go out as plain text.
fn set_address_header(headers: &mut Headers, name: &str, value: &str) -> bool {
    let lower = name.to_ascii_lowercase();

    if lower == "sender" {
        return match value.parse::<Mailbox>() {
            Ok(mailbox) => {
                headers.set(header::Sender::from(mailbox));
                true
            }
            Err(_) => false,
        };
    }

    if !matches!(lower.as_str(), "from" | "to" | "cc" | "bcc" | "reply-to") {
        return false;
    }
    let Ok(mailboxes) = value.parse::<Mailboxes>() else {
        tracing::debug!(header = name, "Address header is not a mailbox list, sending as text");
        return false;
    };

    match lower.as_str() {
        "from" => headers.set(header::From::from(mailboxes)),
        "to" => headers.set(header::To::from(mailboxes)),
        "cc" => headers.set(header::Cc::from(mailboxes)),
        "bcc" => headers.set(header::Bcc::from(mailboxes)),
        _ => headers.set(header::ReplyTo::from(mailboxes)),
    }
    true
}

/// Put a space before each `<` that directly follows text, so `Zoë<z@x.com>`
/// is encoded as a name followed by an untouched address.
fn separate_angle_addr(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev: Option<char> = None;
    for c in value.chars() {
        if c == '<' && prev.is_some_and(|p| !p.is_whitespace()) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
