//! Assemble a complete MIME tree from a [`Request`].
//!
//! The full shape, when every feature is used:
//!
//! ```text
//! multipart/mixed
//! ├── multipart/related
//! │   ├── multipart/alternative
//! │   │   ├── text/plain
//! │   │   └── text/html        (may reference cid:logo1)
//! │   └── image/png            (inline, Content-ID: <logo1>)
//! └── application/pdf          (download attachment)
//! ```
//!
//! Every container level is only created when it would have more than one
//! child, so a plain-text message with no attachments is a single leaf.

use tracing::debug;

use crate::error::Result;
use crate::model::entity::{Headers, MessageEntity};
use crate::model::request::{AttachmentSpec, CustomHeaders, HeaderValue, Request};

use super::attachment::{build_part, classify};

/// Separator for list-valued headers.
const LIST_SEP: &str = ", ";
/// `References` is a whitespace-separated list of message ids.
const REFERENCES_SEP: &str = " ";

/// Build the MIME tree for a request.
///
/// Either the whole message is built or an error is returned; nothing
/// partial escapes.
pub fn build(request: &Request) -> Result<MessageEntity> {
    let (inline, download) = classify(&request.attachments);
    debug!(
        inline = inline.len(),
        download = download.len(),
        "Building message"
    );

    let body = text_alternatives(&request.text, &request.html);
    let related = wrap_if_nonempty("related", body, &inline)?;
    let mut message = wrap_if_nonempty("mixed", related, &download)?;

    let headers = message.headers_mut();
    add_header(headers, "From", request.from.as_ref(), LIST_SEP);
    add_header(headers, "Sender", request.sender.as_ref(), LIST_SEP);
    add_header(headers, "To", request.to.as_ref(), LIST_SEP);
    add_header(headers, "Cc", request.cc.as_ref(), LIST_SEP);
    add_header(headers, "Bcc", request.bcc.as_ref(), LIST_SEP);
    add_header(headers, "Reply-To", request.reply_to.as_ref(), LIST_SEP);
    add_header(headers, "In-Reply-To", request.in_reply_to.as_ref(), LIST_SEP);
    add_header(headers, "References", request.references.as_ref(), REFERENCES_SEP);
    add_header(headers, "Subject", request.subject.as_ref(), LIST_SEP);
    add_header(headers, "Message-ID", request.message_id.as_ref(), LIST_SEP);
    add_header(headers, "Date", request.date.as_ref(), LIST_SEP);
    add_custom_headers(headers, &request.headers);

    Ok(message)
}

/// The text body: `multipart/alternative` when both formats are present,
/// otherwise whichever one is non-empty (plain text if neither is).
pub fn text_alternatives(plain: &str, html: &str) -> MessageEntity {
    match (plain.is_empty(), html.is_empty()) {
        (false, false) => MessageEntity::multipart(
            "alternative",
            vec![
                MessageEntity::text("plain", plain),
                MessageEntity::text("html", html),
            ],
        ),
        (true, false) => MessageEntity::text("html", html),
        _ => MessageEntity::text("plain", plain),
    }
}

/// Wrap `main` and the attachments in a `multipart/<subtype>`, or return
/// `main` untouched when there are no attachments.
pub fn wrap_if_nonempty(
    subtype: &str,
    main: MessageEntity,
    attachments: &[&AttachmentSpec],
) -> Result<MessageEntity> {
    if attachments.is_empty() {
        return Ok(main);
    }

    let mut parts = Vec::with_capacity(attachments.len() + 1);
    parts.push(main);
    for spec in attachments {
        parts.push(build_part(spec)?);
    }
    Ok(MessageEntity::multipart(subtype, parts))
}

/// Append a header unless the value is missing or empty.
pub fn add_header(headers: &mut Headers, name: &str, value: Option<&HeaderValue>, sep: &str) {
    match value {
        Some(value) if !value.is_empty() => headers.add(name, value.join(sep)),
        _ => {}
    }
}

/// Append caller-supplied headers in order, skipping empty values.
pub fn add_custom_headers(headers: &mut Headers, custom: &CustomHeaders) {
    for (name, value) in custom {
        add_header(headers, name, Some(value), LIST_SEP);
    }
}
