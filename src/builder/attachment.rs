//! Attachment classification and per-attachment part construction.

use crate::error::Result;
use crate::model::entity::{mime_param, Body, MediaType, MessageEntity};
use crate::model::request::AttachmentSpec;

use super::message::add_custom_headers;

/// Filename used when the caller gives none.
pub const DEFAULT_FILENAME: &str = "file";

/// Content type used when neither the caller nor the extension says otherwise.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const INLINE: &str = "inline";
const ATTACHMENT: &str = "attachment";

/// Resolve the disposition of an attachment.
///
/// An explicit `contentDisposition` wins; otherwise attachments with a
/// content-id are inline and everything else is a regular attachment.
pub fn disposition(spec: &AttachmentSpec) -> &str {
    match spec.content_disposition.as_deref() {
        Some(explicit) if !explicit.is_empty() => explicit,
        _ if has_cid(spec) => INLINE,
        _ => ATTACHMENT,
    }
}

/// Split attachments into `(inline, download)`, preserving input order in each.
pub fn classify(attachments: &[AttachmentSpec]) -> (Vec<&AttachmentSpec>, Vec<&AttachmentSpec>) {
    attachments
        .iter()
        .partition(|spec| disposition(spec) == INLINE)
}

/// Resolve the content type: explicit, else guessed from the filename, else
/// `application/octet-stream`.
pub fn content_type(spec: &AttachmentSpec) -> Result<MediaType> {
    match spec.content_type.as_deref() {
        Some(explicit) if !explicit.is_empty() => MediaType::parse(explicit),
        _ => MediaType::parse(guess_content_type(filename(spec)).unwrap_or(DEFAULT_CONTENT_TYPE)),
    }
}

/// Resolve the transfer encoding.
///
/// `None` means the builder sets no header: text parts get their encoding
/// picked when the message is serialized.
pub fn transfer_encoding<'a>(spec: &'a AttachmentSpec, media: &MediaType) -> Option<&'a str> {
    match spec.content_transfer_encoding.as_deref() {
        Some(explicit) => Some(explicit),
        None if media.is_text() => None,
        None => Some("base64"),
    }
}

/// The filename as written into `Content-Disposition`.
pub fn filename(spec: &AttachmentSpec) -> &str {
    spec.filename.as_deref().unwrap_or(DEFAULT_FILENAME)
}

fn has_cid(spec: &AttachmentSpec) -> bool {
    spec.cid.as_deref().is_some_and(|cid| !cid.is_empty())
}

/// Build the MIME part for one attachment.
pub fn build_part(spec: &AttachmentSpec) -> Result<MessageEntity> {
    let mut media = content_type(spec)?;
    let encoding = transfer_encoding(spec, &media);

    let body = match encoding {
        Some(cte) if !cte.is_empty() => Body::Encoded(spec.content.clone()),
        _ if media.is_text() => Body::Text(spec.content.clone()),
        _ => Body::Encoded(spec.content.clone()),
    };
    if media.is_text() {
        media.charset = Some("utf-8".to_string());
    }

    let mut part = MessageEntity::leaf(media, body);
    let headers = part.headers_mut();

    headers.add(
        "Content-Disposition",
        format!("{}; {}", disposition(spec), mime_param("filename", filename(spec))),
    );
    if let Some(cte) = encoding.filter(|cte| !cte.is_empty()) {
        headers.add("Content-Transfer-Encoding", cte);
    }
    if let Some(cid) = spec.cid.as_deref().filter(|cid| !cid.is_empty()) {
        headers.add("Content-ID", format!("<{cid}>"));
    }
    add_custom_headers(headers, &spec.headers);

    Ok(part)
}

/// Guess a media type from a filename extension.
pub fn guess_content_type(filename: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();

    let guess = match ext.as_str() {
        // Text
        "txt" | "text" | "log" | "conf" | "ini" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" | "markdown" => "text/markdown",
        "ics" => "text/calendar",
        "vcf" => "text/vcard",
        "eml" | "mht" | "mhtml" => "message/rfc822",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        // Audio / video
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "mpeg" | "mpg" => "video/mpeg",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        // Documents
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "js" => "application/javascript",
        "rtf" => "application/rtf",
        "doc" | "dot" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "tex" => "application/x-tex",
        "ps" | "eps" => "application/postscript",
        // Archives
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "bin" | "exe" => "application/octet-stream",
        _ => return None,
    };
    Some(guess)
}
