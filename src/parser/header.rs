//! RFC 5322 header block parsing: byte decoding and unfolding.

use crate::model::entity::Headers;

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold a header block: continuation lines (starting with space or tab)
/// are joined to the previous header with a single space.
///
/// Names keep their case. Returns `None` if a line is neither a field nor a
/// continuation of one, which means the block is not a header block.
pub fn unfold_headers(text: &str) -> Option<Headers> {
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            let (_, value) = fields.last_mut()?;
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(line.trim());
        } else if let Some((name, value)) = line.split_once(':') {
            if !is_field_name(name) {
                return None;
            }
            fields.push((name.to_string(), value.trim().to_string()));
        } else {
            return None;
        }
    }

    let mut headers = Headers::new();
    for (name, value) in fields {
        headers.add(name, value);
    }
    Some(headers)
}

/// RFC 5322 §3.6.8: printable ASCII except colon, at least one character.
pub fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}
