//! RFC 2822 serialization of a [`MessageEntity`] tree.

use rand::Rng;

use crate::model::entity::{Body, MessageEntity};

use super::body::{encode_text, encoded_payload};
use super::header::write_header;

/// Serialize a complete message, top-level headers included.
pub fn write_message(entity: &MessageEntity, out: &mut Vec<u8>) {
    write_entity(entity, out, true);
    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
}

fn write_entity(entity: &MessageEntity, out: &mut Vec<u8>, top: bool) {
    let mut content_type = entity.content_type().to_string();

    let rendered_body = match entity.body() {
        Body::Multipart(parts) => {
            let rendered: Vec<Vec<u8>> = parts
                .iter()
                .map(|part| {
                    let mut buf = Vec::new();
                    write_entity(part, &mut buf, false);
                    buf
                })
                .collect();
            let boundary = pick_boundary(&rendered);
            content_type.push_str(&format!("; boundary=\"{boundary}\""));
            RenderedBody::Multipart { boundary, parts: rendered }
        }
        Body::Text(text) => {
            if let Some(cte) = entity.headers().get("Content-Transfer-Encoding") {
                RenderedBody::Leaf {
                    cte: None,
                    payload: encoded_payload(text, Some(cte)),
                }
            } else {
                let (encoding, payload) = encode_text(text);
                RenderedBody::Leaf {
                    cte: Some(encoding.as_str()),
                    payload,
                }
            }
        }
        Body::Encoded(payload) => RenderedBody::Leaf {
            cte: None,
            payload: encoded_payload(payload, entity.headers().get("Content-Transfer-Encoding")),
        },
    };

    write_header(out, "Content-Type", &content_type);
    if top {
        write_header(out, "MIME-Version", "1.0");
    }
    for (name, value) in entity.headers().iter() {
        write_header(out, name, value);
    }

    match rendered_body {
        RenderedBody::Leaf { cte, payload } => {
            if let Some(cte) = cte {
                write_header(out, "Content-Transfer-Encoding", cte);
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(payload.as_bytes());
        }
        RenderedBody::Multipart { boundary, parts } => {
            out.extend_from_slice(b"\r\n");
            for part in parts {
                out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                out.extend_from_slice(&part);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        }
    }
}

enum RenderedBody {
    Leaf {
        cte: Option<&'static str>,
        payload: String,
    },
    Multipart {
        boundary: String,
        parts: Vec<Vec<u8>>,
    },
}

/// Generate a random boundary that does not occur in any of the parts.
fn pick_boundary(parts: &[Vec<u8>]) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let token: u64 = rng.gen_range(0..10_000_000_000_000_000_000);
        let boundary = format!("==============={token:019}==");
        if !parts.iter().any(|part| contains(part, boundary.as_bytes())) {
            return boundary;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
