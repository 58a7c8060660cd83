//! Integration tests: JSON request → MIME tree → wire bytes → relay.
//!
//! Serialized output is parsed back with `mail-parser` to check that other
//! mail software reads it the way it was meant.

use std::path::{Path, PathBuf};

use lettre::transport::stub::StubTransport;
use mail_parser::{MessageParser, MimeHeaders};
use predicates::prelude::*;

use mailrelay::builder;
use mailrelay::cgi::Response;
use mailrelay::config::Config;
use mailrelay::error::RelayError;
use mailrelay::export::Outgoing;
use mailrelay::model::entity::MessageEntity;
use mailrelay::model::request::Request;
use mailrelay::parser::raw::RawMessage;
use mailrelay::relay::{self, Stamp};
use mailrelay::session::{InputFormat, Session};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).unwrap()
}

fn build_fixture(name: &str) -> MessageEntity {
    let request = Request::from_slice(&read_fixture(name)).unwrap();
    builder::build(&request).unwrap()
}

fn wire(message: &impl Outgoing) -> Vec<u8> {
    message.to_bytes()
}

fn header_block(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.split("\r\n\r\n").next().unwrap().to_string()
}

// ─── Structure ──────────────────────────────────────────────────────

#[test]
fn test_newsletter_nesting() {
    let message = build_fixture("newsletter.json");

    assert_eq!(message.content_type().essence(), "multipart/mixed");
    let mixed = message.parts();
    assert_eq!(mixed.len(), 3, "related tier plus two downloads");

    let related = &mixed[0];
    assert_eq!(related.content_type().essence(), "multipart/related");
    assert_eq!(related.parts().len(), 2);
    assert_eq!(
        related.parts()[0].content_type().essence(),
        "multipart/alternative"
    );
    assert_eq!(related.parts()[1].content_type().essence(), "image/png");

    assert_eq!(mixed[1].content_type().essence(), "application/pdf");
    assert_eq!(mixed[2].content_type().essence(), "text/plain");
}

#[test]
fn test_plain_request_is_a_single_part() {
    let message = build_fixture("plain.json");
    assert!(!message.is_multipart());
    assert_eq!(message.content_type().essence(), "text/plain");
    assert_eq!(message.headers().get("Subject"), Some("Hello"));
}

#[test]
fn test_only_inline_attachments_skip_mixed() {
    let request = Request::from_json(
        r#"{"html": "<img src=\"cid:a\">",
            "attachments": [{"filename": "a.gif", "cid": "a", "content": "R0lG"}]}"#,
    )
    .unwrap();
    let message = builder::build(&request).unwrap();
    assert_eq!(message.content_type().essence(), "multipart/related");
    assert_eq!(message.parts()[0].content_type().essence(), "text/html");
}

#[test]
fn test_explicit_disposition_moves_cid_part_to_mixed() {
    let request = Request::from_json(
        r#"{"text": "hi",
            "attachments": [{"filename": "a.gif", "cid": "a",
                             "contentDisposition": "attachment", "content": "R0lG"}]}"#,
    )
    .unwrap();
    let message = builder::build(&request).unwrap();
    assert_eq!(message.content_type().essence(), "multipart/mixed");
    let part = &message.parts()[1];
    assert_eq!(part.headers().get("Content-ID"), Some("<a>"));
    assert!(part
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .starts_with("attachment;"));
}

#[test]
fn test_malformed_content_type_builds_nothing() {
    let request = Request::from_json(
        r#"{"text": "hi", "attachments": [{"filename": "x", "contentType": "garbage"}]}"#,
    )
    .unwrap();
    let err = builder::build(&request).unwrap_err();
    assert!(matches!(err, RelayError::MalformedContentType(ref t) if t == "garbage"));
}

// ─── Wire format, re-parsed ─────────────────────────────────────────

#[test]
fn test_newsletter_reparses() {
    let bytes = wire(&build_fixture("newsletter.json"));
    let parsed = MessageParser::default().parse(&bytes).unwrap();

    assert_eq!(parsed.subject(), Some("Menú de la semana"));
    assert_eq!(
        parsed
            .from()
            .and_then(|addr| addr.first())
            .and_then(|addr| addr.address()),
        Some("news@example.com")
    );
    assert_eq!(parsed.message_id(), Some("weekly-42@example.com"));

    let text = parsed.body_text(0).unwrap();
    assert!(text.contains("café con leche"), "decoded text body: {text}");
    let html = parsed.body_html(0).unwrap();
    assert!(html.contains("<b>café con leche</b>"), "decoded html body: {html}");

    assert_eq!(
        parsed.header_raw("X-Campaign").map(str::trim),
        Some("weekly")
    );
    assert_eq!(
        parsed.header_raw("X-Tags").map(str::trim),
        Some("food, coffee")
    );
}

#[test]
fn test_attachment_payloads_survive() {
    let bytes = wire(&build_fixture("newsletter.json"));
    let parsed = MessageParser::default().parse(&bytes).unwrap();

    let find = |name: &str| {
        parsed
            .parts
            .iter()
            .find(|part| part.attachment_name() == Some(name))
            .unwrap_or_else(|| panic!("no part named {name}"))
    };

    assert_eq!(find("menu.pdf").contents(), b"%PDF-1.4\n");
    assert_eq!(find("logo.png").contents(), b"hello png");
    assert_eq!(find("logo.png").content_id(), Some("logo@example.com"));
    assert!(find("notes.txt").contents().starts_with(b"Bring a mug."));
}

#[test]
fn test_non_ascii_filename() {
    let request = Request::from_json(
        r#"{"text": "cv attached",
            "attachments": [{"filename": "résumé.pdf",
                             "contentTransferEncoding": "base64",
                             "content": "JVBERi0xLjQK"}]}"#,
    )
    .unwrap();
    let bytes = wire(&builder::build(&request).unwrap());
    let text = String::from_utf8_lossy(&bytes);
    assert!(predicate::str::contains("filename*=utf-8''r%C3%A9sum%C3%A9.pdf").eval(&*text));

    let parsed = MessageParser::default().parse(&bytes).unwrap();
    let names: Vec<&str> = parsed
        .attachments()
        .filter_map(|part| part.attachment_name())
        .collect();
    assert_eq!(names, ["résumé.pdf"]);
}

#[test]
fn test_lines_are_crlf_and_bounded() {
    let bytes = wire(&build_fixture("newsletter.json"));
    let text = String::from_utf8(bytes).unwrap();

    assert!(!text.replace("\r\n", "").contains('\n'), "bare LF in output");
    for line in text.split("\r\n") {
        assert!(line.len() <= 998, "line too long: {line}");
    }
}

#[test]
fn test_long_subject_folds() {
    let subject = "word ".repeat(60);
    let request = Request::from_json(&format!(
        r#"{{"subject": "{}", "text": "x"}}"#,
        subject.trim_end()
    ))
    .unwrap();
    let bytes = wire(&builder::build(&request).unwrap());

    for line in header_block(&bytes).split("\r\n") {
        assert!(line.len() <= 78, "header line over 78 octets: {line}");
    }
    let parsed = MessageParser::default().parse(&bytes).unwrap();
    assert_eq!(parsed.subject(), Some(subject.trim_end()));
}

#[test]
fn test_boundaries_do_not_collide_with_content() {
    let message = build_fixture("newsletter.json");
    let text = String::from_utf8(wire(&message)).unwrap();

    let boundaries: Vec<&str> = text
        .match_indices("boundary=\"")
        .map(|(at, marker)| {
            let rest = &text[at + marker.len()..];
            &rest[..rest.find('"').unwrap()]
        })
        .collect();
    assert_eq!(boundaries.len(), 3);
    for (i, boundary) in boundaries.iter().enumerate() {
        assert!(boundary.starts_with("==============="));
        assert!(boundaries[i + 1..].iter().all(|other| other != boundary));
        assert_eq!(text.matches(&format!("--{boundary}--")).count(), 1);
    }
}

// ─── Stamping and relay ─────────────────────────────────────────────

fn stamp() -> Stamp {
    Stamp {
        tracking_header: "X-Scripts-SSL-Client-Email".into(),
        login: "user@mit.edu".into(),
        server_header: "X-Relay-Server".into(),
        server: "scripts.mit.edu".into(),
    }
}

#[test]
fn test_bcc_is_enveloped_but_not_transmitted() {
    let mut message = build_fixture("newsletter.json");
    stamp().apply(&mut message, chrono::Utc::now());

    let transport = StubTransport::new_ok();
    relay::send(&transport, &message).unwrap();

    let sent = transport.messages();
    assert_eq!(sent.len(), 1);
    let (envelope, body) = &sent[0];

    assert_eq!(
        envelope.from().map(|addr| addr.to_string()).as_deref(),
        Some("news@example.com")
    );
    let recipients: Vec<String> = envelope.to().iter().map(|a| a.to_string()).collect();
    assert_eq!(
        recipients,
        [
            "alice@example.com",
            "bob@example.com",
            "carol@example.com",
            "hidden@example.com"
        ]
    );

    assert!(predicate::str::contains("Bcc:").not().eval(body.as_str()));
    assert!(predicate::str::contains("hidden@example.com").not().eval(body.as_str()));
    assert!(predicate::str::contains("X-Scripts-SSL-Client-Email: user@mit.edu").eval(body.as_str()));
}

#[test]
fn test_raw_message_is_restamped() {
    let mut message = RawMessage::parse(&read_fixture("forwarded.eml")).unwrap();
    stamp().apply(&mut message, chrono::Utc::now());

    let headers = message.headers();
    let tracking: Vec<&str> = headers.get_all("X-Scripts-SSL-Client-Email").collect();
    assert_eq!(tracking, ["user@mit.edu"]);
    assert_eq!(headers.get_all("Date").count(), 1);
    assert_eq!(headers.get("Date"), Some("Mon, 01 Jan 2024 00:00:00 +0000"));

    let text = String::from_utf8(wire(&message)).unwrap();
    assert!(!text.starts_with("From "));
    assert!(text.ends_with("\r\n\r\nLine one\r\n  indented line two\r\n"));
}

#[test]
fn test_raw_relay_strips_bcc() {
    let message = RawMessage::parse(&read_fixture("forwarded.eml")).unwrap();
    let transport = StubTransport::new_ok();
    relay::send(&transport, &message).unwrap();

    let (envelope, body) = &transport.messages()[0];
    assert_eq!(envelope.to().len(), 2);
    assert!(!body.contains("secret@example.com"));
}

#[test]
fn test_session_debug_output_reparses() {
    let config = Config::default();
    let session = Session::new(&config, "user@mit.edu".into(), "scripts.mit.edu".into(), true);

    let mut out = Vec::new();
    session
        .handle(InputFormat::Json, &read_fixture("newsletter.json"), &mut out)
        .unwrap();

    let parsed = MessageParser::default().parse(&out).unwrap();
    assert_eq!(
        parsed.header_raw("X-Relay-Server").map(str::trim),
        Some("scripts.mit.edu")
    );
    assert!(parsed.date().is_some());
}

// ─── CGI reply ──────────────────────────────────────────────────────

#[test]
fn test_error_reply_carries_error_text() {
    let config = Config::default();
    let session = Session::new(&config, "user@mit.edu".into(), String::new(), true);
    let err = session
        .handle(InputFormat::Json, br#"{"attachments": [1]}"#, &mut Vec::new())
        .unwrap_err();

    let message = err.to_string();
    let mut out = Vec::new();
    Response::error("sendmail", &message).write_to(&mut out).unwrap();
    let reply = String::from_utf8(out).unwrap();

    assert!(predicate::str::starts_with("Content-Type: application/json\r\n\r\n").eval(reply.as_str()));
    let json = reply.split("\r\n\r\n").nth(1).unwrap();
    let body: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(body["command"], "sendmail");
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Attachment #0 is not an object");
}
