//! Wire serialization: turning messages into RFC 2822 bytes.

pub mod body;
pub mod header;
pub mod wire;

use crate::model::entity::{Headers, MessageEntity};

/// A message that can be stamped, inspected for its envelope and written out.
///
/// Implemented by built MIME trees and by raw messages read verbatim.
pub trait Outgoing {
    /// Top-level headers (never including `Content-Type` of a built tree).
    fn headers(&self) -> &Headers;

    fn headers_mut(&mut self) -> &mut Headers;

    /// Append the RFC 2822 form to `out`, lines ending in CRLF. Header
    /// lines are folded by lettre to stay within 78 octets where possible.
    fn write_to(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

impl Outgoing for MessageEntity {
    fn headers(&self) -> &Headers {
        MessageEntity::headers(self)
    }

    fn headers_mut(&mut self) -> &mut Headers {
        MessageEntity::headers_mut(self)
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        wire::write_message(self, out);
    }
}
