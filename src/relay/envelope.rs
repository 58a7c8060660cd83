//! SMTP envelope derivation from message headers.

use lettre::address::Envelope;
use lettre::Address;

use crate::error::{RelayError, Result};
use crate::model::address::addr_specs;
use crate::model::entity::Headers;

/// Headers whose addresses become RCPT TO, in order.
const RECIPIENT_HEADERS: [&str; 3] = ["To", "Cc", "Bcc"];

/// Build the envelope the way `sendmail -t` would.
///
/// MAIL FROM is the first address of `Sender`, or of `From` when there is no
/// `Sender`. RCPT TO is every address of To, Cc and Bcc, without duplicates.
pub fn envelope_for(headers: &Headers) -> Result<Envelope> {
    let from = headers
        .get("Sender")
        .or_else(|| headers.get("From"))
        .and_then(|value| addr_specs(value).into_iter().next())
        .map(|addr| parse_address(&addr))
        .transpose()?;

    let mut to: Vec<Address> = Vec::new();
    for name in RECIPIENT_HEADERS {
        for value in headers.get_all(name) {
            for addr in addr_specs(value) {
                let addr = parse_address(&addr)?;
                if !to.contains(&addr) {
                    to.push(addr);
                }
            }
        }
    }

    if to.is_empty() {
        return Err(RelayError::Delivery("message has no recipients".into()));
    }

    Envelope::new(from, to).map_err(|e| RelayError::Delivery(e.to_string()))
}

fn parse_address(addr: &str) -> Result<Address> {
    addr.parse::<Address>().map_err(|e| RelayError::InvalidAddress {
        address: addr.to_string(),
        reason: e.to_string(),
    })
}
