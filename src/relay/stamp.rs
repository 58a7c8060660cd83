//! Headers added to every message after it is built or parsed.

use chrono::{DateTime, TimeZone};

use crate::export::Outgoing;

/// Identity headers stamped onto outgoing mail.
#[derive(Debug, Clone)]
pub struct Stamp {
    /// Header carrying the authenticated caller.
    pub tracking_header: String,
    /// Authenticated caller, as reported by the web server.
    pub login: String,
    /// Header carrying the relaying server's name.
    pub server_header: String,
    /// Name of the relaying server.
    pub server: String,
}

impl Stamp {
    /// Apply the stamp.
    ///
    /// Any caller-supplied copy of the tracking header is dropped first, so
    /// the recorded identity is always the authenticated one. `Date` is only
    /// added when the message has none.
    pub fn apply<M, Tz>(&self, message: &mut M, now: DateTime<Tz>)
    where
        M: Outgoing + ?Sized,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let headers = message.headers_mut();

        let forged = headers.remove(&self.tracking_header);
        if forged > 0 {
            tracing::warn!(
                header = %self.tracking_header,
                count = forged,
                "Dropped caller-supplied tracking header"
            );
        }
        headers.add(self.tracking_header.as_str(), self.login.as_str());

        if !self.server.is_empty() {
            headers.add(self.server_header.as_str(), self.server.as_str());
        }

        if !headers.contains("Date") {
            headers.add("Date", now.to_rfc2822());
        }
    }
}

/// Name of this server: `$SERVER_NAME` from the CGI environment, else the
/// local hostname.
pub fn server_identity() -> String {
    match std::env::var("SERVER_NAME") {
        Ok(name) if !name.is_empty() => name,
        _ => lettre::transport::smtp::extension::ClientId::default().to_string(),
    }
}
