//! Delivery to the outgoing SMTP server.
//!
//! Which transport is used depends only on whether credentials are
//! configured for the target host: with credentials the relay authenticates
//! over STARTTLS, without them it speaks plain SMTP to the relay port.

pub mod envelope;
pub mod stamp;

use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SmtpConfig;
use crate::error::{RelayError, Result};
use crate::export::Outgoing;

pub use envelope::envelope_for;
pub use stamp::Stamp;

/// Login for one SMTP host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCredentials {
    pub username: String,
    pub password: String,
    /// Overrides `smtp.auth_port` for this host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Lookup of SMTP credentials by host.
pub trait CredentialStore {
    /// Credentials for `host`, or `None` to relay unauthenticated.
    fn credentials_for(&self, host: &str) -> Option<&HostCredentials>;
}

/// Build the transport for `host`.
pub fn smtp_transport(
    host: &str,
    credentials: Option<&HostCredentials>,
    smtp: &SmtpConfig,
) -> Result<SmtpTransport> {
    let timeout = Some(Duration::from_secs(smtp.timeout_secs));

    let transport = match credentials {
        Some(creds) => {
            let port = creds.port.unwrap_or(smtp.auth_port);
            debug!(host, port, username = %creds.username, "Using authenticated relay");
            SmtpTransport::starttls_relay(host)
                .map_err(|e| RelayError::Delivery(e.to_string()))?
                .port(port)
                .credentials(Credentials::new(
                    creds.username.clone(),
                    creds.password.clone(),
                ))
                .timeout(timeout)
                .build()
        }
        None => {
            debug!(host, port = smtp.port, "Using unauthenticated relay");
            SmtpTransport::builder_dangerous(host)
                .port(smtp.port)
                .timeout(timeout)
                .build()
        }
    };

    Ok(transport)
}

/// Send a message through `transport`.
///
/// The envelope comes from the headers; `Bcc` is stripped from the bytes
/// that are transmitted but its addresses still receive the message.
pub fn send<T, M>(transport: &T, message: &M) -> Result<()>
where
    T: Transport,
    T::Error: std::fmt::Display,
    M: Outgoing + Clone,
{
    let envelope = envelope_for(message.headers())?;

    let mut visible = message.clone();
    visible.headers_mut().remove("Bcc");
    let bytes = visible.to_bytes();

    transport
        .send_raw(&envelope, &bytes)
        .map_err(|e| RelayError::Delivery(e.to_string()))?;

    info!(
        recipients = envelope.to().len(),
        bytes = bytes.len(),
        "Message relayed"
    );
    Ok(())
}
