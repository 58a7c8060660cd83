//! One relay request from stdin bytes to delivery.

use std::io::Write;

use chrono::Local;
use tracing::{debug, info};

use crate::builder;
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::export::Outgoing;
use crate::model::entity::MessageEntity;
use crate::model::request::Request;
use crate::parser::raw::RawMessage;
use crate::relay::{self, CredentialStore, Stamp};

/// What stdin contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// A JSON request that is built into MIME.
    Json,
    /// A complete RFC 2822 message relayed as-is.
    Raw,
}

/// Everything needed to process one authenticated request.
pub struct Session<'a> {
    config: &'a Config,
    stamp: Stamp,
    /// Print the message instead of sending it.
    debug: bool,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a Config, login: String, server: String, debug: bool) -> Self {
        let stamp = Stamp {
            tracking_header: config.cgi.tracking_header.clone(),
            login,
            server_header: config.cgi.server_header.clone(),
            server,
        };
        Self {
            config,
            stamp,
            debug,
        }
    }

    /// Process `input`. In debug mode the serialized message goes to `out`.
    pub fn handle(&self, format: InputFormat, input: &[u8], out: &mut dyn Write) -> Result<()> {
        match format {
            InputFormat::Json => {
                let (message, host) = self.prepare_json(input)?;
                self.dispatch(&message, &host, out)
            }
            InputFormat::Raw => {
                let message = self.prepare_raw(input)?;
                self.dispatch(&message, &self.config.smtp.host, out)
            }
        }
    }

    /// Parse, build and stamp a JSON request. Returns the message and the
    /// SMTP host it should go through.
    pub fn prepare_json(&self, input: &[u8]) -> Result<(MessageEntity, String)> {
        let request = Request::from_slice(input)?;
        let mut message = builder::build(&request)?;
        self.stamp.apply(&mut message, Local::now());

        let host = request
            .host
            .unwrap_or_else(|| self.config.smtp.host.clone());
        Ok((message, host))
    }

    /// Parse and stamp a raw message.
    pub fn prepare_raw(&self, input: &[u8]) -> Result<RawMessage> {
        let mut message = RawMessage::parse(input)?;
        self.stamp.apply(&mut message, Local::now());
        Ok(message)
    }

    fn dispatch<M: Outgoing + Clone>(&self, message: &M, host: &str, out: &mut dyn Write) -> Result<()> {
        if self.debug {
            debug!("Debug mode, printing instead of sending");
            out.write_all(&message.to_bytes())
                .map_err(|e| RelayError::io("writing message", e))?;
            return Ok(());
        }

        info!(host, login = %self.stamp.login, "Relaying message");
        let transport = relay::smtp_transport(
            host,
            self.config.credentials_for(host),
            &self.config.smtp,
        )?;
        relay::send(&transport, message)
    }
}
