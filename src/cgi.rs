//! CGI glue: caller identity from the environment and the JSON status reply.
//!
//! The web server turns whatever is written to stdout into the HTTP response,
//! so every invocation must end with exactly one well-formed reply, even when
//! something failed.

use std::io::Write;

use serde::Serialize;

use crate::error::{RelayError, Result};

/// Outcome reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Body of the CGI reply.
#[derive(Debug, Clone, Serialize)]
pub struct Response<'a> {
    /// Name the script was invoked as.
    pub command: &'a str,
    pub status: Status,
    pub message: &'a str,
}

impl<'a> Response<'a> {
    pub fn success(command: &'a str, message: &'a str) -> Self {
        Self {
            command,
            status: Status::Success,
            message,
        }
    }

    pub fn error(command: &'a str, message: &'a str) -> Self {
        Self {
            command,
            status: Status::Error,
            message,
        }
    }

    /// Write the header block, the mandatory blank line, and the JSON body.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        let body = serde_json::to_string(self)?;
        write!(out, "Content-Type: application/json\r\n\r\n{body}\n")
            .and_then(|_| out.flush())
            .map_err(|e| RelayError::io("writing CGI response", e))
    }
}

/// The authenticated caller, read from the variable the web server sets
/// (for certificate logins, `SSL_CLIENT_S_DN_Email`).
pub fn login(var: &str) -> Result<String> {
    login_from(std::env::var(var).ok())
}

/// Missing and empty values are both treated as "not logged in".
pub fn login_from(value: Option<String>) -> Result<String> {
    match value {
        Some(login) if !login.trim().is_empty() => Ok(login.trim().to_string()),
        _ => Err(RelayError::Unauthorized),
    }
}

/// Basename of the program as invoked (`argv[0]`).
pub fn command_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(|arg0| std::path::Path::new(arg0))
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
