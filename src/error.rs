//! Centralized error types for mailrelay.

use thiserror::Error;

/// All errors produced by the mailrelay library.
#[derive(Error, Debug)]
pub enum RelayError {
    /// An attachment content type could not be split into `type/subtype`.
    #[error("Malformed content type '{0}': expected 'type/subtype'")]
    MalformedContentType(String),

    /// An entry of the `attachments` array is not a JSON object.
    #[error("Attachment #{index} is not an object")]
    InvalidAttachmentSpec { index: usize },

    /// The request has the wrong shape (a field of the wrong type, etc.).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request body is not valid JSON.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// A raw RFC 2822 message could not be split into headers and body.
    #[error("Invalid raw message: {0}")]
    InvalidRawMessage(String),

    /// The web server did not supply a caller identity.
    #[error("Unauthorized")]
    Unauthorized,

    /// An address in From/Sender/To/Cc/Bcc could not be used for the envelope.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The SMTP transport rejected or failed to send the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// I/O error with some context about what was being read or written.
    #[error("I/O error {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, RelayError>`.
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Create an `Io` variant from a short description and an `io::Error`.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no better context is at hand
/// (prefer `RelayError::io`).
impl From<std::io::Error> for RelayError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            context: "reading input".to_string(),
            source,
        }
    }
}
