//! Error types for the Webflow API client.
//!
//! # Design
//! Every failure, whether raised locally or reported by the API, is
//! normalized into one `ApiError { message, code }`. Client-side failures
//! carry the sentinel code `CLIENT_ERROR_CODE`; remote failures carry the
//! code from the first entry of the response's `errors` list. `ErrorKind`
//! records where the failure came from so callers can branch without
//! string matching.

use thiserror::Error;

/// Code attached to every failure that did not originate from the API.
pub const CLIENT_ERROR_CODE: i64 = -1;

/// Where an `ApiError` originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The client could not be constructed (missing token or version).
    Config,
    /// The request payload could not be serialized.
    Encode,
    /// The file attached to a multipart upload could not be opened or read.
    File,
    /// The HTTP request could not be assembled.
    Request,
    /// The request never produced a response (DNS, dial, timeout, TLS).
    Transport,
    /// The response body could not be read.
    Body,
    /// A rate-limit header was missing, repeated or not an integer.
    RateLimit,
    /// The response body was not valid JSON.
    Envelope,
    /// The envelope data did not match the caller's target type.
    Decode,
    /// The API answered with a non-2xx status.
    Remote,
}

/// A normalized error: a message plus a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Webflow: {message} ({code})")]
pub struct ApiError {
    pub message: String,
    pub code: i64,
    kind: ErrorKind,
}

impl ApiError {
    /// A client-side failure with the sentinel code.
    pub fn client(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: CLIENT_ERROR_CODE,
            kind,
        }
    }

    /// A failure reported by the API itself.
    pub fn remote(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
            kind: ErrorKind::Remote,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_remote(&self) -> bool {
        self.kind == ErrorKind::Remote
    }
}

/// Failures reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No response was received.
    #[error("{0}")]
    Connect(String),

    /// A response arrived but its body could not be read in full.
    #[error("{0}")]
    Body(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect(cause) => {
                ApiError::client(ErrorKind::Transport, format!("Failed to make request: {cause}"))
            }
            TransportError::Body(cause) => {
                ApiError::client(ErrorKind::Body, format!("Could not read response: {cause}"))
            }
        }
    }
}
