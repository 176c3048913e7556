//! Blocking client core for the Webflow CMS API.
//!
//! # Overview
//! Endpoint code describes a call as a `ClientRequest` (method, path,
//! payload). `WebflowClient` encodes it (JSON or multipart upload), sends it
//! with the bearer token and version headers, reads the rate-limit headers
//! and unwraps the `{data, errors}` envelope into the caller's type.
//!
//! # Design
//! - Configuration is fixed at construction; the quota seen on a response is
//!   returned with the decoded value in a `Reply`.
//! - Every failure is one `ApiError { message, code }`. Client-side failures
//!   use code `-1`; API failures carry the API's own code.
//! - Network I/O and file access sit behind the `Transport` and `FileOpener`
//!   traits so the pipeline can be exercised without either.

pub mod client;
pub mod config;
pub mod encode;
pub mod envelope;
pub mod error;
pub mod fs;
pub mod http;
pub mod transport;
pub mod types;

pub use client::WebflowClient;
pub use config::{Config, DEFAULT_HOST, DEFAULT_TIMEOUT, DEFAULT_VERSION};
pub use error::{ApiError, ErrorKind, TransportError, CLIENT_ERROR_CODE};
pub use fs::{FileOpener, OsFs};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, TransportConfig, UreqTransport};
pub use types::{ClientRequest, FileField, Multipart, Param, Payload, RateLimit, Reply};
