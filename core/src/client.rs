//! The request/response pipeline.
//!
//! # Design
//! `WebflowClient` owns an immutable `Config`, a `Transport` and a
//! `FileOpener`. Each call is split the same way the wire is: a pure
//! `build_request` that encodes the descriptor and sets headers, the
//! transport round-trip, and a pure `parse_response` that reads the
//! rate-limit headers and the envelope. `request` runs all three.
//!
//! The quota observed on each response is returned in the `Reply`. The most
//! recent one is also kept behind a mutex for callers that only want to peek
//! at it; with several threads sharing a client it is simply the last
//! response to arrive.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::encode::encode;
use crate::envelope;
use crate::error::{ApiError, ErrorKind};
use crate::fs::{FileOpener, OsFs};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ClientRequest, Multipart, Payload, RateLimit, Reply};

/// Blocking client for the Webflow API.
pub struct WebflowClient {
    config: Config,
    transport: Box<dyn Transport>,
    files: Box<dyn FileOpener>,
    last_rate_limit: Mutex<Option<RateLimit>>,
}

impl fmt::Debug for WebflowClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebflowClient")
            .field("host", &self.config.host)
            .field("version", &self.config.version)
            .field("timeout", &self.config.timeout)
            .field("debug", &self.config.debug)
            .finish_non_exhaustive()
    }
}

impl WebflowClient {
    /// Create a client with default settings for `access_token`.
    pub fn new(access_token: &str) -> Result<Self, ApiError> {
        Self::with_config(Config::new(access_token))
    }

    pub fn with_config(mut config: Config) -> Result<Self, ApiError> {
        if config.access_token.is_empty() {
            return Err(ApiError::client(
                ErrorKind::Config,
                "missing webflow authentication token",
            ));
        }
        if config.version.is_empty() {
            return Err(ApiError::client(ErrorKind::Config, "missing webflow token or version"));
        }
        config.host = config.host.trim_end_matches('/').to_string();

        let transport = UreqTransport::new(&config.transport, config.timeout);
        Ok(Self {
            config,
            transport: Box::new(transport),
            files: Box::new(OsFs),
            last_rate_limit: Mutex::new(None),
        })
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn with_file_opener(mut self, files: impl FileOpener + 'static) -> Self {
        self.files = Box::new(files);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Quota reported by the most recent response that carried one.
    pub fn rate_limit(&self) -> Option<RateLimit> {
        *self
            .last_rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Encode `request` and attach the standard headers.
    pub fn build_request<P: Serialize>(
        &self,
        request: &ClientRequest<P>,
    ) -> Result<HttpRequest, ApiError> {
        let encoded = encode(&request.payload, self.files.as_ref())?;

        let headers = vec![
            ("Content-Type".to_string(), encoded.content_type),
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept-Charset".to_string(), "utf-8".to_string()),
            ("Accept-Version".to_string(), self.config.version.clone()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.access_token),
            ),
        ];
        if let Some((name, _)) = headers
            .iter()
            .find(|(_, value)| value.contains(['\r', '\n']))
        {
            return Err(ApiError::client(
                ErrorKind::Request,
                format!("Could not create request: invalid value for header {name}"),
            ));
        }

        Ok(HttpRequest {
            method: request.method,
            url: format!("{}{}", self.config.host, request.path),
            headers,
            body: encoded.body,
        })
    }

    /// Read the quota headers and decode the envelope into `T`.
    pub fn parse_response<T: DeserializeOwned>(
        &self,
        response: &HttpResponse,
    ) -> Result<Reply<T>, ApiError> {
        envelope::decode(response)
    }

    /// Run one call end to end.
    pub fn request<P: Serialize, T: DeserializeOwned>(
        &self,
        request: &ClientRequest<P>,
    ) -> Result<Reply<T>, ApiError> {
        let http_request = self.build_request(request)?;
        debug!(method = %http_request.method, url = %http_request.url, "sending request");
        if self.config.debug {
            debug!(body = %String::from_utf8_lossy(&http_request.body), "request body");
        }

        let response = self.transport.execute(&http_request)?;
        debug!(status = response.status, "received response");
        if self.config.debug {
            debug!(body = %response.body, "response body");
        }

        let rate_limit = envelope::rate_limit(&response)?;
        *self
            .last_rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(rate_limit);
        debug!(
            limit = rate_limit.limit,
            remaining = rate_limit.remaining,
            "rate limit"
        );

        let data = envelope::decode_body(&response).inspect_err(|err| {
            if err.is_remote() {
                warn!(code = err.code, message = %err.message, path = %request.path, "API error");
            }
        })?;
        Ok(Reply { data, rate_limit })
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Reply<T>, ApiError> {
        self.request(&ClientRequest::get(path))
    }

    pub fn post<P: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<Reply<T>, ApiError> {
        self.request(&ClientRequest::json(HttpMethod::Post, path, payload))
    }

    pub fn put<P: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<Reply<T>, ApiError> {
        self.request(&ClientRequest::json(HttpMethod::Put, path, payload))
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Reply<T>, ApiError> {
        self.request(&ClientRequest::delete(path))
    }

    pub fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        multipart: Multipart,
    ) -> Result<Reply<T>, ApiError> {
        self.request(&ClientRequest::new(
            HttpMethod::Post,
            path,
            Payload::<()>::Multipart(multipart),
        ))
    }
}
