//! Client configuration and its defaults.

use std::time::Duration;

use crate::transport::TransportConfig;

/// Default API host.
pub const DEFAULT_HOST: &str = "https://api.webflow.com";

/// API version sent in `Accept-Version`.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Upper bound on a whole request, connect through body read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings read by every request. Fixed once the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub access_token: String,
    pub host: String,
    pub version: String,
    pub timeout: Duration,
    /// Log request and response bodies at debug level.
    pub debug: bool,
    pub transport: TransportConfig,
}

impl Config {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            host: DEFAULT_HOST.to_string(),
            version: DEFAULT_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            transport: TransportConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
