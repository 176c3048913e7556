//! Sending requests over the network.
//!
//! # Design
//! `Transport` is the seam between the pure pipeline and real I/O. The
//! production implementation wraps a blocking `ureq` agent with a small
//! connection pool; tests substitute fakes that record requests and return
//! canned responses.

use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and returns the fully read response.
///
/// Non-2xx statuses are responses, not errors; only failures to obtain or
/// read a response are reported as `TransportError`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Connection settings for `UreqTransport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
    /// How long a pooled connection may sit unused before it is dropped.
    pub idle_timeout: Duration,
    /// Largest response body that will be read. Unbounded by default.
    pub max_response_bytes: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            max_idle_connections: 5,
            max_idle_connections_per_host: 5,
            idle_timeout: Duration::from_secs(10),
            max_response_bytes: u64::MAX,
        }
    }
}

/// Blocking transport backed by a pooled `ureq::Agent`.
///
/// Gzip responses are decompressed transparently and keep-alive is on.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    max_response_bytes: u64,
}

impl UreqTransport {
    /// Build an agent whose every call is bounded by `timeout`.
    pub fn new(config: &TransportConfig, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .timeout_connect(Some(config.connect_timeout))
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections_per_host)
            .max_idle_age(config.idle_timeout)
            .build()
            .new_agent();
        Self {
            agent,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_slice();

        // GET and DELETE only carry a body when the caller supplied one.
        let result = match request.method {
            HttpMethod::Get if body.is_empty() => {
                with_headers(self.agent.get(url), &request.headers).call()
            }
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers)
                .force_send_body()
                .send(body),
            HttpMethod::Delete if body.is_empty() => {
                with_headers(self.agent.delete(url), &request.headers).call()
            }
            HttpMethod::Delete => with_headers(self.agent.delete(url), &request.headers)
                .force_send_body()
                .send(body),
            HttpMethod::Post => with_headers(self.agent.post(url), &request.headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(url), &request.headers).send(body),
            HttpMethod::Patch => with_headers(self.agent.patch(url), &request.headers).send(body),
        };
        let mut response = result.map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_string()
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Accept one connection, capture the raw request and answer with
    /// `body` as a 200 response.
    fn serve_once(body: String) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 1024];
            let header_end = loop {
                let n = stream.read(&mut chunk).unwrap();
                assert!(n > 0, "connection closed before headers");
                raw.extend_from_slice(&chunk[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&raw[..header_end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            while raw.len() < header_end + length {
                let n = stream.read(&mut chunk).unwrap();
                assert!(n > 0, "connection closed before body");
                raw.extend_from_slice(&chunk[..n]);
            }

            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            // The client may hang up early when it rejects the body.
            let _ = stream.write_all(reply.as_bytes());
            String::from_utf8_lossy(&raw).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn request(method: HttpMethod, url: String, body: &[u8]) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_vec(),
        }
    }

    #[test]
    fn default_pool_is_conservative() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.max_idle_connections, 5);
        assert_eq!(config.max_idle_connections_per_host, 5);
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.max_response_bytes, u64::MAX);
    }

    #[test]
    fn get_and_delete_send_their_body() {
        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let (base, server) = serve_once(r#"{"data":{}}"#.to_string());
            let transport = UreqTransport::new(&TransportConfig::default(), Duration::from_secs(5));
            let payload = br#"{"ids":["a","b"]}"#;

            let response = transport
                .execute(&request(method, format!("{base}/items"), payload))
                .unwrap();
            assert_eq!(response.status, 200);

            let raw = server.join().unwrap();
            assert!(raw.starts_with(&format!("{method} /items ")), "{raw}");
            assert!(raw.ends_with(r#"{"ids":["a","b"]}"#), "{method}: body not sent: {raw}");
        }
    }

    #[test]
    fn large_response_is_read_in_full() {
        let body = format!(r#"{{"data":"{}"}}"#, "x".repeat(11 * 1024 * 1024));
        let (base, server) = serve_once(body.clone());
        let transport = UreqTransport::new(&TransportConfig::default(), Duration::from_secs(30));

        let response = transport
            .execute(&request(HttpMethod::Get, format!("{base}/big"), b""))
            .unwrap();
        assert_eq!(response.body.len(), body.len());
        server.join().unwrap();
    }

    #[test]
    fn response_over_configured_limit_is_a_body_error() {
        let (base, server) = serve_once(format!(r#"{{"data":"{}"}}"#, "x".repeat(4096)));
        let config = TransportConfig {
            max_response_bytes: 1024,
            ..TransportConfig::default()
        };
        let transport = UreqTransport::new(&config, Duration::from_secs(5));

        let err = transport
            .execute(&request(HttpMethod::Get, format!("{base}/big"), b""))
            .unwrap_err();
        assert!(matches!(err, TransportError::Body(_)), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn unreachable_host_is_a_connect_error() {
        let transport = UreqTransport::new(&TransportConfig::default(), Duration::from_secs(2));
        let request = HttpRequest {
            method: HttpMethod::Get,
            // Port 9 (discard) on loopback is closed on any sane test host.
            url: "http://127.0.0.1:9/sites".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        let err = transport.execute(&request).unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
