//! Response envelope decoding.
//!
//! # Design
//! Every response is expected to carry the two rate-limit headers and a JSON
//! body shaped `{data, errors}`. Headers are checked first so a call fails
//! on a missing quota even when the body would have decoded cleanly. On a
//! 2xx status the `data` member (or, when absent, the whole body) is decoded
//! into the caller's type; otherwise the first `errors` entry is returned.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, ErrorKind};
use crate::http::HttpResponse;
use crate::types::{RateLimit, Reply};

pub const RATE_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// One entry of the envelope's `errors` list.
///
/// Absent and `null` members both read as their zero value.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RemoteError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
}

/// The uniform response shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<RemoteError>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub remaining: Option<i64>,
}

impl Envelope {
    /// Parse a body. JSON objects are read as envelopes; any other JSON value
    /// is a bare payload with neither `data` nor `errors`.
    pub fn parse(body: &str) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_str(body).map_err(parse_error)?;
        if !value.is_object() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(parse_error)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse_error(e: serde_json::Error) -> ApiError {
    ApiError::client(ErrorKind::Envelope, format!("Could not parse response: {e}"))
}

/// Read the quota headers. Each must appear exactly once as an integer.
pub fn rate_limit(response: &HttpResponse) -> Result<RateLimit, ApiError> {
    Ok(RateLimit {
        limit: int_header(response, RATE_LIMIT_HEADER)?,
        remaining: int_header(response, RATE_REMAINING_HEADER)?,
    })
}

fn int_header(response: &HttpResponse, name: &str) -> Result<i64, ApiError> {
    let fail = |cause: String| {
        ApiError::client(ErrorKind::RateLimit, format!("Failed to parse {name}: {cause}"))
    };

    let mut values = response.header_values(name);
    let value = values.next().ok_or_else(|| fail("header missing".to_string()))?;
    if values.next().is_some() {
        return Err(fail("header repeated".to_string()));
    }
    value
        .parse::<i64>()
        .map_err(|e| fail(format!("{e} ({value:?})")))
}

/// Decode a response into `T`, returning the quota it reported.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<Reply<T>, ApiError> {
    let rate_limit = rate_limit(response)?;
    let data = decode_body(response)?;
    Ok(Reply { data, rate_limit })
}

/// Decode the body alone, ignoring headers.
pub fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let envelope = Envelope::parse(&response.body)?;

    if response.is_success() {
        let decoded = match envelope.data {
            Some(data) if !data.is_null() => serde_json::from_value(data),
            _ => serde_json::from_str(&response.body),
        };
        return decoded.map_err(|e| {
            ApiError::client(ErrorKind::Decode, format!("Could not decode response: {e}"))
        });
    }

    match envelope.errors.into_iter().next() {
        Some(first) => Err(ApiError::remote(first.message, first.code)),
        None => Err(ApiError::remote(
            format!("Unexpected HTTP status {}", response.status),
            i64::from(response.status),
        )),
    }
}
