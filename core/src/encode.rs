//! Request body encoding.
//!
//! # Design
//! The encoding strategy is picked from the `Payload` variant: JSON bodies
//! go through serde_json, uploads are written as `multipart/form-data` with
//! the file streamed in through a `FileOpener`. Both produce the same
//! `Encoded` value so the executor never branches on the body kind.

use std::io;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ErrorKind};
use crate::fs::FileOpener;
use crate::types::{Multipart, Payload};

pub const JSON_CONTENT_TYPE: &str = "application/json";

const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// An encoded request body and the content type describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Encode `payload`, opening any attached file through `files`.
pub fn encode<P: Serialize>(payload: &Payload<P>, files: &dyn FileOpener) -> Result<Encoded, ApiError> {
    match payload {
        Payload::Empty => Ok(Encoded {
            body: Vec::new(),
            content_type: JSON_CONTENT_TYPE.to_string(),
        }),
        Payload::Json(value) => encode_json(value),
        Payload::Multipart(multipart) => {
            encode_multipart(multipart, files, &Uuid::new_v4().simple().to_string())
        }
    }
}

fn encode_json<P: Serialize>(value: &P) -> Result<Encoded, ApiError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| ApiError::client(ErrorKind::Encode, format!("Could not marshal JSON: {e}")))?;
    Ok(Encoded {
        body,
        content_type: JSON_CONTENT_TYPE.to_string(),
    })
}

fn encode_multipart(
    multipart: &Multipart,
    files: &dyn FileOpener,
    boundary: &str,
) -> Result<Encoded, ApiError> {
    let file = &multipart.file;
    // Open before writing anything so a bad path fails without side effects.
    let mut reader = files.open(&file.path).map_err(|e| {
        ApiError::client(ErrorKind::File, format!("Could not open file {}: {e}", file.path))
    })?;

    let mut writer = MultipartWriter::new(boundary);
    for (name, value) in &multipart.fields {
        writer.begin_part(&[(
            "Content-Disposition",
            format!("form-data; name=\"{}\"", escape_quotes(name)),
        )]);
        writer.buf.extend_from_slice(value.as_bytes());
    }

    writer.begin_part(&[
        (
            "Content-Disposition",
            format!(
                "form-data; name=\"{}\"; filename=\"{}\"",
                escape_quotes(&file.field_name),
                escape_quotes(&file.file_name)
            ),
        ),
        ("Content-Type", FILE_CONTENT_TYPE.to_string()),
    ]);
    io::copy(&mut reader, &mut writer.buf).map_err(|e| {
        ApiError::client(ErrorKind::File, format!("Could not read file {}: {e}", file.path))
    })?;

    Ok(Encoded {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body: writer.finish(),
    })
}

/// Escape backslashes and double quotes for a quoted header parameter.
pub fn escape_quotes(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends boundary-delimited parts to an in-memory body.
struct MultipartWriter<'a> {
    buf: Vec<u8>,
    boundary: &'a str,
    started: bool,
}

impl<'a> MultipartWriter<'a> {
    fn new(boundary: &'a str) -> Self {
        Self {
            buf: Vec::new(),
            boundary,
            started: false,
        }
    }

    fn begin_part(&mut self, headers: &[(&str, String)]) {
        if self.started {
            self.buf.extend_from_slice(b"\r\n");
        }
        self.started = true;
        self.buf.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        for (name, value) in headers {
            self.buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        self.buf.extend_from_slice(b"\r\n");
    }

    fn finish(mut self) -> Vec<u8> {
        self.buf
            .extend_from_slice(format!("\r\n--{}--\r\n", self.boundary).as_bytes());
        self.buf
    }
}
