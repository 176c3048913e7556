//! Request descriptors and per-call results.
//!
//! # Design
//! A `ClientRequest` is the `(method, path, payload)` triple that endpoint
//! code hands to the pipeline. It is built per call and consumed by
//! `WebflowClient::build_request`; nothing here performs I/O.

use std::path::Path;

use crate::http::HttpMethod;

/// Page selection appended to a list endpoint's query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub page: u32,
    pub per_page: u32,
}

impl Param {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Append `page` and `per_page` to `path`, keeping any existing query.
    pub fn apply(&self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{path}{separator}page={}&per_page={}",
            self.page, self.per_page
        )
    }
}

/// Body of a request before encoding.
#[derive(Debug, Clone)]
pub enum Payload<P> {
    /// No body; sent with an empty JSON content type.
    Empty,
    /// Serialized with serde_json.
    Json(P),
    /// Form fields plus one attached file.
    Multipart(Multipart),
}

/// A `multipart/form-data` upload.
#[derive(Debug, Clone)]
pub struct Multipart {
    pub fields: Vec<(String, String)>,
    pub file: FileField,
}

impl Multipart {
    pub fn new(file: FileField) -> Self {
        Self {
            fields: Vec::new(),
            file,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// The file part of a multipart upload.
///
/// `path` is handed to the client's `FileOpener`; `file_name` is what the
/// server sees in `Content-Disposition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub field_name: String,
    pub file_name: String,
    pub path: String,
}

impl FileField {
    /// Attach `path` under `field_name`, naming the part after the path's
    /// final component.
    pub fn new(field_name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            field_name: field_name.into(),
            file_name,
            path,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

/// One API call, described before encoding.
#[derive(Debug, Clone)]
pub struct ClientRequest<P = ()> {
    pub method: HttpMethod,
    pub path: String,
    pub payload: Payload<P>,
}

impl ClientRequest<()> {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, Payload::Empty)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, Payload::Empty)
    }

    pub fn upload(path: impl Into<String>, multipart: Multipart) -> Self {
        Self::new(HttpMethod::Post, path, Payload::Multipart(multipart))
    }
}

impl<P> ClientRequest<P> {
    pub fn new(method: HttpMethod, path: impl Into<String>, payload: Payload<P>) -> Self {
        Self {
            method,
            path: path.into(),
            payload,
        }
    }

    pub fn json(method: HttpMethod, path: impl Into<String>, payload: P) -> Self {
        Self::new(method, path, Payload::Json(payload))
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.path = param.apply(&self.path);
        self
    }
}

/// Rate-limit quota reported by the API on a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: i64,
    pub remaining: i64,
}

/// A decoded result together with the quota observed on its response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub data: T,
    pub rate_limit: RateLimit,
}

impl<T> Reply<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_starts_a_query_string() {
        let param = Param::new(2, 50);
        assert_eq!(param.apply("/collections/c1/items"), "/collections/c1/items?page=2&per_page=50");
    }

    #[test]
    fn param_extends_an_existing_query_string() {
        let req = ClientRequest::get("/collections/c1/items?live=true").with_param(Param::new(1, 10));
        assert_eq!(req.path, "/collections/c1/items?live=true&page=1&per_page=10");
    }

    #[test]
    fn file_field_names_part_after_final_component() {
        let field = FileField::new("file", "/tmp/uploads/logo.png");
        assert_eq!(field.file_name, "logo.png");
        assert_eq!(field.path, "/tmp/uploads/logo.png");

        let renamed = field.with_file_name("brand.png");
        assert_eq!(renamed.file_name, "brand.png");
    }

    #[test]
    fn multipart_keeps_field_order() {
        let multipart = Multipart::new(FileField::new("file", "a.txt"))
            .field("site", "s1")
            .field("alt", "An image");
        assert_eq!(
            multipart.fields,
            vec![
                ("site".to_string(), "s1".to_string()),
                ("alt".to_string(), "An image".to_string()),
            ]
        );
    }
}
