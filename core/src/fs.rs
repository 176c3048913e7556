//! File access for multipart uploads.

use std::fs::File;
use std::io::{self, Read};

/// Opens a named resource for reading.
///
/// The returned reader is dropped, and therefore closed, once its contents
/// have been copied into the request body.
pub trait FileOpener: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Reads files from the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileOpener for OsFs {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(name)?))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read};

    use super::FileOpener;

    /// In-memory `FileOpener` keyed by path.
    #[derive(Default)]
    pub(crate) struct MemFs {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemFs {
        pub(crate) fn with_file(mut self, name: &str, contents: &[u8]) -> Self {
            self.files.insert(name.to_string(), contents.to_vec());
            self
        }
    }

    impl FileOpener for MemFs {
        fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
            match self.files.get(name) {
                Some(contents) => Ok(Box::new(Cursor::new(contents.clone()))),
                None => Err(io::Error::new(io::ErrorKind::NotFound, "file does not exist")),
            }
        }
    }
}
