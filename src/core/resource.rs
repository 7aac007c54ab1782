use std::{
    fs::File,
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};

/// A readable input the batch is pointed at.
///
/// The reader only needs to know whether the resource is there, how to open it and how
/// to name it in log messages.
pub trait Resource {
    /// Returns `true` if the resource can be opened.
    fn exists(&self) -> bool;

    /// Opens a fresh byte transport over the resource.
    fn open(&self) -> io::Result<Box<dyn Read>>;

    /// Human readable description used in diagnostics.
    fn description(&self) -> String;
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSystemResource {
    path: PathBuf,
}

impl FileSystemResource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileSystemResource {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn open(&self) -> io::Result<Box<dyn Read>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(file))
    }

    fn description(&self) -> String {
        format!("file [{}]", self.path.display())
    }
}

/// Bytes held in memory. Always exists.
#[derive(Debug, Clone)]
pub struct InMemoryResource {
    content: Vec<u8>,
    description: String,
}

impl InMemoryResource {
    pub fn new<B: Into<Vec<u8>>>(content: B) -> Self {
        Self {
            content: content.into(),
            description: "in-memory resource".to_string(),
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

impl Resource for InMemoryResource {
    fn exists(&self) -> bool {
        true
    }

    fn open(&self) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(Cursor::new(self.content.clone())))
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
