use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// Required configuration is missing or invalid. Detected before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The input resource does not exist and the reader is in strict mode.
    #[error("Missing resource: {0}")]
    MissingResource(String),

    /// The transport or the tokenizer failed while scanning the input.
    #[error("Stream corruption: {0}")]
    StreamCorruption(String),

    /// The input ended before the current fragment was closed.
    #[error("Incomplete fragment: {0}")]
    FragmentIncomplete(String),

    /// A well-formed fragment could not be mapped to an item.
    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("Resource release error: {0}")]
    ResourceRelease(String),
}
