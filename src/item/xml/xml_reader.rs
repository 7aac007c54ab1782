use std::cell::RefCell;
use std::path::Path;

use log::{debug, error, warn};
use serde::de::DeserializeOwned;

use crate::core::execution::ExecutionContext;
use crate::core::item::{ItemReader, ItemReaderResult, ItemStream};
use crate::core::resource::{FileSystemResource, InMemoryResource, Resource};
use crate::error::BatchError;

use super::converter::{FragmentConverter, XmlDeserializeConverter};
use super::cursor::{FragmentCursor, LocalNameCursor};
use super::event::EventSource;
use super::fragment_event_source::FragmentEventSource;
use super::xml_event_source::XmlEventSource;

/// Observable lifecycle state of an [`XmlFragmentItemReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    /// Opened in lenient mode against a resource that does not exist.
    OpenNoInput,
    OpenReady,
    Closed,
}

enum Input {
    Unopened,
    NoInput,
    Ready(FragmentEventSource<Box<dyn EventSource>>),
    Closed,
}

/// A builder for [`XmlFragmentItemReader`].
///
/// The fragment root element name, the converter and the resource are required. The reader
/// is strict by default: opening it against a missing resource fails.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::core::item::ItemReader;
/// use fragment_batch_rs::item::xml::XmlFragmentItemReaderBuilder;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Person {
///     #[serde(rename = "@id")]
///     id: i32,
///     name: String,
///     age: i32,
/// }
///
/// let xml_data = r#"
/// <people>
///   <person id="1">
///     <name>Alice</name>
///     <age>30</age>
///   </person>
///   <person id="2">
///     <name>Bob</name>
///     <age>25</age>
///   </person>
/// </people>
/// "#;
///
/// let reader = XmlFragmentItemReaderBuilder::<Person>::new()
///     .fragment_root_element_name("person")
///     .serde_converter()
///     .from_bytes(xml_data)
///     .build()
///     .unwrap();
///
/// reader.open().unwrap();
///
/// let mut persons = Vec::new();
/// while let Some(person) = reader.read().unwrap() {
///     persons.push(person);
/// }
/// reader.close().unwrap();
///
/// assert_eq!(persons.len(), 2);
/// assert_eq!(persons[0].id, 1);
/// assert_eq!(persons[0].name, "Alice");
/// assert_eq!(persons[1].age, 25);
/// ```
pub struct XmlFragmentItemReaderBuilder<T> {
    fragment_root_element_name: Option<String>,
    strict: bool,
    capacity: usize,
    resource: Option<Box<dyn Resource>>,
    converter: Option<Box<dyn FragmentConverter<T>>>,
    cursor: Box<dyn FragmentCursor>,
}

impl<T> Default for XmlFragmentItemReaderBuilder<T> {
    fn default() -> Self {
        Self {
            fragment_root_element_name: None,
            strict: true,
            capacity: 1024,
            resource: None,
            converter: None,
            cursor: Box::new(LocalNameCursor),
        }
    }
}

impl<T> XmlFragmentItemReaderBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local name of the element every record is rooted at.
    pub fn fragment_root_element_name<S: AsRef<str>>(mut self, name: S) -> Self {
        self.fragment_root_element_name = Some(name.as_ref().to_string());
        self
    }

    /// In strict mode `open` fails if the resource does not exist. In lenient mode the
    /// reader opens without input and every read returns `None`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Buffer capacity of the XML transport.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn converter<C: FragmentConverter<T> + 'static>(mut self, converter: C) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    /// Replaces the default [`LocalNameCursor`].
    pub fn cursor<C: FragmentCursor + 'static>(mut self, cursor: C) -> Self {
        self.cursor = Box::new(cursor);
        self
    }

    pub fn resource<R: Resource + 'static>(mut self, resource: R) -> Self {
        self.resource = Some(Box::new(resource));
        self
    }

    /// Reads from a file. Whether it exists is only checked by `open`.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Self {
        self.resource(FileSystemResource::new(path))
    }

    pub fn from_bytes<B: Into<Vec<u8>>>(self, content: B) -> Self {
        self.resource(InMemoryResource::new(content))
    }

    /// Validates the configuration. No I/O happens here.
    pub fn build(self) -> Result<XmlFragmentItemReader<T>, BatchError> {
        let fragment_root_element_name = match self.fragment_root_element_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(BatchError::Configuration(
                    "The fragment root element name must not be empty".to_string(),
                ));
            }
        };
        let converter = self.converter.ok_or_else(|| {
            BatchError::Configuration("The fragment converter must be set".to_string())
        })?;
        let resource = self.resource.ok_or_else(|| {
            BatchError::Configuration("The input resource must be set".to_string())
        })?;

        Ok(XmlFragmentItemReader {
            fragment_root_element_name,
            strict: self.strict,
            capacity: self.capacity,
            resource,
            converter,
            cursor: self.cursor,
            input: RefCell::new(Input::Unopened),
        })
    }
}

impl<T: DeserializeOwned + 'static> XmlFragmentItemReaderBuilder<T> {
    /// Uses [`XmlDeserializeConverter`] to map fragments with serde.
    pub fn serde_converter(self) -> Self {
        self.converter(XmlDeserializeConverter::<T>::new())
    }
}

/// Reads records out of an XML document one fragment at a time.
///
/// Each fragment rooted at the configured element is handed to the converter as if it
/// were a complete document, wrapped in synthetic `StartDocument`/`EndDocument` events.
/// Fragments are taken from the ambient event stream: the document is neither buffered as
/// a whole nor re-parsed per record.
///
/// The reader is not thread safe. It does not retry anything: every failure is returned
/// to the caller, and a conversion failure leaves the reader ready for the next fragment.
pub struct XmlFragmentItemReader<T> {
    fragment_root_element_name: String,
    strict: bool,
    capacity: usize,
    resource: Box<dyn Resource>,
    converter: Box<dyn FragmentConverter<T>>,
    cursor: Box<dyn FragmentCursor>,
    input: RefCell<Input>,
}

impl<T> XmlFragmentItemReader<T> {
    pub fn state(&self) -> ReaderState {
        match *self.input.borrow() {
            Input::Unopened => ReaderState::Unopened,
            Input::NoInput => ReaderState::OpenNoInput,
            Input::Ready(_) => ReaderState::OpenReady,
            Input::Closed => ReaderState::Closed,
        }
    }

    pub fn fragment_root_element_name(&self) -> &str {
        &self.fragment_root_element_name
    }

    /// Opens the resource.
    ///
    /// A missing resource fails with [`BatchError::MissingResource`] in strict mode. In
    /// lenient mode a warning is logged and the reader has no input.
    pub fn open(&self) -> Result<(), BatchError> {
        let mut input = self.input.borrow_mut();
        if matches!(*input, Input::Ready(_)) {
            return Err(BatchError::ItemReader("Reader is already open".to_string()));
        }

        let description = self.resource.description();

        if !self.resource.exists() {
            if self.strict {
                error!("Input resource does not exist {}", description);
                return Err(BatchError::MissingResource(format!(
                    "Input resource must exist (reader is in 'strict' mode): {}",
                    description
                )));
            }
            warn!("Input resource does not exist {}", description);
            *input = Input::NoInput;
            return Ok(());
        }

        let transport = self.resource.open().map_err(|e| {
            error!("Failed to open {}: {}", description, e);
            BatchError::StreamCorruption(format!("Failed to open {}: {}", description, e))
        })?;

        let source: Box<dyn EventSource> =
            Box::new(XmlEventSource::with_capacity(transport, self.capacity));
        *input = Input::Ready(FragmentEventSource::new(source));

        debug!(
            "Opened {} looking for '{}' fragments",
            description, self.fragment_root_element_name
        );
        Ok(())
    }

    /// Releases the transport.
    ///
    /// Closing twice, or closing a reader that was never opened, does nothing. The reader
    /// forgets its transport even when releasing it fails.
    pub fn close(&self) -> Result<(), BatchError> {
        let mut input = self.input.borrow_mut();
        let previous = match *input {
            Input::Unopened | Input::Closed => return Ok(()),
            _ => std::mem::replace(&mut *input, Input::Closed),
        };

        if let Input::Ready(mut source) = previous {
            source.close().map_err(|e| {
                error!("Failed to release {}: {}", self.resource.description(), e);
                BatchError::ResourceRelease(e.to_string())
            })?;
        }
        Ok(())
    }

    fn read_fragment(
        &self,
        source: &mut FragmentEventSource<Box<dyn EventSource>>,
    ) -> ItemReaderResult<T> {
        let found = self
            .cursor
            .move_to_next_fragment(source.inner_mut(), &self.fragment_root_element_name)?;
        if !found {
            return Ok(None);
        }

        source.mark_fragment_start()?;
        let converted = self.converter.convert(source);
        let processed = source.mark_fragment_processed();

        match converted {
            Ok(item) => processed.map(|_| Some(item)),
            Err(e) => {
                error!(
                    "Failed to convert '{}' fragment: {}",
                    self.fragment_root_element_name, e
                );
                Err(e)
            }
        }
    }
}

impl<T> ItemReader<T> for XmlFragmentItemReader<T> {
    fn read(&self) -> ItemReaderResult<T> {
        let mut input = self.input.borrow_mut();

        match &mut *input {
            Input::NoInput => Ok(None),
            Input::Ready(source) => self.read_fragment(source),
            Input::Unopened | Input::Closed => Err(BatchError::ItemReader(
                "Reader must be open before it can be read".to_string(),
            )),
        }
    }
}

impl<T> ItemStream for XmlFragmentItemReader<T> {
    fn open(&self, _execution_context: &ExecutionContext) -> Result<(), BatchError> {
        XmlFragmentItemReader::open(self)
    }

    fn close(&self) -> Result<(), BatchError> {
        XmlFragmentItemReader::close(self)
    }
}
