use std::{collections::VecDeque, fmt};

use crate::error::BatchError;

/// Element or attribute name.
///
/// Identity is modelled as a `(namespace, local name)` pair. The prefix is kept only so a
/// fragment can be written back out the way it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
}

impl QualifiedName {
    /// A name without namespace or prefix.
    pub fn local<S: Into<String>>(local_name: S) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local_name: local_name.into(),
        }
    }

    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// The name as written in a document: `prefix:local` or `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{{{}}}{}", namespace, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualifiedName,
    pub value: String,
}

impl Attribute {
    pub fn new<S: Into<String>>(name: QualifiedName, value: S) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A single parse event, produced in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    StartDocument,
    EndDocument,
    StartElement {
        name: QualifiedName,
        attributes: Vec<Attribute>,
    },
    EndElement {
        name: QualifiedName,
    },
    Characters {
        text: String,
    },
    /// Comments, processing instructions, declarations and anything else the reader does
    /// not care about.
    Other,
}

impl ParseEvent {
    /// Shorthand for a start element with a local name and no attributes.
    pub fn start<S: Into<String>>(local_name: S) -> Self {
        ParseEvent::StartElement {
            name: QualifiedName::local(local_name),
            attributes: Vec::new(),
        }
    }

    pub fn end<S: Into<String>>(local_name: S) -> Self {
        ParseEvent::EndElement {
            name: QualifiedName::local(local_name),
        }
    }

    pub fn characters<S: Into<String>>(text: S) -> Self {
        ParseEvent::Characters { text: text.into() }
    }

    pub fn is_start_element(&self) -> bool {
        matches!(self, ParseEvent::StartElement { .. })
    }

    pub fn is_end_element(&self) -> bool {
        matches!(self, ParseEvent::EndElement { .. })
    }

    /// Name of a start or end element.
    pub fn element_name(&self) -> Option<&QualifiedName> {
        match self {
            ParseEvent::StartElement { name, .. } | ParseEvent::EndElement { name } => Some(name),
            _ => None,
        }
    }
}

/// Forward only, peekable producer of [`ParseEvent`]s over one open transport.
///
/// A source is single pass and cannot be restarted. `Ok(None)` means end of input.
pub trait EventSource {
    /// Returns the next event without consuming it.
    fn peek(&mut self) -> Result<Option<&ParseEvent>, BatchError>;

    /// Consumes and returns the next event.
    fn next_event(&mut self) -> Result<Option<ParseEvent>, BatchError>;

    /// Releases the transport. Calling it again has no effect.
    fn close(&mut self) -> Result<(), BatchError>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn peek(&mut self) -> Result<Option<&ParseEvent>, BatchError> {
        (**self).peek()
    }

    fn next_event(&mut self) -> Result<Option<ParseEvent>, BatchError> {
        (**self).next_event()
    }

    fn close(&mut self) -> Result<(), BatchError> {
        (**self).close()
    }
}

/// Event source replaying a list of events held in memory.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::item::xml::event::{EventSource, ParseEvent, VecEventSource};
///
/// let mut source = VecEventSource::new(vec![ParseEvent::start("a"), ParseEvent::end("a")]);
///
/// assert_eq!(source.peek().unwrap(), Some(&ParseEvent::start("a")));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::start("a")));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::end("a")));
/// assert_eq!(source.next_event().unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct VecEventSource {
    events: VecDeque<ParseEvent>,
    closed: bool,
}

impl VecEventSource {
    pub fn new(events: Vec<ParseEvent>) -> Self {
        Self {
            events: events.into(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of events not consumed yet.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for VecEventSource {
    fn peek(&mut self) -> Result<Option<&ParseEvent>, BatchError> {
        Ok(self.events.front())
    }

    fn next_event(&mut self) -> Result<Option<ParseEvent>, BatchError> {
        Ok(self.events.pop_front())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.events.clear();
        self.closed = true;
        Ok(())
    }
}
