use std::{
    collections::VecDeque,
    io::{BufReader, Read},
    str,
};

use log::debug;
use quick_xml::{
    escape::unescape,
    events::{BytesStart, Event},
    name::{QName, ResolveResult},
    reader::NsReader,
};

use crate::error::BatchError;

use super::event::{Attribute, EventSource, ParseEvent, QualifiedName};

/// [`EventSource`] backed by the `quick-xml` pull parser.
///
/// The source behaves like a StAX event reader:
/// - the first event is always `StartDocument` and the last one `EndDocument`
/// - empty elements (`<a/>`) are reported as a start followed by an end element
/// - adjacent text, CDATA and entity references are merged into one `Characters` event
/// - whitespace-only text between elements is dropped, but kept when it is the whole
///   content of an element (`<a> </a>`)
/// - comments, processing instructions, declarations and doctypes become `Other`
///
/// Element names are namespace resolved. The parser does not validate.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::item::xml::event::{EventSource, ParseEvent};
/// use fragment_batch_rs::item::xml::XmlEventSource;
///
/// let mut source = XmlEventSource::new("<root><rec>x</rec></root>".as_bytes());
///
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::StartDocument));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::start("root")));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::start("rec")));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::characters("x")));
/// ```
pub struct XmlEventSource<R> {
    reader: Option<NsReader<BufReader<R>>>,
    buffer: Vec<u8>,
    pending: VecDeque<ParseEvent>,
    started: bool,
    finished: bool,
    /// The last structural event was a start tag with nothing after it yet.
    after_start: bool,
}

impl<R: Read> XmlEventSource<R> {
    pub fn new(rdr: R) -> Self {
        Self::with_capacity(rdr, 1024)
    }

    /// Creates a source whose transport is buffered with `capacity` bytes.
    pub fn with_capacity(rdr: R, capacity: usize) -> Self {
        let buf_reader = BufReader::with_capacity(capacity, rdr);
        let xml_reader = NsReader::from_reader(buf_reader);

        Self {
            reader: Some(xml_reader),
            buffer: Vec::with_capacity(1024),
            pending: VecDeque::new(),
            started: false,
            finished: false,
            after_start: false,
        }
    }

    /// Returns `true` once `close` has released the transport.
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Pulls raw events until at least one parse event is queued or the input is over.
    fn read_more(&mut self) -> Result<(), BatchError> {
        if !self.started {
            self.started = true;
            self.pending.push_back(ParseEvent::StartDocument);
            return Ok(());
        }
        if self.finished {
            return Ok(());
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };

        let mut text = String::new();

        loop {
            self.buffer.clear();
            let (resolved, event) = reader
                .read_resolved_event_into(&mut self.buffer)
                .map_err(|e| BatchError::StreamCorruption(format!("XML parsing error: {}", e)))?;
            let namespace = namespace_of(&resolved)?;

            match event {
                Event::Text(ref content) => {
                    let raw = utf8(content.as_ref())?;
                    let unescaped = unescape(raw).map_err(|e| {
                        BatchError::StreamCorruption(format!("Invalid character data: {}", e))
                    })?;
                    text.push_str(&unescaped);
                }
                Event::CData(ref content) => {
                    text.push_str(utf8(content.as_ref())?);
                }
                Event::GeneralRef(ref reference) => {
                    text.push_str(&resolve_reference(utf8(reference.as_ref())?)?);
                }
                other => {
                    let keep_blank = self.after_start && matches!(other, Event::End(_));
                    flush_text(&mut self.pending, &mut text, keep_blank);
                    self.after_start = matches!(other, Event::Start(_));

                    match other {
                        Event::Start(ref start) => {
                            let event = start_element(reader, namespace, start)?;
                            self.pending.push_back(event);
                        }
                        Event::Empty(ref start) => {
                            let event = start_element(reader, namespace, start)?;
                            if let Some(name) = event.element_name().cloned() {
                                self.pending.push_back(event);
                                self.pending.push_back(ParseEvent::EndElement { name });
                            }
                        }
                        Event::End(ref end) => {
                            let name = qualified_name(namespace, end.name())?;
                            self.pending.push_back(ParseEvent::EndElement { name });
                        }
                        Event::Eof => {
                            debug!("Reached end of XML input");
                            self.finished = true;
                            self.pending.push_back(ParseEvent::EndDocument);
                        }
                        _ => self.pending.push_back(ParseEvent::Other),
                    }

                    return Ok(());
                }
            }
        }
    }
}

impl<R: Read> EventSource for XmlEventSource<R> {
    fn peek(&mut self) -> Result<Option<&ParseEvent>, BatchError> {
        if self.pending.is_empty() {
            self.read_more()?;
        }
        Ok(self.pending.front())
    }

    fn next_event(&mut self) -> Result<Option<ParseEvent>, BatchError> {
        if self.pending.is_empty() {
            self.read_more()?;
        }
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        if self.reader.take().is_some() {
            debug!("XML transport released");
        }
        self.pending.clear();
        self.finished = true;
        Ok(())
    }
}

fn flush_text(pending: &mut VecDeque<ParseEvent>, text: &mut String, keep_blank: bool) {
    if !text.is_empty() && (keep_blank || !text.trim().is_empty()) {
        pending.push_back(ParseEvent::Characters {
            text: std::mem::take(text),
        });
    }
    text.clear();
}

fn start_element<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart,
) -> Result<ParseEvent, BatchError> {
    let name = qualified_name(namespace, start.name())?;

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr
            .map_err(|e| BatchError::StreamCorruption(format!("Invalid attribute: {}", e)))?;
        let (resolved, _) = reader.resolver().resolve_attribute(attr.key);
        let attribute_name = qualified_name(namespace_of(&resolved)?, attr.key)?;
        let value = unescape(utf8(&attr.value)?)
            .map_err(|e| BatchError::StreamCorruption(format!("Invalid attribute value: {}", e)))?;
        attributes.push(Attribute::new(attribute_name, value));
    }

    Ok(ParseEvent::StartElement { name, attributes })
}

fn qualified_name(namespace: Option<String>, name: QName) -> Result<QualifiedName, BatchError> {
    let local_name = utf8(name.local_name().as_ref())?.to_string();
    let prefix = match name.prefix() {
        Some(prefix) => Some(utf8(prefix.as_ref())?.to_string()),
        None => None,
    };

    Ok(QualifiedName {
        namespace,
        prefix,
        local_name,
    })
}

fn namespace_of(resolved: &ResolveResult) -> Result<Option<String>, BatchError> {
    match resolved {
        ResolveResult::Bound(namespace) => Ok(Some(utf8(namespace.as_ref())?.to_string())),
        _ => Ok(None),
    }
}

/// Resolves a character reference or one of the five predefined entities.
fn resolve_reference(reference: &str) -> Result<String, BatchError> {
    if let Some(code) = reference.strip_prefix('#') {
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        };
        return parsed
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| {
                BatchError::StreamCorruption(format!("Invalid character reference &{};", reference))
            });
    }

    let resolved = match reference {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        _ => {
            return Err(BatchError::StreamCorruption(format!(
                "Unknown entity &{};",
                reference
            )));
        }
    };
    Ok(resolved.to_string())
}

fn utf8(bytes: &[u8]) -> Result<&str, BatchError> {
    str::from_utf8(bytes)
        .map_err(|e| BatchError::StreamCorruption(format!("Invalid UTF-8 in XML input: {}", e)))
}
