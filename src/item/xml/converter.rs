use std::marker::PhantomData;

use log::debug;
use quick_xml::{
    de::from_str,
    events::{BytesEnd, BytesStart, BytesText, Event},
    writer::Writer,
};
use serde::de::DeserializeOwned;

use crate::error::BatchError;

use super::event::{Attribute, EventSource, ParseEvent, QualifiedName};

/// Maps one fragment, presented as a standalone document, to an item.
///
/// The source handed to `convert` starts with `StartDocument`, wraps exactly one fragment
/// root and ends with `EndDocument`. Events the converter leaves unread are skipped by the
/// reader afterwards.
pub trait FragmentConverter<T> {
    fn convert(&self, source: &mut dyn EventSource) -> Result<T, BatchError>;
}

impl<T, F> FragmentConverter<T> for F
where
    F: Fn(&mut dyn EventSource) -> Result<T, BatchError>,
{
    fn convert(&self, source: &mut dyn EventSource) -> Result<T, BatchError> {
        self(source)
    }
}

/// Converter returning the fragment's events unchanged, synthetic boundaries included.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventCollector;

impl FragmentConverter<Vec<ParseEvent>> for EventCollector {
    fn convert(&self, source: &mut dyn EventSource) -> Result<Vec<ParseEvent>, BatchError> {
        let mut events = Vec::new();
        while let Some(event) = source.next_event()? {
            events.push(event);
        }
        Ok(events)
    }
}

/// Deserializes each fragment into `T` with serde.
///
/// The fragment events are written back to XML with `quick-xml` and handed to its serde
/// deserializer, so `T` is declared exactly as for `quick_xml::de`: attributes are fields
/// renamed `@name`, child elements are fields named after the element.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::item::xml::event::{Attribute, ParseEvent, QualifiedName, VecEventSource};
/// use fragment_batch_rs::item::xml::{FragmentConverter, XmlDeserializeConverter};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Rec {
///     #[serde(rename = "@id")]
///     id: u32,
/// }
///
/// let mut source = VecEventSource::new(vec![
///     ParseEvent::StartDocument,
///     ParseEvent::StartElement {
///         name: QualifiedName::local("rec"),
///         attributes: vec![Attribute::new(QualifiedName::local("id"), "7")],
///     },
///     ParseEvent::end("rec"),
///     ParseEvent::EndDocument,
/// ]);
///
/// let rec: Rec = XmlDeserializeConverter::new().convert(&mut source).unwrap();
/// assert_eq!(rec.id, 7);
/// ```
pub struct XmlDeserializeConverter<T> {
    _marker: PhantomData<T>,
}

impl<T> Default for XmlDeserializeConverter<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> XmlDeserializeConverter<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: DeserializeOwned> FragmentConverter<T> for XmlDeserializeConverter<T> {
    fn convert(&self, source: &mut dyn EventSource) -> Result<T, BatchError> {
        let xml = write_fragment(source)?;
        debug!("Finished reading XML item: {}", xml);

        from_str(&xml).map_err(|e| {
            BatchError::Conversion(format!("Failed to deserialize XML item: {} from: {}", e, xml))
        })
    }
}

/// Writes a document shaped event stream back to XML text.
///
/// The stream must be `StartDocument`, one root element and `EndDocument`. Namespaces the
/// fragment uses but does not declare itself (they were bound on an ancestor) are declared
/// on the element that first needs them, so the text parses on its own.
pub fn write_fragment(source: &mut dyn EventSource) -> Result<String, BatchError> {
    match source.next_event()? {
        Some(ParseEvent::StartDocument) => {}
        other => return Err(malformed(format!("expected StartDocument, got {:?}", other))),
    }

    let mut writer = Writer::new(Vec::new());
    let mut scopes = NamespaceScopes::default();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = source
            .next_event()?
            .ok_or_else(|| malformed("missing EndDocument".to_string()))?;

        match event {
            ParseEvent::StartElement { name, attributes } => {
                if depth == 0 {
                    roots += 1;
                    if roots > 1 {
                        return Err(malformed(format!("second root element '{}'", name)));
                    }
                }
                depth += 1;

                let added = scopes.open(&name, &attributes);

                let qualified = name.qualified();
                let mut start = BytesStart::new(qualified.as_str());
                for (prefix, namespace) in &added {
                    let key = match prefix.as_str() {
                        "" => "xmlns".to_string(),
                        prefix => format!("xmlns:{}", prefix),
                    };
                    start.push_attribute((key.as_str(), namespace.as_str()));
                }
                for attribute in &attributes {
                    let key = attribute.name.qualified();
                    start.push_attribute((key.as_str(), attribute.value.as_str()));
                }
                write(&mut writer, Event::Start(start))?;
            }
            ParseEvent::EndElement { name } => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed(format!("unexpected end element '{}'", name)))?;
                scopes.close();
                let qualified = name.qualified();
                write(&mut writer, Event::End(BytesEnd::new(qualified.as_str())))?;
            }
            ParseEvent::Characters { text } => {
                if depth == 0 {
                    return Err(malformed("character data outside the root element".to_string()));
                }
                write(&mut writer, Event::Text(BytesText::new(&text)))?;
            }
            ParseEvent::EndDocument => break,
            ParseEvent::StartDocument => {
                return Err(malformed("nested StartDocument".to_string()));
            }
            ParseEvent::Other => {}
        }
    }

    if roots != 1 || depth != 0 {
        return Err(malformed(format!(
            "expected one closed root element, found {} with depth {}",
            roots, depth
        )));
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| BatchError::Conversion(format!("Fragment is not valid UTF-8: {}", e)))
}

/// Prefix to namespace bindings of the elements written so far, innermost last.
/// The empty prefix stands for the default namespace.
#[derive(Default)]
struct NamespaceScopes {
    scopes: Vec<Vec<(String, String)>>,
}

impl NamespaceScopes {
    /// Enters an element and returns the declarations it is missing.
    fn open(&mut self, name: &QualifiedName, attributes: &[Attribute]) -> Vec<(String, String)> {
        let mut scope: Vec<(String, String)> =
            attributes.iter().filter_map(declaration).collect();
        let mut added = Vec::new();

        let element = (
            name.prefix.clone().unwrap_or_default(),
            name.namespace.clone().unwrap_or_default(),
        );
        let used = std::iter::once(element).chain(
            attributes
                .iter()
                .filter(|attribute| declaration(attribute).is_none())
                .filter_map(|attribute| binding(&attribute.name)),
        );

        for (prefix, namespace) in used {
            // A prefix cannot be undeclared and `xml` is always bound.
            if prefix == "xml" || (!prefix.is_empty() && namespace.is_empty()) {
                continue;
            }
            let bound = scope
                .iter()
                .rev()
                .find(|(p, _)| *p == prefix)
                .map(|(_, ns)| ns.as_str())
                .or_else(|| self.lookup(&prefix))
                .unwrap_or("");
            if bound != namespace {
                scope.push((prefix.clone(), namespace.clone()));
                added.push((prefix, namespace));
            }
        }

        self.scopes.push(scope);
        added
    }

    fn close(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, namespace)| namespace.as_str())
    }
}

/// The `(prefix, namespace)` pair a resolved name relies on.
fn binding(name: &QualifiedName) -> Option<(String, String)> {
    let namespace = name.namespace.clone()?;
    Some((name.prefix.clone().unwrap_or_default(), namespace))
}

/// Reads an `xmlns` / `xmlns:p` attribute as a binding.
fn declaration(attribute: &Attribute) -> Option<(String, String)> {
    match (attribute.name.prefix.as_deref(), attribute.name.local_name.as_str()) {
        (Some("xmlns"), prefix) => Some((prefix.to_string(), attribute.value.clone())),
        (None, "xmlns") => Some((String::new(), attribute.value.clone())),
        _ => None,
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<(), BatchError> {
    writer
        .write_event(event)
        .map_err(|e| BatchError::Conversion(format!("Failed to write fragment: {}", e)))
}

fn malformed(reason: String) -> BatchError {
    BatchError::Conversion(format!("Fragment is not a standalone document: {}", reason))
}
