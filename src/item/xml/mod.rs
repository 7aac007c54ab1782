//! XML fragment extraction for record oriented batch input.
//!
//! A large XML document usually holds many sibling elements of the same shape, one per
//! record. This module reads them one at a time: a cursor moves the parser to the next
//! element with the configured name, and a decorator presents that element's events as a
//! standalone document to a converter that maps it to an item.
//!
//! The pieces, from the bottom up:
//!
//! - [`event`]: the parse event model and the [`EventSource`] trait
//! - [`XmlEventSource`]: an event source over the `quick-xml` pull parser
//! - [`FragmentCursor`] / [`LocalNameCursor`]: finds the next fragment root
//! - [`FragmentEventSource`]: wraps one fragment in synthetic document events
//! - [`FragmentConverter`]: maps a fragment to an item, e.g. [`XmlDeserializeConverter`]
//! - [`XmlFragmentItemReader`]: open/read/close lifecycle tying everything together
//!
//! # Examples
//!
//! ```
//! use fragment_batch_rs::item::xml::XmlFragmentItemReaderBuilder;
//! use fragment_batch_rs::core::item::ItemReader;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Product {
//!     #[serde(rename = "@id")]
//!     id: String,
//!     #[serde(rename = "@available")]
//!     available: bool,
//!     name: String,
//!     price: f64,
//!     #[serde(default)]
//!     description: Option<String>,
//! }
//!
//! let xml_data = r#"
//! <catalog>
//!   <product id="P001" available="true">
//!     <name>Wireless Headphones</name>
//!     <price>79.99</price>
//!     <description>Noise-cancelling wireless headphones with 20hr battery life</description>
//!   </product>
//!   <product id="P002" available="false">
//!     <name>USB-C Cable</name>
//!     <price>12.99</price>
//!   </product>
//! </catalog>
//! "#;
//!
//! let reader = XmlFragmentItemReaderBuilder::<Product>::new()
//!     .fragment_root_element_name("product")
//!     .serde_converter()
//!     .from_bytes(xml_data)
//!     .build()
//!     .unwrap();
//! reader.open().unwrap();
//!
//! let mut products = Vec::new();
//! while let Some(product) = reader.read().unwrap() {
//!     products.push(product);
//! }
//! reader.close().unwrap();
//!
//! assert_eq!(products.len(), 2);
//! assert_eq!(products[0].id, "P001");
//! assert_eq!(products[0].price, 79.99);
//! assert!(products[0].available);
//! assert!(products[0].description.is_some());
//! assert!(!products[1].available);
//! assert!(products[1].description.is_none());
//! ```

pub mod cursor;
pub mod event;
pub mod fragment_event_source;

#[cfg(feature = "xml")]
pub mod converter;
#[cfg(feature = "xml")]
pub mod xml_event_source;
#[cfg(feature = "xml")]
pub mod xml_reader;

pub use cursor::{FragmentCursor, LocalNameCursor};
pub use event::{Attribute, EventSource, ParseEvent, QualifiedName, VecEventSource};
pub use fragment_event_source::FragmentEventSource;

#[cfg(feature = "xml")]
pub use converter::{EventCollector, FragmentConverter, XmlDeserializeConverter};
#[cfg(feature = "xml")]
pub use xml_event_source::XmlEventSource;
#[cfg(feature = "xml")]
pub use xml_reader::{ReaderState, XmlFragmentItemReader, XmlFragmentItemReaderBuilder};
