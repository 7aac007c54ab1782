#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Fragment Batch

 Record-at-a-time extraction of XML fragments for high volume batch ingestion.

 Large XML exports usually hold thousands of sibling elements of the same shape: one
 `<order>`, `<person>` or `<product>` per record. **Fragment Batch** reads such a document as
 a stream, stops at each element with the configured name and hands its events to a
 converter as if they were a complete, standalone document. The document is never buffered
 as a whole and fragments are not re-parsed from raw text.

 ## Core Concepts

- **EventSource:** a forward-only, peekable stream of parse events over one open input.
- **FragmentCursor:** moves an event source to the start element of the next record.
- **FragmentEventSource:** presents one record as a document by adding synthetic
  `StartDocument` / `EndDocument` events around it.
- **FragmentConverter:** maps a record's events to an item (serde is supported out of the box).
- **XmlFragmentItemReader:** an `ItemReader` tying the above together, with a strict or lenient
  policy for missing input.
- **ItemCountingReader:** an independent decorator that counts items and skips them on restart.

 ## Features

| **Feature**   | **Description**                                                     |
|---------------|---------------------------------------------------------------------|
| xml           | Enables the `quick-xml` event source, serde converter and reader (default) |
| full          | Enables all available features                                      |

 ## Getting Started

```rust
# use serde::Deserialize;
# use fragment_batch_rs::{
#     core::item::ItemReader,
#     error::BatchError,
#     item::xml::XmlFragmentItemReaderBuilder,
# };
#[derive(Deserialize, Debug)]
struct Car {
    #[serde(rename = "@year")]
    year: u16,
    make: String,
    model: String,
}

fn main() -> Result<(), BatchError> {
    let xml = r#"
    <cars>
        <car year="1948"><make>Porsche</make><model>356</model></car>
        <car year="1995"><make>Peugeot</make><model>205</model></car>
    </cars>"#;

    let reader = XmlFragmentItemReaderBuilder::<Car>::new()
        .fragment_root_element_name("car")
        .serde_converter()
        .from_bytes(xml)
        .build()?;

    reader.open()?;
    while let Some(car) = reader.read()? {
        println!("{:?}", car);
    }
    reader.close()?;

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of items readers (XML fragments, restartable counting)
pub mod item;
