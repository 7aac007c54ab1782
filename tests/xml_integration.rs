mod common;

use std::io::Write;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use fragment_batch_rs::{
    core::{
        execution::ExecutionContext,
        item::{ItemReader, ItemStream},
        resource::FileSystemResource,
    },
    item::counting::ItemCountingReader,
    item::xml::{
        EventCollector, EventSource, ParseEvent, ReaderState, VecEventSource, XmlEventSource,
        XmlFragmentItemReader, XmlFragmentItemReaderBuilder, converter::write_fragment,
    },
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Product {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@available")]
    available: bool,
    name: String,
    price: f64,
    #[serde(default)]
    description: Option<String>,
}

fn catalog(count: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<catalog>\n");
    for i in 0..count {
        xml.push_str(&format!(
            "  <product id=\"P{:03}\" available=\"{}\">\n    <name>Product {}</name>\n    <price>{}.5</price>\n  </product>\n",
            i,
            i % 2 == 0,
            i,
            i
        ));
    }
    xml.push_str("</catalog>\n");
    xml
}

fn collector(xml: &str, tag: &str) -> XmlFragmentItemReader<Vec<ParseEvent>> {
    XmlFragmentItemReaderBuilder::new()
        .fragment_root_element_name(tag)
        .converter(EventCollector)
        .from_bytes(xml)
        .build()
        .unwrap()
}

#[test]
fn read_products_from_xml_file() {
    common::init_logger();

    let xml_content = r#"
    <catalog>
      <product id="P001" available="true">
        <name>Wireless Headphones</name>
        <price>79.99</price>
        <description>Noise-cancelling wireless headphones with 20hr battery life</description>
      </product>
      <product id="P002" available="false">
        <name>USB-C Cable</name>
        <price>12.99</price>
      </product>
      <product id="P003" available="true">
        <name>Smart Watch</name>
        <price>149.99</price>
        <description>Fitness tracking smart watch with heart rate monitor</description>
      </product>
    </catalog>
    "#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(xml_content.as_bytes()).unwrap();

    let reader = XmlFragmentItemReaderBuilder::<Product>::new()
        .fragment_root_element_name("product")
        .serde_converter()
        .resource(FileSystemResource::new(temp_file.path()))
        .build()
        .unwrap();

    reader.open().unwrap();

    let mut products = Vec::new();
    while let Some(product) = reader.read().unwrap() {
        products.push(product);
    }
    reader.close().unwrap();

    assert_eq!(products.len(), 3);
    assert_eq!(products[0].name, "Wireless Headphones");
    assert_eq!(products[1].id, "P002");
    assert!(!products[1].available);
    assert!(products[1].description.is_none());
    assert_eq!(products[2].price, 149.99);
}

#[test]
fn k_fragments_should_give_k_items_then_end_of_input() {
    for k in 0..5 {
        let xml = catalog(k);
        let reader = collector(&xml, "product");
        reader.open().unwrap();

        for i in 0..k {
            let events = reader.read().unwrap().unwrap();

            assert_eq!(events.first(), Some(&ParseEvent::StartDocument));
            assert_eq!(events.last(), Some(&ParseEvent::EndDocument));
            assert_eq!(
                events.iter().filter(|e| matches!(e, ParseEvent::StartDocument)).count(),
                1
            );

            // The fragment parses on its own as a complete document.
            let rendered = write_fragment(&mut VecEventSource::new(events)).unwrap();
            assert!(rendered.contains(&format!("id=\"P{:03}\"", i)));

            let mut standalone = XmlEventSource::new(rendered.as_bytes());
            let mut reparsed = Vec::new();
            while let Some(event) = standalone.next_event().unwrap() {
                reparsed.push(event);
            }
            assert_eq!(reparsed.first(), Some(&ParseEvent::StartDocument));
            assert_eq!(reparsed[1].element_name().unwrap().local_name, "product");
            assert_eq!(reparsed.last(), Some(&ParseEvent::EndDocument));
        }

        assert!(reader.read().unwrap().is_none(), "k = {}", k);
        reader.close().unwrap();
    }
}

#[test]
fn fragments_in_unrelated_subtrees_should_be_found() {
    let xml = r#"
    <export>
      <header><count>2</count></header>
      <region name="north"><rec>1</rec></region>
      <region name="south"><rec>2</rec></region>
    </export>
    "#;
    let reader = collector(xml, "rec");
    reader.open().unwrap();

    let first = reader.read().unwrap().unwrap();
    let second = reader.read().unwrap().unwrap();

    assert_eq!(first[2], ParseEvent::characters("1"));
    assert_eq!(second[2], ParseEvent::characters("2"));
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn whitespace_only_content_should_reach_the_converter() {
    let reader = collector("<r>\n  <rec><name> </name></rec>\n</r>", "rec");
    reader.open().unwrap();

    let events = reader.read().unwrap().unwrap();

    assert_eq!(
        events,
        vec![
            ParseEvent::StartDocument,
            ParseEvent::start("rec"),
            ParseEvent::start("name"),
            ParseEvent::characters(" "),
            ParseEvent::end("name"),
            ParseEvent::end("rec"),
            ParseEvent::EndDocument,
        ]
    );
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn namespaced_fragments_should_be_matched_by_local_name() {
    let xml = r#"
    <o:orders xmlns:o="urn:orders">
      <o:order o:id="1"><o:total>10</o:total></o:order>
      <o:order o:id="2"><o:total>20</o:total></o:order>
    </o:orders>
    "#;
    let reader = collector(xml, "order");
    reader.open().unwrap();

    let first = reader.read().unwrap().unwrap();
    let name = first[1].element_name().unwrap();
    assert_eq!(name.namespace.as_deref(), Some("urn:orders"));
    assert_eq!(name.qualified(), "o:order");

    let rendered = write_fragment(&mut VecEventSource::new(first)).unwrap();
    assert!(rendered.starts_with("<o:order xmlns:o=\"urn:orders\" o:id=\"1\">"));

    // The rendered fragment keeps its namespace when parsed on its own.
    let mut standalone = XmlEventSource::new(rendered.as_bytes());
    standalone.next_event().unwrap();
    let root = standalone.next_event().unwrap().unwrap();
    let root = root.element_name().unwrap();
    assert_eq!(root.namespace.as_deref(), Some("urn:orders"));
    assert_eq!(root.local_name, "order");

    assert!(reader.read().unwrap().is_some());
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn restart_should_resume_after_last_counted_item() {
    let xml = catalog(4);
    let build = || {
        XmlFragmentItemReaderBuilder::<Product>::new()
            .fragment_root_element_name("product")
            .serde_converter()
            .from_bytes(xml.as_str())
            .build()
            .unwrap()
    };

    // First run: two items are read before the run stops.
    let mut context = ExecutionContext::new();
    let reader = ItemCountingReader::<Product, _>::new("products", build());
    reader.open(&context).unwrap();
    assert_eq!(reader.read().unwrap().unwrap().id, "P000");
    assert_eq!(reader.read().unwrap().unwrap().id, "P001");
    reader.update(&mut context).unwrap();
    ItemStream::close(&reader).unwrap();

    let saved = context.to_json().unwrap();

    // Second run resumes from the saved context.
    let context = ExecutionContext::from_json(&saved).unwrap();
    let reader = ItemCountingReader::<Product, _>::new("products", build());
    reader.open(&context).unwrap();

    assert_eq!(reader.inner().state(), ReaderState::OpenReady);
    assert_eq!(reader.read().unwrap().unwrap().id, "P002");
    assert_eq!(reader.read().unwrap().unwrap().id, "P003");
    assert!(reader.read().unwrap().is_none());
    assert_eq!(reader.current_item_count(), 4);
}

#[test]
fn large_document_should_be_read_with_small_buffer() {
    let count = 500;
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(catalog(count).as_bytes()).unwrap();
    let path = temp_file.path().to_path_buf();

    let reader = XmlFragmentItemReaderBuilder::<Product>::new()
        .fragment_root_element_name("product")
        .serde_converter()
        .capacity(64)
        .from_path(&path)
        .build()
        .unwrap();
    reader.open().unwrap();

    let mut read = 0;
    while let Some(product) = reader.read().unwrap() {
        assert_eq!(product.name, format!("Product {}", read));
        read += 1;
    }
    reader.close().unwrap();

    assert_eq!(read, count);
}
