//! Optional content and interactive forms under PDF/A restrictions.

use pdfa_oxide::reader::PdfReader;
use pdfa_oxide::writer::{Layer, TextField};
use pdfa_oxide::{ConformanceLevel, DocumentConfig, IccProfile, Object, OutputIntent, PageSize, PdfADocument, RuleId};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn document(level: ConformanceLevel) -> PdfADocument<Vec<u8>> {
    let intent = OutputIntent::new("sRGB", IccProfile::synthetic(b"mntr", b"RGB ", 2));
    let mut doc = PdfADocument::new(Vec::new(), level, Some(intent), DocumentConfig::new()).expect("document");
    doc.set_lang("en").expect("lang");
    doc.add_page(PageSize::A4).expect("page");
    doc
}

fn reread(bytes: &[u8]) -> (PdfReader, Object) {
    let reader = PdfReader::from_bytes(bytes).expect("readable");
    let catalog = reader
        .graph()
        .get_object(reader.catalog().expect("root"))
        .expect("catalog")
        .clone();
    (reader, catalog)
}

#[test]
fn test_layers_written_with_default_configuration() {
    init();
    let mut doc = document(ConformanceLevel::A2b);
    let shown = doc.add_layer("Annotations").expect("layer");
    let hidden = doc
        .add_layer_with(Layer::new("Draft marks").visible(false))
        .expect("layer");

    let mut canvas = doc.canvas(0).expect("canvas");
    canvas.begin_layer(hidden).expect("begin");
    canvas.set_fill_gray(0.5).expect("gray").rectangle(0.0, 0.0, 20.0, 20.0).fill();
    canvas.end_layer().expect("end");
    canvas.release().expect("release");

    let report = doc.validate().expect("report");
    assert!(!report.contains(RuleId::OcgShallBeListedInOrder));
    assert!(!report.contains(RuleId::OcConfigShallContainName));

    let bytes = doc.close().expect("close").into_inner();
    let (reader, catalog) = reread(&bytes);
    let props = catalog
        .get("OCProperties")
        .and_then(|o| reader.graph().resolve(o))
        .expect("OCProperties");
    let config = props.get("D").expect("default configuration");
    assert!(config.get("Name").is_some());
    assert!(config.get("AS").is_none());
    assert_eq!(
        config.get("OFF").and_then(Object::as_array),
        Some(&vec![Object::Reference(hidden)])
    );
    let order = config.get("Order").and_then(Object::as_array).expect("order");
    assert!(order.contains(&Object::Reference(shown)));
    assert!(order.contains(&Object::Reference(hidden)));
}

#[test]
fn test_layers_refused_in_part_one() {
    init();
    let mut doc = document(ConformanceLevel::A1a);
    let err = doc.add_layer("Annotations").unwrap_err();
    assert_eq!(err.rule_id(), Some(RuleId::OptionalContentNotAllowed));
    assert!(doc
        .get_object(doc.catalog_ref())
        .expect("catalog")
        .get("OCProperties")
        .is_none());
}

#[test]
fn test_text_field_round_trip() {
    init();
    let mut doc = document(ConformanceLevel::A3b);
    let widget = doc
        .add_text_field(0, TextField::new("name", [72.0, 700.0, 272.0, 720.0]).with_value("Grace"))
        .expect("field");
    doc.acroform_mut().expect("form").set_default_appearance("/Helv 0 Tf 0 g");

    let bytes = doc.close().expect("close").into_inner();
    let (reader, catalog) = reread(&bytes);
    let form = catalog
        .get("AcroForm")
        .and_then(|o| reader.graph().resolve(o))
        .expect("AcroForm");
    assert!(form.get("NeedAppearances").is_none());
    assert_eq!(
        form.get("Fields").and_then(Object::as_array),
        Some(&vec![Object::Reference(widget)])
    );

    let widget = reader.graph().get_object(widget).expect("widget");
    let appearance = widget
        .get("AP")
        .and_then(|ap| ap.get("N"))
        .and_then(Object::as_reference)
        .expect("normal appearance");
    assert!(reader.graph().get_object(appearance).expect("stream").is_stream());
    assert_eq!(widget.get("F"), Some(&Object::Integer(4)));
}

#[test]
fn test_hidden_annotation_rejected_at_flush() {
    init();
    let mut doc = document(ConformanceLevel::A2b);
    let page = doc.page(0).expect("page");
    let mut annot = std::collections::HashMap::new();
    annot.insert("Type".to_string(), Object::name("Annot"));
    annot.insert("Subtype".to_string(), Object::name("Square"));
    annot.insert(
        "Rect".to_string(),
        Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)]),
    );
    annot.insert("F".to_string(), Object::Integer(2 | 4));
    annot.insert("P".to_string(), Object::Reference(page.page));
    let r = doc.add_object(Object::Dictionary(annot)).expect("annot");

    let err = doc.flush_object(r).unwrap_err();
    assert_eq!(err.rule_id(), Some(RuleId::AnnotationHiddenFlagsShallBeClear));
}
