//! Create, write, reopen and rewrite documents.

use chrono::{TimeZone, Utc};
use pdfa_oxide::compliance::parse_xmp;
use pdfa_oxide::reader::PdfReader;
use pdfa_oxide::{ConformanceLevel, DocumentConfig, Error, IccProfile, Object, OutputIntent, PageSize, PdfADocument};
use std::io::Write;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> DocumentConfig {
    DocumentConfig::new()
        .with_creation_date(Utc.with_ymd_and_hms(2022, 12, 31, 23, 59, 0).unwrap())
        .with_title("Round trip")
}

fn intent() -> OutputIntent {
    OutputIntent::new("sRGB IEC61966-2.1", IccProfile::synthetic(b"mntr", b"RGB ", 2))
        .with_condition("sRGB")
        .with_registry("http://www.color.org")
}

fn create(level: ConformanceLevel, pages: usize) -> Vec<u8> {
    let mut doc = PdfADocument::new(Vec::new(), level, Some(intent()), config()).expect("document");
    doc.set_lang("en-GB").expect("lang");
    for _ in 0..pages {
        let page = doc.add_page(PageSize::A4).expect("page");
        let mut canvas = doc.canvas(page.index).expect("canvas");
        canvas.set_stroke_color_rgb(0.2, 0.2, 0.2).expect("rgb");
        canvas.move_to(0.0, 0.0).line_to(100.0, 100.0).stroke();
        canvas.release().expect("release");
    }
    doc.close().expect("close").into_inner()
}

#[test]
fn test_created_file_structure() {
    init();
    let bytes = create(ConformanceLevel::A2b, 2);
    assert!(bytes.starts_with(b"%PDF-1.7\n"));

    let reader = PdfReader::from_bytes(&bytes).expect("readable");
    let catalog = reader.graph().get_object(reader.catalog().expect("root")).expect("catalog");
    assert_eq!(catalog.get("Lang"), Some(&Object::String(b"en-GB".to_vec())));

    let metadata = catalog
        .get("Metadata")
        .and_then(Object::as_reference)
        .expect("metadata reference");
    let packet = reader
        .graph()
        .get_object(metadata)
        .expect("metadata")
        .decode_stream_data()
        .expect("packet");
    let xmp = parse_xmp(&packet).expect("xmp");
    assert_eq!(xmp.level(), Some(ConformanceLevel::A2b));
    assert_eq!(xmp.title.as_deref(), Some("Round trip"));

    let info = reader
        .graph()
        .get_object(reader.info().expect("info"))
        .expect("info dict");
    assert_eq!(info.get("Title"), Some(&Object::String(b"Round trip".to_vec())));
    assert_eq!(info.get("CreationDate"), info.get("ModDate"));
}

#[test]
fn test_reopen_detects_level_and_keeps_first_id() {
    init();
    let original = create(ConformanceLevel::A3b, 1);
    let first_id = PdfReader::from_bytes(&original)
        .expect("readable")
        .original_id()
        .expect("id");

    let doc = PdfADocument::open(&original, Vec::new(), config()).expect("open");
    assert_eq!(doc.level(), ConformanceLevel::A3b);
    assert_eq!(doc.page_count(), 1);
    assert!(doc.output_intent().is_some());

    let rewritten = doc.close().expect("close").into_inner();
    let reader = PdfReader::from_bytes(&rewritten).expect("readable");
    assert_eq!(reader.original_id(), Some(first_id));
    assert_eq!(reader.version(), "1.7");
}

#[test]
fn test_unmodified_reopen_reproduces_file() {
    init();
    let original = create(ConformanceLevel::A2b, 2);
    let doc = PdfADocument::open(&original, Vec::new(), config()).expect("open");
    let rewritten = doc.close().expect("close").into_inner();

    let before = PdfReader::from_bytes(&original).expect("readable");
    let after = PdfReader::from_bytes(&rewritten).expect("readable");
    let catalog = before.catalog().expect("root");
    assert_eq!(after.catalog().expect("root"), catalog);
    assert_eq!(
        before.graph().get_object(catalog).expect("catalog"),
        after.graph().get_object(catalog).expect("catalog")
    );
    for r in before.graph().in_memory_refs() {
        let object = before.graph().get_object(r).expect("object");
        if object.is_stream() {
            assert_eq!(
                object.decode_stream_data().expect("decode"),
                after.graph().get_object(r).expect("stream").decode_stream_data().expect("decode"),
                "stream {}",
                r
            );
        }
    }
    assert_eq!(original, rewritten);
}

#[test]
fn test_reopen_and_add_page() {
    init();
    let original = create(ConformanceLevel::A2u, 1);
    let mut doc = PdfADocument::open(&original, Vec::new(), config()).expect("open");
    let page = doc.add_page(PageSize::Letter).expect("page after reopen");
    assert_eq!(page.index, 1);
    let rewritten = doc.close().expect("close").into_inner();

    let reopened = PdfADocument::open(&rewritten, Vec::new(), config()).expect("open again");
    assert_eq!(reopened.page_count(), 2);
}

#[test]
fn test_forced_level_overrides_xmp() {
    init();
    let original = create(ConformanceLevel::A2b, 1);
    let config = config().with_forced_level(ConformanceLevel::A2u);
    let mut doc = PdfADocument::open(&original, Vec::new(), config).expect("open");
    assert_eq!(doc.level(), ConformanceLevel::A2u);

    let report = doc.validate().expect("report");
    assert_eq!(report.detected_level, Some(ConformanceLevel::A2b));
    assert!(report.contains(pdfa_oxide::RuleId::XmpIdentificationMismatch));
}

#[test]
fn test_open_without_pdfa_identification() {
    init();
    let mut out = b"%PDF-1.7\n".to_vec();
    let first = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let second = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    let xref = out.len();
    out.extend_from_slice(
        format!(
            "xref\n0 3\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            first, second, xref
        )
        .as_bytes(),
    );

    assert!(matches!(
        PdfADocument::open(&out, Vec::new(), DocumentConfig::new()),
        Err(Error::InvalidPdf(_))
    ));
    let doc = PdfADocument::open(&out, Vec::new(), DocumentConfig::new().with_forced_level(ConformanceLevel::A2b))
        .expect("forced level");
    assert_eq!(doc.page_count(), 0);
    assert!(doc.output_intent().is_none());
}

#[test]
fn test_write_to_file() {
    init();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    {
        let mut doc = PdfADocument::new(file.as_file_mut(), ConformanceLevel::A1b, Some(intent()), config())
            .expect("document");
        doc.set_lang("fr").expect("lang");
        doc.add_page(PageSize::A4).expect("page");
        let sink = doc.close().expect("close").into_inner();
        sink.flush().expect("flush");
    }
    let bytes = std::fs::read(file.path()).expect("read back");
    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    let reader = PdfReader::from_bytes(&bytes).expect("readable");
    assert_eq!(reader.version(), "1.4");
    assert!(reader.info().is_some());
}
