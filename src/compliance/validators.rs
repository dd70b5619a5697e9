//! Individual PDF/A validation functions.
//!
//! Each function inspects one dictionary shape and pushes candidate
//! violations. Whether a candidate is fatal, a warning or ignored is decided
//! later by the checker through the severity table, so these functions only
//! look at the level where the *content* of a rule differs between parts
//! (allowed blend modes, allowed annotation subtypes).

use super::rules::{
    AnnotationFlags, ALLOWED_RENDERING_INTENTS, MAX_ARRAY_LENGTH, MAX_DICTIONARY_ENTRIES, MAX_NAME_LENGTH, MAX_PAGE_BOUNDARY,
    MAX_REAL, MAX_STRING_LENGTH, MIN_PAGE_BOUNDARY,
};
use super::types::{ConformanceLevel, ConformanceViolation, PdfAPart, RuleId};
use crate::graph::ObjectGraph;
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::HashSet;

/// Candidate violations collected for one object.
pub type Violations = Vec<ConformanceViolation>;

const PAGE_BOXES: [&str; 5] = ["MediaBox", "CropBox", "BleedBox", "TrimBox", "ArtBox"];

const FORBIDDEN_ACTIONS: [&str; 11] = [
    "Launch",
    "Sound",
    "Movie",
    "ResetForm",
    "ImportData",
    "JavaScript",
    "Hide",
    "SetOCGState",
    "Rendition",
    "Trans",
    "GoTo3DView",
];

const ALLOWED_NAMED_ACTIONS: [&str; 4] = ["NextPage", "PrevPage", "FirstPage", "LastPage"];

const STANDARD_BLEND_MODES: [&str; 17] = [
    "Normal",
    "Compatible",
    "Multiply",
    "Screen",
    "Overlay",
    "Darken",
    "Lighten",
    "ColorDodge",
    "ColorBurn",
    "HardLight",
    "SoftLight",
    "Difference",
    "Exclusion",
    "Hue",
    "Saturation",
    "Color",
    "Luminosity",
];

const FORBIDDEN_ANNOTATIONS: [&str; 5] = ["Sound", "Movie", "Screen", "3D", "RichMedia"];

fn push(out: &mut Violations, rule: RuleId) {
    out.push(ConformanceViolation::new(rule, None));
}

fn push_detail(out: &mut Violations, rule: RuleId, detail: impl std::fmt::Display) {
    out.push(ConformanceViolation::new(rule, None).with_detail(detail));
}

/// Check a rendering intent name against the four allowed intents.
pub fn validate_rendering_intent(intent: &str, out: &mut Violations) {
    if !ALLOWED_RENDERING_INTENTS.contains(&intent) {
        push_detail(out, RuleId::InvalidRenderingIntent, format_args!("/{}", intent));
    }
}

/// Check one entry set on a page dictionary.
pub fn validate_page_entry(key: &str, value: &Object, out: &mut Violations) {
    match key {
        "PresSteps" => push(out, RuleId::PageDictionaryShallNotContainPressteps),
        "AA" => push(out, RuleId::PageDictionaryShallNotContainAa),
        "Group" => {
            if value.get("S").and_then(Object::as_name) == Some("Transparency") {
                push(out, RuleId::PageTransparencyGroup);
            }
        },
        k if PAGE_BOXES.contains(&k) => validate_page_box(k, value, out),
        _ => {},
    }
}

fn validate_page_box(key: &str, value: &Object, out: &mut Violations) {
    let Some(values) = value.as_array() else {
        return;
    };
    let coords: Vec<f64> = values.iter().filter_map(Object::as_number).collect();
    if coords.len() != 4 {
        return;
    }
    let width = (coords[2] - coords[0]).abs();
    let height = (coords[3] - coords[1]).abs();
    let in_range = |v: f64| (MIN_PAGE_BOUNDARY..=MAX_PAGE_BOUNDARY).contains(&v);
    if !in_range(width) || !in_range(height) {
        push_detail(
            out,
            RuleId::PageBoundaryOutOfRange,
            format_args!("{} is {}x{}", key, width, height),
        );
    }
}

/// Validate a page dictionary.
pub fn validate_page(dict: &Dictionary, out: &mut Violations) {
    let mut keys: Vec<&String> = dict.keys().collect();
    keys.sort();
    for key in keys {
        validate_page_entry(key, &dict[key], out);
    }
}

/// Check one entry set on the document catalog.
pub fn validate_catalog_entry(key: &str, value: &Object, out: &mut Violations) {
    match key {
        "AA" => push(out, RuleId::CatalogShallNotContainAa),
        "OCProperties" => push(out, RuleId::OptionalContentNotAllowed),
        "NeedsRendering" => push(out, RuleId::CatalogShallNotContainNeedsRendering),
        "Names" => {
            if let Some(names) = value.as_dict() {
                validate_name_dictionary(names, out);
            }
        },
        _ => {},
    }
}

/// Validate the document catalog.
pub fn validate_catalog(dict: &Dictionary, out: &mut Violations) {
    let mut keys: Vec<&String> = dict.keys().collect();
    keys.sort();
    for key in keys {
        validate_catalog_entry(key, &dict[key], out);
    }
}

/// Validate the catalog's name dictionary.
pub fn validate_name_dictionary(dict: &Dictionary, out: &mut Violations) {
    if dict.contains_key("JavaScript") {
        push(out, RuleId::JavaScriptNotAllowed);
    }
    if dict.contains_key("AlternatePresentations") {
        push(out, RuleId::CatalogShallNotContainAlternatePresentations);
    }
}

/// Validate an extended graphics state dictionary.
pub fn validate_ext_gstate(dict: &Dictionary, level: ConformanceLevel, out: &mut Violations) {
    if dict.contains_key("TR") {
        push(out, RuleId::ExtGStateShallNotContainTr);
    }
    if let Some(tr2) = dict.get("TR2") {
        if tr2.as_name() != Some("Default") {
            push(out, RuleId::ExtGStateTr2ShallBeDefault);
        }
    }
    if dict.contains_key("HTP") {
        push(out, RuleId::ExtGStateShallNotContainHtp);
    }
    if let Some(smask) = dict.get("SMask") {
        if smask.as_name() != Some("None") {
            push(out, RuleId::SoftMaskNotAllowed);
        }
    }
    for key in ["CA", "ca"] {
        if let Some(alpha) = dict.get(key).and_then(Object::as_number) {
            if (alpha - 1.0).abs() > f64::EPSILON {
                push_detail(out, RuleId::ConstantAlphaShallBeOne, format_args!("{} is {}", key, alpha));
            }
        }
    }
    if let Some(bm) = dict.get("BM") {
        let modes: Vec<&str> = match bm {
            Object::Name(n) => vec![n.as_str()],
            Object::Array(items) => items.iter().filter_map(Object::as_name).collect(),
            _ => Vec::new(),
        };
        for mode in modes {
            if !blend_mode_allowed(mode, level) {
                push_detail(out, RuleId::BlendModeNotAllowed, format_args!("/{}", mode));
            }
        }
    }
    if let Some(ri) = dict.get("RI").and_then(Object::as_name) {
        validate_rendering_intent(ri, out);
    }
}

fn blend_mode_allowed(mode: &str, level: ConformanceLevel) -> bool {
    if level.allows_transparency() {
        STANDARD_BLEND_MODES.contains(&mode)
    } else {
        matches!(mode, "Normal" | "Compatible")
    }
}

/// Validate an action dictionary.
pub fn validate_action(dict: &Dictionary, out: &mut Violations) {
    let Some(kind) = dict.get("S").and_then(Object::as_name) else {
        return;
    };
    if FORBIDDEN_ACTIONS.contains(&kind) {
        push_detail(out, RuleId::ActionTypeNotAllowed, format_args!("/{}", kind));
    } else if kind == "Named" {
        let named = dict.get("N").and_then(Object::as_name).unwrap_or("");
        if !ALLOWED_NAMED_ACTIONS.contains(&named) {
            push_detail(out, RuleId::NamedActionTypeNotAllowed, format_args!("/{}", named));
        }
    }
}

/// Validate an annotation dictionary.
pub fn validate_annotation(dict: &Dictionary, level: ConformanceLevel, out: &mut Violations) {
    let subtype = dict.get("Subtype").and_then(Object::as_name).unwrap_or("");

    if FORBIDDEN_ANNOTATIONS.contains(&subtype) || (subtype == "FileAttachment" && !level.allows_embedded_files()) {
        push_detail(out, RuleId::AnnotationTypeNotAllowed, format_args!("/{}", subtype));
    }

    if subtype != "Popup" {
        let flags = AnnotationFlags::from_bits_truncate(dict.get("F").and_then(Object::as_integer).unwrap_or(0) as u32);
        if !flags.contains(AnnotationFlags::PRINT) {
            push(out, RuleId::AnnotationPrintFlagShallBeSet);
        }
        if flags.intersects(AnnotationFlags::HIDING) {
            push(out, RuleId::AnnotationHiddenFlagsShallBeClear);
        }
    }

    if let Some(alpha) = dict.get("CA").and_then(Object::as_number) {
        if (alpha - 1.0).abs() > f64::EPSILON {
            push(out, RuleId::AnnotationConstantAlphaShallBeOne);
        }
    }

    if let Some(ap) = dict.get("AP").and_then(Object::as_dict) {
        if ap.keys().any(|k| k != "N") {
            push(out, RuleId::AppearanceShallContainOnlyN);
        }
    }
}

/// Validate a font or font descriptor dictionary.
pub fn validate_font(dict: &Dictionary, out: &mut Violations) {
    match dict.get("Type").and_then(Object::as_name) {
        Some("FontDescriptor") => {
            if !["FontFile", "FontFile2", "FontFile3"].iter().any(|k| dict.contains_key(*k)) {
                let name = dict.get("FontName").and_then(Object::as_name).unwrap_or("?");
                push_detail(out, RuleId::FontShallBeEmbedded, format_args!("/{}", name));
            }
        },
        _ => {
            let subtype = dict.get("Subtype").and_then(Object::as_name).unwrap_or("");
            let needs_descriptor = matches!(subtype, "Type1" | "MMType1" | "TrueType" | "CIDFontType0" | "CIDFontType2");
            if needs_descriptor && !dict.contains_key("FontDescriptor") {
                let name = dict.get("BaseFont").and_then(Object::as_name).unwrap_or("?");
                push_detail(out, RuleId::FontShallBeEmbedded, format_args!("/{}", name));
            }
        },
    }
}

/// Validate an image or form XObject dictionary.
pub fn validate_xobject(dict: &Dictionary, out: &mut Violations) {
    if dict.contains_key("OPI") {
        push(out, RuleId::XObjectShallNotContainOpi);
    }
    match dict.get("Subtype").and_then(Object::as_name) {
        Some("Image") => {
            if dict.get("Interpolate").and_then(Object::as_bool) == Some(true) {
                push(out, RuleId::ImageInterpolateShallBeFalse);
            }
            if dict.contains_key("Alternates") {
                push(out, RuleId::ImageShallNotContainAlternates);
            }
        },
        Some("Form") => {
            if dict.contains_key("Ref") {
                push(out, RuleId::ReferenceXObjectNotAllowed);
            }
            if dict.get("Subtype2").and_then(Object::as_name) == Some("PS") {
                push(out, RuleId::PostScriptXObjectNotAllowed);
            }
        },
        Some("PS") => push(out, RuleId::PostScriptXObjectNotAllowed),
        _ => {},
    }
}

/// Validate the filter chain of a stream dictionary.
pub fn validate_stream_filters(dict: &Dictionary, out: &mut Violations) {
    let filters: Vec<&str> = match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.as_str()],
        Some(Object::Array(items)) => items.iter().filter_map(Object::as_name).collect(),
        _ => Vec::new(),
    };
    for filter in filters {
        match filter {
            "LZWDecode" | "LZW" => push(out, RuleId::LzwDecodeFilterNotPermitted),
            "JPXDecode" => push(out, RuleId::JpxDecodeFilterNotPermitted),
            _ => {},
        }
    }
}

/// Validate a file specification dictionary.
pub fn validate_file_spec(dict: &Dictionary, out: &mut Violations) {
    if !dict.contains_key("EF") {
        return;
    }
    push(out, RuleId::EmbeddedFileNotAllowed);
    if !dict.contains_key("AFRelationship") {
        push(out, RuleId::EmbeddedFileShallContainAfRelationship);
    }
}

/// Validate an interactive form dictionary.
pub fn validate_acroform(dict: &Dictionary, out: &mut Violations) {
    if let Some(value) = dict.get("NeedAppearances") {
        if value.as_bool() == Some(true) {
            push(out, RuleId::NeedAppearancesShallBeFalse);
        }
        push(out, RuleId::NeedAppearancesShallNotBePresent);
    }
    if dict.contains_key("XFA") {
        push(out, RuleId::AcroFormShallNotContainXfa);
    }
}

/// Check implementation limits of a single (non-container-walking) value.
pub fn validate_limits(obj: &Object, out: &mut Violations) {
    match obj {
        Object::String(s) if s.len() > MAX_STRING_LENGTH => {
            push_detail(out, RuleId::StringTooLong, format_args!("{} bytes", s.len()));
        },
        Object::Name(n) if n.len() > MAX_NAME_LENGTH => {
            push_detail(out, RuleId::NameTooLong, format_args!("{} bytes", n.len()));
        },
        Object::Array(items) if items.len() > MAX_ARRAY_LENGTH => {
            push_detail(out, RuleId::ArrayTooLong, format_args!("{} elements", items.len()));
        },
        Object::Dictionary(d) if d.len() > MAX_DICTIONARY_ENTRIES => {
            push_detail(out, RuleId::DictionaryTooLarge, format_args!("{} entries", d.len()));
        },
        Object::Integer(i) if *i > i32::MAX as i64 || *i < i32::MIN as i64 => {
            push_detail(out, RuleId::IntegerOutOfRange, i);
        },
        Object::Real(r) if r.abs() > MAX_REAL => {
            push_detail(out, RuleId::RealOutOfRange, r);
        },
        _ => {},
    }
}

/// Validate the optional content properties dictionary.
///
/// Configurations and the `Order` array may be direct or live in the graph.
/// PDF/A-1 forbids optional content outright; that is reported for the
/// catalog entry, not here.
pub fn validate_oc_properties(dict: &Dictionary, graph: &ObjectGraph, level: ConformanceLevel, out: &mut Violations) {
    if level.part() == PdfAPart::Part1 {
        return;
    }

    let mut configs: Vec<&Dictionary> = Vec::new();
    if let Some(d) = dict.get("D").and_then(|o| graph.resolve(o)).and_then(Object::as_dict) {
        configs.push(d);
    }
    if let Some(list) = dict.get("Configs").and_then(|o| graph.resolve(o)).and_then(Object::as_array) {
        configs.extend(list.iter().filter_map(|o| graph.resolve(o)).filter_map(Object::as_dict));
    }

    let mut names = HashSet::new();
    for config in &configs {
        match config.get("Name").and_then(Object::as_string) {
            Some(name) => {
                if !names.insert(name.to_vec()) {
                    push_detail(
                        out,
                        RuleId::OcConfigNamesShallBeUnique,
                        String::from_utf8_lossy(name),
                    );
                }
            },
            None => push(out, RuleId::OcConfigShallContainName),
        }
        if config.contains_key("AS") {
            push(out, RuleId::OcConfigShallNotContainAs);
        }
    }

    let ocgs: Vec<ObjectRef> = dict
        .get("OCGs")
        .and_then(|o| graph.resolve(o))
        .and_then(Object::as_array)
        .map(|a| a.iter().filter_map(Object::as_reference).collect())
        .unwrap_or_default();
    if ocgs.is_empty() {
        return;
    }
    let mut ordered = HashSet::new();
    if let Some(order) = configs.first().and_then(|d| d.get("Order")) {
        collect_order_refs(order, graph, &mut ordered);
    }
    for ocg in ocgs {
        if !ordered.contains(&ocg) {
            out.push(ConformanceViolation::new(RuleId::OcgShallBeListedInOrder, Some(ocg)));
        }
    }
}

fn collect_order_refs(order: &Object, graph: &ObjectGraph, acc: &mut HashSet<ObjectRef>) {
    let mut stack = vec![order];
    while let Some(item) = stack.pop() {
        match item {
            Object::Reference(r) => {
                if !acc.insert(*r) {
                    continue;
                }
                if let Ok(Object::Array(nested)) = graph.get_object(*r) {
                    stack.extend(nested.iter());
                }
            },
            Object::Array(nested) => stack.extend(nested.iter()),
            _ => {},
        }
    }
}
