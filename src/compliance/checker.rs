//! The conformance checker: severity application, per-object checks and the
//! close-time sweep.
//!
//! Per-object checks classify every dictionary (the object itself and every
//! direct object nested in it) by its own keys, so the result does not depend
//! on which referrer was flushed first. References are never followed here;
//! each indirect object is checked once, when it is flushed.

use super::content::scan_content;
use super::icc::IccProfile;
use super::rules::{
    ConformanceConfig, DeviceColorSpace, IsoCheck, MAX_GRAPHICS_STATE_DEPTH, MAX_INDIRECT_OBJECTS, MAX_NAME_LENGTH,
};
use super::types::{ConformanceLevel, ConformanceViolation, PdfAPart, RuleId, Severity, ValidationReport};
use super::validators::{self, Violations};
use super::xmp::parse_xmp;
use crate::error::{Error, Result};
use crate::graph::ObjectGraph;
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::HashSet;

const ACTION_TYPES: [&str; 18] = [
    "GoTo",
    "GoToR",
    "GoToE",
    "Launch",
    "Thread",
    "URI",
    "Sound",
    "Movie",
    "Hide",
    "Named",
    "SubmitForm",
    "ResetForm",
    "ImportData",
    "JavaScript",
    "SetOCGState",
    "Rendition",
    "Trans",
    "GoTo3DView",
];

const EXT_GSTATE_KEYS: [&str; 7] = ["BM", "SMask", "TR", "TR2", "HTP", "CA", "ca"];

/// What a dictionary is, judged by its own keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DictKind {
    Page,
    Catalog,
    ExtGState,
    Font,
    XObject,
    Action,
    Annotation,
    FileSpec,
    AcroForm,
    Other,
}

fn page_contents(dict: &Dictionary) -> Vec<ObjectRef> {
    match dict.get("Contents") {
        Some(Object::Reference(r)) => vec![*r],
        Some(Object::Array(items)) => items.iter().filter_map(Object::as_reference).collect(),
        _ => Vec::new(),
    }
}

fn classify(dict: &Dictionary) -> DictKind {
    let type_name = dict.get("Type").and_then(Object::as_name);
    let subtype = dict.get("Subtype").and_then(Object::as_name);
    match type_name {
        Some("Page") => return DictKind::Page,
        Some("Catalog") => return DictKind::Catalog,
        Some("ExtGState") => return DictKind::ExtGState,
        Some("Font") | Some("FontDescriptor") => return DictKind::Font,
        Some("XObject") => return DictKind::XObject,
        Some("Action") => return DictKind::Action,
        Some("Annot") => return DictKind::Annotation,
        Some("Filespec") => return DictKind::FileSpec,
        Some("OutputIntent") | Some("Metadata") | Some("OCG") | Some("Pages") => return DictKind::Other,
        _ => {},
    }
    if matches!(subtype, Some("Image") | Some("Form") | Some("PS")) {
        return DictKind::XObject;
    }
    if subtype.is_some() && dict.contains_key("Rect") {
        return DictKind::Annotation;
    }
    if dict.contains_key("EF") {
        return DictKind::FileSpec;
    }
    if let Some(kind) = dict.get("S").and_then(Object::as_name) {
        if ACTION_TYPES.contains(&kind) {
            return DictKind::Action;
        }
    }
    if dict.contains_key("Fields") {
        return DictKind::AcroForm;
    }
    if EXT_GSTATE_KEYS.iter().any(|k| dict.contains_key(*k)) {
        return DictKind::ExtGState;
    }
    DictKind::Other
}

/// Read-only view of a document for the close-time sweep.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    /// The object graph
    pub graph: &'a ObjectGraph,
    /// Document catalog
    pub catalog: ObjectRef,
    /// Document information dictionary
    pub info: Option<ObjectRef>,
    /// Version written in the file header
    pub header_version: &'a str,
    /// Whether the trailer carries `Encrypt`
    pub encrypted: bool,
}

/// Applies the rule tables to one document.
#[derive(Debug)]
pub struct ConformanceChecker {
    level: ConformanceLevel,
    config: ConformanceConfig,
    intent_bound: bool,
    intent_space: Option<DeviceColorSpace>,
    warnings: Vec<ConformanceViolation>,
    checked: HashSet<ObjectRef>,
    content_streams: HashSet<ObjectRef>,
}

impl ConformanceChecker {
    /// Create a checker for `level`.
    pub fn new(level: ConformanceLevel, config: ConformanceConfig) -> Self {
        Self {
            level,
            config,
            intent_bound: false,
            intent_space: None,
            warnings: Vec::new(),
            checked: HashSet::new(),
            content_streams: HashSet::new(),
        }
    }

    /// The bound conformance level.
    pub fn level(&self) -> ConformanceLevel {
        self.level
    }

    /// Effective severity of `rule`.
    pub fn severity(&self, rule: RuleId) -> Severity {
        self.config.severity(self.level, rule)
    }

    /// Record that an output intent covering `space` is bound.
    pub fn set_output_intent(&mut self, space: Option<DeviceColorSpace>) {
        self.intent_bound = true;
        self.intent_space = space;
    }

    /// Mark `r` as a content stream, scanned when it is checked.
    pub fn register_content_stream(&mut self, r: ObjectRef) {
        self.content_streams.insert(r);
    }

    /// Register the content streams of every in-memory page of `graph`.
    ///
    /// Pages that were already flushed registered theirs when checked, so
    /// a stream flushed ahead of its page is still scanned.
    pub fn register_page_contents(&mut self, graph: &ObjectGraph) {
        for r in graph.in_memory_refs() {
            if let Ok(Object::Dictionary(dict)) = graph.get_object(r) {
                if classify(dict) == DictKind::Page {
                    self.content_streams.extend(page_contents(dict));
                }
            }
        }
    }

    /// Whether `r` has already been checked.
    pub fn is_checked(&self, r: ObjectRef) -> bool {
        self.checked.contains(&r)
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ConformanceViolation] {
        &self.warnings
    }

    /// Apply severities to `violations` in order.
    ///
    /// Warnings are logged and kept; the first error is returned.
    pub fn apply(&mut self, violations: Violations, object: Option<ObjectRef>) -> Result<()> {
        for violation in violations {
            let violation = violation.or_object(object);
            match self.severity(violation.rule) {
                Severity::Error => {
                    log::debug!("Conformance error: {}", violation);
                    return Err(Error::Conformance(violation));
                },
                Severity::Warning => {
                    log::warn!("{}", violation);
                    self.warnings.push(violation);
                },
                Severity::Ignore => {
                    log::trace!("Ignored at {}: {}", self.level, violation);
                },
            }
        }
        Ok(())
    }

    /// Run an explicitly requested check.
    pub fn check_iso_conformance(&mut self, check: IsoCheck<'_>, object: Option<ObjectRef>) -> Result<()> {
        let mut out = Violations::new();
        match check {
            IsoCheck::SignatureType { is_cades } => {
                if !is_cades {
                    out.push(ConformanceViolation::new(RuleId::SignatureShallConformToPades, None));
                }
            },
            IsoCheck::RenderingIntent(intent) => validators::validate_rendering_intent(intent, &mut out),
            IsoCheck::CanvasStack { depth } => {
                if depth > MAX_GRAPHICS_STATE_DEPTH {
                    out.push(
                        ConformanceViolation::new(RuleId::GraphicsStateStackDepthExceeded, None)
                            .with_detail(format_args!("depth {}", depth)),
                    );
                }
            },
            IsoCheck::ExtGState(dict) => validators::validate_ext_gstate(dict, self.level, &mut out),
            IsoCheck::DeviceColor(space) => self.device_color_violations(space, &mut out),
            IsoCheck::FontDictionary(dict) => validators::validate_font(dict, &mut out),
            IsoCheck::LayerCreation => {
                out.push(ConformanceViolation::new(RuleId::OptionalContentNotAllowed, None));
            },
            IsoCheck::NeedAppearances(value) => {
                if value {
                    out.push(ConformanceViolation::new(RuleId::NeedAppearancesShallBeFalse, None));
                }
                out.push(ConformanceViolation::new(RuleId::NeedAppearancesShallNotBePresent, None));
            },
            IsoCheck::PageEntry { key, value } => validators::validate_page_entry(key, value, &mut out),
            IsoCheck::CatalogEntry { key, value } => validators::validate_catalog_entry(key, value, &mut out),
        }
        log::trace!("Checked {:?} at {}", check.key(), self.level);
        self.apply(out, object)
    }

    fn device_color_violations(&self, space: DeviceColorSpace, out: &mut Violations) {
        if !self.intent_bound {
            out.push(ConformanceViolation::new(RuleId::OutputIntentNotBound, None).with_detail(space.pdf_name()));
            return;
        }
        let covered = match self.intent_space {
            Some(intent) => space.is_covered_by(intent),
            None => space == DeviceColorSpace::Gray,
        };
        if !covered {
            out.push(ConformanceViolation::new(RuleId::DeviceColorSpaceMismatch, None).with_detail(space.pdf_name()));
        }
    }

    /// Check `obj`, the payload of `r`, before it is written.
    ///
    /// An object that passed is not checked again; one that failed is
    /// checked afresh on the next attempt.
    pub fn check_object(&mut self, r: ObjectRef, obj: &Object) -> Result<()> {
        if self.checked.contains(&r) {
            return Ok(());
        }
        let is_content = self.content_streams.contains(&r);
        let mut out = Violations::new();
        let mut contents = Vec::new();
        self.collect_object_violations(obj, is_content, &mut out, &mut contents);
        self.apply(out, Some(r))?;
        self.checked.insert(r);
        self.content_streams.extend(contents);
        Ok(())
    }

    /// Candidate violations for one object and its direct children.
    fn collect_object_violations(
        &self,
        obj: &Object,
        is_content: bool,
        out: &mut Violations,
        contents: &mut Vec<ObjectRef>,
    ) {
        if let Object::Stream { dict, data } = obj {
            validators::validate_stream_filters(dict, out);
            let is_form = dict.get("Subtype").and_then(Object::as_name) == Some("Form");
            if is_content || is_form {
                match obj.decode_stream_data() {
                    Ok(decoded) => self.content_violations(&decoded, out),
                    Err(e) => log::debug!("Content stream of {} bytes not scanned: {}", data.len(), e),
                }
            }
        }

        let mut stack = vec![obj];
        while let Some(node) = stack.pop() {
            validators::validate_limits(node, out);
            match node {
                Object::Array(items) => stack.extend(items.iter().rev()),
                Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                    self.dictionary_violations(dict, out, contents);
                    let mut keys: Vec<&String> = dict.keys().collect();
                    keys.sort();
                    for key in keys.into_iter().rev() {
                        if key.len() > MAX_NAME_LENGTH {
                            out.push(
                                ConformanceViolation::new(RuleId::NameTooLong, None)
                                    .with_detail(format_args!("{} bytes", key.len())),
                            );
                        }
                        stack.push(&dict[key]);
                    }
                },
                _ => {},
            }
        }
    }

    fn dictionary_violations(&self, dict: &Dictionary, out: &mut Violations, contents: &mut Vec<ObjectRef>) {
        match classify(dict) {
            DictKind::Page => {
                validators::validate_page(dict, out);
                contents.extend(page_contents(dict));
            },
            DictKind::Catalog => validators::validate_catalog(dict, out),
            DictKind::ExtGState => validators::validate_ext_gstate(dict, self.level, out),
            DictKind::Font => validators::validate_font(dict, out),
            DictKind::XObject => validators::validate_xobject(dict, out),
            DictKind::Action => validators::validate_action(dict, out),
            DictKind::Annotation => validators::validate_annotation(dict, self.level, out),
            DictKind::FileSpec => validators::validate_file_spec(dict, out),
            DictKind::AcroForm => validators::validate_acroform(dict, out),
            DictKind::Other => {},
        }
    }

    fn content_violations(&self, decoded: &[u8], out: &mut Violations) {
        let summary = scan_content(decoded);
        if summary.max_depth > MAX_GRAPHICS_STATE_DEPTH {
            out.push(
                ConformanceViolation::new(RuleId::GraphicsStateStackDepthExceeded, None)
                    .with_detail(format_args!("depth {}", summary.max_depth)),
            );
        }
        for intent in &summary.rendering_intents {
            validators::validate_rendering_intent(intent, out);
        }
        for space in summary.device_colors {
            self.device_color_violations(space, out);
        }
    }

    /// Document-level rules checked when the document closes.
    pub fn sweep(&self, view: &DocumentView<'_>) -> Violations {
        let mut out = Violations::new();
        let graph = view.graph;
        let catalog = match graph.get_object(view.catalog).ok().and_then(Object::as_dict) {
            Some(dict) => dict,
            None => {
                out.push(
                    ConformanceViolation::new(RuleId::MetadataRequired, Some(view.catalog))
                        .with_detail("catalog is not available"),
                );
                return out;
            },
        };
        let at_catalog = |rule: RuleId| ConformanceViolation::new(rule, Some(view.catalog));

        if !header_version_allowed(view.header_version, self.level) {
            out.push(
                ConformanceViolation::new(RuleId::HeaderVersionNotAllowed, None)
                    .with_detail(format_args!("%PDF-{}", view.header_version)),
            );
        }
        if view.encrypted {
            out.push(ConformanceViolation::new(RuleId::EncryptNotAllowed, None));
        }
        if graph.len() > MAX_INDIRECT_OBJECTS {
            out.push(ConformanceViolation::new(RuleId::TooManyIndirectObjects, None));
        }

        self.sweep_output_intents(catalog, graph, &mut out);
        let xmp = self.sweep_metadata(catalog, graph, &mut out);

        if let (Some(xmp), Some(info)) = (xmp, view.info.and_then(|r| graph.get_object(r).ok())) {
            for (key, value) in [("Title", &xmp.title), ("Producer", &xmp.producer)] {
                let info_value = info.get(key).and_then(Object::as_string).map(String::from_utf8_lossy);
                if let Some(info_value) = info_value {
                    if value.as_deref() != Some(&*info_value) {
                        out.push(
                            ConformanceViolation::new(RuleId::InfoShallMatchXmp, view.info)
                                .with_detail(format_args!("/{}", key)),
                        );
                    }
                }
            }
        }

        if !catalog.contains_key("Lang") {
            out.push(at_catalog(RuleId::CatalogShouldContainLang));
        }
        let marked = catalog
            .get("MarkInfo")
            .and_then(|o| graph.resolve(o))
            .and_then(|o| o.get("Marked"))
            .and_then(Object::as_bool)
            .unwrap_or(false);
        if !marked {
            out.push(at_catalog(RuleId::MarkInfoRequired));
        }
        if !catalog.contains_key("StructTreeRoot") {
            out.push(at_catalog(RuleId::StructTreeRootRequired));
        }

        if let Some(names) = catalog.get("Names").and_then(|o| o.as_reference()) {
            if let Some(dict) = graph.get_object(names).ok().and_then(Object::as_dict) {
                let before = out.len();
                validators::validate_name_dictionary(dict, &mut out);
                for v in &mut out[before..] {
                    v.object = Some(names);
                }
            }
        }
        if let Some(props) = catalog.get("OCProperties").and_then(|o| graph.resolve(o)).and_then(Object::as_dict) {
            validators::validate_oc_properties(props, graph, self.level, &mut out);
        }

        out
    }

    fn sweep_output_intents(&self, catalog: &Dictionary, graph: &ObjectGraph, out: &mut Violations) {
        let intents: Vec<&Dictionary> = catalog
            .get("OutputIntents")
            .and_then(|o| graph.resolve(o))
            .and_then(Object::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|o| graph.resolve(o))
                    .filter_map(Object::as_dict)
                    .filter(|d| d.get("S").and_then(Object::as_name) == Some(super::output_intent::GTS_PDFA1))
                    .collect()
            })
            .unwrap_or_default();

        if intents.is_empty() {
            out.push(ConformanceViolation::new(RuleId::OutputIntentRequired, None));
            return;
        }

        let profiles: Vec<Option<ObjectRef>> = intents
            .iter()
            .map(|d| d.get("DestOutputProfile").and_then(Object::as_reference))
            .collect();
        let first = profiles[0];
        if profiles.iter().any(|p| *p != first) {
            out.push(ConformanceViolation::new(RuleId::OutputIntentsShallHaveSameProfile, None));
        }

        let Some(profile_ref) = first else {
            out.push(ConformanceViolation::new(RuleId::InvalidIccProfile, None).with_detail("DestOutputProfile missing"));
            return;
        };
        let data = match graph.get_object(profile_ref).map(|o| o.decode_stream_data()) {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                out.push(ConformanceViolation::new(RuleId::InvalidIccProfile, Some(profile_ref)).with_detail(e));
                return;
            },
            // Already written; its header was checked when it was bound
            Err(_) => return,
        };
        match IccProfile::parse(data) {
            Ok(profile) => {
                let before = out.len();
                profile.validate(self.level, out);
                for v in &mut out[before..] {
                    v.object = Some(profile_ref);
                }
            },
            Err(v) => out.push(v.or_object(Some(profile_ref))),
        }
    }

    fn sweep_metadata(
        &self,
        catalog: &Dictionary,
        graph: &ObjectGraph,
        out: &mut Violations,
    ) -> Option<super::xmp::XmpInfo> {
        let Some(metadata_ref) = catalog.get("Metadata").and_then(Object::as_reference) else {
            out.push(ConformanceViolation::new(RuleId::MetadataRequired, None));
            return None;
        };
        let stream = match graph.get_object(metadata_ref) {
            Ok(stream) => stream,
            Err(_) => {
                out.push(
                    ConformanceViolation::new(RuleId::MetadataRequired, Some(metadata_ref))
                        .with_detail("metadata stream is not available"),
                );
                return None;
            },
        };
        if stream.get("Filter").is_some() {
            out.push(ConformanceViolation::new(RuleId::MetadataStreamShallNotBeFiltered, Some(metadata_ref)));
        }
        let parsed = stream.decode_stream_data().and_then(|data| parse_xmp(&data));
        match parsed {
            Ok(info) => {
                if info.level() != Some(self.level) {
                    out.push(
                        ConformanceViolation::new(RuleId::XmpIdentificationMismatch, Some(metadata_ref)).with_detail(
                            format_args!(
                                "part {:?} conformance {:?}, expected {}",
                                info.part, info.conformance, self.level
                            ),
                        ),
                    );
                }
                Some(info)
            },
            Err(e) => {
                out.push(ConformanceViolation::new(RuleId::XmpMetadataMalformed, Some(metadata_ref)).with_detail(e));
                None
            },
        }
    }

    /// Run the sweep and apply severities; the first error aborts.
    pub fn enforce(&mut self, view: &DocumentView<'_>) -> Result<()> {
        let violations = self.sweep(view);
        self.apply(violations, None)
    }

    /// Non-fatal validation of a whole document.
    ///
    /// Every in-memory object is checked and every violation is sorted into
    /// errors and warnings by severity. Nothing is marked as checked.
    pub fn validate(&self, view: &DocumentView<'_>) -> ValidationReport {
        let mut report = ValidationReport::new(self.level);
        report.detected_level = view
            .graph
            .get_object(view.catalog)
            .ok()
            .and_then(|c| c.get("Metadata"))
            .and_then(Object::as_reference)
            .and_then(|r| view.graph.get_object(r).ok())
            .and_then(|s| s.decode_stream_data().ok())
            .and_then(|data| parse_xmp(&data).ok())
            .and_then(|info| info.level());
        let mut candidates = self.sweep(view);

        let mut content_streams = self.content_streams.clone();
        for r in view.graph.in_memory_refs() {
            if let Ok(obj) = view.graph.get_object(r) {
                if obj.as_dict().map(classify) == Some(DictKind::Page) {
                    match obj.get("Contents") {
                        Some(Object::Reference(c)) => {
                            content_streams.insert(*c);
                        },
                        Some(Object::Array(items)) => {
                            content_streams.extend(items.iter().filter_map(Object::as_reference));
                        },
                        _ => {},
                    }
                }
            }
        }

        for r in view.graph.in_memory_refs() {
            if let Ok(obj) = view.graph.get_object(r) {
                let mut out = Violations::new();
                let mut ignored = Vec::new();
                self.collect_object_violations(obj, content_streams.contains(&r), &mut out, &mut ignored);
                candidates.extend(out.into_iter().map(|v| v.or_object(Some(r))));
            }
        }

        for violation in candidates {
            match self.severity(violation.rule) {
                Severity::Error => report.errors.push(violation),
                Severity::Warning => report.warnings.push(violation),
                Severity::Ignore => {},
            }
        }
        report
    }
}

/// Whether a file header version is acceptable for `level`.
pub fn header_version_allowed(version: &str, level: ConformanceLevel) -> bool {
    let mut parts = version.trim().splitn(2, '.');
    let major: u32 = match parts.next().and_then(|p| p.parse().ok()) {
        Some(v) => v,
        None => return false,
    };
    let minor: u32 = match parts.next().and_then(|p| p.parse().ok()) {
        Some(v) => v,
        None => return false,
    };
    match level.part() {
        PdfAPart::Part1 => major == 1 && minor <= 4,
        PdfAPart::Part2 | PdfAPart::Part3 => major == 1 && minor <= 7,
        PdfAPart::Part4 => major == 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::output_intent::OutputIntent;
    use crate::writer::object_serializer::{dict, integer, name, reference, string};
    use crate::writer::XmpWriter;

    fn checker(level: ConformanceLevel) -> ConformanceChecker {
        ConformanceChecker::new(level, ConformanceConfig::default())
    }

    fn rule_of(result: Result<()>) -> Option<RuleId> {
        result.err().and_then(|e| e.rule_id())
    }

    #[test]
    fn test_signature_type() {
        for level in ConformanceLevel::ALL {
            let mut c = checker(level);
            assert!(c.check_iso_conformance(IsoCheck::SignatureType { is_cades: true }, None).is_ok());
        }
        let mut c = checker(ConformanceLevel::A2b);
        let err = c
            .check_iso_conformance(IsoCheck::SignatureType { is_cades: false }, None)
            .unwrap_err();
        assert!(err.to_string().contains("SIGNATURE_SHALL_CONFORM_TO_ONE_OF_THE_PADES_PROFILE"));

        let mut c = checker(ConformanceLevel::A1b);
        assert!(c.check_iso_conformance(IsoCheck::SignatureType { is_cades: false }, None).is_ok());
    }

    #[test]
    fn test_canvas_stack_boundary() {
        let mut c = checker(ConformanceLevel::A1b);
        assert!(c.check_iso_conformance(IsoCheck::CanvasStack { depth: 28 }, None).is_ok());
        assert_eq!(
            rule_of(c.check_iso_conformance(IsoCheck::CanvasStack { depth: 29 }, None)),
            Some(RuleId::GraphicsStateStackDepthExceeded)
        );
    }

    #[test]
    fn test_warning_is_collected() {
        let mut c = checker(ConformanceLevel::A2b);
        let violations = vec![ConformanceViolation::new(RuleId::CatalogShouldContainLang, None)];
        c.apply(violations, Some(ObjectRef::new(1, 0))).unwrap();
        assert_eq!(c.warnings().len(), 1);
        assert_eq!(c.warnings()[0].object, Some(ObjectRef::new(1, 0)));
    }

    #[test]
    fn test_override_turns_error_into_warning() {
        let config = ConformanceConfig::new().with_severity(RuleId::InvalidRenderingIntent, Severity::Warning);
        let mut c = ConformanceChecker::new(ConformanceLevel::A2b, config);
        c.check_iso_conformance(IsoCheck::RenderingIntent("Vivid"), None).unwrap();
        assert_eq!(c.warnings()[0].rule, RuleId::InvalidRenderingIntent);
    }

    #[test]
    fn test_device_color_requires_intent() {
        let mut c = checker(ConformanceLevel::A2b);
        assert_eq!(
            rule_of(c.check_iso_conformance(IsoCheck::DeviceColor(DeviceColorSpace::Rgb), None)),
            Some(RuleId::OutputIntentNotBound)
        );
        c.set_output_intent(Some(DeviceColorSpace::Rgb));
        assert!(c.check_iso_conformance(IsoCheck::DeviceColor(DeviceColorSpace::Rgb), None).is_ok());
        assert!(c.check_iso_conformance(IsoCheck::DeviceColor(DeviceColorSpace::Gray), None).is_ok());
        assert_eq!(
            rule_of(c.check_iso_conformance(IsoCheck::DeviceColor(DeviceColorSpace::Cmyk), None)),
            Some(RuleId::DeviceColorSpaceMismatch)
        );
    }

    #[test]
    fn test_need_appearances_by_part() {
        let mut c = checker(ConformanceLevel::A2b);
        assert!(c.check_iso_conformance(IsoCheck::NeedAppearances(false), None).is_ok());
        assert_eq!(
            rule_of(c.check_iso_conformance(IsoCheck::NeedAppearances(true), None)),
            Some(RuleId::NeedAppearancesShallBeFalse)
        );
        let mut c = checker(ConformanceLevel::A4);
        assert_eq!(
            rule_of(c.check_iso_conformance(IsoCheck::NeedAppearances(false), None)),
            Some(RuleId::NeedAppearancesShallNotBePresent)
        );
    }

    #[test]
    fn test_check_object_classifies_nested_dictionaries() {
        let mut c = checker(ConformanceLevel::A2b);
        let page = dict(vec![
            ("Type", name("Page")),
            (
                "Annots",
                Object::Array(vec![dict(vec![
                    ("Subtype", name("Link")),
                    ("Rect", crate::writer::object_serializer::rect(0.0, 0.0, 10.0, 10.0)),
                    ("F", integer(4)),
                    ("A", dict(vec![("S", name("Launch"))])),
                ])]),
            ),
        ]);
        let err = c.check_object(ObjectRef::new(3, 0), &page).unwrap_err();
        assert_eq!(err.rule_id(), Some(RuleId::ActionTypeNotAllowed));
        assert_eq!(err.violation().unwrap().object, Some(ObjectRef::new(3, 0)));

        // A failed object is checked again on the next attempt
        assert!(c.check_object(ObjectRef::new(3, 0), &page).is_err());
        assert!(!c.is_checked(ObjectRef::new(3, 0)));

        let fine = dict(vec![("Type", name("Page"))]);
        c.check_object(ObjectRef::new(3, 0), &fine).unwrap();
        assert!(c.is_checked(ObjectRef::new(3, 0)));
        // Once passed, later checks are no-ops
        assert!(c.check_object(ObjectRef::new(3, 0), &page).is_ok());
    }

    #[test]
    fn test_content_stream_registered_by_page() {
        let mut c = checker(ConformanceLevel::A1b);
        let page = dict(vec![("Type", name("Page")), ("Contents", reference(ObjectRef::new(5, 0)))]);
        c.check_object(ObjectRef::new(4, 0), &page).unwrap();

        let deep = "q ".repeat(29) + &"Q ".repeat(29);
        let stream = Object::Stream {
            dict: Dictionary::new(),
            data: bytes::Bytes::from(deep),
        };
        assert_eq!(
            c.check_object(ObjectRef::new(5, 0), &stream).unwrap_err().rule_id(),
            Some(RuleId::GraphicsStateStackDepthExceeded)
        );
    }

    #[test]
    fn test_unregistered_stream_is_not_scanned() {
        let mut c = checker(ConformanceLevel::A1b);
        let stream = Object::Stream {
            dict: Dictionary::new(),
            data: bytes::Bytes::from("q ".repeat(40)),
        };
        assert!(c.check_object(ObjectRef::new(9, 0), &stream).is_ok());
    }

    fn conforming_graph(level: ConformanceLevel) -> (ObjectGraph, ObjectRef) {
        let mut graph = ObjectGraph::new();
        let intent = OutputIntent::new("sRGB", crate::compliance::IccProfile::synthetic(b"mntr", b"RGB ", 2));
        let profile = graph.add_object(intent.profile_stream());
        let intent_ref = graph.add_object(intent.to_dictionary(profile));
        let xmp = XmpWriter::new(level).build_bytes();
        let mut md = Dictionary::new();
        md.insert("Type".to_string(), name("Metadata"));
        md.insert("Subtype".to_string(), name("XML"));
        let metadata = graph.add_object(Object::Stream {
            dict: md,
            data: bytes::Bytes::from(xmp),
        });
        let catalog = graph.add_object(dict(vec![
            ("Type", name("Catalog")),
            ("Lang", string("en")),
            ("Metadata", reference(metadata)),
            ("OutputIntents", Object::Array(vec![reference(intent_ref)])),
        ]));
        (graph, catalog)
    }

    #[test]
    fn test_sweep_conforming_document() {
        let (graph, catalog) = conforming_graph(ConformanceLevel::A2b);
        let view = DocumentView {
            graph: &graph,
            catalog,
            info: None,
            header_version: "1.7",
            encrypted: false,
        };
        let c = checker(ConformanceLevel::A2b);
        let report = c.validate(&view);
        assert!(report.is_compliant(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_sweep_detects_mismatched_level() {
        let (graph, catalog) = conforming_graph(ConformanceLevel::A3b);
        let view = DocumentView {
            graph: &graph,
            catalog,
            info: None,
            header_version: "2.0",
            encrypted: true,
        };
        let report = checker(ConformanceLevel::A2b).validate(&view);
        assert!(report.contains(RuleId::XmpIdentificationMismatch));
        assert!(report.contains(RuleId::HeaderVersionNotAllowed));
        assert!(report.contains(RuleId::EncryptNotAllowed));
    }

    #[test]
    fn test_sweep_missing_intent_and_metadata() {
        let mut graph = ObjectGraph::new();
        let catalog = graph.add_object(dict(vec![("Type", name("Catalog"))]));
        let view = DocumentView {
            graph: &graph,
            catalog,
            info: None,
            header_version: "1.4",
            encrypted: false,
        };
        let mut c = checker(ConformanceLevel::A1b);
        let report = c.validate(&view);
        assert!(report.contains(RuleId::OutputIntentRequired));
        assert!(report.contains(RuleId::MetadataRequired));
        assert!(report.warnings.iter().any(|w| w.rule == RuleId::CatalogShouldContainLang));
        assert_eq!(rule_of(c.enforce(&view)), Some(RuleId::OutputIntentRequired));
    }

    #[test]
    fn test_header_versions() {
        assert!(header_version_allowed("1.4", ConformanceLevel::A1b));
        assert!(!header_version_allowed("1.7", ConformanceLevel::A1b));
        assert!(header_version_allowed("1.7", ConformanceLevel::A3u));
        assert!(header_version_allowed("2.0", ConformanceLevel::A4f));
        assert!(!header_version_allowed("1.7", ConformanceLevel::A4));
        assert!(!header_version_allowed("x", ConformanceLevel::A2b));
    }
}
